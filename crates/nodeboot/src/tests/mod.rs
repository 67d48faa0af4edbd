//! Test suites for the startup supervisor.

mod signal_watcher;
mod supervisor;
mod support;
