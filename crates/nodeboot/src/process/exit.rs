//! Deferred cleanup actions and the process exit path.
//!
//! Every way out of the process (fatal bootstrap failure, controller
//! shutdown, lost connection, termination signal) funnels through a
//! [`Terminator`]. The production terminator drains the [`ExitHooks`]
//! registry before calling `exit`, so each registered action runs at most
//! once regardless of which path fires first.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{info, warn};

use super::PROCESS_TARGET;
use crate::outcome::ExitOutcome;

type Hook = Box<dyn FnOnce() + Send>;

/// Identifier of a registered exit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(usize);

struct Registered {
    id: HookId,
    name: &'static str,
    hook: Hook,
}

/// Registry of cleanup actions to run when the process exits.
#[derive(Default)]
pub struct ExitHooks {
    pending: Mutex<Vec<Registered>>,
    next_id: AtomicUsize,
}

impl ExitHooks {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action to run on exit.
    pub fn register<F>(&self, name: &'static str, hook: F) -> HookId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registered {
                id,
                name,
                hook: Box::new(hook),
            });
        id
    }

    /// Returns `true` while the hook has not yet run.
    #[must_use]
    pub fn is_pending(&self, id: HookId) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|registered| registered.id == id)
    }

    /// Number of hooks that have not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs every pending hook, most recently registered first, and returns
    /// how many ran.
    ///
    /// Hooks are removed from the registry before they execute, so concurrent
    /// or repeated calls never run the same hook twice. A panicking hook is
    /// reported and does not stop the remaining hooks.
    pub fn run_all(&self) -> usize {
        let drained = std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let count = drained.len();
        for Registered { name, hook, .. } in drained.into_iter().rev() {
            if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
                warn!(target: PROCESS_TARGET, hook = name, "exit hook panicked");
            }
        }
        count
    }
}

/// Ends the process with a given outcome.
pub trait Terminator: Send + Sync {
    /// Terminates the process. Production implementations do not return.
    fn terminate(&self, outcome: ExitOutcome);
}

impl<T> Terminator for Arc<T>
where
    T: Terminator + ?Sized,
{
    fn terminate(&self, outcome: ExitOutcome) {
        (**self).terminate(outcome);
    }
}

/// Terminator that runs the exit hooks and exits the process.
pub struct ProcessTerminator {
    hooks: Arc<ExitHooks>,
    exiting: AtomicBool,
}

impl ProcessTerminator {
    /// Builds a terminator draining the supplied registry.
    #[must_use]
    pub fn new(hooks: Arc<ExitHooks>) -> Self {
        Self {
            hooks,
            exiting: AtomicBool::new(false),
        }
    }
}

impl Terminator for ProcessTerminator {
    fn terminate(&self, outcome: ExitOutcome) {
        if self.exiting.swap(true, Ordering::SeqCst) {
            // Another thread owns the exit; wait for it to end the process.
            loop {
                thread::park();
            }
        }
        let code = outcome.exit_code();
        info!(
            target: PROCESS_TARGET,
            outcome = outcome.kind(),
            code,
            detail = %outcome,
            "process exiting"
        );
        self.hooks.run_all();
        io::stdout().flush().ok();
        io::stderr().flush().ok();
        std::process::exit(code);
    }
}
