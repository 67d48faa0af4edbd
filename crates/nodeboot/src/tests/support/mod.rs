//! Test doubles and the scenario world shared by the supervisor suites.

mod doubles;
mod streams;
mod world;

pub use doubles::{
    FixedConsole, FixedProperties, LoggingEvent, RecordingLogging, RecordingStarter,
    RecordingTerminator, StarterBehaviour,
};
pub use streams::SharedBuffer;
pub use world::{BootWorld, world};
