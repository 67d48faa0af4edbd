//! Console binding decided before logging is configured.

use std::io::{self, IsTerminal};

use nodeboot_config::{ConsoleMode, NodePaths};

/// An attached console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    interactive: bool,
}

impl Console {
    /// Builds a console binding.
    #[must_use]
    pub const fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    /// Whether a user is watching the console.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Decides whether colour codes are emitted on the console.
#[must_use]
pub fn ansi_enabled(console: Option<&Console>, mode: ConsoleMode) -> bool {
    match mode {
        ConsoleMode::Always => true,
        ConsoleMode::Never => false,
        ConsoleMode::Auto => console.is_some_and(Console::is_interactive),
    }
}

/// Decides the console binding for a node.
pub trait ConsoleLoader: Send + Sync {
    /// Returns the console to bind, or `None` when output is not attached to
    /// one.
    fn load(&self, paths: &NodePaths) -> Option<Console>;
}

/// Binds a console when standard output is a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConsoleLoader;

impl ConsoleLoader for SystemConsoleLoader {
    fn load(&self, _paths: &NodePaths) -> Option<Console> {
        io::stdout().is_terminal().then_some(Console::new(true))
    }
}
