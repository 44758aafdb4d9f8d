//! The command context being parsed, scoped to the dispatching task.
//!
//! Parse errors do not always say which subcommand produced them. The
//! resolver records how far into the command tree it got here, and the error
//! path reads it back. The storage is task-local, so concurrent dispatches
//! never observe each other's context.

use std::cell::RefCell;
use std::fmt;

/// Separator between names in a dotted event path.
pub const SEPARATOR: &str = ".";

/// The names from the root command down to a node in the command tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    /// The path of a root command.
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// This path extended by a child name.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    /// Names from the root down.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Number of names in the path.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The dotted event path, e.g. `ops.vlan.show`.
    pub fn event_id(&self) -> String {
        self.0.join(SEPARATOR)
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

tokio::task_local! {
    static CURRENT: RefCell<Option<CommandPath>>;
}

/// Run `f` with a fresh, empty parse context.
pub fn scope<R>(f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(RefCell::new(None), f)
}

/// Record `path` as the context currently being parsed.
///
/// Outside of [`scope`] this does nothing.
pub fn enter(path: CommandPath) {
    let _ = CURRENT.try_with(|current| *current.borrow_mut() = Some(path));
}

/// The context recorded in the enclosing [`scope`], if any.
pub fn current() -> Option<CommandPath> {
    CURRENT
        .try_with(|current| current.borrow().clone())
        .ok()
        .flatten()
}
