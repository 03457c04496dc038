//! Execution mode detection.
//!
//! A provider asks its [`ModeOracle`] exactly once, when the client is built,
//! whether it is running as part of a server render. The answer is fixed for
//! the lifetime of that mount.

use std::fmt;

/// Environment variable consulted by [`HostOracle`].
pub const MODE_ENV_VAR: &str = "UNIVERSAL_QUERY_MODE";

/// Where the current render is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// The pass that produces the initial page on a server.
    Server,
    /// The pass that resumes in the end user's runtime.
    #[default]
    Client,
}

impl ExecutionMode {
    /// Returns `true` for [`ExecutionMode::Server`].
    #[must_use]
    pub const fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }

    /// Maps a boolean "is server" answer onto a mode.
    #[must_use]
    pub const fn from_is_server(is_server: bool) -> Self {
        if is_server { Self::Server } else { Self::Client }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Answers "is this a server execution context?".
///
/// Supplied by the hosting environment. Closures returning `bool` and plain
/// [`ExecutionMode`] values both implement it, which keeps tests simple:
///
/// ```
/// use universal_query::mode::{ExecutionMode, ModeOracle};
///
/// assert!(ExecutionMode::Server.is_server_context());
/// assert!(!(|| false).is_server_context());
/// ```
pub trait ModeOracle: Send + Sync {
    fn is_server_context(&self) -> bool;

    /// The mode this oracle reports.
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::from_is_server(self.is_server_context())
    }
}

impl ModeOracle for ExecutionMode {
    fn is_server_context(&self) -> bool {
        self.is_server()
    }
}

impl<F> ModeOracle for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_server_context(&self) -> bool {
        self()
    }
}

/// Oracle backed by the [`MODE_ENV_VAR`] environment variable.
///
/// `server` (case-insensitive) selects server mode; anything else, including
/// an unset variable, selects client mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostOracle;

impl HostOracle {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse(value: Option<&str>) -> bool {
        value.is_some_and(|v| v.trim().eq_ignore_ascii_case("server"))
    }
}

impl ModeOracle for HostOracle {
    fn is_server_context(&self) -> bool {
        Self::parse(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }
}
