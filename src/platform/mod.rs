//! OS-specific process plumbing: detached spawning and process-group
//! termination. Everything above this module is platform-neutral.

use std::path::PathBuf;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::{group_alive, spawn_detached, terminate_group};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::{group_alive, spawn_detached, terminate_group};

#[cfg(not(any(unix, windows)))]
pub use fallback::{group_alive, spawn_detached, terminate_group};

/// A fully composed program invocation that opens one terminal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCommand {
    pub program: String,
    /// On Windows these are joined verbatim into the command line, so they
    /// must already be quoted for `cmd.exe`.
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

/// Give up ownership of a spawned child.
///
/// The handle moves to a background thread whose only job is to collect the
/// exit status, so no zombie is left behind when the terminal closes.
#[cfg(unix)]
pub(crate) fn hand_off(mut child: std::process::Child) -> crate::registry::LaunchedProcess {
    let pid = child.id();
    let reaper = std::thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || {
            let status = child.wait();
            tracing::debug!(pid, ?status, "terminal process exited");
        });
    if let Err(err) = reaper {
        tracing::warn!(pid, "could not start reaper thread: {}", err);
    }
    crate::registry::LaunchedProcess {
        pid,
        group: crate::registry::GroupId(pid),
    }
}

#[cfg(not(any(unix, windows)))]
mod fallback {
    use super::TerminalCommand;
    use crate::error::TerminationError;
    use crate::registry::{GroupId, LaunchedProcess};
    use std::io;

    pub fn spawn_detached(_invocation: &TerminalCommand) -> io::Result<LaunchedProcess> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "detached terminals are not supported on this platform",
        ))
    }

    pub fn terminate_group(_group: GroupId) -> Result<(), TerminationError> {
        Err(TerminationError::UnsupportedPlatform {
            os: std::env::consts::OS.to_string(),
        })
    }

    pub fn group_alive(_group: GroupId) -> Option<bool> {
        None
    }
}
