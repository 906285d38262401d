use super::{hand_off, TerminalCommand};
use crate::error::TerminationError;
use crate::registry::{GroupId, LaunchedProcess};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io;
use std::process::{Command, Stdio};

/// Spawn the terminal in a new session with stdio discarded.
///
/// The child becomes session and process-group leader, so its pid doubles as
/// the group id and it survives the orchestrator exiting.
pub fn spawn_detached(invocation: &TerminalCommand) -> io::Result<LaunchedProcess> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.current_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    prepare_command(&mut cmd);

    let child = cmd.spawn()?;
    Ok(hand_off(child))
}

/// Send SIGTERM to every process in the group.
pub fn terminate_group(group: GroupId) -> Result<(), TerminationError> {
    let pgid = Pid::from_raw(group.as_raw() as libc::pid_t);
    killpg(pgid, Signal::SIGTERM).map_err(|source| TerminationError::Signal {
        group: group.as_raw(),
        source,
    })?;
    tracing::debug!(%group, "sent SIGTERM to process group");
    Ok(())
}

/// Check whether any process in the group still exists.
pub fn group_alive(group: GroupId) -> Option<bool> {
    let pgid = Pid::from_raw(group.as_raw() as libc::pid_t);
    match killpg(pgid, None::<Signal>) {
        Ok(()) => Some(true),
        // EPERM means the group exists but belongs to someone else
        Err(nix::errno::Errno::EPERM) => Some(true),
        Err(_) => Some(false),
    }
}

fn prepare_command(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            if new_session() < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Encapsulates unsafe setsid call
unsafe fn new_session() -> libc::pid_t {
    unsafe { libc::setsid() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until_gone(group: GroupId) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if group_alive(group) == Some(false) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }

    #[test]
    fn test_spawned_child_leads_its_own_group() {
        let invocation = TerminalCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 30".to_string()],
            current_dir: std::env::temp_dir(),
        };
        let launched = spawn_detached(&invocation).unwrap();
        assert_eq!(launched.group, GroupId(launched.pid));

        let pgid = nix::unistd::getpgid(Some(Pid::from_raw(launched.pid as libc::pid_t))).unwrap();
        assert_eq!(pgid.as_raw() as u32, launched.pid);

        terminate_group(launched.group).unwrap();
        assert!(wait_until_gone(launched.group));
    }

    #[test]
    fn test_terminate_unknown_group_fails() {
        // pid_max on Linux is at most 2^22, so this group cannot exist
        let err = terminate_group(GroupId(4_194_304 + 17)).unwrap_err();
        assert!(matches!(err, TerminationError::Signal { .. }));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let invocation = TerminalCommand {
            program: "definitely-not-a-terminal-emulator".to_string(),
            args: vec![],
            current_dir: std::env::temp_dir(),
        };
        let err = spawn_detached(&invocation).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
