use super::TerminalCommand;
use crate::error::TerminationError;
use crate::registry::{GroupId, LaunchedProcess};
use ::windows::core::{PCWSTR, PWSTR};
use ::windows::Win32::Foundation::{CloseHandle, BOOL};
use ::windows::Win32::System::Threading::{
    CreateProcessW, CREATE_NEW_CONSOLE, CREATE_NEW_PROCESS_GROUP, PROCESS_CREATION_FLAGS,
    PROCESS_INFORMATION, STARTUPINFOW,
};
use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::process::{Command, Stdio};

/// Open a new console window running the invocation.
///
/// `std::process::Command` always hands the child redirected std handles,
/// which would leave the new console blank, so the process is created
/// directly with a startup info that inherits nothing.
pub fn spawn_detached(invocation: &TerminalCommand) -> io::Result<LaunchedProcess> {
    let mut command_line = wide(OsStr::new(&command_line(invocation)));
    let current_dir = wide(invocation.current_dir.as_os_str());
    let startup = startup_info();
    let mut info = PROCESS_INFORMATION::default();

    // SAFETY: every pointer refers to a live, NUL-terminated buffer or a
    // struct owned by this frame for the duration of the call.
    unsafe {
        CreateProcessW(
            PCWSTR::null(),
            PWSTR(command_line.as_mut_ptr()),
            None,
            None,
            BOOL::from(false),
            creation_flags(),
            None,
            PCWSTR(current_dir.as_ptr()),
            &startup,
            &mut info,
        )
    }
    .map_err(|_| io::Error::last_os_error())?;

    // The console owns itself from here; only the pid is kept.
    unsafe {
        let _ = CloseHandle(info.hThread);
        let _ = CloseHandle(info.hProcess);
    }

    Ok(LaunchedProcess {
        pid: info.dwProcessId,
        group: GroupId(info.dwProcessId),
    })
}

/// Force-kill the console process and its whole tree.
pub fn terminate_group(group: GroupId) -> Result<(), TerminationError> {
    let output = Command::new("taskkill")
        .args(["/PID", &group.to_string(), "/T", "/F"])
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(TerminationError::Taskkill {
            group: group.as_raw(),
            message: if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            },
        });
    }

    tracing::debug!(%group, "taskkill terminated process tree");
    Ok(())
}

/// Liveness is not probed on Windows.
pub fn group_alive(_group: GroupId) -> Option<bool> {
    None
}

fn creation_flags() -> PROCESS_CREATION_FLAGS {
    CREATE_NEW_CONSOLE | CREATE_NEW_PROCESS_GROUP
}

/// Startup info without `STARTF_USESTDHANDLES`: the new console supplies its
/// own input and output.
fn startup_info() -> STARTUPINFOW {
    STARTUPINFOW {
        cb: std::mem::size_of::<STARTUPINFOW>() as u32,
        ..Default::default()
    }
}

/// Program and arguments joined verbatim; `cmd.exe` does its own quote
/// parsing.
fn command_line(invocation: &TerminalCommand) -> String {
    let program = if invocation.program.contains(' ') {
        format!("\"{}\"", invocation.program)
    } else {
        invocation.program.clone()
    };
    std::iter::once(program)
        .chain(invocation.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(std::iter::once(0)).collect()
}
