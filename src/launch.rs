//! Terminal launch strategies
//!
//! A [`Platform`] is chosen once at startup and turns "run this command in
//! that directory" into a concrete terminal invocation. [`TerminalLauncher`]
//! spawns it detached and later terminates the whole session by group id.

use crate::config::{LINUX_TERMINAL_CANDIDATES, LINUX_TERMINAL_FALLBACK};
use crate::error::{LaunchError, TerminationError};
use crate::platform::{self, TerminalCommand};
use crate::registry::{LaunchedProcess, ManagedProcess};
use std::path::Path;

/// Capability used by the orchestrator to start and stop service terminals.
pub trait Launcher {
    /// Open a detached terminal running `command` inside `working_dir`.
    fn launch(&self, command: &str, working_dir: &Path) -> Result<LaunchedProcess, LaunchError>;

    /// Terminate the terminal session and everything it spawned.
    fn terminate(&self, process: &ManagedProcess) -> Result<(), TerminationError>;

    /// Whether the session is still running, when the platform can tell.
    fn is_alive(&self, _process: &ManagedProcess) -> Option<bool> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// Graphical terminal emulator running `bash -c`.
    LinuxTerminal { emulator: String },
    /// Terminal.app driven through `osascript`.
    MacTerminal,
    /// New `cmd.exe` console window.
    WindowsConsole,
    Unsupported { os: String },
}

impl Platform {
    /// Strategy for the OS this binary runs on.
    pub fn detect(terminal: Option<&str>) -> Self {
        Self::for_os(std::env::consts::OS, terminal)
    }

    pub fn for_os(os: &str, terminal: Option<&str>) -> Self {
        match os {
            "linux" => {
                let emulator = terminal
                    .map(str::to_string)
                    .unwrap_or_else(probe_linux_terminal);
                if hands_off_to_server(&emulator) {
                    tracing::warn!(
                        %emulator,
                        "{} runs shells in a server process; Stop and Status cannot reach them. \
                         Set `terminal` to konsole or xterm for group control",
                        emulator
                    );
                }
                Platform::LinuxTerminal { emulator }
            }
            "macos" => Platform::MacTerminal,
            "windows" => Platform::WindowsConsole,
            other => Platform::Unsupported {
                os: other.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Platform::LinuxTerminal { .. } => "linux",
            Platform::MacTerminal => "macos",
            Platform::WindowsConsole => "windows",
            Platform::Unsupported { os } => os,
        }
    }

    /// Compose the terminal invocation for one service.
    pub fn invocation(
        &self,
        command: &str,
        working_dir: &Path,
    ) -> Result<TerminalCommand, LaunchError> {
        let dir = working_dir.display().to_string();
        let (program, args) = match self {
            Platform::LinuxTerminal { emulator } => {
                let script = format!("cd {} && {}; exec bash", shell_quote(&dir), command);
                let mut args: Vec<String> = linux_exec_args(emulator)
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect();
                args.extend(["bash".to_string(), "-c".to_string(), script]);
                (emulator.clone(), args)
            }
            Platform::MacTerminal => {
                let script = format!("cd {} && {}", shell_quote(&dir), command);
                let apple = format!(
                    "tell application \"Terminal\" to do script \"{}\"",
                    applescript_escape(&script)
                );
                ("osascript".to_string(), vec!["-e".to_string(), apple])
            }
            Platform::WindowsConsole => {
                // cmd strips the outermost pair of quotes and runs the rest
                let line = format!("\"cd /d \"{}\" && {}\"", dir, command);
                ("cmd".to_string(), vec!["/K".to_string(), line])
            }
            Platform::Unsupported { os } => {
                return Err(LaunchError::UnsupportedPlatform { os: os.clone() })
            }
        };

        Ok(TerminalCommand {
            program,
            args,
            current_dir: working_dir.to_path_buf(),
        })
    }
}

/// Launcher backed by real terminal windows.
#[derive(Debug, Clone)]
pub struct TerminalLauncher {
    platform: Platform,
}

impl TerminalLauncher {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn detect(terminal: Option<&str>) -> Self {
        Self::new(Platform::detect(terminal))
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl Launcher for TerminalLauncher {
    fn launch(&self, command: &str, working_dir: &Path) -> Result<LaunchedProcess, LaunchError> {
        let invocation = self.platform.invocation(command, working_dir)?;

        if !working_dir.is_dir() {
            return Err(LaunchError::InvalidWorkingDirectory {
                path: working_dir.to_path_buf(),
            });
        }

        let launched =
            platform::spawn_detached(&invocation).map_err(|source| LaunchError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        tracing::debug!(
            program = %invocation.program,
            pid = launched.pid,
            group = %launched.group,
            "terminal spawned"
        );
        Ok(launched)
    }

    fn terminate(&self, process: &ManagedProcess) -> Result<(), TerminationError> {
        if let Platform::Unsupported { os } = &self.platform {
            return Err(TerminationError::UnsupportedPlatform { os: os.clone() });
        }
        platform::terminate_group(process.group)
    }

    fn is_alive(&self, process: &ManagedProcess) -> Option<bool> {
        platform::group_alive(process.group)
    }
}

fn probe_linux_terminal() -> String {
    LINUX_TERMINAL_CANDIDATES
        .iter()
        .find(|candidate| which::which(candidate).is_ok())
        .unwrap_or(&LINUX_TERMINAL_FALLBACK)
        .to_string()
}

fn emulator_name(emulator: &str) -> &str {
    Path::new(emulator)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(emulator)
}

/// Arguments that make the emulator run the remaining ones as a program.
/// xfce4-terminal is kept out of its shared server so the shell stays in the
/// spawned group.
fn linux_exec_args(emulator: &str) -> &'static [&'static str] {
    match emulator_name(emulator) {
        "gnome-terminal" => &["--"],
        "xfce4-terminal" => &["--disable-server", "-x"],
        _ => &["-e"],
    }
}

/// Whether the spawned client exits after passing the shell to a server.
fn hands_off_to_server(emulator: &str) -> bool {
    emulator_name(emulator) == "gnome-terminal"
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', "\\\"")
}
