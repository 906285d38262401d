//! Error types for the sandbox orchestrator
//!
//! Each concern gets its own enum so callers can decide per failure whether
//! it is local to one service/repository or fatal to the whole operation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to launch a single service terminal.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No launch strategy exists for this operating system.
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    #[error("Working directory does not exist or is not a directory: {}", path.display())]
    InvalidWorkingDirectory { path: PathBuf },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Whether the error makes every further launch pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LaunchError::UnsupportedPlatform { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            LaunchError::UnsupportedPlatform { os } => format!(
                "Cannot open terminals on '{}'. Supported platforms: linux, macos, windows",
                os
            ),
            LaunchError::InvalidWorkingDirectory { path } => format!(
                "Directory {} is missing. Run option 1 to initialize repositories first",
                path.display()
            ),
            LaunchError::Spawn { program, source } => {
                if source.kind() == io::ErrorKind::NotFound {
                    format!("'{}' is not installed or not in PATH", program)
                } else {
                    format!("Could not start '{}': {}", program, source)
                }
            }
        }
    }
}

/// Failure to terminate one registered process group.
#[derive(Debug, Error)]
pub enum TerminationError {
    #[cfg(unix)]
    #[error("Failed to signal process group {group}: {source}")]
    Signal {
        group: u32,
        #[source]
        source: nix::Error,
    },

    #[error("taskkill failed for process tree {group}: {message}")]
    Taskkill { group: u32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: String },
}

/// Failure of one bootstrap step for one repository.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to switch {repo} to branch '{branch}': {source}")]
    Checkout {
        repo: String,
        branch: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    #[error("Dependency install failed in {}: {message}", path.display())]
    Install { path: PathBuf, message: String },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("Prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

/// Errors that abort a whole orchestrator operation.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: String },
}

impl OrchestratorError {
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::UnsupportedPlatform { os } => format!(
                "Servers cannot be started on '{}'. Supported platforms: linux, macos, windows",
                os
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config file {}: {source}", path.display())]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Duplicate service name in config: {name}")]
    DuplicateService { name: String },
}
