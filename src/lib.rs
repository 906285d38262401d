//! Sandbox Orchestrator Library
//!
//! Bootstraps the sandbox repositories and runs each service in its own
//! terminal window, tracking process groups so they can be stopped together.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod launch;
pub mod menu;
pub mod orchestrator;
pub mod platform;
pub mod prompt;
pub mod registry;
pub mod utils;

// Re-export commonly used types for convenience
pub use bootstrap::{BootstrapReport, Bootstrapper};
pub use config::SandboxConfig;
pub use error::{BootstrapError, ConfigError, LaunchError, OrchestratorError, TerminationError};
pub use launch::{Launcher, Platform, TerminalLauncher};
pub use menu::{Menu, MenuChoice};
pub use orchestrator::{Orchestrator, RunState, ServiceDescriptor, StartReport, StopReport};
pub use registry::{GroupId, LaunchedProcess, ManagedProcess, ProcessRegistry};
