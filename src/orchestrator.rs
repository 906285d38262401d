//! Start, stop and refresh of the sandbox services
//!
//! The orchestrator owns the service list, the launcher and the registry.
//! Every per-service failure is logged and recorded in a report; only an
//! unsupported platform aborts a start.

use crate::error::{LaunchError, OrchestratorError, TerminationError};
use crate::launch::Launcher;
use crate::registry::{GroupId, ManagedProcess, ProcessRegistry};
use chrono::Utc;
use std::path::PathBuf;

/// A service to start: label, command line and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub command: String,
    pub working_dir: PathBuf,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_dir: working_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

#[derive(Debug, Default)]
pub struct StartReport {
    /// Names launched in this call, in order.
    pub started: Vec<String>,
    pub failed: Vec<(String, LaunchError)>,
}

impl StartReport {
    pub fn all_started(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct StopReport {
    /// Groups a termination request was delivered to, in registry order.
    pub terminated: Vec<(String, GroupId)>,
    pub failed: Vec<(String, GroupId, TerminationError)>,
}

impl StopReport {
    pub fn attempted(&self) -> usize {
        self.terminated.len() + self.failed.len()
    }
}

/// One line of the status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub process: ManagedProcess,
    pub alive: Option<bool>,
}

pub struct Orchestrator<L: Launcher> {
    services: Vec<ServiceDescriptor>,
    launcher: L,
    registry: ProcessRegistry,
}

impl<L: Launcher> Orchestrator<L> {
    pub fn new(services: Vec<ServiceDescriptor>, launcher: L) -> Self {
        Self {
            services,
            launcher,
            registry: ProcessRegistry::new(),
        }
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn state(&self) -> RunState {
        if self.registry.is_empty() {
            RunState::Idle
        } else {
            RunState::Running
        }
    }

    /// Launch every service in list order.
    ///
    /// A failed launch is logged and skipped; the remaining services are still
    /// attempted. An unsupported platform stops the whole call.
    pub fn start(&mut self) -> Result<StartReport, OrchestratorError> {
        if !self.registry.is_empty() {
            tracing::warn!(
                running = self.registry.len(),
                "starting services while previous ones are still registered"
            );
        }

        let mut report = StartReport::default();
        for service in &self.services {
            tracing::info!(service = %service.name, "Starting {}...", service.name);

            match self.launcher.launch(&service.command, &service.working_dir) {
                Ok(launched) => {
                    tracing::info!(
                        service = %service.name,
                        pid = launched.pid,
                        group = %launched.group,
                        "service terminal opened"
                    );
                    self.registry.append(ManagedProcess::new(
                        &service.name,
                        &service.command,
                        &service.working_dir,
                        launched,
                        Utc::now(),
                    ));
                    report.started.push(service.name.clone());
                }
                Err(LaunchError::UnsupportedPlatform { os }) => {
                    tracing::error!(%os, "unsupported platform, aborting start");
                    return Err(OrchestratorError::UnsupportedPlatform { os });
                }
                Err(err) => {
                    tracing::error!(service = %service.name, "Failed to start {}: {}", service.name, err);
                    report.failed.push((service.name.clone(), err));
                }
            }
        }

        tracing::info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "start finished"
        );
        Ok(report)
    }

    /// Request termination of every registered service, then clear the
    /// registry. Does not wait for the processes to exit.
    pub fn stop(&mut self) -> StopReport {
        let mut report = StopReport::default();

        for process in self.registry.all() {
            match self.launcher.terminate(process) {
                Ok(()) => {
                    tracing::info!(service = %process.name, group = %process.group, "Process {} terminated", process.group);
                    report.terminated.push((process.name.clone(), process.group));
                }
                Err(err) => {
                    tracing::error!(
                        service = %process.name,
                        group = %process.group,
                        "Error terminating process {}: {}",
                        process.group,
                        err
                    );
                    report
                        .failed
                        .push((process.name.clone(), process.group, err));
                }
            }
        }

        self.registry.clear();
        tracing::info!(attempted = report.attempted(), "Stopped all processes");
        report
    }

    /// Stop everything, then start everything again.
    pub fn refresh(&mut self) -> Result<(StopReport, StartReport), OrchestratorError> {
        let stopped = self.stop();
        let started = self.start()?;
        Ok((stopped, started))
    }

    pub fn status(&self) -> Vec<ServiceStatus> {
        self.registry
            .all()
            .iter()
            .map(|process| ServiceStatus {
                alive: self.launcher.is_alive(process),
                process: process.clone(),
            })
            .collect()
    }
}
