//! Orchestrator scenarios driven through a recording launcher
//!
//! The launcher records every launch and terminate call in one shared log so
//! the tests can assert both outcomes and call order.

use pretty_assertions::assert_eq;
use sandbox_orchestrator::{
    GroupId, LaunchError, LaunchedProcess, Launcher, ManagedProcess, Orchestrator,
    OrchestratorError, Platform, RunState, ServiceDescriptor, TerminalLauncher, TerminationError,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Launch { command: String, dir: PathBuf },
    Terminate(GroupId),
}

#[derive(Default)]
struct RecordingLauncher {
    log: Rc<RefCell<Vec<Call>>>,
    next_pid: Cell<u32>,
    failing_commands: Vec<String>,
    failing_groups: Vec<GroupId>,
    unsupported: bool,
}

impl RecordingLauncher {
    fn failing_launch(mut self, command: &str) -> Self {
        self.failing_commands.push(command.to_string());
        self
    }

    fn failing_terminate(mut self, group: u32) -> Self {
        self.failing_groups.push(GroupId(group));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, command: &str, working_dir: &Path) -> Result<LaunchedProcess, LaunchError> {
        if self.unsupported {
            return Err(LaunchError::UnsupportedPlatform {
                os: "plan9".to_string(),
            });
        }
        self.log.borrow_mut().push(Call::Launch {
            command: command.to_string(),
            dir: working_dir.to_path_buf(),
        });
        if self.failing_commands.iter().any(|c| c == command) {
            return Err(LaunchError::Spawn {
                program: "gnome-terminal".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let pid = self.next_pid.get() + 1000;
        self.next_pid.set(pid);
        Ok(LaunchedProcess {
            pid,
            group: GroupId(pid),
        })
    }

    fn terminate(&self, process: &ManagedProcess) -> Result<(), TerminationError> {
        self.log.borrow_mut().push(Call::Terminate(process.group));
        if self.failing_groups.contains(&process.group) {
            return Err(TerminationError::Taskkill {
                group: process.group.as_raw(),
                message: "The process not found".to_string(),
            });
        }
        Ok(())
    }
}

fn scenario_services() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new("svcA", "run-a", "/tmp/a"),
        ServiceDescriptor::new("svcB", "run-b", "/tmp/b"),
    ]
}

fn five_services() -> Vec<ServiceDescriptor> {
    (1..=5)
        .map(|i| ServiceDescriptor::new(format!("svc{i}"), format!("run-{i}"), format!("/tmp/{i}")))
        .collect()
}

fn launched_commands(calls: &[Call]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::Launch { command, .. } => Some(command.clone()),
            Call::Terminate(_) => None,
        })
        .collect()
}

#[test]
fn all_launches_succeed_registry_matches_descriptor_order() {
    let mut orchestrator = Orchestrator::new(five_services(), RecordingLauncher::default());

    let report = orchestrator.start().unwrap();

    assert!(report.all_started());
    assert_eq!(
        orchestrator.registry().names(),
        vec!["svc1", "svc2", "svc3", "svc4", "svc5"]
    );
    assert_eq!(orchestrator.state(), RunState::Running);
}

#[test]
fn scenario_a_both_services_start_in_order() {
    let mut orchestrator = Orchestrator::new(scenario_services(), RecordingLauncher::default());

    orchestrator.start().unwrap();

    let entries = orchestrator.registry().all();
    assert_eq!(orchestrator.registry().names(), vec!["svcA", "svcB"]);
    assert_eq!(entries[0].command, "run-a");
    assert_eq!(entries[0].working_dir, PathBuf::from("/tmp/a"));
    assert_eq!(entries[1].working_dir, PathBuf::from("/tmp/b"));
    assert_eq!(
        orchestrator.launcher().calls(),
        vec![
            Call::Launch {
                command: "run-a".to_string(),
                dir: PathBuf::from("/tmp/a"),
            },
            Call::Launch {
                command: "run-b".to_string(),
                dir: PathBuf::from("/tmp/b"),
            },
        ]
    );
}

#[test]
fn scenario_b_first_launch_fails_second_still_registered() {
    let launcher = RecordingLauncher::default().failing_launch("run-a");
    let mut orchestrator = Orchestrator::new(scenario_services(), launcher);

    let report = orchestrator.start().unwrap();

    assert_eq!(orchestrator.registry().names(), vec!["svcB"]);
    assert_eq!(report.started, vec!["svcB"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "svcA");
    assert!(matches!(report.failed[0].1, LaunchError::Spawn { .. }));
}

#[test]
fn failure_in_the_middle_still_attempts_the_rest() {
    let launcher = RecordingLauncher::default().failing_launch("run-3");
    let mut orchestrator = Orchestrator::new(five_services(), launcher);

    orchestrator.start().unwrap();

    assert_eq!(
        launched_commands(&orchestrator.launcher().calls()),
        vec!["run-1", "run-2", "run-3", "run-4", "run-5"]
    );
    assert_eq!(
        orchestrator.registry().names(),
        vec!["svc1", "svc2", "svc4", "svc5"]
    );
}

#[test]
fn scenario_c_stop_terminates_recorded_groups_in_registry_order() {
    let mut orchestrator = Orchestrator::new(scenario_services(), RecordingLauncher::default());
    orchestrator.start().unwrap();
    let recorded: Vec<GroupId> = orchestrator
        .registry()
        .all()
        .iter()
        .map(|p| p.group)
        .collect();

    let report = orchestrator.stop();

    let terminations: Vec<Call> = orchestrator.launcher().calls()[2..].to_vec();
    assert_eq!(
        terminations,
        vec![Call::Terminate(recorded[0]), Call::Terminate(recorded[1])]
    );
    assert_eq!(
        report.terminated,
        vec![
            ("svcA".to_string(), recorded[0]),
            ("svcB".to_string(), recorded[1]),
        ]
    );
    assert_eq!(orchestrator.state(), RunState::Idle);
}

#[test]
fn stop_failure_does_not_skip_remaining_entries() {
    // pids are handed out as 1000, 2000, 3000, ...
    let launcher = RecordingLauncher::default().failing_terminate(2000);
    let mut orchestrator = Orchestrator::new(five_services(), launcher);
    orchestrator.start().unwrap();

    let report = orchestrator.stop();

    assert_eq!(report.attempted(), 5);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "svc2");
    let terminated: Vec<_> = orchestrator
        .launcher()
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Terminate(_)))
        .collect();
    assert_eq!(terminated.len(), 5);
}

#[test]
fn refresh_dispatches_every_termination_before_any_launch() {
    let mut orchestrator = Orchestrator::new(five_services(), RecordingLauncher::default());
    orchestrator.start().unwrap();
    let first_start_calls = orchestrator.launcher().calls().len();

    orchestrator.refresh().unwrap();

    let refresh_calls = orchestrator.launcher().calls()[first_start_calls..].to_vec();
    let last_terminate = refresh_calls
        .iter()
        .rposition(|call| matches!(call, Call::Terminate(_)))
        .unwrap();
    let first_launch = refresh_calls
        .iter()
        .position(|call| matches!(call, Call::Launch { .. }))
        .unwrap();
    assert_eq!(last_terminate, 4);
    assert_eq!(first_launch, 5);
    assert_eq!(orchestrator.registry().len(), 5);
}

#[test]
fn start_after_stop_does_not_resurrect_stale_entries() {
    let mut orchestrator = Orchestrator::new(scenario_services(), RecordingLauncher::default());
    orchestrator.start().unwrap();
    orchestrator.stop();
    orchestrator.start().unwrap();

    let groups: Vec<u32> = orchestrator
        .registry()
        .all()
        .iter()
        .map(|p| p.group.as_raw())
        .collect();
    assert_eq!(groups, vec![3000, 4000]);

    // a second stop only targets the live generation
    orchestrator.stop();
    let terminated: Vec<Call> = orchestrator
        .launcher()
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Terminate(_)))
        .collect();
    assert_eq!(
        terminated,
        vec![
            Call::Terminate(GroupId(1000)),
            Call::Terminate(GroupId(2000)),
            Call::Terminate(GroupId(3000)),
            Call::Terminate(GroupId(4000)),
        ]
    );
}

#[test]
fn unsupported_platform_aborts_start() {
    let launcher = RecordingLauncher {
        unsupported: true,
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::new(scenario_services(), launcher);

    let err = orchestrator.start().unwrap_err();

    assert!(matches!(err, OrchestratorError::UnsupportedPlatform { .. }));
    assert!(orchestrator.registry().is_empty());
    assert!(orchestrator.launcher().calls().is_empty());
}

#[test]
fn unsupported_platform_launcher_performs_no_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = TerminalLauncher::new(Platform::for_os("solaris", None));
    let mut orchestrator = Orchestrator::new(
        vec![ServiceDescriptor::new("svcA", "run-a", dir.path())],
        launcher,
    );

    let err = orchestrator.start().unwrap_err();
    assert!(err.user_message().contains("solaris"));
    assert!(orchestrator.registry().is_empty());
}

#[test]
fn missing_working_directories_are_skipped_per_service() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = TerminalLauncher::new(Platform::LinuxTerminal {
        emulator: "definitely-not-a-terminal-emulator".to_string(),
    });
    let mut orchestrator = Orchestrator::new(
        vec![
            ServiceDescriptor::new("svcA", "run-a", dir.path().join("absent-a")),
            ServiceDescriptor::new("svcB", "run-b", dir.path().join("absent-b")),
        ],
        launcher,
    );

    let report = orchestrator.start().unwrap();

    assert!(report.started.is_empty());
    assert_eq!(report.failed.len(), 2);
    assert!(report
        .failed
        .iter()
        .all(|(_, err)| matches!(err, LaunchError::InvalidWorkingDirectory { .. })));
}
