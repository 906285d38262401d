//! Numbered operator menu
//!
//! A thin loop over the orchestrator and the bootstrapper. No error ends the
//! loop; only choice `0` (or end of input) does, after stopping all services.

use crate::bootstrap::{BootstrapReport, Bootstrapper};
use crate::config::SandboxConfig;
use crate::launch::Launcher;
use crate::orchestrator::{Orchestrator, StartReport, StopReport};
use crate::prompt::Prompt;
use console::style;

pub const MENU_OPTIONS: &[&str] = &[
    "1. Initialize repositories",
    "2. Start servers",
    "3. Refresh servers",
    "4. Stop servers",
    "5. Show status",
    "0. Exit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Initialize,
    Start,
    Refresh,
    Stop,
    Status,
    Exit,
    Invalid(String),
}

impl MenuChoice {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "1" => MenuChoice::Initialize,
            "2" => MenuChoice::Start,
            "3" => MenuChoice::Refresh,
            "4" => MenuChoice::Stop,
            "5" => MenuChoice::Status,
            "0" => MenuChoice::Exit,
            other => MenuChoice::Invalid(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuFlow {
    Continue,
    Exit,
}

pub struct Menu<L: Launcher> {
    orchestrator: Orchestrator<L>,
    bootstrapper: Bootstrapper,
    config: SandboxConfig,
}

impl<L: Launcher> Menu<L> {
    pub fn new(orchestrator: Orchestrator<L>, bootstrapper: Bootstrapper, config: SandboxConfig) -> Self {
        Self {
            orchestrator,
            bootstrapper,
            config,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<L> {
        &self.orchestrator
    }

    /// Prompt and dispatch until the operator exits.
    ///
    /// Input that cannot be read at all ends the loop through the exit path,
    /// so running services are still stopped.
    pub async fn run(&mut self, prompt: &mut dyn Prompt) {
        loop {
            print_options();
            let choice = match prompt.read_line("Enter your choice") {
                Ok(Some(input)) => MenuChoice::parse(&input),
                Ok(None) => {
                    tracing::debug!("end of input, exiting");
                    MenuChoice::Exit
                }
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::warn!("unreadable menu input: {}", err);
                    MenuChoice::Invalid(String::new())
                }
                Err(err) => {
                    tracing::error!("Failed to read input, stopping servers: {}", err);
                    MenuChoice::Exit
                }
            };

            if self.handle(choice, prompt).await == MenuFlow::Exit {
                return;
            }
        }
    }

    pub async fn handle(&mut self, choice: MenuChoice, prompt: &mut dyn Prompt) -> MenuFlow {
        match choice {
            MenuChoice::Initialize => {
                let report = self.bootstrapper.run(&self.config, prompt).await;
                print_bootstrap_report(&report);
            }
            MenuChoice::Start => match self.orchestrator.start() {
                Ok(report) => print_start_report(&report),
                Err(err) => println!("{} {}", style("✗").red(), err.user_message()),
            },
            MenuChoice::Refresh => match self.orchestrator.refresh() {
                Ok((stopped, started)) => {
                    print_stop_report(&stopped);
                    print_start_report(&started);
                }
                Err(err) => println!("{} {}", style("✗").red(), err.user_message()),
            },
            MenuChoice::Stop => print_stop_report(&self.orchestrator.stop()),
            MenuChoice::Status => self.print_status(),
            MenuChoice::Exit => {
                print_stop_report(&self.orchestrator.stop());
                println!("Exiting...");
                return MenuFlow::Exit;
            }
            MenuChoice::Invalid(input) => {
                tracing::debug!(%input, "invalid menu choice");
                println!("Invalid choice. Please try again.");
            }
        }
        MenuFlow::Continue
    }

    fn print_status(&self) {
        let status = self.orchestrator.status();
        if status.is_empty() {
            println!("No servers running");
            return;
        }
        for entry in status {
            let state = match entry.alive {
                Some(true) => style("running").green(),
                Some(false) => style("exited").yellow(),
                None => style("unknown").dim(),
            };
            println!(
                "  {:<24} pid {:<8} {:<8} since {}  {}",
                entry.process.name,
                entry.process.pid,
                state,
                entry.process.started_at.format("%H:%M:%S"),
                entry.process.working_dir.display()
            );
        }
    }
}

fn print_options() {
    println!("{}", style("Choose an option:").bold());
    for option in MENU_OPTIONS {
        println!("{}", option);
    }
}

fn print_start_report(report: &StartReport) {
    for name in &report.started {
        println!("{} Started {}", style("✓").green(), name);
    }
    for (name, err) in &report.failed {
        println!("{} Failed to start {}: {}", style("✗").red(), name, err.user_message());
    }
}

fn print_stop_report(report: &StopReport) {
    for (name, group) in &report.terminated {
        println!("{} Stopped {} (process {})", style("✓").green(), name, group);
    }
    for (name, group, err) in &report.failed {
        println!("{} Could not stop {} (process {}): {}", style("✗").red(), name, group, err);
    }
    if report.attempted() > 0 {
        println!("Stopped all processes");
    }
}

fn print_bootstrap_report(report: &BootstrapReport) {
    for (url, err) in &report.clone_failures {
        println!("{} {}: {}", style("✗").red(), url, err);
    }
    match &report.write_error {
        Some(err) => println!("{} Failed to create .env files: {}", style("✗").red(), err),
        None => println!("{} Successfully created .env files", style("✓").green()),
    }
    for (dir, err) in &report.install_failures {
        println!("{} {}: {}", style("✗").red(), dir.display(), err);
    }
    if report.is_clean() {
        println!("{} Repositories initialized", style("✓").green());
    }
}
