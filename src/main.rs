use anyhow::Context;
use clap::Parser;
use sandbox_orchestrator::prompt::TerminalPrompt;
use sandbox_orchestrator::utils::logger::init_logger;
use sandbox_orchestrator::{Bootstrapper, Menu, Orchestrator, SandboxConfig, TerminalLauncher};
use std::path::PathBuf;
use std::process::ExitCode;

/// Initialize, start, refresh and stop the sandbox services.
#[derive(Parser, Debug)]
#[command(name = "sandbox", version, about)]
struct Cli {
    /// Configuration file (defaults to ./sandbox.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory the repositories are cloned into
    #[arg(long)]
    repos_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` (falls back to RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logger(cli.log_level.as_deref(), cli.log_file.clone()) {
        eprintln!("Failed to initialize logging: {:#}", err);
        return ExitCode::from(1);
    }

    match main_impl(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(1)
        }
    }
}

async fn main_impl(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = SandboxConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let repos_dir = config.resolve_repos_dir(cli.repos_dir.as_deref());

    let launcher = TerminalLauncher::detect(config.terminal.as_deref());
    tracing::info!(
        platform = launcher.platform().name(),
        repos_dir = %repos_dir.display(),
        "sandbox ready"
    );

    let orchestrator = Orchestrator::new(config.service_descriptors(&repos_dir), launcher);
    let bootstrapper = Bootstrapper::new(&repos_dir, config.install_timeout());
    let mut menu = Menu::new(orchestrator, bootstrapper, config);

    let mut prompt = TerminalPrompt::new();
    menu.run(&mut prompt).await;

    Ok(ExitCode::SUCCESS)
}
