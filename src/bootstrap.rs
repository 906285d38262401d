//! Repository bootstrap: clone, switch branch, write env files, install
//! dependencies.
//!
//! Every step is isolated per repository; a failure is logged and the next
//! repository is processed. Nothing here shares state with the orchestrator.

use crate::config::{repo_name, EnvFile, SandboxConfig};
use crate::error::BootstrapError;
use crate::prompt::Prompt;
use git2::{build::CheckoutBuilder, BranchType, Repository};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub clone_failures: Vec<(String, BootstrapError)>,
    pub write_error: Option<BootstrapError>,
    pub install_failures: Vec<(PathBuf, BootstrapError)>,
}

impl BootstrapReport {
    pub fn is_clean(&self) -> bool {
        self.clone_failures.is_empty()
            && self.write_error.is_none()
            && self.install_failures.is_empty()
    }
}

pub struct Bootstrapper {
    repos_dir: PathBuf,
    install_timeout: Duration,
    install_program: String,
    install_args: Vec<String>,
}

impl Bootstrapper {
    pub fn new(repos_dir: impl Into<PathBuf>, install_timeout: Duration) -> Self {
        Self {
            repos_dir: repos_dir.into(),
            install_timeout,
            install_program: "npm".to_string(),
            install_args: vec!["install".to_string()],
        }
    }

    /// Replace `npm install` with another dependency command.
    pub fn with_install_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.install_program = program.into();
        self.install_args = args;
        self
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Initialize, env files and dependency install in one pass.
    pub async fn run(&self, config: &SandboxConfig, prompt: &mut dyn Prompt) -> BootstrapReport {
        let clone_failures = self.clone_all(&config.repositories, prompt).await;
        let write_error = self.write_fixed_files(&config.env_files).await.err();
        let install_failures = self
            .install_dependencies(&config.repository_dirs(&self.repos_dir))
            .await;

        let report = BootstrapReport {
            clone_failures,
            write_error,
            install_failures,
        };
        tracing::info!(
            clone_failures = report.clone_failures.len(),
            install_failures = report.install_failures.len(),
            env_files_written = report.write_error.is_none(),
            "bootstrap finished"
        );
        report
    }

    /// Clone each repository into the repos directory and optionally switch it
    /// to a branch chosen by the operator.
    ///
    /// Repositories whose directory already exists are left untouched.
    pub async fn clone_all(
        &self,
        urls: &[String],
        prompt: &mut dyn Prompt,
    ) -> Vec<(String, BootstrapError)> {
        let mut failures = Vec::new();

        if let Err(source) = tokio::fs::create_dir_all(&self.repos_dir).await {
            tracing::error!(dir = %self.repos_dir.display(), "Failed to create repos directory: {}", source);
            let err = BootstrapError::WriteFile {
                path: self.repos_dir.clone(),
                source,
            };
            // nothing can be cloned without the target directory
            if let Some(url) = urls.first() {
                failures.push((url.clone(), err));
            }
            return failures;
        }

        for url in urls {
            let name = repo_name(url).to_string();
            let target = self.repos_dir.join(&name);

            if target.exists() {
                tracing::info!(repo = %name, "{} already exists, skipping clone", target.display());
                continue;
            }

            if let Err(err) = clone_repository(url, &target).await {
                tracing::error!(repo = %name, "Failed to clone or switch branch for {}: {}", url, err);
                failures.push((url.clone(), err));
                continue;
            }
            tracing::info!(repo = %name, "Successfully cloned {}", url);

            let branch = match prompt.read_line(&format!("Enter branch name to switch to for {name}")) {
                Ok(Some(branch)) => branch,
                Ok(None) => String::new(),
                Err(err) => {
                    failures.push((url.clone(), BootstrapError::Prompt(err)));
                    continue;
                }
            };
            if branch.is_empty() {
                continue;
            }

            match checkout_branch(&target, &branch) {
                Ok(()) => {
                    tracing::info!(repo = %name, "Successfully switched to branch {} in {}", branch, name)
                }
                Err(source) => {
                    let err = BootstrapError::Checkout {
                        repo: name.clone(),
                        branch,
                        source,
                    };
                    tracing::error!(repo = %name, "{}", err);
                    failures.push((url.clone(), err));
                }
            }
        }

        failures
    }

    /// Write each file relative to the repos directory, creating parent
    /// directories. All files are attempted; the first failure is returned.
    pub async fn write_fixed_files(&self, files: &[EnvFile]) -> Result<(), BootstrapError> {
        let mut first_error = None;

        for file in files {
            let path = self.repos_dir.join(&file.path);
            if let Err(err) = write_file(&path, &file.contents).await {
                tracing::error!("Failed to create env file: {}", err);
                first_error.get_or_insert(err);
            } else {
                tracing::info!(path = %path.display(), "env file written");
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run the dependency install command in every directory.
    pub async fn install_dependencies(&self, dirs: &[PathBuf]) -> Vec<(PathBuf, BootstrapError)> {
        let mut failures = Vec::new();

        let program = match which::which(&self.install_program) {
            Ok(path) => path,
            Err(_) => {
                tracing::error!("'{}' not found in PATH", self.install_program);
                for dir in dirs {
                    failures.push((
                        dir.clone(),
                        BootstrapError::ToolNotFound {
                            tool: self.install_program.clone(),
                        },
                    ));
                }
                return failures;
            }
        };

        for dir in dirs {
            match self.install_in(&program, dir).await {
                Ok(()) => tracing::info!(dir = %dir.display(), "Successfully installed dependencies"),
                Err(err) => {
                    tracing::error!(dir = %dir.display(), "Failed to install dependencies: {}", err);
                    failures.push((dir.clone(), err));
                }
            }
        }

        failures
    }

    async fn install_in(&self, program: &Path, dir: &Path) -> Result<(), BootstrapError> {
        if !dir.is_dir() {
            return Err(BootstrapError::Install {
                path: dir.to_path_buf(),
                message: "directory does not exist".to_string(),
            });
        }

        let mut command = Command::new(program);
        command
            .args(&self.install_args)
            .current_dir(dir)
            .kill_on_drop(true);

        let status = tokio::time::timeout(self.install_timeout, command.status())
            .await
            .map_err(|_| BootstrapError::Timeout {
                operation: format!("{} {}", self.install_program, self.install_args.join(" ")),
                timeout_secs: self.install_timeout.as_secs(),
            })?
            .map_err(|e| BootstrapError::Install {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(BootstrapError::Install {
                path: dir.to_path_buf(),
                message: format!("{} exited with {}", self.install_program, status),
            });
        }
        Ok(())
    }
}

async fn clone_repository(url: &str, target: &Path) -> Result<(), BootstrapError> {
    let owned_url = url.to_string();
    let owned_target = target.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        Repository::clone(&owned_url, &owned_target).map(|_| ())
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(BootstrapError::Clone {
            url: url.to_string(),
            source,
        }),
        Err(join_err) => Err(BootstrapError::Clone {
            url: url.to_string(),
            source: git2::Error::from_str(&join_err.to_string()),
        }),
    }
}

/// Check out `branch`, creating a local tracking branch from `origin/<branch>`
/// when only the remote one exists.
fn checkout_branch(repo_path: &Path, branch: &str) -> Result<(), git2::Error> {
    let repo = Repository::open(repo_path)?;
    let remote_name = format!("origin/{branch}");

    let local = match repo.find_branch(branch, BranchType::Local) {
        Ok(local) => local,
        Err(_) => {
            let remote = repo.find_branch(&remote_name, BranchType::Remote)?;
            let commit = remote.get().peel_to_commit()?;
            let mut local = repo.branch(branch, &commit, false)?;
            local.set_upstream(Some(&remote_name))?;
            local
        }
    };

    let refname = local
        .get()
        .name()
        .ok_or_else(|| git2::Error::from_str("branch name is not valid UTF-8"))?
        .to_string();
    repo.set_head(&refname)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

async fn write_file(path: &Path, contents: &str) -> Result<(), BootstrapError> {
    let to_err = |source| BootstrapError::WriteFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(to_err)?;
    }
    tokio::fs::write(path, contents).await.map_err(to_err)
}
