//! Sandbox configuration
//!
//! Built-in defaults describe the buyer-side sandbox: the repositories to
//! clone, the env files the engines need, and the three services started by
//! the menu. A `sandbox.toml` file can override any of them.

use crate::error::ConfigError;
use crate::orchestrator::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "sandbox.toml";
pub const DEFAULT_REPOS_DIR: &str = "repos";
pub const INSTALL_TIMEOUT_DEFAULT: Duration = Duration::from_secs(10 * 60);

/// Linux terminal emulators probed in order when none is configured.
///
/// Emulators that keep the shell inside the spawned process group come first;
/// gnome-terminal hands its window to `gnome-terminal-server`, so a stop can
/// only reach the already exited client.
pub const LINUX_TERMINAL_CANDIDATES: &[&str] = &[
    "konsole",
    "xterm",
    "xfce4-terminal",
    "gnome-terminal",
    "x-terminal-emulator",
];
pub const LINUX_TERMINAL_FALLBACK: &str = "gnome-terminal";

pub const DEFAULT_REPOSITORIES: &[&str] = &[
    "https://github.com/ONDC-Official/buyer-mock-config.git",
    "https://github.com/ONDC-Official/seller-mock-config.git",
    "https://github.com/ONDC-Official/protocol-server-config.git",
    "https://github.com/mofahsan/sandbox-ui.git",
    "https://github.com/ONDC-Official/buyer-mock-engine.git",
    "https://github.com/ONDC-Official/seller-mock-engine.git",
    "https://github.com/ONDC-Official/protocol-server-engine.git",
];

// Written byte for byte, trailing spaces included.
const BUYER_MOCK_ENV: &str = concat!(
    "PORT = 8000 \n",
    "CONFIG_URL = \"https://raw.githubusercontent.com/ONDC-Official/buyer-mock-config/FIS-PRMAAN-dev/build/build.json\" \n",
    "PROTOCOL_SERVER_BASE_URL = \"http://localhost:80/\"  ",
);

const PROTOCOL_SERVER_ENV: &str = concat!(
    "config_url= https://raw.githubusercontent.com/ONDC-Official/protocol-server-config/Mobility/build/build.json\n",
    "PORT = 80\n",
    "BUSINESS_SERVER_IS_SYNC = false\n",
    "IS_VERIFY_AUTH = false\n",
    "SERVER_TYPE = BAP\n",
    "SUBSCRIBER_URL = https://325e-103-173-93-158.ngrok-free.app \n",
    "BACKEND_SERVER_URL= http://localhost:8000\n",
    "GATEWAY_URL = \"https://staging.gateway.proteantech.in/\"\n",
    "PRIVATE_KEY=Un205TSOdDXTq8E+N/sJOLJ8xalnzZ1EUP1Wcv23sKx70fOfFd4Q2bzfpzPQ+6XZhZv65SH7Pr6YMk8SuFHpxQ==\n",
    "SUBSCRIBER_ID=mobility-staging.ondc.org\n",
    "SUBSCRIBER_UNIQUE_KEY=UK-MOBILITY\n",
    "is_loadConfigFromGit = true\n",
    "DATABASE_CONNECTION_STRING = mongodb://localhost:27017/protocolServerBAP\n",
    "USE_DB = false\n",
    "VERSION = 1.0.0",
);

/// A service started in its own terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub command: String,
    /// Directory relative to `repos_dir` (absolute paths are kept as-is).
    pub dir: String,
}

/// A file written verbatim during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFile {
    /// Path relative to `repos_dir`.
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub repos_dir: String,
    pub repositories: Vec<String>,
    pub services: Vec<ServiceConfig>,
    pub env_files: Vec<EnvFile>,
    /// Linux terminal emulator; probed from PATH when unset.
    pub terminal: Option<String>,
    pub install_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            repos_dir: DEFAULT_REPOS_DIR.to_string(),
            repositories: DEFAULT_REPOSITORIES.iter().map(|s| s.to_string()).collect(),
            services: vec![
                ServiceConfig {
                    name: "buyer-mock-engine".to_string(),
                    command: "npm run dev".to_string(),
                    dir: "buyer-mock-engine".to_string(),
                },
                ServiceConfig {
                    name: "protocol-server-engine".to_string(),
                    command: "npm run dev:buyer".to_string(),
                    dir: "protocol-server-engine".to_string(),
                },
                ServiceConfig {
                    name: "sandbox-ui".to_string(),
                    command: "npm run start".to_string(),
                    dir: "sandbox-ui".to_string(),
                },
            ],
            env_files: vec![
                EnvFile {
                    path: "buyer-mock-engine/.env".to_string(),
                    contents: BUYER_MOCK_ENV.to_string(),
                },
                EnvFile {
                    path: "protocol-server-engine/buyer.mob.env".to_string(),
                    contents: PROTOCOL_SERVER_ENV.to_string(),
                },
            ],
            terminal: None,
            install_timeout_secs: INSTALL_TIMEOUT_DEFAULT.as_secs(),
        }
    }
}

impl SandboxConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `./sandbox.toml` is used when
    /// present and the built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.to_path_buf(),
                    });
                }
                Self::from_file(path)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::InvalidFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService {
                    name: service.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Absolute repositories root, honouring an override from the command line.
    pub fn resolve_repos_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        let raw = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from(shellexpand::tilde(&self.repos_dir).as_ref()),
        };
        absolutize(raw)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Services in configured order with working directories resolved.
    pub fn service_descriptors(&self, repos_dir: &Path) -> Vec<ServiceDescriptor> {
        self.services
            .iter()
            .map(|service| {
                let dir = PathBuf::from(shellexpand::tilde(&service.dir).as_ref());
                let working_dir = if dir.is_absolute() {
                    dir
                } else {
                    repos_dir.join(dir)
                };
                ServiceDescriptor::new(&service.name, &service.command, working_dir)
            })
            .collect()
    }

    /// Local checkout directory of every configured repository.
    pub fn repository_dirs(&self, repos_dir: &Path) -> Vec<PathBuf> {
        self.repositories
            .iter()
            .map(|url| repos_dir.join(repo_name(url)))
            .collect()
    }
}

/// Directory name git uses for a clone URL: last path segment without `.git`.
pub fn repo_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches(['/', '\\']);
    let last = trimmed.rsplit(['/', '\\', ':']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last)
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
