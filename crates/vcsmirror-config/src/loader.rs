//! Configuration loader with defaults/environment/CLI precedence merging.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::debug;

use crate::env::EnvConfig;
use crate::error::{ConfigError, Result};

/// Where a setting's effective value came from, lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in defaults.
    Defaults = 0,
    /// Environment variables.
    Environment = 1,
    /// Command-line flags and positional arguments.
    Cli = 2,
}

impl ConfigSource {
    /// Human-readable description for display.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::Environment => "environment variables",
            Self::Cli => "command-line arguments",
        }
    }
}

/// Default storage root, matching the upstream server's `/tmp/vcsserver`
/// convention but namespaced to this project and resolved per-OS.
fn default_storage_root() -> PathBuf {
    #[cfg(windows)]
    {
        std::env::temp_dir().join("vcsmirror")
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/tmp/vcsmirror")
    }
}

/// Fully resolved settings the server runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP listener binds to.
    pub bind: SocketAddr,
    /// Directory mirrors are stored under.
    pub storage_root: PathBuf,
    /// Hosts requests are allowed to proxy to.
    pub allowed_hosts: Vec<String>,
    /// Path to the `git-http-backend` executable.
    pub git_http_backend: PathBuf,
    /// Path to the Python 2.7 interpreter used for the `hgweb` CGI script.
    pub python27: PathBuf,
    /// When true, `ensureFresh` is a no-op: no clone/update ever runs.
    pub offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".parse().expect("hardcoded default is valid"),
            storage_root: default_storage_root(),
            allowed_hosts: Vec::new(),
            git_http_backend: PathBuf::from("/usr/lib/git-core/git-http-backend"),
            python27: PathBuf::from("/usr/bin/python2.7"),
            offline: false,
        }
    }
}

/// Overrides collected from CLI flags and positional arguments.
///
/// Positional arguments are allowed clone hosts, matching the original
/// binary's "each positional argument is an allowed host" contract.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--bind` flag.
    pub bind: Option<String>,
    /// `--storage-root` flag.
    pub storage_root: Option<PathBuf>,
    /// `--git-http-backend` flag.
    pub git_http_backend: Option<PathBuf>,
    /// `--python27` flag.
    pub python27: Option<PathBuf>,
    /// `--offline` flag.
    pub offline: bool,
    /// Positional allowed-host arguments.
    pub hosts: Vec<String>,
}

/// Loads [`Settings`] from defaults, environment, and CLI overrides, in
/// that precedence order.
#[derive(Debug)]
pub struct ConfigLoader {
    env: EnvConfig,
}

impl ConfigLoader {
    /// Create a loader that reads the process environment once, up front.
    #[must_use]
    pub fn new() -> Self {
        Self { env: EnvConfig::from_env() }
    }

    /// The environment snapshot this loader is using.
    #[must_use]
    pub const fn env(&self) -> &EnvConfig {
        &self.env
    }

    /// Resolve final settings by layering environment over defaults, then
    /// CLI overrides over that.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] if the bind address doesn't
    /// parse, or [`ConfigError::NoHosts`] if no allowed hosts were given by
    /// either the environment or the CLI.
    pub fn resolve(&self, cli: &CliOverrides) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(ref bind) = self.env.bind {
            settings.bind = parse_bind(bind)?;
        }
        if let Some(ref root) = self.env.storage_root {
            settings.storage_root = root.clone();
        }
        if let Some(ref hosts) = self.env.hosts {
            settings.allowed_hosts = hosts.clone();
        }
        if let Some(ref backend) = self.env.git_http_backend {
            settings.git_http_backend = backend.clone();
        }
        if let Some(ref python) = self.env.python27 {
            settings.python27 = python.clone();
        }
        if let Some(offline) = self.env.offline {
            settings.offline = offline;
        }

        if let Some(ref bind) = cli.bind {
            settings.bind = parse_bind(bind)?;
        }
        if let Some(ref root) = cli.storage_root {
            settings.storage_root = root.clone();
        }
        if let Some(ref backend) = cli.git_http_backend {
            settings.git_http_backend = backend.clone();
        }
        if let Some(ref python) = cli.python27 {
            settings.python27 = python.clone();
        }
        if cli.offline {
            settings.offline = true;
        }
        if !cli.hosts.is_empty() {
            settings.allowed_hosts = cli.hosts.clone();
        }

        if settings.allowed_hosts.is_empty() {
            return Err(ConfigError::NoHosts);
        }

        debug!(
            bind = %settings.bind,
            storage_root = %settings.storage_root.display(),
            hosts = ?settings.allowed_hosts,
            offline = settings.offline,
            "resolved configuration"
        );
        Ok(settings)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bind(s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|e| ConfigError::invalid_value("bind", format!("{e}"), "use host:port, e.g. 0.0.0.0:8080"))
}
