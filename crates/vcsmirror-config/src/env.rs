//! Environment variable configuration support.

use std::path::PathBuf;

/// The environment variables this server recognizes, lowest-precedence
/// layer above the built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsMirrorEnvVar {
    /// `VCSMIRROR_BIND` - HTTP bind address, e.g. `0.0.0.0:8080`.
    Bind,
    /// `VCSMIRROR_STORAGE_ROOT` - directory mirrors are stored under.
    StorageRoot,
    /// `VCSMIRROR_HOSTS` - comma-separated allowed clone hosts.
    Hosts,
    /// `GIT_HTTP_BACKEND` - path to the `git-http-backend` executable.
    GitHttpBackend,
    /// `PYTHON27` - path to the Python 2.7 interpreter used for `hgweb`.
    Python27,
    /// `VCSMIRROR_OFFLINE` - suppress all remote clone/update activity.
    Offline,
}

impl VcsMirrorEnvVar {
    /// The environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bind => "VCSMIRROR_BIND",
            Self::StorageRoot => "VCSMIRROR_STORAGE_ROOT",
            Self::Hosts => "VCSMIRROR_HOSTS",
            Self::GitHttpBackend => "GIT_HTTP_BACKEND",
            Self::Python27 => "PYTHON27",
            Self::Offline => "VCSMIRROR_OFFLINE",
        }
    }

    /// The raw string value, if set.
    #[must_use]
    pub fn get(self) -> Option<String> {
        std::env::var(self.as_str()).ok()
    }

    /// The value as a path, if set.
    #[must_use]
    pub fn as_path(self) -> Option<PathBuf> {
        self.get().map(PathBuf::from)
    }

    /// The value as a boolean (`1`/`true`/`yes`/`on`, case-insensitive), if set.
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        self.get().map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }
}

/// Snapshot of the recognized environment variables, read once at startup.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    /// `VCSMIRROR_BIND`.
    pub bind: Option<String>,
    /// `VCSMIRROR_STORAGE_ROOT`.
    pub storage_root: Option<PathBuf>,
    /// `VCSMIRROR_HOSTS`, split on commas.
    pub hosts: Option<Vec<String>>,
    /// `GIT_HTTP_BACKEND`.
    pub git_http_backend: Option<PathBuf>,
    /// `PYTHON27`.
    pub python27: Option<PathBuf>,
    /// `VCSMIRROR_OFFLINE`.
    pub offline: Option<bool>,
}

impl EnvConfig {
    /// Read configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind: VcsMirrorEnvVar::Bind.get(),
            storage_root: VcsMirrorEnvVar::StorageRoot.as_path(),
            hosts: VcsMirrorEnvVar::Hosts.get().map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            git_http_backend: VcsMirrorEnvVar::GitHttpBackend.as_path(),
            python27: VcsMirrorEnvVar::Python27.as_path(),
            offline: VcsMirrorEnvVar::Offline.as_bool(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names() {
        assert_eq!(VcsMirrorEnvVar::Bind.as_str(), "VCSMIRROR_BIND");
        assert_eq!(VcsMirrorEnvVar::StorageRoot.as_str(), "VCSMIRROR_STORAGE_ROOT");
        assert_eq!(VcsMirrorEnvVar::Hosts.as_str(), "VCSMIRROR_HOSTS");
        assert_eq!(VcsMirrorEnvVar::GitHttpBackend.as_str(), "GIT_HTTP_BACKEND");
        assert_eq!(VcsMirrorEnvVar::Python27.as_str(), "PYTHON27");
        assert_eq!(VcsMirrorEnvVar::Offline.as_str(), "VCSMIRROR_OFFLINE");
    }

    #[test]
    fn as_bool_accepts_common_truthy_spellings() {
        for v in ["1", "true", "TRUE", "yes", "on"] {
            std::env::set_var("VCSMIRROR_OFFLINE", v);
            assert_eq!(VcsMirrorEnvVar::Offline.as_bool(), Some(true), "failed for {v}");
        }
        std::env::remove_var("VCSMIRROR_OFFLINE");
    }

    #[test]
    fn hosts_split_on_commas_and_trimmed() {
        std::env::set_var("VCSMIRROR_HOSTS", "github.com, bitbucket.org ,gitlab.com");
        let cfg = EnvConfig::from_env();
        assert_eq!(
            cfg.hosts,
            Some(vec!["github.com".to_string(), "bitbucket.org".to_string(), "gitlab.com".to_string()])
        );
        std::env::remove_var("VCSMIRROR_HOSTS");
    }
}
