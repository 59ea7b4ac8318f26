//! Proxy action: builds the per-VCS CGI invocation descriptor.
//!
//! This module only decides *what* subprocess to run and with which
//! environment; [`crate::cgi`] is what actually spawns it and streams
//! stdin/stdout through to the HTTP connection.

use std::path::{Path, PathBuf};

use vcsmirror_core::HttpError;
use vcsmirror_vcs::VcsKind;

use crate::router::Route;

/// Everything the CGI relay needs to invoke the right backend for a proxied
/// request.
#[derive(Debug, Clone)]
pub struct CgiDescriptor {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Extra argv entries after the program itself.
    pub args: Vec<String>,
    /// Working directory for the subprocess.
    pub dir: PathBuf,
    /// Extra environment variables, beyond the standard CGI meta-variables
    /// the relay adds for every request.
    pub env: Vec<(String, String)>,
    /// `SCRIPT_NAME`/`PATH_INFO` equivalent: what the backend believes its
    /// own URL path is.
    pub script_path: String,
    /// `Root` equivalent for backends (like hgweb) that serve relative to a
    /// root other than the storage root.
    pub root: String,
}

/// Paths the proxy action needs to know about to build a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct ProxyConfig<'a> {
    /// Path to the `git-http-backend` executable.
    pub git_http_backend: &'a Path,
    /// Path to a Python 2.7 interpreter, used to launch hgweb.
    pub python27: &'a Path,
    /// The storage root all mirrors live under.
    pub storage_root: &'a Path,
}

/// One-liner that boots hgweb over CGI/WSGI for the repository named by the
/// `HG_REPO_DIR` environment variable.
const HGWEB_LAUNCHER: &str =
    "import os;from mercurial import demandimport;demandimport.enable();from mercurial.hgweb import hgweb,wsgicgi;application=hgweb(os.getenv('HG_REPO_DIR'));wsgicgi.launch(application)";

/// Build the CGI descriptor for proxying `route` into the mirror at `dir`.
///
/// # Errors
/// `internal` (500) if `dir` isn't nested under `cfg.storage_root` (it
/// always should be, since [`crate::storage::repo_dir`] built it there).
pub fn descriptor_for(route: &Route, dir: &Path, cfg: ProxyConfig<'_>) -> Result<CgiDescriptor, HttpError> {
    match route.vcs {
        VcsKind::Git => Ok(CgiDescriptor {
            program: cfg.git_http_backend.to_path_buf(),
            args: Vec::new(),
            dir: dir.to_path_buf(),
            env: vec![
                ("GIT_HTTP_EXPORT_ALL".to_string(), String::new()),
                ("GIT_PROJECT_ROOT".to_string(), cfg.storage_root.join(route.vcs.short_name()).display().to_string()),
            ],
            script_path: format!("/{}{}", route.uri, route.extra_path),
            root: String::new(),
        }),
        VcsKind::Hg => {
            let root_path = dir
                .strip_prefix(cfg.storage_root)
                .map_err(|_| HttpError::internal("failed to get root path"))?;
            Ok(CgiDescriptor {
                program: cfg.python27.to_path_buf(),
                args: vec!["-c".to_string(), HGWEB_LAUNCHER.to_string()],
                dir: dir.to_path_buf(),
                env: vec![("HG_REPO_DIR".to_string(), dir.display().to_string())],
                script_path: route.extra_path.clone(),
                root: format!("/{}", root_path.display()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Action;

    fn route(vcs: VcsKind) -> Route {
        Route {
            vcs,
            clone_url: "git://example.com/r".to_string(),
            uri: "example.com/r".to_string(),
            action: Action::Proxy,
            extra_path: "/info/refs".to_string(),
        }
    }

    #[test]
    fn git_descriptor_sets_export_all_and_project_root() {
        let cfg = ProxyConfig {
            git_http_backend: Path::new("/usr/lib/git-core/git-http-backend"),
            python27: Path::new("/usr/bin/python2.7"),
            storage_root: Path::new("/srv/mirrors"),
        };
        let d = descriptor_for(&route(VcsKind::Git), Path::new("/srv/mirrors/git/example.com/r"), cfg).unwrap();
        assert_eq!(d.program, Path::new("/usr/lib/git-core/git-http-backend"));
        assert!(d.env.contains(&("GIT_HTTP_EXPORT_ALL".to_string(), String::new())));
        assert!(d.env.contains(&("GIT_PROJECT_ROOT".to_string(), "/srv/mirrors/git".to_string())));
        assert_eq!(d.script_path, "/example.com/r/info/refs");
    }

    #[test]
    fn hg_descriptor_sets_repo_dir_and_relative_root() {
        let cfg = ProxyConfig {
            git_http_backend: Path::new("/usr/lib/git-core/git-http-backend"),
            python27: Path::new("/usr/bin/python2.7"),
            storage_root: Path::new("/srv/mirrors"),
        };
        let mut r = route(VcsKind::Hg);
        r.extra_path = "/rev/tip".to_string();
        let d = descriptor_for(&r, Path::new("/srv/mirrors/hg/example.com/r"), cfg).unwrap();
        assert_eq!(d.program, Path::new("/usr/bin/python2.7"));
        assert_eq!(d.env, vec![("HG_REPO_DIR".to_string(), "/srv/mirrors/hg/example.com/r".to_string())]);
        assert_eq!(d.root, "/hg/example.com/r");
        assert_eq!(d.script_path, "/rev/tip");
        assert_eq!(d.args[0], "-c");
    }
}
