//! Parses a request path into a [`Route`], enforcing the host whitelist.

use once_cell::sync::Lazy;
use regex::Regex;
use vcsmirror_core::HttpError;
use vcsmirror_vcs::VcsKind;

use crate::url::bisect_before_nth;

static PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(?P<n>\d+)/(?P<vcs>git|hg)/(?P<scheme>http|https|git)/(?P<host>[A-Za-z0-9.\-]+)/(?P<path>.*)$").expect("path grammar is a valid regex"));

/// The four post-refresh dispatch targets a route can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Delegate to the per-VCS CGI backend subprocess.
    Proxy,
    /// Read a single file at a revision.
    SingleFile,
    /// Read the first existing file from a candidate list at a revision.
    BatchFile,
    /// Compute per-line authorship over the mirror.
    Blame,
}

/// A fully parsed, whitelist-checked request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Which VCS the repository uses.
    pub vcs: VcsKind,
    /// The absolute clone URL recovered from the request path.
    pub clone_url: String,
    /// Canonical local identity: `host + "/" + cleaned repo path`.
    pub uri: String,
    /// Which handler should run after any required refresh.
    pub action: Action,
    /// The suffix of the request path after the repository boundary.
    pub extra_path: String,
}

/// Parses `path` against the request grammar and checks `host` against
/// `allowed_hosts`.
///
/// # Errors
/// - `bad-path` (404) if the grammar doesn't match at all.
/// - `bad-request` (400) if the leading path-component count isn't a
///   non-negative integer (the regex already guarantees digits, so this
///   only fires on overflow).
/// - `forbidden` (403) if the host isn't in `allowed_hosts`.
pub fn route(path: &str, allowed_hosts: &[String]) -> Result<Route, HttpError> {
    let captures = PATH_PATTERN.captures(path).ok_or_else(|| HttpError::bad_path("bad path"))?;

    let num_path_components: usize = captures["n"]
        .parse()
        .map_err(|_| HttpError::bad_request("first path component must be number of path components in repo"))?;

    let vcs_token = &captures["vcs"];
    let scheme = &captures["scheme"];
    let host_raw = &captures["host"];
    let rest = &captures["path"];

    let host = host_raw.to_lowercase();
    if !allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
        return Err(HttpError::forbidden("access to specified host is not allowed"));
    }

    let vcs: VcsKind = vcs_token.parse().map_err(|_| HttpError::bad_path("bad path"))?;

    let (repo_path_raw, extra_path) = bisect_before_nth(rest, '/', num_path_components);
    let cleaned = clean_path(&repo_path_raw);
    let clone_url = format!("{scheme}://{host}/{cleaned}");
    let uri = format!("{host}/{cleaned}");

    let action = if extra_path.starts_with("/v/") {
        Action::SingleFile
    } else if extra_path.starts_with("/v-batch/") {
        Action::BatchFile
    } else if extra_path.starts_with("/api/blame") {
        Action::Blame
    } else {
        Action::Proxy
    };

    Ok(Route { vcs, clone_url, uri, action, extra_path })
}

/// Collapses `//`, resolves `.`/`..`, and rejects attempts to escape above
/// the repository root, mirroring `filepath.Clean` applied to a path that
/// is always treated as rooted.
fn clean_path(raw: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}
