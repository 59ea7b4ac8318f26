//! Bidirectional mapping between clone URLs and opaque request paths.
//!
//! This module is `pub` rather than buried inside the router: applications
//! that proxy repositories through this server construct request paths with
//! [`clone_path`], [`file_path`], and [`batch_files_path`] instead of
//! duplicating the encoding, the same way the original `url.go` shipped as
//! public API for embedding applications.

use url::form_urlencoded;

/// Splits `s` into two strings at the `n`-th occurrence of `sep`, with the
/// separator itself starting the second half.
///
/// `bisect_before_nth("a/b/c/d", '/', 2) == ("a/b", "/c/d")`. If `sep`
/// occurs fewer than `n` times, the whole string is the first half.
#[must_use]
pub fn bisect_before_nth(s: &str, sep: char, n: usize) -> (String, String) {
    let mut seen = 0;
    for (i, c) in s.char_indices() {
        if c == sep {
            seen += 1;
            if seen == n {
                return (s[..i].to_string(), s[i..].to_string());
            }
        }
    }
    (s.to_string(), String::new())
}

/// The request path on this server that maps to a clone URL.
///
/// `path` must be the URL path component (starting with `/`); `vcs` is the
/// short VCS name (`"git"` or `"hg"`); `scheme` is the clone URL's scheme.
#[must_use]
pub fn clone_path(vcs: &str, scheme: &str, host: &str, path: &str) -> String {
    let num_path_components = path.matches('/').count();
    format!("/{num_path_components}/{vcs}/{scheme}/{host}{path}")
}

/// The request path that maps to `file` at `revision` inside the repository
/// identified by `(vcs, scheme, host, path)`.
#[must_use]
pub fn file_path(vcs: &str, scheme: &str, host: &str, path: &str, revision: &str, file: &str) -> String {
    format!("{}/v/{revision}/{file}", clone_path(vcs, scheme, host, path))
}

/// The request path (including query string) that maps to a first-exist
/// batch read of `files` at `revision`.
#[must_use]
pub fn batch_files_path(vcs: &str, scheme: &str, host: &str, path: &str, revision: &str, files: &[&str]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for f in files {
        query.append_pair("file", f);
    }
    query.append_pair("return", "first-exist");
    format!("{}/v-batch/{revision}?{}", clone_path(vcs, scheme, host, path), query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisect_before_nth_matches_spec_examples() {
        assert_eq!(bisect_before_nth("a/b/c/d", '/', 2), ("a/b".to_string(), "/c/d".to_string()));
        assert_eq!(bisect_before_nth("a/b", '/', 2), ("a/b".to_string(), String::new()));
    }

    #[test]
    fn clone_path_matches_spec_examples() {
        assert_eq!(clone_path("git", "git", "example.com", "/foo.git"), "/1/git/git/example.com/foo.git");
        assert_eq!(
            clone_path("git", "https", "example.com", "/foo/bar.git"),
            "/2/git/https/example.com/foo/bar.git"
        );
    }

    #[test]
    fn file_path_matches_spec_example() {
        assert_eq!(
            file_path("git", "https", "example.com", "/foo/bar.git", "1234abcdef", "my/file.txt"),
            "/2/git/https/example.com/foo/bar.git/v/1234abcdef/my/file.txt"
        );
    }

    #[test]
    fn batch_files_path_contains_all_files_and_first_exist() {
        let path = batch_files_path("git", "git", "example.com", "/r", "master", &["a", "b"]);
        assert!(path.starts_with("/1/git/git/example.com/r/v-batch/master?"));
        assert!(path.contains("file=a"));
        assert!(path.contains("file=b"));
        assert!(path.contains("return=first-exist"));
    }

    #[test]
    fn bisect_with_extra_suffix_splits_after_repo_path() {
        let (repo_path, extra) = bisect_before_nth("/team/repo/v/master/foo", '/', 2);
        assert_eq!(repo_path, "/team/repo");
        assert_eq!(extra, "/v/master/foo");
    }
}
