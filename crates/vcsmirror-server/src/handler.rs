//! Top-level HTTP handler: router → coordinator → per-repository lock →
//! action dispatch.
//!
//! Blocking work (filesystem checks, `git`/`hg` subprocesses, `git2` blame)
//! runs inside [`tokio::task::spawn_blocking`]; the CGI proxy action is the
//! one path that stays on the async executor throughout, since it's the one
//! action whose own backend process can run arbitrarily long.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use tracing::debug;

use vcsmirror_config::Settings;
use vcsmirror_core::HttpError;
use vcsmirror_vcs::{GitBackend, HgBackend, VcsBackend, VcsKind};

use crate::actions::{batch_file, blame, file, proxy};
use crate::cgi;
use crate::coordinator::Coordinator;
use crate::locks::LockRegistry;
use crate::router::{self, Action, Route};
use crate::storage::repo_dir;

/// Shared state behind every request.
pub struct AppState {
    /// Resolved configuration (storage root, host whitelist, CGI backends).
    pub settings: Settings,
    /// Single-flight clone/update coordinator.
    pub coordinator: Coordinator,
    /// Per-repository read/write mutual exclusion.
    pub locks: Arc<LockRegistry>,
    git: GitBackend,
    hg: HgBackend,
}

impl AppState {
    /// Build shared state from resolved settings.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let locks = Arc::new(LockRegistry::new());
        Self {
            settings,
            coordinator: Coordinator::new(Arc::clone(&locks)),
            locks,
            git: GitBackend,
            hg: HgBackend,
        }
    }

    fn backend(&self, vcs: VcsKind) -> &dyn VcsBackend {
        match vcs {
            VcsKind::Git => &self.git,
            VcsKind::Hg => &self.hg,
        }
    }
}

/// True when the request should bypass any already-mirrored state: either
/// the client sent `Pragma: no-cache`, or (Mercurial only) the request is
/// `hg`'s initial `cmd=capabilities` handshake, which always wants a fresh
/// view of the repository.
fn wants_force_update(vcs: VcsKind, headers: &HeaderMap, query: &str) -> bool {
    let no_cache = headers
        .get(axum::http::header::PRAGMA)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("no-cache"));
    no_cache || (vcs == VcsKind::Hg && query.contains("cmd=capabilities"))
}

/// Axum handler entry point: never panics, always returns a response (an
/// `HttpError` becomes a status line and a plain-text body).
pub async fn handle(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response<Body> {
    match dispatch(&state, req).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &HttpError) -> Response<Body> {
    Response::builder()
        .status(StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .body(Body::from(err.message.clone()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

async fn dispatch(state: &Arc<AppState>, req: Request<Body>) -> Result<Response<Body>, HttpError> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().unwrap_or("").to_string();

    let route = router::route(&path, &state.settings.allowed_hosts)?;
    debug!(uri = %route.uri, action = ?route.action, "routed request");

    let dir = repo_dir(&state.settings.storage_root, route.vcs, &route.uri, state.settings.offline);
    let force_update = wants_force_update(route.vcs, &parts.headers, &query);

    refresh(state, &route, &dir, force_update).await?;

    match route.action {
        Action::Proxy => {
            let descriptor = proxy::descriptor_for(
                &route,
                &dir,
                proxy::ProxyConfig {
                    git_http_backend: &state.settings.git_http_backend,
                    python27: &state.settings.python27,
                    storage_root: &state.settings.storage_root,
                },
            )?;
            cgi::relay(descriptor, parts.method, &query, &parts.headers, body).await
        }
        Action::SingleFile => single_file(state, &route, &dir).await,
        Action::BatchFile => batch(state, &route, &dir, &query).await,
        Action::Blame => blame_response(state, &dir, &query).await,
    }
}

async fn refresh(state: &Arc<AppState>, route: &Route, dir: &std::path::Path, force_update: bool) -> Result<(), HttpError> {
    let state = Arc::clone(state);
    let route = route.clone();
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let backend = state.backend(route.vcs);
        state
            .coordinator
            .ensure_fresh(&route.uri, &dir, backend, &route.clone_url, force_update, state.settings.offline)
    })
    .await
    .map_err(|_| HttpError::internal("refresh task panicked"))?
}

async fn single_file(state: &Arc<AppState>, route: &Route, dir: &std::path::Path) -> Result<Response<Body>, HttpError> {
    let state = Arc::clone(state);
    let route = route.clone();
    let dir = dir.to_path_buf();
    let resp = tokio::task::spawn_blocking(move || {
        let mu = state.locks.mutex_for(&dir);
        let _guard = mu.lock();
        let backend = state.backend(route.vcs);
        file::serve(backend, &dir, &route.extra_path)
    })
    .await
    .map_err(|_| HttpError::internal("file read task panicked"))??;

    Ok(bytes_response(resp.body, resp.content_type))
}

async fn batch(state: &Arc<AppState>, route: &Route, dir: &std::path::Path, query: &str) -> Result<Response<Body>, HttpError> {
    let query_pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes()).into_owned().collect();
    let state = Arc::clone(state);
    let route = route.clone();
    let dir = dir.to_path_buf();
    let resp = tokio::task::spawn_blocking(move || {
        let mu = state.locks.mutex_for(&dir);
        let _guard = mu.lock();
        let backend = state.backend(route.vcs);
        batch_file::serve(backend, &dir, &route.extra_path, &query_pairs)
    })
    .await
    .map_err(|_| HttpError::internal("batch file read task panicked"))??;

    Ok(bytes_response(resp.body, None))
}

async fn blame_response(state: &Arc<AppState>, dir: &std::path::Path, query: &str) -> Result<Response<Body>, HttpError> {
    let revision = url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();
    let state = Arc::clone(state);
    let dir = dir.to_path_buf();
    let resp = tokio::task::spawn_blocking(move || {
        let mu = state.locks.mutex_for(&dir);
        let _guard = mu.lock();
        blame::blame_repository(&dir, &revision)
    })
    .await
    .map_err(|_| HttpError::internal("blame task panicked"))??;

    let body = serde_json::to_vec(&resp).map_err(|_| HttpError::internal("failed to encode blame response"))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(body))
        .map_err(|_| HttpError::internal("failed to build blame response"))
}

fn bytes_response(body: Vec<u8>, content_type: Option<&'static str>) -> Response<Body> {
    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(ct) = content_type {
        builder = builder.header(axum::http::header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(body)).unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragma_no_cache_forces_update() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::PRAGMA, "no-cache".parse().unwrap());
        assert!(wants_force_update(VcsKind::Git, &headers, ""));
    }

    #[test]
    fn hg_capabilities_probe_forces_update() {
        assert!(wants_force_update(VcsKind::Hg, &HeaderMap::new(), "cmd=capabilities"));
    }

    #[test]
    fn git_capabilities_query_does_not_force_update() {
        assert!(!wants_force_update(VcsKind::Git, &HeaderMap::new(), "service=git-upload-pack&cmd=capabilities"));
    }

    #[test]
    fn ordinary_request_does_not_force_update() {
        assert!(!wants_force_update(VcsKind::Git, &HeaderMap::new(), "service=git-upload-pack"));
    }

    #[test]
    fn error_response_maps_status_and_body() {
        let err = HttpError::not_found("nope");
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
