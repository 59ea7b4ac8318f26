//! Request dispatcher and repository-lifecycle coordinator for the VCS
//! mirror/proxy.
//!
//! The pieces compose leaves-first: [`url`] and [`router`] turn a request
//! path into a [`router::Route`]; [`storage`] maps that route to a mirror
//! directory; [`coordinator`] makes sure that directory is fresh, coalescing
//! concurrent requests for the same repository into a single clone or
//! update; [`locks`] keeps that refresh mutually exclusive with the
//! [`actions`] that read the mirror afterward; [`cgi`] relays proxied
//! requests to a backend subprocess. [`handler`] wires all of it into one
//! axum handler.
//!
//! # Quick start
//!
//! ```no_run
//! # async fn run() {
//! let settings = vcsmirror_config::ConfigLoader::new()
//!     .resolve(&vcsmirror_config::CliOverrides {
//!         hosts: vec!["github.com".to_string()],
//!         ..Default::default()
//!     })
//!     .expect("valid configuration");
//! let bind = settings.bind;
//! let app = vcsmirror_server::app(settings);
//! let listener = tokio::net::TcpListener::bind(bind).await.expect("bind");
//! axum::serve(listener, app).await.expect("serve");
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod cgi;
pub mod coordinator;
pub mod handler;
pub mod locks;
pub mod router;
pub mod storage;
pub mod url;

use std::sync::Arc;

use axum::routing::any;
use axum::Router;

pub use handler::AppState;
pub use vcsmirror_config::Settings;

/// Build the axum router serving every request through the top-level
/// handler.
#[must_use]
pub fn app(settings: Settings) -> Router {
    let state = Arc::new(AppState::new(settings));
    Router::new().fallback(any(handler::handle)).with_state(state)
}
