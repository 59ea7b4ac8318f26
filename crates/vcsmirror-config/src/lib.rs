//! Configuration surface for the mirror/proxy server.
//!
//! Settings are resolved in precedence order (lowest to highest): built-in
//! defaults, environment variables, then CLI flags and positional
//! arguments, matching the layered [`ConfigSource`] model the rest of this
//! workspace's config tooling uses, scoped down to the handful of settings
//! this server needs.
//!
//! # Quick start
//!
//! ```no_run
//! use vcsmirror_config::{CliOverrides, ConfigLoader};
//!
//! # fn main() -> vcsmirror_config::Result<()> {
//! let loader = ConfigLoader::new();
//! let overrides = CliOverrides {
//!     hosts: vec!["github.com".to_string()],
//!     ..Default::default()
//! };
//! let settings = loader.resolve(&overrides)?;
//! println!("binding to {}", settings.bind);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod loader;

pub use env::{EnvConfig, VcsMirrorEnvVar};
pub use error::{ConfigError, Result};
pub use loader::{CliOverrides, ConfigLoader, ConfigSource, Settings};
