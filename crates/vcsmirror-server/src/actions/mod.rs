//! Post-refresh action handlers, selected by [`crate::router::Action`].

pub mod batch_file;
pub mod blame;
pub mod file;
pub mod proxy;
