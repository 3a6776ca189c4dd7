//! `pcied` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod collector;
pub mod config;
pub mod cycle;
pub mod daemon;
pub mod detach;
pub mod error;
pub mod monitor;
pub mod signals;

pub use daemon::Daemon;
