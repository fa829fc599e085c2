//! # Sphynx
//!
//! Library half of the `sphynx` binary: CLI definitions, configuration
//! loading and JSON plans. `main.rs` only installs logging and dispatches.

pub mod cli;
pub mod config;
pub mod plan;
