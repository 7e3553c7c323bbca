//! ASTROLABE — NASA data access and correlation core
//!
//! Library crate exposing all modules for use by integration tests,
//! tool-dispatch shells, and the binary entry point.

pub mod cancel;
pub mod client;
pub mod config;
pub mod engine;
pub mod limiter;
pub mod sources;
pub mod types;
