//! Startup configuration: command-line flags and environment

pub mod arg;
pub mod config;
