//! Serve a project from a container, stream its output, and kill it on Ctrl+C.

pub mod config;
pub mod console;
pub mod docker;
pub mod error;
pub mod session;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
