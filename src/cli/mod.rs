// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for decoding dumped pose tensors.
//!
//! This module contains the command-line interface logic, including argument parsing
//! and the `decode` command implementation.

// Modules
/// CLI arguments.
pub mod args;

/// Decoding logic.
pub mod decode;

/// Logging helpers.
pub mod logging;
