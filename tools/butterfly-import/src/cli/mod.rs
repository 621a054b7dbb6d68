//! CLI-specific utilities for butterfly-import
//!
//! Code used only by the command-line interface.

pub mod progress;

pub use progress::ProgressManager;
