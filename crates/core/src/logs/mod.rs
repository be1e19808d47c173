//! Log classification and buffering.
//!
//! This module provides:
//! - Pure text classification (category, importance, step progress)
//! - The capped, strictly ordered log buffer

pub mod buffer;
pub mod classify;

pub use buffer::LogBuffer;
pub use classify::{classify, parse_progress, Classification};
