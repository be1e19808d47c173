//! Execution stream control.
//!
//! This module provides:
//! - `ExecutionStreamState`, the record of the current execution
//! - `ExecutionStream`, the state machine driving one execution
//! - `ExecutionService`, the actor wrapping it behind `Op`/`Event` channels

pub mod controller;
pub mod service;
pub mod state;

pub use controller::{ExecutionStream, PendingStart, StartError};
pub use service::{ExecutionService, ServiceHandle};
pub use state::{format_duration, ExecutionStreamState};
