//! # cm-protocol
//!
//! Core protocol definitions and data models for crewmon.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (`.crewmon/config.toml`)
//! - Execution stream messages exchanged with the backend
//! - Runtime execution state (status, logs, progress)
//! - Inter-task communication between TUI and Core
//!
//! ## Modules
//!
//! - [`api_models`]: HTTP bodies for starting an execution
//! - [`config_models`]: Console configuration
//! - [`execution_models`]: Execution status, log entries and progress
//! - [`stream_messages`]: Inbound and outbound stream frames
//! - [`ipc`]: Operations and Events for Core-TUI communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other crewmon crates

pub mod api_models;
pub mod config_models;
pub mod execution_models;
pub mod ipc;
pub mod stream_messages;

// Re-export all public types for convenience
pub use api_models::*;
pub use config_models::*;
pub use execution_models::*;
pub use ipc::*;
pub use stream_messages::*;
