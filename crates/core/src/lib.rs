//! # cm-core
//!
//! Core execution monitoring logic for crewmon.
//!
//! This crate provides:
//! - Configuration loading from the `.crewmon/` directory
//! - Heuristic log classification and the capped log buffer
//! - The stream transport with bounded automatic reconnection
//! - The execution API client used to start executions
//! - The execution stream controller and its actor service
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`logs`]: Line classification and buffering
//! - [`transport`]: Connector abstraction, WebSocket connector and connection manager
//! - [`api`]: Execution control API client
//! - [`stream`]: Execution state machine and service
//! - [`telemetry`]: Tracing subscriber setup

pub mod api;
pub mod config;
pub mod logs;
pub mod stream;
pub mod telemetry;
pub mod transport;
