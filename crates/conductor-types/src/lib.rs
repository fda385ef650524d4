//! Shared domain types for Conductor.
//!
//! This crate contains the value types that flow between the orchestration
//! engine, its capabilities, and the outer surfaces: workflow and step
//! definitions, step records and outcomes, lifecycle events, configuration,
//! and the error types at the capability and file boundaries.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, uuid, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod outcome;
pub mod workflow;

/// JSON object used for capability inputs, results, and execution state.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
