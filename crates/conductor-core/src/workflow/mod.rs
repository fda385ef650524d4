//! Workflow definitions and the orchestration engine.
//!
//! - `definition`: YAML parsing, validation, discovery, and the catalog
//! - `state`: execution state and the merge policy
//! - `classify`: result classification
//! - `augment`: code/fix augmentation of step inputs
//! - `review`: the review gate
//! - `executor`: the sequential engine loop

pub mod augment;
pub mod classify;
pub mod definition;
pub mod executor;
pub mod review;
pub mod state;

pub use definition::{WorkflowCatalog, WorkflowError};
pub use executor::{EngineError, WorkflowEngine};
pub use state::ExecutionState;
