//! Capability port and the built-in capability providers.
//!
//! A capability is anything the engine can dispatch a step to: it receives
//! the derived step input as a JSON object and answers with a result object.
//! The engine reads a handful of reserved result keys (`status`, `error`,
//! `reason`, `issues`, `suggestions`, `files`, `created`, `updated`); every
//! other key is opaque payload.

pub mod architect;
pub mod boxed;
pub mod developer;
mod domain;
pub mod registry;
pub mod reviewer;

use conductor_types::JsonMap;
use conductor_types::error::CapabilityError;

pub use architect::ArchitectCapability;
pub use boxed::BoxCapability;
pub use developer::DeveloperCapability;
pub use registry::{CapabilityRegistry, RegistryError};
pub use reviewer::ReviewerCapability;

/// A pluggable provider that performs step actions.
///
/// Uses native async fn in traits (RPITIT). Wrap implementations in
/// [`BoxCapability`] to store them in a [`CapabilityRegistry`].
pub trait Capability: Send + Sync {
    /// Registry name (e.g. "developer").
    fn name(&self) -> &str;

    /// Handle one step input. The requested action is under `input["action"]`.
    fn process(
        &self,
        input: JsonMap,
    ) -> impl std::future::Future<Output = Result<JsonMap, CapabilityError>> + Send;
}
