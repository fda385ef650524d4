//! BoxCapability -- object-safe dynamic dispatch wrapper for Capability.
//!
//! 1. `CapabilityDyn` is an object-safe mirror of `Capability` with boxed futures
//! 2. Blanket-impl `CapabilityDyn` for all `T: Capability`
//! 3. `BoxCapability` wraps `Box<dyn CapabilityDyn>` and delegates

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures_util::FutureExt;

use conductor_types::JsonMap;
use conductor_types::error::CapabilityError;

use super::Capability;

/// Object-safe version of [`Capability`] with boxed futures.
pub trait CapabilityDyn: Send + Sync {
    fn name(&self) -> &str;

    fn process_boxed(
        &self,
        input: JsonMap,
    ) -> Pin<Box<dyn Future<Output = Result<JsonMap, CapabilityError>> + Send + '_>>;
}

impl<T: Capability> CapabilityDyn for T {
    fn name(&self) -> &str {
        Capability::name(self)
    }

    fn process_boxed(
        &self,
        input: JsonMap,
    ) -> Pin<Box<dyn Future<Output = Result<JsonMap, CapabilityError>> + Send + '_>> {
        Box::pin(self.process(input))
    }
}

/// Type-erased capability for runtime registration.
///
/// Since `Capability` uses RPITIT it cannot be a trait object directly;
/// `BoxCapability` provides the same methods over a `CapabilityDyn` object.
pub struct BoxCapability {
    inner: Box<dyn CapabilityDyn>,
}

impl BoxCapability {
    /// Wrap a concrete `Capability` in a type-erased box.
    pub fn new<T: Capability + 'static>(capability: T) -> Self {
        Self {
            inner: Box::new(capability),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Handle one step input.
    pub async fn process(&self, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        self.inner.process_boxed(input).await
    }

    /// Like [`process`](Self::process), but a panic inside the capability is
    /// caught and returned as [`CapabilityError::Panicked`].
    pub async fn process_catching(&self, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        match AssertUnwindSafe(self.inner.process_boxed(input))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(CapabilityError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for BoxCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxCapability")
            .field("name", &self.name())
            .finish()
    }
}
