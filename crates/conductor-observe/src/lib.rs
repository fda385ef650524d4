//! Observability setup for Conductor: the tracing subscriber and an
//! optional OpenTelemetry bridge.

pub mod tracing_setup;
