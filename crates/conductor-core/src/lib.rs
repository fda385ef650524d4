//! Orchestration engine and port definitions for Conductor.
//!
//! This crate defines the ports (`Capability`, `FileSystem`) that concrete
//! providers implement, the workflow engine that drives them, and the
//! built-in developer and reviewer capabilities. It depends only on
//! `conductor-types`, never on `conductor-infra` or any platform IO.

pub mod capability;
pub mod event;
pub mod fs;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
