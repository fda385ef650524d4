//! Infrastructure adapters for Conductor.
//!
//! - `filesystem`: `LocalFileSystem`, the `tokio::fs` implementation of the
//!   core `FileSystem` port
//! - `config`: home directory resolution and `conductor.toml` loading

pub mod config;
pub mod filesystem;
