//! Crate error type.
//!
//! Most runtime failures are report-and-continue: they are logged with
//! `tracing::warn!` and the operation carries on. The variants here are the
//! ones an API can also hand back to the caller.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A write through a component's public instance targeted a prop.
    #[error("props are readonly: cannot set `{0}`")]
    ReadonlyProp(String),
    /// A component's `data` option was not a function.
    #[error("the data option must be a function")]
    DataNotFunction,
    /// An async component's loader failed.
    #[error("async component failed to load: {0}")]
    Load(String),
    /// An async component did not settle within its timeout.
    #[error("async component timed out after {0:?}")]
    Timeout(Duration),
    /// A teleport's `to` target could not be resolved.
    #[error("teleport target `{0}` not found")]
    TeleportTargetMissing(String),
}

/// Result alias for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
