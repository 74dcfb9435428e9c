//! Error types for the controller's collaborator ports.

use thiserror::Error;

/// Failures of the shared key/value store. The controller treats all of them
/// as best-effort conditions: logged, never propagated to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store refused or lost the write.
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be interpreted.
    #[error("malformed value under key `{key}`")]
    Malformed { key: String },

    /// Anything else an implementation needs to surface.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
