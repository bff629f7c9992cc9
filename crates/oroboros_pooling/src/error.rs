//! # Pooling Error Types

use thiserror::Error;

use oroboros_assets::AssetError;

use crate::host::{HostError, InstanceId};

/// Errors that can occur while spawning, despawning or configuring pools.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The identifier did not resolve through the registry manager.
    #[error("asset not found for {identifier}: {source}")]
    AssetNotFound {
        /// The identifier as requested.
        identifier: String,
        /// Why resolution failed (absent, ambiguous, unknown bucket, ...).
        #[source]
        source: AssetError,
    },

    /// The host could not create an instance.
    #[error("instantiation failed for {identifier}: {reason}")]
    InstantiationFailed {
        /// The identifier as requested.
        identifier: String,
        /// The host's explanation.
        #[source]
        reason: HostError,
    },

    /// The instance is not active in any pool.
    #[error("unknown instance: {0}")]
    UnknownInstance(InstanceId),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for pooling operations.
pub type PoolResult<T> = Result<T, PoolError>;
