//! # Host Interface
//!
//! The pooling engine never builds or tears down objects itself. The host
//! (renderer, scene graph, game world) implements [`InstanceHost`] and the
//! engine calls it whenever an instance has to be created, moved, parked or
//! destroyed.

use std::fmt;

use thiserror::Error;

use oroboros_assets::AssetHandle;

/// Opaque id of a host-created instance.
///
/// Hosts must never hand out the same id twice while it is still alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a spawned instance goes. Opaque to the engine; passed to the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// World position.
    pub position: [f32; 3],
    /// Orientation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
}

impl Placement {
    /// Origin, no rotation.
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    /// Unrotated placement at `position`.
    #[inline]
    #[must_use]
    pub const fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            rotation: Self::IDENTITY.rotation,
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Failure reported by the host when it cannot create an instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    /// Creates an error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Creation and destruction primitives supplied by the host environment.
pub trait InstanceHost {
    /// Instantiates `asset` at `placement`.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if no instance could be created.
    fn create_instance(&mut self, asset: AssetHandle, placement: &Placement) -> Result<InstanceId, HostError>;

    /// Destroys an instance. The id is never used again by the engine.
    fn destroy_instance(&mut self, instance: InstanceId);

    /// Moves a reused instance into place and makes it live again.
    fn place_instance(&mut self, instance: InstanceId, placement: &Placement);

    /// Called when an instance enters a free list (hide it, stop its logic).
    fn park_instance(&mut self, _instance: InstanceId) {}
}
