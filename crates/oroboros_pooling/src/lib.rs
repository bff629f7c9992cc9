//! # OROBOROS Object Pooling
//!
//! Recycles instances of registry assets so hot gameplay paths (projectiles,
//! hit effects, enemy waves) do not create and destroy objects every frame.
//!
//! ## Design Principles
//!
//! 1. **Host-agnostic** - the engine only tracks ids; creation, placement and
//!    destruction go through an [`InstanceHost`]
//! 2. **One pool per resolved asset** - bare and composite keys that resolve
//!    to the same entry share a pool
//! 3. **Bounded free lists** - per-pool caps plus an optional global
//!    auto-cleanup threshold, both loaded from TOML
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_pooling::{PoolConfig, PoolingEngine, Placement};
//!
//! let config = PoolConfig::load("data/pooling.toml")?;
//! let engine = PoolingEngine::new(manager, host, config);
//!
//! engine.pre_warm_pool("fx/spark", 64)?;
//! let spark = engine.spawn("fx/spark", &Placement::at([0.0, 1.0, 0.0]))?;
//! engine.despawn(spark)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod engine;
pub mod error;
pub mod host;

pub use config::{PoolConfig, DEFAULT_MAX_SIZE};
pub use engine::{DespawnOutcome, PoolStats, PoolingEngine};
pub use error::{PoolError, PoolResult};
pub use host::{HostError, InstanceHost, InstanceId, Placement};
