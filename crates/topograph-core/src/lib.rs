//! # topograph-core
//!
//! Shared vocabulary for the temporal topology engine: tenant keys, proxy
//! vertices, versioned entities, domain and bridging edges, the error
//! taxonomy, configuration, and the store/engine traits.
//!
//! This crate performs no I/O. `topograph-storage` implements
//! [`traits::ITopologyStore`] on SQLite and `topograph-temporal` implements
//! [`traits::ITopologyEngine`].

pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::TopologyConfig;
pub use errors::{TopologyError, TopologyResult};
pub use models::{
    EntityType, ProxyRole, ProxyVertex, TenantShardKey, VersionedEntity, MAX_TIMESTAMP,
};
