mod topology_engine;
mod topology_store;

pub use topology_engine::ITopologyEngine;
pub use topology_store::{ITopologyStore, VersionAppend};
