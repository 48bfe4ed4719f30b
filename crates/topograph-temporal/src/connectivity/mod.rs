//! Connectivity invariant: every proxy of a tenant has at least one edge.

mod bridging;
mod degree;
mod enforcer;

pub use bridging::{bridge_key, modulus_pairs, BridgePlanner, NetworkPair};
pub use degree::{component_count, DegreeIndex};
pub use enforcer::ConnectivityInvariantEnforcer;
