mod chain;
mod recovery;
mod storage_error;
mod topology_error;

pub use chain::{ChainedError, ErrorChain};
pub use recovery::RecoveryAction;
pub use storage_error::StorageError;
pub use topology_error::{TopologyError, TopologyResult};
