mod builder;

pub use builder::{check_monotonic, VersionChainBuilder};
