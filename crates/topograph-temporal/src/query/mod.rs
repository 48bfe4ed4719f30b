mod as_of;
mod scan;

pub use as_of::TimeTravelQueryPlanner;
pub use scan::{VersionScan, VersionScanIter};
