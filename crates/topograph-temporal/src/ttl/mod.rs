mod scheduler;
mod sweep;

pub use scheduler::SweepScheduler;
pub use sweep::TtlExpirationEngine;
