//! Settlement lifecycle management: proposal, bilateral acceptance,
//! closure with its economic side effects, contest, and reversal.

pub mod lifecycle;

pub use lifecycle::{
    LifecycleConfig, LifecycleError, SettlementLifecycleManager, SettlementStats,
};
