//! ACCORD mediator node: settlement integrity subsystem.
//!
//! Composes the workspace crates into a running node: settlement
//! lifecycle management, semantic consensus verification, challenge
//! detection, and reputation tracking, driven by periodic loops.

pub mod config;
pub mod node;

pub use config::NodeConfig;
pub use node::{MediatorNode, NodeError, NodeStats};
