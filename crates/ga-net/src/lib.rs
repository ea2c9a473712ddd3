//! The coordinator, helper, and client sides of the distributed protocol
//! (§4.8/§4.9): a `tokio`-based connection manager shared by all three
//! roles, the distributed fitness evaluator the coordinator plugs into
//! `GeneticEngine`, and the three event loops themselves.

pub mod client;
pub mod connection;
pub mod coordinator;
pub mod distribution;
pub mod evaluator;
pub mod helper;
pub mod manager;

pub use client::{Client, ClientConfig, RunOutcome};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use evaluator::DistributedEvaluator;
pub use helper::{Helper, HelperConfig};

pub mod prelude {
    pub use super::client::{Client, ClientConfig, RunOutcome};
    pub use super::coordinator::{Coordinator, CoordinatorConfig};
    pub use super::evaluator::DistributedEvaluator;
    pub use super::helper::{Helper, HelperConfig};
}
