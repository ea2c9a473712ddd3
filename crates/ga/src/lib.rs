//! A distributed, multi-objective genetic algorithm runtime.
//!
//! This crate re-exports the workspace's split-out pieces — core traits
//! and data types, non-dominated sorting, the generational engine, wire
//! protocol, and the coordinator/helper/client networking layer — under
//! one name, the way a problem plug-in actually wants to depend on it.
//! Reach for `ga::prelude::*` for the common surface, or pull individual
//! modules (`ga::sort`, `ga::net`, ...) for anything more specific.

pub use ga_core::*;
pub use ga_error::*;
pub use ga_engines::*;

pub mod sort {
    pub use ga_sort::*;
}

pub mod protocol {
    pub use ga_protocol::*;
}

pub mod net {
    pub use ga_net::*;
}

pub mod prelude {
    pub use ga_core::prelude::*;
    pub use ga_engines::prelude::*;
    pub use ga_error::{GaError, Result, ResultExt};
    pub use ga_net::prelude::*;
    pub use ga_protocol::prelude::*;
    pub use ga_sort::{NonDominatedSort, StrategyHint, choose_strategy};
}
