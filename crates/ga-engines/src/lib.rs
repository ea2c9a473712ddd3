//! The generational engine: default single- and multi-objective policy
//! bundles, the shared breeding body they delegate to, the local fitness
//! evaluator, and the state machine that drives a `Factory` through a run.

pub mod best_set_maintainer;
pub mod breeding;
pub mod defaults;
pub mod engine;
pub mod evaluator;
pub mod metrics;

pub use defaults::{MultiObjectiveDefaults, SingleObjectiveDefaults};
pub use engine::{EngineReport, GeneticEngine, StepOutcome, REPORT_INTERVAL};
pub use evaluator::{FitnessEvaluator, LocalEvaluator};

pub mod prelude {
    pub use super::defaults::{MultiObjectiveDefaults, SingleObjectiveDefaults};
    pub use super::engine::{EngineReport, GeneticEngine, StepOutcome, REPORT_INTERVAL};
    pub use super::evaluator::{FitnessEvaluator, LocalEvaluator};
    pub use super::metrics::{Metric, MetricSet, Timer};
}
