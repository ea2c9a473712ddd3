//! The pluggable fitness step (§4.6/§4.7/§4.8). `FitnessEvaluator` is
//! expressed over a boxed future rather than `async fn` in a trait so it
//! stays object-safe — the coordinator's distributed evaluator
//! (`ga-net::DistributedEvaluator`) implements the same trait but awaits
//! network I/O instead of computing in place.

use ga_core::Population;
use ga_error::Result;
use std::future::Future;
use std::pin::Pin;

pub trait FitnessEvaluator: Send + Sync {
    fn evaluate<'a>(
        &'a mut self,
        population: &'a mut Population,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Called once at `init` and again whenever `on_step` flags the
    /// factory's generation-info payload as changed, carrying the bytes
    /// already serialized via `Factory::write_common_generation_info`.
    /// `LocalEvaluator` has no use for it; `ga-net`'s distributed evaluator
    /// holds onto the bytes to ship ahead of its next dispatch (§4.10).
    fn on_generation_info(&mut self, payload: &[u8]) {
        let _ = payload;
    }
}

/// Serial, in-process evaluator (§4.7): calls `calculate_fitness` on every
/// wrapper. Errors would propagate from `calculate_fitness` if that method
/// returned a `Result`; since the capability set defines it as infallible,
/// this evaluator can itself never fail, but keeps the `Result` return type
/// so it is interchangeable with the distributed evaluator.
#[derive(Default)]
pub struct LocalEvaluator;

impl FitnessEvaluator for LocalEvaluator {
    fn evaluate<'a>(
        &'a mut self,
        population: &'a mut Population,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            for wrapper in population.iter_mut() {
                wrapper.genome.calculate_fitness();
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ga_core::genome::{Genome, GenomeWrapper};
    use std::any::Any;

    struct Counter(u32, bool);
    impl Genome for Counter {
        fn calculate_fitness(&mut self) {
            self.1 = true;
        }
        fn is_fitter_than(&self, other: &dyn Genome) -> bool {
            self.0 < other.as_any().downcast_ref::<Counter>().unwrap().0
        }
        fn set_active_fitness_component(&mut self, _index: usize) {}
        fn reproduce(&self, _other: &dyn Genome) -> Box<dyn Genome> {
            Box::new(Counter(self.0, self.1))
        }
        fn clone_genome(&self) -> Box<dyn Genome> {
            Box::new(Counter(self.0, self.1))
        }
        fn mutate(&mut self) {}
        fn describe_fitness(&self) -> String {
            self.0.to_string()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn local_evaluator_calculates_every_wrapper() {
        let wrappers = (0..5)
            .map(|i| GenomeWrapper::fresh(Box::new(Counter(i, false)), i as usize))
            .collect();
        let mut population = Population::new(wrappers).unwrap();

        LocalEvaluator.evaluate(&mut population).await.unwrap();

        for wrapper in population.iter() {
            assert!(wrapper.genome.as_any().downcast_ref::<Counter>().unwrap().1);
        }
    }
}
