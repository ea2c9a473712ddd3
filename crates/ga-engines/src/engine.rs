//! The generational state machine (§4.8):
//! `Init -> (Evaluate -> Sort -> OnSorted -> UpdateBest -> Breed -> Mutate -> OnStep)* -> Report -> Teardown`.
//!
//! The engine itself only ever talks to a `Factory` through its object-safe
//! capability set — whether fitness is computed locally (`LocalEvaluator`)
//! or dispatched to a cluster of helpers is entirely the evaluator's
//! concern, per the `FitnessEvaluator` split in `evaluator.rs`.

use crate::evaluator::FitnessEvaluator;
use crate::metrics::{Metric, MetricSet, Timer, names};
use ga_core::best_set::BestSet;
use ga_core::codec::MemoryBuffer;
use ga_core::factory::Factory;
use ga_core::population::Population;
use ga_error::Result;
use std::time::{Duration, Instant};

/// How often the engine logs a current-best summary while running — not a
/// hard guarantee, just a ceiling on how stale the log line gets.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// What a single generation's step produced, besides mutating the engine's
/// own state: whether the factory's per-generation side-channel payload
/// changed (forwarded to helpers ahead of the next batch) and whether the
/// factory asked the engine to stop early.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    pub generation_info_changed: bool,
    pub stop: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineReport {
    pub generations_run: u64,
    pub best_set_size: usize,
}

pub struct GeneticEngine {
    factory: Box<dyn Factory>,
    population: Population,
    best_set: BestSet,
    evaluator: Box<dyn FitnessEvaluator>,
    generation: u64,
    metrics: MetricSet,
}

impl GeneticEngine {
    pub fn new(
        factory: Box<dyn Factory>,
        population: Population,
        evaluator: Box<dyn FitnessEvaluator>,
    ) -> Self {
        Self {
            factory,
            population,
            best_set: BestSet::new(),
            evaluator,
            generation: 0,
            metrics: MetricSet::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn best_set(&self) -> &BestSet {
        &self.best_set
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Read access to the driven `Factory`, for callers (the coordinator)
    /// that need to encode the current best-set onto the wire between
    /// generations rather than only at `run`'s end.
    pub fn factory(&self) -> &dyn Factory {
        self.factory.as_ref()
    }

    pub fn init(&mut self) {
        self.factory.on_start();
        self.notify_generation_info();
    }

    /// Serializes the factory's current generation-info payload and hands
    /// it to the evaluator. Failures are logged and otherwise swallowed:
    /// a malformed side-channel payload shouldn't abort a run that would
    /// otherwise succeed without it.
    fn notify_generation_info(&mut self) {
        let mut buf = MemoryBuffer::new();
        match self.factory.write_common_generation_info(&mut buf) {
            Ok(()) => self.evaluator.on_generation_info(&buf.into_vec()),
            Err(e) => tracing::warn!(error = %e, "failed to serialize generation info"),
        }
    }

    /// Drives exactly one generation through Evaluate -> Sort -> OnSorted
    /// -> UpdateBest -> Breed -> Mutate -> OnStep. Only the evaluate step
    /// can fail; every other capability-set method is infallible by
    /// contract.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let timer = Timer::new();
        self.evaluator.evaluate(&mut self.population).await?;
        self.metrics.push(Metric::new(
            names::EVALUATION,
            self.population.len() as f64,
            timer.duration(),
        ));

        let timer = Timer::new();
        self.factory.sort(&mut self.population);
        self.metrics
            .push(Metric::new(names::SORT, self.population.len() as f64, timer.duration()));

        self.factory.on_sorted_population(&self.population);

        let timer = Timer::new();
        self.factory
            .update_best_genomes(&self.population, &mut self.best_set);
        self.metrics.push(Metric::new(
            names::UPDATE_BEST,
            self.best_set.len() as f64,
            timer.duration(),
        ));

        let timer = Timer::new();
        self.population = self.factory.breed(&self.population);
        self.metrics
            .push(Metric::new(names::BREED, self.population.len() as f64, timer.duration()));

        let timer = Timer::new();
        self.factory.introduce_mutations(&mut self.population);
        self.metrics.push(Metric::new(
            names::MUTATE,
            self.population.len() as f64,
            timer.duration(),
        ));

        let mut generation_info_changed = false;
        let mut stop = false;
        self.factory
            .on_step(self.generation, &self.best_set, &mut generation_info_changed, &mut stop);
        if generation_info_changed {
            self.notify_generation_info();
        }

        self.generation += 1;

        Ok(StepOutcome {
            generation_info_changed,
            stop,
        })
    }

    /// Runs up to `generations` steps, logging a current-best summary at
    /// least every [`REPORT_INTERVAL`], then tears the factory down.
    pub async fn run(&mut self, generations: u64) -> Result<EngineReport> {
        self.init();
        let mut last_report = Instant::now();

        for _ in 0..generations {
            let outcome = self.step().await?;

            if last_report.elapsed() >= REPORT_INTERVAL {
                if let Some(best) = self.factory.select_preferred_genome(&self.best_set) {
                    tracing::info!(
                        generation = self.generation,
                        fitness = %best.describe_fitness(),
                        "current best"
                    );
                }
                last_report = Instant::now();
            }

            if outcome.stop {
                break;
            }
        }

        self.teardown()
    }

    /// Calls the factory's `on_stop` and reports the final tally. Exposed
    /// so a caller driving `step` directly (the coordinator, which has no
    /// fixed generation count to hand `run`) can still unwind cleanly.
    pub fn teardown(&mut self) -> Result<EngineReport> {
        self.factory.on_stop();
        Ok(EngineReport {
            generations_run: self.generation,
            best_set_size: self.best_set.len(),
        })
    }
}
