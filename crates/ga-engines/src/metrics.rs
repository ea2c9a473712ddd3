//! A deliberately small metrics surface — enough for a `tracing` subscriber
//! or a caller to observe per-generation cost, without the full statistics
//! dashboard the teacher library carries for its own reporting UI (out of
//! scope here, see spec §1).

use std::time::{Duration, Instant};

pub struct Timer(Instant);

impl Timer {
    pub fn new() -> Self {
        Self(Instant::now())
    }

    pub fn duration(&self) -> Duration {
        self.0.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub count: f64,
    pub duration: Duration,
}

impl Metric {
    pub fn new(name: &'static str, count: f64, duration: Duration) -> Self {
        Self { name, count, duration }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MetricSet {
    metrics: Vec<Metric>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metric: Metric) {
        metric.log();
        self.metrics.push(metric);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }
}

impl Metric {
    fn log(&self) {
        tracing::debug!(
            step = self.name,
            count = self.count,
            micros = self.duration.as_micros() as u64,
            "ga step complete"
        );
    }
}

pub mod names {
    pub const EVALUATION: &str = "evaluate";
    pub const SORT: &str = "sort";
    pub const UPDATE_BEST: &str = "update_best";
    pub const BREED: &str = "breed";
    pub const MUTATE: &str = "mutate";
}
