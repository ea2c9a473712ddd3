//! The multi-objective policy bundle (§4.4, K >= 1). Sorts via whichever
//! `ga_sort` strategy the population size and accelerator hint select,
//! maintains the best-set as a non-dominated antichain, and breeds by
//! picking parents rank-biased over the concatenated `L0 ‖ L1 ‖ ...` order
//! rather than over a single total order.

use crate::best_set_maintainer;
use crate::breeding;
use ga_core::best_set::BestSet;
use ga_core::genome::Genome;
use ga_core::objective::{dominates, get_pair_mut};
use ga_core::params::GaParams;
use ga_core::population::Population;
use ga_sort::{self, NonDominatedSort, StrategyHint};
use std::cell::{Cell, RefCell};

pub struct MultiObjectiveDefaults {
    components: usize,
    params: Cell<GaParams>,
    hint: Cell<StrategyHint>,
    front_size: Cell<usize>,
    /// `orderedSets` (§4.4): index lists into the just-sorted population,
    /// one per layer, front-first. Rebuilt every `sort` call, consumed by
    /// the next `breed` call.
    layers: RefCell<Vec<Vec<usize>>>,
    preferred: RefCell<Option<Box<dyn Genome>>>,
}

impl MultiObjectiveDefaults {
    pub fn new(components: usize, params: GaParams) -> Self {
        assert!(components >= 1, "multi-objective defaults require at least one fitness component");
        Self {
            components,
            params: Cell::new(params),
            hint: Cell::new(StrategyHint::default()),
            front_size: Cell::new(0),
            layers: RefCell::new(Vec::new()),
            preferred: RefCell::new(None),
        }
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn params(&self) -> GaParams {
        self.params.get()
    }

    pub fn set_params(&self, params: GaParams) {
        self.params.set(params);
    }

    pub fn set_accelerator_hint(&self, hint: StrategyHint) {
        self.hint.set(hint);
    }

    /// Reorders the population into `L0 ‖ L1 ‖ ...` (§4.4) and remembers
    /// the front's size for the next `update_best_genomes` call.
    pub fn sort(&self, population: &mut Population) {
        let n = population.len();
        let components = self.components;
        let strategy = ga_sort::choose_strategy(n, self.hint.get());

        let wrappers = RefCell::new(population.take_wrappers());
        let ranks = {
            let dominates_fn = |i: usize, j: usize| {
                let mut wrappers = wrappers.borrow_mut();
                let (a, b) = get_pair_mut(&mut wrappers, i, j);
                dominates(a.genome.as_mut(), b.genome.as_mut(), components)
            };
            strategy.rank(n, &dominates_fn)
        };

        let mut wrappers = wrappers.into_inner();
        let layers = ga_sort::concatenate_layers(&mut wrappers, &ranks);
        self.front_size.set(layers.first().map(Vec::len).unwrap_or(0));
        *self.layers.borrow_mut() = layers;
        population.set_wrappers(wrappers);
    }

    pub fn update_best_genomes(&self, population: &Population, best_set: &mut BestSet) {
        best_set_maintainer::update_multi_objective(
            population,
            self.front_size.get(),
            self.components,
            best_set,
        );
        *self.preferred.borrow_mut() = best_set
            .genomes()
            .first()
            .map(|g| g.clone_genome());
    }

    /// Breeds over `orderedSets` rather than the flat sorted population
    /// (§4.4): parents are picked layer-first, then by a uniform
    /// sub-index within that layer. Falls back to a single flat layer if
    /// `sort` was never called (defensive; should not happen in practice).
    pub fn breed(&self, population: &Population) -> Population {
        let params = self.params.get();
        let preferred = self.preferred.borrow();
        let layers = self.layers.borrow();
        let children = if layers.is_empty() {
            breeding::breed_pool(population.as_slice(), &params, preferred.as_deref())
        } else {
            breeding::breed_pool_layered(population.as_slice(), &layers, &params, preferred.as_deref())
        };
        Population::new(children).expect("breeding preserves the population's size")
    }

    /// Skips the same elite/best-pin slot count `breed` carried forward
    /// unchanged — `carry_forward_count` clamped to the L0 front size, so
    /// this never skips more slots than `breed` actually pinned.
    pub fn introduce_mutations(&self, population: &mut Population) {
        let elite = breeding::carry_forward_count(population.len()).min(self.front_size.get());
        for wrapper in population.iter_mut().skip(elite) {
            wrapper.genome.mutate();
        }
    }

    /// With more than one non-dominated genome there is no single "best";
    /// picks the member of the best-set closest to the front of its own
    /// (arbitrary but stable) storage order, matching the single-objective
    /// policy's "first" convention.
    pub fn select_preferred_genome<'a>(&self, best_set: &'a BestSet) -> Option<&'a dyn Genome> {
        best_set.genomes().first().map(|g| g.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ga_core::genome::GenomeWrapper;
    use std::any::Any;

    struct Point(f64, f64, usize);
    impl Genome for Point {
        fn calculate_fitness(&mut self) {}
        fn is_fitter_than(&self, other: &dyn Genome) -> bool {
            let other = other.as_any().downcast_ref::<Point>().unwrap();
            let mine = if self.2 == 0 { self.0 } else { self.1 };
            let theirs = if self.2 == 0 { other.0 } else { other.1 };
            mine < theirs
        }
        fn set_active_fitness_component(&mut self, index: usize) {
            self.2 = index;
        }
        fn reproduce(&self, _other: &dyn Genome) -> Box<dyn Genome> {
            self.clone_genome()
        }
        fn clone_genome(&self) -> Box<dyn Genome> {
            Box::new(Point(self.0, self.1, self.2))
        }
        fn mutate(&mut self) {}
        fn describe_fitness(&self) -> String {
            format!("{},{}", self.0, self.1)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn population(points: &[(f64, f64)]) -> Population {
        let wrappers = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| GenomeWrapper::fresh(Box::new(Point(x, y, 0)), i))
            .collect();
        Population::new(wrappers).unwrap()
    }

    #[test]
    fn sort_places_front_first() {
        let mut population = population(&[(3.0, 3.0), (0.0, 5.0), (5.0, 0.0), (5.0, 5.0), (1.0, 1.0)]);
        let defaults = MultiObjectiveDefaults::new(2, GaParams::default());
        defaults.sort(&mut population);

        assert!(defaults.front_size.get() >= 1);
        let dominated_last = population.iter().last().unwrap();
        assert_eq!(dominated_last.genome.describe_fitness(), "5,5");
    }

    #[test]
    fn update_best_genomes_builds_a_front() {
        let mut population = population(&[(3.0, 3.0), (0.0, 5.0), (5.0, 0.0), (5.0, 5.0), (1.0, 1.0)]);
        let defaults = MultiObjectiveDefaults::new(2, GaParams::default());
        defaults.sort(&mut population);

        let mut best_set = BestSet::new();
        defaults.update_best_genomes(&population, &mut best_set);
        assert!(!best_set.is_empty());
        assert!(!best_set.genomes().iter().any(|g| g.describe_fitness() == "5,5"));
    }
}
