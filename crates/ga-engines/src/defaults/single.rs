//! The single-objective policy bundle (§4.3, K == 1). Embedded as a field
//! and delegated to by a concrete `Factory`, per the composition-over-
//! virtual-inheritance design note in §9, rather than implemented via a
//! trait hierarchy.
//!
//! `Factory`'s policy methods take `&self`; the handful of bits this bundle
//! needs to remember between calls within one generation (the params, and
//! whichever genome `update_best_genomes` just crowned) live behind `Cell`
//! and `RefCell` so the bundle itself never needs `&mut self`.

use crate::best_set_maintainer;
use crate::breeding;
use ga_core::best_set::BestSet;
use ga_core::genome::Genome;
use ga_core::params::GaParams;
use ga_core::population::Population;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

pub struct SingleObjectiveDefaults {
    params: Cell<GaParams>,
    preferred: RefCell<Option<Box<dyn Genome>>>,
}

impl SingleObjectiveDefaults {
    pub fn new(params: GaParams) -> Self {
        Self {
            params: Cell::new(params),
            preferred: RefCell::new(None),
        }
    }

    pub fn params(&self) -> GaParams {
        self.params.get()
    }

    pub fn set_params(&self, params: GaParams) {
        self.params.set(params);
    }

    /// Orders the population by fitness, fittest first (§4.3: single-
    /// objective sorting is just the genome's own total order).
    pub fn sort(&self, population: &mut Population) {
        population.as_mut_slice().sort_by(|a, b| {
            if a.genome.is_fitter_than(b.genome.as_ref()) {
                Ordering::Less
            } else if b.genome.is_fitter_than(a.genome.as_ref()) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
    }

    pub fn update_best_genomes(&self, population: &Population, best_set: &mut BestSet) {
        best_set_maintainer::update_single_objective(population, best_set);
        *self.preferred.borrow_mut() = best_set.genomes().first().map(|g| g.clone_genome());
    }

    pub fn breed(&self, population: &Population) -> Population {
        let params = self.params.get();
        let preferred = self.preferred.borrow();
        let children = breeding::breed_pool(population.as_slice(), &params, preferred.as_deref());
        Population::new(children).expect("breeding preserves the population's size")
    }

    /// Mutates every genome except the elite slot `breed` copied forward
    /// verbatim (§4.3: "mutate every slot except the elitism slot" —
    /// always exactly one, never a population-scaled count).
    pub fn introduce_mutations(&self, population: &mut Population) {
        let elite = breeding::SINGLE_OBJECTIVE_ELITE_COUNT;
        for wrapper in population.iter_mut().skip(elite) {
            wrapper.genome.mutate();
        }
    }

    pub fn select_preferred_genome<'a>(&self, best_set: &'a BestSet) -> Option<&'a dyn Genome> {
        best_set.genomes().first().map(|g| g.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ga_core::genome::GenomeWrapper;
    use std::any::Any;

    struct Scalar(f64);
    impl Genome for Scalar {
        fn calculate_fitness(&mut self) {}
        fn is_fitter_than(&self, other: &dyn Genome) -> bool {
            self.0 < other.as_any().downcast_ref::<Scalar>().unwrap().0
        }
        fn set_active_fitness_component(&mut self, _index: usize) {}
        fn reproduce(&self, other: &dyn Genome) -> Box<dyn Genome> {
            let other = other.as_any().downcast_ref::<Scalar>().unwrap();
            Box::new(Scalar((self.0 + other.0) / 2.0))
        }
        fn clone_genome(&self) -> Box<dyn Genome> {
            Box::new(Scalar(self.0))
        }
        fn mutate(&mut self) {
            self.0 -= 0.01;
        }
        fn describe_fitness(&self) -> String {
            self.0.to_string()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn population(values: &[f64]) -> Population {
        let wrappers = values
            .iter()
            .enumerate()
            .map(|(i, &v)| GenomeWrapper::fresh(Box::new(Scalar(v)), i))
            .collect();
        Population::new(wrappers).unwrap()
    }

    #[test]
    fn sort_places_fittest_first() {
        let mut population = population(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let defaults = SingleObjectiveDefaults::new(GaParams::default());
        defaults.sort(&mut population);

        let fitnesses: Vec<f64> = population
            .iter()
            .map(|w| w.genome.as_any().downcast_ref::<Scalar>().unwrap().0)
            .collect();
        assert_eq!(fitnesses, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn update_best_then_breed_carries_preferred_forward() {
        let mut population = population(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let defaults = SingleObjectiveDefaults::new(GaParams {
            always_include_best: true,
            elitism: false,
            ..GaParams::default()
        });
        defaults.sort(&mut population);

        let mut best_set = BestSet::new();
        defaults.update_best_genomes(&population, &mut best_set);
        assert_eq!(best_set.genomes()[0].describe_fitness(), "1");

        let children = defaults.breed(&population);
        assert!(
            children
                .iter()
                .any(|w| w.genome.describe_fitness() == "1")
        );
    }
}
