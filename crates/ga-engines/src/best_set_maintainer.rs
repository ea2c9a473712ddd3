//! Best-set maintenance (§4.6). Single-objective keeps at most one genome;
//! multi-objective keeps the non-dominated union of the previous best-set
//! and the freshly-sorted population's front, deduplicated by component-
//! wise fitness equality (§4.4: "two members are equal iff `isFitterThan`
//! returns false in both directions on every component") — an Open
//! Question the spec flags as a deliberate policy choice, not resolved by
//! comparing rendered fitness descriptions (see DESIGN.md).

use ga_core::genome::Genome;
use ga_core::objective::{dominates, fitness_tied};
use ga_core::population::Population;
use ga_core::best_set::BestSet;

/// Replaces `best_set` with the single fittest genome in `population`,
/// comparing against whatever the set already holds.
pub fn update_single_objective(population: &Population, best_set: &mut BestSet) {
    let mut best: Option<Box<dyn Genome>> = best_set.genomes().first().map(|g| g.clone_genome());

    for wrapper in population.iter() {
        let replace = match &best {
            None => true,
            Some(current) => wrapper.genome.is_fitter_than(current.as_ref()),
        };
        if replace {
            best = Some(wrapper.genome.clone_genome());
        }
    }

    best_set.replace(best.into_iter().collect());
}

/// Merges `population`'s front (its non-dominated layer, conventionally
/// the leading `front_size` wrappers once sorted) into `best_set`, keeping
/// only a non-dominated, de-duplicated antichain.
pub fn update_multi_objective(
    population: &Population,
    front_size: usize,
    components: usize,
    best_set: &mut BestSet,
) {
    let mut candidates: Vec<Box<dyn Genome>> = best_set
        .genomes()
        .iter()
        .map(|g| g.clone_genome())
        .chain(population.iter().take(front_size).map(|w| w.genome.clone_genome()))
        .collect();

    let mut kept: Vec<Box<dyn Genome>> = Vec::with_capacity(candidates.len());

    'candidate: while let Some(mut candidate) = candidates.pop() {
        let mut i = 0;
        while i < kept.len() {
            if dominates(kept[i].as_mut(), candidate.as_mut(), components) {
                continue 'candidate;
            }
            if dominates(candidate.as_mut(), kept[i].as_mut(), components) {
                kept.swap_remove(i);
                continue;
            }
            if fitness_tied(candidate.as_mut(), kept[i].as_mut(), components) {
                continue 'candidate;
            }
            i += 1;
        }
        kept.push(candidate);
    }

    best_set.replace(kept);
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
    fn single_objective_keeps_only_the_fittest() {
        let population = population(&[(3.0, 0.0), (1.0, 0.0), (2.0, 0.0), (5.0, 0.0), (4.0, 0.0)]);
        let mut best_set = BestSet::new();
        update_single_objective(&population, &mut best_set);
        assert_eq!(best_set.len(), 1);
        assert_eq!(best_set.genomes()[0].describe_fitness(), "1,0");
    }

    #[test]
    fn multi_objective_best_set_stays_non_dominated() {
        let population = population(&[(0.0, 5.0), (1.0, 4.0), (5.0, 5.0), (2.0, 2.0), (4.0, 0.0)]);
        let mut best_set = BestSet::new();
        update_multi_objective(&population, 5, 2, &mut best_set);

        let genomes = best_set.genomes();
        assert!(!genomes.iter().any(|g| g.describe_fitness() == "5,5"));
        for i in 0..genomes.len() {
            for j in 0..genomes.len() {
                if i == j {
                    continue;
                }
                let mut a = genomes[i].clone_genome();
                let mut b = genomes[j].clone_genome();
                assert!(!dominates(a.as_mut(), b.as_mut(), 2));
            }
        }
    }
}
