//! The shared breeding body (§4.5): given any pool of parent wrappers
//! already arranged best-to-worst — the whole sorted population for
//! single-objective, or `L0 ‖ L1 ‖ ...` for multi-objective — both default
//! policies draw children the same way. What differs between the two modes
//! is only how the pool is built, not how it is bred from.

use ga_core::genome::{Genome, GenomeWrapper};
use ga_core::params::GaParams;
use ga_core::random_provider;
use ga_core::selector::pick_index;

/// Fraction of the population each of elitism and "always include best"
/// carries forward unchanged, rounded up to at least one slot.
pub const CARRY_FORWARD_FRACTION: f64 = 0.005;

/// How many times to retry drawing a second parent before breeding from
/// related parents anyway (§4.4: "retry up to 10 times... accept on the
/// 10th try regardless") — an unlucky population can make a strictly
/// inbreeding-free draw impossible. The first draw counts as try 1, so 9
/// retries make 10 tries in total.
pub const MAX_INBREEDING_RETRIES: usize = 9;

pub fn carry_forward_count(population_size: usize) -> usize {
    ((CARRY_FORWARD_FRACTION * population_size as f64).round() as usize).max(1)
}

/// Single-objective elitism/best-pin always carries forward exactly one
/// genome, never a population-scaled count (§4.3: "mutate every slot
/// except the elitism slot" — singular — "so the single elite is
/// preserved byte-for-byte"; confirmed against
/// `gafactorysingleobjective.cpp`'s unconditional single-slot copy).
pub const SINGLE_OBJECTIVE_ELITE_COUNT: usize = 1;

/// Breeds a full replacement generation of `pool.len()` children from
/// `pool`. `preferred` is the best-set's selected genome, copied forward
/// verbatim when `params.always_include_best` is set — independently of,
/// and in addition to, ordinary elitism.
pub fn breed_pool(
    pool: &[GenomeWrapper],
    params: &GaParams,
    preferred: Option<&dyn Genome>,
) -> Vec<GenomeWrapper> {
    breed_pool_with(pool, params, preferred, SINGLE_OBJECTIVE_ELITE_COUNT, |beta| {
        pick_index(beta, pool.len())
    })
}

/// Multi-objective breeding (§4.4): parents are drawn by first picking a
/// layer with the rank-biased picker over `layers.len()`, then a uniform
/// sub-index within that layer — as opposed to the single rank-biased pick
/// over the whole concatenated population the single-objective path uses
/// (§4.5: "Sub-index is omitted; layer-index becomes genome-index").
/// `layers` holds index lists into `pool` (the already-sorted
/// `L0 ‖ L1 ‖ ...` population), ordered front-first. The elitism/best-pin
/// count is `carry_forward_count(pool.len())` clamped to the L0 front's
/// size (`layers[0].len()`) — "layer-L₀ members" per §4.4, matching
/// `gafactorymultiobjective.cpp`'s `eliteCount > nonDominatedSetSize`
/// clamp — so dominated genomes are never copied in as "elite."
pub fn breed_pool_layered(
    pool: &[GenomeWrapper],
    layers: &[Vec<usize>],
    params: &GaParams,
    preferred: Option<&dyn Genome>,
) -> Vec<GenomeWrapper> {
    let front_size = layers.first().map(Vec::len).unwrap_or(0);
    let elite_count = carry_forward_count(pool.len()).min(front_size);
    breed_pool_with(pool, params, preferred, elite_count, |beta| {
        pick_from_layers(beta, layers)
    })
}

/// Draws an index into `pool` using `picker` for each parent, subject to
/// the shared elitism/best-pin/inbreeding/crossover rules (§4.4/§4.5).
/// `elite_count` is how many genomes each of `elitism`/`always_include_best`
/// carries forward independently (so with both flags set, up to
/// `2 * elite_count` slots are pinned — the elitism-double-counting
/// behavior documented in DESIGN.md).
fn breed_pool_with(
    pool: &[GenomeWrapper],
    params: &GaParams,
    preferred: Option<&dyn Genome>,
    elite_count: usize,
    picker: impl Fn(f64) -> usize,
) -> Vec<GenomeWrapper> {
    let n = pool.len();
    let mut children = Vec::with_capacity(n);

    if params.elitism {
        let count = elite_count.min(n);
        for wrapper in &pool[..count] {
            children.push(GenomeWrapper::fresh(wrapper.genome.clone_genome(), 0));
        }
    }

    if params.always_include_best {
        if let Some(best) = preferred {
            for _ in 0..elite_count {
                if children.len() >= n {
                    break;
                }
                children.push(GenomeWrapper::fresh(best.clone_genome(), 0));
            }
        }
    }

    while children.len() < n {
        let (genome, parent1, parent2) = breed_one(pool, params, &picker);
        children.push(GenomeWrapper::bred(genome, parent1, parent2, 0));
    }

    for (i, child) in children.iter_mut().enumerate() {
        child.position = i;
    }

    children
}

/// Picks a layer index with [`pick_index`], then a uniform sub-index
/// within it, returning the selected genome's index into the flat
/// `L0 ‖ L1 ‖ ...` population.
fn pick_from_layers(beta: f64, layers: &[Vec<usize>]) -> usize {
    let layer = pick_index(beta, layers.len());
    let members = &layers[layer];
    let sub_index = if members.len() <= 1 {
        0
    } else {
        random_provider::range(0..members.len())
    };
    members[sub_index]
}

fn breed_one(
    pool: &[GenomeWrapper],
    params: &GaParams,
    picker: &impl Fn(f64) -> usize,
) -> (Box<dyn Genome>, i32, i32) {
    let p1 = picker(params.beta);
    let mut p2 = picker(params.beta);

    let mut attempts = 0;
    while attempts < MAX_INBREEDING_RETRIES
        && (p2 == p1 || pool[p1].shares_parent_with(&pool[p2]))
    {
        p2 = picker(params.beta);
        attempts += 1;
    }

    if random_provider::bool(params.crossover_rate as f32) {
        let child = pool[p1].genome.reproduce(pool[p2].genome.as_ref());
        (child, pool[p1].position as i32, pool[p2].position as i32)
    } else {
        let child = pool[p1].genome.clone_genome();
        (child, pool[p1].position as i32, GenomeWrapper::NO_PARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
        fn mutate(&mut self) {}
        fn describe_fitness(&self) -> String {
            self.0.to_string()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn pool(n: usize) -> Vec<GenomeWrapper> {
        (0..n)
            .map(|i| GenomeWrapper::fresh(Box::new(Scalar(i as f64)), i))
            .collect()
    }

    #[test]
    fn breeds_exactly_pool_size_children() {
        let pool = pool(20);
        let params = GaParams::default();
        let children = breed_pool(&pool, &params, None);
        assert_eq!(children.len(), pool.len());
    }

    #[test]
    fn elitism_carries_best_genomes_forward_unchanged() {
        let pool = pool(200);
        let params = GaParams {
            elitism: true,
            always_include_best: false,
            ..GaParams::default()
        };
        let children = breed_pool(&pool, &params, None);
        let elite = SINGLE_OBJECTIVE_ELITE_COUNT;
        for child in &children[..elite] {
            let fitness = child.genome.as_any().downcast_ref::<Scalar>().unwrap().0;
            assert!(fitness < elite as f64, "elite slot should copy a top genome verbatim");
        }
    }

    #[test]
    fn layered_breeding_clamps_elite_count_to_the_front_size() {
        // carry_forward_count(2000) == 10, but the front (layer 0) only
        // has 3 members — elitism must not reach past the front into a
        // dominated layer to fill out a 10-slot elite block.
        let pool = pool(2000);
        let layers: Vec<Vec<usize>> = vec![(0..3).collect(), (3..2000).collect()];
        let params = GaParams {
            elitism: true,
            always_include_best: false,
            ..GaParams::default()
        };
        let children = breed_pool_layered(&pool, &layers, &params, None);
        assert_eq!(children.len(), pool.len());
        for child in &children[..3] {
            let fitness = child.genome.as_any().downcast_ref::<Scalar>().unwrap().0;
            assert!(fitness < 3.0, "elitism should only copy from the front's 3 members");
        }
    }

    #[test]
    fn positions_are_reassigned_densely() {
        let pool = pool(10);
        let params = GaParams::default();
        let children = breed_pool(&pool, &params, None);
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.position, i);
        }
    }

    #[test]
    fn layered_breeding_only_draws_from_declared_layers() {
        let pool = pool(9);
        let layers = vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]];
        let params = GaParams {
            elitism: false,
            always_include_best: false,
            crossover_rate: 1.0,
            ..GaParams::default()
        };
        let children = breed_pool_layered(&pool, &layers, &params, None);
        assert_eq!(children.len(), pool.len());
    }

    #[test]
    fn layered_picker_never_escapes_its_layer_bounds() {
        let layers = vec![vec![0, 1], vec![2], vec![3, 4, 5]];
        for _ in 0..200 {
            let idx = pick_from_layers(1.0, &layers);
            assert!(idx < 6, "picked index {idx} out of the declared layer ranges");
        }
    }
}
