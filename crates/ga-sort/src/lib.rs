//! Non-dominated sorting (§4.4): three interchangeable strategies that must
//! all produce byte-identical layering for equal inputs. `Counted` is the
//! best default per the design notes (§9); `Basic` always works; `Offloaded`
//! parallelizes the pairwise-comparison pass with `rayon` when the
//! `rayon` feature is enabled.

use ga_core::genome::GenomeWrapper;

/// Threshold below which the counted strategy's `Vec<Vec<bool>>` dominance
/// matrix is cheap to hold in memory (§4.4 table: `S < 65536`).
pub const COUNTED_STRATEGY_MAX_POPULATION: usize = 65_536;

/// A non-dominated sorting strategy. Given `n` candidates and a dominance
/// predicate, returns the layer index of each candidate (`result[i]` is the
/// layer of candidate `i`), with layer 0 being the non-dominated front.
pub trait NonDominatedSort: Send + Sync {
    fn name(&self) -> &'static str;
    fn rank(&self, n: usize, dominates: &dyn Fn(usize, usize) -> bool) -> Vec<usize>;
}

/// Groups wrapper indices by layer, in their original relative order
/// within each layer (the spec leaves intra-layer order unspecified but
/// stable).
pub fn layers_from_ranks(ranks: &[usize]) -> Vec<Vec<usize>> {
    let max_layer = ranks.iter().copied().max().unwrap_or(0);
    let mut layers = vec![Vec::new(); max_layer + 1];
    for (idx, &layer) in ranks.iter().enumerate() {
        layers[layer].push(idx);
    }
    layers
}

/// Reorders `population` into `L0 ‖ L1 ‖ ...` given the ranks computed by a
/// [`NonDominatedSort`], returning the resulting layers as index lists into
/// the *new* order (this is `orderedSets`, used by breeding).
pub fn concatenate_layers(
    population: &mut Vec<GenomeWrapper>,
    ranks: &[usize],
) -> Vec<Vec<usize>> {
    let layers = layers_from_ranks(ranks);

    let mut old = std::mem::take(population);
    let mut taken = vec![None; old.len()];
    for (i, slot) in old.drain(..).enumerate() {
        taken[i] = Some(slot);
    }

    let mut ordered_sets = Vec::with_capacity(layers.len());
    let mut new_population = Vec::with_capacity(taken.len());

    for layer in &layers {
        let mut layer_positions = Vec::with_capacity(layer.len());
        for &old_idx in layer {
            let wrapper = taken[old_idx].take().expect("each index appears once");
            layer_positions.push(new_population.len());
            new_population.push(wrapper);
        }
        ordered_sets.push(layer_positions);
    }

    *population = new_population;
    ordered_sets
}

/// O(L * N^2): repeatedly peels the non-dominated front from whatever
/// remains. Always available, used as the fallback strategy.
pub struct BasicSort;

impl NonDominatedSort for BasicSort {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn rank(&self, n: usize, dominates: &dyn Fn(usize, usize) -> bool) -> Vec<usize> {
        let mut ranks = vec![usize::MAX; n];
        let mut remaining: Vec<usize> = (0..n).collect();
        let mut layer = 0usize;

        while !remaining.is_empty() {
            let front: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| !remaining.iter().any(|&j| j != i && dominates(j, i)))
                .collect();

            for &i in &front {
                ranks[i] = layer;
            }

            remaining.retain(|i| !front.contains(i));
            layer += 1;
        }

        ranks
    }
}

/// Computes the full O(N^2) pairwise dominance relation once, then peels
/// layers in O(N) via the classic fast-non-dominated-sort queue (the same
/// shape as NSGA-II's rank assignment).
pub struct CountedSort;

impl NonDominatedSort for CountedSort {
    fn name(&self) -> &'static str {
        "counted"
    }

    fn rank(&self, n: usize, dominates: &dyn Fn(usize, usize) -> bool) -> Vec<usize> {
        counted_rank(n, |i, j| dominates(i, j))
    }
}

fn counted_rank(n: usize, dominates: impl Fn(usize, usize) -> bool) -> Vec<usize> {
    let mut dominated_counts = vec![0usize; n];
    let mut dominates_list: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(i, j) {
                dominates_list[i].push(j);
                dominated_counts[j] += 1;
            } else if dominates(j, i) {
                dominates_list[j].push(i);
                dominated_counts[i] += 1;
            }
        }
    }

    let mut ranks = vec![0usize; n];
    let mut current_front: Vec<usize> = (0..n).filter(|&i| dominated_counts[i] == 0).collect();
    let mut layer = 0usize;

    while !current_front.is_empty() {
        let mut next_front = Vec::new();
        for &p in &current_front {
            ranks[p] = layer;
            for &q in &dominates_list[p] {
                dominated_counts[q] -= 1;
                if dominated_counts[q] == 0 {
                    next_front.push(q);
                }
            }
        }
        layer += 1;
        current_front = next_front;
    }

    ranks
}

/// Same layering as [`CountedSort`], but computes the O(N^2) pairwise pass
/// with `rayon` when the `rayon` feature is enabled — standing in for the
/// optional accelerator offload described in §4.4. Falls back to the
/// sequential counted pass when the feature is off.
pub struct OffloadedSort;

impl NonDominatedSort for OffloadedSort {
    fn name(&self) -> &'static str {
        "offloaded"
    }

    #[cfg(feature = "rayon")]
    fn rank(&self, n: usize, dominates: &dyn Fn(usize, usize) -> bool) -> Vec<usize> {
        use rayon::prelude::*;

        let pairs: Vec<(usize, usize, bool, bool)> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| (i, j, dominates(i, j), dominates(j, i)))
            .collect();

        let mut dominated_counts = vec![0usize; n];
        let mut dominates_list: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, j, i_dominates_j, j_dominates_i) in pairs {
            if i_dominates_j {
                dominates_list[i].push(j);
                dominated_counts[j] += 1;
            } else if j_dominates_i {
                dominates_list[j].push(i);
                dominated_counts[i] += 1;
            }
        }

        let mut ranks = vec![0usize; n];
        let mut current_front: Vec<usize> =
            (0..n).filter(|&i| dominated_counts[i] == 0).collect();
        let mut layer = 0usize;

        while !current_front.is_empty() {
            let mut next_front = Vec::new();
            for &p in &current_front {
                ranks[p] = layer;
                for &q in &dominates_list[p] {
                    dominated_counts[q] -= 1;
                    if dominated_counts[q] == 0 {
                        next_front.push(q);
                    }
                }
            }
            layer += 1;
            current_front = next_front;
        }

        ranks
    }

    #[cfg(not(feature = "rayon"))]
    fn rank(&self, n: usize, dominates: &dyn Fn(usize, usize) -> bool) -> Vec<usize> {
        counted_rank(n, |i, j| dominates(i, j))
    }
}

/// Hint describing whether an accelerator-backed strategy should be
/// preferred, matching the choice condition table in §4.4.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyHint {
    pub accelerator_available: bool,
    pub fitness_is_float: bool,
}

/// Chooses a strategy the way the engine does at init: offloaded when an
/// accelerator is present and fitness is floating-point, counted below the
/// population-size threshold, basic otherwise.
pub fn choose_strategy(population_size: usize, hint: StrategyHint) -> Box<dyn NonDominatedSort> {
    if hint.accelerator_available && hint.fitness_is_float {
        Box::new(OffloadedSort)
    } else if population_size < COUNTED_STRATEGY_MAX_POPULATION {
        Box::new(CountedSort)
    } else {
        Box::new(BasicSort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dominance over 2-D points where smaller is better on both axes.
    fn points_dominate(points: &[(f64, f64)]) -> impl Fn(usize, usize) -> bool + '_ {
        move |i, j| {
            let (ai, bi) = points[i];
            let (aj, bj) = points[j];
            (ai <= aj && bi <= bj) && (ai < aj || bi < bj)
        }
    }

    #[test]
    fn strategies_agree_on_layer_multisets() {
        let points = vec![
            (0.0, 5.0),
            (1.0, 4.0),
            (2.0, 3.0),
            (3.0, 2.0),
            (4.0, 1.0),
            (5.0, 0.0),
            (3.0, 3.0),
            (1.0, 1.0),
        ];
        let dominates = points_dominate(&points);

        let basic = BasicSort.rank(points.len(), &dominates);
        let counted = CountedSort.rank(points.len(), &dominates);
        let offloaded = OffloadedSort.rank(points.len(), &dominates);

        let mut basic_layers = layers_from_ranks(&basic);
        let mut counted_layers = layers_from_ranks(&counted);
        let mut offloaded_layers = layers_from_ranks(&offloaded);

        for layers in [&mut basic_layers, &mut counted_layers, &mut offloaded_layers] {
            for layer in layers.iter_mut() {
                layer.sort_unstable();
            }
        }

        assert_eq!(basic_layers, counted_layers);
        assert_eq!(basic_layers, offloaded_layers);
    }

    #[test]
    fn front_is_non_dominated_antichain() {
        let points = vec![(0.0, 5.0), (1.0, 4.0), (5.0, 5.0), (2.0, 2.0)];
        let dominates = points_dominate(&points);
        let ranks = CountedSort.rank(points.len(), &dominates);
        let layers = layers_from_ranks(&ranks);

        for &i in &layers[0] {
            for &j in &layers[0] {
                if i != j {
                    assert!(!dominates(i, j));
                }
            }
        }
    }

    #[test]
    fn choose_strategy_respects_table() {
        let basic = choose_strategy(100_000, StrategyHint::default());
        assert_eq!(basic.name(), "basic");

        let counted = choose_strategy(100, StrategyHint::default());
        assert_eq!(counted.name(), "counted");

        let offloaded = choose_strategy(
            100,
            StrategyHint {
                accelerator_available: true,
                fitness_is_float: true,
            },
        );
        assert_eq!(offloaded.name(), "offloaded");
    }
}
