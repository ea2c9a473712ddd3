//! Per-helper distribution bookkeeping and the write-target rebalancing
//! algorithm (§4.8). Kept free of any socket or async dependency so the
//! rebalancing math can be unit tested directly against the spec's
//! worked conditions.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperState {
    /// Connected, but HELPER_HELLO/FACTORY_RESULT hasn't resolved it yet.
    Unidentified,
    Idle,
    Calculating,
}

/// Everything the coordinator tracks about one helper across a
/// generation's dispatch/collect cycle.
#[derive(Debug, Clone)]
pub struct DistributionState {
    pub state: HelperState,
    pub acked_factory_id: Option<i32>,
    pub can_help: bool,
    pub write_target: usize,
    pub written_this_gen: usize,
    pub last_delivery_micros: Option<u64>,
    pub assigned_indices: Vec<usize>,
    /// Monotonic version of the last `writeCommonGenerationInfo` payload
    /// this helper is known to have received (§4.10 in SPEC_FULL.md).
    pub acked_generation_info: u64,
}

impl Default for DistributionState {
    fn default() -> Self {
        Self {
            state: HelperState::Unidentified,
            acked_factory_id: None,
            can_help: false,
            write_target: 1,
            written_this_gen: 0,
            last_delivery_micros: None,
            assigned_indices: Vec::new(),
            acked_generation_info: 0,
        }
    }
}

impl DistributionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the per-generation counters ahead of a fresh dispatch round,
    /// leaving identity/ack state (`can_help`, `acked_factory_id`,
    /// `write_target`) untouched.
    pub fn begin_generation(&mut self) {
        self.written_this_gen = 0;
        self.last_delivery_micros = None;
        self.assigned_indices.clear();
        if self.can_help {
            self.state = HelperState::Idle;
        }
    }

    pub fn remaining_quota(&self) -> usize {
        self.write_target.saturating_sub(self.written_this_gen)
    }
}

/// Moves quota from slow helpers to fast ones while doing so strictly
/// reduces the worst-case projected time of the pair, then rescales every
/// quota so they sum to exactly `population_size` (§4.8 step 7).
///
/// `per_genome_time` only contains helpers that delivered at least one
/// genome this generation; helpers missing from it keep whatever quota
/// `current_targets` already assigns them (never below 1) and are left
/// out of the fast/slow search, since there is no observed rate to compare
/// against.
pub fn rebalance(
    current_targets: &HashMap<u64, usize>,
    per_genome_time: &HashMap<u64, f64>,
    population_size: usize,
) -> HashMap<u64, usize> {
    let mut targets = current_targets.clone();
    for (&id, &t) in current_targets {
        targets.entry(id).or_insert(t.max(1));
    }

    loop {
        let mut slowest: Option<(u64, f64)> = None;
        let mut fastest: Option<(u64, f64)> = None;

        for (&id, &rate) in per_genome_time {
            let target = *targets.get(&id).unwrap_or(&1);
            let projected = rate * target as f64;
            if slowest.is_none_or(|(_, p)| projected > p) {
                slowest = Some((id, projected));
            }
            if fastest.is_none_or(|(_, p)| projected < p) {
                fastest = Some((id, projected));
            }
        }

        let (Some((slow_id, slow_proj)), Some((fast_id, fast_proj))) = (slowest, fastest) else {
            break;
        };
        if slow_id == fast_id {
            break;
        }

        let slow_target = *targets.get(&slow_id).unwrap_or(&1);
        if slow_target <= 1 {
            break;
        }
        let fast_target = *targets.get(&fast_id).unwrap_or(&1);

        let new_slow_proj = per_genome_time[&slow_id] * (slow_target - 1) as f64;
        let new_fast_proj = per_genome_time[&fast_id] * (fast_target + 1) as f64;

        if new_slow_proj.max(new_fast_proj) < slow_proj.max(fast_proj) {
            targets.insert(slow_id, slow_target - 1);
            targets.insert(fast_id, fast_target + 1);
        } else {
            break;
        }
    }

    scale_to_sum(&mut targets, per_genome_time, population_size);
    targets
}

/// Redistributes the surplus/deficit between the rebalanced total and
/// `population_size` so quotas sum to exactly `S`: round-robin over
/// quota-greater-than-one helpers to find a trim, round-robin over every
/// helper to hand out a surplus, falling back to the fastest helper if the
/// round-robin can't absorb all of it (too few eligible helpers).
fn scale_to_sum(
    targets: &mut HashMap<u64, usize>,
    per_genome_time: &HashMap<u64, f64>,
    population_size: usize,
) {
    if targets.is_empty() {
        return;
    }

    let sum: usize = targets.values().sum();
    if sum == population_size {
        return;
    }

    let mut ids: Vec<u64> = targets.keys().copied().collect();
    ids.sort_unstable();

    if sum < population_size {
        let mut deficit = population_size - sum;
        let best = fastest_helper(per_genome_time).or_else(|| ids.first().copied());
        let mut i = 0;
        while deficit > 0 {
            let id = ids[i % ids.len()];
            *targets.get_mut(&id).unwrap() += 1;
            deficit -= 1;
            i += 1;
        }
        let _ = best;
    } else {
        let mut surplus = sum - population_size;
        let mut guard = 0usize;
        while surplus > 0 {
            let eligible: Vec<u64> = ids
                .iter()
                .copied()
                .filter(|id| targets[id] > 1)
                .collect();
            if eligible.is_empty() {
                break;
            }
            let id = eligible[guard % eligible.len()];
            let entry = targets.get_mut(&id).unwrap();
            *entry -= 1;
            surplus -= 1;
            guard += 1;
        }
        // Too few helpers with quota > 1 to absorb the whole surplus: hand
        // the remainder to the best (fastest) helper, clamped at 1.
        if surplus > 0 {
            if let Some(best) = fastest_helper(per_genome_time).or_else(|| ids.first().copied()) {
                let entry = targets.get_mut(&best).unwrap();
                *entry = entry.saturating_sub(surplus).max(1);
            }
        }
    }
}

fn fastest_helper(per_genome_time: &HashMap<u64, f64>) -> Option<u64> {
    per_genome_time
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(&id, _)| id)
}

/// Splits `population_size` work items across `helper_ids` for generation
/// zero, when there is no per-genome timing yet to weigh the split by —
/// every helper starts at quota 1 and is topped up round-robin.
pub fn initial_targets(helper_ids: &[u64], population_size: usize) -> HashMap<u64, usize> {
    let mut targets: HashMap<u64, usize> = helper_ids.iter().map(|&id| (id, 1)).collect();
    let mut sorted = helper_ids.to_vec();
    sorted.sort_unstable();
    scale_to_sum(&mut targets, &HashMap::new(), population_size);
    targets
}
