//! Budget allocation across a wager portfolio by parallel multi-start simulated
//! annealing, maximising a correlation-adjusted Sharpe-style objective, followed
//! by deterministic quantisation of the winning weight vector to currency units.

use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::bail;
use rustc_hash::FxHashMap;
use tinyrand::{Rand, Seeded, StdRand};
use tracing::debug;

use crate::domain::{BetProposal, ConditionalEntry, SelectionKey};
use crate::opt::{anneal, random_f64, AnnealingConfig};
use crate::probs::SliceExt;

const MAX_SEARCHES: usize = 4;
const STARTS_PER_SEARCH: usize = 3;
const MIN_TEMP: f64 = 1e-4;
const SHAKE_PROB: f64 = 0.05;
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Clone, Debug)]
pub struct StakingConfig {
    /// Smallest permitted nonzero stake, in currency units.
    pub min_stake: u64,
    /// Stake granularity; every stake is a multiple of this.
    pub unit: u64,
    /// Base PRNG seed; `None` derives one from the wall clock.
    pub seed: Option<u64>,
    /// Annealing step bound per starting point.
    pub max_steps: u64,
}
impl StakingConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.unit == 0 {
            bail!("stake unit must be positive");
        }
        if self.min_stake == 0 || self.min_stake % self.unit != 0 {
            bail!("minimum stake must be a positive multiple of the unit");
        }
        if self.max_steps == 0 {
            bail!("step bound must be positive");
        }
        Ok(())
    }
}
impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            min_stake: 100,
            unit: 100,
            seed: None,
            max_steps: 10_000,
        }
    }
}

/// Milestone snapshot passed to the caller's progress callback as each parallel
/// search completes.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationProgress {
    pub completed_searches: usize,
    pub total_searches: usize,
    pub best_objective: f64,
}

/// Spreads `budget` across the proposals, returning them with `stake` and
/// `expected_return` populated, sorted by wager class then descending stake.
/// The stake vector always sums to at most `budget`, and every nonzero stake is
/// a multiple of the configured unit and at least the minimum stake. A single
/// proposal receives the whole budget without any search.
pub fn allocate(
    proposals: &[BetProposal],
    budget: u64,
    conditionals: &[ConditionalEntry],
    config: &StakingConfig,
    progress: Option<&(dyn Fn(AllocationProgress) + Sync)>,
) -> Result<Vec<BetProposal>, anyhow::Error> {
    config.validate()?;
    if proposals.is_empty() {
        return Ok(vec![]);
    }
    for proposal in proposals {
        proposal.validate()?;
    }
    if budget < config.min_stake {
        bail!(
            "budget {budget} cannot cover the minimum stake of {}",
            config.min_stake
        );
    }

    if proposals.len() == 1 {
        let mut sized = proposals[0].clone();
        sized.stake = budget;
        sized.expected_return = budget as f64 * sized.odds;
        return Ok(vec![sized]);
    }

    let cond_matrix = conditional_matrix(proposals, conditionals);
    let ranked_by_ev = ranked_by_ev(proposals);
    let seed_base = config.seed.unwrap_or_else(clock_seed);
    let total_searches = (proposals.len() / 10).clamp(1, MAX_SEARCHES);

    let searches = thread::scope(|scope| {
        let handles: Vec<_> = (0..total_searches)
            .map(|index| {
                let cond_matrix = &cond_matrix;
                let ranked_by_ev = &ranked_by_ev;
                let seed = seed_base.wrapping_add(index as u64 * SEED_STRIDE);
                scope.spawn(move || {
                    run_search(index, proposals, cond_matrix, ranked_by_ev, seed, config)
                })
            })
            .collect();

        let mut searches = Vec::with_capacity(total_searches);
        for (completed, handle) in handles.into_iter().enumerate() {
            let search = handle
                .join()
                .map_err(|_| anyhow::anyhow!("annealing search panicked"))?;
            searches.push(search);
            if let Some(callback) = progress {
                let best_objective = searches
                    .iter()
                    .map(|search: &SearchResult| search.objective)
                    .fold(f64::MIN, f64::max);
                callback(AllocationProgress {
                    completed_searches: completed + 1,
                    total_searches,
                    best_objective,
                });
            }
        }
        Ok::<_, anyhow::Error>(searches)
    })?;

    // max-reduce across the independent searches; first-found wins ties
    let mut best = &searches[0];
    for search in &searches[1..] {
        if search.objective > best.objective {
            best = search;
        }
    }
    debug!(
        "best of {total_searches} searches scored {:.6}",
        best.objective
    );

    let stakes = quantise(&best.weights, proposals, budget, config);
    let mut sized: Vec<BetProposal> = proposals
        .iter()
        .zip(&stakes)
        .map(|(proposal, &stake)| {
            let mut sized = proposal.clone();
            sized.stake = stake;
            sized.expected_return = stake as f64 * sized.odds;
            sized
        })
        .collect();
    sized.sort_by(|a, b| {
        a.wager_class
            .cmp(&b.wager_class)
            .then(b.stake.cmp(&a.stake))
    });
    Ok(sized)
}

struct SearchResult {
    weights: Vec<f64>,
    objective: f64,
}

/// One independent annealing search: a slightly detuned cooling schedule per
/// search index, three starting vectors run back to back, best-ever kept.
fn run_search(
    index: usize,
    proposals: &[BetProposal],
    cond_matrix: &[Vec<Option<f64>>],
    ranked_by_ev: &[usize],
    seed: u64,
    config: &StakingConfig,
) -> SearchResult {
    let annealing = AnnealingConfig {
        init_temp: 1.0 + 0.2 * index as f64,
        cooling: 0.97 - 0.005 * index as f64,
        min_temp: MIN_TEMP,
        max_steps: config.max_steps,
        shake_prob: SHAKE_PROB,
    };
    let mut rand = StdRand::seed(seed);
    let mut best = SearchResult {
        weights: vec![],
        objective: f64::MIN,
    };
    for start in 0..STARTS_PER_SEARCH {
        let init = starting_weights(start, proposals, &mut rand);
        let outcome = anneal(
            &annealing,
            &init,
            |weights| objective(weights, proposals, cond_matrix),
            |weights, rand| shake(weights, ranked_by_ev, rand),
            &mut rand,
        );
        if outcome.optimal_objective > best.objective {
            best = SearchResult {
                weights: outcome.optimal_weights,
                objective: outcome.optimal_objective,
            };
        }
    }
    best
}

fn starting_weights(start: usize, proposals: &[BetProposal], rand: &mut StdRand) -> Vec<f64> {
    let mut weights: Vec<f64> = match start {
        0 => proposals
            .iter()
            .map(|proposal| proposal.probability * proposal.odds)
            .collect(),
        1 => proposals.iter().map(|proposal| proposal.probability).collect(),
        _ => proposals.iter().map(|_| random_f64(rand)).collect(),
    };
    if weights.normalise(1.0) == 0.0 {
        weights.fill(1.0 / proposals.len() as f64);
    }
    weights
}

/// Structural perturbation for escaping local optima: concentrate on the
/// strongest fifth by expected value, re-randomise outright, or jitter every
/// weight by a factor in [0.5, 1.5] and renormalise.
fn shake(weights: &mut [f64], ranked_by_ev: &[usize], rand: &mut StdRand) {
    match rand.next_u64() % 3 {
        0 => {
            let keep = usize::max(1, weights.len() / 5);
            weights.fill(0.0);
            for &strong in &ranked_by_ev[..keep] {
                weights[strong] = 1.0 / keep as f64;
            }
        }
        1 => {
            for weight in weights.iter_mut() {
                *weight = random_f64(rand);
            }
            if weights.normalise(1.0) == 0.0 {
                weights.fill(1.0 / weights.len() as f64);
            }
        }
        _ => {
            for weight in weights.iter_mut() {
                *weight *= 0.5 + random_f64(rand);
            }
            weights.normalise(1.0);
        }
    }
}

/// Risk-adjusted return of a weight vector. Each active proposal's contribution
/// is diminished by a factor `1 - p_j * (1 - P(i|j))` per correlated active
/// holding `j`, then the adjusted expected return is divided by the standard
/// deviation of the portfolio's payout. Zero variance scores zero.
fn objective(
    weights: &[f64],
    proposals: &[BetProposal],
    cond_matrix: &[Vec<Option<f64>>],
) -> f64 {
    let mut expected_return = 0.0;
    let mut variance = 0.0;
    for (i, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        let mut adjustment = 1.0;
        for (j, &other_weight) in weights.iter().enumerate() {
            if j == i || other_weight <= 0.0 {
                continue;
            }
            if let Some(conditional) = cond_matrix[i][j] {
                adjustment *= 1.0 - proposals[j].probability * (1.0 - conditional);
            }
        }
        let adjusted_prob = proposals[i].probability * adjustment;
        expected_return += weight * proposals[i].odds * adjusted_prob;
        variance += (proposals[i].odds - 1.0).powi(2)
            * weight.powi(2)
            * adjusted_prob
            * (1.0 - adjusted_prob);
    }
    if variance <= 0.0 {
        0.0
    } else {
        expected_return / variance.sqrt()
    }
}

/// `cond_matrix[i][j]` is the conditional applied when adjusting proposal `i`
/// for its overlap with an active holding `j`: the table entry conditioned on
/// `j`, falling back to the reverse direction when only that one exists.
fn conditional_matrix(
    proposals: &[BetProposal],
    conditionals: &[ConditionalEntry],
) -> Vec<Vec<Option<f64>>> {
    let mut by_key: FxHashMap<(SelectionKey, SelectionKey), f64> = FxHashMap::default();
    for entry in conditionals {
        by_key.insert((entry.condition.key(), entry.target.key()), entry.probability);
    }
    let keys: Vec<SelectionKey> = proposals.iter().map(BetProposal::key).collect();
    let mut matrix = vec![vec![None; proposals.len()]; proposals.len()];
    for i in 0..proposals.len() {
        for j in 0..proposals.len() {
            if i == j {
                continue;
            }
            matrix[i][j] = by_key
                .get(&(keys[j].clone(), keys[i].clone()))
                .or_else(|| by_key.get(&(keys[i].clone(), keys[j].clone())))
                .copied();
        }
    }
    matrix
}

/// Proposal indices sorted by descending `probability * odds`.
fn ranked_by_ev(proposals: &[BetProposal]) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..proposals.len()).collect();
    ranked.sort_by(|&a, &b| {
        let ev_a = proposals[a].probability * proposals[a].odds;
        let ev_b = proposals[b].probability * proposals[b].odds;
        ev_b.total_cmp(&ev_a)
    });
    ranked
}

/// Deterministic conversion of the winning weight vector into currency stakes:
/// floor to the unit, enforce the minimum stake on active positions, rescale on
/// overshoot, trim the weakest positions while the minimum-stake floor keeps the
/// total above budget, and hand surplus whole units round-robin to the strongest
/// active positions.
fn quantise(
    weights: &[f64],
    proposals: &[BetProposal],
    budget: u64,
    config: &StakingConfig,
) -> Vec<u64> {
    let unit = config.unit;
    let floor_to_unit = |amount: f64| (amount / unit as f64).floor() as u64 * unit;
    let mut stakes: Vec<u64> = weights
        .iter()
        .map(|&weight| {
            if weight > 0.0 {
                u64::max(config.min_stake, floor_to_unit(budget as f64 * weight))
            } else {
                0
            }
        })
        .collect();

    let mut total: u64 = stakes.iter().sum();
    if total > budget {
        let scale = budget as f64 / total as f64;
        for stake in stakes.iter_mut().filter(|stake| **stake > 0) {
            *stake = u64::max(config.min_stake, floor_to_unit(*stake as f64 * scale));
        }
        total = stakes.iter().sum();
    }
    // re-enforcing the minimum stake can push the total back over budget
    let ranked = ranked_by_ev(proposals);
    while total > budget {
        let weakest = ranked
            .iter()
            .rev()
            .find(|&&index| stakes[index] > 0)
            .copied();
        let Some(weakest) = weakest else { break };
        let reduced = stakes[weakest] - unit;
        stakes[weakest] = if reduced < config.min_stake { 0 } else { reduced };
        total = stakes.iter().sum();
    }

    let mut spare_units = (budget - total) / unit;
    if spare_units > 0 && stakes.iter().all(|&stake| stake == 0) {
        // degenerate weight vector: open the strongest position at the minimum
        if budget >= config.min_stake {
            stakes[ranked[0]] = config.min_stake;
            total = config.min_stake;
            spare_units = (budget - total) / unit;
        }
    }
    while spare_units > 0 {
        let mut distributed = false;
        for &strong in &ranked {
            if spare_units == 0 {
                break;
            }
            if stakes[strong] > 0 {
                stakes[strong] += unit;
                spare_units -= 1;
                distributed = true;
            }
        }
        if !distributed {
            break;
        }
    }
    stakes
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(1)
}
