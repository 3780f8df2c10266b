//! Union probability over a set of wagers and exhaustive best-combination search.
//!
//! Joint probabilities of three or more wagers are approximated by pivoting on one
//! member and assuming the remaining members independent given the pivot; true
//! N-way correlation is not recoverable from pairwise estimates alone. Both entry
//! points are exponential in proposal count and bounded by [MAX_PROPOSALS].

use thiserror::Error;
use tracing::debug;

use crate::comb::{count_subsets, KSubsets};
use crate::domain::{BetProposal, Horse};
use crate::joint::joint_probability;

/// Ceiling on proposal count for the inclusion-exclusion and subset searches;
/// 2^20 - 1 union terms is the most the engine will evaluate in one call.
pub const MAX_PROPOSALS: usize = 20;

#[derive(Debug, Error, PartialEq)]
pub enum CoverageError {
    #[error("{count} proposals exceed the limit of {MAX_PROPOSALS}")]
    TooManyProposals { count: usize },
}

/// Probability that at least one proposal hits, by inclusion-exclusion over all
/// nonempty subsets, clipped to `[0, 1]`. Empty input yields zero.
pub fn total_hit_probability(
    proposals: &[BetProposal],
    horses: &[Horse],
) -> Result<f64, CoverageError> {
    if proposals.is_empty() {
        return Ok(0.0);
    }
    check_ceiling(proposals.len())?;
    let joints = joint_matrix(proposals, horses);
    let members: Vec<usize> = (0..proposals.len()).collect();
    Ok(union_probability(&members, proposals, &joints))
}

/// The highest-union-probability subset of at most `max_selections` proposals.
/// When the list already fits, it is returned whole; otherwise every C(n, k)
/// subset is evaluated and the first-found maximum wins. `max_selections` is
/// capped at the proposal count.
pub fn best_combination(
    proposals: &[BetProposal],
    horses: &[Horse],
    max_selections: usize,
) -> Result<Combination, CoverageError> {
    check_ceiling(proposals.len())?;
    let joints = joint_matrix(proposals, horses);
    let max_selections = usize::min(max_selections, proposals.len());
    if proposals.len() <= max_selections {
        let members: Vec<usize> = (0..proposals.len()).collect();
        return Ok(Combination {
            probability: union_probability(&members, proposals, &joints),
            selected: proposals.to_vec(),
        });
    }

    let mut best_members: Vec<usize> = vec![];
    let mut best_probability = f64::MIN;
    for members in KSubsets::new(proposals.len(), max_selections) {
        let probability = union_probability(&members, proposals, &joints);
        if probability > best_probability {
            best_probability = probability;
            best_members = members;
        }
    }
    debug!(
        "best combination {best_members:?} at {best_probability:.6} from {} subsets",
        count_subsets(proposals.len(), max_selections)
    );
    Ok(Combination {
        selected: best_members
            .iter()
            .map(|&member| proposals[member].clone())
            .collect(),
        probability: best_probability,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub selected: Vec<BetProposal>,
    pub probability: f64,
}

fn check_ceiling(count: usize) -> Result<(), CoverageError> {
    if count > MAX_PROPOSALS {
        return Err(CoverageError::TooManyProposals { count });
    }
    Ok(())
}

fn joint_matrix(proposals: &[BetProposal], horses: &[Horse]) -> Vec<Vec<f64>> {
    let mut joints = vec![vec![0.0; proposals.len()]; proposals.len()];
    for first in 0..proposals.len() {
        for second in first + 1..proposals.len() {
            let joint = joint_probability(&proposals[first], &proposals[second], horses);
            joints[first][second] = joint;
            joints[second][first] = joint;
        }
    }
    joints
}

/// Inclusion-exclusion over the given members: odd-sized subsets add their joint
/// probability, even-sized subsets subtract it.
fn union_probability(members: &[usize], proposals: &[BetProposal], joints: &[Vec<f64>]) -> f64 {
    let mut union = 0.0;
    for mask in 1u32..1 << members.len() {
        let subset: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|(position, _)| mask & (1 << *position) != 0)
            .map(|(_, &member)| member)
            .collect();
        let sign = if mask.count_ones() % 2 == 1 { 1.0 } else { -1.0 };
        union += sign * joint_of_set(&subset, proposals, joints);
    }
    union.clamp(0.0, 1.0)
}

/// Joint probability that every member of the set hits. Singletons and pairs are
/// exact under the pairwise model; larger sets pivot on the first member and
/// multiply the pairwise conditionals of the rest, gated on the rest themselves
/// having nonzero joint probability.
fn joint_of_set(members: &[usize], proposals: &[BetProposal], joints: &[Vec<f64>]) -> f64 {
    match members {
        [] => 0.0,
        [only] => proposals[*only].probability,
        [first, second] => joints[*first][*second],
        [pivot, rest @ ..] => {
            let rest_joint = joint_of_set(rest, proposals, joints);
            if rest_joint == 0.0 {
                return 0.0;
            }
            let pivot_prob = proposals[*pivot].probability;
            if pivot_prob <= 0.0 {
                return 0.0;
            }
            let mut conditionals = 1.0;
            for &other in rest {
                conditionals *= joints[*pivot][other] / pivot_prob;
            }
            pivot_prob * conditionals
        }
    }
}
