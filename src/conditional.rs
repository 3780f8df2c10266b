//! Derivation of directed conditional hit-probabilities between wager proposals.

use crate::domain::{BetProposal, ConditionalEntry, Horse};
use crate::joint::joint_probability;

/// For every unordered pair of proposals, derives both directed conditionals
/// P(target | condition) = joint / P(condition). Entries are emitted only when the
/// condition probability and the resulting conditional are both positive, and are
/// returned sorted by descending conditional probability. O(n²) in proposal count.
pub fn derive_conditionals(proposals: &[BetProposal], horses: &[Horse]) -> Vec<ConditionalEntry> {
    let mut entries = vec![];
    for first in 0..proposals.len() {
        for second in first + 1..proposals.len() {
            let joint = joint_probability(&proposals[first], &proposals[second], horses);
            if joint <= 0.0 {
                continue;
            }
            push_directed(&mut entries, &proposals[first], &proposals[second], joint);
            push_directed(&mut entries, &proposals[second], &proposals[first], joint);
        }
    }
    entries.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    entries
}

fn push_directed(
    entries: &mut Vec<ConditionalEntry>,
    condition: &BetProposal,
    target: &BetProposal,
    joint: f64,
) {
    if condition.probability <= 0.0 {
        return;
    }
    let probability = joint / condition.probability;
    if probability > 0.0 {
        entries.push(ConditionalEntry {
            condition: condition.clone(),
            target: target.clone(),
            probability,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WagerClass;
    use assert_float_eq::*;

    fn roster() -> Vec<Horse> {
        vec![
            Horse {
                number: 1,
                frame: 1,
                win_prob: 0.4,
                place_prob: 0.6,
            },
            Horse {
                number: 2,
                frame: 1,
                win_prob: 0.3,
                place_prob: 0.5,
            },
        ]
    }

    #[test]
    fn derives_both_directions_sorted() {
        let horses = roster();
        let proposals = vec![
            BetProposal::new(WagerClass::Win, vec![1], 2.5, 0.4),
            BetProposal::new(WagerClass::Place, vec![2], 1.4, 0.5),
        ];
        let entries = derive_conditionals(&proposals, &horses);
        assert_eq!(2, entries.len());

        // joint = 0.4 * (0.5 - 0.3) / 2 = 0.04
        assert_eq!(proposals[0], entries[0].condition);
        assert_eq!(proposals[1], entries[0].target);
        assert_float_absolute_eq!(0.04 / 0.4, entries[0].probability, 1e-12);

        assert_eq!(proposals[1], entries[1].condition);
        assert_eq!(proposals[0], entries[1].target);
        assert_float_absolute_eq!(0.04 / 0.5, entries[1].probability, 1e-12);
    }

    #[test]
    fn disjoint_pairs_yield_no_entries() {
        let horses = roster();
        let proposals = vec![
            BetProposal::new(WagerClass::Win, vec![1], 2.5, 0.4),
            BetProposal::new(WagerClass::Win, vec![2], 3.5, 0.3),
        ];
        assert!(derive_conditionals(&proposals, &horses).is_empty());
    }

    #[test]
    fn zero_probability_condition_is_skipped() {
        let horses = roster();
        let proposals = vec![
            BetProposal::new(WagerClass::Win, vec![1], 2.5, 0.0),
            BetProposal::new(WagerClass::Place, vec![1], 1.4, 0.6),
        ];
        // the win-conditioned direction survives only where the condition
        // probability is positive; joint is capped at zero by the win proposal
        assert!(derive_conditionals(&proposals, &horses).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_table() {
        assert!(derive_conditionals(&[], &roster()).is_empty());
    }
}
