//! Pairwise joint hit-probability resolution across the eight wager classes.
//!
//! The single governing approximation: a horse's chance of finishing in exactly one
//! of the minor podium slots (2nd or 3rd) is taken as `(place_prob - win_prob) / 2`,
//! splitting the podium-but-not-first mass evenly between the two slots. Horses not
//! constrained by either wager are assumed independent. No exact order-statistics
//! model is attempted.
//!
//! Every `(WagerClass, WagerClass)` cell routes through [resolver], which applies
//! the rules in priority order: disjoint exclusive outcomes, implication on exactly
//! coinciding selections, identical wagers, then finishing-role overlap enumeration.

use crate::domain::{horse, BetProposal, Horse, WagerClass};

/// At most one horse can finish 1st and two can occupy the minor podium slots.
const MAX_FIRSTS: usize = 1;
const MAX_MINORS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Role {
    First,
    Minor,
}

/// A finishing-role assignment over the horses a wager constrains, sorted by horse
/// number. One pattern stands for one way the wager can hit.
type Pattern = Vec<(usize, Role)>;

/// Probability that both wagers hit, in `[0, min(a.probability, b.probability)]`.
/// Pure and total: unknown horses, empty frames and malformed arities all resolve
/// to zero rather than an error, so one bad proposal cannot poison a batch.
pub fn joint_probability(a: &BetProposal, b: &BetProposal, horses: &[Horse]) -> f64 {
    let raw = resolver(a.wager_class, b.wager_class)(a, b, horses);
    let cap = f64::min(a.probability, b.probability).max(0.0);
    raw.max(0.0).min(cap)
}

type Resolver = fn(&BetProposal, &BetProposal, &[Horse]) -> f64;

/// The 8x8 class-pair dispatch table.
fn resolver(a: WagerClass, b: WagerClass) -> Resolver {
    use WagerClass::*;
    match (a, b) {
        // one unique outcome per race: distinct selections cannot both hit
        (Win, Win)
        | (BracketQuinella, BracketQuinella)
        | (Quinella, Quinella)
        | (Exacta, Exacta)
        | (Trio, Trio)
        | (Trifecta, Trifecta) => resolve_exclusive,
        // many places and wides can pay at once
        (Place, Place) | (Wide, Wide) => resolve_permissive,
        (Win, Place)
        | (Place, Win)
        | (Exacta, Quinella)
        | (Quinella, Exacta)
        | (Exacta, Wide)
        | (Wide, Exacta)
        | (Quinella, Wide)
        | (Wide, Quinella)
        | (Trifecta, Trio)
        | (Trio, Trifecta) => resolve_implication,
        _ => resolve_overlap,
    }
}

fn resolve_exclusive(a: &BetProposal, b: &BetProposal, _horses: &[Horse]) -> f64 {
    if a.key() == b.key() {
        a.probability
    } else {
        0.0
    }
}

fn resolve_permissive(a: &BetProposal, b: &BetProposal, horses: &[Horse]) -> f64 {
    if a.key() == b.key() {
        a.probability
    } else {
        resolve_overlap(a, b, horses)
    }
}

/// Hitting the more specific wager implies hitting the less specific one whenever
/// their horse sets coincide exactly; the joint then collapses to the probability
/// of the implying wager. Anything else falls back to overlap enumeration.
fn resolve_implication(a: &BetProposal, b: &BetProposal, horses: &[Horse]) -> f64 {
    let (specific, general) = if implies(a.wager_class, b.wager_class) {
        (a, b)
    } else {
        (b, a)
    };
    if specific.horse_set() == general.horse_set() {
        specific.probability
    } else {
        resolve_overlap(a, b, horses)
    }
}

fn implies(specific: WagerClass, general: WagerClass) -> bool {
    use WagerClass::*;
    matches!(
        (specific, general),
        (Win, Place) | (Exacta, Quinella) | (Exacta, Wide) | (Quinella, Wide) | (Trifecta, Trio)
    )
}

/// Enumerates the role assignments under which both wagers hit, deduplicates the
/// merged assignments (two pattern pairs describing the same outcome region count
/// once) and sums their probability mass. Summation runs in sorted pattern order
/// so that the result is bit-identical regardless of argument order.
fn resolve_overlap(a: &BetProposal, b: &BetProposal, horses: &[Horse]) -> f64 {
    let (Some(patterns_a), Some(patterns_b)) = (patterns(a, horses), patterns(b, horses)) else {
        return 0.0;
    };
    let mut merged_patterns: Vec<Pattern> = vec![];
    for pattern_a in &patterns_a {
        for pattern_b in &patterns_b {
            if let Some(merged) = merge(pattern_a, pattern_b) {
                merged_patterns.push(merged);
            }
        }
    }
    merged_patterns.sort_unstable();
    merged_patterns.dedup();
    merged_patterns
        .iter()
        .map(|merged| pattern_prob(merged, horses))
        .sum()
}

/// The role assignments under which a single wager hits. `None` signals a failed
/// lookup or malformed selection, which the caller maps to probability zero.
fn patterns(proposal: &BetProposal, horses: &[Horse]) -> Option<Vec<Pattern>> {
    use Role::*;
    if proposal.wager_class == WagerClass::BracketQuinella {
        if proposal.frames.len() != 2 {
            return None;
        }
        let (first_frame, second_frame) = (proposal.frames[0], proposal.frames[1]);
        let in_frame = |frame: usize| -> Vec<usize> {
            horses
                .iter()
                .filter(|horse| horse.frame == frame)
                .map(|horse| horse.number)
                .collect()
        };
        let mut assignments = vec![];
        for &leader in &in_frame(first_frame) {
            for &minor in &in_frame(second_frame) {
                if leader == minor {
                    continue;
                }
                assignments.push(pattern(&[(leader, First), (minor, Minor)]));
                // distinct frames need both orientations; a same-frame pair
                // already visits the reverse ordered pair
                if first_frame != second_frame {
                    assignments.push(pattern(&[(minor, First), (leader, Minor)]));
                }
            }
        }
        return Some(assignments);
    }

    if proposal.horses.len() != proposal.wager_class.arity() {
        return None;
    }
    for (index, number) in proposal.horses.iter().enumerate() {
        horse(horses, *number)?;
        if proposal.horses[index + 1..].contains(number) {
            return None;
        }
    }
    let picks = &proposal.horses;
    let assignments = match proposal.wager_class {
        WagerClass::Win => vec![pattern(&[(picks[0], First)])],
        WagerClass::Place => vec![
            pattern(&[(picks[0], First)]),
            pattern(&[(picks[0], Minor)]),
        ],
        WagerClass::Wide => vec![
            pattern(&[(picks[0], First), (picks[1], Minor)]),
            pattern(&[(picks[1], First), (picks[0], Minor)]),
            pattern(&[(picks[0], Minor), (picks[1], Minor)]),
        ],
        WagerClass::Quinella => vec![
            pattern(&[(picks[0], First), (picks[1], Minor)]),
            pattern(&[(picks[1], First), (picks[0], Minor)]),
        ],
        WagerClass::Exacta => vec![pattern(&[(picks[0], First), (picks[1], Minor)])],
        WagerClass::Trio => vec![
            pattern(&[(picks[0], First), (picks[1], Minor), (picks[2], Minor)]),
            pattern(&[(picks[1], First), (picks[0], Minor), (picks[2], Minor)]),
            pattern(&[(picks[2], First), (picks[0], Minor), (picks[1], Minor)]),
        ],
        WagerClass::Trifecta => vec![pattern(&[
            (picks[0], First),
            (picks[1], Minor),
            (picks[2], Minor),
        ])],
        WagerClass::BracketQuinella => unreachable!(),
    };
    Some(assignments)
}

fn pattern(entries: &[(usize, Role)]) -> Pattern {
    let mut pattern = entries.to_vec();
    pattern.sort_unstable_by_key(|&(number, _)| number);
    pattern
}

/// Merges two role assignments; `None` when a horse would need two different roles
/// or the merged assignment exceeds the podium capacity.
fn merge(a: &Pattern, b: &Pattern) -> Option<Pattern> {
    let mut merged = a.clone();
    for &(number, role) in b {
        if let Some(&(_, existing)) = merged.iter().find(|(existing, _)| *existing == number) {
            if existing != role {
                return None;
            }
        } else {
            merged.push((number, role));
        }
    }
    merged.sort_unstable_by_key(|&(number, _)| number);
    let firsts = merged.iter().filter(|(_, role)| *role == Role::First).count();
    let minors = merged.len() - firsts;
    if firsts > MAX_FIRSTS || minors > MAX_MINORS {
        return None;
    }
    Some(merged)
}

fn pattern_prob(pattern: &Pattern, horses: &[Horse]) -> f64 {
    let mut prob = 1.0;
    for &(number, role) in pattern {
        let Some(horse) = horse(horses, number) else {
            return 0.0;
        };
        prob *= role_prob(horse, role);
    }
    prob
}

fn role_prob(horse: &Horse, role: Role) -> f64 {
    match role {
        Role::First => horse.win_prob,
        Role::Minor => f64::max(0.0, (horse.place_prob - horse.win_prob) / 2.0),
    }
}
