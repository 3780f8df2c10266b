//! The wagering data model: horses, wager classes and bet proposals, plus the
//! boundary normalisation applied to externally sourced probability estimates.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::{EnumCount, EnumIter};
use thiserror::Error;

/// A runner in the race, keyed by saddlecloth number and carrying the caller's
/// win and place (top-3) probability estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horse {
    pub number: usize,
    pub frame: usize,
    pub win_prob: f64,
    pub place_prob: f64,
}
impl Horse {
    pub fn validate(&self) -> Result<(), InvalidHorse> {
        if !(0.0..=1.0).contains(&self.win_prob) || !(0.0..=1.0).contains(&self.place_prob) {
            return Err(InvalidHorse::ProbabilityOutOfRange {
                number: self.number,
            });
        }
        if self.place_prob < self.win_prob {
            return Err(InvalidHorse::PlaceBelowWin {
                number: self.number,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidHorse {
    #[error("probabilities for horse {number} must lie in [0, 1]")]
    ProbabilityOutOfRange { number: usize },

    #[error("place probability for horse {number} must not be below its win probability")]
    PlaceBelowWin { number: usize },
}

/// Locates a horse by number. `None` for an unknown number; callers in the
/// probability engine translate that into a zero probability rather than an error.
pub fn horse(horses: &[Horse], number: usize) -> Option<&Horse> {
    horses.iter().find(|horse| horse.number == number)
}

/// The closed set of supported wager classes. Declaration order doubles as the
/// canonical sort order for presenting an allocation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumCount,
    EnumIter,
    strum_macros::Display,
    Serialize,
    Deserialize,
)]
pub enum WagerClass {
    Win,
    Place,
    BracketQuinella,
    Wide,
    Quinella,
    Exacta,
    Trio,
    Trifecta,
}
impl WagerClass {
    /// Number of horses (or frames, for the bracket quinella) named by the wager.
    pub fn arity(&self) -> usize {
        match self {
            WagerClass::Win | WagerClass::Place => 1,
            WagerClass::BracketQuinella
            | WagerClass::Wide
            | WagerClass::Quinella
            | WagerClass::Exacta => 2,
            WagerClass::Trio | WagerClass::Trifecta => 3,
        }
    }

    /// Whether the finishing order of the named horses matters.
    pub fn ordered(&self) -> bool {
        matches!(self, WagerClass::Exacta | WagerClass::Trifecta)
    }
}

/// A candidate wager. `probability` must be a pre-normalised fraction in `[0, 1]`;
/// advisory inputs carrying percentage strings go through [normalise_probability]
/// before a proposal is constructed. `frames` is populated for bracket quinellas
/// only; all other classes name individual horses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetProposal {
    pub wager_class: WagerClass,
    #[serde(default)]
    pub horses: Vec<usize>,
    #[serde(default)]
    pub frames: Vec<usize>,
    #[serde(default)]
    pub stake: u64,
    pub odds: f64,
    pub probability: f64,
    #[serde(default)]
    pub expected_return: f64,
}
impl BetProposal {
    pub fn new(
        wager_class: WagerClass,
        horses: Vec<usize>,
        odds: f64,
        probability: f64,
    ) -> BetProposal {
        BetProposal {
            wager_class,
            horses,
            frames: vec![],
            stake: 0,
            odds,
            probability,
            expected_return: 0.0,
        }
    }

    pub fn bracket(frames: Vec<usize>, odds: f64, probability: f64) -> BetProposal {
        BetProposal {
            wager_class: WagerClass::BracketQuinella,
            horses: vec![],
            frames,
            stake: 0,
            odds,
            probability,
            expected_return: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidProposal> {
        let arity = self.wager_class.arity();
        if self.wager_class == WagerClass::BracketQuinella {
            if self.frames.len() != arity || !self.horses.is_empty() {
                return Err(InvalidProposal::WrongArity {
                    wager_class: self.wager_class,
                    expected: arity,
                });
            }
        } else {
            if self.horses.len() != arity || !self.frames.is_empty() {
                return Err(InvalidProposal::WrongArity {
                    wager_class: self.wager_class,
                    expected: arity,
                });
            }
            for (index, horse) in self.horses.iter().enumerate() {
                if self.horses[index + 1..].contains(horse) {
                    return Err(InvalidProposal::DuplicateHorse { number: *horse });
                }
            }
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(InvalidProposal::ProbabilityOutOfRange {
                probability: self.probability,
            });
        }
        if !(self.odds > 0.0) {
            return Err(InvalidProposal::NonPositiveOdds { odds: self.odds });
        }
        Ok(())
    }

    /// Identity of the selection, insensitive to horse order for unordered classes.
    pub fn key(&self) -> SelectionKey {
        let mut picks = if self.wager_class == WagerClass::BracketQuinella {
            self.frames.clone()
        } else {
            self.horses.clone()
        };
        if !self.wager_class.ordered() {
            picks.sort_unstable();
        }
        SelectionKey {
            wager_class: self.wager_class,
            picks,
        }
    }

    /// The set of horses named by the wager, sorted. Used for implication checks.
    pub fn horse_set(&self) -> Vec<usize> {
        let mut set = self.horses.clone();
        set.sort_unstable();
        set
    }
}

impl Display for BetProposal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ", self.wager_class)?;
        match self.wager_class {
            WagerClass::BracketQuinella => {
                let frames: Vec<_> = self.frames.iter().map(|frame| format!("[{frame}]")).collect();
                write!(f, "{}", frames.join("-"))
            }
            _ => {
                let horses: Vec<_> = self.horses.iter().map(|horse| horse.to_string()).collect();
                let joiner = if self.wager_class.ordered() { ">" } else { "-" };
                write!(f, "{}", horses.join(joiner))
            }
        }
    }
}

/// Hashable identity of a wager selection, used to match conditional-table entries
/// back to proposals inside the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub wager_class: WagerClass,
    pub picks: Vec<usize>,
}

/// A directed conditional probability: P(target hits | condition hit).
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalEntry {
    pub condition: BetProposal,
    pub target: BetProposal,
    pub probability: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidProposal {
    #[error("{wager_class} wager must name exactly {expected} selections")]
    WrongArity {
        wager_class: WagerClass,
        expected: usize,
    },

    #[error("horse {number} named more than once")]
    DuplicateHorse { number: usize },

    #[error("probability {probability} must lie in [0, 1]")]
    ProbabilityOutOfRange { probability: f64 },

    #[error("odds {odds} must be positive")]
    NonPositiveOdds { odds: f64 },
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid probability format: {input}")]
pub struct InvalidProbabilityFormat {
    pub input: String,
}

/// Boundary normalisation of an externally supplied probability, which may arrive
/// either as a fraction (`"0.125"`) or as a percentage string (`"12.5%"`). Malformed
/// or out-of-range inputs are rejected here so that `NaN` never reaches the engine.
pub fn normalise_probability(input: &str) -> Result<f64, InvalidProbabilityFormat> {
    let trimmed = input.trim();
    let err = || InvalidProbabilityFormat {
        input: input.to_string(),
    };
    let fraction = match trimmed.strip_suffix('%') {
        Some(percentage) => percentage.trim().parse::<f64>().map_err(|_| err())? / 100.0,
        None => trimmed.parse::<f64>().map_err(|_| err())?,
    };
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(err());
    }
    Ok(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn horse_lookup() {
        let horses = vec![
            Horse {
                number: 1,
                frame: 1,
                win_prob: 0.5,
                place_prob: 0.8,
            },
            Horse {
                number: 4,
                frame: 2,
                win_prob: 0.1,
                place_prob: 0.3,
            },
        ];
        assert_eq!(Some(&horses[1]), horse(&horses, 4));
        assert_eq!(None, horse(&horses, 2));
    }

    #[test]
    fn horse_validation() {
        let valid = Horse {
            number: 1,
            frame: 1,
            win_prob: 0.2,
            place_prob: 0.5,
        };
        assert_eq!(Ok(()), valid.validate());

        let inverted = Horse {
            place_prob: 0.1,
            ..valid.clone()
        };
        assert_eq!(
            Err(InvalidHorse::PlaceBelowWin { number: 1 }),
            inverted.validate()
        );

        let out_of_range = Horse {
            win_prob: 1.2,
            ..valid
        };
        assert_eq!(
            Err(InvalidHorse::ProbabilityOutOfRange { number: 1 }),
            out_of_range.validate()
        );
    }

    #[test]
    fn arity_and_order() {
        assert_eq!(1, WagerClass::Win.arity());
        assert_eq!(2, WagerClass::Wide.arity());
        assert_eq!(3, WagerClass::Trifecta.arity());
        assert!(WagerClass::Exacta.ordered());
        assert!(WagerClass::Trifecta.ordered());
        assert!(!WagerClass::Quinella.ordered());
        assert!(!WagerClass::Trio.ordered());
    }

    #[test]
    fn proposal_validation() {
        assert_eq!(
            Ok(()),
            BetProposal::new(WagerClass::Quinella, vec![1, 2], 5.0, 0.2).validate()
        );
        assert_eq!(
            Err(InvalidProposal::WrongArity {
                wager_class: WagerClass::Quinella,
                expected: 2
            }),
            BetProposal::new(WagerClass::Quinella, vec![1], 5.0, 0.2).validate()
        );
        assert_eq!(
            Err(InvalidProposal::DuplicateHorse { number: 3 }),
            BetProposal::new(WagerClass::Wide, vec![3, 3], 5.0, 0.2).validate()
        );
        assert_eq!(
            Err(InvalidProposal::ProbabilityOutOfRange { probability: 1.5 }),
            BetProposal::new(WagerClass::Win, vec![1], 5.0, 1.5).validate()
        );
        assert_eq!(
            Err(InvalidProposal::NonPositiveOdds { odds: 0.0 }),
            BetProposal::new(WagerClass::Win, vec![1], 0.0, 0.5).validate()
        );
        assert_eq!(Ok(()), BetProposal::bracket(vec![2, 2], 8.0, 0.1).validate());
    }

    #[test]
    fn selection_keys() {
        let quinella_ab = BetProposal::new(WagerClass::Quinella, vec![2, 1], 5.0, 0.2);
        let quinella_ba = BetProposal::new(WagerClass::Quinella, vec![1, 2], 5.0, 0.2);
        assert_eq!(quinella_ab.key(), quinella_ba.key());

        let exacta_ab = BetProposal::new(WagerClass::Exacta, vec![1, 2], 9.0, 0.1);
        let exacta_ba = BetProposal::new(WagerClass::Exacta, vec![2, 1], 9.0, 0.1);
        assert_ne!(exacta_ab.key(), exacta_ba.key());

        let bracket = BetProposal::bracket(vec![4, 2], 8.0, 0.1);
        assert_eq!(vec![2, 4], bracket.key().picks);
    }

    #[test]
    fn proposal_display() {
        assert_eq!(
            "Exacta 3>5",
            BetProposal::new(WagerClass::Exacta, vec![3, 5], 9.0, 0.1).to_string()
        );
        assert_eq!(
            "Wide 3-5",
            BetProposal::new(WagerClass::Wide, vec![3, 5], 2.0, 0.4).to_string()
        );
        assert_eq!(
            "BracketQuinella [2]-[4]",
            BetProposal::bracket(vec![2, 4], 8.0, 0.1).to_string()
        );
    }

    #[test]
    fn normalise_percentage_string() {
        assert_float_absolute_eq!(0.125, normalise_probability("12.5%").unwrap(), 1e-12);
        assert_float_absolute_eq!(0.125, normalise_probability(" 12.5 % ").unwrap(), 1e-12);
        assert_float_absolute_eq!(1.0, normalise_probability("100%").unwrap(), 1e-12);
    }

    #[test]
    fn normalise_fraction_string() {
        assert_float_absolute_eq!(0.125, normalise_probability("0.125").unwrap(), 1e-12);
        assert_float_absolute_eq!(0.0, normalise_probability("0").unwrap(), 1e-12);
    }

    #[test]
    fn normalise_rejects_malformed() {
        for input in ["", "garbage", "12.5%%", "-0.1", "1.01", "101%", "NaN", "inf"] {
            assert!(
                normalise_probability(input).is_err(),
                "expected rejection of {input:?}"
            );
        }
    }
}
