//! A wager-portfolio probability and allocation engine for parimutuel racing.
//! Estimates joint and conditional hit-probabilities across heterogeneous wager
//! classes, computes the coverage of a wager set via inclusion-exclusion, and
//! spreads a fixed budget over the strongest combination by simulated annealing.

pub mod comb;
pub mod conditional;
pub mod coverage;
pub mod domain;
pub mod file;
pub mod joint;
pub mod opt;
pub mod print;
pub mod probs;
pub mod stake;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
