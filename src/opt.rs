//! Simulated annealing over portfolio weight vectors.

use anyhow::bail;
use tinyrand::Rand;

#[derive(Clone, Debug)]
pub struct AnnealingConfig {
    /// Starting temperature.
    pub init_temp: f64,
    /// Geometric decay applied to the temperature each step, in (0, 1).
    pub cooling: f64,
    /// Temperature floor; reaching it ends the run.
    pub min_temp: f64,
    /// Safety bound on steps, in case the floor is slow to arrive.
    pub max_steps: u64,
    /// Probability of a structural shake replacing the local move on any step.
    pub shake_prob: f64,
}
impl AnnealingConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.init_temp <= 0.0 {
            bail!("initial temperature must be positive");
        }
        if !(0.0..1.0).contains(&self.cooling) || self.cooling == 0.0 {
            bail!("cooling rate must lie in (0, 1)");
        }
        if self.min_temp <= 0.0 {
            bail!("minimum temperature must be positive");
        }
        if !(0.0..=1.0).contains(&self.shake_prob) {
            bail!("shake probability must lie in [0, 1]");
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct AnnealingOutcome {
    pub steps: u64,
    pub optimal_weights: Vec<f64>,
    pub optimal_objective: f64,
}

/// Derivative-free maximisation of `objective_f` over a weight vector, starting
/// from `init`. The local move transfers a temperature-scaled random amount
/// between two distinct weights, preserving the sum; downhill moves are accepted
/// with Metropolis probability `exp(Δ/T)`. With probability `shake_prob` a step
/// instead applies the caller's `shake_f` to escape a local optimum. The
/// best-ever vector is tracked and returned.
pub fn anneal<R: Rand>(
    config: &AnnealingConfig,
    init: &[f64],
    mut objective_f: impl FnMut(&[f64]) -> f64,
    mut shake_f: impl FnMut(&mut [f64], &mut R),
    rand: &mut R,
) -> AnnealingOutcome {
    config.validate().unwrap();

    let mut weights = init.to_vec();
    let mut objective = objective_f(&weights);
    let mut optimal_weights = weights.clone();
    let mut optimal_objective = objective;
    let mut steps = 0;
    let mut temp = config.init_temp;
    let population = weights.len();

    while population >= 2 && temp > config.min_temp && steps < config.max_steps {
        steps += 1;
        let mut candidate = weights.clone();
        if random_f64(rand) < config.shake_prob {
            shake_f(&mut candidate, rand);
        } else {
            let from = rand.next_u64() as usize % population;
            let mut to = rand.next_u64() as usize % (population - 1);
            if to >= from {
                to += 1;
            }
            let amount = candidate[from] * random_f64(rand) * f64::min(1.0, temp);
            candidate[from] -= amount;
            candidate[to] += amount;
        }
        let candidate_objective = objective_f(&candidate);
        let accept = candidate_objective > objective
            || random_f64(rand) < f64::exp((candidate_objective - objective) / temp);
        if accept {
            weights = candidate;
            objective = candidate_objective;
            if objective > optimal_objective {
                optimal_objective = objective;
                optimal_weights = weights.clone();
            }
        }
        temp *= config.cooling;
    }

    AnnealingOutcome {
        steps,
        optimal_weights,
        optimal_objective,
    }
}

#[inline]
pub fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyrand::{Seeded, StdRand};

    fn config() -> AnnealingConfig {
        AnnealingConfig {
            init_temp: 1.0,
            cooling: 0.999,
            min_temp: 1e-4,
            max_steps: 20_000,
            shake_prob: 0.0,
        }
    }

    #[test]
    fn converges_towards_peak() {
        let mut rand = StdRand::seed(42);
        let outcome = anneal(
            &config(),
            &[0.5, 0.5],
            |weights| -(weights[0] - 0.75).powi(2),
            |_, _| {},
            &mut rand,
        );
        assert!(outcome.steps > 0);
        assert!(
            outcome.optimal_objective > -(0.1f64).powi(2),
            "objective {} too far from peak",
            outcome.optimal_objective
        );
        assert!((outcome.optimal_weights[0] - 0.75).abs() < 0.1);
    }

    #[test]
    fn never_regresses_below_start() {
        let mut rand = StdRand::seed(7);
        let init = [0.25, 0.25, 0.5];
        let initial_objective = -(0.25f64 - 0.4).powi(2);
        let outcome = anneal(
            &config(),
            &init,
            |weights| -(weights[0] - 0.4).powi(2),
            |_, _| {},
            &mut rand,
        );
        assert!(outcome.optimal_objective >= initial_objective);
    }

    #[test]
    fn preserves_weight_sum() {
        let mut rand = StdRand::seed(11);
        let outcome = anneal(&config(), &[0.7, 0.2, 0.1], |_| 0.0, |_, _| {}, &mut rand);
        let sum: f64 = outcome.optimal_weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_weight_returns_immediately() {
        let mut rand = StdRand::seed(3);
        let outcome = anneal(&config(), &[1.0], |weights| weights[0], |_, _| {}, &mut rand);
        assert_eq!(0, outcome.steps);
        assert_eq!(vec![1.0], outcome.optimal_weights);
    }

    #[test]
    fn shake_is_invoked() {
        let mut rand = StdRand::seed(5);
        let shaken = std::cell::Cell::new(false);
        let config = AnnealingConfig {
            shake_prob: 1.0,
            ..config()
        };
        anneal(
            &config,
            &[0.5, 0.5],
            |_| 0.0,
            |_, _| shaken.set(true),
            &mut rand,
        );
        assert!(shaken.get());
    }

    #[test]
    #[should_panic = "cooling rate must lie in (0, 1)"]
    fn invalid_cooling_rate() {
        let mut rand = StdRand::seed(1);
        let config = AnnealingConfig {
            cooling: 1.5,
            ..config()
        };
        anneal(&config, &[0.5, 0.5], |_| 0.0, |_, _| {}, &mut rand);
    }
}
