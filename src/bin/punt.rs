use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use serde::Deserialize;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use furlong::conditional::derive_conditionals;
use furlong::coverage::best_combination;
use furlong::domain::{normalise_probability, BetProposal, Horse, WagerClass};
use furlong::file::FromJsonFile;
use furlong::print::{tabulate_allocation, tabulate_conditionals};
use furlong::stake::{allocate, AllocationProgress, StakingConfig};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the race card from
    #[clap(short = 'f', long)]
    file: PathBuf,

    /// total budget to spread across the wagers, in currency units
    #[clap(short = 'b', long, default_value = "10000")]
    budget: u64,

    /// most wagers to carry into the allocation
    #[clap(short = 's', long, default_value = "5")]
    max_selections: usize,

    /// PRNG seed for a reproducible allocation
    #[clap(long)]
    seed: Option<u64>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.budget == 0 {
            bail!("the budget must be positive");
        }
        if self.max_selections == 0 {
            bail!("at least one selection must be allowed");
        }
        Ok(())
    }
}

/// A race card as sourced from the advisory collaborator: the horse roster plus
/// candidate wagers whose probabilities may arrive as percentage strings.
#[derive(Debug, Deserialize)]
struct RaceCard {
    horses: Vec<Horse>,
    proposals: Vec<ProposalAdvice>,
}

#[derive(Debug, Deserialize)]
struct ProposalAdvice {
    wager_class: WagerClass,
    #[serde(default)]
    horses: Vec<usize>,
    #[serde(default)]
    frames: Vec<usize>,
    odds: f64,
    probability: String,
    /// free-text reasoning from the advisor; carried as opaque data
    #[serde(default)]
    #[allow(dead_code)]
    rationale: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let card = RaceCard::from_json_file(&args.file)?;
    for horse in &card.horses {
        horse.validate()?;
    }
    let proposals = normalise_advice(&card.proposals)?;
    info!(
        "race card: {} horses, {} candidate wagers",
        card.horses.len(),
        proposals.len()
    );

    let conditionals = derive_conditionals(&proposals, &card.horses);
    if !conditionals.is_empty() {
        let table = tabulate_conditionals(&conditionals);
        info!("correlated wagers:\n{}", Console::default().render(&table));
    }

    let combination = best_combination(&proposals, &card.horses, args.max_selections)?;
    info!(
        "selected {} of {} wagers covering {:.1}% of outcomes",
        combination.selected.len(),
        proposals.len(),
        combination.probability * 100.0
    );

    let config = StakingConfig {
        seed: args.seed,
        ..StakingConfig::default()
    };
    let on_progress = |progress: AllocationProgress| {
        debug!(
            "search {}/{} done, best objective {:.6}",
            progress.completed_searches, progress.total_searches, progress.best_objective
        );
    };
    let allocation = allocate(
        &combination.selected,
        args.budget,
        &conditionals,
        &config,
        Some(&on_progress),
    )?;

    let table = tabulate_allocation(&allocation);
    info!("allocation:\n{}", Console::default().render(&table));
    let staked: u64 = allocation.iter().map(|proposal| proposal.stake).sum();
    let expected: f64 = allocation
        .iter()
        .map(|proposal| proposal.probability * proposal.expected_return)
        .sum();
    info!("total staked: {staked} of {}, expected payout: {expected:.0}", args.budget);
    Ok(())
}

fn normalise_advice(advice: &[ProposalAdvice]) -> Result<Vec<BetProposal>, anyhow::Error> {
    let mut proposals = Vec::with_capacity(advice.len());
    for advised in advice {
        let probability = normalise_probability(&advised.probability)?;
        let proposal = if advised.wager_class == WagerClass::BracketQuinella {
            BetProposal::bracket(advised.frames.clone(), advised.odds, probability)
        } else {
            BetProposal::new(
                advised.wager_class,
                advised.horses.clone(),
                advised.odds,
                probability,
            )
        };
        proposal.validate()?;
        proposals.push(proposal);
    }
    Ok(proposals)
}
