#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Rowfall match between bots.

mod session;
mod settings;

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rowfall_core::SimulationContext;

use crate::session::Match;

/// Runs a replicated Rowfall match between random-swipe bots.
#[derive(Debug, Parser)]
#[command(name = "rowfall", version)]
struct Args {
    /// TOML file with simulation settings; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of participants; the first one hosts.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=8))]
    players: u32,
    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u32,
    /// Overrides the seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds simulated per tick.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,
    /// Probability per idle tick that a bot swipes.
    #[arg(long, default_value_t = 0.1)]
    swipe_chance: f32,
}

/// Entry point for the Rowfall command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    ensure!(
        args.dt.is_finite() && args.dt > 0.0,
        "--dt must be a positive number of seconds"
    );
    ensure!(
        (0.0..=1.0).contains(&args.swipe_chance),
        "--swipe-chance must lie in [0, 1]"
    );

    let mut config = settings::load(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let context = SimulationContext::new(config).context("invalid simulation configuration")?;
    log::info!(
        "starting a {}x{} match with {} players (seed {})",
        context.width(),
        context.height(),
        args.players,
        context.config().seed
    );

    let mut session = Match::new(&context, args.players, args.swipe_chance);
    let report = session
        .run(args.ticks, args.dt)
        .context("replication traffic could not be decoded")?;

    println!("ticks simulated: {}", report.ticks);
    println!("landings: {}", report.landings);
    for (player, cause) in &report.deaths {
        println!("player {} died: {cause:?}", player.get());
    }
    match report.outcome {
        Some(outcome) => {
            let winner = outcome
                .winner
                .map_or_else(|| "nobody".to_owned(), |player| player.get().to_string());
            println!(
                "round over: player {} lost, winner {winner}, host won: {}",
                outcome.loser.get(),
                outcome.host_won
            );
        }
        None => println!("round still open after {} ticks", report.ticks),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::{CommandFactory, Parser};

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn player_count_is_bounded() {
        assert!(Args::try_parse_from(["rowfall", "--players", "0"]).is_err());
        assert!(Args::try_parse_from(["rowfall", "--players", "9"]).is_err());
        let args = Args::try_parse_from(["rowfall", "--players", "3", "--seed", "7"])
            .expect("valid arguments");
        assert_eq!(args.players, 3);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.ticks, 3_600);
    }
}
