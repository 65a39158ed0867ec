//! Headless Turn Runner
//!
//! Plays a scenario for a fixed number of turns with scripted orders and
//! prints every TurnResult as JSON. Useful for balance passes and for
//! checking that two builds produce identical snapshot hashes.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use nacio::core::config::EngineConfig;
use nacio::core::error::Result;
use nacio::core::types::{NationId, Turn};
use nacio::nation::{Directive, Scenario};
use nacio::timeline::persist;
use nacio::turn::{Orchestrator, TurnResult};

#[derive(Parser, Debug)]
#[command(name = "turn_runner")]
#[command(about = "Run scripted turns and output results as JSON")]
struct Args {
    /// Scenario TOML; the built-in 1980 opening when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Engine configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Orders TOML: [[orders]] with turn, nation and directive
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Number of turns to play
    #[arg(long, default_value_t = 10)]
    turns: u32,

    /// Save every timeline here when done
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print only the final snapshot hash
    #[arg(long)]
    hash_only: bool,
}

#[derive(Debug, Deserialize)]
struct OrderFile {
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
struct Order {
    turn: Turn,
    nation: NationId,
    directive: Directive,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    turns: &'a [TurnResult],
    final_hash: &'a str,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nacio=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin()?,
    };
    let orders = match &args.orders {
        Some(path) => toml::from_str::<OrderFile>(&std::fs::read_to_string(path)?)?.orders,
        None => Vec::new(),
    };

    let mut orch = Orchestrator::new(scenario.build()?, config)?;
    let mut results = Vec::with_capacity(args.turns as usize);

    for _ in 0..args.turns {
        let turn = orch.open_turn()?;
        for order in orders.iter().filter(|o| o.turn == turn) {
            if let Err(rejection) = orch.submit(order.nation.clone(), order.directive.clone()) {
                eprintln!("Turn {}: {}", turn, rejection);
            }
        }
        results.push(orch.end_turn()?);
    }

    let final_hash = orch.current_snapshot()?.content_hash();

    if let Some(path) = &args.save {
        persist::save(path, &orch.timelines().export())?;
    }

    if args.hash_only {
        println!("{}", final_hash);
    } else {
        let output = RunOutput {
            turns: &results,
            final_hash: &final_hash,
        };
        let json = serde_json::to_string_pretty(&output)?;
        println!("{}", json);
    }
    Ok(())
}
