//! Nacio - Entry Point
//!
//! Interactive play: loads a scenario (or a save game), then reads commands
//! from stdin. Each committed turn is printed, optionally narrated by an LLM,
//! and optionally autosaved in the background.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::runtime::Runtime;

use nacio::core::config::EngineConfig;
use nacio::core::error::{NacioError, Result};
use nacio::core::types::{NationId, TimelineId, Turn};
use nacio::nation::{Directive, Scenario};
use nacio::narrative::{narrate, LlmClient};
use nacio::ranking::{self, RankEntry};
use nacio::timeline::persist::{self, SavedGame};
use nacio::timeline::{Autosaver, TimelineManager};
use nacio::turn::{Orchestrator, TurnPhase};

#[derive(Parser, Debug)]
#[command(name = "nacio")]
#[command(about = "Turn-based grand strategy across historical eras")]
struct Args {
    /// Scenario TOML; the built-in 1980 opening when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Engine configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Continue a saved game or an autosaved turn instead of starting a scenario
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write every committed turn under this directory
    #[arg(long)]
    autosave: Option<PathBuf>,

    /// Never call the narrative service
    #[arg(long)]
    offline: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nacio=info".into()),
        )
        .init();

    let args = Args::parse();
    let rt = Runtime::new()?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut orch = match &args.load {
        Some(path) => match persist::load_game(path)? {
            SavedGame::Archive(archive) => {
                let timelines = TimelineManager::import(archive)?;
                let active = timelines
                    .list()
                    .last()
                    .map(|info| info.id)
                    .ok_or_else(|| NacioError::Validation("save game has no timelines".into()))?;
                Orchestrator::attach(timelines, active, config)?
            }
            SavedGame::Snapshot(snapshot) => Orchestrator::restore(snapshot, config)?,
        },
        None => {
            let scenario = match &args.scenario {
                Some(path) => Scenario::load(path)?,
                None => Scenario::builtin()?,
            };
            Orchestrator::new(scenario.build()?, config)?
        }
    };

    if let Some(dir) = &args.autosave {
        orch = orch.with_autosave(Autosaver::spawn(rt.handle(), dir));
    }

    let llm = if args.offline {
        None
    } else {
        match LlmClient::from_env() {
            Ok(client) => Some(client),
            Err(_) => {
                tracing::warn!("LLM_API_KEY not set - turns will not be narrated");
                None
            }
        }
    };

    print_help();

    loop {
        print!("[{} {}] > ", orch.world().year(), orch.timeline().short());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };

        if command == "quit" || command == "q" {
            break;
        }

        let outcome = match command {
            "help" | "h" => {
                print_help();
                Ok(())
            }
            "status" | "s" => show_status(&orch, rest.first().copied()),
            "rank" | "r" => show_rankings(&orch, rest),
            "do" => queue_directive(&mut orch, rest),
            "pending" | "p" => {
                for submission in orch.pending() {
                    println!(
                        "  {} {} {:?}",
                        submission.ticket, submission.nation, submission.directive
                    );
                }
                Ok(())
            }
            "cancel" => orch
                .cancel_turn()
                .map(|dropped| println!("Turn cancelled, {} directive(s) dropped", dropped)),
            "end" | "e" => end_turn(&mut orch, &rt, llm.as_ref()),
            "branch" => orch
                .branch_here()
                .map(|id| println!("Now playing on branch {}", id.short())),
            "resume" => resume(&mut orch, rest),
            "timelines" | "tl" => {
                show_timelines(&orch);
                Ok(())
            }
            "save" => match rest.first() {
                Some(path) => persist::save(&PathBuf::from(*path), &orch.timelines().export())
                    .map(|()| println!("Saved to {}", path)),
                None => Err(NacioError::Validation("usage: save <path>".into())),
            },
            _ => Err(NacioError::Validation(format!(
                "unknown command '{}', try 'help'",
                command
            ))),
        };

        if let Err(err) = outcome {
            println!("Error: {}", err);
        }
    }

    if let Some(autosaver) = orch.take_autosaver() {
        let written = rt.block_on(autosaver.shutdown())?;
        tracing::info!(written, "Autosaves flushed");
    }

    println!(
        "\nFarewell. The world stands at {} after {} turn(s).",
        orch.world().year(),
        orch.world().turn
    );
    Ok(())
}

fn print_help() {
    println!("\n=== NACIO ===");
    println!("Guide your nation through the eras.");
    println!();
    println!("Commands:");
    println!("  status / s [nation]          - World overview or one nation in detail");
    println!("  rank / r [gdp|mil|region id] - Leaderboards");
    println!("  do <nation> <directive> ...  - Queue a directive (opens the turn)");
    println!("      tech | industry | invest <b> | mobilize <b> | stabilize <b> | attack <target> <force>");
    println!("  pending / p                  - Directives queued this turn");
    println!("  cancel                       - Drop the open turn");
    println!("  end / e                      - Resolve and commit the turn");
    println!("  branch                       - Fork the timeline here");
    println!("  resume <timeline> [turn]     - Continue from another point in history");
    println!("  timelines / tl               - List timelines");
    println!("  save <path>                  - Save every timeline");
    println!("  quit / q                     - Exit");
    println!();
}

fn show_status(orch: &Orchestrator, nation: Option<&str>) -> Result<()> {
    let world = orch.world();
    if let Some(id) = nation {
        let n = world.nation(&NationId::from(id))?;
        println!("{} ({}) - {} era", n.name, n.id, n.era);
        println!("  Tech {} / Industry {}", n.tech_level, n.industry_level);
        println!("  GDP        {:>10.1}B ({:.0} per capita)", n.gdp, n.gdp_per_capita());
        println!("  Treasury   {:>10.1}B", n.treasury);
        println!("  Population {:>10}", n.population);
        println!("  Stability  {:>10.1}", n.stability);
        println!("  Approval   {:>10.1}", n.approval);
        println!("  Military   {:>10.1}", n.military_strength);
        println!("  Territory  {:>10}", n.territory);
        let neighbors: Vec<&str> = n.neighbors.iter().map(NationId::as_str).collect();
        println!("  Neighbours {}", neighbors.join(", "));
        return Ok(());
    }

    println!("\n--- Year {} (turn {}) ---", world.year(), world.turn);
    for n in world.nations.values() {
        println!(
            "  {:<4} {:<16} {:<12} GDP {:>8.1}B  Mil {:>7.1}  Stab {:>5.1}",
            n.id.as_str(),
            n.name,
            n.era.to_string(),
            n.gdp,
            n.military_strength,
            n.stability
        );
    }
    if let TurnPhase::AwaitingDirectives(queue) = orch.phase() {
        println!("  Turn open, {} directive(s) queued", queue.len());
    }
    Ok(())
}

fn show_rankings(orch: &Orchestrator, args: &[&str]) -> Result<()> {
    let world = orch.world();
    let size = orch.config().leaderboard_size;
    let (title, board) = match args {
        [] | ["gdp"] => ("Largest economies", ranking::top_economies(world, size)),
        ["mil"] | ["military"] => ("Strongest militaries", ranking::top_militaries(world, size)),
        ["region", id] => (
            "Regional economies",
            ranking::regional_ranking(world, &NationId::from(*id))?,
        ),
        _ => {
            return Err(NacioError::Validation(
                "usage: rank [gdp|mil|region <nation>]".into(),
            ))
        }
    };
    print_board(title, &board);
    Ok(())
}

fn print_board(title: &str, board: &[RankEntry]) {
    println!("\n{}:", title);
    for entry in board {
        println!("  {:>2}. {:<16} {:>10.1}", entry.rank, entry.name, entry.value);
    }
}

fn queue_directive(orch: &mut Orchestrator, args: &[&str]) -> Result<()> {
    let [nation, kind, params @ ..] = args else {
        return Err(NacioError::Validation(
            "usage: do <nation> <directive> [params]".into(),
        ));
    };
    let directive = Directive::from_parts(kind, params)?;
    if orch.phase().is_settled() {
        let turn = orch.open_turn()?;
        println!("Turn {} opened", turn);
    }
    match orch.submit(NationId::from(*nation), directive) {
        Ok(ticket) => println!("Accepted {}", ticket),
        Err(rejection) => println!("Rejected: {}", rejection),
    }
    Ok(())
}

fn end_turn(orch: &mut Orchestrator, rt: &Runtime, llm: Option<&LlmClient>) -> Result<()> {
    if orch.phase().is_settled() {
        orch.open_turn()?;
    }
    let result = match orch.end_turn() {
        Ok(result) => result,
        Err(NacioError::TurnRejected(rejections)) => {
            println!("Turn aborted; nothing was committed:");
            for rejection in rejections {
                println!("  {}", rejection);
            }
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    print!("{}", result.summary());
    print_board("Largest economies", &result.leaderboards.economies);

    if let Some(client) = llm {
        let timeout = Duration::from_millis(orch.config().narrative_timeout_ms);
        let narrative = rt.block_on(narrate(client, &result, timeout));
        println!("\n{}\n", narrative.text());
    }
    Ok(())
}

fn resume(orch: &mut Orchestrator, args: &[&str]) -> Result<()> {
    let Some(prefix) = args.first() else {
        return Err(NacioError::Validation("usage: resume <timeline> [turn]".into()));
    };
    let timeline = find_timeline(orch, prefix)?;
    let turn = args
        .get(1)
        .map(|t| {
            t.parse::<Turn>()
                .map_err(|_| NacioError::Validation(format!("'{}' is not a turn number", t)))
        })
        .transpose()?;

    let report = orch.resume(timeline, turn)?;
    if let Some(fallback) = report.fallback {
        println!(
            "Turn {} not found; resumed from latest turn {}",
            fallback.requested, fallback.used
        );
    }
    if let Some(from) = report.branched_from {
        println!(
            "Branched from {} at turn {}; now on {}",
            from.timeline.short(),
            from.turn,
            report.timeline.short()
        );
    }
    Ok(())
}

fn find_timeline(orch: &Orchestrator, prefix: &str) -> Result<TimelineId> {
    let matches: Vec<TimelineId> = orch
        .timelines()
        .list()
        .into_iter()
        .map(|info| info.id)
        .filter(|id| id.to_string().starts_with(prefix) || id.short().starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(NacioError::not_found(format!("timeline {}", prefix))),
        _ => Err(NacioError::Validation(format!("'{}' is ambiguous", prefix))),
    }
}

fn show_timelines(orch: &Orchestrator) {
    for info in orch.timelines().list() {
        let marker = if info.id == orch.timeline() { "*" } else { " " };
        let parent = info
            .parent
            .map(|p| format!("from {}@{}", p.timeline.short(), p.turn))
            .unwrap_or_else(|| "root".into());
        let latest = info
            .latest_turn
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            " {} {} {:<12} latest turn {:>4}  {}",
            marker,
            info.id.short(),
            info.label,
            latest,
            parent
        );
    }
}
