//! reforger-stats - look up a player's Arma Reforger statistics
//!
//! Resolves a player UID or part of a name against the stats database and
//! prints the combined (or single-server) report.

use anyhow::{Context, Result};
use clap::Parser;
use reforger_stats_core::report::{Report, ServerDisplay};
use reforger_stats_core::{Config, Error, StatsService};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "reforger-stats")]
#[command(about = "Retrieve player statistics by UUID or name")]
#[command(version)]
struct Args {
    /// The UUID or name (partial match supported) of the player
    identifier: String,

    /// Server number (leave empty for all servers)
    #[arg(short, long)]
    server: Option<i64>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Config file (default: ~/.config/reforger-stats/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if !matches!(args.format.as_str(), "text" | "json") {
        anyhow::bail!("Unknown format: {}. Use 'text' or 'json'", args.format);
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = reforger_stats_core::logging::init(&config.logging).ok();

    let service = StatsService::open(&config).context("failed to open stats database")?;

    tracing::info!(
        identifier = %args.identifier,
        server = ?args.server,
        "Stats requested"
    );

    let outcome = service.resolve_stats(&args.identifier, args.server).await;
    if let Err(err) = service.close() {
        // The process exit releases the database anyway
        tracing::warn!(error = %err, "Stats database not closed");
    }

    match outcome {
        Ok(report) => {
            if args.format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_failure(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_failure(err: &Error) {
    match err {
        Error::Ambiguous {
            fragment,
            candidates,
            truncated,
            ..
        } => {
            eprintln!("{}.", err);
            if *truncated {
                eprintln!(
                    "Showing first {} results. Refine \"{}\" or use a UUID instead.",
                    candidates.len(),
                    fragment
                );
            } else {
                eprintln!("Use one of the following UUIDs for a specific player:");
            }
            eprintln!();
            for (i, player) in candidates.iter().enumerate() {
                eprintln!("{}. {} - UUID: {}", i + 1, player.name, player.uid);
            }
        }
        Error::Transient { .. } => {
            eprintln!("An error occurred while retrieving stats. Please try again later.");
        }
        other => eprintln!("{}", other),
    }
}

fn print_report(report: &Report) {
    println!("Player Stats");
    println!("  User: {}", report.player.name);
    println!("  UUID: {}", report.player.uid);
    match &report.servers {
        Some(ServerDisplay::Single(server)) => println!("  Server: {}", server),
        Some(ServerDisplay::Combined(servers)) => println!("  Servers: {}", servers.join(", ")),
        None => {}
    }
    if let Some(level) = report.progression.level {
        println!("  Level: {}", level);
    }
    println!();

    let infantry = &report.infantry;
    println!("Infantry");
    println!("  Points: {}", infantry.points);
    println!("  Player Kills: {}", infantry.kills);
    println!("  Deaths: {}", infantry.deaths);
    println!("  K/D: {}", infantry.kd_ratio);
    println!("  AI Kills: {}", infantry.ai_kills);
    println!("  Shots Fired: {}", infantry.shots);
    println!("  Grenades Thrown: {}", infantry.grenades_thrown);
    println!("  Distance Walked: {} km", infantry.distance_walked_km);
    println!();

    let logistics = &report.logistics;
    println!("Logistics");
    println!("  Points: {}", logistics.points);
    println!("  Roadkills: {}", logistics.roadkills);
    println!("  AI Roadkills: {}", logistics.ai_roadkills);
    println!("  Distance Driven: {} km", logistics.distance_driven_km);
    println!(
        "  Distance as Passenger: {} km",
        logistics.distance_as_passenger_km
    );
    println!();

    let medical = &report.medical;
    println!("Medical");
    println!("  Points: {}", medical.points);
    println!("  Bandages Applied: {}", medical.bandages);
    println!("  Tourniquets Applied: {}", medical.tourniquets);
    println!("  Saline Applied: {}", medical.saline);
    println!("  Morphine Applied: {}", medical.morphine);
    println!();

    let warcrimes = &report.warcrimes;
    println!("Warcrimes");
    println!("  Warcrime Value: {}", warcrimes.warcrime_value);
    println!("  Teamkills: {}", warcrimes.teamkills);
    println!("  AI Teamkills: {}", warcrimes.ai_teamkills);
    println!("  Friendly Roadkills: {}", warcrimes.friendly_roadkills);
    println!("  Friendly AI Roadkills: {}", warcrimes.friendly_ai_roadkills);

    if let Some(moderation) = &report.moderation {
        println!();
        println!("Moderation History");
        if let Some(kicks) = moderation.kicks {
            println!("  Kicks: {}", kicks);
        }
        if let Some(light_bans) = moderation.light_bans {
            println!("  Light Bans: {}", light_bans);
        }
        if let Some(heavy_bans) = moderation.heavy_bans {
            println!("  Heavy Bans: {}", heavy_bans);
        }
    }
}
