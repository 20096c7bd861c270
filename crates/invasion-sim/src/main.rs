//! # Invasion Sim
//!
//! Headless arena runner for the Invasion combat AI.
//!
//! ```text
//! invasion-sim [ARENA.toml] [--events FILE] [--init DIR]
//! ```
//!
//! Loads an arena scenario (built-in arena when the file is missing), runs it
//! to completion and prints a JSON summary on stdout. `--events` writes every
//! agent event as a JSON line. `--init` writes the built-in arena and agent
//! catalog to `DIR` and exits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod arena;
mod config;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use invasion_ai::AgentCatalog;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::arena::{Arena, EventLog};
use crate::config::{ArenaConfig, ARENA_FILE};

/// Default agent catalog file name.
const CATALOG_FILE: &str = "agents.toml";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Arena scenario (defaults to arena.toml, built-in arena when missing)
    arena: Option<PathBuf>,

    /// Write every agent event to FILE as JSON lines
    #[arg(long, value_name = "FILE")]
    events: Option<PathBuf>,

    /// Write the built-in arena and agent catalog to DIR and exit
    #[arg(long, value_name = "DIR")]
    init: Option<PathBuf>,
}

/// Writes the built-in scenario and catalog to `dir`.
fn write_defaults(dir: &std::path::Path) -> Result<()> {
    let arena = ArenaConfig {
        catalog: Some(PathBuf::from(CATALOG_FILE)),
        ..ArenaConfig::default()
    };
    arena.save_to(dir.join(ARENA_FILE))?;
    AgentCatalog::with_defaults().save_to(dir.join(CATALOG_FILE))?;
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the summary
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("invasion=info".parse()?))
        .init();

    info!("Invasion sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    if let Some(dir) = &args.init {
        write_defaults(dir)?;
        info!("Wrote default arena and catalog to {}", dir.display());
        return Ok(());
    }

    let arena_path = args.arena.unwrap_or_else(|| PathBuf::from(ARENA_FILE));
    let config = ArenaConfig::load_or_default(&arena_path);
    let catalog = config
        .catalog_path(&arena_path)
        .map_or_else(AgentCatalog::with_defaults, AgentCatalog::load_or_default);

    let mut arena = Arena::new(config, &catalog)?;

    let report = match &args.events {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating event log {}", path.display()))?;
            let mut log = EventLog::new(BufWriter::new(file));
            let report = arena.run(&mut log)?;
            info!("Wrote {} events to {}", log.written(), path.display());
            log.into_inner()?;
            report
        },
        None => arena.run(&mut EventLog::new(io::sink()))?,
    };

    info!(
        ticks = report.ticks,
        target_destroyed = report.target_destroyed,
        kills = report.kills.values().sum::<u32>(),
        "Arena finished"
    );

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    writeln!(stdout)?;

    info!("Invasion sim shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_args_parse_flags_and_arena() {
        let args = Args::try_parse_from([
            "invasion-sim",
            "data/arena.toml",
            "--events",
            "events.jsonl",
        ])
        .expect("valid args");
        assert_eq!(args.arena, Some(PathBuf::from("data/arena.toml")));
        assert_eq!(args.events, Some(PathBuf::from("events.jsonl")));
        assert_eq!(args.init, None);
    }

    #[test]
    fn test_args_reject_bad_input() {
        assert!(Args::try_parse_from(["invasion-sim", "--bogus"]).is_err());
        assert!(Args::try_parse_from(["invasion-sim", "--events"]).is_err());
        assert!(Args::try_parse_from(["invasion-sim", "a.toml", "b.toml"]).is_err());
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        write_defaults(temp_dir.path()).expect("write defaults");

        let arena_path = temp_dir.path().join(ARENA_FILE);
        let config = ArenaConfig::load_from(&arena_path).expect("arena");
        let catalog_path = config.catalog_path(&arena_path).expect("catalog set");
        let catalog = AgentCatalog::load_from(catalog_path).expect("catalog");
        assert!(catalog.get("grunt").is_some());
    }
}
