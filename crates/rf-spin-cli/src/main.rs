//! rf-spin — spin engine audit and replay tool
//!
//! Usage:
//!   rf-spin spin --seed <seed>           - Run one spin, print the result JSON
//!   rf-spin verify <result.json>         - Re-run a stored result and compare bytes
//!   rf-spin session --spins 50           - Drive sequential spins through the session service
//!   rf-spin reveal <result.json>         - Play a result through the reveal tracker
//!   rf-spin stress --sessions 64         - Parallel sessions with contending requests
//!
//! Every command accepts `--config <file.json|yaml>`; `RUST_LOG` sets verbosity.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;

use rf_spin_engine::{
    BonusMode, BonusSessionState, EngineConfig, InMemorySessionStore, SessionStore, SpinEngine,
    SpinError, SpinRequest, SpinResult, SpinService, reveal,
};

#[derive(Parser)]
#[command(name = "rf-spin", about = "Spin engine audit and replay tool")]
struct Cli {
    /// Engine config (.json, .yaml or .yml); reference game when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one spin and print the result
    Spin {
        /// RNG seed
        #[arg(short, long)]
        seed: String,
        /// Bet amount
        #[arg(short, long, default_value_t = 1.0)]
        bet: f64,
        /// Start in bonus mode with this many spins remaining
        #[arg(long)]
        bonus_spins: Option<u32>,
        /// Accumulated multiplier when starting in bonus mode
        #[arg(long, default_value_t = 1.0)]
        accumulated: f64,
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },
    /// Re-run a stored result and check it reproduces byte for byte
    Verify {
        /// Result JSON file
        result: PathBuf,
    },
    /// Drive sequential spins for one session through the session service
    Session {
        /// Session id
        #[arg(long, default_value = "session-1")]
        id: String,
        /// Number of spins
        #[arg(short = 'n', long, default_value_t = 20)]
        spins: u32,
        /// Bet amount
        #[arg(short, long, default_value_t = 1.0)]
        bet: f64,
        /// Seeds are `<prefix>-<n>`
        #[arg(long, default_value = "session")]
        seed_prefix: String,
    },
    /// Play a stored result through the client reveal contract
    Reveal {
        /// Result JSON file
        result: PathBuf,
    },
    /// Run many sessions in parallel, with concurrent requests per session
    Stress {
        /// Number of sessions
        #[arg(long, default_value_t = 64)]
        sessions: u32,
        /// Requests per session
        #[arg(short = 'n', long, default_value_t = 200)]
        spins: u32,
        /// Bet amount
        #[arg(short, long, default_value_t = 1.0)]
        bet: f64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let engine = Arc::new(load_engine(cli.config.as_deref())?);

    match cli.command {
        Commands::Spin {
            seed,
            bet,
            bonus_spins,
            accumulated,
            pretty,
        } => run_spin(&engine, &seed, bet, bonus_spins, accumulated, pretty),
        Commands::Verify { result } => verify(&engine, &result),
        Commands::Session {
            id,
            spins,
            bet,
            seed_prefix,
        } => run_session(engine, &id, spins, bet, &seed_prefix),
        Commands::Reveal { result } => run_reveal(&result),
        Commands::Stress { sessions, spins, bet } => stress(engine, sessions, spins, bet),
    }
}

fn load_engine(path: Option<&Path>) -> Result<SpinEngine> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    log::info!("Using engine config '{}'", config.name);
    SpinEngine::new(config).context("Invalid engine config")
}

fn read_result(path: &Path) -> Result<SpinResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    SpinResult::from_json(&json).with_context(|| format!("{} is not a spin result", path.display()))
}

fn run_spin(
    engine: &SpinEngine,
    seed: &str,
    bet: f64,
    bonus_spins: Option<u32>,
    accumulated: f64,
    pretty: bool,
) -> Result<()> {
    let state = match bonus_spins {
        Some(spins) => BonusSessionState {
            mode: BonusMode::Bonus,
            spins_remaining: spins,
            accumulated_multiplier: accumulated,
        },
        None => BonusSessionState::base(),
    };

    let result = engine.process_spin(bet, seed, &state)?;
    let json = if pretty {
        result.to_json_pretty()?
    } else {
        result.to_json()?
    };
    println!("{json}");
    Ok(())
}

fn verify(engine: &SpinEngine, path: &Path) -> Result<()> {
    let stored = read_result(path)?;
    let replayed = engine.process_spin(
        stored.bet_amount,
        &stored.rng_seed,
        &stored.starting_bonus_state,
    )?;

    if replayed.to_json()? != stored.to_json()? {
        bail!(
            "Replay of {} diverged (stored total {}, replayed total {})",
            path.display(),
            stored.total_win,
            replayed.total_win
        );
    }
    println!(
        "OK  {}  seed {}  total {:.2}",
        path.display(),
        stored.seed_digest,
        stored.total_win
    );
    Ok(())
}

fn run_session(
    engine: Arc<SpinEngine>,
    session_id: &str,
    spins: u32,
    bet: f64,
    seed_prefix: &str,
) -> Result<()> {
    let store = Arc::new(InMemorySessionStore::new());
    let service = SpinService::new(engine, store.clone());
    let mut claimed = BonusSessionState::base();
    let mut total_bet = 0.0;
    let mut total_win = 0.0;

    for n in 0..spins {
        let request =
            SpinRequest::new(bet, format!("{seed_prefix}-{n}")).with_bonus_state(&claimed);
        let result = service.spin(session_id, &request)?;

        // Bonus spins are free
        if !result.starting_bonus_state.is_active() {
            total_bet += bet;
        }
        total_win += result.total_win;

        println!(
            "#{n:<4} {:?}/{:<2} ×{:<6} cascades {:<2} base {:>9.2} total {:>10.2} {:?}{}",
            result.starting_bonus_state.mode,
            result.starting_bonus_state.spins_remaining,
            result.applied_multiplier,
            result.cascade_count(),
            result.base_win_before_multipliers,
            result.total_win,
            result.win_tier,
            if result.bonus_triggered {
                "  BONUS"
            } else if result.bonus_retriggered {
                "  RETRIGGER"
            } else {
                ""
            }
        );
        claimed = result.new_bonus_state;
    }

    let stored = store.load(session_id)?;
    println!(
        "\nbet {total_bet:.2}  win {total_win:.2}  final state {:?} ({} left, ×{})",
        stored.mode, stored.spins_remaining, stored.accumulated_multiplier
    );
    Ok(())
}

fn run_reveal(path: &Path) -> Result<()> {
    let result = read_result(path)?;
    let (frames, divergence) = reveal::play(&result);
    for frame in &frames {
        println!("{}", serde_json::to_string(frame)?);
    }
    if let Some(err) = divergence {
        log::warn!("{err}");
    }
    Ok(())
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressReport {
    sessions: u32,
    requests: u64,
    completed: u64,
    busy: u64,
    failed: u64,
    total_win: f64,
}

fn stress(engine: Arc<SpinEngine>, sessions: u32, spins: u32, bet: f64) -> Result<()> {
    let store = Arc::new(InMemorySessionStore::new());
    let service = SpinService::new(engine, store);
    let completed = AtomicU64::new(0);
    let busy = AtomicU64::new(0);
    let failed = AtomicU64::new(0);

    let wins: Vec<f64> = (0..sessions)
        .flat_map(|s| (0..spins).map(move |n| (s, n)))
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(s, n)| {
            let session_id = format!("stress-{s}");
            let request = SpinRequest::new(bet, format!("stress-{s}-{n}"));
            match service.spin(&session_id, &request) {
                Ok(result) => {
                    completed.fetch_add(1, Ordering::Relaxed);
                    result.total_win
                }
                Err(SpinError::SessionBusy(_)) => {
                    busy.fetch_add(1, Ordering::Relaxed);
                    0.0
                }
                Err(err) => {
                    log::error!("{session_id} spin {n} failed: {err}");
                    failed.fetch_add(1, Ordering::Relaxed);
                    0.0
                }
            }
        })
        .collect();

    let report = StressReport {
        sessions,
        requests: sessions as u64 * spins as u64,
        completed: completed.into_inner(),
        busy: busy.into_inner(),
        failed: failed.into_inner(),
        total_win: wins.iter().sum(),
    };
    log::debug!("{} session locks still tracked", service.tracked_sessions());
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed > 0 {
        bail!("{} spins failed", report.failed);
    }
    Ok(())
}
