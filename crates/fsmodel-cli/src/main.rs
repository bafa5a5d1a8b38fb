#![forbid(unsafe_code)]

mod cli;
mod engine;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Backend, Cli, Commands};
use engine::{QuickcheckConfig, TestConfig, TrialOutcome};
use fsmodel_testkit::sut::DEFAULT_SUT_TIMEOUT;

/// Exit codes (`spec.md` §6.5): `0` on no divergence found, `1` when a
/// divergence is found (and shrunk), `2` on an operational failure (bad
/// flags, unreadable history file, ...).
mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const DIVERGENCE_FOUND: u8 = 1;
    pub const FAILURE: u8 = 2;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(cli) {
        Ok(found_divergence) => {
            let code = if found_divergence { exit_code::DIVERGENCE_FOUND } else { exit_code::SUCCESS };
            ExitCode::from(code)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code::FAILURE)
        }
    }
}

/// Runs the selected subcommand. Returns `Ok(true)` when a divergence was
/// found (the process should still exit cleanly; that's a finding, not an
/// operational error).
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Quickcheck(args) => run_quickcheck_command(&args),
        Commands::Test(args) => run_test_command(&args),
        Commands::Replay(args) => run_replay_command(&args),
        Commands::Serve(_) => {
            anyhow::bail!("`serve` is not implemented by this crate; it is reserved for an external results-browsing frontend")
        }
    }
}

fn run_quickcheck_command(args: &cli::QuickcheckArgs) -> Result<bool> {
    if !matches!(args.db, Backend::Model) {
        anyhow::bail!("only the `model` backend ships in this crate");
    }

    let config = QuickcheckConfig {
        seed: args.seed,
        trials: args.trials,
        history_length: args.history_length,
        lose_unfsynced_writes_enabled: args.lose_unfsynced_writes,
        scour: args.scour,
        time_limit: Duration::from_secs(args.time_limit),
    };

    tracing::info!(trials = config.trials, history_length = config.history_length, "starting quickcheck");

    match engine::run_quickcheck(&config)? {
        TrialOutcome::AllPassed { trials_run } => {
            println!("PASSED: {trials_run} trial(s), no divergence found");
            Ok(false)
        }
        TrialOutcome::Failed { seed, trials_run, shrunk_history, divergence } => {
            let out_path = args.out.clone().unwrap_or_else(|| format!("fsmodel-failure-{seed}.jsonl").into());
            engine::write_history_file(&out_path, &shrunk_history)?;

            println!("FAILED: seed {seed} diverged after {trials_run} trial(s)");
            println!("shrunk to {} operation(s), written to {}", shrunk_history.len(), out_path.display());
            println!("divergence at index {}: expected {:?}, actual {:?}", divergence.index, divergence.expected, divergence.actual);
            Ok(true)
        }
    }
}

fn run_test_command(args: &cli::TestArgs) -> Result<bool> {
    let config = TestConfig {
        seed: args.seed,
        history_length: args.history_length,
        lose_unfsynced_writes_enabled: args.lose_unfsynced_writes,
        time_limit: Duration::from_secs(args.time_limit),
    };

    let (seed, outcome) = engine::run_test(&config)?;

    if outcome.is_valid() {
        println!("PASSED: seed {seed}");
        Ok(false)
    } else {
        println!("FAILED: seed {seed}");
        Ok(true)
    }
}

fn run_replay_command(args: &cli::ReplayArgs) -> Result<bool> {
    match engine::run_replay(&args.history, args.scour)? {
        None => {
            println!("PASSED: {} does not reproduce a divergence", args.history.display());
            Ok(false)
        }
        Some((shrunk_history, divergence)) => {
            let out_path = args.out.clone().unwrap_or_else(|| args.history.with_extension("shrunk.jsonl"));
            engine::write_history_file(&out_path, &shrunk_history)?;

            println!("FAILED: {} reproduces a divergence", args.history.display());
            println!("shrunk to {} operation(s), written to {}", shrunk_history.len(), out_path.display());
            println!("divergence at index {}: expected {:?}, actual {:?}", divergence.index, divergence.expected, divergence.actual);
            Ok(true)
        }
    }
}

/// Sets up `tracing` output on stderr, scaling verbosity with `-v`/`-vv`/
/// `-vvv` the same way the teacher's `oxcrypt-cli` does, but always
/// respecting `RUST_LOG` if set.
fn setup_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("fsmodel={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    tracing::debug!(timeout = ?DEFAULT_SUT_TIMEOUT, "sut timeout budget (informational; not enforced by the model backend)");
}
