// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `arena` binary: run, verify, sign, and replay matches.

#![deny(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

/// Exit code for runtime and resolution errors.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "arena", version, about = "Deterministic agent-versus-agent match harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

/// How agents are resolved for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum GatewayArg {
    /// Scripted in-process agents from the registry.
    Local,
    /// Gateway-backed text agents POSTing to `--agent-urls`.
    Http,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single match and write its artifact directory.
    RunMatch {
        /// Scenario key (numberGuess | heist | resourceRivals).
        #[arg(long)]
        scenario: String,

        /// Match seed.
        #[arg(long)]
        seed: u32,

        /// Turn limit.
        #[arg(long)]
        turns: u32,

        /// Override the generated match id.
        #[arg(long = "matchId")]
        match_id: Option<String>,

        /// Comma-separated agent keys (local) or names (http).
        #[arg(long, value_delimiter = ',', default_value = "random,baseline")]
        agents: Vec<String>,

        /// Output directory (default: under the storage root).
        #[arg(long = "outDir")]
        out_dir: Option<PathBuf>,

        /// Also write the event log JSONL to this file.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Agent resolution mode.
        #[arg(long, value_enum, default_value_t = GatewayArg::Local)]
        gateway: GatewayArg,

        /// One URL per agent, for `--gateway http`.
        #[arg(long = "agent-urls", value_delimiter = ',')]
        agent_urls: Vec<String>,

        /// Stamp engine provenance into MatchStarted.
        #[arg(long = "emit-provenance")]
        emit_provenance: bool,

        /// Engine commit recorded when provenance is on.
        #[arg(long = "engine-commit")]
        engine_commit: Option<String>,

        /// Engine version recorded when provenance is on.
        #[arg(long = "engine-version")]
        engine_version: Option<String>,
    },

    /// Run a round-robin tournament and write its bundle.
    RunTournament {
        /// Tournament seed.
        #[arg(long)]
        seed: u32,

        /// Rounds of the round-robin.
        #[arg(long)]
        rounds: u32,

        /// Turn limit per match.
        #[arg(long = "maxTurns")]
        max_turns: u32,

        /// Scenario key.
        #[arg(long)]
        scenario: String,

        /// Comma-separated agent keys.
        #[arg(long, value_delimiter = ',')]
        agents: Vec<String>,

        /// Output directory for the bundle.
        #[arg(long = "outDir")]
        out_dir: PathBuf,

        /// Also write a bundle digest (manifest + standings) here.
        #[arg(long = "bundle-out")]
        bundle_out: Option<PathBuf>,
    },

    /// Re-verify a match directory (exit 0 pass, 1 mismatch, 2 structural).
    VerifyMatch {
        /// Match directory.
        #[arg(long)]
        path: PathBuf,
    },

    /// Re-verify a tournament directory (same exit convention).
    VerifyTournament {
        /// Tournament directory.
        #[arg(long)]
        path: PathBuf,
    },

    /// Run the full bundle validator.
    ValidateBundle {
        /// Tournament bundle directory.
        #[arg(long)]
        path: PathBuf,

        /// Treat missing receipts as errors.
        #[arg(long = "require-signatures")]
        require_signatures: bool,

        /// Print warnings as well as errors.
        #[arg(long)]
        verbose: bool,
    },

    /// Sign every match and the tournament itself.
    SignTournament {
        /// Tournament bundle directory.
        dir: PathBuf,

        /// PKCS#8 PEM private key.
        #[arg(long)]
        key: PathBuf,

        /// Issuer recorded in each receipt payload.
        #[arg(long)]
        issuer: String,
    },

    /// Verify receipts against a public key and the filesystem.
    VerifyReceipt {
        /// Tournament bundle directory.
        dir: PathBuf,

        /// SPKI PEM public key.
        #[arg(long = "pub")]
        public_key: PathBuf,

        /// Only verify this match key.
        #[arg(long = "match")]
        match_key: Option<String>,

        /// Skip recomputing filesystem hashes.
        #[arg(long = "skip-hashes")]
        skip_hashes: bool,
    },

    /// Render a match log as a redacted markdown transcript.
    ReplayMatch {
        /// The match.jsonl to replay.
        #[arg(long = "in")]
        input: PathBuf,

        /// Write the transcript here instead of stdout.
        #[arg(long = "out-md")]
        out_md: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("arena=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arena=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::RunMatch {
            scenario,
            seed,
            turns,
            match_id,
            agents,
            out_dir,
            out,
            gateway,
            agent_urls,
            emit_provenance,
            engine_commit,
            engine_version,
        } => {
            let args = commands::RunMatchArgs {
                scenario,
                seed,
                turns,
                match_id,
                agents,
                out_dir,
                out,
                gateway,
                agent_urls,
                emit_provenance,
                engine_commit,
                engine_version,
            };
            fallible(commands::cmd_run_match(args).await)
        }
        Commands::RunTournament {
            seed,
            rounds,
            max_turns,
            scenario,
            agents,
            out_dir,
            bundle_out,
        } => fallible(
            commands::cmd_run_tournament(
                seed, rounds, max_turns, scenario, agents, out_dir, bundle_out,
            )
            .await,
        ),
        Commands::VerifyMatch { path } => commands::cmd_verify_match(&path),
        Commands::VerifyTournament { path } => commands::cmd_verify_tournament(&path),
        Commands::ValidateBundle {
            path,
            require_signatures,
            verbose,
        } => commands::cmd_validate_bundle(&path, require_signatures, verbose),
        Commands::SignTournament { dir, key, issuer } => {
            fallible(commands::cmd_sign_tournament(&dir, &key, &issuer))
        }
        Commands::VerifyReceipt {
            dir,
            public_key,
            match_key,
            skip_hashes,
        } => commands::cmd_verify_receipt(&dir, &public_key, match_key.as_deref(), skip_hashes),
        Commands::ReplayMatch { input, out_md } => {
            fallible(commands::cmd_replay_match(&input, out_md.as_deref()))
        }
    };

    std::process::exit(code);
}

fn fallible(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_RUNTIME_ERROR
        }
    }
}
