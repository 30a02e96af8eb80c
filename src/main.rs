//! # meili-sync CLI (`msync`)
//!
//! The `msync` binary drives the sync engine from the command line. It
//! loads a TOML configuration, reads a JSON corpus produced by the host
//! content pipeline, and pushes the reconciled document set to the remote
//! index.
//!
//! ## Usage
//!
//! ```bash
//! msync --config ./msync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `msync sync` | Build, reconcile, and push documents to the remote index |
//! | `msync validate` | Check the configuration without touching the network |
//! | `msync wipe` | Delete every document in the remote index |
//!
//! ## Examples
//!
//! ```bash
//! # Incremental sync from a generated corpus
//! msync sync --corpus ./_site/corpus.json
//!
//! # See what would change without writing anything
//! msync sync --corpus ./_site/corpus.json --dry-run
//!
//! # Rebuild the remote index from scratch
//! msync sync --corpus ./_site/corpus.json --full
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use meili_sync::client::IndexClient;
use meili_sync::config::load_config;
use meili_sync::source::JsonCorpus;
use meili_sync::sync::{run_sync, Environment, SyncOptions, SyncOutcome};

/// meili-sync CLI — push content collections to a Meilisearch-compatible
/// index, incrementally.
#[derive(Parser)]
#[command(
    name = "msync",
    about = "Incremental synchronization of content collections into a search index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./msync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the local document set and sync it to the remote index.
    ///
    /// Fetches the remote document ids, deletes the ones that no longer
    /// exist locally, and upserts every local document. Falls back to a
    /// full wipe-and-reindex when the remote state cannot be fetched.
    Sync {
        /// Path to the JSON corpus produced by the content pipeline.
        #[arg(long, default_value = "./corpus.json")]
        corpus: PathBuf,

        /// Environment label (development syncs can be disabled in config).
        /// Defaults to $MSYNC_ENV, then "development".
        #[arg(long)]
        env: Option<String>,

        /// Print the plan without writing to the remote index.
        #[arg(long)]
        dry_run: bool,

        /// Skip the remote fetch and reindex from scratch.
        #[arg(long)]
        full: bool,
    },

    /// Validate the configuration file. Makes no network calls.
    Validate,

    /// Delete every document in the remote index.
    Wipe,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meili_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Sync {
            corpus,
            env,
            dry_run,
            full,
        } => {
            let config = load_config(&cli.config)?;
            let source = JsonCorpus::load(&corpus)
                .with_context(|| format!("Failed to load corpus from {}", corpus.display()))?;

            let environment = match env {
                Some(label) => Environment::parse(&label),
                None => Environment::from_env(),
            };
            let options = SyncOptions {
                environment,
                dry_run,
                force_full: full,
            };

            let outcome = run_sync(&config, &source, &options);
            report(&config.index_name, &outcome);

            match outcome {
                SyncOutcome::ConfigInvalid { .. } | SyncOutcome::Failed { .. } => {
                    Ok(ExitCode::FAILURE)
                }
                _ => Ok(ExitCode::SUCCESS),
            }
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            println!("config ok");
            println!("  url: {}", config.url);
            println!("  index: {}", config.index_name);
            let collections = config.effective_collections();
            println!(
                "  collections: {}",
                collections.keys().cloned().collect::<Vec<_>>().join(", ")
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Wipe => {
            let config = load_config(&cli.config)?;
            let client = IndexClient::new(&config)?;
            if client.wipe_all() {
                println!("wiped index {}", config.index_name);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("wipe of index {} did not take effect", config.index_name);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Print a human-readable run summary to stdout.
fn report(index_name: &str, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Skipped { reason } => {
            println!("sync skipped: {reason}");
        }
        SyncOutcome::ConfigInvalid { reason } => {
            eprintln!("invalid configuration: {reason}");
        }
        SyncOutcome::Planned { plan, full_reindex } => {
            println!("sync {index_name} (dry-run)");
            if *full_reindex {
                println!("  remote state unknown or --full: would wipe and reindex");
            }
            println!("  would delete: {}", plan.to_delete.len());
            for id in &plan.to_delete {
                println!("    - {id}");
            }
            println!("  would upsert: {}", plan.to_upsert.len());
        }
        SyncOutcome::Synced {
            deleted,
            upserted,
            failed_chunks,
            full_reindex,
        } => {
            println!("sync {index_name}");
            if *full_reindex {
                println!("  full reindex (remote state was unknown or --full was set)");
            }
            println!("  deleted: {deleted}");
            println!("  upserted: {upserted}");
            if *failed_chunks > 0 {
                println!("  failed chunks: {failed_chunks}");
            }
            println!("ok");
        }
        SyncOutcome::Failed { reason } => {
            eprintln!("sync failed: {reason}");
        }
    }
}
