//! CLI for the courier report pipeline.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use courier_core::config::{self, CourierConfig};
use courier_core::fallback::FallbackStore;
use std::path::{Path, PathBuf};

use commands::{
    run_checksum, run_fallback_list, run_fallback_remove, run_fallback_resend, run_fallback_show,
    run_fallback_verify, run_pipeline,
};

/// Top-level CLI for courier.
#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(about = "courier: capture, summarize and deliver a daily report", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/courier/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the pipeline once: acquire, transform, deliver.
    Run {
        /// Read source images from DIR instead of the configured source_dir.
        #[arg(long, value_name = "DIR")]
        source_dir: Option<PathBuf>,
        /// Log what would be delivered instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect or re-send locally saved fallback bundles.
    Fallback {
        #[command(subcommand)]
        command: FallbackCommand,
    },

    /// Compute SHA-256 of one or more files.
    Checksum {
        /// Files to hash.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FallbackCommand {
    /// List bundles, most recent first.
    List,

    /// Print a bundle's report text and error summary.
    Show {
        /// Bundle name (its directory name, e.g. 20261019_071500).
        name: String,
    },

    /// Delete a bundle.
    Remove {
        /// Bundle name.
        name: String,
    },

    /// Deliver a saved bundle again (items first, then the text).
    Resend {
        /// Bundle name.
        name: String,
        /// Delete the bundle once everything was delivered.
        #[arg(long)]
        remove: bool,
    },

    /// Re-hash a bundle's artifacts against its index.
    Verify {
        /// Bundle name.
        name: String,
    },
}

fn load_config(path: Option<&Path>) -> Result<CourierConfig> {
    let cfg = match path {
        Some(p) => config::load_from(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    /// Parses arguments, runs the command and returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let config_path = cli.config.as_deref();

        match cli.command {
            CliCommand::Run {
                source_dir,
                dry_run,
            } => {
                let cfg = load_config(config_path)?;
                run_pipeline(&cfg, source_dir.as_deref(), dry_run).await
            }
            CliCommand::Fallback { command } => {
                let cfg = load_config(config_path)?;
                let store = FallbackStore::new(cfg.fallback_root()?);
                match command {
                    FallbackCommand::List => run_fallback_list(&store)?,
                    FallbackCommand::Show { name } => run_fallback_show(&store, &name)?,
                    FallbackCommand::Remove { name } => run_fallback_remove(&store, &name)?,
                    FallbackCommand::Resend { name, remove } => {
                        return run_fallback_resend(&cfg, &store, &name, remove).await;
                    }
                    FallbackCommand::Verify { name } => return run_fallback_verify(&store, &name),
                }
                Ok(0)
            }
            CliCommand::Checksum { paths } => {
                run_checksum(&paths).await?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
