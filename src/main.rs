//! # Question Aggregator CLI (`qagg`)
//!
//! Bundles a tree of subject and question folders into one `questions.json`
//! and serves it locally for client development.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qagg aggregate` | Build `questions.json` from the questions directory |
//! | `qagg serve [PORT]` | Serve a directory over HTTP with CORS headers |
//!
//! ## Examples
//!
//! ```bash
//! # Run from the project root; image fields point at a hosted copy
//! qagg aggregate --image-base https://raw.githubusercontent.com/user/repo/main/questions
//!
//! # Inline images as WebP data URIs at quality 75
//! qagg aggregate --embed --quality 75
//!
//! # Serve the questions folder on port 3001
//! qagg serve --dir questions
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use question_aggregator::aggregate::{run_aggregate, AggregateOptions};
use question_aggregator::{bootstrap, config, logging, server};

/// Question Aggregator — bundles per-question folders into a single JSON document.
///
/// Settings may come from a TOML config file; command-line flags take
/// precedence over it.
#[derive(Parser)]
#[command(
    name = "qagg",
    about = "Aggregate subject and question folders into a single questions.json",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when missing.
    #[arg(long, global = true, default_value = "./config/qagg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the aggregated questions document.
    ///
    /// Walks every subject folder under the questions directory, merges
    /// `subject.json` with each `questions/<id>/question.json`, attaches the
    /// main image and writes the result as pretty-printed JSON.
    Aggregate {
        /// Questions directory. Detected from the working directory when omitted.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output file. Defaults to `questions.json` inside the questions directory.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Base URL for image references (e.g. `https://raw.githubusercontent.com/user/repo/main/questions/`).
        #[arg(long = "image-base", conflicts_with = "embed")]
        image_base: Option<String>,

        /// Inline images as base64 data URIs instead of referencing them.
        #[arg(long)]
        embed: bool,

        /// Embed quality: 100 keeps the original format, lower values re-encode as WebP.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },

    /// Serve a directory over HTTP with permissive CORS headers.
    Serve {
        /// Port to listen on (default 3001).
        port: Option<u16>,

        /// Directory to serve (default: current directory).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Aggregate {
            root,
            output,
            image_base,
            embed,
            quality,
        } => {
            let mut agg = cfg.aggregate.clone();
            if image_base.is_some() {
                agg.image_base = image_base;
            }
            if embed {
                agg.embed = true;
            }
            if let Some(q) = quality {
                agg.quality = q;
            }

            let questions_dir = match root.or(agg.root.clone()) {
                Some(dir) => dir,
                None => bootstrap::locate(&std::env::current_dir()?),
            };
            let output = output
                .or(agg.output.clone())
                .unwrap_or_else(|| bootstrap::default_output(&questions_dir));

            let mut options = AggregateOptions::new(questions_dir, output, agg.image_mode());
            options.exclude = agg.exclude.clone();
            run_aggregate(&options)?;
        }
        Commands::Serve { port, dir } => {
            let port = port.unwrap_or(cfg.server.port);
            let dir = dir.unwrap_or(cfg.server.dir.clone());
            server::run_server(&dir, port).await?;
        }
    }

    Ok(())
}
