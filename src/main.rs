//! Command line front end: replays a command stream against a fresh session.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use snapset::session::DEFAULT_MAX_VERSIONS;
use snapset::{ForestConfig, Session, SessionConfig};

/// Replay versioned set commands and print their replies
#[derive(Parser, Debug)]
#[command(name = "snapset")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command stream to read; standard input when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Seed for node priorities
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of versions a session may hold
    #[arg(long, default_value_t = DEFAULT_MAX_VERSIONS)]
    max_versions: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let output = BufWriter::new(io::stdout().lock());

    let mut session = Session::with_config(SessionConfig {
        forest: ForestConfig {
            seed: cli.seed,
            ..ForestConfig::default()
        },
        max_versions: cli.max_versions,
    });

    match session.run(input, output) {
        Ok(executed) => {
            let stats = session.forest().stats();
            tracing::debug!(
                executed,
                versions = session.versions().len(),
                live = stats.live,
                allocated = stats.allocated,
                blocks = stats.blocks,
                "session finished"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(%err, "session aborted");
            Err(err).context("failed to replay commands")
        }
    }
}
