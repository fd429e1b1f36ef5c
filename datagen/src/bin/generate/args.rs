use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "Training Data Generator")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Output file for the 42-byte training records. Defaults to a
    /// timestamped file under data/.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Number of worker threads. Defaults to all cores but one, leaving
    /// a core for the writer.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Stop after this many games per worker.
    #[arg(long)]
    pub games: Option<u64>,

    /// Soft node budget for in-game searches.
    #[arg(long)]
    pub nodes: Option<u64>,

    /// Soft node budget for the opening sanity search.
    #[arg(long)]
    pub verification_nodes: Option<u64>,
}
