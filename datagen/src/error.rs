use std::path::PathBuf;

use thiserror::Error;

use crate::record::RecordError;

#[derive(Debug, Error)]
pub enum DatagenError {
    #[error("output file {0} already exists, refusing to overwrite")]
    OutputExists(PathBuf),

    #[error("concurrency must be between 1 and {max}, got {requested}")]
    InvalidConcurrency { requested: usize, max: usize },

    /// The incrementally maintained hash diverged from a from-scratch
    /// recomputation. This means the board state itself is corrupt, so the
    /// run stops rather than producing suspect data.
    #[error("incremental hash {incremental:#018x} does not match recomputed hash {recomputed:#018x} for position {fen}")]
    HashIntegrity {
        incremental: u64,
        recomputed: u64,
        fen: String,
    },

    #[error("record queue closed before generation finished")]
    QueueClosed,

    #[error("a generation thread panicked")]
    ThreadPanicked,

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
