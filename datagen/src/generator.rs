use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use search::{AlphaBetaEngine, Engine};

use crate::config::GenerationConfig;
use crate::error::DatagenError;
use crate::queue::RecordQueue;
use crate::worker::GenerationWorker;
use crate::writer;

/// Owns the output file, the record queue, the workers and the writer, and
/// coordinates their lifecycle: start everything, observe the stop flag,
/// join workers, close the queue, drain the writer, flush.
#[derive(Debug)]
pub struct Generator {
    output: File,
    path: PathBuf,
    concurrency: usize,
    config: GenerationConfig,
    positions: Arc<AtomicU64>,
}

impl Generator {
    /// Create a generator writing to `path`. The file must not already
    /// exist and `concurrency` must leave at least one core for the writer.
    pub fn new(
        path: impl AsRef<Path>,
        concurrency: usize,
        config: GenerationConfig,
    ) -> Result<Self, DatagenError> {
        let cores = num_cpus::get();
        if concurrency < 1 || concurrency >= cores {
            return Err(DatagenError::InvalidConcurrency {
                requested: concurrency,
                max: cores - 1,
            });
        }

        let path = path.as_ref().to_path_buf();
        let output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => DatagenError::OutputExists(path.clone()),
                _ => DatagenError::Io(e),
            })?;

        Ok(Self {
            output,
            path,
            concurrency,
            config,
            positions: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Running total of accepted records. Safe to read from any thread at
    /// any time; only ever increases.
    pub fn position_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.positions)
    }

    pub fn output_path(&self) -> &Path {
        &self.path
    }

    /// Run generation until the stop flag is raised or every worker's game
    /// budget is spent. Returns the number of records written.
    ///
    /// Shutdown order matters: workers are joined first (each finishes its
    /// in-flight game), then the queue closes by dropping the last handle,
    /// and only then does the writer see end-of-stream and flush.
    pub fn run(self, stop: Arc<AtomicBool>) -> Result<u64, DatagenError> {
        log::info!(
            "generating training data with {} worker threads into {}",
            self.concurrency,
            self.path.display()
        );

        let capacity = self.concurrency * self.config.queue_capacity_per_thread;
        let (queue, rx) = RecordQueue::bounded(capacity);
        let queue = Arc::new(queue);

        let written = std::thread::scope(|scope| -> Result<u64, DatagenError> {
            let writer_handle = scope.spawn(move || writer::run(rx, self.output));

            let worker_handles: Vec<_> = (0..self.concurrency)
                .map(|id| {
                    let worker = GenerationWorker::new(
                        id,
                        AlphaBetaEngine::new(),
                        Arc::clone(&queue),
                        Arc::clone(&self.positions),
                        self.config.clone(),
                    );
                    let stop = Arc::clone(&stop);
                    scope.spawn(move || run_worker(worker, &stop))
                })
                .collect();

            let mut first_error = None;
            for handle in worker_handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::error!("worker failed: {e}");
                        first_error.get_or_insert(e);
                    }
                    Err(_) => {
                        stop.store(true, Ordering::Relaxed);
                        first_error.get_or_insert(DatagenError::ThreadPanicked);
                    }
                }
            }

            // Last queue handle: dropping it closes the channel so the
            // writer can drain and exit.
            drop(queue);

            let written = writer_handle
                .join()
                .map_err(|_| DatagenError::ThreadPanicked)?
                .map_err(DatagenError::Io)?;

            match first_error {
                Some(e) => Err(e),
                None => Ok(written),
            }
        })?;

        log::info!(
            "wrote {} records to {}",
            written,
            self.path.display()
        );

        Ok(written)
    }
}

/// Wraps a worker's run so a fatal error raises the stop flag from inside
/// the worker's own thread. Raising it only from the join loop is not
/// enough: the joins happen in handle order, so a peer that errors while an
/// earlier handle is still being joined would never be observed and the
/// remaining workers would keep playing games.
fn run_worker<E: Engine>(
    worker: GenerationWorker<E>,
    stop: &AtomicBool,
) -> Result<(), DatagenError> {
    let result = worker.run(stop);
    if result.is_err() {
        stop.store(true, Ordering::Relaxed);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::{Board, Move};
    use search::{SearchLimits, SearchReport};
    use utils::is_quiet;

    /// Always scores zero and plays a quiet move where one exists.
    struct LevelEngine;

    impl Engine for LevelEngine {
        fn new_game(&mut self) {}

        fn search(&mut self, board: &mut Board, _limits: &SearchLimits) -> Option<SearchReport> {
            let mut moves: Vec<Move> = Vec::new();
            board.generate_moves(|batch| {
                moves.extend(batch);
                false
            });
            let best_move = moves
                .iter()
                .copied()
                .find(|&mv| is_quiet(board, mv))
                .or_else(|| moves.first().copied())?;
            Some(SearchReport { best_move, score: 0 })
        }
    }

    #[test]
    fn a_failing_worker_stops_its_peers() {
        let stop = AtomicBool::new(false);

        // The healthy worker records nothing, plays one-search games and
        // would run forever without the flag.
        let healthy_config = GenerationConfig {
            draw_min_ply: 0,
            draw_streak: 1,
            min_record_ply: 1024,
            ..GenerationConfig::default()
        };
        // The failing worker records early positions into a queue whose
        // consumer is already gone, so its first flush fails.
        let failing_config = GenerationConfig {
            draw_min_ply: 0,
            draw_streak: 2,
            min_record_ply: 0,
            ..GenerationConfig::default()
        };

        let (healthy_queue, _healthy_rx) = RecordQueue::bounded(64);
        let (failing_queue, failing_rx) = RecordQueue::bounded(64);
        drop(failing_rx);

        let first_error = std::thread::scope(|scope| {
            let healthy = scope.spawn(|| {
                let worker = GenerationWorker::new(
                    0,
                    LevelEngine,
                    Arc::new(healthy_queue),
                    Arc::new(AtomicU64::new(0)),
                    healthy_config,
                );
                run_worker(worker, &stop)
            });
            let failing = scope.spawn(|| {
                let worker = GenerationWorker::new(
                    1,
                    LevelEngine,
                    Arc::new(failing_queue),
                    Arc::new(AtomicU64::new(0)),
                    failing_config,
                );
                run_worker(worker, &stop)
            });

            let err = failing.join().unwrap().unwrap_err();
            // Joining here only returns because the failing worker raised
            // the flag from its own thread.
            healthy.join().unwrap().unwrap();
            err
        });

        assert!(matches!(first_error, DatagenError::QueueClosed));
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn refuses_to_overwrite_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"already here").unwrap();

        let err = Generator::new(&path, 1, GenerationConfig::default()).unwrap_err();
        assert!(matches!(err, DatagenError::OutputExists(_)));
    }

    #[test]
    fn rejects_out_of_range_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");

        let err = Generator::new(&path, 0, GenerationConfig::default()).unwrap_err();
        assert!(matches!(err, DatagenError::InvalidConcurrency { .. }));

        let err = Generator::new(&path, num_cpus::get(), GenerationConfig::default()).unwrap_err();
        assert!(matches!(err, DatagenError::InvalidConcurrency { .. }));
    }
}
