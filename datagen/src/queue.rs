use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Mutex;

use crate::error::DatagenError;
use crate::record::TrainingRecord;

/// Bounded multi-producer queue between the generation workers and the
/// single writer.
///
/// Sends block once `capacity` records are in flight, throttling producers
/// to the writer's drain rate. A whole game's worth of records is pushed
/// under one coarse lock so batches from different workers never interleave;
/// games finish rarely enough that the lock is uncontended in practice.
///
/// There is no explicit close: dropping every queue handle disconnects the
/// channel, and the consumer's `recv` error is the end-of-stream sentinel.
pub struct RecordQueue {
    tx: Mutex<SyncSender<TrainingRecord>>,
}

impl RecordQueue {
    pub fn bounded(capacity: usize) -> (Self, Receiver<TrainingRecord>) {
        let (tx, rx) = sync_channel(capacity);
        (Self { tx: Mutex::new(tx) }, rx)
    }

    /// Enqueue one game's records as an atomic batch. Returns the number of
    /// records pushed, or an error if the consumer is gone.
    pub fn push_batch(
        &self,
        records: impl IntoIterator<Item = TrainingRecord>,
    ) -> Result<u64, DatagenError> {
        let tx = self.tx.lock().unwrap();

        let mut pushed = 0;
        for record in records {
            tx.send(record).map_err(|_| DatagenError::QueueClosed)?;
            pushed += 1;
        }

        Ok(pushed)
    }
}
