use std::io::{BufWriter, Write};
use std::sync::mpsc::Receiver;

use crate::record::TrainingRecord;

/// Drain the record queue into `out`, one fixed-size record at a time, in
/// arrival order.
///
/// Returns the number of records written once the queue is closed and
/// empty. An I/O failure propagates immediately and is fatal for the run;
/// there is no retry.
pub fn run<W: Write>(rx: Receiver<TrainingRecord>, out: W) -> std::io::Result<u64> {
    let mut out = BufWriter::new(out);
    let mut written = 0u64;

    while let Ok(record) = rx.recv() {
        out.write_all(&record.to_bytes())?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}
