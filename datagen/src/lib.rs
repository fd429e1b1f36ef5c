pub mod config;
pub mod error;
pub mod generator;
pub mod queue;
pub mod record;
pub mod worker;
pub mod writer;

pub use config::GenerationConfig;
pub use error::DatagenError;
pub use generator::Generator;
pub use record::{RecordError, TrainingRecord, Wdl, RECORD_SIZE};
