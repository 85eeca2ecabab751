pub mod combined;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod stats;
pub mod window;

pub use combined::{run_all, CombinedReport};
pub use engine::{RunOptions, SequentialSyncer};
pub use error::SyncError;
pub use stats::RunStats;
