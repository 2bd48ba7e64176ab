pub mod artifacts;
pub mod checkpoint;
pub mod data_loader;
pub mod inference;
pub mod loss;
pub mod metrics;
pub mod optimizer;
pub mod session;
pub mod tester;
pub mod trainer;

pub use self::checkpoint::{CheckpointStore, LoadOutcome, ModelState};
pub use self::data_loader::{Batch, BatchLoader};
pub use self::inference::InferenceReport;
pub use self::metrics::{EpochRecord, MetricsHistory, ScalarLogger};
pub use self::session::{Evaluation, Session};
pub use self::tester::{ImageScore, TestReport};
pub use self::trainer::{Trainer, TrainingReport};
