use std::path::PathBuf;

/// Address the binary binds to when none is given.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8000";

/// Dataset file read at startup when none is given.
pub const DEFAULT_DATASET_PATH: &str = "q-vercel-latency.json";

/// Largest request body accepted by `POST /api/latency` (bytes).
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Percentile reported as `p95_latency`.
pub const LATENCY_PERCENTILE: f64 = 0.95;

/// What to do when the dataset cannot be read or parsed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetPolicy {
    /// Abort startup with the load error.
    #[default]
    FailFast,
    /// Log the error and serve an empty dataset; every region then reports zeros.
    EmptyOnError,
}

/// Where the dataset comes from and how load failures are handled.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub policy: DatasetPolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATASET_PATH),
            policy: DatasetPolicy::default(),
        }
    }
}
