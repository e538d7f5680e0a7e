//! Thread-pool configuration for element-wise data processing
//!
//! Reformatting and the processing functions rescale whole variables
//! element-wise through Rayon; this module lets the CLI size the global
//! pool before any of that work starts.

use crate::errors::{Result, SweepVisError};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel element-wise processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Use every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Set up the global Rayon thread pool. A `None` thread count leaves
    /// the default pool untouched.
    pub fn setup_global_pool(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    SweepVisError::ThreadPoolError(format!(
                        "Failed to initialize thread pool with {} threads: {}",
                        num_threads, e
                    ))
                })?;
        }
        Ok(())
    }

    /// Threads the current pool actually runs with
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}
