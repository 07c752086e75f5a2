//! Worker pool configuration
//!
//! Cubes are processed one task per file on Rayon's global thread pool. This
//! module sizes that pool and reports what the machine offers.

use crate::errors::{HydError, Result};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// Pool size; `None` leaves Rayon's default (one thread per core)
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Set up the global Rayon thread pool
    ///
    /// # Errors
    ///
    /// Returns [`HydError::ThreadPool`] for a zero thread count or when the
    /// global pool was already initialised.
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(HydError::ThreadPool(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .thread_name(|i| format!("hydresgeo-worker-{i}"))
                    .build_global()
                    .map_err(|e| {
                        HydError::ThreadPool(format!(
                            "failed to initialise thread pool with {num_threads} threads: {e}"
                        ))
                    })?;
                log::info!("processing cubes on {num_threads} threads");
                Ok(())
            }
            None => {
                log::info!(
                    "processing cubes on the default pool ({} threads)",
                    rayon::current_num_threads()
                );
                Ok(())
            }
        }
    }

    /// Number of threads in the current pool
    #[must_use]
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

/// Get information about the current parallel configuration
#[must_use]
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

impl ParallelInfo {
    /// Log the pool and machine sizes at debug level
    pub fn log(&self) {
        log::debug!(
            "threads: {} in pool, {} CPU cores, {} available parallelism",
            self.current_threads,
            self.available_cores,
            self.available_parallelism
        );
    }
}
