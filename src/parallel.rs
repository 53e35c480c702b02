//! Bounded task execution with a sequential fallback.
//!
//! `n_jobs = 1` runs tasks inline on the caller's thread; larger values use
//! a bounded rayon pool when the `parallel` feature is enabled. Results
//! always come back in submission order, so sequential and parallel runs
//! aggregate identically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EmularError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Cooperative cancellation flag shared across tasks.
///
/// Tasks poll it between units of work; setting it never interrupts a task
/// already running.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of pending work.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
enum Mode {
    Sequential,
    #[cfg(feature = "parallel")]
    Pool(rayon::ThreadPool),
}

/// Executes batches of independent tasks with a fixed degree of parallelism.
#[derive(Debug)]
pub struct Executor {
    mode: Mode,
    n_threads: usize,
}

impl Executor {
    /// Builds an executor from an `n_jobs` knob.
    ///
    /// `1` is sequential, `-1` uses all available cores, `n > 1` uses a
    /// pool of exactly n threads. Without the `parallel` feature every
    /// valid value degrades to sequential execution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for `0` or any value below `-1`.
    pub fn from_n_jobs(n_jobs: i32) -> Result<Self> {
        let n_threads = match n_jobs {
            1 => return Ok(Self::sequential()),
            -1 => 0, // rayon resolves 0 to the number of cores
            n if n > 1 => n as usize,
            other => {
                return Err(EmularError::invalid_configuration(format!(
                    "n_jobs must be -1 or a positive integer, got {other}"
                )));
            }
        };
        Self::pooled(n_threads)
    }

    /// Inline execution on the caller's thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            mode: Mode::Sequential,
            n_threads: 1,
        }
    }

    #[cfg(feature = "parallel")]
    fn pooled(n_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| EmularError::invalid_configuration(format!("thread pool: {e}")))?;
        let n_threads = pool.current_num_threads();
        Ok(Self {
            mode: Mode::Pool(pool),
            n_threads,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn pooled(_n_threads: usize) -> Result<Self> {
        Ok(Self::sequential())
    }

    /// Worker thread count (1 when sequential).
    #[must_use]
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    #[must_use]
    pub fn is_sequential(&self) -> bool {
        matches!(self.mode, Mode::Sequential)
    }

    /// Runs every task and returns results in submission order.
    pub fn run<T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.mode {
            Mode::Sequential => tasks.into_iter().map(|task| task()).collect(),
            #[cfg(feature = "parallel")]
            Mode::Pool(pool) => {
                pool.install(|| tasks.into_par_iter().map(|task| task()).collect())
            }
        }
    }
}
