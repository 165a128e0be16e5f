use super::error::EngineError;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::error;

/// A fixed-size pool of workers that run one body per worker state.
///
/// Each call to [`ParallelTeam::execute`] is a barrier: it returns only once
/// every worker has finished. A worker owns its state exclusively for the
/// duration of the call, so bodies never need locks.
pub struct ParallelTeam {
    pool: ThreadPool,
    threads: usize,
}

impl std::fmt::Debug for ParallelTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelTeam")
            .field("threads", &self.threads)
            .finish()
    }
}

impl ParallelTeam {
    pub fn new(threads: usize) -> Result<Self, EngineError> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("halgren-worker-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `f` inside the pool, so nested rayon iterators use its workers.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }

    /// Runs `body(thread, state)` once per entry of `workers` and waits for all.
    ///
    /// A panic inside a body is caught and reported as
    /// [`EngineError::WorkerFailed`]. When several workers fail, the error of
    /// the lowest thread index is returned.
    pub fn execute<W, F>(&self, workers: &mut [W], body: F) -> Result<(), EngineError>
    where
        W: Send,
        F: Fn(usize, &mut W) -> Result<(), EngineError> + Sync,
    {
        let outcomes: Vec<Result<(), EngineError>> = self.pool.install(|| {
            workers
                .par_iter_mut()
                .enumerate()
                .map(|(thread, state)| {
                    let outcome = match catch_unwind(AssertUnwindSafe(|| body(thread, state))) {
                        Ok(outcome) => outcome,
                        Err(payload) => Err(EngineError::WorkerFailed {
                            thread,
                            message: panic_message(payload.as_ref()),
                        }),
                    };
                    if let Err(e) = &outcome {
                        error!(thread, error = %e, "Worker failed during parallel region.");
                    }
                    outcome
                })
                .collect()
        });
        outcomes.into_iter().collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
