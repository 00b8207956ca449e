//! Engine worker pool for deadline-enforced per-file analysis.
//!
//! Orchestration is sequential, but each file's engine invocation runs on an
//! isolated worker thread so the orchestrator can stop waiting when the
//! per-file deadline passes. The pool is created once per run and reused
//! across files; workers are only spawned when none are idle.
//!
//! The engine is not cancellation-aware: a worker whose deadline passed is
//! abandoned, and its in-flight invocation keeps running until it finishes
//! or the process exits. The circuit breaker bounds how many such workers a
//! run can leak.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::{debug, warn};

use cfmlint_engine::{AnalysisEngine, EngineError};

/// Result of one deadline-bounded scan.
pub enum ScanOutcome {
    /// The engine finished within the deadline (successfully or not).
    Completed(Result<String, EngineError>),
    /// The deadline passed; the worker was abandoned.
    DeadlineExceeded,
}

struct Worker {
    jobs: Sender<PathBuf>,
    results: Receiver<Result<String, EngineError>>,
    thread: JoinHandle<()>,
}

/// Reusable pool of engine worker threads.
pub struct EngineWorkerPool {
    engine: Arc<dyn AnalysisEngine>,
    idle: Vec<Worker>,
    spawned: usize,
    abandoned: usize,
}

impl EngineWorkerPool {
    pub fn new(engine: Arc<dyn AnalysisEngine>) -> Self {
        Self {
            engine,
            idle: Vec::new(),
            spawned: 0,
            abandoned: 0,
        }
    }

    fn spawn_worker(&mut self) -> Worker {
        self.spawned += 1;
        let id = self.spawned;
        debug!(worker = id, "spawning engine worker");

        let (job_tx, job_rx) = bounded::<PathBuf>(1);
        let (result_tx, result_rx) = bounded(1);
        let engine = Arc::clone(&self.engine);

        let thread = std::thread::spawn(move || {
            while let Ok(path) = job_rx.recv() {
                let result = engine.scan(std::slice::from_ref(&path));
                if result_tx.send(result).is_err() {
                    // Lease abandoned while we were scanning; nothing left
                    // to deliver to.
                    break;
                }
            }
        });

        Worker {
            jobs: job_tx,
            results: result_rx,
            thread,
        }
    }

    /// Scans one file, waiting at most `deadline` for the engine.
    ///
    /// On timeout the worker is abandoned (not joined) and a fresh worker
    /// will be spawned for the next file.
    pub fn scan_with_deadline(&mut self, path: &Path, deadline: Duration) -> ScanOutcome {
        // Two attempts: a pooled worker may have died since it was parked.
        for _ in 0..2 {
            let worker = match self.idle.pop() {
                Some(worker) => worker,
                None => self.spawn_worker(),
            };

            if worker.jobs.send(path.to_path_buf()).is_err() {
                warn!("pooled engine worker was dead, replacing it");
                continue;
            }

            return match worker.results.recv_timeout(deadline) {
                Ok(result) => {
                    self.idle.push(worker);
                    ScanOutcome::Completed(result)
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Dropping the handles detaches the thread; it exits on
                    // its own once the hung invocation returns.
                    self.abandoned += 1;
                    drop(worker.jobs);
                    drop(worker.results);
                    drop(worker.thread);
                    ScanOutcome::DeadlineExceeded
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.abandoned += 1;
                    ScanOutcome::Completed(Err(EngineError::Output(
                        "engine worker terminated unexpectedly".to_string(),
                    )))
                }
            };
        }

        ScanOutcome::Completed(Err(EngineError::Output(
            "could not hand file to an engine worker".to_string(),
        )))
    }

    /// Workers currently parked and reusable.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Workers abandoned after a missed deadline.
    pub fn abandoned_count(&self) -> usize {
        self.abandoned
    }
}

impl Drop for EngineWorkerPool {
    /// Deterministic teardown: closing each idle worker's job channel makes
    /// its thread exit, and idle threads are joined. Abandoned workers were
    /// already detached and cannot be waited for.
    fn drop(&mut self) {
        for worker in self.idle.drain(..) {
            drop(worker.jobs);
            drop(worker.results);
            if worker.thread.join().is_err() {
                warn!("engine worker panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowEngine {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl AnalysisEngine for SlowEngine {
        fn scan(&self, _files: &[PathBuf]) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok("<issues version=\"1.0\"></issues>".to_string())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_fast_scan_completes_and_worker_is_reused() {
        let engine = Arc::new(SlowEngine {
            delay: Duration::from_millis(1),
            calls: AtomicUsize::new(0),
        });
        let mut pool = EngineWorkerPool::new(engine);

        for _ in 0..3 {
            match pool.scan_with_deadline(Path::new("a.cfm"), Duration::from_secs(5)) {
                ScanOutcome::Completed(Ok(report)) => assert!(report.contains("issues")),
                _ => panic!("expected completion"),
            }
        }

        // One worker handled all three files.
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.abandoned_count(), 0);
    }

    #[test]
    fn test_deadline_abandons_worker_and_pool_recovers() {
        let engine = Arc::new(SlowEngine {
            delay: Duration::from_millis(300),
            calls: AtomicUsize::new(0),
        });
        let mut pool = EngineWorkerPool::new(engine);

        match pool.scan_with_deadline(Path::new("slow.cfm"), Duration::from_millis(20)) {
            ScanOutcome::DeadlineExceeded => {}
            _ => panic!("expected deadline"),
        }
        assert_eq!(pool.abandoned_count(), 1);
        assert_eq!(pool.idle_count(), 0);

        // The next scan gets a fresh worker and completes.
        match pool.scan_with_deadline(Path::new("ok.cfm"), Duration::from_secs(5)) {
            ScanOutcome::Completed(Ok(_)) => {}
            _ => panic!("expected completion"),
        }
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_drop_joins_idle_workers() {
        let engine = Arc::new(SlowEngine {
            delay: Duration::from_millis(1),
            calls: AtomicUsize::new(0),
        });
        let mut pool = EngineWorkerPool::new(engine);
        let _ = pool.scan_with_deadline(Path::new("a.cfm"), Duration::from_secs(5));
        drop(pool); // must not hang
    }
}
