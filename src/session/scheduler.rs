//! Debounced background validation
//!
//! Jobs are keyed (usually by document path). Scheduling a job replaces any
//! job for the same key that has not started yet and restarts its debounce
//! delay, so a burst of edits costs one pass. Jobs that already started are
//! left to finish. Due jobs run on the rayon pool; a single timer thread does
//! the bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::Config;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queued {
    due: Instant,
    job: Job,
}

#[derive(Default)]
struct State {
    queued: HashMap<String, Queued>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    wake: Condvar,
    running: AtomicUsize,
}

/// Debouncing job scheduler
pub struct ValidationScheduler {
    debounce: Duration,
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ValidationScheduler {
    pub fn new(debounce: Duration) -> Self {
        let shared = Arc::new(Shared::default());
        let timer = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("xmledit-scheduler".into())
                .spawn(move || run_timer(&shared))
                .map_err(|e| tracing::error!(error = %e, "scheduler thread failed to start"))
                .ok()
        };
        Self {
            debounce,
            shared,
            timer: Mutex::new(timer),
        }
    }

    /// Scheduler using the configured debounce delay
    pub fn from_config(config: &Config) -> Self {
        Self::new(Duration::from_millis(config.debounce_ms))
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Queue `job` under `key` after the debounce delay.
    ///
    /// Returns true if a queued job for the same key was replaced.
    pub fn schedule<F>(&self, key: impl Into<String>, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.into();
        let mut state = self.shared.state.lock();
        if state.shutdown {
            tracing::debug!(%key, "scheduler shut down, job dropped");
            return false;
        }
        let queued = Queued {
            due: Instant::now() + self.debounce,
            job: Box::new(job),
        };
        let replaced = state.queued.insert(key.clone(), queued).is_some();
        if replaced {
            tracing::debug!(%key, "queued validation replaced");
        }
        self.shared.wake.notify_one();
        replaced
    }

    /// Drop every job that has not started. Returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.shared.state.lock();
        let dropped = state.queued.len();
        state.queued.clear();
        dropped
    }

    /// Jobs waiting for their delay to expire
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queued.len()
    }

    /// Jobs currently executing
    pub fn running(&self) -> usize {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Stop the timer. Queued jobs are dropped, running ones finish.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.queued.clear();
        }
        self.shared.wake.notify_all();
        if let Some(timer) = self.timer.lock().take() {
            if timer.join().is_err() {
                tracing::error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for ValidationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ValidationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationScheduler")
            .field("debounce", &self.debounce)
            .field("pending", &self.pending())
            .field("running", &self.running())
            .finish()
    }
}

fn run_timer(shared: &Arc<Shared>) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }

        let now = Instant::now();
        let due: Vec<String> = state
            .queued
            .iter()
            .filter(|(_, q)| q.due <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in due {
            if let Some(queued) = state.queued.remove(&key) {
                shared.running.fetch_add(1, Ordering::AcqRel);
                let shared = Arc::clone(shared);
                rayon::spawn(move || {
                    (queued.job)();
                    shared.running.fetch_sub(1, Ordering::AcqRel);
                });
            }
        }

        match state.queued.values().map(|q| q.due).min() {
            Some(next) => {
                shared.wake.wait_until(&mut state, next);
            }
            None => shared.wake.wait(&mut state),
        }
    }
}
