//! Randomized driver: mutator tasks change a shared store and notify its
//! `MedianState`, while a background auditor keeps verifying it.

use std::fmt::{Display, Formatter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use median_state::{measure_time, MedianState, Pivot, SortedMultiset, SortedValues};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{oneshot, Mutex};
use tokio::task;
use tokio::time::interval;

use crate::backend::Backend;
use crate::config::{BackendKind, DriverConfig};
use crate::error::DriverError;

/// The store and its state live behind one lock, so a mutation and its
/// notification always happen in the same critical section.
pub type Shared<B> = Arc<Mutex<MedianState<B>>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation {
    Added(f64),
    Removed { value: f64, index: usize },
}

impl Display for Mutation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::Added(value) => write!(f, "ADD: {value:02}"),
            Mutation::Removed { value, index } => write!(f, "DEL: {value:02} @ {index:02}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub mutations: u64,
    pub audits: u64,
    pub size: u64,
    pub median: Option<f64>,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} mutations, {} background audits, {} values",
            self.mutations, self.audits, self.size
        )?;
        match self.median {
            Some(median) => write!(f, ", median {median}"),
            None => write!(f, ", no median"),
        }
    }
}

/// Applies one random add or remove to the store and notifies the state.
///
/// Adds are only tried below `max_size` and removes only on a non-empty
/// store; each is attempted with probability one half until one happens.
pub fn mutate<B: Backend, R: Rng>(
    state: &mut MedianState<B>,
    rng: &mut R,
    config: &DriverConfig,
) -> Result<Mutation, DriverError> {
    loop {
        if state.view().len() < config.max_size && rng.gen_bool(0.5) {
            let value = f64::from(rng.gen_range(0..config.max_value));
            state.view_mut().insert(value)?;
            state.after_add(value)?;
            return Ok(Mutation::Added(value));
        }
        let len = state.view().len();
        if len > 0 && rng.gen_bool(0.5) {
            let index = rng.gen_range(0..len);
            if let Some(value) = state.view_mut().remove_nth(index) {
                state.after_remove(value)?;
                return Ok(Mutation::Removed { value, index });
            }
        }
    }
}

/// Renders the values in order, marking `lo` with `<`, `hi` with `|` and the
/// value after `hi` with `>`. A trailing `]` means the last value equals `hi`.
pub fn render_window<B: Backend>(state: &MedianState<B>) -> String {
    let (Ok(index_lo), Ok(index_hi)) = (state.index_lo(), state.index_hi()) else {
        return String::new();
    };
    let mut line = String::new();
    let mut last = None;
    for (index, value) in (0u64..).zip(state.view().upward(Pivot::Min)) {
        let marker = if index == index_lo {
            '<'
        } else if index == index_hi {
            '|'
        } else if index == index_hi + 1 {
            '>'
        } else {
            ' '
        };
        let _ = write!(line, "{marker}{value:02}");
        last = Some(value);
    }
    if last == Some(state.hi()) {
        line.push(']');
    }
    line
}

fn claim(budget: &AtomicU64) -> bool {
    budget
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
        .is_ok()
}

async fn worker<B: Backend>(
    id: usize,
    shared: Shared<B>,
    config: Arc<DriverConfig>,
    budget: Arc<AtomicU64>,
) -> Result<u64, DriverError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
        None => StdRng::from_entropy(),
    };
    let mut applied = 0;
    while claim(&budget) {
        let mut state = shared.lock().await;
        let step = mutate(&mut *state, &mut rng, &config).and_then(|mutation| {
            if config.verify_each_step {
                state.verify()?;
            }
            Ok(mutation)
        });
        let mutation = match step {
            Ok(mutation) => mutation,
            Err(error) => {
                budget.store(0, Ordering::Release);
                tracing::error!(worker = id, %error, state = %*state, "Mutation left the median state inconsistent");
                return Err(error);
            }
        };
        tracing::debug!(worker = id, %mutation, state = %*state, "Applied mutation");
        tracing::trace!(window = %render_window(&*state));
        drop(state);
        applied += 1;
        task::yield_now().await;
    }
    tracing::debug!(worker = id, applied, "Worker finished");
    Ok(applied)
}

async fn auditor<B: Backend>(
    mut shutdown_signal: oneshot::Receiver<()>,
    shared: Shared<B>,
    period: Duration,
) -> Result<u64, DriverError> {
    let mut interval = interval(period);
    let mut audits = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let state = shared.lock().await;
                if let Err(error) = state.verify() {
                    tracing::error!(%error, state = %*state, "Background audit failed");
                    return Err(error.into());
                }
                audits += 1;
            }
            _ = &mut shutdown_signal => {
                tracing::debug!(audits, "Auditor received shutdown signal");
                break;
            }
        }
    }
    Ok(audits)
}

pub async fn run(config: DriverConfig) -> Result<Summary, DriverError> {
    match config.backend {
        BackendKind::Vec => run_with(config, SortedValues::new()).await,
        BackendKind::Tree => run_with(config, SortedMultiset::new()).await,
    }
}

pub async fn run_with<B: Backend>(
    config: DriverConfig,
    backend: B,
) -> Result<Summary, DriverError> {
    let config = Arc::new(config);
    let shared: Shared<B> = Arc::new(Mutex::new(MedianState::new(backend)));
    let budget = Arc::new(AtomicU64::new(config.max_iterations));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let audit_handle = task::spawn(auditor(
        shutdown_rx,
        shared.clone(),
        Duration::from_millis(config.audit_interval_ms),
    ));
    let workers: Vec<_> = (0..config.workers)
        .map(|id| task::spawn(worker(id, shared.clone(), config.clone(), budget.clone())))
        .collect();
    tracing::info!(workers = workers.len(), backend = ?config.backend, "Started mutators");

    let mut mutations = 0;
    let mut failure = None;
    for handle in workers {
        match handle.await? {
            Ok(applied) => mutations += applied,
            Err(error) => {
                failure.get_or_insert(error);
            }
        }
    }
    // the auditor may already have stopped on its own error
    let _ = shutdown_tx.send(());
    let audits = audit_handle.await??;
    if let Some(error) = failure {
        return Err(error);
    }

    let state = shared.lock().await;
    let (audit, duration) = measure_time!("final audit", { state.verify() });
    audit?;
    let summary = Summary {
        mutations,
        audits,
        size: state.size(),
        median: state.median().ok(),
    };
    tracing::info!(%summary, state = %*state, ?duration, "Final audit passed");
    Ok(summary)
}
