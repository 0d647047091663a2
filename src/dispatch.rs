//! Fan-out/fan-in of source calls for one compound.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::domain::SourceName;
use crate::error::BuilderError;
use crate::sources::{SourceOutcome, SourceRequest, SourceSet};

pub struct TaskDispatcher {
    workers: usize,
    sources: SourceSet,
    deadline: Duration,
}

impl TaskDispatcher {
    /// `workers == 1` runs sources one after another.
    pub fn new(sources: SourceSet, workers: usize, deadline: Duration) -> Result<Self, BuilderError> {
        if workers == 0 {
            return Err(BuilderError::Pool("worker pool needs at least one thread".to_string()));
        }
        Ok(Self {
            workers,
            sources,
            deadline,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    // One pool per compound. Dropping it detaches threads still stuck in a
    // call that missed the deadline, so they never delay the next compound.
    fn build_pool(&self) -> Result<ThreadPool, BuilderError> {
        ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("source-worker-{index}"))
            .panic_handler(|_| tracing::error!("source worker panicked"))
            .build()
            .map_err(|err| BuilderError::Pool(err.to_string()))
    }

    /// Returns one outcome per known source, in no particular order.
    ///
    /// Disabled or unregistered sources get an empty outcome without a call.
    /// Blocks until every spawned call has reported or the deadline has
    /// passed; calls still running then are reported as timed out, the
    /// request's cancel flag is raised and their late results are dropped.
    pub fn run(
        &self,
        request: Arc<SourceRequest>,
        enabled: &BTreeSet<SourceName>,
    ) -> Vec<SourceOutcome> {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel();
        let mut outcomes = Vec::with_capacity(SourceName::ALL.len());
        let mut pending = BTreeSet::new();

        let pool = match self.build_pool() {
            Ok(pool) => Some(pool),
            Err(err) => {
                tracing::error!(compound = %request.compound_id, error = %err, "no worker pool");
                None
            }
        };

        for source in SourceName::ALL {
            if !enabled.contains(&source) {
                outcomes.push(SourceOutcome::disabled(source));
                continue;
            }
            let Some(pool) = pool.as_ref() else {
                outcomes.push(SourceOutcome::failed(
                    source,
                    "worker pool unavailable",
                    started.elapsed(),
                ));
                continue;
            };
            let Some(client) = self.sources.get(source) else {
                tracing::warn!(%source, "source enabled but no client registered");
                outcomes.push(SourceOutcome::disabled(source));
                continue;
            };
            pending.insert(source);
            let tx = tx.clone();
            let request = Arc::clone(&request);
            pool.spawn(move || {
                if request.cancel.is_cancelled() {
                    return;
                }
                let call_started = Instant::now();
                let result = client.fetch(&request);
                // The receiver is gone once the deadline has passed.
                let _ = tx.send((source, result, call_started.elapsed()));
            });
        }
        drop(tx);

        let deadline = started + self.deadline;
        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((source, result, elapsed)) => {
                    pending.remove(&source);
                    outcomes.push(SourceOutcome::from_result(source, result, elapsed));
                }
                Err(RecvTimeoutError::Timeout) => {
                    request.cancel.cancel();
                    for source in std::mem::take(&mut pending).into_iter() {
                        tracing::warn!(
                            %source,
                            compound = %request.compound_id,
                            deadline_secs = self.deadline.as_secs_f64(),
                            "source missed the compound deadline"
                        );
                        outcomes.push(SourceOutcome::timed_out(source, started.elapsed()));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for source in std::mem::take(&mut pending).into_iter() {
                        outcomes.push(SourceOutcome::failed(
                            source,
                            "worker exited without a result",
                            started.elapsed(),
                        ));
                    }
                }
            }
        }
        outcomes
    }
}
