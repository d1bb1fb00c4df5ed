use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::event_log::{EventLog, EventLogError};
use crate::read_store::ReadStore;

use super::cursor::{CursorError, CursorStore};
use super::fold::{CompanyProjection, ProjectionFoldError, PROJECTION_NAME};

/// Tuning knobs for the projector workers.
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Max events pulled from a shard per drain iteration.
    pub batch_size: usize,
    /// Idle sleep when the shard is fully drained.
    pub poll_interval: Duration,
    /// Initial sleep after a failed iteration; doubles per consecutive
    /// failure up to `max_backoff`.
    pub retry_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(250),
            retry_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProjectorError {
    #[error(transparent)]
    Fold(#[from] ProjectionFoldError),

    #[error("event log error: {0}")]
    Log(#[from] EventLogError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Store(#[from] crate::read_store::ReadStoreError),
}

/// Consumes one shard journal and folds it into the read store.
pub struct ShardProjector<L: EventLog, R: ReadStore, C: CursorStore> {
    log: L,
    fold: Arc<CompanyProjection<R>>,
    cursors: C,
    shard: u32,
    config: ProjectorConfig,
}

impl<L: EventLog, R: ReadStore, C: CursorStore> ShardProjector<L, R, C> {
    pub fn new(
        log: L,
        fold: Arc<CompanyProjection<R>>,
        cursors: C,
        shard: u32,
        config: ProjectorConfig,
    ) -> Self {
        Self {
            log,
            fold,
            cursors,
            shard,
            config,
        }
    }

    pub fn shard(&self) -> u32 {
        self.shard
    }

    /// Fold everything currently in the shard, advancing the cursor after
    /// each successful fold. Returns the number of events folded.
    ///
    /// The cursor moves only once the fold has completed, so a crash
    /// in between replays the event on restart (at-least-once).
    pub fn drain(&self) -> Result<usize, ProjectorError> {
        let mut folded = 0;

        loop {
            let cursor = self.cursors.load(PROJECTION_NAME, self.shard)?;
            let batch = self
                .log
                .read_shard(self.shard, cursor, self.config.batch_size)?;
            if batch.is_empty() {
                return Ok(folded);
            }

            for event in &batch {
                self.fold.apply(event)?;
                self.cursors
                    .advance(PROJECTION_NAME, self.shard, event.shard_position)?;
                folded += 1;
            }

            debug!(
                shard = self.shard,
                folded = batch.len(),
                "folded shard batch"
            );
        }
    }

    /// Poll-and-drain until a shutdown signal arrives.
    fn run_loop(&self, shutdown: mpsc::Receiver<()>) {
        let mut backoff = self.config.retry_backoff;

        loop {
            match self.drain() {
                Ok(_) => {
                    backoff = self.config.retry_backoff;
                    // Idle until the next poll, waking early on shutdown.
                    match shutdown.recv_timeout(self.config.poll_interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                    }
                }
                Err(err) => {
                    warn!(shard = self.shard, error = %err, "shard projector iteration failed");
                    match shutdown.recv_timeout(backoff) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }
    }
}

/// Handle to stop and join one projector thread.
#[derive(Debug)]
pub struct ProjectorHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ProjectorHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// One projector thread per shard, all folding into the same read store.
pub struct ProjectorPool {
    handles: Vec<ProjectorHandle>,
}

impl ProjectorPool {
    /// Prepare the read store and start one worker per shard.
    pub fn spawn<L, R, C>(
        log: L,
        store: R,
        cursors: C,
        config: ProjectorConfig,
    ) -> Result<Self, ProjectorError>
    where
        L: EventLog + Clone + Send + Sync + 'static,
        R: ReadStore + 'static,
        C: CursorStore + Clone + Send + Sync + 'static,
    {
        store.ensure_indexes()?;
        let fold = Arc::new(CompanyProjection::new(store));

        let mut handles = Vec::new();
        for shard in log.shards().all() {
            let projector = ShardProjector::new(
                log.clone(),
                Arc::clone(&fold),
                cursors.clone(),
                shard,
                config.clone(),
            );

            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
            let join = thread::Builder::new()
                .name(format!("company-projector-{shard}"))
                .spawn(move || projector.run_loop(shutdown_rx))
                .expect("failed to spawn shard projector thread");

            handles.push(ProjectorHandle {
                shutdown: shutdown_tx,
                join: Some(join),
            });
        }

        Ok(Self { handles })
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop every worker and wait for all of them.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown();
        }
    }
}
