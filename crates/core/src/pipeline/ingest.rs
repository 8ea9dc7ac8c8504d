//! Background ingest loop.
//!
//! Runs a refresh, sleeps for the poll interval, repeats. Stopping cancels
//! the drain in progress (it still shuts down cleanly and reconciles what it
//! acknowledged) and waits for the task to exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::IngestConfig;
use super::service::TicketPipeline;
use super::types::IngestStatus;

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically refreshes the open-ticket cache from the broker.
pub struct IngestLoop {
    pipeline: Arc<TicketPipeline>,
    config: IngestConfig,
    running: Arc<AtomicBool>,
    status: Arc<RwLock<IngestStatus>>,
    task: Mutex<Option<RunningTask>>,
}

impl IngestLoop {
    pub fn new(pipeline: Arc<TicketPipeline>, config: IngestConfig) -> Self {
        Self {
            pipeline,
            config,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(IngestStatus::default())),
            task: Mutex::new(None),
        }
    }

    /// Start the loop. Returns false if it was already running.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Ingest loop already running");
            return false;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting ingest loop"
        );

        let cancel = CancellationToken::new();
        let handle = self.spawn_loop(cancel.clone());
        *task = Some(RunningTask { cancel, handle });
        true
    }

    /// Stop the loop and wait for it to exit. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let mut task = self.task.lock().await;
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Ingest loop not running");
            return false;
        }

        info!("Stopping ingest loop");
        if let Some(RunningTask { cancel, handle }) = task.take() {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Ingest loop task ended abnormally");
            }
        }
        info!("Ingest loop stopped");
        true
    }

    /// Current loop status.
    pub async fn status(&self) -> IngestStatus {
        let mut status = self.status.read().await.clone();
        status.running = self.running.load(Ordering::SeqCst);
        status
    }

    fn spawn_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let status = Arc::clone(&self.status);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        tokio::spawn(async move {
            info!("Ingest loop started");
            loop {
                let result = pipeline.refresh(Some(&cancel)).await;

                {
                    let mut status = status.write().await;
                    status.total_runs += 1;
                    status.last_run_at = Some(Utc::now());
                    match &result {
                        Ok(report) => {
                            status.total_admitted += report.admitted.len() as u64;
                            status.last_admitted = Some(report.admitted.len());
                            status.last_error = None;
                        }
                        Err(e) => {
                            warn!(error = %e, "Ingest refresh failed");
                            status.last_admitted = None;
                            status.last_error = Some(e.to_string());
                        }
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Ingest loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            info!("Ingest loop exited");
        })
    }
}
