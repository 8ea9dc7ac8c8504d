//! Time-boxed queue drain.
//!
//! A drain opens one receive session, pulls for a fixed window and hands
//! every message to its own task. Handlers decode the payload and ack or
//! nack it. When the window closes (or the caller cancels) pulling stops,
//! every handler is awaited and the session is closed, so nothing runs
//! after `drain` returns. The decoded tickets come back sorted by the
//! `priority` attribute, arrival order breaking ties.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broker::{InboundMessage, MessageSource, ReceiveSession, Reply};
use crate::metrics;
use crate::ticket::{rank, Ticket, PRIORITY_ATTRIBUTE};

use super::config::DrainConfig;
use super::types::{DrainBatch, DrainError, DrainStats};

/// How handlers reply to messages during one drain.
#[derive(Debug, Clone, Copy)]
struct ReplyPolicy {
    auto_ack: bool,
    max_delivery_attempts: u32,
}

#[derive(Debug, Default)]
struct Counters {
    acked: AtomicUsize,
    nacked: AtomicUsize,
    decode_failures: AtomicUsize,
    dead_lettered: AtomicUsize,
    reply_failures: AtomicUsize,
}

/// A decoded ticket with its sort key.
struct Collected {
    rank: u8,
    arrival: u64,
    ticket: Ticket,
}

enum Wake {
    Continue,
    Expired,
    Cancelled,
}

/// Drains the ticket subscription.
#[derive(Clone)]
pub struct QueueDrainer {
    source: Arc<dyn MessageSource>,
    config: DrainConfig,
}

impl QueueDrainer {
    pub fn new(source: Arc<dyn MessageSource>, config: DrainConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &DrainConfig {
        &self.config
    }

    /// Receive for `max_duration`, then return the decoded tickets in
    /// priority order.
    ///
    /// With `auto_ack = false` every message is nacked (inspection only).
    /// Firing `cancel` ends the window early; the shutdown sequence is the
    /// same. Only failing to open the session is an error.
    pub async fn drain(
        &self,
        max_duration: Duration,
        auto_ack: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<DrainBatch, DrainError> {
        let started = Instant::now();
        let session = self.source.open_session().await.inspect_err(|e| {
            error!(broker = self.source.name(), error = %e, "Failed to open receive session");
        })?;

        let deadline = tokio::time::Instant::now() + max_duration;
        let cancel = cancel.cloned().unwrap_or_default();
        let policy = ReplyPolicy {
            auto_ack,
            max_delivery_attempts: self.config.max_delivery_attempts,
        };
        let collected: Arc<Mutex<Vec<Collected>>> = Arc::new(Mutex::new(Vec::new()));
        let counters = Arc::new(Counters::default());

        let mut handlers = JoinSet::new();
        let mut received: u64 = 0;
        let mut cancelled = false;

        debug!(
            broker = self.source.name(),
            window_ms = max_duration.as_millis() as u64,
            auto_ack,
            "Drain started"
        );

        loop {
            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => break,
                pulled = session.pull(self.config.max_messages_per_pull) => pulled,
            };

            let wait = match pulled {
                Ok(messages) if !messages.is_empty() => {
                    for message in messages {
                        received += 1;
                        handlers.spawn(handle_message(
                            Arc::clone(&session),
                            message,
                            received,
                            policy,
                            Arc::clone(&collected),
                            Arc::clone(&counters),
                        ));
                    }
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Pull failed during drain");
                    true
                }
            };

            while let Some(result) = handlers.try_join_next() {
                log_handler_result(result);
            }

            if wait {
                match wait_idle(deadline, &cancel, self.config.idle_poll()).await {
                    Wake::Continue => {}
                    Wake::Expired => break,
                    Wake::Cancelled => {
                        cancelled = true;
                        break;
                    }
                }
            }
        }

        // Quiesce: no handler may outlive the drain.
        while let Some(result) = handlers.join_next().await {
            log_handler_result(result);
        }
        session.stop().await;

        let mut collected = std::mem::take(&mut *collected.lock().unwrap());
        collected.sort_by_key(|c| (c.rank, c.arrival));
        let tickets: Vec<Ticket> = collected.into_iter().map(|c| c.ticket).collect();

        let elapsed = started.elapsed();
        let stats = DrainStats {
            received: received as usize,
            acked: counters.acked.load(Ordering::SeqCst),
            nacked: counters.nacked.load(Ordering::SeqCst),
            decode_failures: counters.decode_failures.load(Ordering::SeqCst),
            dead_lettered: counters.dead_lettered.load(Ordering::SeqCst),
            reply_failures: counters.reply_failures.load(Ordering::SeqCst),
            cancelled,
            elapsed_ms: elapsed.as_millis() as u64,
        };

        metrics::DRAIN_DURATION
            .with_label_values(&[if cancelled { "cancelled" } else { "completed" }])
            .observe(elapsed.as_secs_f64());

        info!(
            received = stats.received,
            decoded = tickets.len(),
            acked = stats.acked,
            nacked = stats.nacked,
            dead_lettered = stats.dead_lettered,
            cancelled,
            elapsed_ms = stats.elapsed_ms,
            "Drain finished"
        );

        Ok(DrainBatch { tickets, stats })
    }
}

async fn wait_idle(
    deadline: tokio::time::Instant,
    cancel: &CancellationToken,
    idle: Duration,
) -> Wake {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Wake::Cancelled,
        _ = tokio::time::sleep_until(deadline) => Wake::Expired,
        _ = tokio::time::sleep(idle) => Wake::Continue,
    }
}

fn log_handler_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Drain handler task failed");
    }
}

async fn handle_message(
    session: Arc<dyn ReceiveSession>,
    message: InboundMessage,
    arrival: u64,
    policy: ReplyPolicy,
    collected: Arc<Mutex<Vec<Collected>>>,
    counters: Arc<Counters>,
) {
    let mut dead_letter = false;

    let reply = match Ticket::from_payload(&message.payload) {
        Ok(ticket) => {
            collected.lock().unwrap().push(Collected {
                rank: rank(message.attribute(PRIORITY_ATTRIBUTE)),
                arrival,
                ticket,
            });
            if policy.auto_ack {
                Reply::Ack
            } else {
                Reply::Nack
            }
        }
        Err(e) => {
            counters.decode_failures.fetch_add(1, Ordering::SeqCst);
            metrics::DECODE_FAILURES.inc();

            dead_letter = policy.auto_ack
                && policy.max_delivery_attempts > 0
                && message.delivery_attempt >= policy.max_delivery_attempts;

            if dead_letter {
                error!(
                    message_id = %message.message_id,
                    delivery_attempt = message.delivery_attempt,
                    payload = %String::from_utf8_lossy(&message.payload),
                    error = %e,
                    "Dead-lettering undecodable message"
                );
                Reply::Ack
            } else {
                warn!(
                    message_id = %message.message_id,
                    delivery_attempt = message.delivery_attempt,
                    error = %e,
                    "Failed to decode ticket, nacking"
                );
                Reply::Nack
            }
        }
    };

    if let Err(e) = session.reply(&message.ack_id, reply).await {
        counters.reply_failures.fetch_add(1, Ordering::SeqCst);
        warn!(message_id = %message.message_id, ?reply, error = %e, "Failed to reply to message");
        return;
    }

    let outcome = match (reply, dead_letter) {
        (Reply::Ack, true) => {
            counters.acked.fetch_add(1, Ordering::SeqCst);
            counters.dead_lettered.fetch_add(1, Ordering::SeqCst);
            "dead_lettered"
        }
        (Reply::Ack, false) => {
            counters.acked.fetch_add(1, Ordering::SeqCst);
            "acked"
        }
        (Reply::Nack, _) => {
            counters.nacked.fetch_add(1, Ordering::SeqCst);
            "nacked"
        }
    };
    metrics::DRAINED_MESSAGES.with_label_values(&[outcome]).inc();
}
