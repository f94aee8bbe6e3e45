//! The receive, log, delete loop.
//!
//! Each cycle long-polls the queue for a batch, writes maillog lines for every message that
//! decodes, and batch-deletes exactly those messages. Messages that fail to decode stay on the
//! queue and reappear once their visibility timeout lapses. Nothing is retried within a cycle and
//! no error other than a bad configuration stops the loop.

use std::io::Write;

use tracing::{debug, warn};

use crate::{
    config::TailerConfig,
    maillog::MaillogFormatter,
    notification::{Envelope, Notification},
    queue::{BatchDeleteOutcome, DeleteEntry, Delivery, QueueConsumer, ReceiveOptions},
};

const RECEIVE_TARGET: &str = "sqs::receive";
const BATCH_DELETE_TARGET: &str = "sqs::batch_delete";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TailerSettings {
    pub receive: ReceiveOptions,
    /// Delete processed messages.
    pub purge: bool,
}

impl Default for TailerSettings {
    fn default() -> Self {
        Self {
            receive: ReceiveOptions::default(),
            purge: true,
        }
    }
}

impl From<&TailerConfig> for TailerSettings {
    fn from(cfg: &TailerConfig) -> Self {
        Self {
            receive: ReceiveOptions::default(),
            purge: cfg.purge,
        }
    }
}

/// What happened during one [`Tailer::poll_once`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CycleReport {
    /// The receive request failed.
    ReceiveFailed,
    /// The long poll elapsed without messages.
    Empty,
    Processed(BatchReport),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchReport {
    pub received: usize,
    /// Messages that decoded and were logged; each got a delete entry.
    pub processed: usize,
    /// Messages left on the queue because they failed to decode or log.
    pub skipped: usize,
    pub lines: usize,
    pub deletion: DeletionStatus,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DeletionStatus {
    /// No message of the batch was processed.
    #[default]
    NotRequested,
    /// Deletion is turned off.
    Disabled,
    Completed(BatchDeleteOutcome),
    /// The batch delete request failed.
    Failed,
}

pub struct Tailer<C, W> {
    consumer: C,
    formatter: MaillogFormatter,
    settings: TailerSettings,
    out: W,
}

impl<C: QueueConsumer, W: Write> Tailer<C, W> {
    pub fn new(consumer: C, formatter: MaillogFormatter, settings: TailerSettings, out: W) -> Self {
        Self {
            consumer,
            formatter,
            settings,
            out,
        }
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// The sink maillog lines are written to.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Polls forever. Only returns by way of process termination.
    pub async fn run(&mut self) {
        loop {
            self.poll_once().await;
        }
    }

    pub async fn poll_once(&mut self) -> CycleReport {
        let deliveries = match self.consumer.receive_all(self.settings.receive).await {
            Ok(xs) => xs,
            Err(e) => {
                warn!(target: RECEIVE_TARGET, "{e}");
                return CycleReport::ReceiveFailed;
            }
        };

        if deliveries.is_empty() {
            debug!(target: RECEIVE_TARGET, "Long poll timeout, no messages received");
            return CycleReport::Empty;
        }

        let mut report = BatchReport {
            received: deliveries.len(),
            ..Default::default()
        };
        let mut entries = Vec::with_capacity(deliveries.len());

        for delivery in &deliveries {
            let Some(lines) = self.process(delivery) else {
                report.skipped += 1;
                continue;
            };

            report.processed += 1;
            report.lines += lines;
            match delivery.delete_entry() {
                Some(entry) => entries.push(entry),
                None => debug!(
                    target: BATCH_DELETE_TARGET,
                    queue_message_id = delivery.message_id(),
                    "no receipt handle, message cannot be deleted"
                ),
            }
        }

        if let Err(e) = self.out.flush() {
            warn!("flushing output failed: {e}");
        }

        report.deletion = self.delete(&entries).await;
        CycleReport::Processed(report)
    }

    /// Decodes and logs one message, returning the number of lines written.
    fn process(&mut self, delivery: &Delivery) -> Option<usize> {
        let envelope = match Envelope::from_slice(delivery.payload()) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(queue_message_id = delivery.message_id(), "{e}");
                return None;
            }
        };

        let notification = match envelope.notification() {
            Ok(notification) => notification,
            Err(e) => {
                debug!(queue_message_id = delivery.message_id(), "{e}");
                return None;
            }
        };

        if notification == Notification::Unknown {
            let tag = envelope.notification_type().unwrap_or_default();
            debug!(message_id = %envelope.message_id, "Unknown type {tag}");
        }

        let lines = self.formatter.format(&envelope.message_id, &notification);
        // A message's lines go out in a single write.
        let mut buf = String::new();
        for line in &lines {
            buf.push_str(line);
            buf.push('\n');
        }
        if let Err(e) = self.out.write_all(buf.as_bytes()) {
            warn!(message_id = %envelope.message_id, "writing maillog lines failed: {e}");
            return None;
        }

        Some(lines.len())
    }

    async fn delete(&mut self, entries: &[DeleteEntry]) -> DeletionStatus {
        if !self.settings.purge {
            debug!(target: BATCH_DELETE_TARGET, "Skip, purge disabled");
            return DeletionStatus::Disabled;
        }

        if entries.is_empty() {
            debug!(target: BATCH_DELETE_TARGET, "Skip, nothing to delete");
            return DeletionStatus::NotRequested;
        }

        match self.consumer.delete_batch(entries).await {
            Ok(outcome) => {
                debug!(
                    target: BATCH_DELETE_TARGET,
                    "Batch delete Success:{}, Failed:{}", outcome.successful, outcome.failed
                );
                DeletionStatus::Completed(outcome)
            }
            Err(e) => {
                warn!(target: BATCH_DELETE_TARGET, "ERR {e}");
                DeletionStatus::Failed
            }
        }
    }
}
