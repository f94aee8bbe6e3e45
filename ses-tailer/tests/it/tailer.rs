use std::{io, time::Duration};

use ses_tailer::{
    backends::{InMemoryBackend, InMemoryConsumer, InMemoryProducer},
    maillog::MaillogFormatter,
    tailer::{BatchReport, CycleReport, DeletionStatus, Tailer, TailerSettings},
    BatchDeleteOutcome, DeleteEntry, Delivery, QueueConsumer, QueueError, QueueProducer as _,
    ReceiveOptions,
};
use time::UtcOffset;

use crate::fixtures;

fn settings(purge: bool) -> TailerSettings {
    TailerSettings {
        receive: ReceiveOptions {
            max_messages: 10,
            visibility_timeout: Duration::from_secs(5),
            wait_time: Duration::from_millis(100),
        },
        purge,
    }
}

async fn make_tailer(purge: bool) -> (InMemoryProducer, Tailer<InMemoryConsumer, Vec<u8>>) {
    let (p, c) = InMemoryBackend::builder().build_pair().await.unwrap();
    let tailer = Tailer::new(
        c,
        MaillogFormatter::new(UtcOffset::UTC),
        settings(purge),
        Vec::new(),
    );
    (p, tailer)
}

fn output_lines<C: QueueConsumer>(tailer: &Tailer<C, Vec<u8>>) -> Vec<String> {
    String::from_utf8(tailer.output().clone())
        .unwrap()
        .lines()
        .map(ToOwned::to_owned)
        .collect()
}

#[tokio::test]
async fn mixed_batch_deletes_only_decoded_messages() {
    let (p, mut tailer) = make_tailer(true).await;
    p.send_serde_json(&fixtures::delivery()).await.unwrap();
    p.send_serde_json(&fixtures::bounce()).await.unwrap();
    p.send_bytes(b"{\"Type\": \"Notification\", ").await.unwrap();

    let report = tailer.poll_once().await;

    assert_eq!(
        report,
        CycleReport::Processed(BatchReport {
            received: 3,
            processed: 2,
            skipped: 1,
            lines: 3,
            deletion: DeletionStatus::Completed(BatchDeleteOutcome {
                successful: 2,
                failed: 0,
            }),
        })
    );
    assert_eq!(
        output_lines(&tailer),
        vec![
            format!(
                "Jan 27 14:59:38 DELIVERY: {}: to=[recipient@example.com], delay=1251, \
                 dsn=250 2.6.0 Message received",
                fixtures::DELIVERY_ID
            ),
            format!(
                "Jan 27 15:01:02 BOUNCE: {}: Permanent, to=nobody@example.com, \
                 dsn=smtp; 550 5.1.1 user unknown",
                fixtures::BOUNCE_ID
            ),
            format!(
                "Jan 27 15:01:02 BOUNCE: {}: Permanent, to=gone@example.com, \
                 dsn=smtp; 550 mailbox unavailable",
                fixtures::BOUNCE_ID
            ),
        ]
    );

    let c = tailer.consumer();
    assert_eq!(c.delete_requests(), 1);
    assert_eq!(c.deleted(), ["msg-1", "msg-2"]);
    // The malformed message is left for inspection.
    assert_eq!(c.in_flight(), 1);
}

#[tokio::test]
async fn empty_receive_logs_and_deletes_nothing() {
    let (_p, mut tailer) = make_tailer(true).await;

    assert_eq!(tailer.poll_once().await, CycleReport::Empty);
    assert!(tailer.output().is_empty());
    assert_eq!(tailer.consumer().delete_requests(), 0);
}

#[tokio::test]
async fn nopurge_never_deletes() {
    let (p, mut tailer) = make_tailer(false).await;
    p.send_serde_json(&fixtures::delivery()).await.unwrap();
    p.send_serde_json(&fixtures::complaint()).await.unwrap();
    p.send_bytes(b"garbage").await.unwrap();

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };
    assert_eq!(report.processed, 2);
    assert_eq!(report.deletion, DeletionStatus::Disabled);

    assert_eq!(tailer.poll_once().await, CycleReport::Empty);

    let c = tailer.consumer();
    assert_eq!(c.delete_requests(), 0);
    assert_eq!(c.in_flight(), 3);
}

#[tokio::test]
async fn payload_errors_are_skipped_and_unknown_types_are_deleted() {
    let (p, mut tailer) = make_tailer(true).await;
    p.send_serde_json(&fixtures::broken_payload()).await.unwrap();
    p.send_serde_json(&fixtures::unknown()).await.unwrap();

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };

    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.lines, 0);
    assert!(tailer.output().is_empty());
    assert_eq!(tailer.consumer().deleted(), ["msg-2"]);
}

#[tokio::test]
async fn batch_without_decodable_messages_sends_no_delete() {
    let (p, mut tailer) = make_tailer(true).await;
    p.send_bytes(b"").await.unwrap();
    p.send_serde_json(&fixtures::broken_payload()).await.unwrap();

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };

    assert_eq!(report.skipped, 2);
    assert_eq!(report.deletion, DeletionStatus::NotRequested);
    assert_eq!(tailer.consumer().delete_requests(), 0);
}

#[tokio::test]
async fn complaint_is_a_single_line() {
    let (p, mut tailer) = make_tailer(true).await;
    p.send_serde_json(&fixtures::complaint()).await.unwrap();

    tailer.poll_once().await;

    let lines = output_lines(&tailer);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("recipient@example.com"));
    assert!(lines[0].contains("abuse"));
}

#[tokio::test]
async fn untagged_and_sparse_payloads_are_deleted() {
    let (p, mut tailer) = make_tailer(true).await;
    p.send_serde_json(&fixtures::untagged()).await.unwrap();
    p.send_serde_json(&fixtures::sparse_delivery()).await.unwrap();

    let report = tailer.poll_once().await;

    assert_eq!(
        report,
        CycleReport::Processed(BatchReport {
            received: 2,
            processed: 2,
            skipped: 0,
            lines: 1,
            deletion: DeletionStatus::Completed(BatchDeleteOutcome {
                successful: 2,
                failed: 0,
            }),
        })
    );
    assert_eq!(
        output_lines(&tailer),
        ["Jan 27 14:59:38 DELIVERY: d-2: to=[], delay=0, dsn=250 Ok"]
    );
    assert_eq!(tailer.consumer().deleted(), ["msg-1", "msg-2"]);
    assert_eq!(tailer.consumer().in_flight(), 0);
}

/// Accepts a fixed number of `write` calls, then fails every later one.
struct ClosingWriter {
    writes_left: usize,
    accepted: Vec<u8>,
}

impl ClosingWriter {
    fn new(writes_left: usize) -> Self {
        Self {
            writes_left,
            accepted: Vec::new(),
        }
    }

    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.accepted)
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }
}

impl io::Write for ClosingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.writes_left == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"));
        }
        self.writes_left -= 1;
        self.accepted.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn closing_tailer(
    writes_left: usize,
) -> (InMemoryProducer, Tailer<InMemoryConsumer, ClosingWriter>) {
    let (p, c) = InMemoryBackend::builder().build_pair().await.unwrap();
    let tailer = Tailer::new(
        c,
        MaillogFormatter::new(UtcOffset::UTC),
        settings(true),
        ClosingWriter::new(writes_left),
    );
    (p, tailer)
}

#[tokio::test]
async fn bounce_lines_are_written_together() {
    let (p, mut tailer) = closing_tailer(1).await;
    p.send_serde_json(&fixtures::bounce()).await.unwrap();

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };

    assert_eq!(report.processed, 1);
    assert_eq!(report.lines, 2);
    assert_eq!(tailer.output().lines().len(), 2);
    assert_eq!(tailer.consumer().deleted(), ["msg-1"]);
}

#[tokio::test]
async fn failed_writes_leave_nothing_behind_and_skip_the_message() {
    let (p, mut tailer) = closing_tailer(1).await;
    p.send_serde_json(&fixtures::delivery()).await.unwrap();
    p.send_serde_json(&fixtures::bounce()).await.unwrap();

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.lines, 1);
    let lines = tailer.output().lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("DELIVERY"));
    assert!(!lines.iter().any(|l| l.contains(fixtures::BOUNCE_ID)));

    // The bounce stays queued for the next attempt.
    assert_eq!(tailer.consumer().deleted(), ["msg-1"]);
    assert_eq!(tailer.consumer().in_flight(), 1);
}

/// Fails every receive and delete the test asks it to.
struct FlakyConsumer {
    receive_failures: usize,
    fail_deletes: bool,
    pending: Vec<Vec<u8>>,
    delete_calls: usize,
}

impl QueueConsumer for FlakyConsumer {
    async fn receive_all(&mut self, _options: ReceiveOptions) -> ses_tailer::Result<Vec<Delivery>> {
        if self.receive_failures > 0 {
            self.receive_failures -= 1;
            return Err(QueueError::generic(io::Error::other("queue unreachable")));
        }

        Ok(self
            .pending
            .drain(..)
            .enumerate()
            .map(|(i, body)| Delivery::new(format!("m-{i}"), Some(format!("r-{i}")), body))
            .collect())
    }

    async fn delete_batch(
        &mut self,
        entries: &[DeleteEntry],
    ) -> ses_tailer::Result<BatchDeleteOutcome> {
        self.delete_calls += 1;
        if self.fail_deletes {
            return Err(QueueError::generic(io::Error::other("access denied")));
        }
        Ok(BatchDeleteOutcome {
            successful: entries.len(),
            failed: 0,
        })
    }
}

fn flaky(receive_failures: usize, fail_deletes: bool) -> Tailer<FlakyConsumer, Vec<u8>> {
    let consumer = FlakyConsumer {
        receive_failures,
        fail_deletes,
        pending: vec![serde_json::to_vec(&fixtures::delivery()).unwrap()],
        delete_calls: 0,
    };
    Tailer::new(
        consumer,
        MaillogFormatter::new(UtcOffset::UTC),
        settings(true),
        Vec::new(),
    )
}

#[tokio::test]
async fn receive_errors_are_retried_on_the_next_cycle() {
    let mut tailer = flaky(2, false);

    assert_eq!(tailer.poll_once().await, CycleReport::ReceiveFailed);
    assert_eq!(tailer.poll_once().await, CycleReport::ReceiveFailed);

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };
    assert_eq!(report.lines, 1);
    assert_eq!(
        report.deletion,
        DeletionStatus::Completed(BatchDeleteOutcome {
            successful: 1,
            failed: 0
        })
    );
}

#[tokio::test]
async fn delete_errors_keep_lines_and_the_loop_going() {
    let mut tailer = flaky(0, true);

    let CycleReport::Processed(report) = tailer.poll_once().await else {
        panic!("expected a batch");
    };
    assert_eq!(report.deletion, DeletionStatus::Failed);
    assert_eq!(output_lines(&tailer).len(), 1);
    assert_eq!(tailer.consumer().delete_calls, 1);

    // Not retried: the next cycle is a fresh receive.
    assert_eq!(tailer.poll_once().await, CycleReport::Empty);
    assert_eq!(tailer.consumer().delete_calls, 1);
}
