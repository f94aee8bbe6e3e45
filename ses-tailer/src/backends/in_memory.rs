use std::{collections::HashMap, time::Instant};

use tokio::sync::mpsc;

use crate::{
    builder::QueueBuilder,
    queue::{
        BatchDeleteOutcome, DeleteEntry, Delivery, QueueBackend, QueueConsumer, QueueProducer,
        ReceiveOptions,
    },
    QueueError, Result,
};

/// A process-local queue for exercising the tailer in tests.
///
/// Not meant for production use: nothing is ever redelivered, and bookkeeping for messages that
/// are received but never deleted is kept for the life of the consumer.
pub struct InMemoryBackend;

impl InMemoryBackend {
    /// Creates a new in-memory queue builder.
    pub fn builder() -> QueueBuilder<Self> {
        QueueBuilder::new(())
    }
}

impl QueueBackend for InMemoryBackend {
    type PayloadIn = Vec<u8>;

    type Producer = InMemoryProducer;
    type Consumer = InMemoryConsumer;

    type Config = ();

    async fn new_pair(_config: ()) -> Result<(InMemoryProducer, InMemoryConsumer)> {
        let (tx, rx) = mpsc::unbounded_channel();

        Ok((
            InMemoryProducer { tx },
            InMemoryConsumer {
                rx,
                next_id: 0,
                in_flight: HashMap::new(),
                deleted: Vec::new(),
                delete_requests: 0,
            },
        ))
    }

    async fn producing_half(_config: ()) -> Result<InMemoryProducer> {
        Err(QueueError::CannotCreateHalf)
    }

    async fn consuming_half(_config: ()) -> Result<InMemoryConsumer> {
        Err(QueueError::CannotCreateHalf)
    }
}

pub struct InMemoryProducer {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl QueueProducer for InMemoryProducer {
    type Payload = Vec<u8>;

    async fn send_raw(&self, payload: &Vec<u8>) -> Result<()> {
        self.tx.send(payload.clone()).map_err(QueueError::generic)
    }
}

/// Consumer half of the in-memory queue.
///
/// Received messages stay in flight until a batch delete names them; there is
/// no visibility timeout, so undeleted messages are never redelivered.
pub struct InMemoryConsumer {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    next_id: u64,
    // receipt handle -> message id
    in_flight: HashMap<String, String>,
    deleted: Vec<String>,
    delete_requests: usize,
}

impl InMemoryConsumer {
    fn wrap_payload(&mut self, payload: Vec<u8>) -> Delivery {
        self.next_id += 1;
        let message_id = format!("msg-{}", self.next_id);
        let receipt_handle = format!("receipt-{}", self.next_id);
        self.in_flight
            .insert(receipt_handle.clone(), message_id.clone());

        Delivery::new(message_id, Some(receipt_handle), payload)
    }

    /// Ids of every message removed so far, in deletion order.
    pub fn deleted(&self) -> &[String] {
        &self.deleted
    }

    /// Number of `delete_batch` calls made so far.
    pub fn delete_requests(&self) -> usize {
        self.delete_requests
    }

    /// Number of received messages that have not been deleted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl QueueConsumer for InMemoryConsumer {
    async fn receive_all(&mut self, options: ReceiveOptions) -> Result<Vec<Delivery>> {
        let mut out = Vec::with_capacity(options.max_messages);
        let start = Instant::now();
        match tokio::time::timeout(options.wait_time, self.rx.recv()).await {
            Ok(Some(x)) => {
                let d = self.wrap_payload(x);
                out.push(d);
            }
            // Timeouts and stream termination
            Err(_) | Ok(None) => return Ok(out),
        }

        // `try_recv` will break the loop if no ready items are already buffered in the channel.
        while out.len() < options.max_messages && start.elapsed() < options.wait_time {
            let Ok(x) = self.rx.try_recv() else {
                break;
            };
            let d = self.wrap_payload(x);
            out.push(d);
        }
        Ok(out)
    }

    async fn delete_batch(&mut self, entries: &[DeleteEntry]) -> Result<BatchDeleteOutcome> {
        self.delete_requests += 1;

        let mut outcome = BatchDeleteOutcome::default();
        for entry in entries {
            match self.in_flight.get(&entry.receipt_handle) {
                Some(id) if *id == entry.id => {
                    self.in_flight.remove(&entry.receipt_handle);
                    self.deleted.push(entry.id.clone());
                    outcome.successful += 1;
                }
                _ => outcome.failed += 1,
            }
        }
        Ok(outcome)
    }
}
