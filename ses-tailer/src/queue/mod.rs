use std::{fmt, future::Future, time::Duration};

use crate::{QueuePayload, Result};

mod consumer;
mod producer;

pub use self::{
    consumer::{BatchDeleteOutcome, QueueConsumer},
    producer::QueueProducer,
};

/// A marker trait with utility functions meant for the creation of new
/// producers and/or consumers.
///
/// This trait is meant to be implemented on an empty struct representing the
/// backend as a whole.
pub trait QueueBackend {
    type PayloadIn: QueuePayload;

    type Producer: QueueProducer<Payload = Self::PayloadIn>;
    type Consumer: QueueConsumer;

    type Config;

    fn new_pair(
        config: Self::Config,
    ) -> impl Future<Output = Result<(Self::Producer, Self::Consumer)>> + Send;

    fn producing_half(config: Self::Config) -> impl Future<Output = Result<Self::Producer>> + Send;

    fn consuming_half(config: Self::Config) -> impl Future<Output = Result<Self::Consumer>> + Send;
}

/// Parameters of a single receive request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReceiveOptions {
    /// Upper bound on the batch size.
    pub max_messages: usize,
    /// How long received messages stay hidden from other consumers.
    pub visibility_timeout: Duration,
    /// Long-poll wait when the queue is empty.
    pub wait_time: Duration,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: 10,
            visibility_timeout: Duration::from_secs(5),
            wait_time: Duration::from_secs(20),
        }
    }
}

/// One message removed from a batch delete request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

/// The output of queue backends
pub struct Delivery {
    message_id: String,
    receipt_handle: Option<String>,
    payload: Vec<u8>,
}

impl Delivery {
    #[doc(hidden)]
    pub fn new(message_id: String, receipt_handle: Option<String>, payload: Vec<u8>) -> Self {
        Self {
            message_id,
            receipt_handle,
            payload,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The raw message body.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The entry that removes this [`Delivery`] from the queue in a batch
    /// delete, or `None` if the backend handed out no message id or receipt
    /// handle.
    pub fn delete_entry(&self) -> Option<DeleteEntry> {
        if self.message_id.is_empty() {
            return None;
        }
        self.receipt_handle.as_ref().map(|receipt_handle| DeleteEntry {
            id: self.message_id.clone(),
            receipt_handle: receipt_handle.clone(),
        })
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message_id", &self.message_id)
            .finish()
    }
}
