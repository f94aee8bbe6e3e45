use std::future::Future;

use crate::Result;

use super::{DeleteEntry, Delivery, ReceiveOptions};

/// Per-entry result counts of a batch delete.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchDeleteOutcome {
    pub successful: usize,
    pub failed: usize,
}

impl BatchDeleteOutcome {
    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            successful: self.successful + other.successful,
            failed: self.failed + other.failed,
        }
    }
}

pub trait QueueConsumer: Send {
    /// Receives up to `options.max_messages` messages, waiting at most
    /// `options.wait_time` for the first one. An empty batch means the wait
    /// elapsed.
    fn receive_all(
        &mut self,
        options: ReceiveOptions,
    ) -> impl Future<Output = Result<Vec<Delivery>>> + Send;

    /// Removes previously received messages from the queue.
    fn delete_batch(
        &mut self,
        entries: &[DeleteEntry],
    ) -> impl Future<Output = Result<BatchDeleteOutcome>> + Send;
}
