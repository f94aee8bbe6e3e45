use std::future::Future;

use serde::Serialize;

use crate::{QueuePayload, Result};

pub trait QueueProducer: Send + Sync + Sized {
    type Payload: QueuePayload;

    fn send_raw(&self, payload: &Self::Payload) -> impl Future<Output = Result<()>> + Send;

    fn send_bytes(&self, payload: &[u8]) -> impl Future<Output = Result<()>> + Send {
        async move {
            let payload = Self::Payload::from_bytes_naive(payload)?;
            self.send_raw(&payload).await
        }
    }

    fn send_serde_json<P: Serialize + Sync>(
        &self,
        payload: &P,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let payload = serde_json::to_vec(payload)?;
            self.send_bytes(&payload).await
        }
    }
}
