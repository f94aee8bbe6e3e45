use crate::{QueueBackend, Result};

/// Queue builder.
///
/// Created with
/// [`InMemoryBackend::builder`][crate::backends::InMemoryBackend::builder] or
/// [`SqsBackend::builder`][crate::backends::SqsBackend::builder].
pub struct QueueBuilder<Q: QueueBackend> {
    pub(crate) config: Q::Config,
}

impl<Q: QueueBackend> QueueBuilder<Q> {
    /// Creates a new queue builder.
    ///
    /// This constructor exists primarily as an implementation detail of
    /// `SomeBackend::builder` associated function, which are the more
    /// convenient way of creating a queue builder.
    pub fn new(config: Q::Config) -> Self {
        Self { config }
    }

    pub async fn build_pair(self) -> Result<(Q::Producer, Q::Consumer)> {
        Q::new_pair(self.config).await
    }

    pub async fn build_producer(self) -> Result<Q::Producer> {
        Q::producing_half(self.config).await
    }

    pub async fn build_consumer(self) -> Result<Q::Consumer> {
        Q::consuming_half(self.config).await
    }
}
