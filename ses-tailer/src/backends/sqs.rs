use aws_sdk_sqs::{
    config::{Credentials, Region},
    types::{DeleteMessageBatchRequestEntry, Message},
    Client,
};

use crate::{
    builder::QueueBuilder,
    config::StaticCredentials,
    queue::{
        BatchDeleteOutcome, DeleteEntry, Delivery, QueueBackend, QueueConsumer, QueueProducer,
        ReceiveOptions,
    },
    QueueError, Result,
};

/// SQS rejects `DeleteMessageBatch` requests with more entries than this.
const MAX_BATCH_ENTRIES: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SqsConfig {
    pub queue_dsn: String,
    /// Send requests to the host of `queue_dsn` instead of the regional AWS
    /// endpoint (ElasticMQ, LocalStack).
    pub override_endpoint: bool,
    pub region: String,
    /// `None` defers to the default AWS credential chain.
    pub credentials: Option<StaticCredentials>,
}

pub struct SqsBackend;

impl SqsBackend {
    /// Creates a new Amazon SQS queue builder with the given configuration.
    pub fn builder(config: SqsConfig) -> QueueBuilder<Self> {
        QueueBuilder::new(config)
    }
}

impl QueueBackend for SqsBackend {
    type PayloadIn = String;

    type Producer = SqsProducer;
    type Consumer = SqsConsumer;

    type Config = SqsConfig;

    async fn new_pair(cfg: SqsConfig) -> Result<(SqsProducer, SqsConsumer)> {
        let client = make_client(&cfg).await;

        let producer = SqsProducer {
            client: client.clone(),
            queue_dsn: cfg.queue_dsn.clone(),
        };

        let consumer = SqsConsumer {
            client,
            queue_dsn: cfg.queue_dsn,
        };

        Ok((producer, consumer))
    }

    async fn producing_half(cfg: SqsConfig) -> Result<SqsProducer> {
        let client = make_client(&cfg).await;

        let producer = SqsProducer {
            client,
            queue_dsn: cfg.queue_dsn,
        };

        Ok(producer)
    }

    async fn consuming_half(cfg: SqsConfig) -> Result<SqsConsumer> {
        let client = make_client(&cfg).await;

        let consumer = SqsConsumer {
            client,
            queue_dsn: cfg.queue_dsn,
        };

        Ok(consumer)
    }
}

async fn make_client(cfg: &SqsConfig) -> Client {
    let mut loader = aws_config::from_env().region(Region::new(cfg.region.clone()));

    if cfg.override_endpoint {
        loader = loader.endpoint_url(&cfg.queue_dsn);
    }

    if let Some(creds) = &cfg.credentials {
        loader = loader.credentials_provider(Credentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            None,
            None,
            "ses-tailer",
        ));
    }

    Client::new(&loader.load().await)
}

pub struct SqsProducer {
    client: Client,
    queue_dsn: String,
}

impl QueueProducer for SqsProducer {
    type Payload = String;

    async fn send_raw(&self, payload: &String) -> Result<()> {
        self.client
            .send_message()
            .queue_url(&self.queue_dsn)
            .message_body(payload)
            .send()
            .await
            .map_err(QueueError::generic)?;

        Ok(())
    }
}

pub struct SqsConsumer {
    client: Client,
    queue_dsn: String,
}

impl SqsConsumer {
    fn wrap_message(message: &Message) -> Delivery {
        Delivery::new(
            message.message_id().unwrap_or_default().to_owned(),
            message.receipt_handle().map(ToOwned::to_owned),
            message.body().unwrap_or_default().as_bytes().to_owned(),
        )
    }
}

impl QueueConsumer for SqsConsumer {
    async fn receive_all(&mut self, options: ReceiveOptions) -> Result<Vec<Delivery>> {
        let out = self
            .client
            .receive_message()
            .queue_url(&self.queue_dsn)
            .max_number_of_messages(
                options
                    .max_messages
                    .try_into()
                    .map_err(QueueError::generic)?,
            )
            .visibility_timeout(
                options
                    .visibility_timeout
                    .as_secs()
                    .try_into()
                    .map_err(QueueError::generic)?,
            )
            .wait_time_seconds(
                options
                    .wait_time
                    .as_secs()
                    .try_into()
                    .map_err(QueueError::generic)?,
            )
            .send()
            .await
            .map_err(QueueError::generic)?;

        Ok(out.messages().iter().map(Self::wrap_message).collect())
    }

    async fn delete_batch(&mut self, entries: &[DeleteEntry]) -> Result<BatchDeleteOutcome> {
        let mut outcome = BatchDeleteOutcome::default();

        for chunk in entries.chunks(MAX_BATCH_ENTRIES) {
            let request_entries = chunk
                .iter()
                .map(|e| {
                    DeleteMessageBatchRequestEntry::builder()
                        .id(&e.id)
                        .receipt_handle(&e.receipt_handle)
                        .build()
                        .map_err(QueueError::generic)
                })
                .collect::<Result<Vec<_>>>()?;

            let out = self
                .client
                .delete_message_batch()
                .queue_url(&self.queue_dsn)
                .set_entries(Some(request_entries))
                .send()
                .await
                .map_err(QueueError::generic)?;

            outcome = outcome.merge(BatchDeleteOutcome {
                successful: out.successful().len(),
                failed: out.failed().len(),
            });
        }

        Ok(outcome)
    }
}
