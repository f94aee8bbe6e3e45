//! # SES tailer
//!
//! Tails Amazon SES delivery-status notifications (deliveries, bounces and complaints) that SNS
//! relays into an SQS queue, and renders them as maillog-style lines:
//!
//! ```text
//! Jan 27 14:59:38 DELIVERY: 0a1b...: to=[recipient@example.com], delay=1251, dsn=250 2.6.0 Ok
//! Jan 27 15:01:02 BOUNCE: 2c3d...: Permanent, to=nobody@example.com, dsn=smtp; 550 5.1.1 unknown
//! ```
//!
//! ## Cargo Features
//!
//! * `sqs` (default): the Amazon SQS backend and the `ses-tailer` binary
//! * `in_memory` (default): an in-process queue, handy for driving the loop in tests
//!
//! ## How to Use
//!
//! The pieces compose in the same order the binary uses them: a queue consumer built from a
//! backend config, a [`maillog::MaillogFormatter`] and a [`tailer::Tailer`] that owns both.
//!
//! ```no_run
//! # async {
//! use ses_tailer::{
//!     backends::sqs::{SqsBackend, SqsConfig},
//!     maillog::MaillogFormatter,
//!     tailer::{CycleReport, Tailer, TailerSettings},
//! };
//!
//! let cfg = SqsConfig {
//!     queue_dsn: "http://localhost:9324/queue/ses-events".to_owned(),
//!     override_endpoint: true,
//!     region: "us-west-2".to_owned(),
//!     credentials: None,
//! };
//!
//! let consumer = SqsBackend::builder(cfg).build_consumer().await?;
//! let mut tailer = Tailer::new(
//!     consumer,
//!     MaillogFormatter::as_received(),
//!     TailerSettings::default(),
//!     std::io::stdout(),
//! );
//!
//! // One receive/log/delete cycle; `tailer.run()` repeats this forever.
//! if let CycleReport::Processed(batch) = tailer.poll_once().await {
//!     println!("{} lines written", batch.lines);
//! }
//! # anyhow::Ok(())
//! # };
//! ```
#![warn(unreachable_pub)]

use thiserror::Error;

pub mod backends;
pub mod builder;
pub mod cli;
pub mod config;
pub mod logging;
pub mod maillog;
pub mod notification;
mod queue;
pub mod tailer;

pub use self::{
    builder::QueueBuilder,
    queue::{
        BatchDeleteOutcome, DeleteEntry, Delivery, QueueBackend, QueueConsumer, QueueProducer,
        ReceiveOptions,
    },
};

/// Errors raised by the queue transport.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("only `build_pair` may be used with this backend")]
    CannotCreateHalf,

    #[error("(de)serialization error")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Generic(Box<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    pub fn generic<E: 'static + std::error::Error + Send + Sync>(e: E) -> Self {
        Self::Generic(Box::new(e))
    }
}

pub type Result<T, E = QueueError> = std::result::Result<T, E>;

/// Native payload representation of a queue backend.
pub trait QueuePayload: 'static + Send + Sync {
    fn to_bytes_naive(&self) -> Result<Vec<u8>>;
    fn from_bytes_naive(bytes: &[u8]) -> Result<Box<Self>>;
}

impl QueuePayload for Vec<u8> {
    fn to_bytes_naive(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }

    fn from_bytes_naive(bytes: &[u8]) -> Result<Box<Self>> {
        Ok(Box::new(bytes.to_owned()))
    }
}

impl QueuePayload for String {
    fn to_bytes_naive(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_owned())
    }

    fn from_bytes_naive(bytes: &[u8]) -> Result<Box<Self>> {
        Ok(Box::new(
            String::from_utf8(bytes.to_owned()).map_err(QueueError::generic)?,
        ))
    }
}
