//! Runtime configuration, built once at startup and handed to the tailer by value.

use std::fmt;

use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SQS queue url required")]
    MissingQueueUrl,

    #[error("--access_id and --secret_id must be given together")]
    PartialCredentials,

    #[error("AWS region must not be empty")]
    EmptyRegion,
}

/// An access key pair given explicitly instead of being detected from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TailerConfig {
    pub queue_url: String,
    pub region: String,
    pub credentials: Option<StaticCredentials>,
    pub override_endpoint: bool,
    /// Delete messages once they have been logged.
    pub purge: bool,
    /// Render stamps in the host's local offset instead of the payload's.
    pub local_time: bool,
}

impl TailerConfig {
    /// Validates raw settings. Blank strings count as absent.
    pub fn new(
        queue_url: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let queue_url = non_blank(queue_url).ok_or(ConfigError::MissingQueueUrl)?;

        let region = match region {
            None => DEFAULT_REGION.to_owned(),
            Some(r) => non_blank(Some(r)).ok_or(ConfigError::EmptyRegion)?,
        };

        let credentials = match (non_blank(access_key_id), non_blank(secret_access_key)) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialCredentials),
        };

        Ok(Self {
            queue_url,
            region,
            credentials,
            override_endpoint: false,
            purge: true,
            local_time: false,
        })
    }

    #[cfg(feature = "sqs")]
    pub fn sqs_config(&self) -> crate::backends::sqs::SqsConfig {
        crate::backends::sqs::SqsConfig {
            queue_dsn: self.queue_url.clone(),
            override_endpoint: self.override_endpoint,
            region: self.region.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
