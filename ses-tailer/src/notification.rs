//! SNS envelope and SES notification types.
//!
//! A message body on the queue is an SNS notification (the [`Envelope`]) whose `Message` field
//! holds a second JSON document: the SES [`Notification`]. The two layers are decoded separately
//! so that a malformed payload can be told apart from a malformed envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::{macros::datetime, OffsetDateTime};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed notification envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed SES payload in envelope {message_id}: {source}")]
    Payload {
        message_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// SNS notification wrapper.
///
/// Only `MessageId` and `Message` are required; the remaining fields are passed through untouched.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    #[serde(rename = "Type", alias = "type", default)]
    pub kind: String,
    #[serde(alias = "messageId")]
    pub message_id: String,
    #[serde(alias = "topicArn", default)]
    pub topic_arn: String,
    #[serde(
        alias = "timestamp",
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(alias = "subject", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(alias = "message")]
    pub message: String,
    #[serde(alias = "signature", default)]
    pub signature: String,
    #[serde(alias = "signatureVersion", default)]
    pub signature_version: String,
    #[serde(rename = "SigningCertURL", alias = "signingCertURL", default)]
    pub signing_cert_url: String,
    #[serde(rename = "UnsubscribeURL", alias = "unsubscribeURL", default)]
    pub unsubscribe_url: String,
}

impl Envelope {
    /// Decodes a raw queue message body. The nested `Message` is not inspected.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(body).map_err(DecodeError::Envelope)
    }

    /// Decodes the SES payload carried in `Message`.
    ///
    /// An object without a `notificationType` (or with a null one) is [`Notification::Unknown`].
    /// Fields missing from a known variant take their zero values.
    pub fn notification(&self) -> Result<Notification, DecodeError> {
        let payload_error = |source| DecodeError::Payload {
            message_id: self.message_id.clone(),
            source,
        };

        let value: Value = serde_json::from_str(&self.message).map_err(payload_error)?;
        if value.is_object() && value.get(TAG).map_or(true, Value::is_null) {
            return Ok(Notification::Unknown);
        }
        Notification::deserialize(value).map_err(payload_error)
    }

    /// Raw `notificationType` of the payload, if it has one.
    pub fn notification_type(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Tag {
            #[serde(rename = "notificationType")]
            notification_type: String,
        }

        serde_json::from_str::<Tag>(&self.message)
            .ok()
            .map(|t| t.notification_type)
    }
}

const TAG: &str = "notificationType";

/// Stands in for a timestamp the payload left out.
fn zero_time() -> OffsetDateTime {
    datetime!(0001-01-01 0:00 UTC)
}

/// SES notification, tagged by `notificationType`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "notificationType")]
pub enum Notification {
    Delivery {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mail: Option<Mail>,
        #[serde(default)]
        delivery: Delivery,
    },
    Bounce {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mail: Option<Mail>,
        #[serde(default)]
        bounce: Bounce,
    },
    Complaint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mail: Option<Mail>,
        #[serde(default)]
        complaint: Complaint,
    },
    /// Any tag this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// The sent message a notification refers to.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mail {
    #[serde(default)]
    pub message_id: String,
    #[serde(default = "zero_time", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    #[serde(default = "zero_time", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "processingTimeMillis", default)]
    pub delay_millis: u64,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub smtp_response: String,
    #[serde(rename = "reportingMTA", default)]
    pub reporting_mta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_mta_ip: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounce {
    #[serde(default)]
    pub feedback_id: String,
    #[serde(default = "zero_time", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub bounce_type: String,
    #[serde(default)]
    pub bounce_sub_type: String,
    #[serde(default)]
    pub bounced_recipients: Vec<BouncedRecipient>,
    #[serde(rename = "reportingMTA", default, skip_serializing_if = "Option::is_none")]
    pub reporting_mta: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BouncedRecipient {
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub status: String,
    /// May span several lines.
    #[serde(default)]
    pub diagnostic_code: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(default)]
    pub feedback_id: String,
    #[serde(default = "zero_time", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub complained_recipients: Vec<ComplainedRecipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint_feedback_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplainedRecipient {
    #[serde(default)]
    pub email_address: String,
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            timestamp: zero_time(),
            delay_millis: 0,
            recipients: Vec::new(),
            smtp_response: String::new(),
            reporting_mta: String::new(),
            remote_mta_ip: None,
        }
    }
}

impl Default for Bounce {
    fn default() -> Self {
        Self {
            feedback_id: String::new(),
            timestamp: zero_time(),
            bounce_type: String::new(),
            bounce_sub_type: String::new(),
            bounced_recipients: Vec::new(),
            reporting_mta: None,
        }
    }
}

impl Default for Complaint {
    fn default() -> Self {
        Self {
            feedback_id: String::new(),
            timestamp: zero_time(),
            complained_recipients: Vec::new(),
            user_agent: None,
            complaint_feedback_type: None,
            arrival_date: None,
        }
    }
}
