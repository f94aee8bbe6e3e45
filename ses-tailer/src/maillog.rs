//! Maillog-style rendering of SES notifications.
//!
//! Line layouts are consumed by log tooling downstream and must stay stable:
//!
//! ```text
//! <stamp> DELIVERY: <messageId>: to=[<rcpt> ...], delay=<millis>, dsn=<smtpResponse>
//! <stamp> BOUNCE: <messageId>: <bounceType>, to=<rcpt>, dsn=<diagnosticCode>
//! ```
//!
//! `<stamp>` is a syslog timestamp (`Jan  2 15:04:05`) and `<messageId>` is the id of the SNS
//! envelope. Complaints are rendered as their `Debug` representation.
//!
//! By default a stamp shows the wall clock of the offset the payload was written in, which is UTC
//! for everything SES emits.

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

use crate::notification::Notification;

const STAMP: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day padding:space] [hour]:[minute]:[second]");

#[derive(Clone, Copy, Debug, Default)]
pub struct MaillogFormatter {
    /// `None` keeps each timestamp's own offset.
    offset: Option<UtcOffset>,
}

impl MaillogFormatter {
    /// Renders timestamps at the given UTC offset.
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    /// Renders timestamps at the offset they were decoded with.
    pub fn as_received() -> Self {
        Self { offset: None }
    }

    /// Renders timestamps in the local time zone, or UTC if it cannot be determined.
    ///
    /// The local offset can only be read reliably while the process is single threaded, so call
    /// this before starting a multi-threaded runtime.
    pub fn local() -> Self {
        Self::new(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }

    pub fn format(&self, message_id: &str, notification: &Notification) -> Vec<String> {
        match notification {
            Notification::Delivery { delivery, .. } => vec![format!(
                "{} DELIVERY: {}: to=[{}], delay={}, dsn={}",
                self.stamp(delivery.timestamp),
                message_id,
                delivery.recipients.join(" "),
                delivery.delay_millis,
                delivery.smtp_response,
            )],
            Notification::Bounce { bounce, .. } => {
                let stamp = self.stamp(bounce.timestamp);
                bounce
                    .bounced_recipients
                    .iter()
                    .map(|r| {
                        format!(
                            "{} BOUNCE: {}: {}, to={}, dsn={}",
                            stamp,
                            message_id,
                            bounce.bounce_type,
                            r.email_address,
                            r.diagnostic_code.replace('\n', " "),
                        )
                    })
                    .collect()
            }
            Notification::Complaint { complaint, .. } => vec![format!("{complaint:?}")],
            Notification::Unknown => Vec::new(),
        }
    }

    fn stamp(&self, ts: OffsetDateTime) -> String {
        // Formatting only fails for components the description doesn't contain.
        let ts = match self.offset {
            Some(offset) => ts.to_offset(offset),
            None => ts,
        };
        ts.format(STAMP)
            .unwrap_or_else(|_| ts.to_string())
    }
}
