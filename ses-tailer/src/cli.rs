//! Command line surface of the `ses-tailer` binary.

use clap::Parser;

use crate::config::{ConfigError, TailerConfig, DEFAULT_REGION};

#[derive(Debug, Parser)]
#[command(name = "ses-tailer", version, about = "Tail SES notifications from an SQS queue")]
pub struct Args {
    /// (required) SQS queue URL
    #[arg(short = 'q', long = "queue", env = "SES_TAILER_QUEUE_URL")]
    pub queue: Option<String>,

    /// AWS access key id, auto-detected if blank
    #[arg(long = "access_id")]
    pub access_id: Option<String>,

    /// AWS secret access key, auto-detected if blank
    #[arg(long = "secret_id")]
    pub secret_id: Option<String>,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Leave messages in the queue after receiving them
    #[arg(long = "nopurge")]
    pub no_purge: bool,

    /// Send requests to the queue URL's host (ElasticMQ, LocalStack) instead of AWS
    #[arg(long)]
    pub endpoint_override: bool,

    /// Print timestamps in the local time zone instead of as received (UTC)
    #[arg(long)]
    pub local_time: bool,
}

impl Args {
    pub fn into_config(self) -> Result<TailerConfig, ConfigError> {
        let mut cfg =
            TailerConfig::new(self.queue, Some(self.region), self.access_id, self.secret_id)?;
        cfg.purge = !self.no_purge;
        cfg.override_endpoint = self.endpoint_override;
        cfg.local_time = self.local_time;
        Ok(cfg)
    }
}
