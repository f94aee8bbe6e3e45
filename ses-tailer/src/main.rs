use std::{io, process::ExitCode};

use clap::Parser;
use ses_tailer::{
    backends::SqsBackend,
    cli::Args,
    logging,
    maillog::MaillogFormatter,
    tailer::{Tailer, TailerSettings},
};

fn main() -> ExitCode {
    let cfg = match Args::parse().into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init();

    let formatter = if cfg.local_time {
        // Read while the process still has a single thread.
        MaillogFormatter::local()
    } else {
        MaillogFormatter::as_received()
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        let consumer = match SqsBackend::builder(cfg.sqs_config()).build_consumer().await {
            Ok(c) => c,
            Err(e) => {
                eprintln!("building SQS consumer failed: {e}");
                return ExitCode::FAILURE;
            }
        };

        let settings = TailerSettings::from(&cfg);
        Tailer::new(consumer, formatter, settings, io::stdout())
            .run()
            .await;

        ExitCode::SUCCESS
    })
}
