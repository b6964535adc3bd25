use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use argh::FromArgs;
use exitcode::ExitCode;
use futures::StreamExt;
use syslog_supplier::{Config, SyslogSupplier, trace};
use tracing::{error, info, warn};

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(FromArgs)]
#[argh(
    description = "Receive syslog messages over TCP and UDP, and print them as JSON lines",
    help_triggers("-h", "--help")
)]
pub struct RootCommand {
    #[argh(switch, short = 'v', description = "show version")]
    version: bool,

    #[argh(
        option,
        short = 'c',
        long = "config",
        description = "read configuration from this YAML file"
    )]
    config: Option<PathBuf>,

    #[argh(
        option,
        short = 'l',
        default = "\"info\".to_string()",
        description = "log level, overridden by SYSLOG_SUPPLIER_LOG"
    )]
    log_level: String,

    #[argh(switch, long = "json-log", description = "write logs as JSON")]
    json_log: bool,

    #[argh(
        option,
        short = 't',
        default = "default_worker_threads()",
        description = "specify how many threads the Tokio runtime will use"
    )]
    threads: usize,
}

impl RootCommand {
    #![allow(clippy::print_stdout)]
    fn show_version(&self) {
        println!("syslog-supplier {}", env!("CARGO_PKG_VERSION"));
    }

    pub fn run(&self) -> Result<(), ExitCode> {
        if self.version {
            self.show_version();
            return Ok(());
        }

        let Some(path) = &self.config else {
            eprintln!("a config file is required, see --help");
            return Err(exitcode::USAGE);
        };

        let levels = std::env::var("SYSLOG_SUPPLIER_LOG")
            .unwrap_or_else(|_| trace::directives(&self.log_level));
        let color = std::io::stderr().is_terminal();
        trace::init(color, self.json_log, &levels);

        let config = Config::from_path(path).map_err(|err| {
            error!(message = "configuration error", %err);
            exitcode::CONFIG
        })?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("syslog-worker")
            .worker_threads(self.threads.max(1))
            .enable_io()
            .enable_time()
            .build()
            .map_err(|err| {
                error!(message = "Build runtime failed", %err);
                exitcode::OSERR
            })?;

        info!(
            message = "Start syslog supplier",
            threads = self.threads,
            config = ?path,
            protocol = ?config.protocol,
            port = config.port,
        );

        let result = runtime.block_on(async move {
            let supplier = SyslogSupplier::new(config);
            let mut records = supplier.subscribe().await.map_err(|err| {
                error!(message = "Start listeners failed", %err);
                exitcode::SOFTWARE
            })?;

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            let result = loop {
                let record = tokio::select! {
                    _ = &mut ctrl_c => {
                        info!(message = "Shutdown signal received");
                        break Ok(());
                    }
                    record = records.next() => match record {
                        Some(record) => record,
                        None => break Ok(()),
                    }
                };

                let mut stdout = std::io::stdout().lock();
                let written = serde_json::to_writer(&mut stdout, record.as_ref())
                    .map_err(std::io::Error::from)
                    .and_then(|_| stdout.write_all(b"\n"));
                if let Err(err) = written {
                    warn!(message = "Write record to stdout failed", %err);
                    break Err(exitcode::IOERR);
                }
            };

            supplier.shutdown();

            result
        });

        runtime.shutdown_timeout(Duration::from_secs(5));

        result
    }
}
