use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. `levels` is an `EnvFilter` directive,
/// e.g. `info` or `syslog_supplier=debug,codecs=debug`.
///
/// Installing twice is not an error, the first subscriber stays, so tests
/// can call this freely.
pub fn init(color: bool, json: bool, levels: &str) {
    let filter = EnvFilter::try_new(levels).unwrap_or_else(|err| {
        eprintln!("invalid log level {levels:?}, {err}, fallback to info");
        EnvFilter::new("info")
    });

    let builder = tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color && !json);

    let result = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.finish().try_init()
    };

    if result.is_err() {
        debug!(message = "Global subscriber is already installed");
    }
}

/// Turns the `-l` level into filter directives for this crate and its
/// libraries, everything else stays at `warn`.
pub fn directives(level: &str) -> String {
    match level {
        "off" => "off".to_string(),
        level => [
            "warn".to_string(),
            format!("syslog_supplier={level}"),
            format!("codecs={level}"),
        ]
        .join(","),
    }
}
