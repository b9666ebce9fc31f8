//! Logging setup and span constructors.

use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global subscriber.
///
/// The console honours `RUST_LOG`, falling back to `logging.filter`. When
/// `logging.file` is set, everything at DEBUG and above is also appended
/// there without colors.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(console_filter);

    let file = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{info_span, Span};

    /// Span for a bridge session.
    pub fn bridge(addr: &SocketAddr) -> Span {
        info_span!("bridge", addr = %addr)
    }

    /// Span for handling one inbound event.
    pub fn event(name: &'static str) -> Span {
        info_span!("event", kind = name)
    }
}
