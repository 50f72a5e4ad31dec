use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::traffic;
use crate::Error;

// Traffic records go to their own file, the console only gets them when RUST_LOG asks.
const DEFAULT_CONSOLE_DIRECTIVES: &str = "info,traffic=off";

/// Installs the global subscriber: console output filtered by `RUST_LOG`, plus the traffic
/// log appended to `traffic_log` when one is given.
pub fn init(traffic_log: Option<&Path>) -> Result<(), Error> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_DIRECTIVES));
    let console = fmt::layer().with_filter(console_filter);

    let traffic = match traffic_log {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(Targets::new().with_target(traffic::TARGET, Level::INFO));
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(traffic)
        .try_init()?;

    Ok(())
}
