use std::{
    fs::OpenOptions,
    path::Path,
    sync::Mutex,
};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

pub const LOG_FILE: &str = "collabnets.log";

/// Console gets short lines; the log file under `log_dir` gets timestamps,
/// levels and targets. `RUST_LOG` overrides the default `info` filter.
pub fn init(log_dir: &Path) -> Result<()> {
    let path = log_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::io(&path, e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let logfile = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));

    // a second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(logfile)
        .try_init();
    Ok(())
}
