// ==============
// crates/backend-lib/src/telemetry.rs

//! Tracing setup and the central place for metric keys.
//!
//! Counters are recorded through the `metrics` facade; they are no-ops unless
//! the embedding binary installs a recorder.
use anyhow::anyhow;
use tracing_subscriber::EnvFilter;
use crate::config::{LogFormat, Settings};

pub const USER_REGISTERED: &str = "user.registered";
pub const LOGIN_SUCCEEDED: &str = "login.succeeded";
pub const LOGIN_FAILED: &str = "login.failed";
pub const FILE_UPLOADED: &str = "file.uploaded";
pub const FILE_DELETED: &str = "file.deleted";
pub const FILE_INTEGRITY_FAULT: &str = "file.integrity_fault";

/// Install the global tracing subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
