// ============================
// filedrop-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use figment::{Figment, providers::{Env, Format, Serialized, Toml}};
use anyhow::{bail, Result};

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "filedrop.toml";

/// Environment variable prefix, e.g. `FILEDROP_SECRET_KEY`
pub const ENV_PREFIX: &str = "FILEDROP_";

/// Shortest accepted HMAC secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, one event per line
    Pretty,
    /// Newline-delimited JSON
    Json,
}

/// Application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Root for the database file and uploaded blobs
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Session token TTL in seconds
    pub token_ttl_secs: u64,
    /// HMAC key for session tokens. Generated per process when absent.
    pub secret_key: Option<String>,
    /// Mark the auth cookie `Secure`
    pub secure_cookie: bool,
    /// Largest accepted upload request body
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            token_ttl_secs: 30 * 60, // 30 minutes
            secret_key: None,
            secure_cookie: false,
            max_upload_bytes: 100 * 1024 * 1024, // 100 MiB
        }
    }
}

impl Settings {
    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.max_upload_bytes == 0 {
            bail!("max_upload_bytes must be greater than zero");
        }
        if self.token_ttl_secs == 0 {
            bail!("token_ttl_secs must be greater than zero");
        }
        if let Some(secret) = &self.secret_key {
            if secret.len() < MIN_SECRET_LEN {
                bail!("secret_key must be at least {MIN_SECRET_LEN} bytes");
            }
        }
        Ok(())
    }

    /// Session token lifetime
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("filedrop.db")
    }

    /// Directory holding uploaded blobs
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Load settings from defaults, a TOML file and the environment, in that order
/// of increasing precedence.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let file = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

    let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_settings_validation() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());

        let mut invalid_settings = settings.clone();
        invalid_settings.log_level = "loud".to_string();
        assert!(invalid_settings.validate().is_err());

        let mut invalid_settings = settings.clone();
        invalid_settings.token_ttl_secs = 0;
        assert!(invalid_settings.validate().is_err());

        let mut invalid_settings = settings.clone();
        invalid_settings.max_upload_bytes = 0;
        assert!(invalid_settings.validate().is_err());

        let mut invalid_settings = settings.clone();
        invalid_settings.secret_key = Some("short".to_string());
        assert!(invalid_settings.validate().is_err());

        let mut valid_settings = settings;
        valid_settings.secret_key = Some("x".repeat(MIN_SECRET_LEN));
        valid_settings.log_level = "DEBUG".to_string();
        assert!(valid_settings.validate().is_ok());
    }

    #[test]
    fn test_default_paths_and_ttl() {
        let settings = Settings::default();
        assert_eq!(settings.token_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.database_path(), PathBuf::from("data/filedrop.db"));
        assert_eq!(settings.uploads_dir(), PathBuf::from("data/uploads"));
    }

    #[test]
    fn test_load_settings_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                bind_addr = "0.0.0.0:9000"
                data_dir = "test_data"
                log_level = "debug"
                token_ttl_secs = 600
                "#,
            )?;
            jail.set_env("FILEDROP_LOG_LEVEL", "warn");

            let settings = load_settings(None).map_err(|e| e.to_string())?;
            assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:9000");
            assert_eq!(settings.data_dir, PathBuf::from("test_data"));
            assert_eq!(settings.log_level, "warn"); // environment wins over the file
            assert_eq!(settings.token_ttl_secs, 600);
            assert_eq!(settings.log_format, LogFormat::Pretty);
            assert!(settings.secret_key.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_load_settings_explicit_path_rejects_invalid() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "token_ttl_secs = 0")?;
            assert!(load_settings(Some(Path::new("custom.toml"))).is_err());
            Ok(())
        });
    }
}
