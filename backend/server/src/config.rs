use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

pub const DEFAULT_PORT: &str = "5000";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: &str = "52428800";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub allowed_origin: String,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("PORT", DEFAULT_PORT)?,
            uploads_dir: try_load("UPLOADS_DIR", DEFAULT_UPLOADS_DIR)?,
            allowed_origin: try_load("ALLOWED_ORIGIN", DEFAULT_ALLOWED_ORIGIN)?,
            max_body_bytes: try_load("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("{e}")
        })
        .with_context(|| format!("Environment misconfigured: {key}={raw}"))
}
