use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::create_dir_all;
use tracing::info;

use super::config::Config;

pub struct State {
    pub config: Config,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        create_dir_all(&config.uploads_dir)
            .await
            .with_context(|| format!("Failed to create {}", config.uploads_dir.display()))?;

        info!("Uploads directory: {}", config.uploads_dir.display());

        Ok(Arc::new(Self { config }))
    }
}
