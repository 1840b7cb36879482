//! # Uploads
//!
//! Disk storage for the three file slots of a storage request.
//!
//! - Stored name is the arrival time in milliseconds plus the original extension, e.g. `1731600000000.pdf`
//! - Files are opened create-new, a taken name moves the timestamp forward one millisecond
//! - Nothing is rolled back, a request failing halfway keeps whatever was already written
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::extract::multipart::Field;
use chrono::Utc;
use serde::Serialize;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::debug;

use crate::error::AppError;

pub const MANIFEST_FILE: &str = "manifest_file";
pub const SAMPLING_PERMITS_FILE: &str = "sampling_permits_file";
pub const NAGOYA_PERMITS_FILE: &str = "nagoya_permits_file";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Manifest,
    SamplingPermits,
    NagoyaPermits,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Manifest, Slot::SamplingPermits, Slot::NagoyaPermits];

    pub fn field_name(self) -> &'static str {
        match self {
            Slot::Manifest => MANIFEST_FILE,
            Slot::SamplingPermits => SAMPLING_PERMITS_FILE,
            Slot::NagoyaPermits => NAGOYA_PERMITS_FILE,
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StoredFile {
    pub field_name: String,
    pub stored_name: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

pub fn stored_name(original_name: &str, millis: i64) -> String {
    format!("{millis}{}", extension(original_name))
}

fn extension(original_name: &str) -> String {
    match Path::new(original_name).extension().and_then(|ext| ext.to_str()) {
        // anything but plain alphanumerics never reaches the uploads directory
        Some(ext) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => format!(".{ext}"),
        _ => String::new(),
    }
}

pub async fn store_field(
    dir: &Path,
    slot: Slot,
    mut field: Field<'_>,
) -> Result<StoredFile, AppError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = field
        .content_type()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    let (stored_name, path, mut file) = create_unique(dir, &original_name).await?;

    let mut size = 0;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;

    debug!("Wrote {size} bytes to {}", path.display());

    Ok(StoredFile {
        field_name: slot.field_name().to_string(),
        stored_name,
        original_name,
        size,
        mime_type,
    })
}

async fn create_unique(
    dir: &Path,
    original_name: &str,
) -> Result<(String, PathBuf, File), AppError> {
    let mut millis = Utc::now().timestamp_millis();

    loop {
        let name = stored_name(original_name, millis);
        let path = dir.join(&name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((name, path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
