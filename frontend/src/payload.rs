//! # Multipart Payload
//!
//! Turns a [`SubmissionRecord`] into the multipart body the receiver expects.
//!
//! - Every non-file field goes out as a text part holding its string form
//! - Every attached file goes out as a binary part under its slot name, with file name and MIME type
//! - Every part body is streamed in 64 KiB chunks through a shared [`Progress`] so the upload can be tracked
//!
//! Progress is bytes handed to the transport over total part bytes, multipart framing not included.
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use futures_util::{Stream, stream};
use reqwest::{
    Body,
    multipart::{Form, Part},
};

use crate::{error::ClientError, record::SubmissionRecord};

pub const CHUNK_SIZE: usize = 64 * 1024;

pub type ProgressObserver = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Clone)]
pub struct Progress {
    loaded: Arc<AtomicU64>,
    reported: Arc<AtomicU8>,
    total: u64,
    observer: Option<ProgressObserver>,
}

impl Progress {
    pub fn new(total: u64, observer: Option<ProgressObserver>) -> Self {
        Self {
            loaded: Arc::new(AtomicU64::new(0)),
            reported: Arc::new(AtomicU8::new(0)),
            total,
            observer,
        }
    }

    pub fn advance(&self, bytes: u64) {
        let loaded = self.loaded.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let current = percent(loaded, self.total);

        if self.reported.swap(current, Ordering::Relaxed) != current {
            if let Some(observer) = &self.observer {
                observer(current);
            }
        }
    }

    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn percent(&self) -> u8 {
        percent(self.loaded(), self.total)
    }
}

pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    let rounded = (loaded as f64 * 100.0 / total as f64).round();
    rounded.clamp(0.0, 100.0) as u8
}

pub struct Payload {
    pub form: Form,
    pub progress: Progress,
}

pub fn build_payload(
    record: &SubmissionRecord,
    observer: Option<ProgressObserver>,
) -> Result<Payload, ClientError> {
    let texts: Vec<(String, Bytes)> = record
        .fields()
        .map(|(name, value)| (name.to_string(), Bytes::from(value.to_form_string())))
        .collect();

    let total = texts.iter().map(|(_, text)| text.len() as u64).sum::<u64>()
        + record.files().map(|(_, file)| file.len()).sum::<u64>();

    let progress = Progress::new(total, observer);
    let mut form = Form::new();

    for (name, text) in texts {
        form = form.part(name, tracked_part(text, &progress));
    }

    for (slot, file) in record.files() {
        let part = tracked_part(file.bytes.clone(), &progress)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ClientError::InvalidValue {
                field: slot.to_string(),
                reason: e.to_string(),
            })?;

        form = form.part(slot.field_name(), part);
    }

    Ok(Payload { form, progress })
}

fn tracked_part(bytes: Bytes, progress: &Progress) -> Part {
    let len = bytes.len() as u64;

    Part::stream_with_length(Body::wrap_stream(chunked(bytes, progress.clone())), len)
}

fn chunked(bytes: Bytes, progress: Progress) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(bytes.len())))
        .collect();

    stream::iter(chunks.into_iter().map(move |chunk| {
        progress.advance(chunk.len() as u64);
        Ok::<_, io::Error>(chunk)
    }))
}
