use std::{collections::BTreeMap, time::Instant};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    error::ClientError,
    payload::{Payload, ProgressObserver, build_payload},
    record::{AttachedFile, SubmissionRecord},
    schema::Slot,
};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/storage-requests";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub field_name: String,
    pub stored_name: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub message: String,
    pub data: BTreeMap<String, String>,
    pub files: BTreeMap<String, StoredFile>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Form state between page load and a successful submit.
///
/// A failed submit keeps the record so it can be corrected and sent again.
pub struct FormClient {
    endpoint: String,
    http: Client,
    record: SubmissionRecord,
    loading: bool,
    error: Option<String>,
    progress: u8,
    confirmation: Option<Acknowledgement>,
    observer: Option<ProgressObserver>,
}

impl FormClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_http_client(endpoint, Client::new())
    }

    pub fn with_http_client(endpoint: impl Into<String>, http: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
            record: SubmissionRecord::new(),
            loading: false,
            error: None,
            progress: 0,
            confirmation: None,
            observer: None,
        }
    }

    pub fn on_progress(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn handle_change(&mut self, name: &str, raw: &str) -> Result<(), ClientError> {
        self.record.handle_change(name, raw)
    }

    pub fn set_checked(&mut self, name: &str, checked: bool) {
        self.record.set_checked(name, checked);
    }

    pub fn handle_file_change(&mut self, slot: Slot, file: Option<AttachedFile>) {
        self.record.handle_file_change(slot, file);
    }

    pub fn record(&self) -> &SubmissionRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut SubmissionRecord {
        &mut self.record
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn confirmation(&self) -> Option<&Acknowledgement> {
        self.confirmation.as_ref()
    }

    pub async fn submit(&mut self) -> Result<Acknowledgement, ClientError> {
        self.loading = true;
        self.error = None;
        self.progress = 0;
        self.confirmation = None;

        let result = self.send().await;
        self.loading = false;

        match result {
            Ok(acknowledgement) => {
                info!("Form submitted successfully: {acknowledgement:?}");

                self.record = SubmissionRecord::new();
                self.confirmation = Some(acknowledgement.clone());

                Ok(acknowledgement)
            }
            Err(e) => {
                error!("Error: {e}");
                self.error = Some(e.to_string());

                Err(e)
            }
        }
    }

    async fn send(&mut self) -> Result<Acknowledgement, ClientError> {
        self.record.validate()?;

        let Payload { form, progress } = build_payload(&self.record, self.observer.clone())?;

        let start = Instant::now();
        let response = self.http.post(&self.endpoint).multipart(form).send().await;
        self.progress = progress.percent();

        let response = response?;
        info!(
            "Total submit time: {:.3} seconds",
            start.elapsed().as_secs_f64()
        );

        let status = response.status();
        if status != StatusCode::OK {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("Unexpected response")
                    .to_string(),
            };

            return Err(ClientError::Rejected { status, message });
        }

        Ok(response.json().await?)
    }
}
