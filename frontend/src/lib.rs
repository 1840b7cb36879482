//! # Storage Request Form
//!
//! Client side of the DNA sample storage request.
//!
//! ## Flow
//! - A fresh [`SubmissionRecord`] holds every catalog field at its initial value
//! - Field/file handlers update the record as the user fills it in
//! - Submit checks first name, last name and email before anything touches the network
//! - One multipart `POST` per submit, upload progress reported 0-100
//! - 200: error cleared, acknowledgement kept, record reset
//! - Anything else: error message kept, record left as is for another try
//!
//! No automatic retries, the user submits again.
pub mod client;
pub mod error;
pub mod payload;
pub mod record;
pub mod schema;

pub use client::{Acknowledgement, DEFAULT_ENDPOINT, FormClient, StoredFile};
pub use error::ClientError;
pub use payload::ProgressObserver;
pub use record::{AttachedFile, FieldValue, SubmissionRecord};
pub use schema::Slot;
