use std::{io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Please fill in the required requester field: {0}")]
    Validation(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error submitting the form: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with {status}: {message}")]
    Rejected { status: StatusCode, message: String },
}
