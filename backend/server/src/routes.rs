use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};

use axum::{
    Json,
    extract::{Multipart, State as AxumState, multipart::Field},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::AppError,
    state::State,
    storage::{Slot, StoredFile, store_field},
};

pub const SUCCESS_MESSAGE: &str = "Form submitted successfully";

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub message: &'static str,
    pub data: BTreeMap<String, String>,
    pub files: BTreeMap<&'static str, StoredFile>,
}

pub async fn storage_request_handler(
    AxumState(state): AxumState<Arc<State>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut data = BTreeMap::new();
    let mut files = BTreeMap::new();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            warn!("Skipping part without a name");
            drain(&mut field).await?;
            continue;
        };

        match field.file_name().map(str::is_empty) {
            None => {
                data.insert(name, field.text().await?);
                continue;
            }
            // Empty file inputs still send a part, with an empty filename.
            Some(true) => {
                drain(&mut field).await?;
                continue;
            }
            Some(false) => {}
        }

        let slot = Slot::from_field_name(&name).ok_or(AppError::UnexpectedFile(name))?;

        match files.entry(slot.field_name()) {
            Entry::Vacant(entry) => {
                entry.insert(store_field(&state.config.uploads_dir, slot, field).await?);
            }
            Entry::Occupied(entry) => {
                warn!(
                    "Ignoring extra file {:?} for {}",
                    field.file_name().unwrap_or_default(),
                    entry.key()
                );
            }
        }
    }

    info!("Received data: {data:?}");
    info!("Received files: {files:?}");

    let acknowledgement = Acknowledgement {
        message: SUCCESS_MESSAGE,
        data,
        files,
    };

    Ok((StatusCode::OK, Json(acknowledgement)))
}

async fn drain(field: &mut Field<'_>) -> Result<(), AppError> {
    while field.chunk().await?.is_some() {}
    Ok(())
}
