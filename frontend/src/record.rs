use std::{collections::BTreeMap, path::Path};

use bytes::Bytes;
use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::{
    error::ClientError,
    schema::{FIELDS, FieldKind, REQUIRED_FIELDS, Slot, field_spec, label},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn initial(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        }
    }

    pub fn parse(kind: FieldKind, raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();

        if trimmed.is_empty() && kind != FieldKind::Checkbox {
            return Ok(FieldValue::Text(String::new()));
        }

        match kind {
            FieldKind::Text | FieldKind::Email | FieldKind::Url => {
                Ok(FieldValue::Text(raw.to_string()))
            }
            FieldKind::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| format!("{trimmed:?} is not a number")),
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|e| format!("{trimmed:?} is not a YYYY-MM-DD date ({e})")),
            FieldKind::Checkbox => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "off" | "no" | "0" | "" => Ok(FieldValue::Bool(false)),
                _ => Err(format!("{trimmed:?} is not a checkbox value")),
            },
        }
    }

    pub fn to_form_string(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Date(date) => date.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttachedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl AttachedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::File {
                path: path.to_path_buf(),
                source,
            })?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        let mime_type = mime_guess::from_path(path).first_or_octet_stream();

        Ok(Self::new(file_name, mime_type.to_string(), bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One form load worth of input: every catalog field plus the three file slots.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionRecord {
    fields: BTreeMap<String, FieldValue>,
    files: BTreeMap<Slot, AttachedFile>,
}

impl Default for SubmissionRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionRecord {
    pub fn new() -> Self {
        let fields = FIELDS
            .iter()
            .map(|spec| (spec.name.to_string(), FieldValue::initial(spec.kind)))
            .collect();

        Self {
            fields,
            files: BTreeMap::new(),
        }
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Raw input from a text-like control, parsed by the catalog kind of `name`.
    /// Names outside the catalog are kept as plain text.
    pub fn handle_change(&mut self, name: &str, raw: &str) -> Result<(), ClientError> {
        let kind = field_spec(name).map_or(FieldKind::Text, |spec| spec.kind);

        let value = FieldValue::parse(kind, raw).map_err(|reason| ClientError::InvalidValue {
            field: name.to_string(),
            reason,
        })?;

        self.set_field(name, value);
        Ok(())
    }

    pub fn set_checked(&mut self, name: &str, checked: bool) {
        self.set_field(name, FieldValue::Bool(checked));
    }

    /// Fills fields from a JSON object of scalars. `null` leaves a field untouched.
    pub fn apply_json(&mut self, values: &Map<String, Value>) -> Result<(), ClientError> {
        for (name, value) in values {
            match value {
                Value::Null => {}
                Value::Bool(checked) => self.set_checked(name, *checked),
                Value::Number(n) => self.handle_change(name, &n.to_string())?,
                Value::String(raw) => self.handle_change(name, raw)?,
                Value::Array(_) | Value::Object(_) => {
                    return Err(ClientError::InvalidValue {
                        field: name.clone(),
                        reason: "expected a string, number or boolean".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn handle_file_change(&mut self, slot: Slot, file: Option<AttachedFile>) {
        match file {
            Some(file) => {
                self.files.insert(slot, file);
            }
            None => {
                self.files.remove(&slot);
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn file(&self, slot: Slot) -> Option<&AttachedFile> {
        self.files.get(&slot)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn files(&self) -> impl Iterator<Item = (Slot, &AttachedFile)> {
        self.files.iter().map(|(slot, file)| (*slot, file))
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        for name in REQUIRED_FIELDS {
            if self.field(name).is_none_or(FieldValue::is_blank) {
                return Err(ClientError::Validation(label(name)));
            }
        }

        Ok(())
    }
}
