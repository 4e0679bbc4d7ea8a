use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldErrors, Result};

pub const MAX_SUBJECT_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;

/// A stored entry joined with its owner's name.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub user: String,
    pub subject: String,
    pub message: String,
    pub created_date: DateTime<Utc>,
}

/// Submission body as received; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub name: String,
    pub subject: String,
    pub message: String,
}

impl EntryPayload {
    #[cfg(test)]
    pub fn new(name: &str, subject: &str, message: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            subject: Some(subject.to_string()),
            message: Some(message.to_string()),
        }
    }

    /// Trims every field and checks presence and length, reporting all bad fields at once.
    pub fn validate(self) -> Result<NewEntry> {
        let mut errors = FieldErrors::new();

        let name = required_text(&mut errors, "name", self.name, Some(MAX_NAME_LEN));
        let subject = required_text(&mut errors, "subject", self.subject, Some(MAX_SUBJECT_LEN));
        let message = required_text(&mut errors, "message", self.message, None);

        match (name, subject, message) {
            (Some(name), Some(subject), Some(message)) if errors.is_empty() => Ok(NewEntry {
                name,
                subject,
                message,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<String>,
    max_len: Option<usize>,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, "This field is required.");
        return None;
    };

    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
        return None;
    }

    if let Some(max) = max_len {
        if value.chars().count() > max {
            errors.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
            return None;
        }
    }

    Some(value.to_string())
}
