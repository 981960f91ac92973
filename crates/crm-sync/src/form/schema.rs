//! Field errors and the validation rules schemas are built from

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SyncError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

/// One fixed field set and how to validate it
pub trait FormSchema {
    /// Raw values as typed into the form
    type Values: Clone + Default + fmt::Debug + PartialEq;
    /// What an edit form is pre-populated from
    type Source;
    /// Typed payload produced by a valid form
    type Output;

    fn from_source(source: &Self::Source) -> Self::Values;

    /// Id of the entity being edited, if the source has one
    fn source_id(source: &Self::Source) -> Option<String>;

    fn validate(values: &Self::Values) -> Result<Self::Output, FieldErrors>;
}

/// Per-field messages in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; the first message of a field wins
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.entries.push((field.to_string(), message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    /// `Ok(value)` when no field failed
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (field, message)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
        }
        Ok(())
    }
}

impl From<FieldErrors> for SyncError {
    fn from(errors: FieldErrors) -> Self {
        SyncError::Validation(errors)
    }
}

// ========================
// Rules
// ========================

pub(crate) fn min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

pub(crate) fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub(crate) fn is_http_url(value: &str) -> bool {
    HTTP_URL.is_match(value)
}

pub(crate) fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// Empty optional text is sent as absent
pub(crate) fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.insert("name", "too short");
        errors.insert("name", "other");
        errors.insert("email", "bad");
        assert_eq!(errors.get("name"), Some("too short"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "name: too short; email: bad");
    }

    #[test]
    fn test_rules() {
        assert!(min_chars("Zé", 2));
        assert!(!min_chars("Z", 2));
        assert!(is_email("ana@x.com"));
        assert!(!is_email("ana@x"));
        assert!(!is_email("ana @x.com"));
        assert!(is_http_url("https://cdn.example.com/a.png"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(is_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!is_uuid("c1"));
        assert_eq!(optional("  "), None);
        assert_eq!(optional("Acme"), Some("Acme".to_string()));
    }
}
