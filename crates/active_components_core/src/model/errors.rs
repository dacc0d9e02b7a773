//! Append-only validation error log.
//!
//! # Responsibility
//! - Collect `(attribute, message)` failures for one validation/persist cycle.
//! - Render message templates, optionally through a translator.
//!
//! # Invariants
//! - Entries are never deduplicated or reordered.
//! - `add_error` grows the log by exactly one entry.

use serde::{Deserialize, Serialize};

/// Failure category of one recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// `required` rule failed.
    Required,
    /// `match` rule failed.
    Pattern,
    /// `email` or `url` rule failed.
    Format,
    /// Recorded by, or on behalf of, a custom validator.
    Custom,
    /// Storage rejected an insert or update.
    Persistence,
}

/// One recorded failure.
///
/// `message` is a template; its first `%s` stands for the attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub attribute: String,
    pub message: String,
    pub kind: ErrorKind,
}

impl ValidationError {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            attribute: attribute.into(),
            message: message.into(),
            kind,
        }
    }

    /// Returns the message with `%s` replaced by the attribute name.
    pub fn render(&self) -> String {
        substitute(&self.message, &self.attribute)
    }
}

/// Localizes message templates before placeholder substitution.
pub trait Translator {
    fn translate(&self, message: &str) -> String;
}

impl<F> Translator for F
where
    F: Fn(&str) -> String,
{
    fn translate(&self, message: &str) -> String {
        self(message)
    }
}

/// Ordered error accumulator shared by every model type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<ValidationError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.entries
    }

    /// Appends `errors` after the existing entries.
    pub fn set_errors(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.entries.extend(errors);
    }

    pub fn add_error(
        &mut self,
        attribute: impl Into<String>,
        message: impl Into<String>,
        kind: ErrorKind,
    ) {
        self.entries.push(ValidationError::new(attribute, message, kind));
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.entries
    }

    /// Returns `(attribute, rendered message)` pairs.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|error| (error.attribute.clone(), error.render()))
            .collect()
    }

    /// Returns `(attribute, message)` pairs translated before substitution.
    pub fn translated(&self, translator: &dyn Translator) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|error| {
                let template = translator.translate(&error.message);
                (error.attribute.clone(), substitute(&template, &error.attribute))
            })
            .collect()
    }
}

fn substitute(template: &str, attribute: &str) -> String {
    template.replacen("%s", attribute, 1)
}
