//! Text the page shows next to the form. Pure functions over the error map,
//! so templates never inspect error kinds themselves.

use crate::fields::Field;
use crate::validator::{ErrorKey, ErrorKind, ErrorMap};
use serde::Serialize;

pub const THANK_YOU_NOTICE: &str = "Your message has been sent. Thank you.";
pub const SPAM_NOTICE: &str =
    "Your message appears to be spam. Please remove any links and try again.";
pub const ERRORS_NOTICE: &str = "Some fields contain errors. Please correct them and try again.";
pub const DELIVERY_FAILED_NOTICE: &str =
    "Your message could not be sent right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Valid,
    Invalid,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Valid => "valid",
            FieldStatus::Invalid => "invalid",
        }
    }
}

pub fn field_status(field: Field, errors: &ErrorMap) -> FieldStatus {
    if errors.contains(field) {
        FieldStatus::Invalid
    } else {
        FieldStatus::Valid
    }
}

pub fn kind_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Required => "required",
        ErrorKind::InvalidFormat => "invalid email address",
        ErrorKind::Spam => "spam",
    }
}

/// Inline message for a field, if it failed.
pub fn error_message(field: Field, errors: &ErrorMap) -> Option<&'static str> {
    errors.get(field).map(kind_message)
}

/// Form-level notice for a rejected submission. Spam takes priority.
pub fn rejection_notice(errors: &ErrorMap) -> Option<&'static str> {
    if errors.contains(ErrorKey::Spam) {
        Some(SPAM_NOTICE)
    } else if !errors.is_empty() {
        Some(ERRORS_NOTICE)
    } else {
        None
    }
}
