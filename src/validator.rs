use crate::fields::{Field, SanitizedFields};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

lazy_static! {
    static ref EMAIL_FORBIDDEN: Regex =
        Regex::new(r#"[()<>,;:\\"\[\]]"#).expect("forbidden character pattern is valid");
    // local@label.rest where the address ends in two word characters
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[^@]+@[^@.]+\.[^@]*[0-9A-Za-z_]{2}$")
        .expect("email shape pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Required,
    InvalidFormat,
    Spam,
}

/// Key of an error entry: a form field, or the form-wide spam marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKey {
    Field(Field),
    Spam,
}

impl ErrorKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKey::Field(field) => field.as_str(),
            ErrorKey::Spam => "spam",
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<Field> for ErrorKey {
    fn from(field: Field) -> Self {
        ErrorKey::Field(field)
    }
}

/// Errors found in one submission. Empty means the submission may be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<ErrorKey, ErrorKind>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<ErrorKey>, kind: ErrorKind) {
        self.0.insert(key.into(), kind);
    }

    pub fn get(&self, key: impl Into<ErrorKey>) -> Option<ErrorKind> {
        self.0.get(&key.into()).copied()
    }

    pub fn contains(&self, key: impl Into<ErrorKey>) -> bool {
        self.0.contains_key(&key.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_spam(&self) -> bool {
        self.contains(ErrorKey::Spam)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ErrorKey, ErrorKind)> + '_ {
        self.0.iter().map(|(key, kind)| (*key, *kind))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    !EMAIL_FORBIDDEN.is_match(email) && EMAIL_SHAPE.is_match(email)
}

/// Check the required fields and the email address.
///
/// Every rule runs even when an earlier one failed, so the visitor sees all
/// problems at once. The subject is optional and never checked.
pub fn validate(fields: &SanitizedFields) -> ErrorMap {
    let mut errors = ErrorMap::new();

    if fields.username.is_empty() {
        errors.insert(Field::Username, ErrorKind::Required);
    }

    if fields.email.is_empty() {
        errors.insert(Field::Email, ErrorKind::Required);
    } else if !is_valid_email(&fields.email) {
        errors.insert(Field::Email, ErrorKind::InvalidFormat);
    }

    if fields.message.is_empty() {
        errors.insert(Field::Message, ErrorKind::Required);
    }

    for (key, kind) in errors.iter() {
        log::debug!("Field {key} failed validation: {kind:?}");
    }

    errors
}
