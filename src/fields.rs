use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed set of contact form fields.
///
/// Every map in the pipeline is keyed by this enum, so a submission can never
/// introduce a key the form does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Username,
    Email,
    Subject,
    Message,
}

impl Field {
    /// Form order, which is also the order values are concatenated for the spam scan.
    pub const ALL: [Field; 4] = [Field::Username, Field::Email, Field::Subject, Field::Message];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Subject => "subject",
            Field::Message => "message",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown form field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "username" => Ok(Field::Username),
            "email" => Ok(Field::Email),
            "subject" => Ok(Field::Subject),
            "message" => Ok(Field::Message),
            other => Err(UnknownField(other.to_string())),
        }
    }
}

/// Form values exactly as the presentation layer received them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubmission {
    values: BTreeMap<Field, String>,
}

impl RawSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.values.insert(field, value.to_string());
        self
    }

    /// Build a submission from name/value pairs, dropping names outside the form.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = BTreeMap::new();
        for (name, value) in pairs {
            match name.as_ref().parse::<Field>() {
                Ok(field) => {
                    values.insert(field, value.into());
                }
                Err(e) => log::debug!("Ignoring submitted value: {e}"),
            }
        }
        Self { values }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// All submitted values joined with no separator, in form order.
    pub fn concatenated(&self) -> String {
        Field::ALL
            .iter()
            .filter_map(|field| self.get(*field))
            .collect()
    }
}

/// Trimmed and un-escaped values for every form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedFields {
    pub username: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl SanitizedFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::Subject => &self.subject,
            Field::Message => &self.message,
        }
    }

    pub(crate) fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Username => self.username = value,
            Field::Email => self.email = value,
            Field::Subject => self.subject = value,
            Field::Message => self.message = value,
        }
    }
}

impl From<&SanitizedFields> for RawSubmission {
    fn from(fields: &SanitizedFields) -> Self {
        Self::from_pairs(Field::ALL.iter().map(|f| (f.as_str(), fields.get(*f))))
    }
}
