use crate::config::Config;
use crate::fields::SanitizedFields;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderName {
    From,
    Cc,
    Bcc,
}

impl HeaderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderName::From => "From",
            HeaderName::Cc => "Cc",
            HeaderName::Bcc => "Bcc",
        }
    }
}

/// One address header of the outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderLine {
    pub name: HeaderName,
    pub display_name: Option<String>,
    pub address: String,
}

impl fmt::Display for HeaderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(display_name) => write!(
                f,
                "{}: {} <{}>",
                self.name.as_str(),
                display_name,
                self.address
            ),
            None => write!(f, "{}: {}", self.name.as_str(), self.address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub headers: Vec<HeaderLine>,
    pub reply_address: String,
    /// Envelope sender, taken from the static configuration
    pub sender: String,
    /// Submitted values, kept for the audit record
    pub fields: SanitizedFields,
}

impl ComposedMessage {
    /// Headers rendered as `Name: value` lines, in order.
    pub fn header_lines(&self) -> Vec<String> {
        self.headers.iter().map(ToString::to_string).collect()
    }
}

pub fn compose(fields: &SanitizedFields, config: &Config) -> ComposedMessage {
    let reply_address = if fields.email.is_empty() {
        config.from.clone()
    } else {
        fields.email.clone()
    };

    let body = format!(
        "Name: {}\n\nEmail: {}\n\nSubject: {}\n\nMessage:\n\n{}",
        fields.username, fields.email, fields.subject, fields.message
    );

    let mut headers = vec![HeaderLine {
        name: HeaderName::From,
        display_name: Some(fields.username.clone()),
        address: reply_address.clone(),
    }];
    if !config.cc.is_empty() {
        headers.push(HeaderLine {
            name: HeaderName::Cc,
            display_name: None,
            address: config.cc.clone(),
        });
    }
    if !config.bcc.is_empty() {
        headers.push(HeaderLine {
            name: HeaderName::Bcc,
            display_name: None,
            address: config.bcc.clone(),
        });
    }

    ComposedMessage {
        recipient: config.to.clone(),
        subject: config.subject.clone(),
        body,
        headers,
        reply_address,
        sender: config.from.clone(),
        fields: fields.clone(),
    }
}
