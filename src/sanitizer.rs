use crate::config::SpamPolicy;
use crate::fields::{Field, RawSubmission, SanitizedFields};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Mail headers a bot would try to smuggle into the outgoing message
    static ref HEADER_TOKENS: Regex = Regex::new(
        r"(?i)to:|from:|bcc:|cc:|content-transfer-encoding:|content-type:|mime-version:"
    )
    .expect("header token pattern is valid");
    // A tag starts with a name, a closing slash, a comment or a declaration
    static ref MARKUP_TAGS: Regex =
        Regex::new(r"(?s)<[A-Za-z/!?][^>]*(?:>|$)").expect("markup tag pattern is valid");
}

/// Characters trimmed from both ends of every value.
fn is_form_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

/// Undo the quote escaping some front ends apply to posted values.
///
/// Only `\'`, `\"`, `\\` and `\0` are treated as escapes; any other backslash
/// is part of the value and kept.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\'') | Some('"') | Some('\\') => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            Some('0') => {
                chars.next();
                out.push('\0');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Remove header tokens and markup from a value instead of rejecting it.
pub fn strip_spam_markup(value: &str) -> String {
    let without_headers = HEADER_TOKENS.replace_all(value, "");
    MARKUP_TAGS.replace_all(&without_headers, "").into_owned()
}

fn clean(value: &str) -> String {
    unescape(value).trim_matches(is_form_whitespace).to_string()
}

/// Normalise every form field. Missing fields become empty strings.
pub fn sanitize(raw: &RawSubmission) -> SanitizedFields {
    sanitize_with_policy(raw, SpamPolicy::Reject)
}

pub fn sanitize_with_policy(raw: &RawSubmission, policy: SpamPolicy) -> SanitizedFields {
    let mut fields = SanitizedFields::default();

    for field in Field::ALL {
        let value = match raw.get(field) {
            Some(value) if policy == SpamPolicy::Strip => clean(&strip_spam_markup(value)),
            Some(value) => clean(value),
            None => String::new(),
        };
        fields.set(field, value);
    }

    fields
}
