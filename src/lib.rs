pub mod audit;
pub mod composer;
pub mod config;
pub mod delivery;
pub mod display;
pub mod fields;
pub mod sanitizer;
pub mod spam;
pub mod submission;
pub mod transport;
pub mod validator;

pub use composer::{compose, ComposedMessage};
pub use config::Config;
pub use delivery::{DeliveryChannel, DeliveryResult};
pub use fields::{Field, RawSubmission, SanitizedFields};
pub use sanitizer::sanitize;
pub use spam::detect_spam;
pub use submission::{SubmissionHandler, SubmissionOutcome, SubmissionState};
pub use transport::MailTransport;
pub use validator::{validate, ErrorKind, ErrorMap};
