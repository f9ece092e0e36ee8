use crate::audit::AuditLog;
use crate::composer::compose;
use crate::config::{Config, SpamPolicy};
use crate::delivery::{DeliveryChannel, DeliveryResult};
use crate::display::{self, FieldStatus};
use crate::fields::{Field, RawSubmission, SanitizedFields};
use crate::sanitizer::sanitize_with_policy;
use crate::spam::detect_spam;
use crate::transport::{build_transport, MailTransport};
use crate::validator::{validate, ErrorKey, ErrorKind, ErrorMap};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionState {
    /// No payload arrived, the page shows a blank form
    Idle,
    Validating,
    /// Validation or the spam check failed, nothing was sent
    Rejected,
    Sending,
    Completed,
    /// The transport refused or timed out
    DeliveryFailed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Idle
                | SubmissionState::Rejected
                | SubmissionState::Completed
                | SubmissionState::DeliveryFailed
        )
    }
}

/// Everything the page needs to render the response to one request.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub state: SubmissionState,
    pub success: bool,
    pub errors: ErrorMap,
    pub echoed_fields: SanitizedFields,
    pub delivery: Option<DeliveryResult>,
}

impl SubmissionOutcome {
    fn idle() -> Self {
        Self {
            state: SubmissionState::Idle,
            success: false,
            errors: ErrorMap::new(),
            echoed_fields: SanitizedFields::default(),
            delivery: None,
        }
    }

    pub fn submitted(&self) -> bool {
        self.state != SubmissionState::Idle
    }

    /// Styling tag for a field; `None` until something was submitted.
    pub fn field_status(&self, field: Field) -> Option<FieldStatus> {
        self.submitted()
            .then(|| display::field_status(field, &self.errors))
    }

    pub fn error_message(&self, field: Field) -> Option<&'static str> {
        display::error_message(field, &self.errors)
    }

    /// Form-level message shown above the form, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self.state {
            SubmissionState::Completed => Some(display::THANK_YOU_NOTICE),
            SubmissionState::DeliveryFailed => Some(display::DELIVERY_FAILED_NOTICE),
            _ => display::rejection_notice(&self.errors),
        }
    }

    /// Once the server has validated, client-side validation should stand down.
    pub fn novalidate(&self) -> bool {
        self.submitted()
    }
}

/// Runs one submission through validation, the spam check and delivery.
pub struct SubmissionHandler {
    config: Config,
    channel: DeliveryChannel,
}

impl SubmissionHandler {
    pub fn new(config: Config, transport: Box<dyn MailTransport>) -> Self {
        let mut channel = DeliveryChannel::new(transport, config.delivery_timeout());
        if let Some(path) = &config.audit_log {
            log::info!("Recording submissions to audit log: {path}");
            channel = channel.with_audit_log(AuditLog::new(path));
        }
        Self { config, channel }
    }

    /// Build a handler with the transport the configuration names.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let transport = build_transport(&config)?;
        Ok(Self::new(config, transport))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Collect every problem with a submission without sending anything.
    pub fn check(&self, raw: &RawSubmission) -> (SanitizedFields, ErrorMap) {
        let fields = sanitize_with_policy(raw, self.config.spam_policy);
        let mut errors = validate(&fields);

        if self.config.spam_policy == SpamPolicy::Reject && detect_spam(&raw.concatenated()) {
            errors.insert(ErrorKey::Spam, ErrorKind::Spam);
        }

        (fields, errors)
    }

    pub async fn handle(&self, raw: Option<&RawSubmission>) -> SubmissionOutcome {
        let Some(raw) = raw else {
            return SubmissionOutcome::idle();
        };

        let mut state = SubmissionState::Validating;
        log::debug!("Submission state: {state:?}");

        let (fields, errors) = self.check(raw);
        if !errors.is_empty() {
            if errors.is_spam() {
                log::info!("Rejected contact submission as spam");
            } else {
                log::info!("Rejected contact submission with {} field error(s)", errors.len());
            }
            return SubmissionOutcome {
                state: SubmissionState::Rejected,
                success: false,
                errors,
                echoed_fields: fields,
                delivery: None,
            };
        }

        state = SubmissionState::Sending;
        log::debug!("Submission state: {state:?}");

        let message = compose(&fields, &self.config);
        let delivery = self.channel.deliver(&message).await;

        state = if delivery.delivered {
            SubmissionState::Completed
        } else {
            SubmissionState::DeliveryFailed
        };
        log::debug!("Submission state: {state:?}");

        SubmissionOutcome {
            state,
            success: delivery.delivered,
            errors,
            echoed_fields: fields,
            delivery: Some(delivery),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::delivery::test_support::RecordingTransport;
    use crate::display::{ERRORS_NOTICE, SPAM_NOTICE, THANK_YOU_NOTICE};

    fn alice() -> RawSubmission {
        RawSubmission::new()
            .with(Field::Username, "Alice")
            .with(Field::Email, "alice@example.com")
            .with(Field::Subject, "Hi")
            .with(Field::Message, "Hello there")
    }

    fn handler(config: Config) -> (SubmissionHandler, RecordingTransport) {
        let transport = RecordingTransport::default();
        let handler = SubmissionHandler::new(config, Box::new(transport.clone()));
        (handler, transport)
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let (handler, transport) = handler(Config::default());

        let outcome = handler.handle(Some(&alice())).await;

        assert_eq!(outcome.state, SubmissionState::Completed);
        assert!(outcome.success);
        assert!(outcome.errors.is_empty());
        assert_eq!(
            outcome.delivery,
            Some(DeliveryResult {
                delivered: true,
                logged_to_audit: false,
            })
        );
        assert_eq!(outcome.notice(), Some(THANK_YOU_NOTICE));
        assert_eq!(outcome.field_status(Field::Username), Some(FieldStatus::Valid));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let body = &sent[0].body;
        let sections = [
            "Name: Alice",
            "Email: alice@example.com",
            "Subject: Hi",
            "Message:\n\nHello there",
        ];
        let positions: Vec<usize> = sections
            .iter()
            .map(|section| body.find(section).expect("section present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_no_payload_stays_idle() {
        let (handler, transport) = handler(Config::default());

        let outcome = handler.handle(None).await;

        assert_eq!(outcome.state, SubmissionState::Idle);
        assert!(!outcome.success);
        assert!(!outcome.novalidate());
        assert_eq!(outcome.field_status(Field::Email), None);
        assert_eq!(outcome.notice(), None);
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_fields_block_delivery() {
        let (handler, transport) = handler(Config::default());
        let raw = RawSubmission::new().with(Field::Subject, "Just a subject");

        let outcome = handler.handle(Some(&raw)).await;

        assert_eq!(outcome.state, SubmissionState::Rejected);
        assert_eq!(outcome.errors.get(Field::Username), Some(ErrorKind::Required));
        assert_eq!(outcome.errors.get(Field::Email), Some(ErrorKind::Required));
        assert_eq!(outcome.errors.get(Field::Message), Some(ErrorKind::Required));
        assert_eq!(outcome.notice(), Some(ERRORS_NOTICE));
        assert_eq!(outcome.error_message(Field::Email), Some("required"));
        assert_eq!(outcome.field_status(Field::Subject), Some(FieldStatus::Valid));
        assert_eq!(outcome.echoed_fields.subject, "Just a subject");
        assert!(outcome.delivery.is_none());
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_link_in_message_is_spam() {
        let (handler, transport) = handler(Config::default());
        let raw = alice().with(Field::Message, "visit http://evil.com");

        let outcome = handler.handle(Some(&raw)).await;

        assert_eq!(outcome.state, SubmissionState::Rejected);
        assert_eq!(outcome.errors.get(ErrorKey::Spam), Some(ErrorKind::Spam));
        assert_eq!(outcome.notice(), Some(SPAM_NOTICE));
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_spam_coexists_with_field_errors() {
        let (handler, _transport) = handler(Config::default());
        let raw = RawSubmission::new().with(Field::Subject, "cheap www.pills.example");

        let outcome = handler.handle(Some(&raw)).await;

        assert!(outcome.errors.is_spam());
        assert!(outcome.errors.contains(Field::Username));
        assert_eq!(outcome.notice(), Some(SPAM_NOTICE));
    }

    #[tokio::test]
    async fn test_strip_policy_sends_cleaned_message() {
        let config = Config {
            spam_policy: SpamPolicy::Strip,
            ..Default::default()
        };
        let (handler, transport) = handler(config);
        let raw = alice().with(Field::Message, "Hello <b>there</b>\nbcc: x@example.com");

        let outcome = handler.handle(Some(&raw)).await;

        assert!(outcome.success);
        assert_eq!(outcome.echoed_fields.message, "Hello there\n x@example.com");
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let transport = RecordingTransport::failing();
        let handler = SubmissionHandler::new(Config::default(), Box::new(transport.clone()));

        let outcome = handler.handle(Some(&alice())).await;

        assert_eq!(outcome.state, SubmissionState::DeliveryFailed);
        assert!(!outcome.success);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.notice(), Some(display::DELIVERY_FAILED_NOTICE));
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_multi_line_username_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            transport: TransportConfig::File {
                directory: dir.path().to_str().unwrap().to_string(),
            },
            ..Default::default()
        };
        let handler = SubmissionHandler::from_config(config).unwrap();

        for username in ["Alice\nSmith", "Alice\r\nX-Injected: yes"] {
            let raw = alice().with(Field::Username, username);
            let outcome = handler.handle(Some(&raw)).await;
            assert_eq!(outcome.state, SubmissionState::Completed, "{username:?}");
            assert!(outcome.success);
        }

        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 2);
    }

    #[tokio::test]
    async fn test_audit_log_receives_sanitized_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contact.csv");
        let config = Config {
            audit_log: Some(path.to_str().unwrap().to_string()),
            ..Default::default()
        };
        let (handler, _transport) = handler(config);
        let raw = alice().with(Field::Username, "  O\\'Brien, Pat ");

        let outcome = handler.handle(Some(&raw)).await;
        assert_eq!(outcome.delivery.map(|d| d.logged_to_audit), Some(true));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[1], "O'Brien, Pat");
        assert_eq!(&row[4], "Hello there");
    }

    #[tokio::test]
    async fn test_outcome_serializes_for_templates() {
        let (handler, _transport) = handler(Config::default());
        let raw = alice().with(Field::Email, "john@example");

        let outcome = handler.handle(Some(&raw)).await;
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["state"], "Rejected");
        assert_eq!(json["errors"]["email"], "InvalidFormat");
        assert_eq!(json["echoed_fields"]["username"], "Alice");
    }

    #[test]
    fn test_terminal_states() {
        assert!(SubmissionState::Completed.is_terminal());
        assert!(SubmissionState::DeliveryFailed.is_terminal());
        assert!(!SubmissionState::Sending.is_terminal());
        assert!(!SubmissionState::Validating.is_terminal());
    }
}
