use crate::audit::AuditLog;
use crate::composer::ComposedMessage;
use crate::transport::{MailTransport, TransportError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub delivered: bool,
    pub logged_to_audit: bool,
}

/// Sends composed messages and records them in the optional audit log.
pub struct DeliveryChannel {
    transport: Box<dyn MailTransport>,
    audit_log: Option<Arc<AuditLog>>,
    timeout: Duration,
}

impl DeliveryChannel {
    pub fn new(transport: Box<dyn MailTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            audit_log: None,
            timeout,
        }
    }

    pub fn with_audit_log(mut self, audit_log: AuditLog) -> Self {
        self.audit_log = Some(Arc::new(audit_log));
        self
    }

    /// Attempt delivery exactly once. Neither a transport nor a log failure
    /// is returned as an error; both are folded into the result.
    pub async fn deliver(&self, message: &ComposedMessage) -> DeliveryResult {
        let delivered = match self.send_with_timeout(message).await {
            Ok(()) => {
                log::info!(
                    "Contact message delivered to {} via {}",
                    message.recipient,
                    self.transport.name()
                );
                true
            }
            Err(e) => {
                log::warn!("Contact message delivery failed: {e}");
                false
            }
        };

        let logged_to_audit = match &self.audit_log {
            Some(audit_log) => self.append_audit(audit_log, message).await,
            None => false,
        };

        DeliveryResult {
            delivered,
            logged_to_audit,
        }
    }

    // File I/O under the log mutex runs on the blocking pool, off the worker thread.
    async fn append_audit(&self, audit_log: &Arc<AuditLog>, message: &ComposedMessage) -> bool {
        let audit_log = Arc::clone(audit_log);
        let fields = message.fields.clone();
        match tokio::task::spawn_blocking(move || audit_log.append(&fields)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::error!("Failed to append audit record: {e}");
                false
            }
            Err(e) => {
                log::error!("Audit append task did not finish: {e}");
                false
            }
        }
    }

    async fn send_with_timeout(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}
