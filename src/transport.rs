use crate::composer::{ComposedMessage, HeaderName};
use crate::config::{Config, TlsMode, TransportConfig};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Mailboxes};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{
    Address, AsyncFileTransport, AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport,
    Message, Tokio1Executor,
};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("Transport rejected message: {0}")]
    Send(String),
    #[error("Transport did not answer within {0:?}")]
    Timeout(Duration),
}

/// Something that can hand a composed message to a mail system.
#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError>;
}

fn invalid_address(address: &str, e: lettre::address::AddressError) -> TransportError {
    TransportError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    }
}

/// Flatten a display name onto one line. Header values cannot carry CR/LF.
fn single_line(name: &str) -> String {
    name.split(|c: char| c.is_control() || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mailbox(display_name: Option<&str>, address: &str) -> Result<Mailbox, TransportError> {
    let parsed: Address = address.parse().map_err(|e| invalid_address(address, e))?;
    let name = display_name
        .map(single_line)
        .filter(|name| !name.is_empty());
    Ok(Mailbox::new(name, parsed))
}

/// Cc and Bcc may name several comma-separated addresses.
fn mailbox_list(addresses: &str) -> Result<Mailboxes, TransportError> {
    addresses
        .parse()
        .map_err(|e| invalid_address(addresses, e))
}

/// Convert a composed message into a plain-text RFC 5322 message.
pub fn build_message(message: &ComposedMessage) -> Result<Message, TransportError> {
    let mut builder = Message::builder()
        .to(mailbox(None, &message.recipient)?)
        .sender(mailbox(None, &message.sender)?)
        .reply_to(mailbox(None, &message.reply_address)?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for header in &message.headers {
        builder = match header.name {
            HeaderName::From => {
                builder.from(mailbox(header.display_name.as_deref(), &header.address)?)
            }
            HeaderName::Cc => mailbox_list(&header.address)?
                .into_iter()
                .fold(builder, |builder, mb| builder.cc(mb)),
            HeaderName::Bcc => mailbox_list(&header.address)?
                .into_iter()
                .fold(builder, |builder, mb| builder.bcc(mb)),
        };
    }

    builder
        .body(message.body.clone())
        .map_err(|e| TransportError::Build(e.to_string()))
}

/// Local sendmail binary, the default on most web hosts.
pub struct SendmailTransport {
    inner: AsyncSendmailTransport<Tokio1Executor>,
}

impl SendmailTransport {
    pub fn new(command: Option<&str>) -> Self {
        let inner = match command {
            Some(command) => AsyncSendmailTransport::new_with_command(command),
            None => AsyncSendmailTransport::new(),
        };
        Self { inner }
    }
}

#[async_trait]
impl MailTransport for SendmailTransport {
    fn name(&self) -> &'static str {
        "sendmail"
    }

    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        let email = build_message(message)?;
        self.inner
            .send(email)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(
        host: &str,
        port: Option<u16>,
        credentials: Option<(String, String)>,
        tls: TlsMode,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut builder = match tls {
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };
        if let Some(port) = port {
            builder = builder.port(port);
        }
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }
        let inner = builder.timeout(Some(timeout)).build();
        Ok(Self { inner })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        let email = build_message(message)?;
        let response = self
            .inner
            .send(email)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        log::debug!("SMTP server answered {}", response.code());
        Ok(())
    }
}

/// Writes every message to `<directory>/<id>.eml` instead of sending it.
pub struct FileTransport {
    inner: AsyncFileTransport<Tokio1Executor>,
}

impl FileTransport {
    pub fn new(directory: &str) -> Self {
        Self {
            inner: AsyncFileTransport::new(directory),
        }
    }
}

#[async_trait]
impl MailTransport for FileTransport {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        let email = build_message(message)?;
        let id = self
            .inner
            .send(email)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        log::debug!("Message written with id {id}");
        Ok(())
    }
}

/// Create the transport named in the configuration.
pub fn build_transport(config: &Config) -> anyhow::Result<Box<dyn MailTransport>> {
    let transport: Box<dyn MailTransport> = match &config.transport {
        TransportConfig::Sendmail { command } => {
            Box::new(SendmailTransport::new(command.as_deref()))
        }
        TransportConfig::Smtp {
            host,
            port,
            username,
            password,
            tls,
        } => {
            let credentials = match (username, password) {
                (Some(username), Some(password)) => Some((username.clone(), password.clone())),
                _ => None,
            };
            Box::new(SmtpTransport::new(
                host,
                *port,
                credentials,
                *tls,
                config.delivery_timeout(),
            )?)
        }
        TransportConfig::File { directory } => {
            std::fs::create_dir_all(directory)?;
            Box::new(FileTransport::new(directory))
        }
    };
    log::info!("Using {} mail transport", transport.name());
    Ok(transport)
}
