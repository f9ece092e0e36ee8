use anyhow::{bail, Context};
use lettre::message::Mailboxes;
use lettre::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address that receives contact form messages
    pub to: String,
    /// Comma-separated copy recipients, empty for none
    #[serde(default)]
    pub cc: String,
    #[serde(default)]
    pub bcc: String,
    /// Fallback reply address and envelope sender
    pub from: String,
    pub subject: String,
    /// CSV file that receives one row per attempted delivery
    #[serde(default)]
    pub audit_log: Option<String>,
    #[serde(default)]
    pub spam_policy: SpamPolicy,
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_seconds: u64,
    #[serde(default)]
    pub transport: TransportConfig,
}

fn default_delivery_timeout() -> u64 {
    30
}

/// What to do with submissions that carry header or link tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpamPolicy {
    /// Refuse to send and ask the visitor to remove links
    #[default]
    Reject,
    /// Remove header tokens and markup, then send what is left
    Strip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportConfig {
    Sendmail {
        command: Option<String>,
    },
    Smtp {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        #[serde(default)]
        tls: TlsMode,
    },
    /// Write each message as an .eml file, useful while developing a site
    File {
        directory: String,
    },
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Sendmail { command: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Starttls,
    Tls,
    None,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            to: "example@example.com".to_string(),
            cc: String::new(),
            bcc: String::new(),
            from: "sender@example.com".to_string(),
            subject: "Website Enquiry".to_string(),
            audit_log: None,
            spam_policy: SpamPolicy::Reject,
            delivery_timeout_seconds: default_delivery_timeout(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Load a YAML config, or TOML when the file ends in `.toml`.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;

        let config: Config = if Path::new(path).extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {path}"))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {path}"))?
        };
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the static addresses once at startup rather than on every request.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_address("to", &self.to)?;
        check_address("from", &self.from)?;
        if !self.cc.is_empty() {
            check_address_list("cc", &self.cc)?;
        }
        if !self.bcc.is_empty() {
            check_address_list("bcc", &self.bcc)?;
        }
        if self.subject.trim().is_empty() {
            bail!("Configuration 'subject' must not be empty");
        }
        if self.delivery_timeout_seconds == 0 {
            bail!("Configuration 'delivery_timeout_seconds' must be greater than zero");
        }
        Ok(())
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_seconds)
    }
}

fn check_address(name: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() {
        bail!("Configuration '{name}' must not be empty");
    }
    value
        .parse::<Address>()
        .with_context(|| format!("Configuration '{name}' is not a valid address: {value}"))?;
    Ok(())
}

/// `cc` and `bcc` take a comma-separated list of addresses.
fn check_address_list(name: &str, value: &str) -> anyhow::Result<()> {
    let mailboxes = value
        .parse::<Mailboxes>()
        .with_context(|| format!("Configuration '{name}' is not a valid address list: {value}"))?;
    if mailboxes.iter().next().is_none() {
        bail!("Configuration '{name}' names no addresses: {value}");
    }
    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        let config = Config::from_file(path)?;
        log::info!("Loaded configuration from: {path}");
        Ok(config)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}
