//! Settings document for the flattening system
//!
//! The settings file is parsed by the surrounding CLI glue; the core only
//! consumes already-typed values. Notification channels are a static tagged
//! union: an unknown channel type fails at configuration-load time, not at
//! dispatch time.

use crate::error::{Error, Result};
use crate::orchestrator::FailurePolicy;
use crate::reconciler::{
    DEFAULT_MAX_CHARS, DEFAULT_STUB_MARKER, DEFAULT_SUB_PATTERN, RECORD_TTL, ReconcileOptions,
};
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level settings document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// API credential for the DNS provider
    pub api_token: String,

    /// Zone selection: exclusions and explicit ordering
    #[serde(default)]
    pub zones: ZoneSettings,

    /// Notification channels keyed by channel name
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// What to do when one zone fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Reconciliation tunables
    #[serde(default)]
    pub flatten: FlattenSettings,
}

impl Settings {
    /// Parse a settings document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("Error decoding settings JSON: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the whole document; called before any reconciliation starts
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::config("api_token provided is empty"));
        }
        for (name, channel) in &self.notifications.channels {
            channel.validate(name)?;
        }
        self.flatten.validate()?;
        Ok(())
    }
}

/// Zone exclusion list and explicit order list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneSettings {
    /// Zones skipped entirely
    #[serde(default)]
    pub excluded: Vec<String>,

    /// Zones processed first, in this sequence
    #[serde(default)]
    pub order: Vec<String>,
}

/// Per-channel notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Channels keyed by a caller-chosen name
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

/// Known notification channel variants
///
/// Adding a channel means adding a variant here; there is no dynamic
/// class lookup by string name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// SMTP email digest channel
    Email {
        /// SMTP host
        host: String,
        /// SMTP port
        port: u16,
        /// SMTP username
        username: String,
        /// SMTP password
        password: String,
        /// Transport encryption
        ssl: SslMode,
        /// Sender address
        from_email: String,
        /// Recipient address
        to_email: String,
        /// Digest severity threshold
        log_level: Severity,
    },
}

impl ChannelConfig {
    /// The digest severity threshold for this channel
    pub fn threshold(&self) -> Severity {
        match self {
            ChannelConfig::Email { log_level, .. } => *log_level,
        }
    }

    /// Validate channel-specific delivery parameters
    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            ChannelConfig::Email {
                host,
                port,
                username,
                password,
                from_email,
                to_email,
                ..
            } => {
                if host.is_empty() {
                    return Err(Error::config(format!("channel {name}: missing host")));
                }
                if *port == 0 {
                    return Err(Error::config(format!("channel {name}: invalid port")));
                }
                if username.is_empty() {
                    return Err(Error::config(format!("channel {name}: missing username")));
                }
                if password.is_empty() {
                    return Err(Error::config(format!("channel {name}: missing password")));
                }
                for (field, value) in [("from_email", from_email), ("to_email", to_email)] {
                    if !value.contains('@') {
                        return Err(Error::config(format!(
                            "channel {name}: invalid email format for {field}"
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

/// SMTP transport encryption mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Implicit TLS on connect
    None,
    /// STARTTLS upgrade
    Tls,
    /// Implicit TLS on connect
    Ssl,
}

/// Reconciliation tunables, all optional in the settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenSettings {
    /// Content marker identifying the stub record
    #[serde(default = "default_stub_marker")]
    pub stub_marker: String,

    /// Maximum characters per generated record
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Sub-record naming pattern, `#` is the running number
    #[serde(default = "default_sub_pattern")]
    pub sub_pattern: String,

    /// TTL for written records
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl FlattenSettings {
    fn validate(&self) -> Result<()> {
        if self.stub_marker.is_empty() {
            return Err(Error::config("flatten.stub_marker cannot be empty"));
        }
        if self.max_chars == 0 {
            return Err(Error::config("flatten.max_chars must be > 0"));
        }
        if !self.sub_pattern.contains('#') {
            return Err(Error::config(
                "flatten.sub_pattern must contain the # placeholder",
            ));
        }
        Ok(())
    }

    /// Convert into reconciler options
    pub fn to_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            stub_marker: self.stub_marker.clone(),
            max_chars: self.max_chars,
            sub_pattern: self.sub_pattern.clone(),
            ttl: self.ttl,
            ..ReconcileOptions::default()
        }
    }
}

impl Default for FlattenSettings {
    fn default() -> Self {
        Self {
            stub_marker: default_stub_marker(),
            max_chars: default_max_chars(),
            sub_pattern: default_sub_pattern(),
            ttl: default_ttl(),
        }
    }
}

fn default_stub_marker() -> String {
    DEFAULT_STUB_MARKER.to_string()
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_sub_pattern() -> String {
    DEFAULT_SUB_PATTERN.to_string()
}

fn default_ttl() -> u32 {
    RECORD_TTL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_settings_parse_with_defaults() {
        let settings = Settings::from_json(r#"{"api_token":"t0ken"}"#).unwrap();
        assert!(settings.zones.excluded.is_empty());
        assert!(settings.zones.order.is_empty());
        assert!(settings.notifications.channels.is_empty());
        assert_eq!(settings.failure_policy, FailurePolicy::AbortOnFirstError);
        assert_eq!(settings.flatten.stub_marker, "v=spfmaster");
        assert_eq!(settings.flatten.max_chars, 2048);
    }

    #[test]
    fn empty_api_token_is_rejected() {
        let err = Settings::from_json(r#"{"api_token":""}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn email_channel_parses_and_validates() {
        let settings = Settings::from_json(
            r#"{
                "api_token": "t0ken",
                "notifications": {
                    "channels": {
                        "ops": {
                            "type": "email",
                            "host": "smtp.example.com",
                            "port": 587,
                            "username": "mailer",
                            "password": "hunter2",
                            "ssl": "tls",
                            "from_email": "spf@example.com",
                            "to_email": "ops@example.com",
                            "log_level": "warning"
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        let channel = settings.notifications.channels.get("ops").unwrap();
        assert_eq!(channel.threshold(), Severity::Warning);
    }

    #[test]
    fn unknown_channel_type_fails_at_load_time() {
        let err = Settings::from_json(
            r#"{
                "api_token": "t0ken",
                "notifications": {"channels": {"x": {"type": "pager"}}}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn invalid_log_level_fails_at_load_time() {
        let err = Settings::from_json(
            r#"{
                "api_token": "t0ken",
                "notifications": {
                    "channels": {
                        "ops": {
                            "type": "email",
                            "host": "smtp.example.com",
                            "port": 587,
                            "username": "mailer",
                            "password": "hunter2",
                            "ssl": "tls",
                            "from_email": "spf@example.com",
                            "to_email": "ops@example.com",
                            "log_level": "loud"
                        }
                    }
                }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn bad_email_address_is_rejected() {
        let err = Settings::from_json(
            r#"{
                "api_token": "t0ken",
                "notifications": {
                    "channels": {
                        "ops": {
                            "type": "email",
                            "host": "smtp.example.com",
                            "port": 587,
                            "username": "mailer",
                            "password": "hunter2",
                            "ssl": "none",
                            "from_email": "not-an-address",
                            "to_email": "ops@example.com",
                            "log_level": "error"
                        }
                    }
                }
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("from_email"));
    }

    #[test]
    fn failure_policy_parses_kebab_case() {
        let settings = Settings::from_json(
            r#"{"api_token":"t0ken","failure_policy":"continue-and-collect"}"#,
        )
        .unwrap();
        assert_eq!(settings.failure_policy, FailurePolicy::ContinueAndCollect);
    }

    #[test]
    fn sub_pattern_without_placeholder_is_rejected() {
        let err = Settings::from_json(
            r#"{"api_token":"t0ken","flatten":{"sub_pattern":"spf"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sub_pattern"));
    }
}
