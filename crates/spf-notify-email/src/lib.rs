// # SMTP Digest Transport
//
// Delivers digest notifications over authenticated SMTP. One transport per
// configured email channel; the Notifier owns buffering, filtering and the
// flush lifecycle, this crate only knows how to send one message.
//
// ## Encryption modes
//
// - `ssl` and `none` both use implicit TLS on connect (SMTPS); plaintext
//   submission is never offered.
// - `tls` uses a STARTTLS upgrade.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use spf_core::config::{ChannelConfig, SslMode};
use spf_core::error::{Error, Result};
use spf_core::notify::DigestTransport;

/// SMTP digest destination for one configured email channel
pub struct EmailDigest {
    name: String,
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for EmailDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailDigest")
            .field("name", &self.name)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl EmailDigest {
    /// Build a transport from a validated email channel configuration
    pub fn from_channel(name: impl Into<String>, config: &ChannelConfig) -> Result<Self> {
        let ChannelConfig::Email {
            host,
            port,
            username,
            password,
            ssl,
            from_email,
            to_email,
            ..
        } = config;

        let name = name.into();
        let from: Mailbox = from_email
            .parse()
            .map_err(|e| Error::config(format!("channel {}: invalid from_email: {}", name, e)))?;
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| Error::config(format!("channel {}: invalid to_email: {}", name, e)))?;

        let builder = match ssl {
            SslMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            SslMode::Ssl | SslMode::None => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        }
        .map_err(|e| Error::config(format!("channel {}: invalid SMTP relay: {}", name, e)))?;

        let transport = builder
            .credentials(Credentials::new(username.clone(), password.clone()))
            .port(*port)
            .build();

        Ok(Self {
            name,
            from,
            to,
            transport,
        })
    }
}

#[async_trait]
impl DigestTransport for EmailDigest {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Other(format!("Failed to build digest message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Other(format!("Message could not be sent. Mailer Error: {}", e)))?;

        tracing::debug!("Digest delivered via channel {}", self.name);
        Ok(())
    }
}
