/// Outbound mail transport
///
/// [`SmtpMailer`] delivers through lettre's async SMTP transport. When no
/// SMTP host is configured, [`LogMailer`] stands in and only logs what would
/// have been sent, so development setups work without a mail server.
///
/// # Example
///
/// ```no_run
/// use glacier_shared::email::mailer::{build_mailer, MailConfig, OutgoingEmail};
/// use glacier_shared::email::templates::EmailTemplates;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = build_mailer(&MailConfig::from_env("Glacier"))?;
/// let templates = EmailTemplates::new("Glacier", "http://localhost:5173");
///
/// mailer
///     .send(OutgoingEmail {
///         to: "ada@example.com".to_string(),
///         subject: "Welcome".to_string(),
///         body: templates.welcome("Ada", None),
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::env;
use std::sync::Arc;

use super::templates::EmailBody;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// SMTP settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP host; `None` selects the logging mailer
    pub host: Option<String>,
    pub port: u16,

    /// Implicit TLS (SMTPS)
    pub secure: bool,

    /// Refuse to send without STARTTLS
    pub require_tls: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from_name: String,
    pub from_email: String,
}

impl MailConfig {
    /// Reads `SMTP_*` and `MAIL_FROM*` variables
    ///
    /// `SMTP_SECURE` defaults to true exactly when the port is 465. The
    /// sender falls back from `MAIL_FROM` to `SMTP_USER` to a no-reply
    /// address, and the display name from `MAIL_FROM_NAME` to `app_name`.
    pub fn from_env(app_name: &str) -> Self {
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);

        let secure = match env::var("SMTP_SECURE").ok().as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => port == 465,
        };

        let user = env::var("SMTP_USER").ok().filter(|v| !v.is_empty());

        Self {
            host: env::var("SMTP_HOST").ok().filter(|v| !v.is_empty()),
            port,
            secure,
            require_tls: env::var("SMTP_REQUIRE_TLS").map(|v| v == "true").unwrap_or(false),
            pass: env::var("SMTP_PASS").ok().filter(|v| !v.is_empty()),
            from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| app_name.to_string()),
            from_email: env::var("MAIL_FROM")
                .ok()
                .or_else(|| user.clone())
                .unwrap_or_else(|| "no-reply@example.com".to_string()),
            user,
        }
    }

    /// Sender mailbox, `Name <address>`
    pub fn from_mailbox(&self) -> Result<Mailbox, MailError> {
        Ok(Mailbox::new(Some(self.from_name.clone()), self.from_email.parse()?))
    }
}

/// One message ready to send
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: EmailBody,
}

/// Anything that can deliver an [`OutgoingEmail`]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, host: &str) -> Result<Self, MailError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else if config.require_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .tls(Tls::Opportunistic(TlsParameters::new(host.to_string())?))
        };

        let mut builder = builder.port(config.port);
        if let (Some(user), Some(pass)) = (&config.user, &config.pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        if config.secure && config.port == 587 {
            tracing::warn!("SMTP_SECURE=true with port 587 (STARTTLS); consider port 465 or SMTP_SECURE=false");
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from_mailbox()?,
        })
    }

    /// Checks that the server accepts connections
    pub async fn verify(&self) -> bool {
        match self.transport.test_connection().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "SMTP verify failed");
                false
            }
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.body.text, email.body.html))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured; email not sent"
        );
        tracing::debug!(text = %email.body.text, "Email body");
        Ok(())
    }
}

/// Picks the SMTP mailer when a host is configured, the log mailer otherwise
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.host {
        Some(host) => {
            tracing::info!(host = %host, port = config.port, secure = config.secure, "SMTP mailer configured");
            Ok(Arc::new(SmtpMailer::new(config, host)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set; outgoing email will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Sends without waiting; a failure is logged as a warning
pub fn send_in_background(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = mailer.send(email).await {
            tracing::warn!(to = %to, subject = %subject, error = %e, "Email delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            host: None,
            port: 587,
            secure: false,
            require_tls: false,
            user: None,
            pass: None,
            from_name: "Glacier".to_string(),
            from_email: "no-reply@example.com".to_string(),
        }
    }

    #[test]
    fn test_from_mailbox() {
        let mailbox = config().from_mailbox().unwrap();
        assert_eq!(mailbox.to_string(), "Glacier <no-reply@example.com>");
    }

    #[test]
    fn test_invalid_from_address() {
        let mut cfg = config();
        cfg.from_email = "not an address".to_string();
        assert!(matches!(cfg.from_mailbox(), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let mailer = build_mailer(&config()).unwrap();
        let result = mailer
            .send(OutgoingEmail {
                to: "ada@example.com".to_string(),
                subject: "Hi".to_string(),
                body: EmailBody {
                    html: "<p>Hi</p>".to_string(),
                    text: "Hi".to_string(),
                },
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_without_connecting() {
        let mut cfg = config();
        cfg.host = Some("smtp.example.com".to_string());
        cfg.user = Some("user".to_string());
        cfg.pass = Some("pass".to_string());

        assert!(SmtpMailer::new(&cfg, "smtp.example.com").is_ok());
    }
}
