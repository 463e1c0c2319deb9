/// Transactional email
///
/// - `templates`: HTML layouts with derived plain-text alternatives
/// - `mailer`: SMTP delivery, or logging when SMTP is not configured
///
/// Handlers never wait on delivery for correctness: mail is sent with
/// [`mailer::send_in_background`] or awaited with failures only logged.

pub mod mailer;
pub mod templates;

pub use mailer::{build_mailer, send_in_background, MailConfig, MailError, Mailer, OutgoingEmail};
pub use templates::{EmailBody, EmailTemplates};
