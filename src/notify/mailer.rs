//! Mail transports

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use super::{EmailMessage, NotifyError};

/// Port that speaks TLS from the first byte; every other port upgrades with STARTTLS
pub const SMTPS_PORT: u16 = 465;

/// Something that can deliver an [`EmailMessage`]
pub trait Mailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;

    /// Short description for `bms config show` and log lines
    fn describe(&self) -> String;
}

/// Logs each message instead of delivering it
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        log::info!(
            "email to {}: {}",
            message.to.join(", "),
            message.subject
        );
        log::debug!("email body:\n{}", message.text_body);
        Ok(())
    }

    fn describe(&self) -> String {
        "log".to_string()
    }
}

/// Writes each message as a MIME `.eml` file into a directory
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deliver and return the written path
    pub fn write(&self, message: &EmailMessage) -> Result<PathBuf, NotifyError> {
        fs::create_dir_all(&self.dir)?;

        let now = Utc::now();
        let stem = format!("{}_{}", now.format("%Y%m%d_%H%M%S_%6f"), slug(&message.subject));
        let mut path = self.dir.join(format!("{}.eml", stem));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.eml", stem, n));
            n += 1;
        }

        let boundary = format!("bms-{}", now.timestamp_micros());
        fs::write(&path, to_mime(message, &boundary, &now.to_rfc2822()))?;
        Ok(path)
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let path = self.write(message)?;
        log::info!("wrote email '{}' to {}", message.subject, path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("outbox ({})", self.dir.display())
    }
}

/// Delivers through an authenticated SMTP relay
#[derive(Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
    username: String,
    password: String,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let builder = if self.port == SMTPS_PORT {
            SmtpTransport::relay(&self.server)
        } else {
            SmtpTransport::starttls_relay(&self.server)
        }
        .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        Ok(builder
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .build())
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let email = build_message(message)?;
        self.transport()?
            .send(&email)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        log::info!(
            "sent email '{}' to {} via {}",
            message.subject,
            message.to.join(", "),
            self.server
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("smtp ({}:{})", self.server, self.port)
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| NotifyError::InvalidAddress(address.to_string()))
}

/// Convert to a wire-ready message: plain text, plus an HTML alternative when present
pub fn build_message(message: &EmailMessage) -> Result<Message, NotifyError> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone());
    for to in &message.to {
        builder = builder.to(mailbox(to)?);
    }

    let built = match &message.html_body {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.text_body.clone()),
    };
    built.map_err(|e| NotifyError::Smtp(e.to_string()))
}

fn slug(text: &str) -> String {
    let slug: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let trimmed: Vec<&str> = slug.split('_').filter(|s| !s.is_empty()).collect();
    trimmed.join("_").chars().take(40).collect()
}

/// Render a `multipart/alternative` message with CRLF line endings
fn to_mime(message: &EmailMessage, boundary: &str, date: &str) -> String {
    let mut lines = vec![
        format!("From: {}", message.from),
        format!("To: {}", message.to.join(", ")),
        format!("Subject: {}", message.subject),
        format!("Date: {}", date),
        "MIME-Version: 1.0".to_string(),
        format!("Content-Type: multipart/alternative; boundary=\"{}\"", boundary),
        String::new(),
        format!("--{}", boundary),
        "Content-Type: text/plain; charset=utf-8".to_string(),
        String::new(),
        message.text_body.clone(),
    ];
    if let Some(html) = &message.html_body {
        lines.push(format!("--{}", boundary));
        lines.push("Content-Type: text/html; charset=utf-8".to_string());
        lines.push(String::new());
        lines.push(html.clone());
    }
    lines.push(format!("--{}--", boundary));
    lines.push(String::new());

    lines
        .join("\n")
        .lines()
        .collect::<Vec<_>>()
        .join("\r\n")
        + "\r\n"
}

/// Keeps every sent message in memory
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryMailer {
    pub sent: std::rc::Rc<std::cell::RefCell<Vec<EmailMessage>>>,
}

#[cfg(test)]
impl Mailer for MemoryMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Fails every delivery
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingMailer;

#[cfg(test)]
impl Mailer for FailingMailer {
    fn send(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Outbox(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "outbox is read-only",
        )))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "BMS System <ops@example.com>".to_string(),
            to: vec!["dana@example.com".to_string()],
            subject: "Verify Your BMS Account".to_string(),
            text_body: "Hello dana,\n\nclick".to_string(),
            html_body: Some("<p>Hello dana</p>".to_string()),
        }
    }

    #[test]
    fn test_outbox_writes_multipart_file() {
        let tmp = tempdir().unwrap();
        let mailer = OutboxMailer::new(tmp.path().join("outbox"));

        let path = mailer.write(&message()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_verify_your_bms_account.eml"));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("From: BMS System <ops@example.com>\r\n"));
        assert!(raw.contains("Subject: Verify Your BMS Account\r\n"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
        assert!(raw.contains("Hello dana,\r\n\r\nclick"));
        assert!(!raw.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_outbox_never_overwrites() {
        let tmp = tempdir().unwrap();
        let mailer = OutboxMailer::new(tmp.path());
        let a = mailer.write(&message()).unwrap();
        let b = mailer.write(&message()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_build_message_has_both_parts() {
        let raw = String::from_utf8(build_message(&message()).unwrap().formatted()).unwrap();
        assert!(raw.contains("Subject: Verify Your BMS Account"));
        assert!(raw.contains("dana@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_build_message_plain_only() {
        let mut plain = message();
        plain.html_body = None;
        let raw = String::from_utf8(build_message(&plain).unwrap().formatted()).unwrap();
        assert!(raw.contains("text/plain"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut bad = message();
        bad.to = vec!["not an address".to_string()];
        assert!(matches!(
            build_message(&bad).unwrap_err(),
            NotifyError::InvalidAddress(_)
        ));
    }

    #[test]
    fn test_smtp_describe_hides_password() {
        let mailer = SmtpMailer::new("smtp.example.com", 587, "ops@example.com", "hunter2");
        assert_eq!(mailer.describe(), "smtp (smtp.example.com:587)");
        assert!(!format!("{:?}", mailer).contains("hunter2"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Handover #4: pending → done"), "handover_4_pending_done");
    }
}
