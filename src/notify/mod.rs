//! Best-effort email notifications
//!
//! Messages are rendered from embedded Tera templates and handed to a
//! [`Mailer`]. Callers in the service layer log delivery failures and carry
//! on; nothing here retries or tracks delivery.

mod mailer;
mod templates;

pub use mailer::{build_message, LogMailer, Mailer, OutboxMailer, SmtpMailer};
pub use templates::{EmailTemplates, RenderedEmail, NOTIFY_ACCENT, RESET_ACCENT, VERIFY_ACCENT};

#[cfg(test)]
pub(crate) use mailer::{FailingMailer, MemoryMailer};

use chrono::{DateTime, Utc};
use tera::Context;
use thiserror::Error;

use crate::core::config::Config;
use crate::entities::EntityKind;

/// Product name shown in message bodies
pub const APP_NAME: &str = "Business Management System (BMS)";

/// Sign-off under every message
pub const SIGNATURE: &str = "BMS Team";

/// Lifetime of verification and reset links
pub const LINK_EXPIRY_HOURS: u32 = 24;

pub const REGISTRATION_SUBJECT: &str = "Verify Your BMS Account";
pub const PASSWORD_RESET_SUBJECT: &str = "Reset Your BMS Password";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Email template error: {0}")]
    Template(String),

    #[error("Email has no recipients")]
    NoRecipients,

    #[error("Invalid email address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to write outbox message: {0}")]
    Outbox(#[from] std::io::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

/// One outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

/// The kinds of message BMS knows how to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Registration,
    PasswordReset,
    StatusChange,
}

impl EmailKind {
    fn template(&self) -> &'static str {
        match self {
            EmailKind::Registration => "registration",
            EmailKind::PasswordReset => "password_reset",
            EmailKind::StatusChange => "status_change",
        }
    }
}

/// A record's status transition, as reported in a notification
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub kind: EntityKind,
    pub id: i64,
    pub title: String,
    pub from_status: String,
    pub to_status: String,
    pub changed_at: DateTime<Utc>,
}

/// Basic shape check: one `@`, something on both sides, no whitespace
pub fn is_valid_address(address: &str) -> bool {
    let mut parts = address.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !address.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// Renders and sends notifications
pub struct Notifier {
    templates: Option<EmailTemplates>,
    mailer: Box<dyn Mailer>,
    from: String,
    recipients: Vec<String>,
}

impl Notifier {
    /// Build the notifier described by `config`
    ///
    /// An outbox directory wins; otherwise sender credentials select SMTP
    /// and anything less falls back to the log.
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        if !config.notify.enabled() {
            return Ok(Self::disabled());
        }

        let email = &config.email;
        let mailer: Box<dyn Mailer> = match (
            &config.notify.outbox_dir,
            &email.username,
            &email.password,
        ) {
            (Some(dir), _, _) => Box::new(OutboxMailer::new(dir)),
            (None, Some(username), Some(password)) if email.has_credentials() => {
                Box::new(SmtpMailer::new(
                    email.smtp_server(),
                    email.smtp_port(),
                    username.as_str(),
                    password.as_str(),
                ))
            }
            _ => {
                log::debug!("email credentials not configured; logging notifications");
                Box::new(LogMailer)
            }
        };
        Self::with_mailer(config, mailer)
    }

    /// Build with an explicit transport
    pub fn with_mailer(config: &Config, mailer: Box<dyn Mailer>) -> Result<Self, NotifyError> {
        let address = config
            .email
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "bms@localhost".to_string());
        Ok(Self {
            templates: Some(EmailTemplates::new()?),
            mailer,
            from: format!("{} <{}>", config.email.from_name(), address),
            recipients: config.notify.recipients.clone(),
        })
    }

    /// A notifier that renders nothing and sends nothing
    pub fn disabled() -> Self {
        Self {
            templates: None,
            mailer: Box::new(LogMailer),
            from: String::new(),
            recipients: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.templates.is_some()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn transport(&self) -> String {
        if self.is_enabled() {
            self.mailer.describe()
        } else {
            "disabled".to_string()
        }
    }

    fn base_context(&self, accent: &str) -> Context {
        let mut ctx = Context::new();
        ctx.insert("app_name", APP_NAME);
        ctx.insert("signature", SIGNATURE);
        ctx.insert("accent", accent);
        ctx
    }

    fn compose(
        &self,
        kind: EmailKind,
        to: Vec<String>,
        subject: String,
        ctx: &Context,
    ) -> Result<Option<EmailMessage>, NotifyError> {
        let Some(templates) = &self.templates else {
            return Ok(None);
        };
        if to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        if let Some(bad) = to.iter().find(|a| !is_valid_address(a)) {
            return Err(NotifyError::InvalidAddress(bad.clone()));
        }

        let rendered = templates.render(kind.template(), ctx)?;
        Ok(Some(EmailMessage {
            from: self.from.clone(),
            to,
            subject,
            text_body: rendered.text,
            html_body: Some(rendered.html),
        }))
    }

    /// Account verification mail; `None` when disabled
    pub fn registration_email(
        &self,
        to: &str,
        username: &str,
        action_url: &str,
    ) -> Result<Option<EmailMessage>, NotifyError> {
        let mut ctx = self.base_context(VERIFY_ACCENT);
        ctx.insert("username", username);
        ctx.insert("action_url", action_url);
        ctx.insert("expires_hours", &LINK_EXPIRY_HOURS);
        self.compose(
            EmailKind::Registration,
            vec![to.to_string()],
            REGISTRATION_SUBJECT.to_string(),
            &ctx,
        )
    }

    /// Password reset mail; `None` when disabled
    pub fn password_reset_email(
        &self,
        to: &str,
        username: &str,
        action_url: &str,
    ) -> Result<Option<EmailMessage>, NotifyError> {
        let mut ctx = self.base_context(RESET_ACCENT);
        ctx.insert("username", username);
        ctx.insert("action_url", action_url);
        ctx.insert("expires_hours", &LINK_EXPIRY_HOURS);
        self.compose(
            EmailKind::PasswordReset,
            vec![to.to_string()],
            PASSWORD_RESET_SUBJECT.to_string(),
            &ctx,
        )
    }

    /// Status-change mail to `to`; `None` when disabled
    pub fn status_change_email(
        &self,
        to: &[String],
        change: &StatusChange,
    ) -> Result<Option<EmailMessage>, NotifyError> {
        let mut ctx = self.base_context(NOTIFY_ACCENT);
        ctx.insert("kind_label", change.kind.label());
        ctx.insert("id", &change.id);
        ctx.insert("title", &change.title);
        ctx.insert("from_status", &change.from_status);
        ctx.insert("to_status", &change.to_status);
        ctx.insert(
            "changed_at",
            &change.changed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        let subject = format!(
            "[BMS] {} #{} is now {}",
            change.kind.label(),
            change.id,
            change.to_status
        );
        self.compose(EmailKind::StatusChange, to.to_vec(), subject, &ctx)
    }

    /// Hand a composed message to the transport
    pub fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.mailer.send(message)
    }

    pub fn send_registration(
        &self,
        to: &str,
        username: &str,
        action_url: &str,
    ) -> Result<(), NotifyError> {
        match self.registration_email(to, username, action_url)? {
            Some(message) => self.send(&message),
            None => Ok(()),
        }
    }

    pub fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        action_url: &str,
    ) -> Result<(), NotifyError> {
        match self.password_reset_email(to, username, action_url)? {
            Some(message) => self.send(&message),
            None => Ok(()),
        }
    }

    /// Notify the configured recipients; a no-op when there are none
    pub fn notify_status_change(&self, change: &StatusChange) -> Result<(), NotifyError> {
        if self.recipients.is_empty() {
            log::debug!(
                "no notification recipients for {} {} status change",
                change.kind,
                change.id
            );
            return Ok(());
        }
        match self.status_change_email(&self.recipients, change)? {
            Some(message) => self.send(&message),
            None => Ok(()),
        }
    }
}
