//! Email bodies rendered with Tera from templates embedded in the binary

use rust_embed::Embed;
use tera::{Context, Tera};

use super::NotifyError;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Accent color for verification mail
pub const VERIFY_ACCENT: &str = "#3498db";

/// Accent color for password-reset mail
pub const RESET_ACCENT: &str = "#e74c3c";

/// Accent color for status-change notifications
pub const NOTIFY_ACCENT: &str = "#2c3e50";

/// Rendered text and HTML body of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub text: String,
    pub html: String,
}

/// The set of email templates
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    /// Load every embedded template
    ///
    /// Templates are registered together so `{% extends %}` resolves
    /// regardless of iteration order.
    pub fn new() -> Result<Self, NotifyError> {
        let mut sources = Vec::new();
        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let body = std::str::from_utf8(&content.data)
                    .map_err(|e| NotifyError::Template(format!("{}: {}", filename, e)))?;
                sources.push((filename.to_string(), body.to_string()));
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(sources)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        Ok(Self { tera })
    }

    /// Render `email/<name>.txt` and `email/<name>.html` with the same context
    pub fn render(&self, name: &str, context: &Context) -> Result<RenderedEmail, NotifyError> {
        let render = |path: String| {
            self.tera
                .render(&path, context)
                .map_err(|e| NotifyError::Template(format!("{}: {}", path, describe(&e))))
        };
        Ok(RenderedEmail {
            text: render(format!("email/{}.txt", name))?,
            html: render(format!("email/{}.html", name))?,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

/// Tera nests the useful message in the error source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("app_name", "Business Management System (BMS)");
        ctx.insert("signature", "BMS Team");
        ctx.insert("accent", VERIFY_ACCENT);
        ctx.insert("username", "<dana>");
        ctx.insert("action_url", "https://bms.example/verify?token=abc");
        ctx.insert("expires_hours", &24);
        ctx
    }

    #[test]
    fn test_all_templates_load() {
        let templates = EmailTemplates::new().unwrap();
        let names = templates.names();
        assert!(names.contains(&"email/base.html"));
        assert!(names.contains(&"email/status_change.txt"));
    }

    #[test]
    fn test_html_is_escaped_and_text_is_not() {
        let templates = EmailTemplates::new().unwrap();
        let rendered = templates.render("registration", &context()).unwrap();
        assert!(rendered.html.contains("Hello &lt;dana&gt;!"));
        assert!(rendered.html.contains(VERIFY_ACCENT));
        assert!(rendered.text.contains("Hello <dana>,"));
        assert!(rendered.text.contains("expire in 24 hours"));
    }

    #[test]
    fn test_missing_variable_is_template_error() {
        let templates = EmailTemplates::new().unwrap();
        let err = templates.render("status_change", &context()).unwrap_err();
        assert!(matches!(err, NotifyError::Template(_)));
    }
}
