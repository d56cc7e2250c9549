use crate::core::error::MailError;
use anyhow::{Context, Result};
use tera::Tera;

pub const VERIFY_TXT: &str = "registration/emails/verify.txt";
pub const VERIFY_HTML: &str = "registration/emails/verify.html";

/// Email templates compiled into the binary
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                VERIFY_TXT,
                include_str!("../../templates/registration/emails/verify.txt"),
            ),
            (
                VERIFY_HTML,
                include_str!("../../templates/registration/emails/verify.html"),
            ),
        ])
        .context("Failed to compile email templates")?;

        Ok(Self { tera })
    }

    /// Render the text and HTML bodies of the verification email
    pub fn render_verification(&self, path: &str, email: &str) -> Result<(String, String), MailError> {
        let mut context = tera::Context::new();
        context.insert("path", path);
        context.insert("email", email);

        let text = self.render(VERIFY_TXT, &context)?;
        let html = self.render(VERIFY_HTML, &context)?;
        Ok((text, html))
    }

    fn render(&self, name: &str, context: &tera::Context) -> Result<String, MailError> {
        self.tera
            .render(name, context)
            .map_err(|e| MailError::Template {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}
