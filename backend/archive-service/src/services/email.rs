//! Outgoing mail: moderation decisions and contact-form forwarding

use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::error::{AppError, Result};
use crate::models::PostStatus;
use crate::utils::mask_email;

/// A rendered message ready to hand to the transport
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    org_inbox: String,
    site_url: String,
}

impl EmailService {
    /// If the SMTP host is empty the service only logs what it would send.
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("Invalid email.from address: {}", e))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| anyhow::anyhow!("Failed to configure SMTP transport: {}", e))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            org_inbox: config.org_inbox.clone(),
            site_url: config.site_url.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Tell an author their post was approved or denied
    pub async fn send_decision_email(
        &self,
        recipient: &str,
        decision: PostStatus,
        post_title: Option<&str>,
        feedback: Option<&str>,
    ) -> Result<()> {
        let email = render_decision_email(decision, post_title, feedback, &self.site_url);
        self.send_html_email(recipient, None, &email).await
    }

    /// Forward a contact-form message to the organisation inbox
    pub async fn send_contact_email(&self, name: &str, sender: &str, message: &str) -> Result<()> {
        let email = render_contact_email(name, sender, message);
        let inbox = self.org_inbox.clone();
        self.send_html_email(&inbox, Some(sender), &email).await
    }

    async fn send_html_email(
        &self,
        recipient: &str,
        reply_to: Option<&str>,
        email: &RenderedEmail,
    ) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                subject = %email.subject,
                recipient = %mask_email(recipient),
                "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient email address: {}", e)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str());

        if let Some(reply_to) = reply_to {
            let reply_to = reply_to
                .parse::<Mailbox>()
                .map_err(|e| AppError::BadRequest(format!("Invalid reply-to address: {}", e)))?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build email: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send email: {}", e)))?;

        info!(subject = %email.subject, recipient = %mask_email(recipient), "email sent");
        Ok(())
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_decision_email(
    decision: PostStatus,
    post_title: Option<&str>,
    feedback: Option<&str>,
    site_url: &str,
) -> RenderedEmail {
    let subject = format!(
        "Your 120 East State Submission Was {}",
        capitalize(decision.as_str())
    );
    let title = post_title.filter(|t| !t.trim().is_empty());
    let feedback = feedback.filter(|f| !f.trim().is_empty());
    let site = escape_html(site_url);

    if decision == PostStatus::Approved {
        let title_html = title
            .map(|t| {
                format!(
                    "<p>Your post titled \"<strong>{}</strong>\" is now visible on the site.</p>",
                    escape_html(t)
                )
            })
            .unwrap_or_default();
        let title_text = title
            .map(|t| format!("Your post titled \"{}\" is now visible on the site.\n\n", t))
            .unwrap_or_default();

        let html = format!(
            r#"<html>
<body>
    <h2>Congratulations!</h2>
    <p>Your submission to 120 East State has been <strong>approved</strong>.</p>
    {title_html}
    <p>Thank you for contributing to our community!</p>
    <p>Visit <a href="{site}">our website</a> to see your post.</p>
    <p>The 120 East State Team</p>
</body>
</html>"#
        );
        let text = format!(
            "Congratulations!\n\nYour submission to 120 East State has been approved.\n\n\
            {title_text}Thank you for contributing to our community!\n\
            Visit {site_url} to see your post.\n\nThe 120 East State Team"
        );

        return RenderedEmail { subject, html, text };
    }

    let title_html = title
        .map(|t| {
            format!(
                "<p>Unfortunately, your post titled \"<strong>{}</strong>\" has not been approved at this time.</p>",
                escape_html(t)
            )
        })
        .unwrap_or_default();
    let title_text = title
        .map(|t| {
            format!(
                "Unfortunately, your post titled \"{}\" has not been approved at this time.\n\n",
                t
            )
        })
        .unwrap_or_default();
    let feedback_html = feedback
        .map(|f| {
            format!(
                r#"<div style="margin: 20px 0; padding: 15px; border-left: 4px solid #d9534f; background-color: #f9f9f9;">
        <h3 style="margin-top: 0;">Feedback from our team:</h3>
        <p style="white-space: pre-line;">{}</p>
    </div>"#,
                escape_html(f)
            )
        })
        .unwrap_or_default();
    let feedback_text = feedback
        .map(|f| format!("Feedback from our team:\n{}\n\n", f))
        .unwrap_or_default();

    let html = format!(
        r#"<html>
<body>
    <h2>Notice Regarding Your Submission</h2>
    <p>We've reviewed your submission to 120 East State.</p>
    {title_html}
    {feedback_html}
    <p>Common reasons for declined submissions include:</p>
    <ul>
        <li>Content not aligned with our community guidelines</li>
        <li>Insufficient information or details</li>
        <li>Quality concerns</li>
    </ul>
    <p>You're welcome to submit again with revised content.</p>
    <p>The 120 East State Team</p>
</body>
</html>"#
    );
    let text = format!(
        "We've reviewed your submission to 120 East State.\n\n\
        {title_text}{feedback_text}\
        Common reasons for declined submissions include:\n\
        - Content not aligned with our community guidelines\n\
        - Insufficient information or details\n\
        - Quality concerns\n\n\
        You're welcome to submit again with revised content.\n\nThe 120 East State Team"
    );

    RenderedEmail { subject, html, text }
}

pub fn render_contact_email(name: &str, sender: &str, message: &str) -> RenderedEmail {
    let subject = format!("New contact form message from {}", name);
    let html = format!(
        r#"<html>
<body>
    <h2>New message from the 120 East State contact form</h2>
    <p><strong>Name:</strong> {}</p>
    <p><strong>Email:</strong> {}</p>
    <p style="white-space: pre-line;">{}</p>
</body>
</html>"#,
        escape_html(name),
        escape_html(sender),
        escape_html(message)
    );
    let text = format!("Name: {}\nEmail: {}\n\n{}", name, sender, message);

    RenderedEmail { subject, html, text }
}
