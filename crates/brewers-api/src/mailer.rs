use anyhow::Result;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

const FOOTER: &str = "<br/><br/>*** DO NOT REPLY TO THIS EMAIL. THIS EMAIL IS NOT CHECKED. ***";

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Outbound mail transport. Object safe so the server can pick SMTP or the
/// logging fallback at startup.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<()>>;
}

pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from: Mailbox = settings.from.parse()?;

        info!("SMTP mailer configured for {}:{}", settings.host, settings.port);
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<()>> {
        async move {
            let message = Message::builder()
                .from(self.from.clone())
                .to(mail.to.parse::<Mailbox>()?)
                .subject(mail.subject)
                .header(ContentType::TEXT_HTML)
                .body(format!("{}{}", mail.html_body, FOOTER))?;

            self.transport.send(message).await?;
            Ok::<_, anyhow::Error>(())
        }
        .boxed()
    }
}

/// Used when no SMTP host is configured: mail is written to the log instead.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<()>> {
        async move {
            info!("Mail to {} not sent (no SMTP host): {}", mail.to, mail.subject);
            debug!("Mail body: {}", mail.html_body);
            Ok::<_, anyhow::Error>(())
        }
        .boxed()
    }
}

/// Escapes user-supplied text for interpolation into an HTML mail body.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Sends `mail`, turning any failure into advisory text for the response.
/// Mail never fails the request that triggered it.
pub async fn deliver(mailer: &dyn Mailer, mail: OutgoingMail) -> Option<String> {
    let to = mail.to.clone();
    match mailer.send(mail).await {
        Ok(()) => None,
        Err(e) => {
            warn!("Failed to send mail to {}: {:#}", to, e);
            Some("Error occurred while sending email.".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingMailer;

    fn mail() -> OutgoingMail {
        OutgoingMail {
            to: "bob@example.com".into(),
            subject: "Friend Request".into(),
            html_body: "<b>hi</b>".into(),
        }
    }

    #[tokio::test]
    async fn delivered_mail_has_no_warning() {
        let mailer = RecordingMailer::default();
        assert_eq!(deliver(&mailer, mail()).await, None);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_mail_becomes_a_warning() {
        let mailer = RecordingMailer::failing();
        let warning = deliver(&mailer, mail()).await;
        assert!(warning.unwrap().contains("sending email"));
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(
            escape_html("<a href='http://x'>win</a> & co"),
            "&lt;a href=&#39;http://x&#39;&gt;win&lt;/a&gt; &amp; co"
        );
        assert_eq!(escape_html("plain_name"), "plain_name");
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert_eq!(deliver(&LogMailer, mail()).await, None);
    }
}
