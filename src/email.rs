//! Transactional email notifications.
//!
//! Sends are best-effort and fire-and-forget: the message is spawned onto the
//! runtime and the handler responds without waiting. Failures are logged and
//! never surfaced to the HTTP caller. A deployment without SMTP configuration
//! gets a disabled mailer that only logs what it would have sent.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;

#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> Self {
        let from = config
            .mail_from
            .parse()
            .expect("MAIL_FROM must be a valid mailbox address");

        let transport = match (&config.smtp_host, &config.smtp_user, &config.smtp_password) {
            (Some(host), Some(user), Some(password)) => {
                match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                    Ok(builder) => Some(
                        builder
                            .credentials(Credentials::new(user.clone(), password.clone()))
                            .build(),
                    ),
                    Err(e) => {
                        log::warn!("Invalid SMTP configuration, mail disabled: {}", e);
                        None
                    }
                }
            }
            _ => {
                log::info!("SMTP not configured, mail disabled");
                None
            }
        };

        Self { transport, from }
    }

    /// A mailer that never sends. Used where no SMTP settings exist at all.
    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: "task-manager-app <noreply@localhost>"
                .parse()
                .expect("static mailbox address"),
        }
    }

    pub fn send_welcome(&self, email: &str, name: &str) {
        self.send(
            email,
            "Thanks for joining in..",
            format!(
                "Welcome to the task-manager app, {}! Let us know how you get along with the app.",
                name
            ),
        );
    }

    pub fn send_cancellation(&self, email: &str, name: &str) {
        self.send(
            email,
            "Account Removal",
            format!("Hey {}! Let us know why you deleted your account.", name),
        );
    }

    fn send(&self, to: &str, subject: &str, body: String) {
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => {
                log::info!("Mail disabled, skipping \"{}\" to {}", subject, to);
                return;
            }
        };

        let recipient: Mailbox = match to.parse() {
            Ok(recipient) => recipient,
            Err(e) => {
                log::warn!("Not sending \"{}\": invalid recipient {}: {}", subject, to, e);
                return;
            }
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .body(body)
        {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Failed to build \"{}\" mail for {}: {}", subject, to, e);
                return;
            }
        };

        let subject = subject.to_string();
        let to = to.to_string();
        actix_web::rt::spawn(async move {
            match transport.send(message).await {
                Ok(response) => log::debug!("Sent \"{}\" to {}: {:?}", subject, to, response),
                Err(e) => log::warn!("Failed to send \"{}\" to {}: {}", subject, to, e),
            }
        });
    }
}
