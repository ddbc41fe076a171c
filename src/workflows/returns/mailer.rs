use crate::config::MailSettings;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fmt::Debug;
use std::path::PathBuf;

/// Fully composed outgoing message; the gateway only transports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMail {
    pub to_address: String,
    pub display_name: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum MailSendError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not read attachment '{path}': {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not assemble message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport failed: {0}")]
    Transport(String),
    #[error("invalid attachment content type: {0}")]
    ContentType(String),
}

/// Seam between the dispatch driver and the actual mail transport. Tests
/// substitute recording or failing implementations.
pub trait MailGateway: Debug {
    fn send(&self, mail: &SheetMail) -> Result<(), MailSendError>;
}

/// STARTTLS SMTP transport carrying the configured sender identity.
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn connect(settings: &MailSettings) -> Result<Self, MailSendError> {
        let from: Mailbox = settings.from_address.parse()?;
        let transport = SmtpTransport::starttls_relay(&settings.smtp_host)
            .map_err(Self::map_transport)?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }

    fn map_transport(err: lettre::transport::smtp::Error) -> MailSendError {
        MailSendError::Transport(err.to_string())
    }
}

impl Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl MailGateway for SmtpMailer {
    fn send(&self, mail: &SheetMail) -> Result<(), MailSendError> {
        let bytes =
            std::fs::read(&mail.attachment).map_err(|source| MailSendError::Attachment {
                path: mail.attachment.clone(),
                source,
            })?;
        let attachment_name = mail
            .attachment
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let to = Mailbox::new(Some(mail.display_name.clone()), mail.to_address.parse()?);
        let content_type = ContentType::parse("application/octet-stream")
            .map_err(|err| MailSendError::ContentType(err.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.body.clone()),
                    )
                    .singlepart(Attachment::new(attachment_name).body(bytes, content_type)),
            )?;

        self.transport.send(&message).map_err(Self::map_transport)?;
        Ok(())
    }
}
