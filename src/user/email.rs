use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub kind: EmailKind,
    pub to: String,
    pub username: String,
    pub code: String,
}

/// Delivers verification and password-reset codes
pub trait EmailSender: Send + Sync {
    fn send(&self, message: EmailMessage);
}

/// Writes messages to the log instead of a mail server
#[derive(Debug, Default)]
pub struct LoggingEmailSender;

impl EmailSender for LoggingEmailSender {
    fn send(&self, message: EmailMessage) {
        info!(
            kind = ?message.kind,
            to = %message.to,
            username = %message.username,
            code = %message.code,
            "Sending email"
        );
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingEmailSender {
    messages: std::sync::Mutex<Vec<EmailMessage>>,
}

#[cfg(test)]
impl RecordingEmailSender {
    pub fn last(&self) -> Option<EmailMessage> {
        self.messages.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[cfg(test)]
impl EmailSender for RecordingEmailSender {
    fn send(&self, message: EmailMessage) {
        self.messages.lock().unwrap().push(message);
    }
}
