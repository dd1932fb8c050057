use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{debug, error};

/// Delivery of plain-text messages to the configured chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
}

pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat: Recipient) -> Self {
        Self {
            bot: Bot::new(token),
            chat,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat.clone(), text)
            .await
            .with_context(|| format!("Failed to send message to chat {:?}", self.chat))?;
        Ok(())
    }
}

/// Send `text`, logging instead of propagating any failure.
pub async fn notify<N: Notifier + ?Sized>(notifier: &N, text: &str) {
    match notifier.send_text(text).await {
        Ok(()) => debug!("Message sent: \"{}\"", text),
        Err(e) => error!("Message delivery failed: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_text(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenNotifier;

    #[async_trait]
    impl Notifier for BrokenNotifier {
        async fn send_text(&self, _text: &str) -> Result<()> {
            anyhow::bail!("chat not found")
        }
    }

    #[tokio::test]
    async fn test_notify_delivers() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let notifier = RecordingNotifier { sent: sent.clone() };
        notify(&notifier, "hello").await;
        assert_eq!(*sent.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_notify_swallows_failures() {
        // Must return normally even though delivery fails.
        notify(&BrokenNotifier, "hello").await;
    }
}
