//! Telegram delivery.

use crate::notifier::{MessageSink, NotifyError, TextFormat};
use async_trait::async_trait;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use tracing::debug;

/// Upper bound on a single `sendMessage` call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    timeout: Duration,
}

impl TelegramBot {
    /// Create a new bot with the given token.
    pub fn new(token: &str) -> Result<Self, NotifyError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(NotifyError::NotConfigured("Telegram bot token"));
        }
        Ok(Self {
            bot: Bot::new(token),
            timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Errors from the transport layer can embed the request URL, which
    /// carries the token.
    fn scrub(&self, message: String) -> String {
        let token = self.bot.token();
        if token.is_empty() {
            message
        } else {
            message.replace(token, "****")
        }
    }
}

/// Numeric ids (including negative group ids) or `@channel` usernames.
pub fn parse_recipient(chat_id: &str) -> Result<Recipient, NotifyError> {
    let chat_id = chat_id.trim();
    if let Ok(id) = chat_id.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if chat_id.len() > 1 && chat_id.starts_with('@') {
        return Ok(Recipient::ChannelUsername(chat_id.to_string()));
    }
    Err(NotifyError::InvalidChat(chat_id.to_string()))
}

#[async_trait]
impl MessageSink for TelegramBot {
    async fn send_text(&self, chat_id: &str, text: &str, format: TextFormat) -> Result<(), NotifyError> {
        let recipient = parse_recipient(chat_id)?;
        let request = self.bot.send_message(recipient, text);
        let request = match format {
            TextFormat::Plain => request,
            TextFormat::Html => request.parse_mode(ParseMode::Html),
            TextFormat::Markdown => request.parse_mode(ParseMode::MarkdownV2),
        };

        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(message)) => {
                debug!(message_id = message.id.0, "Telegram message sent");
                Ok(())
            }
            Ok(Err(e)) => Err(NotifyError::Api(self.scrub(e.to_string()))),
            Err(_) => Err(NotifyError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient() {
        assert_eq!(parse_recipient("123456").unwrap(), Recipient::Id(ChatId(123456)));
        assert_eq!(
            parse_recipient(" -1001234567890 ").unwrap(),
            Recipient::Id(ChatId(-1001234567890))
        );
        assert_eq!(
            parse_recipient("@my_channel").unwrap(),
            Recipient::ChannelUsername("@my_channel".to_string())
        );
        assert!(matches!(parse_recipient("@"), Err(NotifyError::InvalidChat(_))));
        assert!(matches!(parse_recipient("not-a-chat"), Err(NotifyError::InvalidChat(_))));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            TelegramBot::new("   "),
            Err(NotifyError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_scrub_removes_token() {
        let bot = TelegramBot::new("123:abc").unwrap();
        let scrubbed = bot.scrub("error sending request for url (https://api.telegram.org/bot123:abc/SendMessage)".into());
        assert!(!scrubbed.contains("123:abc"));
        assert!(scrubbed.contains("bot****"));
    }
}
