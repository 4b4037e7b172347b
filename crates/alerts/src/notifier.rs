//! Message delivery with length-aware chunking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Telegram's hard limit is 4096; leave headroom for the part prefix.
pub const DEFAULT_CHUNK_LIMIT: usize = 4000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Messaging API error: {0}")]
    Api(String),
    #[error("Delivery timed out after {0}s")]
    Timeout(u64),
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Invalid chat id: {0}")]
    InvalidChat(String),
    #[error("Refusing to send an empty message")]
    EmptyMessage,
}

/// How the messaging API should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
    Markdown,
}

impl TextFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "plain" | "none" => Some(TextFormat::Plain),
            "html" => Some(TextFormat::Html),
            "markdown" | "markdownv2" => Some(TextFormat::Markdown),
            _ => None,
        }
    }
}

/// Destination for rendered text.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str, format: TextFormat) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Maximum characters per message body.
    pub chunk_limit: usize,
    /// Applied to single-message reports only; split parts are always plain
    /// because a cut may land inside markup.
    pub format: TextFormat,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            format: TextFormat::Plain,
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub parts_total: usize,
    pub parts_sent: usize,
    pub errors: Vec<NotifyError>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.parts_total > 0 && self.parts_sent == self.parts_total
    }
}

/// Split `text` into consecutive slices of at most `limit` characters.
/// Concatenating the result yields `text` exactly.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(limit).map(|chunk| chunk.iter().collect()).collect()
}

/// Prefix each part with `[i/n]` when there is more than one.
pub fn label_parts(parts: Vec<String>) -> Vec<String> {
    let total = parts.len();
    if total <= 1 {
        return parts;
    }
    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| format!("[{}/{}]\n{}", i + 1, total, part))
        .collect()
}

/// Sends reports to a single chat through a [`MessageSink`].
pub struct Notifier<S> {
    sink: S,
    chat_id: String,
    config: NotifierConfig,
}

impl<S: MessageSink> Notifier<S> {
    pub fn new(sink: S, chat_id: impl Into<String>, config: NotifierConfig) -> Self {
        Self {
            sink,
            chat_id: chat_id.into(),
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Deliver `text`, split into parts when it exceeds the chunk limit.
    /// Each part is attempted once; failures are logged and collected so the
    /// remaining parts still go out.
    pub async fn deliver(&self, text: &str) -> DeliveryReport {
        if text.is_empty() {
            warn!("Empty report, nothing to deliver");
            return DeliveryReport {
                errors: vec![NotifyError::EmptyMessage],
                ..Default::default()
            };
        }

        let parts = label_parts(split_message(text, self.config.chunk_limit));
        let format = if parts.len() == 1 {
            self.config.format
        } else {
            TextFormat::Plain
        };

        let mut report = DeliveryReport {
            parts_total: parts.len(),
            ..Default::default()
        };

        for (index, part) in parts.iter().enumerate() {
            match self.sink.send_text(&self.chat_id, part, format).await {
                Ok(()) => {
                    debug!(part = index + 1, total = parts.len(), "Report part sent");
                    report.parts_sent += 1;
                }
                Err(e) => {
                    error!(part = index + 1, total = parts.len(), error = %e, "Report part failed");
                    report.errors.push(e);
                }
            }
        }

        if report.is_complete() {
            info!(parts = report.parts_total, chars = text.chars().count(), "Report delivered");
        } else {
            warn!(
                sent = report.parts_sent,
                total = report.parts_total,
                "Report delivery incomplete"
            );
        }
        report
    }
}
