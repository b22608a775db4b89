use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use crate::utils::markdown::escape_markdown;

/// Reply categories, each rendered with its own leading emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackType {
    Success,
    Warning,
    Error,
    Info,
    Calendar,
    Notes,
    NoteSaved,
    NoteContent,
    Deleted,
    Empty,
    Reminder,
}

impl FeedbackType {
    pub fn emoji(&self) -> &'static str {
        match self {
            FeedbackType::Success => "✅",
            FeedbackType::Warning => "⚠️",
            FeedbackType::Error => "❗",
            FeedbackType::Info => "🤖",
            FeedbackType::Calendar => "📅",
            FeedbackType::Notes => "📚",
            FeedbackType::NoteSaved => "📝",
            FeedbackType::NoteContent => "📖",
            FeedbackType::Deleted => "🗑",
            FeedbackType::Empty => "📭",
            FeedbackType::Reminder => "🔔",
        }
    }
}

/// One outgoing reply: unformatted text plus its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: FeedbackType,
    pub text: String,
}

impl Reply {
    pub fn new(kind: FeedbackType, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    /// The reply as the user reads it.
    pub fn plain(&self) -> String {
        format!("{} {}", self.kind.emoji(), self.text)
    }

    /// The reply escaped for MarkdownV2.
    pub fn markdown(&self) -> String {
        format!("{} {}", self.kind.emoji(), escape_markdown(&self.text))
    }
}

/// Sends replies into one chat
pub struct CommandFeedback {
    bot: Bot,
    chat_id: ChatId,
}

impl CommandFeedback {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub async fn send(&self, feedback_type: FeedbackType, message: &str) -> ResponseResult<Message> {
        self.reply(&Reply::new(feedback_type, message)).await
    }

    pub async fn reply(&self, reply: &Reply) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, reply.markdown())
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    /// Sends a reply with inline buttons attached.
    pub async fn reply_with_keyboard(
        &self,
        reply: &Reply,
        keyboard: InlineKeyboardMarkup,
    ) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, reply.markdown())
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboard)
            .await
    }

    pub async fn error(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Error, message).await
    }

    /// Error with a hint on how to phrase the request.
    pub async fn validation_error(&self, error: &str, suggestion: &str) -> ResponseResult<Message> {
        let message = format!("{error}\n\n💡 Подсказка: {suggestion}");
        self.send(FeedbackType::Error, &message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_type_emojis() {
        assert_eq!(FeedbackType::Success.emoji(), "✅");
        assert_eq!(FeedbackType::Warning.emoji(), "⚠️");
        assert_eq!(FeedbackType::Empty.emoji(), "📭");
        assert_eq!(FeedbackType::Reminder.emoji(), "🔔");
    }

    #[test]
    fn test_reply_rendering() {
        let reply = Reply::new(FeedbackType::NoteSaved, "Заметка 'Дз' создана.");
        assert_eq!(reply.plain(), "📝 Заметка 'Дз' создана.");
        assert_eq!(reply.markdown(), "📝 Заметка 'Дз' создана\\.");
    }
}
