use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::services::session_tracker::{Mode, SessionTracker};
use crate::utils::feedback::{CommandFeedback, FeedbackType, Reply};
use crate::utils::logging::log_command_success;

pub fn mode_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("📅 Календарь", Mode::Calendar.callback_data()),
        InlineKeyboardButton::callback("📚 Заметки", Mode::Notes.callback_data()),
    ]])
}

/// The message that opens a mode, with phrasing examples.
pub fn mode_intro(mode: Mode) -> Reply {
    match mode {
        Mode::Calendar => Reply::new(
            FeedbackType::Calendar,
            "Режим календаря. Примеры:\n\
             • запомни 13.07 в 12:00 стоматолог напомни в 10:00\n\
             • покажи события на 3 дня\n\
             • удали событие стоматолог\n\
             • удали события на 5 дней",
        ),
        Mode::Notes => Reply::new(
            FeedbackType::Notes,
            "Режим заметок. Примеры:\n\
             • создай заметку дз: выучить ии с тегом учеба\n\
             • заметки с тегом учеба\n\
             • открой заметку дз\n\
             • переименуй заметку дз в домашка\n\
             • удали заметку дз",
        ),
    }
}

/// Switches the user's mode, clearing the messages of the previous one.
pub async fn handle_mode_switch(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    mode: Mode,
    tracker: &SessionTracker,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let Some(stale) = tracker.switch_mode(user_id, mode).await else {
        let sent = feedback
            .reply_with_keyboard(
                &Reply::new(FeedbackType::Info, format!("Режим «{}» уже включён.", mode_title(mode))),
                mode_keyboard(),
            )
            .await?;
        tracker.track(user_id, sent.id).await;
        return Ok(());
    };

    let mut deleted = 0usize;
    for message_id in &stale {
        match bot.delete_message(chat_id, *message_id).await {
            Ok(_) => deleted += 1,
            Err(e) => tracing::debug!("Could not delete message {} in chat {}: {}", message_id.0, chat_id.0, e),
        }
    }

    let sent = feedback.reply_with_keyboard(&mode_intro(mode), mode_keyboard()).await?;
    tracker.track(user_id, sent.id).await;

    log_command_success(
        mode.as_str(),
        user_id,
        chat_id.0,
        Some(&format!("cleared {deleted} of {} messages", stale.len())),
    );
    Ok(())
}

fn mode_title(mode: Mode) -> &'static str {
    match mode {
        Mode::Calendar => "календарь",
        Mode::Notes => "заметки",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn test_mode_keyboard_callbacks() {
        let keyboard = mode_keyboard();
        let data: Vec<String> = keyboard.inline_keyboard[0]
            .iter()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(data, vec!["mode:calendar", "mode:notes"]);
    }

    #[test]
    fn test_mode_intros_match_mode() {
        assert_eq!(mode_intro(Mode::Calendar).kind, FeedbackType::Calendar);
        assert!(mode_intro(Mode::Notes).text.contains("создай заметку"));
    }
}
