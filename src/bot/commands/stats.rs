use teloxide::prelude::*;
use chrono::{Duration, Utc};
use crate::database::{connection::DatabaseManager, models::*};
use crate::utils::feedback::{CommandFeedback, FeedbackType, Reply};

/// Per-user totals shown by `/stats`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total_events: i64,
    pub upcoming_week: usize,
    pub total_notes: i64,
}

impl UserStats {
    pub fn reply(&self) -> Reply {
        Reply::new(
            FeedbackType::Info,
            format!(
                "Ваша статистика:\n\
                 • Событий всего: {}\n\
                 • Событий на неделю: {}\n\
                 • Заметок: {}",
                self.total_events, self.upcoming_week, self.total_notes
            ),
        )
    }
}

pub async fn get_user_stats(pool: &sqlx::SqlitePool, user_id: i64) -> Result<UserStats, sqlx::Error> {
    let now = Utc::now();
    Ok(UserStats {
        total_events: Event::count_for_user(pool, user_id).await?,
        upcoming_week: Event::find_between(pool, user_id, now, now + Duration::days(7)).await?.len(),
        total_notes: Note::count_for_user(pool, user_id).await?,
    })
}

pub async fn handle_stats(
    bot: Bot,
    msg: Message,
    user_id: i64,
    db: &DatabaseManager,
) -> ResponseResult<Message> {
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    match get_user_stats(&db.pool, user_id).await {
        Ok(stats) => feedback.reply(&stats.reply()).await,
        Err(e) => {
            tracing::error!("Failed to get stats for user {}: {}", user_id, e);
            feedback.error("Не удалось получить статистику. Попробуйте позже.").await
        }
    }
}
