use tokio_cron_scheduler::{JobScheduler, Job};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use teloxide::{Bot, prelude::*};
use teloxide::types::{ChatId, ParseMode};
use crate::database::{connection::DatabaseManager, models::Event};
use crate::utils::datetime::format_datetime;
use crate::utils::feedback::FeedbackType;
use crate::utils::logging::log_system_event;
use crate::utils::markdown::{bold, escape_markdown};
use std::sync::Arc;

/// Length of one scheduler tick.
pub const TICK_SECONDS: i64 = 60;

pub struct ReminderService {
    bot: Bot,
    db: Arc<DatabaseManager>,
    lookback: Duration,
    offset: FixedOffset,
    scheduler: JobScheduler,
}

impl ReminderService {
    pub async fn new(
        bot: Bot,
        db: Arc<DatabaseManager>,
        lookback_minutes: i64,
        offset: FixedOffset,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            bot,
            db,
            lookback: Duration::minutes(lookback_minutes),
            offset,
            scheduler,
        })
    }

    /// Runs one catch-up pass, then schedules the minute job.
    ///
    /// The pass finishes before the job exists, so the two never select the
    /// same unmarked event.
    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self.check_reminders_now().await {
            Ok(sent) => log_system_event("startup reminder pass", Some(&format!("{sent} sent"))),
            Err(e) => tracing::warn!("Startup reminder pass failed: {}", e),
        }

        let bot = self.bot.clone();
        let db = self.db.clone();
        let lookback = self.lookback;
        let offset = self.offset;

        let reminder_job = Job::new_async("0 * * * * *", move |_uuid, _l| {
            let bot = bot.clone();
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = check_and_send_reminders(bot, db, lookback, offset).await {
                    tracing::error!("Failed to send reminders: {}", e);
                }
            })
        })?;

        self.scheduler.add(reminder_job).await?;
        self.scheduler.start().await?;

        tracing::info!(
            "Reminder service started - checking every minute with {} min lookback",
            self.lookback.num_minutes()
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// One tick on demand.
    pub async fn check_reminders_now(&self) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        check_and_send_reminders(self.bot.clone(), self.db.clone(), self.lookback, self.offset).await
    }
}

/// Reminder instants this tick is responsible for: `[now - lookback, now + tick)`.
pub fn reminder_window(now: DateTime<Utc>, lookback: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - lookback, now + Duration::seconds(TICK_SECONDS))
}

/// MarkdownV2 body of a reminder notification.
pub fn reminder_text(event: &Event, offset: &FixedOffset) -> String {
    let when = event
        .date()
        .map(|date| format_datetime(&date, offset))
        .unwrap_or_else(|| event.event_date.clone());

    format!(
        "{} Напоминание: {} запланировано на {}{}",
        FeedbackType::Reminder.emoji(),
        bold(&escape_markdown(&event.event_name)),
        escape_markdown(&when),
        escape_markdown("."),
    )
}

/// Sends every due reminder once. Returns how many were delivered.
async fn check_and_send_reminders(
    bot: Bot,
    db: Arc<DatabaseManager>,
    lookback: Duration,
    offset: FixedOffset,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now();
    let (window_start, window_end) = reminder_window(now, lookback);

    let due = Event::find_due_reminders(&db.pool, window_start, window_end).await?;
    let mut delivered = 0;

    for event in due {
        let sent = bot
            .send_message(ChatId(event.user_id), reminder_text(&event, &offset))
            .parse_mode(ParseMode::MarkdownV2)
            .await;

        match sent {
            Ok(_) => {
                // Only delivered reminders are marked; failures retry until the window passes.
                if let Err(e) = Event::mark_reminded(&db.pool, event.id, now).await {
                    tracing::error!("Failed to mark event {} as reminded: {}", event.id, e);
                    continue;
                }
                delivered += 1;
                tracing::info!(
                    "Sent reminder for event {} ('{}') to user {}",
                    event.id,
                    event.event_name,
                    event.user_id
                );
            }
            Err(e) => {
                tracing::error!("Failed to send reminder to user {}: {}", event.user_id, e);
            }
        }
    }

    Ok(delivered)
}
