//! Executes interpreted actions against storage.
//!
//! Every request produces `Result<Reply, CommandError>`; [`render_outcome`] is
//! the single place that turns either side into user-visible text.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use thiserror::Error;

use crate::database::connection::DatabaseManager;
use crate::database::models::{is_unique_violation, name_key, normalize_tag, Event, Note};
use crate::interpreter::{Action, Interpretation};
use crate::utils::datetime::format_datetime;
use crate::utils::feedback::{FeedbackType, Reply};
use crate::utils::logging::{log_database_error, log_database_operation};
use crate::utils::validation::{
    validate_day_window, validate_event_name, validate_note_content, validate_note_name,
    validate_remind_before, validate_tag,
};

pub const UNRECOGNIZED_REPLY: &str = "Я не понял ваш запрос, попробуйте иначе.";
pub const STORAGE_FAILURE_REPLY: &str = "Произошла ошибка при выполнении запроса. Попробуйте позже.";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("request not understood")]
    Unrecognized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<anyhow::Error> for CommandError {
    fn from(error: anyhow::Error) -> Self {
        CommandError::Validation(error.to_string())
    }
}

/// Values applied when a request leaves them out.
#[derive(Debug, Clone, Copy)]
pub struct DispatchDefaults {
    pub remind_before_hours: i64,
    pub list_days: i64,
    pub offset: FixedOffset,
}

#[derive(Clone)]
pub struct CommandDispatcher {
    db: DatabaseManager,
    defaults: DispatchDefaults,
}

impl CommandDispatcher {
    pub fn new(db: DatabaseManager, defaults: DispatchDefaults) -> Self {
        Self { db, defaults }
    }

    pub async fn handle(
        &self,
        user_id: i64,
        interpretation: Interpretation,
        now: DateTime<Utc>,
    ) -> Result<Reply, CommandError> {
        match interpretation {
            Interpretation::Action(action) => self.dispatch(user_id, action, now).await,
            Interpretation::Invalid(reason) => Err(CommandError::Validation(reason)),
            Interpretation::Unrecognized => Err(CommandError::Unrecognized),
        }
    }

    pub async fn dispatch(
        &self,
        user_id: i64,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<Reply, CommandError> {
        match action {
            Action::CreateEvent { name, date, remind_before } => {
                self.create_event(user_id, &name, date, remind_before).await
            }
            Action::ListEvents { days } => self.list_events(user_id, days, now).await,
            Action::DeleteEvent { name } => self.delete_event(user_id, &name).await,
            Action::DeleteEventsWithin { days } => {
                self.delete_events_within(user_id, days, now).await
            }
            Action::CreateNote { name, content, tags } => {
                self.create_note(user_id, &name, &content, &tags).await
            }
            Action::ListNotesByTag { tag } => self.list_notes_by_tag(user_id, &tag).await,
            Action::OpenNote { name } => self.open_note(user_id, &name).await,
            Action::DeleteNote { name } => self.delete_note(user_id, &name).await,
            Action::RenameNote { name, new_name, tags } => {
                self.rename_note(user_id, &name, &new_name, tags.as_deref()).await
            }
        }
    }

    async fn create_event(
        &self,
        user_id: i64,
        name: &str,
        date: DateTime<Utc>,
        remind_before: Option<i64>,
    ) -> Result<Reply, CommandError> {
        validate_event_name(name)?;
        let remind_before =
            validate_remind_before(remind_before.unwrap_or(self.defaults.remind_before_hours))?;

        let event = Event::create(&self.db.pool, user_id, name, date, remind_before)
            .await
            .map_err(|e| storage_error("INSERT", "events", e))?;
        log_database_operation("INSERT", "events", Some(&format!("id {}", event.id)));

        Ok(Reply::new(
            FeedbackType::Success,
            format!(
                "Событие '{}' создано на {} с напоминанием за {} ч.",
                event.event_name,
                format_datetime(&date, &self.defaults.offset),
                remind_before
            ),
        ))
    }

    fn window(&self, days: Option<i64>) -> Result<Duration, CommandError> {
        let days = validate_day_window(days.unwrap_or(self.defaults.list_days))?;
        Ok(Duration::days(days))
    }

    async fn list_events(
        &self,
        user_id: i64,
        days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Reply, CommandError> {
        let window = self.window(days)?;

        let events = Event::find_between(&self.db.pool, user_id, now, now + window)
            .await
            .map_err(|e| storage_error("SELECT", "events", e))?;

        if events.is_empty() {
            return Ok(Reply::new(FeedbackType::Empty, "Нет запланированных событий."));
        }

        let lines: Vec<String> = events
            .iter()
            .map(|event| {
                let when = event
                    .date()
                    .map(|date| format_datetime(&date, &self.defaults.offset))
                    .unwrap_or_else(|| event.event_date.clone());
                format!("— {} — {}", event.event_name, when)
            })
            .collect();

        Ok(Reply::new(
            FeedbackType::Calendar,
            format!("Ваши планы:\n{}", lines.join("\n")),
        ))
    }

    async fn delete_event(&self, user_id: i64, name: &str) -> Result<Reply, CommandError> {
        validate_event_name(name)?;

        let deleted = Event::delete_by_name(&self.db.pool, user_id, name)
            .await
            .map_err(|e| storage_error("DELETE", "events", e))?;

        if deleted {
            Ok(Reply::new(FeedbackType::Deleted, format!("Событие '{}' удалено.", name.trim())))
        } else {
            Err(CommandError::NotFound(format!("Событие '{}' не найдено.", name.trim())))
        }
    }

    async fn delete_events_within(
        &self,
        user_id: i64,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Reply, CommandError> {
        let window = self.window(Some(days))?;

        let removed = Event::delete_between(&self.db.pool, user_id, now, now + window)
            .await
            .map_err(|e| storage_error("DELETE", "events", e))?;

        if removed == 0 {
            return Ok(Reply::new(
                FeedbackType::Empty,
                format!("На ближайшие {days} дн. событий нет."),
            ));
        }

        Ok(Reply::new(
            FeedbackType::Deleted,
            format!("Удалено событий: {removed}."),
        ))
    }

    async fn create_note(
        &self,
        user_id: i64,
        name: &str,
        content: &str,
        tags: &[String],
    ) -> Result<Reply, CommandError> {
        validate_note_name(name)?;
        validate_note_content(content)?;
        for tag in tags {
            validate_tag(tag)?;
        }

        match Note::create(&self.db.pool, user_id, name, content, tags).await {
            Ok(note) => {
                log_database_operation("INSERT", "notes", Some(&format!("id {}", note.id)));
                Ok(Reply::new(
                    FeedbackType::NoteSaved,
                    format!("Заметка '{}' создана.", note.note_name),
                ))
            }
            Err(e) if is_unique_violation(&e) => Err(CommandError::Conflict(format!(
                "Заметка '{}' уже существует.",
                name.trim()
            ))),
            Err(e) => Err(storage_error("INSERT", "notes", e)),
        }
    }

    async fn list_notes_by_tag(&self, user_id: i64, tag: &str) -> Result<Reply, CommandError> {
        validate_tag(tag)?;

        let notes = Note::find_by_tag(&self.db.pool, user_id, tag)
            .await
            .map_err(|e| storage_error("SELECT", "notes", e))?;

        if notes.is_empty() {
            return Ok(Reply::new(FeedbackType::Empty, "Заметок с таким тегом нет."));
        }

        let lines: Vec<String> = notes.iter().map(|note| format!("- {}", note.note_name)).collect();
        Ok(Reply::new(
            FeedbackType::Notes,
            format!("Заметки с тегом {}:\n{}", normalize_tag(tag), lines.join("\n")),
        ))
    }

    async fn open_note(&self, user_id: i64, name: &str) -> Result<Reply, CommandError> {
        validate_note_name(name)?;

        let note = Note::find_by_name(&self.db.pool, user_id, name)
            .await
            .map_err(|e| storage_error("SELECT", "notes", e))?
            .ok_or_else(|| CommandError::NotFound("Заметка не найдена.".to_string()))?;

        Ok(Reply::new(
            FeedbackType::NoteContent,
            format!("{}:\n{}", note.note_name, note.note_content),
        ))
    }

    async fn delete_note(&self, user_id: i64, name: &str) -> Result<Reply, CommandError> {
        validate_note_name(name)?;

        let deleted = Note::delete_by_name(&self.db.pool, user_id, name)
            .await
            .map_err(|e| storage_error("DELETE", "notes", e))?;

        if deleted {
            Ok(Reply::new(FeedbackType::Deleted, format!("Заметка '{}' удалена.", name.trim())))
        } else {
            Err(CommandError::NotFound("Заметка не найдена.".to_string()))
        }
    }

    async fn rename_note(
        &self,
        user_id: i64,
        name: &str,
        new_name: &str,
        tags: Option<&[String]>,
    ) -> Result<Reply, CommandError> {
        validate_note_name(name)?;
        validate_note_name(new_name)?;
        for tag in tags.unwrap_or_default() {
            validate_tag(tag)?;
        }

        let note = Note::find_by_name(&self.db.pool, user_id, name)
            .await
            .map_err(|e| storage_error("SELECT", "notes", e))?
            .ok_or_else(|| CommandError::NotFound("Заметка не найдена.".to_string()))?;

        if name_key(new_name) != name_key(&note.note_name) {
            let taken = Note::find_by_name(&self.db.pool, user_id, new_name)
                .await
                .map_err(|e| storage_error("SELECT", "notes", e))?;
            if taken.is_some() {
                return Err(CommandError::Conflict(format!(
                    "Заметка '{}' уже существует.",
                    new_name.trim()
                )));
            }
        }

        match Note::rename(&self.db.pool, note.id, new_name, tags).await {
            Ok(()) => Ok(Reply::new(
                FeedbackType::Success,
                format!("Заметка '{}' переименована в '{}'.", note.note_name, new_name.trim()),
            )),
            Err(e) if is_unique_violation(&e) => Err(CommandError::Conflict(format!(
                "Заметка '{}' уже существует.",
                new_name.trim()
            ))),
            Err(e) => Err(storage_error("UPDATE", "notes", e)),
        }
    }
}

fn storage_error(operation: &str, table: &str, error: sqlx::Error) -> CommandError {
    log_database_error(operation, table, &error.to_string(), None);
    CommandError::Storage(error)
}

/// Maps every dispatch outcome to the reply the user sees.
pub fn render_outcome(outcome: Result<Reply, CommandError>) -> Reply {
    match outcome {
        Ok(reply) => reply,
        Err(CommandError::Unrecognized) => Reply::new(FeedbackType::Error, UNRECOGNIZED_REPLY),
        Err(CommandError::Validation(message)) => Reply::new(FeedbackType::Error, message),
        Err(CommandError::NotFound(message)) => Reply::new(FeedbackType::Empty, message),
        Err(CommandError::Conflict(message)) => Reply::new(FeedbackType::Warning, message),
        Err(CommandError::Storage(_)) => Reply::new(FeedbackType::Warning, STORAGE_FAILURE_REPLY),
    }
}
