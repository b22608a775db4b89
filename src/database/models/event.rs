use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::name_key;
use crate::utils::datetime::{parse_db_timestamp, to_db_timestamp};

const EVENT_COLUMNS: &str =
    "id, user_id, event_name, event_date, remind_before, reminded_at, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub user_id: i64,
    pub event_name: String,
    pub event_date: String,
    pub remind_before: i64, // hours
    pub reminded_at: Option<String>,
    pub created_at: String,
}

impl Event {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        parse_db_timestamp(&self.event_date)
    }

    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        event_name: &str,
        event_date: DateTime<Utc>,
        remind_before: i64,
    ) -> Result<Self, sqlx::Error> {
        let event_name = event_name.trim();
        let result = sqlx::query(
            r#"
            INSERT INTO events (user_id, event_name, name_key, event_date, remind_before, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(event_name)
        .bind(name_key(event_name))
        .bind(to_db_timestamp(&event_date))
        .bind(remind_before)
        .bind(to_db_timestamp(&Utc::now()))
        .execute(pool)
        .await?;

        Self::find_by_id(pool, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Events with `from <= event_date <= to`, soonest first.
    pub async fn find_between(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ? AND event_date BETWEEN ? AND ?
             ORDER BY event_date, id"
        ))
        .bind(user_id)
        .bind(to_db_timestamp(&from))
        .bind(to_db_timestamp(&to))
        .fetch_all(pool)
        .await
    }

    /// Deletes the most recently created event with this name.
    pub async fn delete_by_name(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        event_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM events WHERE id = (
                SELECT id FROM events WHERE user_id = ? AND name_key = ?
                ORDER BY id DESC LIMIT 1
             )",
        )
        .bind(user_id)
        .bind(name_key(event_name))
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_between(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM events WHERE user_id = ? AND event_date BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(to_db_timestamp(&from))
        .bind(to_db_timestamp(&to))
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_for_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Events not yet reminded whose reminder instant
    /// (`event_date - remind_before` hours) falls in `[window_start, window_end)`.
    pub async fn find_due_reminders(
        pool: &sqlx::SqlitePool,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE reminded_at IS NULL
               AND CAST(strftime('%s', event_date) AS INTEGER) - remind_before * 3600 >= ?
               AND CAST(strftime('%s', event_date) AS INTEGER) - remind_before * 3600 < ?
             ORDER BY event_date, id"
        ))
        .bind(window_start.timestamp())
        .bind(window_end.timestamp())
        .fetch_all(pool)
        .await
    }

    pub async fn mark_reminded(
        pool: &sqlx::SqlitePool,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE events SET reminded_at = ? WHERE id = ?")
            .bind(to_db_timestamp(&at))
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
