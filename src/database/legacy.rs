//! Upgrade path for databases written before the current schema.
//!
//! Old `events` and `notes` tables have no `name_key` or `created_at` column,
//! and old notes hold their tags as one plain string or a `{a,b}` array
//! literal. SQLite cannot add a column conditionally and its `lower()` only
//! folds ASCII, so the upgrade runs here instead of in a migration: old tables
//! are renamed to `legacy_*` before the migrations create the new ones, and
//! their rows are copied over afterwards.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::{FromRow, SqlitePool};

use super::models::{name_key, normalize_tags};
use crate::utils::datetime::{parse_db_timestamp, to_db_timestamp};
use crate::utils::logging::{log_database_operation, log_system_event};

const LEGACY_EVENTS: &str = "legacy_events";
const LEGACY_NOTES: &str = "legacy_notes";

/// Reminder offset for old rows that stored none.
const LEGACY_REMIND_BEFORE: i64 = 24;

#[derive(Debug, FromRow)]
struct LegacyEvent {
    id: i64,
    user_id: Option<i64>,
    event_name: Option<String>,
    event_date: Option<String>,
    remind_before: Option<i64>,
}

#[derive(Debug, FromRow)]
struct LegacyNote {
    id: i64,
    user_id: Option<i64>,
    note_name: Option<String>,
    note_content: Option<String>,
    tags: Option<String>,
}

/// Renames old-style `events`/`notes` tables out of the way of the migrations.
pub async fn set_aside_legacy_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for (table, legacy) in [("events", LEGACY_EVENTS), ("notes", LEGACY_NOTES)] {
        if !table_exists(pool, table).await? || has_column(pool, table, "name_key").await? {
            continue;
        }

        if table_exists(pool, legacy).await? {
            // An earlier upgrade stopped half way; its copy is still pending.
            return Err(sqlx::Error::Protocol(format!(
                "both {table} and {legacy} use the old schema; remove one of them"
            )));
        }

        sqlx::query(&format!("ALTER TABLE {table} RENAME TO {legacy}"))
            .execute(pool)
            .await?;
        log_system_event("legacy table set aside", Some(&format!("{table} -> {legacy}")));
    }

    Ok(())
}

/// Copies rows from any `legacy_*` table into the current schema and drops it.
pub async fn import_legacy_rows(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if table_exists(pool, LEGACY_EVENTS).await? {
        import_events(pool).await?;
    }
    if table_exists(pool, LEGACY_NOTES).await? {
        import_notes(pool).await?;
    }
    Ok(())
}

async fn import_events(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let rows = sqlx::query_as::<_, LegacyEvent>(&format!(
        "SELECT id,
                CAST(user_id AS INTEGER) AS user_id,
                CAST(event_name AS TEXT) AS event_name,
                CAST(event_date AS TEXT) AS event_date,
                CAST(remind_before AS INTEGER) AS remind_before
         FROM {LEGACY_EVENTS} ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    let created_at = to_db_timestamp(&Utc::now());
    let mut imported = 0usize;
    let mut tx = pool.begin().await?;

    for row in &rows {
        let name = row.event_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let date = row.event_date.as_deref().and_then(legacy_timestamp);
        let (Some(user_id), Some(name), Some(date)) = (row.user_id, name, date) else {
            tracing::warn!("Skipping legacy event {}: missing user, name or readable date", row.id);
            continue;
        };

        sqlx::query(
            "INSERT INTO events (id, user_id, event_name, name_key, event_date, remind_before, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(user_id)
        .bind(name)
        .bind(name_key(name))
        .bind(to_db_timestamp(&date))
        .bind(row.remind_before.unwrap_or(LEGACY_REMIND_BEFORE).max(0))
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
        imported += 1;
    }

    sqlx::query(&format!("DROP TABLE {LEGACY_EVENTS}"))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log_database_operation(
        "IMPORT",
        "events",
        Some(&format!("{imported} of {} legacy rows", rows.len())),
    );
    Ok(())
}

async fn import_notes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let rows = sqlx::query_as::<_, LegacyNote>(&format!(
        "SELECT id,
                CAST(user_id AS INTEGER) AS user_id,
                CAST(note_name AS TEXT) AS note_name,
                CAST(note_content AS TEXT) AS note_content,
                CAST(tags AS TEXT) AS tags
         FROM {LEGACY_NOTES} ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    let created_at = to_db_timestamp(&Utc::now());
    let mut taken: HashSet<(i64, String)> = HashSet::new();
    let mut imported = 0usize;
    let mut tx = pool.begin().await?;

    for row in &rows {
        let base = row.note_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let (Some(user_id), Some(base)) = (row.user_id, base) else {
            tracing::warn!("Skipping legacy note {}: missing user or name", row.id);
            continue;
        };

        let name = unique_name(&mut taken, user_id, base);
        let tags = serde_json::to_string(&legacy_tags(row.tags.as_deref()))
            .unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO notes (id, user_id, note_name, name_key, note_content, tags, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(user_id)
        .bind(&name)
        .bind(name_key(&name))
        .bind(row.note_content.as_deref().unwrap_or_default().trim())
        .bind(tags)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
        imported += 1;
    }

    sqlx::query(&format!("DROP TABLE {LEGACY_NOTES}"))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log_database_operation(
        "IMPORT",
        "notes",
        Some(&format!("{imported} of {} legacy rows", rows.len())),
    );
    Ok(())
}

/// Note names are unique per user now; later duplicates get a ` (2)`, ` (3)` suffix.
fn unique_name(taken: &mut HashSet<(i64, String)>, user_id: i64, base: &str) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while !taken.insert((user_id, name_key(&name))) {
        suffix += 1;
        name = format!("{base} ({suffix})");
    }
    name
}

/// Reads a JSON array, a `{a,b}` array literal or a single plain tag.
fn legacy_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Vec::new();
    };

    if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
        return normalize_tags(&tags);
    }

    match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        Some(list) => {
            let tags: Vec<&str> = list.split(',').map(|t| t.trim().trim_matches('"')).collect();
            normalize_tags(&tags)
        }
        None => normalize_tags(&[raw]),
    }
}

fn legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    parse_db_timestamp(raw).or_else(|| {
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_tags_forms() {
        assert_eq!(legacy_tags(Some("Учеба")), vec!["учеба".to_string()]);
        assert_eq!(
            legacy_tags(Some("{учеба,\"ии\"}")),
            vec!["учеба".to_string(), "ии".to_string()]
        );
        assert_eq!(legacy_tags(Some(r##"["#работа"]"##)), vec!["работа".to_string()]);
        assert!(legacy_tags(Some("  ")).is_empty());
        assert!(legacy_tags(None).is_empty());
    }

    #[test]
    fn test_legacy_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 7, 13, 12, 0, 0).unwrap();
        assert_eq!(legacy_timestamp("2024-07-13T12:00:00Z"), Some(expected));
        assert_eq!(legacy_timestamp("2024-07-13 12:00:00"), Some(expected));
        assert_eq!(legacy_timestamp("2024-07-13 12:00:00.000"), Some(expected));
        assert_eq!(legacy_timestamp("2024-07-13 12:00"), Some(expected));
        assert_eq!(legacy_timestamp("завтра"), None);
    }

    #[test]
    fn test_unique_name_suffixes_duplicates() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name(&mut taken, 1, "Дз"), "Дз");
        assert_eq!(unique_name(&mut taken, 1, "ДЗ"), "ДЗ (2)");
        assert_eq!(unique_name(&mut taken, 1, "дз"), "дз (3)");
        assert_eq!(unique_name(&mut taken, 2, "Дз"), "Дз");
    }
}
