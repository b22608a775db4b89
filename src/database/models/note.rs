use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::name_key;
use crate::utils::datetime::to_db_timestamp;

const NOTE_COLUMNS: &str = "id, user_id, note_name, note_content, tags, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub note_name: String,
    pub note_content: String,
    pub tags: String, // JSON array of lowercase tags
    pub created_at: String,
}

/// Lowercases, strips a leading `#`, drops empties and duplicates.
pub fn normalize_tags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = normalize_tag(tag.as_ref());
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').trim().to_lowercase()
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

impl Note {
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }

    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        note_name: &str,
        note_content: &str,
        tags: &[String],
    ) -> Result<Self, sqlx::Error> {
        let note_name = note_name.trim();
        let result = sqlx::query(
            r#"
            INSERT INTO notes (user_id, note_name, name_key, note_content, tags, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(note_name)
        .bind(name_key(note_name))
        .bind(note_content.trim())
        .bind(encode_tags(&normalize_tags(tags)))
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
        sqlx::query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        note_name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ? AND name_key = ? LIMIT 1"
        ))
        .bind(user_id)
        .bind(name_key(note_name))
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_tag(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        tag: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE user_id = ?
               AND EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?)
             ORDER BY name_key"
        ))
        .bind(user_id)
        .bind(normalize_tag(tag))
        .fetch_all(pool)
        .await
    }

    pub async fn rename(
        pool: &sqlx::SqlitePool,
        id: i64,
        new_name: &str,
        tags: Option<&[String]>,
    ) -> Result<(), sqlx::Error> {
        let new_name = new_name.trim();
        match tags {
            Some(tags) => {
                sqlx::query("UPDATE notes SET note_name = ?, name_key = ?, tags = ? WHERE id = ?")
                    .bind(new_name)
                    .bind(name_key(new_name))
                    .bind(encode_tags(&normalize_tags(tags)))
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE notes SET note_name = ?, name_key = ? WHERE id = ?")
                    .bind(new_name)
                    .bind(name_key(new_name))
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
        }

        Ok(())
    }

    pub async fn delete_by_name(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        note_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE user_id = ? AND name_key = ?")
            .bind(user_id)
            .bind(name_key(note_name))
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notes WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }
}

/// True when the error is a violation of the per-user unique note name.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let raw = vec!["Учеба", " #ИИ ", "учеба", "", "#"];
        assert_eq!(normalize_tags(&raw), vec!["учеба".to_string(), "ии".to_string()]);
    }

    #[test]
    fn test_tag_list_tolerates_malformed_value() {
        let mut note = Note {
            id: 1,
            user_id: 1,
            note_name: "Дз".to_string(),
            note_content: "выучить ии".to_string(),
            tags: "учеба".to_string(),
            created_at: String::new(),
        };
        assert!(note.tag_list().is_empty());

        note.tags = r#"["учеба","ии"]"#.to_string();
        assert_eq!(note.tag_list(), vec!["учеба".to_string(), "ии".to_string()]);
    }
}
