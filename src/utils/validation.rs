use anyhow::{anyhow, Result};

/// Largest accepted day window for listing or bulk deletion.
pub const MAX_DAY_WINDOW: i64 = 36_500;

pub const MAX_NAME_CHARS: usize = 200;

pub const MAX_NOTE_CHARS: usize = 4000;

pub fn validate_day_window(days: i64) -> Result<i64> {
    if days < 0 {
        return Err(anyhow!("Количество дней не может быть отрицательным"));
    }

    if days > MAX_DAY_WINDOW {
        return Err(anyhow!("Слишком большой период: не больше {} дней", MAX_DAY_WINDOW));
    }

    Ok(days)
}

pub fn validate_remind_before(hours: i64) -> Result<i64> {
    if hours < 0 {
        return Err(anyhow!("Напоминание не может быть позже события"));
    }

    if hours > MAX_DAY_WINDOW * 24 {
        return Err(anyhow!("Слишком раннее напоминание"));
    }

    Ok(hours)
}

fn validate_name(name: &str, what: &str) -> Result<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("{what} не может быть пустым"));
    }

    if name.chars().count() > MAX_NAME_CHARS {
        return Err(anyhow!("{what} не может быть длиннее {MAX_NAME_CHARS} символов"));
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(anyhow!("{what} не может содержать переносы строк"));
    }

    Ok(())
}

pub fn validate_event_name(name: &str) -> Result<()> {
    validate_name(name, "Название события")
}

pub fn validate_note_name(name: &str) -> Result<()> {
    validate_name(name, "Название заметки")
}

pub fn validate_note_content(content: &str) -> Result<()> {
    let content = content.trim();

    if content.is_empty() {
        return Err(anyhow!("Текст заметки не может быть пустым"));
    }

    if content.chars().count() > MAX_NOTE_CHARS {
        return Err(anyhow!("Текст заметки не может быть длиннее {MAX_NOTE_CHARS} символов"));
    }

    Ok(())
}

pub fn validate_tag(tag: &str) -> Result<()> {
    let tag = tag.trim().trim_start_matches('#');

    if tag.is_empty() {
        return Err(anyhow!("Тег не может быть пустым"));
    }

    if tag.chars().any(char::is_whitespace) {
        return Err(anyhow!("Тег должен быть одним словом"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_day_window() {
        assert!(validate_day_window(0).is_ok());
        assert!(validate_day_window(7).is_ok());
        assert!(validate_day_window(MAX_DAY_WINDOW).is_ok());
        assert!(validate_day_window(-1).is_err());
        assert!(validate_day_window(MAX_DAY_WINDOW + 1).is_err());
    }

    #[test]
    fn test_validate_remind_before() {
        assert!(validate_remind_before(0).is_ok());
        assert!(validate_remind_before(24).is_ok());
        assert!(validate_remind_before(-2).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_event_name("стоматолог").is_ok());
        assert!(validate_event_name("   ").is_err());
        assert!(validate_note_name("Дз").is_ok());
        assert!(validate_note_name(&"я".repeat(MAX_NAME_CHARS)).is_ok());
        assert!(validate_note_name(&"я".repeat(MAX_NAME_CHARS + 1)).is_err());
        assert!(validate_note_name("две\nстроки").is_err());
    }

    #[test]
    fn test_validate_note_content() {
        assert!(validate_note_content("выучить ии").is_ok());
        assert!(validate_note_content("").is_err());
        assert!(validate_note_content(&"a".repeat(MAX_NOTE_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("учеба").is_ok());
        assert!(validate_tag("#учеба").is_ok());
        assert!(validate_tag("#").is_err());
        assert!(validate_tag("два слова").is_err());
    }
}
