#![allow(clippy::unwrap_used)]

use notio_bot::utils::validation::*;

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        let valid_names = vec![
            "Дз".to_string(),
            "стоматолог".to_string(),
            "Homework".to_string(),
            "Отчёт по проекту #2".to_string(),
            "A".repeat(MAX_NAME_CHARS),
        ];

        for name in valid_names {
            assert!(validate_note_name(&name).is_ok(), "Should accept note name: {}", name);
            assert!(validate_event_name(&name).is_ok(), "Should accept event name: {}", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        let invalid_names = vec![
            "".to_string(),
            "   ".to_string(),
            "две\nстроки".to_string(),
            "A".repeat(MAX_NAME_CHARS + 1),
        ];

        for name in invalid_names {
            assert!(validate_note_name(&name).is_err(), "Should reject note name: {:?}", name);
        }
    }

    #[test]
    fn test_name_length_counts_characters_not_bytes() {
        // Cyrillic letters take two bytes each.
        let name = "я".repeat(MAX_NAME_CHARS);
        assert!(validate_event_name(&name).is_ok());
    }

    #[test]
    fn test_note_content() {
        assert!(validate_note_content("выучить ии").is_ok());
        assert!(validate_note_content("строка 1\nстрока 2").is_ok());
        assert!(validate_note_content(" ").is_err());
        assert!(validate_note_content(&"x".repeat(MAX_NOTE_CHARS + 1)).is_err());
    }

    #[test]
    fn test_day_window_bounds() {
        assert!(validate_day_window(0).is_ok());
        assert_eq!(validate_day_window(30).ok(), Some(30));
        assert!(validate_day_window(-1).is_err());
        assert!(validate_day_window(MAX_DAY_WINDOW + 1).is_err());
    }

    #[test]
    fn test_negative_window_message() {
        let error = validate_day_window(-5).unwrap_err();
        assert_eq!(error.to_string(), "Количество дней не может быть отрицательным");
    }

    #[test]
    fn test_tags() {
        assert!(validate_tag("учеба").is_ok());
        assert!(validate_tag("#учеба").is_ok());
        assert!(validate_tag("#").is_err());
        assert!(validate_tag("две части").is_err());
    }

    #[test]
    fn test_remind_before() {
        assert!(validate_remind_before(0).is_ok());
        assert!(validate_remind_before(48).is_ok());
        assert!(validate_remind_before(-1).is_err());
    }
}
