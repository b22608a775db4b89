//! Helpers for Telegram MarkdownV2 formatting.
//!
//! MarkdownV2 rejects messages containing unescaped reserved characters, so
//! any user-supplied text must pass through [`escape_markdown`] first.

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escapes every MarkdownV2 reserved character with a backslash.
///
/// # Example
/// ```
/// use notio_bot::utils::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("13.07.2026 (стоматолог)!"), "13\\.07\\.2026 \\(стоматолог\\)\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Wraps already escaped text in bold markers.
pub fn bold(escaped: &str) -> String {
    format!("*{escaped}*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_basic_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("_italic_"), "\\_italic\\_");
        assert_eq!(escape_markdown("`code`"), "\\`code\\`");
    }

    #[test]
    fn test_escape_dates_and_punctuation() {
        assert_eq!(escape_markdown("13.07.2026 12:00"), "13\\.07\\.2026 12:00");
        assert_eq!(escape_markdown("— стоматолог — завтра!"), "— стоматолог — завтра\\!");
        assert_eq!(escape_markdown("- пункт"), "\\- пункт");
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(escape_markdown(""), "");
        assert_eq!(escape_markdown("выучить ии"), "выучить ии");
        assert_eq!(escape_markdown("123 ABC"), "123 ABC");
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold(&escape_markdown("Дз.")), "*Дз\\.*");
    }
}
