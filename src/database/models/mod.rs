pub mod event;
pub mod note;

pub use event::*;
pub use note::*;

/// Case-folded lookup key for event and note names.
///
/// SQLite's `lower()` only folds ASCII, so names are folded here and stored
/// next to the display name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_key_folds_unicode() {
        assert_eq!(name_key("  Homework "), "homework");
        assert_eq!(name_key("ДЗ"), "дз");
        assert_eq!(name_key("Стоматолог"), name_key("СТОМАТОЛОГ"));
    }
}
