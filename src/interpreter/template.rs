//! Regex-template interpreter.
//!
//! Messages are lower-cased and matched against an ordered list of patterns;
//! the first match wins. Dates are written `dd.mm` and always land in the
//! current year of the bot's time zone. Note names may be quoted with `«»`
//! or `""`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc};
use regex::{Captures, Regex};

use super::{capitalize, split_tags, Action, ActionTag, Interpretation};
use crate::utils::datetime::{hours_before, local_to_utc, parse_clock, parse_day_month};

const DAYS_SUFFIX: &str = r"(?:\s*(?:дней|дня|день|дн))?";

/// Ordered: more specific verbs before the generic ones that share a prefix.
fn template_sources() -> Vec<(ActionTag, String)> {
    vec![
        (
            ActionTag::DeleteEventsWithin,
            format!(r"^удали(?:\s+все)?\s+события\s+(?:на|за)\s+(?P<days>-?[0-9]+){DAYS_SUFFIX}$"),
        ),
        (
            ActionTag::DeleteEvent,
            r"^удали\s+событие\s+(?P<name>.+)$".to_string(),
        ),
        (
            ActionTag::DeleteNote,
            r"^удали\s+заметку\s+(?P<name>.+)$".to_string(),
        ),
        (
            ActionTag::RenameNote,
            r#"^переименуй\s+заметку\s+["«](?P<name>[^"»]+)["»]\s+в\s+["«]?(?P<new_name>[^"»]+?)["»]?(?:\s+с\s+тег(?:ом|ами)\s+(?P<tags>.+))?$"#
                .to_string(),
        ),
        // Unquoted names split at the last ` в `, so the old name may contain it.
        (
            ActionTag::RenameNote,
            r"^переименуй\s+заметку\s+(?P<name>.+)\s+в\s+(?P<new_name>.+?)(?:\s+с\s+тег(?:ом|ами)\s+(?P<tags>.+))?$"
                .to_string(),
        ),
        (
            ActionTag::CreateNote,
            r"(?s)^(?:(?:создай|добавь|запиши)\s+заметку|новая\s+заметка)\s+(?P<name>[^:\n]+?)\s*:\s*(?P<content>.+?)(?:\s+с\s+тег(?:ом|ами)\s+(?P<tags>[^\n]+))?$"
                .to_string(),
        ),
        (
            ActionTag::ListNotesByTag,
            r"^(?:(?:покажи|найди)\s+)?заметки\s+(?:с\s+тегом|по\s+тегу)\s+(?P<tag>#?[^\s,]+)$".to_string(),
        ),
        (
            ActionTag::OpenNote,
            r"^(?:открой|покажи|прочитай)\s+заметку\s+(?P<name>.+)$".to_string(),
        ),
        (
            ActionTag::CreateEvent,
            r"^(?:запомни|напомни|(?:добавь|создай)\s+событие)\s+(?P<date>[0-9]{1,2}\.[0-9]{1,2})(?:\s+в\s+(?P<time>[0-9]{1,2}:[0-9]{2}))?\s+(?P<name>.+?)(?:\s+напомни\s+(?:в\s+(?P<remind_at>[0-9]{1,2}:[0-9]{2})|за\s+(?P<remind_hours>[0-9]+)\s*(?:часов|часа|час|ч)))?$"
                .to_string(),
        ),
        (
            ActionTag::ListEvents,
            format!(
                r"^(?:покажи|мои|какие)\s+(?:мои\s+)?(?:события|планы|дела)(?:\s+на\s+(?:(?P<days>-?[0-9]+){DAYS_SUFFIX}|(?P<today>сегодня)|(?P<week>неделю)|(?P<month>месяц)))?$"
            ),
        ),
    ]
}

struct Template {
    tag: ActionTag,
    regex: Regex,
}

pub struct TemplateInterpreter {
    templates: Vec<Template>,
    offset: FixedOffset,
}

impl TemplateInterpreter {
    pub fn new(offset: FixedOffset) -> Result<Self, regex::Error> {
        let templates = template_sources()
            .into_iter()
            .map(|(tag, source)| Ok(Template { tag, regex: Regex::new(&source)? }))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { templates, offset })
    }

    pub fn interpret(&self, text: &str, now: DateTime<Utc>) -> Interpretation {
        let normalized = normalize(text);

        self.templates
            .iter()
            .find_map(|template| {
                template
                    .regex
                    .captures(&normalized)
                    .map(|caps| self.build(template.tag, &caps, now))
            })
            .unwrap_or(Interpretation::Unrecognized)
    }

    fn build(&self, tag: ActionTag, caps: &Captures<'_>, now: DateTime<Utc>) -> Interpretation {
        let action = match tag {
            ActionTag::CreateEvent => return self.create_event(caps, now),
            ActionTag::ListEvents => {
                let days = if caps.name("today").is_some() {
                    Some(1)
                } else if caps.name("week").is_some() {
                    Some(7)
                } else if caps.name("month").is_some() {
                    Some(30)
                } else {
                    match optional_days(caps) {
                        Ok(days) => days,
                        Err(invalid) => return invalid,
                    }
                };
                Action::ListEvents { days }
            }
            ActionTag::DeleteEventsWithin => match optional_days(caps) {
                Ok(Some(days)) => Action::DeleteEventsWithin { days },
                Ok(None) => return Interpretation::Invalid("Не указано количество дней".to_string()),
                Err(invalid) => return invalid,
            },
            ActionTag::DeleteEvent => Action::DeleteEvent { name: capture(caps, "name") },
            ActionTag::CreateNote => Action::CreateNote {
                name: note_name(caps, "name"),
                content: capture(caps, "content"),
                tags: caps.name("tags").map(|m| split_tags(m.as_str())).unwrap_or_default(),
            },
            ActionTag::ListNotesByTag => Action::ListNotesByTag {
                tag: capture(caps, "tag").trim_start_matches('#').to_string(),
            },
            ActionTag::OpenNote => Action::OpenNote { name: note_name(caps, "name") },
            ActionTag::DeleteNote => Action::DeleteNote { name: note_name(caps, "name") },
            ActionTag::RenameNote => Action::RenameNote {
                name: note_name(caps, "name"),
                new_name: note_name(caps, "new_name"),
                tags: caps.name("tags").map(|m| split_tags(m.as_str())),
            },
        };

        Interpretation::Action(action)
    }

    fn create_event(&self, caps: &Captures<'_>, now: DateTime<Utc>) -> Interpretation {
        let raw_date = capture(caps, "date");
        let year = now.with_timezone(&self.offset).year();
        let Some(date) = parse_day_month(&raw_date, year) else {
            return Interpretation::Invalid(format!("Не удалось разобрать дату «{raw_date}»"));
        };

        let time = match caps.name("time") {
            Some(m) => match parse_clock(m.as_str()) {
                Some(time) => time,
                None => {
                    return Interpretation::Invalid(format!(
                        "Не удалось разобрать время «{}»",
                        m.as_str()
                    ))
                }
            },
            None => NaiveTime::MIN,
        };

        let remind_before = if let Some(m) = caps.name("remind_at") {
            match parse_clock(m.as_str()) {
                Some(remind_time) => Some(hours_before(time, remind_time)),
                None => {
                    return Interpretation::Invalid(format!(
                        "Не удалось разобрать время напоминания «{}»",
                        m.as_str()
                    ))
                }
            }
        } else if let Some(m) = caps.name("remind_hours") {
            match m.as_str().parse::<i64>() {
                Ok(hours) => Some(hours),
                Err(_) => return Interpretation::Invalid("Слишком большое число часов".to_string()),
            }
        } else {
            None
        };

        let Some(date) = local_to_utc(&self.offset, date, time) else {
            return Interpretation::Invalid(format!("Не удалось разобрать дату «{raw_date}»"));
        };

        Interpretation::Action(Action::CreateEvent {
            name: capture(caps, "name"),
            date,
            remind_before,
        })
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c| matches!(c, '.' | '!' | '?'))
        .trim()
        .to_lowercase()
}

fn capture(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// A note name, which may be written in quotes.
fn note_name(caps: &Captures<'_>, name: &str) -> String {
    let raw = capture(caps, name);
    capitalize(raw.trim_matches(|c| matches!(c, '"' | '«' | '»')))
}

fn optional_days(caps: &Captures<'_>) -> Result<Option<i64>, Interpretation> {
    match caps.name("days") {
        Some(m) => m
            .as_str()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Interpretation::Invalid("Некорректное количество дней".to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn interpreter() -> TemplateInterpreter {
        TemplateInterpreter::new(FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn action(text: &str) -> Action {
        match interpreter().interpret(text, now()) {
            Interpretation::Action(action) => action,
            other => panic!("expected an action for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_create_event_with_reminder_clock_time() {
        let parsed = action("запомни 13.07 в 12:00 стоматолог напомни в 10:00");
        assert_eq!(
            parsed,
            Action::CreateEvent {
                name: "стоматолог".to_string(),
                date: Utc.with_ymd_and_hms(2026, 7, 13, 12, 0, 0).unwrap(),
                remind_before: Some(2),
            }
        );
    }

    #[test]
    fn test_create_event_with_hours_and_without_reminder() {
        match action("Запомни 14.07 в 9:30 Отчёт по проекту напомни за 3 ч") {
            Action::CreateEvent { name, remind_before, .. } => {
                assert_eq!(name, "отчёт по проекту");
                assert_eq!(remind_before, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }

        match action("запомни 01.09 линейка") {
            Action::CreateEvent { name, date, remind_before } => {
                assert_eq!(name, "линейка");
                assert_eq!(date, Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap());
                assert_eq!(remind_before, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_create_event_uses_bot_offset() {
        let moscow = TemplateInterpreter::new(FixedOffset::east_opt(3 * 3600).unwrap()).unwrap();
        match moscow.interpret("запомни 13.07 в 12:00 стоматолог", now()) {
            Interpretation::Action(Action::CreateEvent { date, .. }) => {
                assert_eq!(date, Utc.with_ymd_and_hms(2026, 7, 13, 9, 0, 0).unwrap());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_impossible_dates_are_invalid() {
        let parsed = interpreter().interpret("запомни 29.02 в 10:00 праздник", now());
        assert!(matches!(parsed, Interpretation::Invalid(_)));

        let parsed = interpreter().interpret("запомни 10.10 в 25:00 встреча", now());
        assert!(matches!(parsed, Interpretation::Invalid(_)));
    }

    #[test]
    fn test_create_note_capitalizes_name() {
        assert_eq!(
            action("создай заметку ДЗ: выучить ИИ с тегом учеба"),
            Action::CreateNote {
                name: "Дз".to_string(),
                content: "выучить ии".to_string(),
                tags: vec!["учеба".to_string()],
            }
        );

        assert_eq!(
            action("новая заметка покупки: молоко, хлеб"),
            Action::CreateNote {
                name: "Покупки".to_string(),
                content: "молоко, хлеб".to_string(),
                tags: vec![],
            }
        );
    }

    #[test]
    fn test_create_note_with_several_tags() {
        match action("создай заметку идеи: бот для заметок с тегами работа, ии") {
            Action::CreateNote { tags, .. } => assert_eq!(tags, vec!["работа", "ии"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_list_events_windows() {
        assert_eq!(action("покажи события"), Action::ListEvents { days: None });
        assert_eq!(action("мои планы на 3 дня"), Action::ListEvents { days: Some(3) });
        assert_eq!(action("покажи мои дела на неделю"), Action::ListEvents { days: Some(7) });
        assert_eq!(action("какие планы на сегодня"), Action::ListEvents { days: Some(1) });
        assert_eq!(action("покажи события на -2 дня"), Action::ListEvents { days: Some(-2) });
    }

    #[test]
    fn test_delete_commands() {
        assert_eq!(
            action("удали событие Стоматолог"),
            Action::DeleteEvent { name: "стоматолог".to_string() }
        );
        assert_eq!(action("удали события на 5 дней"), Action::DeleteEventsWithin { days: 5 });
        assert_eq!(action("Удали заметку дз."), Action::DeleteNote { name: "Дз".to_string() });
    }

    #[test]
    fn test_note_lookups() {
        assert_eq!(
            action("заметки с тегом #Учеба"),
            Action::ListNotesByTag { tag: "учеба".to_string() }
        );
        assert_eq!(
            action("покажи заметки по тегу работа"),
            Action::ListNotesByTag { tag: "работа".to_string() }
        );
        assert_eq!(action("открой заметку ДЗ"), Action::OpenNote { name: "Дз".to_string() });
    }

    #[test]
    fn test_rename_note() {
        assert_eq!(
            action("переименуй заметку дз в домашка"),
            Action::RenameNote {
                name: "Дз".to_string(),
                new_name: "Домашка".to_string(),
                tags: None,
            }
        );
        assert_eq!(
            action("переименуй заметку дз в домашка с тегом учеба"),
            Action::RenameNote {
                name: "Дз".to_string(),
                new_name: "Домашка".to_string(),
                tags: Some(vec!["учеба".to_string()]),
            }
        );
    }

    #[test]
    fn test_rename_note_whose_name_contains_v() {
        let created_name = match action("создай заметку поход в кино: купить билеты") {
            Action::CreateNote { name, .. } => name,
            other => panic!("expected create-note, got {other:?}"),
        };
        assert_eq!(created_name, "Поход в кино");

        assert_eq!(
            action("переименуй заметку поход в кино в досуг"),
            Action::RenameNote {
                name: created_name.clone(),
                new_name: "Досуг".to_string(),
                tags: None,
            }
        );
        assert_eq!(
            action("переименуй заметку поход в кино в досуг с тегом отдых"),
            Action::RenameNote {
                name: created_name,
                new_name: "Досуг".to_string(),
                tags: Some(vec!["отдых".to_string()]),
            }
        );
    }

    #[test]
    fn test_rename_note_with_quoted_names() {
        assert_eq!(
            action("переименуй заметку «дз» в «поход в кино»"),
            Action::RenameNote {
                name: "Дз".to_string(),
                new_name: "Поход в кино".to_string(),
                tags: None,
            }
        );
        assert_eq!(
            action("переименуй заметку \"поход в кино\" в досуг с тегом отдых"),
            Action::RenameNote {
                name: "Поход в кино".to_string(),
                new_name: "Досуг".to_string(),
                tags: Some(vec!["отдых".to_string()]),
            }
        );
        assert_eq!(action("удали заметку «дз»"), Action::DeleteNote { name: "Дз".to_string() });
    }

    #[test]
    fn test_unmatched_text_is_unrecognized() {
        let i = interpreter();
        assert_eq!(i.interpret("привет, как дела?", now()), Interpretation::Unrecognized);
        assert_eq!(i.interpret("запомни завтра встречу", now()), Interpretation::Unrecognized);
    }
}
