//! Interpreter backed by an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::{capitalize, split_tags, Action, Interpretation};
use crate::config::LlmSettings;
use crate::utils::datetime::local_to_utc;

const SYSTEM_PROMPT: &str = "Ты ассистент для Telegram-бота с функциями календаря и заметок. \
На основе запроса пользователя определи одно из действий: \
создать_событие, показать_события, удалить_событие, удалить_события, \
создать_заметку, показать_заметки_по_тегу, открыть_заметку, удалить_заметку, \
переименовать_заметку, другое. \
Ответь строго в формате JSON с ключами: action и details. \
Ключи details: название, дата (дд.мм.гг чч:мм), напоминание_за (часы), дней, \
содержание, теги (список), тег, новое_название.";

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Completion endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Completion has no content")]
    EmptyCompletion,

    #[error("Malformed classification: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// The JSON object the model is asked to answer with.
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    pub action: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

pub struct LlmInterpreter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    offset: FixedOffset,
}

impl LlmInterpreter {
    pub fn new(settings: &LlmSettings, offset: FixedOffset) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            offset,
        })
    }

    pub async fn interpret(&self, text: &str, now: DateTime<Utc>) -> Interpretation {
        match self.classify(text, now).await {
            Ok(classification) => {
                debug!(action = %classification.action, "Message classified");
                interpret_classification(&classification, &self.offset, now)
            }
            Err(e) => {
                warn!("Failed to classify message: {}", e);
                Interpretation::Unrecognized
            }
        }
    }

    async fn classify(&self, text: &str, now: DateTime<Utc>) -> Result<Classification, InterpretError> {
        let today = now.with_timezone(&self.offset).format("%d.%m.%Y");
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: format!("{SYSTEM_PROMPT} Сегодня {today}."),
                },
                RequestMessage { role: "user", content: text.to_string() },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InterpretError::Status { status, body });
        }

        let completion = response.json::<ChatResponse>().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(InterpretError::EmptyCompletion)?;

        parse_classification(&content)
    }
}

/// Parses the model's answer, tolerating a surrounding markdown code fence.
pub fn parse_classification(content: &str) -> Result<Classification, InterpretError> {
    let mut body = content.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.trim_start_matches("json");
        body = body.strip_suffix("```").unwrap_or(body);
    }

    Ok(serde_json::from_str(body.trim())?)
}

/// Maps a classification onto an action. Unknown tags and `другое` are
/// unrecognized; a missing required detail makes the request invalid.
pub fn interpret_classification(
    classification: &Classification,
    offset: &FixedOffset,
    now: DateTime<Utc>,
) -> Interpretation {
    let details = Details(&classification.details);

    let action = match classification.action.trim() {
        "создать_событие" => {
            let (Some(name), Some(raw_date)) = (details.text("название"), details.text("дата")) else {
                return missing("название и дата");
            };
            let Some(date) = parse_llm_date(&raw_date, offset) else {
                return Interpretation::Invalid(format!("Не удалось разобрать дату «{raw_date}»"));
            };
            let remind_before = match details.number("напоминание_за") {
                Ok(hours) => hours,
                Err(invalid) => return invalid,
            };
            Action::CreateEvent { name: name.to_lowercase(), date, remind_before }
        }
        "показать_события" => match details.number("дней") {
            Ok(days) => Action::ListEvents { days },
            Err(invalid) => return invalid,
        },
        "удалить_событие" => match details.text("название") {
            Some(name) => Action::DeleteEvent { name: name.to_lowercase() },
            None => return missing("название"),
        },
        "удалить_события" => match details.number("дней") {
            Ok(Some(days)) => Action::DeleteEventsWithin { days },
            Ok(None) => return missing("дней"),
            Err(invalid) => return invalid,
        },
        "создать_заметку" => {
            let (Some(name), Some(content)) = (details.text("название"), details.text("содержание"))
            else {
                return missing("название и содержание");
            };
            Action::CreateNote {
                name: capitalize(&name),
                content,
                tags: details.tags("теги").unwrap_or_default(),
            }
        }
        "показать_заметки_по_тегу" => match details.text("тег") {
            Some(tag) => Action::ListNotesByTag { tag: tag.trim_start_matches('#').to_lowercase() },
            None => return missing("тег"),
        },
        "открыть_заметку" => match details.text("название") {
            Some(name) => Action::OpenNote { name: capitalize(&name) },
            None => return missing("название"),
        },
        "удалить_заметку" => match details.text("название") {
            Some(name) => Action::DeleteNote { name: capitalize(&name) },
            None => return missing("название"),
        },
        "переименовать_заметку" => {
            let (Some(name), Some(new_name)) =
                (details.text("название"), details.text("новое_название"))
            else {
                return missing("название и новое_название");
            };
            Action::RenameNote {
                name: capitalize(&name),
                new_name: capitalize(&new_name),
                tags: details.tags("теги"),
            }
        }
        _ => return Interpretation::Unrecognized,
    };

    debug!(tag = %action.tag(), now = %now, "Classification mapped");
    Interpretation::Action(action)
}

fn missing(keys: &str) -> Interpretation {
    Interpretation::Invalid(format!("Не хватает данных: {keys}"))
}

/// Accepts `дд.мм.гг чч:мм` and the four-digit-year and date-only variants.
fn parse_llm_date(raw: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let naive = ["%d.%m.%y %H:%M", "%d.%m.%Y %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            ["%d.%m.%y", "%d.%m.%Y"]
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })?;

    local_to_utc(offset, naive.date(), naive.time())
}

struct Details<'a>(&'a Map<String, Value>);

impl Details<'_> {
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numbers may arrive as JSON numbers or numeric strings.
    fn number(&self, key: &str) -> Result<Option<i64>, Interpretation> {
        let invalid = || Interpretation::Invalid(format!("Некорректное число: {key}"));
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    /// Tags may arrive as an array or a comma separated string.
    fn tags(&self, key: &str) -> Option<Vec<String>> {
        match self.0.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .flat_map(split_tags)
                    .collect(),
            ),
            Value::String(s) => Some(split_tags(s)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn classify(value: Value) -> Interpretation {
        let classification: Classification = serde_json::from_value(value).unwrap();
        interpret_classification(&classification, &utc(), now())
    }

    #[test]
    fn test_parse_fenced_classification() {
        let fenced = "```json\n{\"action\": \"показать_события\", \"details\": {\"дней\": 3}}\n```";
        let parsed = parse_classification(fenced).unwrap();
        assert_eq!(parsed.action, "показать_события");

        let bare = parse_classification("{\"action\": \"другое\"}").unwrap();
        assert!(bare.details.is_empty());

        assert!(parse_classification("Не знаю").is_err());
    }

    #[test]
    fn test_create_event_classification() {
        let parsed = classify(json!({
            "action": "создать_событие",
            "details": {"название": "Стоматолог", "дата": "13.07.26 12:00", "напоминание_за": "2"}
        }));
        assert_eq!(
            parsed,
            Interpretation::Action(Action::CreateEvent {
                name: "стоматолог".to_string(),
                date: Utc.with_ymd_and_hms(2026, 7, 13, 12, 0, 0).unwrap(),
                remind_before: Some(2),
            })
        );
    }

    #[test]
    fn test_event_date_variants() {
        assert_eq!(
            parse_llm_date("13.07.2026 12:00", &utc()),
            Some(Utc.with_ymd_and_hms(2026, 7, 13, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse_llm_date("13.07.26", &utc()),
            Some(Utc.with_ymd_and_hms(2026, 7, 13, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_llm_date("завтра", &utc()), None);
    }

    #[test]
    fn test_missing_details_are_invalid() {
        let parsed = classify(json!({"action": "создать_событие", "details": {"название": "x"}}));
        assert!(matches!(parsed, Interpretation::Invalid(_)));

        let parsed = classify(json!({"action": "открыть_заметку", "details": {}}));
        assert!(matches!(parsed, Interpretation::Invalid(_)));

        let parsed = classify(json!({"action": "показать_события", "details": {"дней": "много"}}));
        assert!(matches!(parsed, Interpretation::Invalid(_)));
    }

    #[test]
    fn test_other_and_unknown_actions_are_unrecognized() {
        assert_eq!(classify(json!({"action": "другое"})), Interpretation::Unrecognized);
        assert_eq!(classify(json!({"action": "спеть_песню"})), Interpretation::Unrecognized);
    }

    #[test]
    fn test_note_classification() {
        let parsed = classify(json!({
            "action": "создать_заметку",
            "details": {"название": "ДЗ", "содержание": "выучить ИИ", "теги": ["Учеба", "#ии"]}
        }));
        assert_eq!(
            parsed,
            Interpretation::Action(Action::CreateNote {
                name: "Дз".to_string(),
                content: "выучить ИИ".to_string(),
                tags: vec!["учеба".to_string(), "ии".to_string()],
            })
        );

        let parsed = classify(json!({
            "action": "переименовать_заметку",
            "details": {"название": "дз", "новое_название": "домашка", "теги": "учеба, школа"}
        }));
        assert_eq!(
            parsed,
            Interpretation::Action(Action::RenameNote {
                name: "Дз".to_string(),
                new_name: "Домашка".to_string(),
                tags: Some(vec!["учеба".to_string(), "школа".to_string()]),
            })
        );
    }

    #[test]
    fn test_list_events_without_window() {
        assert_eq!(
            classify(json!({"action": "показать_события", "details": {}})),
            Interpretation::Action(Action::ListEvents { days: None })
        );
    }
}
