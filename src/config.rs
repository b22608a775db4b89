use anyhow::{anyhow, Result};
use chrono::FixedOffset;
use std::env;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/notio.db";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Which message interpreter the bot runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterKind {
    /// Ordered regular-expression templates.
    Template,
    /// One chat-completions call per message.
    Llm,
}

impl FromStr for InterpreterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "template" | "regex" => Ok(InterpreterKind::Template),
            "llm" | "openai" => Ok(InterpreterKind::Llm),
            other => Err(anyhow!("Invalid INTERPRETER: {other} (expected 'template' or 'llm')")),
        }
    }
}

/// Credentials and tuning for the completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub interpreter: InterpreterKind,
    pub llm: Option<LlmSettings>,
    pub default_remind_before_hours: i64,
    pub default_list_days: i64,
    pub utc_offset: FixedOffset,
    pub reminder_lookback_minutes: i64,
    pub max_tracked_messages: usize,
    pub mode_switch_keep_last: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .or_else(|_| env::var("TELEGRAM_TOKEN"))
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let http_port = parse_var("HTTP_PORT", 3000u16)?;

        let interpreter = match non_empty_var("INTERPRETER") {
            Some(value) => value.parse()?,
            None => InterpreterKind::Template,
        };

        let llm = match non_empty_var("OPENAI_API_KEY") {
            Some(api_key) => Some(LlmSettings {
                api_key,
                model: non_empty_var("OPENAI_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: non_empty_var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: parse_var("OPENAI_TIMEOUT_SECS", 30u64)?,
            }),
            None => None,
        };

        if interpreter == InterpreterKind::Llm && llm.is_none() {
            return Err(anyhow!("OPENAI_API_KEY must be set when INTERPRETER=llm"));
        }

        let default_remind_before_hours = parse_var("DEFAULT_REMIND_BEFORE_HOURS", 24i64)?;
        if default_remind_before_hours < 0 {
            return Err(anyhow!("Invalid DEFAULT_REMIND_BEFORE_HOURS: must not be negative"));
        }

        let default_list_days = parse_var("DEFAULT_LIST_DAYS", 7i64)?;
        if default_list_days < 0 {
            return Err(anyhow!("Invalid DEFAULT_LIST_DAYS: must not be negative"));
        }

        let offset_hours = parse_var("BOT_UTC_OFFSET_HOURS", 0i32)?;
        if !(-12..=14).contains(&offset_hours) {
            return Err(anyhow!("Invalid BOT_UTC_OFFSET_HOURS: expected -12..=14"));
        }
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| anyhow!("Invalid BOT_UTC_OFFSET_HOURS"))?;

        let reminder_lookback_minutes = parse_var("REMINDER_LOOKBACK_MINUTES", 5i64)?;
        if reminder_lookback_minutes < 0 {
            return Err(anyhow!("Invalid REMINDER_LOOKBACK_MINUTES: must not be negative"));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            interpreter,
            llm,
            default_remind_before_hours,
            default_list_days,
            utc_offset,
            reminder_lookback_minutes,
            max_tracked_messages: parse_var("MAX_TRACKED_MESSAGES", 100usize)?,
            mode_switch_keep_last: parse_var("MODE_SWITCH_KEEP_LAST", 0usize)?,
        })
    }
}

/// `DATABASE_URL`, or the bundled default when unset or empty.
pub fn database_url_from_env() -> String {
    non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| anyhow!("Invalid {name}")),
        None => Ok(default),
    }
}
