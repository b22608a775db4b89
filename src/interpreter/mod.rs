//! Turns a free-text message into a structured [`Action`].
//!
//! Two strategies share one contract: [`template::TemplateInterpreter`]
//! matches ordered regular expressions, [`llm::LlmInterpreter`] delegates the
//! classification to a chat-completions endpoint. Neither touches storage.

pub mod llm;
pub mod template;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::config::{Config, InterpreterKind};

pub use llm::LlmInterpreter;
pub use template::TemplateInterpreter;

/// The classified intent of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTag {
    CreateEvent,
    ListEvents,
    DeleteEvent,
    DeleteEventsWithin,
    CreateNote,
    ListNotesByTag,
    OpenNote,
    DeleteNote,
    RenameNote,
}

impl ActionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::CreateEvent => "create-event",
            ActionTag::ListEvents => "list-events",
            ActionTag::DeleteEvent => "delete-event",
            ActionTag::DeleteEventsWithin => "delete-events-within",
            ActionTag::CreateNote => "create-note",
            ActionTag::ListNotesByTag => "list-notes-by-tag",
            ActionTag::OpenNote => "open-note",
            ActionTag::DeleteNote => "delete-note",
            ActionTag::RenameNote => "rename-note",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action tag together with its details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateEvent {
        name: String,
        date: DateTime<Utc>,
        /// Hours; `None` means the configured default.
        remind_before: Option<i64>,
    },
    ListEvents {
        days: Option<i64>,
    },
    DeleteEvent {
        name: String,
    },
    DeleteEventsWithin {
        days: i64,
    },
    CreateNote {
        name: String,
        content: String,
        tags: Vec<String>,
    },
    ListNotesByTag {
        tag: String,
    },
    OpenNote {
        name: String,
    },
    DeleteNote {
        name: String,
    },
    RenameNote {
        name: String,
        new_name: String,
        /// Replaces the note's tags when present.
        tags: Option<Vec<String>>,
    },
}

impl Action {
    pub fn tag(&self) -> ActionTag {
        match self {
            Action::CreateEvent { .. } => ActionTag::CreateEvent,
            Action::ListEvents { .. } => ActionTag::ListEvents,
            Action::DeleteEvent { .. } => ActionTag::DeleteEvent,
            Action::DeleteEventsWithin { .. } => ActionTag::DeleteEventsWithin,
            Action::CreateNote { .. } => ActionTag::CreateNote,
            Action::ListNotesByTag { .. } => ActionTag::ListNotesByTag,
            Action::OpenNote { .. } => ActionTag::OpenNote,
            Action::DeleteNote { .. } => ActionTag::DeleteNote,
            Action::RenameNote { .. } => ActionTag::RenameNote,
        }
    }
}

/// Result of interpreting one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Action(Action),
    /// The intent was clear but a detail was missing or malformed.
    Invalid(String),
    Unrecognized,
}

pub enum Interpreter {
    Template(TemplateInterpreter),
    Llm(LlmInterpreter),
}

impl Interpreter {
    pub fn from_config(config: &Config) -> Result<Self> {
        match (config.interpreter, &config.llm) {
            (InterpreterKind::Llm, Some(settings)) => Ok(Interpreter::Llm(LlmInterpreter::new(
                settings,
                config.utc_offset,
            )?)),
            (InterpreterKind::Llm, None) => {
                Err(anyhow::anyhow!("OPENAI_API_KEY must be set when INTERPRETER=llm"))
            }
            (InterpreterKind::Template, _) => {
                Ok(Interpreter::Template(TemplateInterpreter::new(config.utc_offset)?))
            }
        }
    }

    pub fn kind(&self) -> InterpreterKind {
        match self {
            Interpreter::Template(_) => InterpreterKind::Template,
            Interpreter::Llm(_) => InterpreterKind::Llm,
        }
    }

    pub async fn interpret(&self, text: &str, now: DateTime<Utc>) -> Interpretation {
        let text = text.trim();
        if text.is_empty() {
            return Interpretation::Unrecognized;
        }

        match self {
            Interpreter::Template(inner) => inner.interpret(text, now),
            Interpreter::Llm(inner) => inner.interpret(text, now).await,
        }
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Splits a tag list written as `учеба, ии` or `учеба ии`.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|tag| tag.trim().trim_start_matches('#'))
        .filter(|tag| !tag.is_empty() && *tag != "и")
        .map(str::to_lowercase)
        .collect()
}
