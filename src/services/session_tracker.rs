use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use teloxide::types::MessageId;
use tokio::sync::Mutex;

/// Callback data prefix for mode buttons.
pub const MODE_CALLBACK_PREFIX: &str = "mode:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Calendar,
    Notes,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Calendar => "calendar",
            Mode::Notes => "notes",
        }
    }

    pub fn callback_data(&self) -> String {
        format!("{MODE_CALLBACK_PREFIX}{}", self.as_str())
    }

    /// Parses `mode:calendar` / `mode:notes`.
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data.strip_prefix(MODE_CALLBACK_PREFIX)? {
            "calendar" => Some(Mode::Calendar),
            "notes" => Some(Mode::Notes),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct UserSession {
    mode: Option<Mode>,
    messages: VecDeque<MessageId>,
}

/// In-memory per-user mode and the bot-visible messages sent in it.
/// Lost on restart.
#[derive(Clone)]
pub struct SessionTracker {
    sessions: Arc<Mutex<HashMap<i64, UserSession>>>,
    max_tracked: usize,
    keep_last: usize,
}

impl SessionTracker {
    pub fn new(max_tracked: usize, keep_last: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_tracked,
            keep_last,
        }
    }

    /// Records a message for later cleanup, dropping the oldest past the cap.
    pub async fn track(&self, user_id: i64, message_id: MessageId) {
        if self.max_tracked == 0 {
            return;
        }

        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(user_id).or_default();
        session.messages.push_back(message_id);
        while session.messages.len() > self.max_tracked {
            session.messages.pop_front();
        }
    }

    /// Switches the user's mode. Returns the messages to delete when the mode
    /// changed, `None` when it was already active.
    pub async fn switch_mode(&self, user_id: i64, mode: Mode) -> Option<Vec<MessageId>> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(user_id).or_default();

        if session.mode == Some(mode) {
            return None;
        }

        session.mode = Some(mode);
        let removable = session.messages.len().saturating_sub(self.keep_last);
        let stale: Vec<MessageId> = session.messages.drain(..removable).collect();
        session.messages.clear();
        Some(stale)
    }

    pub async fn current_mode(&self, user_id: i64) -> Option<Mode> {
        self.sessions.lock().await.get(&user_id).and_then(|session| session.mode)
    }

    pub async fn tracked_count(&self, user_id: i64) -> usize {
        self.sessions
            .lock()
            .await
            .get(&user_id)
            .map_or(0, |session| session.messages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_callback_data() {
        assert_eq!(Mode::Calendar.callback_data(), "mode:calendar");
        assert_eq!(Mode::from_callback_data("mode:notes"), Some(Mode::Notes));
        assert_eq!(Mode::from_callback_data("mode:other"), None);
        assert_eq!(Mode::from_callback_data("notes"), None);
    }

    #[tokio::test]
    async fn test_switch_mode_returns_tracked_messages_once() {
        let tracker = SessionTracker::new(100, 0);
        tracker.track(1, MessageId(10)).await;
        tracker.track(1, MessageId(11)).await;

        let stale = tracker.switch_mode(1, Mode::Notes).await;
        assert_eq!(stale, Some(vec![MessageId(10), MessageId(11)]));
        assert_eq!(tracker.current_mode(1).await, Some(Mode::Notes));
        assert_eq!(tracker.tracked_count(1).await, 0);

        tracker.track(1, MessageId(12)).await;
        assert_eq!(tracker.switch_mode(1, Mode::Notes).await, None);
        assert_eq!(tracker.tracked_count(1).await, 1);
    }

    #[tokio::test]
    async fn test_keep_last_spares_newest_messages() {
        let tracker = SessionTracker::new(100, 1);
        for id in 1..=3 {
            tracker.track(7, MessageId(id)).await;
        }
        assert_eq!(
            tracker.switch_mode(7, Mode::Calendar).await,
            Some(vec![MessageId(1), MessageId(2)])
        );
    }

    #[tokio::test]
    async fn test_tracking_is_bounded_per_user() {
        let tracker = SessionTracker::new(2, 0);
        for id in 1..=5 {
            tracker.track(1, MessageId(id)).await;
        }
        tracker.track(2, MessageId(100)).await;

        assert_eq!(tracker.tracked_count(1).await, 2);
        assert_eq!(
            tracker.switch_mode(1, Mode::Calendar).await,
            Some(vec![MessageId(4), MessageId(5)])
        );
        assert_eq!(tracker.tracked_count(2).await, 1);
    }
}
