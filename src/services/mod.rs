pub mod dispatcher;
pub mod health;
pub mod reminder;
pub mod session_tracker;
