/// Slash commands and their handlers
pub mod commands;
/// teloxide dispatcher tree and update endpoints
pub mod handlers;
