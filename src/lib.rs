//! # Notio Bot
//!
//! A Telegram bot for calendar events with reminders and tagged notes.
//!
//! ## Features
//! - Free-text requests, interpreted by regex templates or a chat-completions model
//! - Events with per-event reminder offsets, delivered by a minute-level scheduler
//! - Notes with case-insensitive names and tags
//! - Calendar and notes modes that clear the previous mode's messages
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Free-text message interpretation
pub mod interpreter;
/// Command dispatch, reminders, health checks and session tracking
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
