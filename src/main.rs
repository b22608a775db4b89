//! # Notio Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database,
//! starts the reminder service and the health server, and runs the Telegram bot.

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notio_bot::bot::handlers::{BotContext, BotHandler};
use notio_bot::config::Config;
use notio_bot::database::connection::DatabaseManager;
use notio_bot::interpreter::Interpreter;
use notio_bot::services::dispatcher::{CommandDispatcher, DispatchDefaults};
use notio_bot::services::health::HealthService;
use notio_bot::services::reminder::ReminderService;
use notio_bot::services::session_tracker::SessionTracker;
use notio_bot::utils::logging::log_system_event;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notio_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Notio Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Interpreter: {:?}, UTC offset: {}",
        config.database_url, config.http_port, config.interpreter, config.utc_offset
    );

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let interpreter = Arc::new(Interpreter::from_config(&config)?);
    let dispatcher = CommandDispatcher::new(
        db_arc.as_ref().clone(),
        DispatchDefaults {
            remind_before_hours: config.default_remind_before_hours,
            list_days: config.default_list_days,
            offset: config.utc_offset,
        },
    );
    let tracker = SessionTracker::new(config.max_tracked_messages, config.mode_switch_keep_last);

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = BotHandler::new(BotContext {
        db: db_arc.as_ref().clone(),
        dispatcher,
        interpreter: interpreter.clone(),
        tracker,
    });
    info!("Telegram bot initialized successfully");

    let mut reminder_service = ReminderService::new(
        bot.clone(),
        db_arc.clone(),
        config.reminder_lookback_minutes,
        config.utc_offset,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create reminder service: {}", e))?;

    // Sends reminders due during downtime before the minute job is scheduled.
    if let Err(e) = reminder_service.start().await {
        tracing::error!("Failed to start reminder service: {}", e);
    } else {
        info!("Reminder service started successfully");
    }

    let health_service = HealthService::new(db_arc.clone(), interpreter.kind());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result1 = bot_task => {
            if let Err(e) = result1 {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result2 = health_task => {
            if let Err(e) = result2 {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = reminder_service.stop().await {
        tracing::warn!("Error stopping reminder service: {}", e);
    }

    log_system_event("application stopped", None);
    Ok(())
}
