pub mod callback;
pub mod message;
pub mod text;

use std::sync::Arc;
use teloxide::{dispatching::UpdateHandler, prelude::*};
use crate::bot::commands::Command;
use crate::database::connection::DatabaseManager;
use crate::interpreter::Interpreter;
use crate::services::dispatcher::CommandDispatcher;
use crate::services::session_tracker::SessionTracker;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

/// Shared state every endpoint needs.
#[derive(Clone)]
pub struct BotContext {
    pub db: DatabaseManager,
    pub dispatcher: CommandDispatcher,
    pub interpreter: Arc<Interpreter>,
    pub tracker: SessionTracker,
}

pub struct BotHandler {
    pub ctx: BotContext,
}

impl BotHandler {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<HandlerError> {
        let command_ctx = self.ctx.clone();
        let text_ctx = self.ctx.clone();
        let callback_ctx = self.ctx.clone();

        let message_handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let ctx = command_ctx.clone();
                        async move { message::command_handler(bot, msg, cmd, ctx).await }
                    }),
            )
            .branch(
                dptree::filter(|msg: Message| msg.text().is_some())
                    .endpoint(move |bot: Bot, msg: Message| {
                        let ctx = text_ctx.clone();
                        async move { text::text_handler(bot, msg, ctx).await }
                    }),
            );

        dptree::entry()
            .branch(message_handler)
            .branch(Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let ctx = callback_ctx.clone();
                async move { callback::callback_handler(bot, q, ctx).await }
            }))
    }
}

/// The sending user's id, falling back to the chat id for anonymous senders.
pub fn sender_id(msg: &Message) -> i64 {
    msg.from()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or(msg.chat.id.0)
}
