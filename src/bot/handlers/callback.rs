use teloxide::prelude::*;
use crate::bot::commands::mode;
use crate::services::session_tracker::Mode;
use super::{BotContext, HandlerResult};

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    ctx: BotContext,
) -> HandlerResult {
    let user_id = i64::try_from(q.from.id.0).unwrap_or_default();
    let chat_id = q.message.as_ref().map(|m| m.chat.id);

    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    tracing::info!("Callback received: '{}' from user {}", data, user_id);

    let (Some(mode), Some(chat_id)) = (Mode::from_callback_data(data), chat_id) else {
        bot.answer_callback_query(q.id.clone())
            .text("Неизвестная кнопка")
            .await?;
        return Ok(());
    };

    bot.answer_callback_query(q.id.clone()).await?;
    mode::handle_mode_switch(&bot, chat_id, user_id, mode, &ctx.tracker).await?;
    Ok(())
}
