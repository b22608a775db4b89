use chrono::Utc;
use teloxide::prelude::*;
use crate::interpreter::Interpretation;
use crate::services::dispatcher::{render_outcome, CommandError};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{
    log_command_error, log_command_start, log_command_success, log_validation_error,
};
use super::{sender_id, BotContext, HandlerResult};

/// Free text: interpret, dispatch, reply.
pub async fn text_handler(bot: Bot, msg: Message, ctx: BotContext) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = sender_id(&msg);
    let chat_id = msg.chat.id;
    let feedback = CommandFeedback::new(bot, chat_id);
    ctx.tracker.track(user_id, msg.id).await;

    // Commands that failed to parse land here.
    if text.starts_with('/') {
        let command = text.split_whitespace().next().unwrap_or(text);
        log_validation_error("command", "unknown command", user_id, chat_id.0);
        let sent = feedback
            .validation_error(
                &format!("Неизвестная команда: {command}"),
                "/help покажет все команды",
            )
            .await?;
        ctx.tracker.track(user_id, sent.id).await;
        return Ok(());
    }

    let now = Utc::now();
    let interpretation = ctx.interpreter.interpret(text, now).await;
    let command = match &interpretation {
        Interpretation::Action(action) => action.tag().as_str(),
        Interpretation::Invalid(_) => "invalid",
        Interpretation::Unrecognized => "unrecognized",
    };
    log_command_start(command, user_id, chat_id.0, None);

    let outcome = ctx.dispatcher.handle(user_id, interpretation, now).await;
    match &outcome {
        Ok(_) => log_command_success(command, user_id, chat_id.0, None),
        Err(CommandError::Validation(reason)) => {
            log_validation_error(command, reason, user_id, chat_id.0);
        }
        Err(e) => log_command_error(command, user_id, chat_id.0, &e.to_string()),
    }

    let sent = feedback.reply(&render_outcome(outcome)).await?;
    ctx.tracker.track(user_id, sent.id).await;
    Ok(())
}
