use chrono::Utc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use crate::bot::commands::{mode, stats, Command};
use crate::interpreter::Action;
use crate::services::dispatcher::render_outcome;
use crate::services::session_tracker::Mode;
use crate::utils::feedback::{CommandFeedback, FeedbackType, Reply};
use crate::utils::logging::{log_command_start, log_validation_error};
use super::{sender_id, BotContext, HandlerResult};

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: BotContext,
) -> HandlerResult {
    let user_id = sender_id(&msg);
    let chat_id = msg.chat.id;
    let feedback = CommandFeedback::new(bot.clone(), chat_id);
    log_command_start(&format!("{cmd:?}"), user_id, chat_id.0, None);
    ctx.tracker.track(user_id, msg.id).await;

    let sent = match cmd {
        Command::Help => {
            feedback
                .reply(&Reply::new(FeedbackType::Info, Command::descriptions().to_string()))
                .await?
        }
        Command::Start => {
            let welcome = Reply::new(
                FeedbackType::Info,
                "Привет! Я помогу запомнить события и вести заметки.\n\
                 Выберите режим или просто напишите, что нужно сделать.\n\
                 /help покажет все команды.",
            );
            feedback.reply_with_keyboard(&welcome, mode::mode_keyboard()).await?
        }
        Command::Calendar => {
            mode::handle_mode_switch(&bot, chat_id, user_id, Mode::Calendar, &ctx.tracker).await?;
            return Ok(());
        }
        Command::Notes => {
            mode::handle_mode_switch(&bot, chat_id, user_id, Mode::Notes, &ctx.tracker).await?;
            return Ok(());
        }
        Command::Events(raw_days) => {
            let raw_days = raw_days.trim();
            let days = if raw_days.is_empty() {
                None
            } else {
                match raw_days.parse::<i64>() {
                    Ok(days) => Some(days),
                    Err(_) => {
                        log_validation_error("events", "days is not a number", user_id, chat_id.0);
                        let sent = feedback
                            .validation_error(
                                &format!("«{raw_days}» не похоже на количество дней"),
                                "/events 3",
                            )
                            .await?;
                        ctx.tracker.track(user_id, sent.id).await;
                        return Ok(());
                    }
                }
            };

            let outcome = ctx
                .dispatcher
                .dispatch(user_id, Action::ListEvents { days }, Utc::now())
                .await;
            feedback.reply(&render_outcome(outcome)).await?
        }
        Command::Stats => stats::handle_stats(bot, msg, user_id, &ctx.db).await?,
    };

    ctx.tracker.track(user_id, sent.id).await;
    Ok(())
}
