pub mod mode;
pub mod stats;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Команды бота:")]
pub enum Command {
    #[command(description = "показать эту справку")]
    Help,
    #[command(description = "начать работу")]
    Start,
    #[command(description = "режим календаря")]
    Calendar,
    #[command(description = "режим заметок")]
    Notes,
    #[command(description = "события на N дней, по умолчанию на неделю")]
    Events(String),
    #[command(description = "сколько у вас событий и заметок")]
    Stats,
}
