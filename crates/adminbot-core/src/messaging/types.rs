/// One entry of the bot's command menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotCommandSpec {
    pub command: String,
    pub description: String,
}

impl BotCommandSpec {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}
