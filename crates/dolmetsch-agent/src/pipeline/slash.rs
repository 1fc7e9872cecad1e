//! Parsing of inbound chat text into free text or a slash command.

/// One inbound message, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Free text, routed to the conversation's active strategy.
    Text(String),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/mode [name]`; arguments split on whitespace.
    Mode(Vec<String>),
    /// `/translate <text>`
    Translate(String),
    /// `/llm <text>`
    Llm(String),
    /// `/history`
    History,
    /// Any other `/word`.
    Unknown(String),
}

/// Commands shown in `/help` and registered with the chat platform.
pub const COMMANDS: &[(&str, &str)] = &[
    ("mode", "show or switch the mode (translate, converse)"),
    ("translate", "translate text once, whatever the mode"),
    ("llm", "ask the language model once, whatever the mode"),
    ("history", "show this chat's translations"),
    ("help", "list the commands"),
];

impl Inbound {
    /// Classify raw message text.
    ///
    /// A message is a command when it starts with `/` followed by a command
    /// name; `/name@botname` is accepted. Everything after the name (the
    /// first line break included) is the argument text.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            return Inbound::Text(trimmed.to_string());
        };

        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let (head, rest) = body.split_at(name_end);
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            // "/ foo", "/..." and paths like "/usr/bin" are plain text
            return Inbound::Text(trimmed.to_string());
        }
        let args = rest.trim();

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "mode" => Command::Mode(args.split_whitespace().map(str::to_string).collect()),
            "translate" => Command::Translate(args.to_string()),
            "llm" => Command::Llm(args.to_string()),
            "history" => Command::History,
            _ => Command::Unknown(name.to_string()),
        };
        Inbound::Command(command)
    }

    /// Whether handling this message calls a translation or model backend.
    pub fn calls_backend(&self) -> bool {
        match self {
            Inbound::Text(text)
            | Inbound::Command(Command::Translate(text) | Command::Llm(text)) => !text.is_empty(),
            Inbound::Command(_) => false,
        }
    }
}
