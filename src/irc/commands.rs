//! Bot command parser.
//!
//! Commands arrive either as a private message (`stats`) or as a channel
//! message addressed to the bot (`quipbot: stats`, `quipbot, stats`).

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Describe every joined channel.
    Stats,
    /// Quit and come back after the reconnect delay.
    Disconnect,
    /// Quit for good.
    Die,
    /// Offer a passive DCC CHAT to the sender.
    Dcc,
    /// Anything else, kept verbatim (trimmed) for the reply.
    Unknown(String),
}

/// Parse a command. The whole trimmed input must be the command word
/// (case-insensitive); anything else is [`BotCommand::Unknown`]. Returns
/// `None` for blank input.
pub fn parse_command(input: &str) -> Option<BotCommand> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    Some(match input.to_lowercase().as_str() {
        "stats" => BotCommand::Stats,
        "disconnect" => BotCommand::Disconnect,
        "die" => BotCommand::Die,
        "dcc" => BotCommand::Dcc,
        _ => BotCommand::Unknown(input.to_string()),
    })
}

/// If `text` is addressed to `nick` (`nick: ...` or `nick, ...`), return the
/// rest of the line.
pub fn strip_address<'a>(text: &'a str, nick: &str) -> Option<&'a str> {
    let head = text.get(..nick.len())?;
    if !head.eq_ignore_ascii_case(nick) {
        return None;
    }
    let rest = &text[nick.len()..];
    let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix(','))?;
    Some(rest.trim())
}
