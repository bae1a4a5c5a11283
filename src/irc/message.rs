//! IRC message parsing and serialization.
//!
//! Wire format (RFC 2812, without the `\r\n` terminator):
//!
//! ```text
//! [':' prefix SPACE] command [SPACE middle]* [SPACE ':' trailing]
//! ```

use std::fmt;
use std::str::FromStr;

use super::error::ParseError;

/// Message source: a server name or a `nick!user@host` mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    Server(String),
    User {
        nick: String,
        user: Option<String>,
        host: Option<String>,
    },
}

impl Prefix {
    /// Nickname of a user source; `None` for servers.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::User { nick, .. } => Some(nick),
            Prefix::Server(_) => None,
        }
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedPrefix(raw.to_string());

        if raw.is_empty() {
            return Err(malformed());
        }

        let (nick_user, host) = match raw.split_once('@') {
            Some((left, host)) if !host.is_empty() => (left, Some(host.to_string())),
            Some(_) => return Err(malformed()),
            None => (raw, None),
        };
        let (nick, user) = match nick_user.split_once('!') {
            Some((nick, user)) if !user.is_empty() => (nick, Some(user.to_string())),
            Some(_) => return Err(malformed()),
            None => (nick_user, None),
        };
        if nick.is_empty() {
            return Err(malformed());
        }

        if user.is_none() && host.is_none() && nick.contains('.') {
            return Ok(Prefix::Server(nick.to_string()));
        }
        Ok(Prefix::User {
            nick: nick.to_string(),
            user,
            host,
        })
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User { nick, user, host } => {
                f.write_str(nick)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

/// A textual command (`PRIVMSG`) or a three digit numeric reply (`001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Numeric(u16),
    Named(String),
}

impl Command {
    pub fn is(&self, name: &str) -> bool {
        matches!(self, Command::Named(n) if n.eq_ignore_ascii_case(name))
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(token: &str) -> Result<Self, ParseError> {
        if token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()) {
            // Three ASCII digits always fit in a u16.
            return Ok(Command::Numeric(token.parse().unwrap_or_default()));
        }
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Ok(Command::Named(token.to_ascii_uppercase()));
        }
        Err(ParseError::InvalidCommand(token.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Numeric(code) => write!(f, "{:03}", code),
            Command::Named(name) => f.write_str(name),
        }
    }
}

/// Numeric replies the engine cares about.
pub mod numeric {
    pub const RPL_WELCOME: u16 = 1;
    pub const RPL_NAMREPLY: u16 = 353;
    pub const ERR_ERRONEUSNICKNAME: u16 = 432;
    pub const ERR_NICKNAMEINUSE: u16 = 433;
    pub const ERR_NICKCOLLISION: u16 = 436;
    pub const ERR_UNAVAILRESOURCE: u16 = 437;
}

/// A parsed IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub command: Command,
    /// Parameters in order; the last one may have been a trailing parameter.
    pub params: Vec<String>,
}

impl Message {
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: Command::Named(command.to_ascii_uppercase()),
            params,
        }
    }

    /// Parse a single line (terminator already stripped by the framer).
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let (prefix, rest) = match line.strip_prefix(':') {
            Some(tail) => {
                let (raw, rest) = tail.split_once(' ').unwrap_or((tail, ""));
                (Some(Prefix::parse(raw)?), rest)
            }
            None => (None, line),
        };

        let rest = rest.trim_start_matches(' ');
        let (token, mut remaining) = rest.split_once(' ').unwrap_or((rest, ""));
        if token.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        let command = token.parse()?;

        let mut params = Vec::new();
        loop {
            remaining = remaining.trim_start_matches(' ');
            if remaining.is_empty() {
                break;
            }
            if let Some(trailing) = remaining.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match remaining.split_once(' ') {
                Some((middle, tail)) => {
                    params.push(middle.to_string());
                    remaining = tail;
                }
                None => {
                    params.push(remaining.to_string());
                    break;
                }
            }
        }

        Ok(Message {
            prefix,
            command,
            params,
        })
    }

    /// Serialize without the `\r\n` terminator.
    ///
    /// The last parameter is always written in trailing form, which every
    /// server accepts and which keeps empty or spaced text intact.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push(':');
            out.push_str(&prefix.to_string());
            out.push(' ');
        }
        out.push_str(&self.command.to_string());

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                out.push(' ');
                out.push_str(param);
            }
            out.push_str(" :");
            out.push_str(last);
        }
        out
    }

    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn is_numeric(&self, code: u16) -> bool {
        self.command == Command::Numeric(code)
    }

    pub fn pass(password: &str) -> Self {
        Self::new("PASS", vec![password.to_string()])
    }

    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", vec![nick.to_string()])
    }

    pub fn user(username: &str, realname: &str) -> Self {
        Self::new(
            "USER",
            vec![username.to_string(), "0".into(), "*".into(), realname.to_string()],
        )
    }

    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", vec![channel.to_string()])
    }

    pub fn part(channel: &str, reason: Option<&str>) -> Self {
        let mut params = vec![channel.to_string()];
        params.extend(reason.map(single_line));
        Self::new("PART", params)
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", vec![target.to_string(), single_line(text)])
    }

    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", vec![target.to_string(), single_line(text)])
    }

    pub fn ping(token: &str) -> Self {
        Self::new("PING", vec![token.to_string()])
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", vec![token.to_string()])
    }

    pub fn quit(message: Option<&str>) -> Self {
        Self::new("QUIT", message.map(single_line).into_iter().collect())
    }

    /// CTCP request, e.g. `DCC CHAT chat 2130706433 5000`.
    pub fn ctcp(target: &str, payload: &str) -> Self {
        Self::privmsg(target, &format!("\x01{}\x01", payload.replace('\x01', "")))
    }

    pub fn ctcp_reply(target: &str, payload: &str) -> Self {
        Self::notice(target, &format!("\x01{}\x01", payload.replace('\x01', "")))
    }
}

impl FromStr for Message {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, ParseError> {
        Message::parse(line)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Unwrap a CTCP payload (`\x01VERSION\x01` -> `VERSION`).
///
/// Some clients omit the closing delimiter, so it is optional.
pub fn ctcp_payload(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('\x01')?;
    Some(inner.strip_suffix('\x01').unwrap_or(inner))
}

/// Outbound text must never smuggle extra lines onto the wire.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
