//! Channel and membership tracking.
//!
//! Updated by the session as a side effect of JOIN/PART/QUIT/KICK/MODE/NICK
//! and NAMES replies. Nicknames and channel names are matched
//! case-insensitively (ASCII); the original spelling is kept for display.

use std::collections::HashMap;

use super::message::{numeric, Command, Message};

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Whether `target` names a channel rather than a user.
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Member {
    nick: String,
    oper: bool,
    voiced: bool,
}

/// A joined channel and its members.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    name: String,
    members: HashMap<String, Member>,
}

impl Channel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every member, in no particular order.
    pub fn users(&self) -> Vec<String> {
        self.members.values().map(|m| m.nick.clone()).collect()
    }

    /// Members flagged operator (`+o`), in no particular order.
    pub fn opers(&self) -> Vec<String> {
        self.members
            .values()
            .filter(|m| m.oper)
            .map(|m| m.nick.clone())
            .collect()
    }

    /// Members flagged voiced (`+v`), in no particular order.
    pub fn voiced(&self) -> Vec<String> {
        self.members
            .values()
            .filter(|m| m.voiced)
            .map(|m| m.nick.clone())
            .collect()
    }

    pub fn has_user(&self, nick: &str) -> bool {
        self.members.contains_key(&fold(nick))
    }

    pub fn is_oper(&self, nick: &str) -> bool {
        self.members.get(&fold(nick)).is_some_and(|m| m.oper)
    }

    pub fn is_voiced(&self, nick: &str) -> bool {
        self.members.get(&fold(nick)).is_some_and(|m| m.voiced)
    }

    fn add(&mut self, nick: &str) -> &mut Member {
        self.members.entry(fold(nick)).or_insert_with(|| Member {
            nick: nick.to_string(),
            oper: false,
            voiced: false,
        })
    }

    fn remove(&mut self, nick: &str) {
        self.members.remove(&fold(nick));
    }

    fn rename(&mut self, old: &str, new: &str) {
        if let Some(mut member) = self.members.remove(&fold(old)) {
            member.nick = new.to_string();
            self.members.insert(fold(new), member);
        }
    }

    fn apply_modes(&mut self, modes: &str, args: &[String]) {
        let mut adding = true;
        let mut args = args.iter();
        for mode in modes.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                'o' | 'v' => {
                    let Some(nick) = args.next() else { return };
                    if let Some(member) = self.members.get_mut(&fold(nick)) {
                        if mode == 'o' {
                            member.oper = adding;
                        } else {
                            member.voiced = adding;
                        }
                    }
                }
                // Modes that carry an argument we don't track.
                'b' | 'e' | 'I' | 'k' | 'h' | 'q' | 'a' => {
                    args.next();
                }
                'l' if adding => {
                    args.next();
                }
                _ => {}
            }
        }
    }
}

/// All channels the client currently sits in.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    channels: HashMap<String, Channel>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&fold(name))
    }

    /// Names of joined channels, in no particular order.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.values().map(|c| c.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Apply one inbound message. `own_nick` is the client's nickname before
    /// the message is processed.
    pub fn update(&mut self, own_nick: &str, msg: &Message) {
        let source = msg.source_nick().unwrap_or_default();
        let from_self = source.eq_ignore_ascii_case(own_nick);

        match &msg.command {
            Command::Named(cmd) => match cmd.as_str() {
                "JOIN" => {
                    let Some(names) = msg.param(0) else { return };
                    for name in names.split(',') {
                        if from_self {
                            self.joined(name, own_nick);
                        } else if let Some(channel) = self.channels.get_mut(&fold(name)) {
                            channel.add(source);
                        }
                    }
                }
                "PART" => {
                    let Some(names) = msg.param(0) else { return };
                    for name in names.split(',') {
                        if from_self {
                            self.channels.remove(&fold(name));
                        } else if let Some(channel) = self.channels.get_mut(&fold(name)) {
                            channel.remove(source);
                        }
                    }
                }
                "QUIT" => {
                    if from_self {
                        self.channels.clear();
                    } else {
                        for channel in self.channels.values_mut() {
                            channel.remove(source);
                        }
                    }
                }
                "KICK" => {
                    let (Some(name), Some(target)) = (msg.param(0), msg.param(1)) else {
                        return;
                    };
                    if target.eq_ignore_ascii_case(own_nick) {
                        self.channels.remove(&fold(name));
                    } else if let Some(channel) = self.channels.get_mut(&fold(name)) {
                        channel.remove(target);
                    }
                }
                "MODE" => {
                    let (Some(name), Some(modes)) = (msg.param(0), msg.param(1)) else {
                        return;
                    };
                    if let Some(channel) = self.channels.get_mut(&fold(name)) {
                        channel.apply_modes(modes, &msg.params[2..]);
                    }
                }
                "NICK" => {
                    let Some(new_nick) = msg.param(0) else { return };
                    for channel in self.channels.values_mut() {
                        channel.rename(source, new_nick);
                    }
                }
                _ => {}
            },
            Command::Numeric(numeric::RPL_NAMREPLY) => {
                // 353 <me> <type> <channel> :[@|+]nick ...
                let (Some(name), Some(names)) = (msg.param(2), msg.param(3)) else {
                    return;
                };
                if let Some(channel) = self.channels.get_mut(&fold(name)) {
                    for entry in names.split_whitespace() {
                        let nick = entry.trim_start_matches(['@', '+', '%', '~', '&']);
                        if nick.is_empty() {
                            continue;
                        }
                        let prefixes = &entry[..entry.len() - nick.len()];
                        let member = channel.add(nick);
                        member.oper |= prefixes.contains('@');
                        member.voiced |= prefixes.contains('+');
                    }
                }
            }
            Command::Numeric(_) => {}
        }
    }

    fn joined(&mut self, name: &str, own_nick: &str) {
        self.channels
            .entry(fold(name))
            .or_insert_with(|| Channel::new(name))
            .add(own_nick);
    }
}
