//! Connection state machine, free of any I/O.
//!
//! The session consumes parsed messages and fills an outbound queue; the
//! async driver in [`connection`](super::connection) owns the socket and
//! flushes that queue after every step. Registration, nickname negotiation,
//! PING/PONG, CTCP auto-replies and channel tracking all happen here, before
//! anything reaches the consumer's handler.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, warn};

use super::error::{ConnectionError, RegistrationError};
use super::message::{ctcp_payload, numeric, Command, Message};
use super::tracker::Tracker;
use crate::config::{CtcpConfig, IdentityConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Transport is being opened.
    Connecting,
    /// NICK/USER sent, waiting for the welcome numeric.
    Registering,
    Registered,
}

/// Nickname to try after `attempt` collisions: one `_` per attempt.
pub fn nickname_candidate(desired: &str, attempt: u32) -> String {
    format!("{}{}", desired, "_".repeat(attempt as usize))
}

#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    identity: IdentityConfig,
    ctcp: CtcpConfig,
    nickname: String,
    nick_attempts: u32,
    max_nick_attempts: u32,
    tracker: Tracker,
    outbound: VecDeque<Message>,
    last_activity: Instant,
    ping_outstanding: bool,
}

impl Session {
    pub fn new(identity: IdentityConfig, ctcp: CtcpConfig, max_nick_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            nickname: identity.nickname.clone(),
            identity,
            ctcp,
            nick_attempts: 0,
            max_nick_attempts,
            tracker: Tracker::new(),
            outbound: VecDeque::new(),
            last_activity: Instant::now(),
            ping_outstanding: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current nickname; differs from the configured one after collisions.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Reset per-connection state before opening a transport.
    pub fn connecting(&mut self) {
        self.state = ConnectionState::Connecting;
        self.nickname = self.identity.nickname.clone();
        self.nick_attempts = 0;
        self.tracker.clear();
        self.outbound.clear();
        self.touch(Instant::now());
    }

    /// Queue the registration burst. Call once the transport is open.
    pub fn register(&mut self) {
        if let Some(password) = &self.identity.password {
            self.outbound.push_back(Message::pass(password));
        }
        self.outbound.push_back(Message::nick(&self.nickname));
        self.outbound
            .push_back(Message::user(self.identity.username(), self.identity.realname()));
        self.state = ConnectionState::Registering;
    }

    pub fn disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.tracker.clear();
        self.outbound.clear();
    }

    /// Queue a message behind everything already queued.
    pub fn enqueue(&mut self, msg: Message) {
        self.outbound.push_back(msg);
    }

    pub fn next_outbound(&mut self) -> Option<Message> {
        self.outbound.pop_front()
    }

    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    fn touch(&mut self, now: Instant) {
        self.last_activity = now;
        self.ping_outstanding = false;
    }

    /// Feed one inbound message.
    ///
    /// Returns `Ok(true)` when the message should also go to the dispatcher,
    /// `Ok(false)` when the session consumed it (PING, PONG, CTCP queries it
    /// answers itself).
    pub fn handle(&mut self, msg: &Message, now: Instant) -> Result<bool, RegistrationError> {
        self.touch(now);
        self.tracker.update(&self.nickname, msg);

        match &msg.command {
            Command::Named(cmd) => match cmd.as_str() {
                "PING" => {
                    let token = msg.params.last().map(String::as_str).unwrap_or_default();
                    // Servers drop clients that are slow to answer, so the
                    // PONG jumps the queue.
                    self.outbound.push_front(Message::pong(token));
                    Ok(false)
                }
                "PONG" => Ok(false),
                "NICK" => {
                    if let (Some(source), Some(new_nick)) = (msg.source_nick(), msg.param(0)) {
                        if source.eq_ignore_ascii_case(&self.nickname) {
                            info!(old = %self.nickname, new = %new_nick, "nickname changed");
                            self.nickname = new_nick.to_string();
                        }
                    }
                    Ok(true)
                }
                "PRIVMSG" => Ok(!self.answer_ctcp(msg)),
                _ => Ok(true),
            },
            Command::Numeric(numeric::RPL_WELCOME) => {
                if let Some(nick) = msg.param(0) {
                    self.nickname = nick.to_string();
                }
                self.state = ConnectionState::Registered;
                info!(nickname = %self.nickname, "registered");
                Ok(true)
            }
            Command::Numeric(
                numeric::ERR_NICKNAMEINUSE
                | numeric::ERR_ERRONEUSNICKNAME
                | numeric::ERR_NICKCOLLISION
                | numeric::ERR_UNAVAILRESOURCE,
            ) if self.state == ConnectionState::Registering => {
                self.nick_attempts += 1;
                if self.nick_attempts > self.max_nick_attempts {
                    return Err(RegistrationError::NicknameExhausted {
                        desired: self.identity.nickname.clone(),
                        attempts: self.nick_attempts - 1,
                    });
                }
                let candidate = nickname_candidate(&self.identity.nickname, self.nick_attempts);
                warn!(rejected = %self.nickname, trying = %candidate, "nickname unavailable");
                self.nickname = candidate;
                self.outbound.push_back(Message::nick(&self.nickname));
                Ok(true)
            }
            Command::Numeric(_) => Ok(true),
        }
    }

    /// Answer VERSION/PING/TIME queries. Returns whether the message was
    /// consumed.
    fn answer_ctcp(&mut self, msg: &Message) -> bool {
        let (Some(source), Some(text)) = (msg.source_nick(), msg.param(1)) else {
            return false;
        };
        let Some(payload) = ctcp_payload(text) else {
            return false;
        };
        let (command, arg) = payload.split_once(' ').unwrap_or((payload, ""));

        let reply = match command.to_ascii_uppercase().as_str() {
            "VERSION" if self.ctcp.reply_version => {
                format!("VERSION {}", self.ctcp.version_string)
            }
            "PING" if self.ctcp.reply_ping => format!("PING {}", arg),
            "TIME" if self.ctcp.reply_time => {
                format!("TIME {}", Local::now().format("%a %b %d %H:%M:%S %Y"))
            }
            _ => return false,
        };
        debug!(%source, %command, "answering CTCP query");
        self.outbound.push_back(Message::ctcp_reply(source, &reply));
        true
    }

    /// Client-side keepalive: PING the server after `interval` of silence,
    /// give up after twice that.
    pub fn keepalive(&mut self, now: Instant, interval: Duration) -> Result<(), ConnectionError> {
        if interval.is_zero() {
            return Ok(());
        }
        let idle = now.saturating_duration_since(self.last_activity);
        if idle >= interval * 2 {
            return Err(ConnectionError::Timeout(idle.as_secs()));
        }
        if idle >= interval && !self.ping_outstanding {
            debug!(idle_secs = idle.as_secs(), "sending keepalive PING");
            self.outbound
                .push_back(Message::ping(&Local::now().timestamp().to_string()));
            self.ping_outstanding = true;
        }
        Ok(())
    }
}
