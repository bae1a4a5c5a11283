//! Event classification and handler dispatch.
//!
//! The dispatcher turns messages the session forwarded into [`Event`]s and
//! hands each one to exactly one [`Handler`] method. Handlers never touch the
//! socket: they record [`Action`]s on a [`Context`], which the connection
//! applies once the handler returns.

use std::net::IpAddr;

use tracing::{debug, warn};

use super::message::{ctcp_payload, numeric, Message};
use super::tracker::{is_channel_name, Tracker};
use crate::app::action::Action;
use crate::app::event::{DccSessionId, Event};
use crate::dcc::parser::{parse_dcc_offer, DccOffer, DccSendOffer};
use crate::dcc::security::is_private_ip;

/// Consumer callbacks. Every method defaults to dropping the event.
pub trait Handler {
    fn on_welcome(&mut self, _ctx: &mut Context<'_>) {}

    fn on_nickname_in_use(&mut self, _ctx: &mut Context<'_>, _nickname: &str) {}

    fn on_private_message(&mut self, _ctx: &mut Context<'_>, _source: &str, _text: &str) {}

    fn on_channel_message(
        &mut self,
        _ctx: &mut Context<'_>,
        _source: &str,
        _channel: &str,
        _text: &str,
    ) {
    }

    fn on_dcc_chat_invite(
        &mut self,
        _ctx: &mut Context<'_>,
        _source: &str,
        _address: IpAddr,
        _port: u16,
    ) {
    }

    fn on_dcc_send_offer(&mut self, _ctx: &mut Context<'_>, _source: &str, _offer: &DccSendOffer) {}

    fn on_dcc_message(&mut self, _ctx: &mut Context<'_>, _session: DccSessionId, _text: &str) {}

    fn on_dcc_closed(
        &mut self,
        _ctx: &mut Context<'_>,
        _session: DccSessionId,
        _reason: Option<&str>,
    ) {
    }

    /// Fallback for everything without a dedicated method.
    fn on_other(&mut self, _ctx: &mut Context<'_>, _msg: &Message) {}
}

/// What a handler can see and do while it runs.
pub struct Context<'a> {
    nickname: &'a str,
    tracker: &'a Tracker,
    actions: Vec<Action>,
}

impl<'a> Context<'a> {
    pub fn new(nickname: &'a str, tracker: &'a Tracker) -> Self {
        Self {
            nickname,
            tracker,
            actions: Vec::new(),
        }
    }

    /// Our current nickname.
    pub fn nickname(&self) -> &str {
        self.nickname
    }

    pub fn tracker(&self) -> &Tracker {
        self.tracker
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn send(&mut self, msg: Message) {
        self.actions.push(Action::Send(msg));
    }

    pub fn join(&mut self, channel: &str) {
        self.send(Message::join(channel));
    }

    pub fn part(&mut self, channel: &str, reason: Option<&str>) {
        self.send(Message::part(channel, reason));
    }

    pub fn send_private_message(&mut self, target: &str, text: &str) {
        // No CTCP injection through plain messages.
        let clean = text.replace('\x01', "");
        self.send(Message::privmsg(target, &clean));
    }

    pub fn send_notice(&mut self, target: &str, text: &str) {
        let clean = text.replace('\x01', "");
        self.send(Message::notice(target, &clean));
    }

    /// QUIT, then reconnect after the configured delay.
    pub fn disconnect(&mut self, message: &str) {
        self.actions.push(Action::Disconnect {
            message: message.to_string(),
        });
    }

    /// QUIT and stop for good.
    pub fn terminate(&mut self, message: &str) {
        self.actions.push(Action::Terminate {
            message: message.to_string(),
        });
    }

    pub fn connect_dcc(&mut self, address: IpAddr, port: u16) {
        self.actions.push(Action::ConnectDcc { address, port });
    }

    /// Offer `nick` a DCC CHAT on a fresh listener.
    pub fn listen_dcc(&mut self, nick: &str) {
        self.actions.push(Action::ListenDcc {
            nick: nick.to_string(),
        });
    }

    pub fn send_dcc(&mut self, session: DccSessionId, text: &str) {
        self.actions.push(Action::SendDcc {
            session,
            text: text.to_string(),
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    reject_private_ips: bool,
}

impl Dispatcher {
    pub fn new(reject_private_ips: bool) -> Self {
        Self { reject_private_ips }
    }

    /// Classify a message the session forwarded. `None` means the message is
    /// dropped (a malformed or refused DCC offer).
    pub fn classify(&self, msg: &Message, own_nick: &str) -> Option<Event> {
        if msg.is_numeric(numeric::RPL_WELCOME) {
            return Some(Event::Welcome);
        }
        if msg.is_numeric(numeric::ERR_NICKNAMEINUSE) {
            let nickname = msg.param(1).unwrap_or_default().to_string();
            return Some(Event::NicknameInUse { nickname });
        }
        if !msg.command.is("PRIVMSG") {
            return Some(Event::Other(msg.clone()));
        }

        let (Some(source), Some(target), Some(text)) =
            (msg.source_nick(), msg.param(0), msg.param(1))
        else {
            return Some(Event::Other(msg.clone()));
        };

        if let Some(payload) = ctcp_payload(text) {
            return match payload.get(..4) {
                Some(head) if head.eq_ignore_ascii_case("DCC ") => {
                    self.classify_dcc(source, payload)
                }
                _ => Some(Event::Other(msg.clone())),
            };
        }

        let source = source.to_string();
        let text = text.to_string();
        if target.eq_ignore_ascii_case(own_nick) {
            Some(Event::PrivateMessage { source, text })
        } else if is_channel_name(target) {
            Some(Event::ChannelMessage {
                source,
                channel: target.to_string(),
                text,
            })
        } else {
            Some(Event::Other(msg.clone()))
        }
    }

    fn classify_dcc(&self, source: &str, payload: &str) -> Option<Event> {
        let offer = match parse_dcc_offer(payload) {
            Ok(offer) => offer,
            Err(e) => {
                debug!(%source, %payload, error = %e, "ignoring malformed DCC offer");
                return None;
            }
        };

        if self.reject_private_ips && is_private_ip(&offer.address()) {
            warn!(%source, address = %offer.address(), "refusing DCC offer to a private address");
            return None;
        }

        let source = source.to_string();
        Some(match offer {
            DccOffer::Chat(chat) => Event::DccChatInvite {
                source,
                address: chat.address,
                port: chat.port,
            },
            DccOffer::Send(offer) => Event::DccSendOffer { source, offer },
        })
    }
}

/// Hand `event` to the one handler method it belongs to.
pub fn dispatch<H: Handler + ?Sized>(event: &Event, handler: &mut H, ctx: &mut Context<'_>) {
    match event {
        Event::Welcome => handler.on_welcome(ctx),
        Event::NicknameInUse { nickname } => handler.on_nickname_in_use(ctx, nickname),
        Event::PrivateMessage { source, text } => handler.on_private_message(ctx, source, text),
        Event::ChannelMessage {
            source,
            channel,
            text,
        } => handler.on_channel_message(ctx, source, channel, text),
        Event::DccChatInvite {
            source,
            address,
            port,
        } => handler.on_dcc_chat_invite(ctx, source, *address, *port),
        Event::DccSendOffer { source, offer } => handler.on_dcc_send_offer(ctx, source, offer),
        Event::DccMessage { session, text } => handler.on_dcc_message(ctx, *session, text),
        Event::DccClosed { session, reason } => {
            handler.on_dcc_closed(ctx, *session, reason.as_deref())
        }
        Event::Other(msg) => handler.on_other(ctx, msg),
    }
}
