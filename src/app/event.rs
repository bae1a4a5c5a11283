use crate::dcc::parser::DccSendOffer;
use crate::irc::message::Message;
use std::net::IpAddr;

pub type DccSessionId = usize;

/// Everything a [`Handler`](crate::irc::dispatcher::Handler) can be told about.
///
/// IRC traffic is classified into these by the dispatcher; the `Dcc*`
/// session variants arrive from DCC tasks over a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Registration finished (numeric 001).
    Welcome,
    /// The server refused a nickname (numeric 433).
    NicknameInUse { nickname: String },
    /// PRIVMSG addressed to our own nickname.
    PrivateMessage { source: String, text: String },
    /// PRIVMSG addressed to a channel.
    ChannelMessage {
        source: String,
        channel: String,
        text: String,
    },
    /// CTCP `DCC CHAT` offer from `source`.
    DccChatInvite {
        source: String,
        address: IpAddr,
        port: u16,
    },
    /// CTCP `DCC SEND` offer from `source`.
    DccSendOffer { source: String, offer: DccSendOffer },
    /// A line received on a DCC CHAT session.
    DccMessage { session: DccSessionId, text: String },
    /// A DCC CHAT session ended (either side closed it or it failed).
    DccClosed {
        session: DccSessionId,
        reason: Option<String>,
    },
    /// Anything else.
    Other(Message),
}
