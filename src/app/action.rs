use crate::app::event::DccSessionId;
use crate::irc::message::Message;
use std::net::IpAddr;

/// Work requested by a handler, applied by the connection once the handler
/// returns, in the order it was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(Message),
    /// QUIT and reconnect after the configured delay.
    Disconnect { message: String },
    /// QUIT and never reconnect.
    Terminate { message: String },
    ConnectDcc { address: IpAddr, port: u16 },
    /// Open a listener and offer it to `nick` via CTCP `DCC CHAT`.
    ListenDcc { nick: String },
    SendDcc { session: DccSessionId, text: String },
}
