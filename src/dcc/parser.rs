//! DCC CTCP offer parser.
//!
//! Offers arrive as CTCP payloads:
//!
//! ```text
//! DCC CHAT chat <ip_decimal> <port>
//! DCC SEND <filename> <ip_decimal> <port> <filesize>
//! ```
//!
//! The address is an IPv4 address encoded as a decimal u32 in network byte
//! order, as every DCC implementation has done since ircII.

use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

use crate::dcc::security;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DccParseError {
    #[error("not a DCC request")]
    NotDcc,
    #[error("unsupported DCC request type {0:?}")]
    Unsupported(String),
    #[error("expected {expected} arguments, got {got}")]
    WrongArity { expected: usize, got: usize },
    #[error("invalid DCC address {0:?}")]
    BadAddress(String),
    #[error("invalid DCC port {0:?}")]
    BadPort(String),
    #[error("invalid DCC file size {0:?}")]
    BadSize(String),
    #[error("unusable DCC filename")]
    BadFilename,
}

/// A parsed DCC CHAT offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DccChatOffer {
    pub address: IpAddr,
    pub port: u16,
}

/// A parsed DCC SEND offer with a sanitized filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DccSendOffer {
    pub filename: String,
    pub address: IpAddr,
    pub port: u16,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DccOffer {
    Chat(DccChatOffer),
    Send(DccSendOffer),
}

impl DccOffer {
    pub fn address(&self) -> IpAddr {
        match self {
            DccOffer::Chat(chat) => chat.address,
            DccOffer::Send(send) => send.address,
        }
    }
}

/// Parse a full CTCP payload, `DCC ...` included.
pub fn parse_dcc_offer(ctcp: &str) -> Result<DccOffer, DccParseError> {
    let (kind, _) = ctcp.split_once(' ').ok_or(DccParseError::NotDcc)?;
    if !kind.eq_ignore_ascii_case("DCC") {
        return Err(DccParseError::NotDcc);
    }
    let request = ctcp[kind.len()..].trim_start();
    let request_type = request.split_whitespace().next().unwrap_or_default();

    match request_type.to_ascii_uppercase().as_str() {
        "CHAT" => parse_dcc_chat(request).map(DccOffer::Chat),
        "SEND" => parse_dcc_send(request).map(DccOffer::Send),
        _ => Err(DccParseError::Unsupported(request_type.to_string())),
    }
}

/// Parse `CHAT chat <ip_decimal> <port>`. Exactly four tokens are accepted.
pub fn parse_dcc_chat(request: &str) -> Result<DccChatOffer, DccParseError> {
    let parts: Vec<&str> = request.split_whitespace().collect();
    if parts.len() != 4 {
        return Err(DccParseError::WrongArity {
            expected: 4,
            got: parts.len(),
        });
    }
    if !parts[0].eq_ignore_ascii_case("CHAT") {
        return Err(DccParseError::Unsupported(parts[0].to_string()));
    }
    Ok(DccChatOffer {
        address: parse_address(parts[2])?,
        port: parse_port(parts[3])?,
    })
}

/// Parse `SEND <filename> <ip_decimal> <port> <filesize>`.
///
/// Supports both quoted and unquoted filenames.
pub fn parse_dcc_send(request: &str) -> Result<DccSendOffer, DccParseError> {
    let (kind, content) = request.split_once(' ').unwrap_or((request, ""));
    if !kind.eq_ignore_ascii_case("SEND") {
        return Err(DccParseError::Unsupported(kind.to_string()));
    }
    let content = content.trim_start();

    let (filename, rest) = match content.strip_prefix('"') {
        Some(quoted) => quoted.split_once('"').ok_or(DccParseError::BadFilename)?,
        None => content.split_once(' ').unwrap_or((content, "")),
    };

    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(DccParseError::WrongArity {
            expected: 3,
            got: parts.len(),
        });
    }

    Ok(DccSendOffer {
        filename: security::sanitize_filename(filename).ok_or(DccParseError::BadFilename)?,
        address: parse_address(parts[0])?,
        port: parse_port(parts[1])?,
        size: parts[2]
            .parse()
            .map_err(|_| DccParseError::BadSize(parts[2].to_string()))?,
    })
}

/// CTCP payload offering a DCC CHAT listener.
pub fn chat_offer_payload(address: Ipv4Addr, port: u16) -> String {
    format!("DCC CHAT chat {} {}", u32::from(address), port)
}

fn parse_address(token: &str) -> Result<IpAddr, DccParseError> {
    token
        .parse::<u32>()
        .map(|n| IpAddr::V4(Ipv4Addr::from(n)))
        .map_err(|_| DccParseError::BadAddress(token.to_string()))
}

fn parse_port(token: &str) -> Result<u16, DccParseError> {
    // Port 0 means "reverse DCC", which needs a token exchange we don't do.
    match token.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(DccParseError::BadPort(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_chat_offer() {
        let offer = parse_dcc_offer("DCC CHAT chat 2130706433 5000").unwrap();
        assert_eq!(
            offer,
            DccOffer::Chat(DccChatOffer {
                address: IpAddr::from([127, 0, 0, 1]),
                port: 5000,
            })
        );
    }

    #[test]
    fn chat_requires_exactly_four_tokens() {
        assert_eq!(
            parse_dcc_chat("CHAT chat 2130706433"),
            Err(DccParseError::WrongArity { expected: 4, got: 3 })
        );
        assert_eq!(
            parse_dcc_chat("CHAT chat 2130706433 5000 extra"),
            Err(DccParseError::WrongArity { expected: 4, got: 5 })
        );
    }

    #[test]
    fn chat_rejects_bad_numbers() {
        assert_eq!(
            parse_dcc_chat("CHAT chat 127.0.0.1 5000"),
            Err(DccParseError::BadAddress("127.0.0.1".into()))
        );
        assert_eq!(
            parse_dcc_chat("CHAT chat 2130706433 70000"),
            Err(DccParseError::BadPort("70000".into()))
        );
        assert_eq!(
            parse_dcc_chat("CHAT chat 2130706433 0"),
            Err(DccParseError::BadPort("0".into()))
        );
    }

    #[test]
    fn parses_send_offer() {
        let offer = parse_dcc_offer("DCC SEND \"my file.txt\" 134744072 4000 1024").unwrap();
        assert_eq!(
            offer,
            DccOffer::Send(DccSendOffer {
                filename: "my file.txt".into(),
                address: IpAddr::from([8, 8, 8, 8]),
                port: 4000,
                size: 1024,
            })
        );
    }

    #[test]
    fn send_filename_is_sanitized() {
        let offer = parse_dcc_send("SEND ../../etc/passwd 134744072 4000 10").unwrap();
        assert_eq!(offer.filename, "passwd");
        assert_eq!(
            parse_dcc_send("SEND ... 134744072 4000 10"),
            Err(DccParseError::BadFilename)
        );
    }

    #[test]
    fn rejects_non_dcc_payloads() {
        assert_eq!(parse_dcc_offer("VERSION"), Err(DccParseError::NotDcc));
        assert_eq!(parse_dcc_offer("ACTION waves"), Err(DccParseError::NotDcc));
        assert_eq!(
            parse_dcc_offer("DCC RESUME file 4000 0"),
            Err(DccParseError::Unsupported("RESUME".into()))
        );
    }

    #[test]
    fn offer_payload_encodes_address_as_decimal() {
        assert_eq!(
            chat_offer_payload(Ipv4Addr::new(192, 168, 1, 2), 40000),
            "DCC CHAT chat 3232235778 40000"
        );
        let reparsed =
            parse_dcc_offer(&chat_offer_payload(Ipv4Addr::new(10, 0, 0, 1), 1234)).unwrap();
        assert_eq!(reparsed.address(), IpAddr::from([10, 0, 0, 1]));
    }
}
