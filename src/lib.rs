//! quipbot: an IRC client engine and the quote bot built on it.
//!
//! The engine lives in [`irc`] (framing, parsing, session state, channel
//! tracking, dispatch, the connection driver) and [`dcc`] (DCC CHAT offers
//! and sessions). [`app`] holds the bot itself; [`config`] and [`logging`]
//! are shared by both.

pub mod app;
pub mod config;
pub mod dcc;
pub mod irc;
pub mod logging;
