//! DCC CHAT negotiation and sessions.

pub mod manager;
pub mod parser;
pub mod security;
pub mod session;
