//! IRC protocol engine: framing, parsing, session state, channel tracking,
//! dispatch and the connection driver.

pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod framer;
pub mod manager;
pub mod message;
pub mod session;
pub mod tracker;
