//! The quote bot and the types it shares with the IRC engine.

pub mod action;
pub mod event;
pub mod handler;
pub mod quote;
