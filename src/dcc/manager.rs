//! DCC CHAT session manager.
//!
//! Hands out session ids, spawns the session tasks (active connect or passive
//! listen) and keeps the sender half of each session's outgoing line channel.

use crate::app::event::{DccSessionId, Event};
use crate::config::DccConfig;
use crate::dcc::parser::chat_offer_payload;
use crate::dcc::session;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

/// Owns every live DCC CHAT session of one bot.
pub struct DccManager {
    config: DccConfig,
    next_id: DccSessionId,
    sessions: HashMap<DccSessionId, mpsc::UnboundedSender<String>>,
    event_tx: mpsc::UnboundedSender<Event>,
}

impl DccManager {
    pub fn new(config: DccConfig, event_tx: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            config,
            next_id: 1,
            sessions: HashMap::new(),
            event_tx,
        }
    }

    fn allocate(&mut self) -> (DccSessionId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(id, tx);
        (id, rx)
    }

    /// Connect out to an offered DCC CHAT. The session is usable (lines are
    /// buffered) before the connection completes.
    pub fn connect(&mut self, address: IpAddr, port: u16) -> DccSessionId {
        let (id, outgoing) = self.allocate();
        info!(session = id, %address, port, "connecting DCC CHAT");
        session::spawn_connect(id, address, port, outgoing, self.event_tx.clone());
        id
    }

    /// Open a listener and return the CTCP payload that offers it.
    ///
    /// `local_ip` is the local address of the IRC connection, advertised
    /// unless the config names an explicit address.
    pub async fn listen(&mut self, local_ip: IpAddr) -> Result<(DccSessionId, String)> {
        let advertised = match self.config.advertise_address.unwrap_or(local_ip) {
            IpAddr::V4(v4) if !v4.is_unspecified() => v4,
            other => bail!("cannot advertise {} in a DCC CHAT offer", other),
        };

        let listener = TcpListener::bind((self.config.listen_address, 0))
            .await
            .with_context(|| {
                format!("failed to bind DCC listener on {}", self.config.listen_address)
            })?;
        let port = listener.local_addr()?.port();

        let (id, outgoing) = self.allocate();
        info!(session = id, %advertised, port, "offering DCC CHAT");
        session::spawn_accept(
            id,
            listener,
            Duration::from_secs(self.config.accept_timeout_secs),
            outgoing,
            self.event_tx.clone(),
        );
        Ok((id, chat_offer_payload(advertised, port)))
    }

    pub fn send(&self, session: DccSessionId, text: String) -> Result<()> {
        let tx = self
            .sessions
            .get(&session)
            .ok_or_else(|| anyhow!("DCC session {} not found", session))?;
        tx.send(text)
            .map_err(|_| anyhow!("DCC session {} already closed", session))
    }

    /// Drop a finished session. Its task stops once its channel closes.
    pub fn forget(&mut self, session: DccSessionId) {
        self.sessions.remove(&session);
    }

    pub fn is_open(&self, session: DccSessionId) -> bool {
        self.sessions.contains_key(&session)
    }
}
