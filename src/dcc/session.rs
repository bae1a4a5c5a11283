//! DCC CHAT session tasks.
//!
//! Each session runs on its own task so a slow or stalled peer never holds
//! up the IRC connection. Received lines go to the main loop as
//! [`Event::DccMessage`]; lines to send come in over an mpsc channel. When
//! the session ends for any reason an [`Event::DccClosed`] follows.

use crate::app::event::{DccSessionId, Event};
use crate::irc::framer::LineFramer;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect to a peer that offered `DCC CHAT chat <address> <port>`.
pub fn spawn_connect(
    session: DccSessionId,
    address: IpAddr,
    port: u16,
    outgoing: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        let result = async {
            let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((address, port)))
                .await
                .with_context(|| format!("timed out connecting to {}:{}", address, port))?
                .with_context(|| format!("failed to connect to {}:{}", address, port))?;
            run(session, stream, outgoing, &event_tx).await
        }
        .await;
        closed(session, result, &event_tx);
    });
}

/// Wait for the peer we offered a listener to, then run the session.
pub fn spawn_accept(
    session: DccSessionId,
    listener: TcpListener,
    accept_timeout: Duration,
    outgoing: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        let result = async {
            let (stream, peer) = tokio::time::timeout(accept_timeout, listener.accept())
                .await
                .context("nobody accepted the DCC CHAT offer")?
                .context("failed to accept DCC CHAT connection")?;
            debug!(session, %peer, "DCC CHAT peer connected");
            // One peer per offer.
            drop(listener);
            run(session, stream, outgoing, &event_tx).await
        }
        .await;
        closed(session, result, &event_tx);
    });
}

fn closed(session: DccSessionId, result: Result<()>, event_tx: &mpsc::UnboundedSender<Event>) {
    let reason = result.err().map(|e| format!("{:#}", e));
    info!(session, reason = reason.as_deref().unwrap_or("closed"), "DCC CHAT session ended");
    let _ = event_tx.send(Event::DccClosed { session, reason });
}

async fn run(
    session: DccSessionId,
    stream: TcpStream,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    event_tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    info!(session, peer = ?stream.peer_addr().ok(), "DCC CHAT session open");
    let (mut sink, mut lines) = Framed::new(stream, LineFramer::default()).split();

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(Ok(text)) => {
                    if event_tx.send(Event::DccMessage { session, text }).is_err() {
                        return Ok(());
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            text = outgoing.recv() => match text {
                Some(text) => sink.send(text).await?,
                // The manager dropped the session.
                None => return Ok(()),
            },
        }
    }
}
