//! Reconnect supervisor.
//!
//! Runs one [`Client`] against the configured servers in round-robin order.
//! Any non-terminal end of a connection (transport error, framing error,
//! keepalive timeout, a handler's disconnect request) is followed by the
//! reconnect delay and another attempt; a terminate request or a
//! registration failure ends the loop.

use crate::config::{AppConfig, ServerConfig};
use crate::irc::connection::{Client, Shutdown};
use crate::irc::dispatcher::Handler;
use anyhow::{bail, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub struct IrcManager<H> {
    client: Client<H>,
    servers: Vec<ServerConfig>,
    reconnect_delay: Duration,
    cursor: usize,
}

impl<H: Handler> IrcManager<H> {
    pub fn new(config: &AppConfig, handler: H) -> Result<Self> {
        if config.servers.is_empty() {
            bail!("No servers configured");
        }
        Ok(Self {
            client: Client::new(config, handler),
            servers: config.servers.clone(),
            reconnect_delay: Duration::from_secs(config.connection.reconnect_delay_secs),
            cursor: 0,
        })
    }

    fn next_server(&mut self) -> ServerConfig {
        let server = self.servers[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.servers.len();
        server
    }

    /// Run until a handler terminates the bot (`Ok`) or a terminal error
    /// occurs (`Err`). Dropping the future cancels a pending reconnect.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let server = self.next_server();
            match self.client.run_once(&server.host, server.port).await {
                Ok(Shutdown::Terminate) => {
                    info!("terminated");
                    return Ok(());
                }
                Ok(Shutdown::Disconnect) => {
                    info!(host = %server.host, "disconnected on request");
                }
                Err(e) if e.is_terminal() => {
                    error!(host = %server.host, error = %e, "giving up");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(host = %server.host, port = server.port, error = %e, "connection lost");
                }
            }

            let deadline = Instant::now() + self.reconnect_delay;
            info!(delay_secs = self.reconnect_delay.as_secs(), "reconnecting after delay");
            tokio::time::sleep_until(deadline).await;
        }
    }
}
