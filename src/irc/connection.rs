//! Async driver for one IRC connection.
//!
//! [`Client::run_once`] opens a TCP connection, registers and then runs the
//! read loop until the server goes away, an error ends the connection or a
//! handler asks to disconnect. Each inbound line is fully processed (session,
//! tracker, dispatch, actions, outbound flush) before the next one is read.

use std::future::Future;
use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::dispatcher::{dispatch, Context, Dispatcher, Handler};
use super::error::ConnectionError;
use super::framer::LineFramer;
use super::message::Message;
use super::session::Session;
use crate::app::action::Action;
use crate::app::event::Event;
use crate::config::AppConfig;
use crate::dcc::manager::DccManager;
use crate::logging::Transcript;

type Transport = Framed<TcpStream, LineFramer>;
type LineSink = SplitSink<Transport, String>;
type LineStream = SplitStream<Transport>;

/// How a connection ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Reconnect after the configured delay.
    Disconnect,
    /// Stop for good.
    Terminate,
}

pub struct Client<H> {
    session: Session,
    dispatcher: Dispatcher,
    handler: H,
    dcc: DccManager,
    dcc_events: mpsc::UnboundedReceiver<Event>,
    transcript: Transcript,
    keepalive: Duration,
    connect_timeout: Duration,
    max_line_len: usize,
}

impl<H: Handler> Client<H> {
    pub fn new(config: &AppConfig, handler: H) -> Self {
        let (dcc_tx, dcc_events) = mpsc::unbounded_channel();
        Self {
            session: Session::new(
                config.identity.clone(),
                config.ctcp.clone(),
                config.connection.max_nick_attempts,
            ),
            dispatcher: Dispatcher::new(config.dcc.reject_private_ips),
            handler,
            dcc: DccManager::new(config.dcc.clone(), dcc_tx),
            dcc_events,
            transcript: Transcript::new(&config.logging),
            keepalive: Duration::from_secs(config.connection.keepalive_secs),
            connect_timeout: Duration::from_secs(config.connection.connect_timeout_secs),
            max_line_len: config.connection.max_line_len,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connect to `host:port` and run until the connection ends.
    pub async fn run_once(&mut self, host: &str, port: u16) -> Result<Shutdown, ConnectionError> {
        self.session.connecting();
        info!(%host, port, "connecting");

        let connect = TcpStream::connect((host, port));
        let result = match connect_within(self.connect_timeout, host, port, connect).await {
            Ok(stream) => self.serve(stream).await,
            Err(e) => Err(e),
        };

        self.session.disconnected();
        result
    }

    async fn serve(&mut self, stream: TcpStream) -> Result<Shutdown, ConnectionError> {
        let local_ip = stream.local_addr()?.ip();
        info!(peer = ?stream.peer_addr().ok(), %local_ip, "connected");

        let transport = Framed::new(stream, LineFramer::new(self.max_line_len));
        let (mut sink, mut lines) = transport.split();

        self.session.register();
        let result = self.read_loop(&mut sink, &mut lines, local_ip).await;

        if result.is_ok() {
            // Push out the QUIT before hanging up.
            if let Err(e) = self.flush(&mut sink).await {
                warn!(error = %e, "failed to send QUIT");
            }
            let _ = sink.close().await;
        }
        result
    }

    async fn read_loop(
        &mut self,
        sink: &mut LineSink,
        lines: &mut LineStream,
        local_ip: IpAddr,
    ) -> Result<Shutdown, ConnectionError> {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.flush(sink).await?;

            let shutdown = tokio::select! {
                line = lines.next() => match line {
                    Some(line) => self.on_line(&line?, local_ip).await?,
                    None => return Err(ConnectionError::Closed),
                },
                Some(event) = self.dcc_events.recv() => {
                    if let Event::DccClosed { session, .. } = &event {
                        self.dcc.forget(*session);
                    }
                    self.deliver(event, local_ip).await
                }
                _ = ticker.tick() => {
                    self.session.keepalive(Instant::now(), self.keepalive)?;
                    None
                }
            };

            if let Some(shutdown) = shutdown {
                return Ok(shutdown);
            }
        }
    }

    async fn on_line(
        &mut self,
        line: &str,
        local_ip: IpAddr,
    ) -> Result<Option<Shutdown>, ConnectionError> {
        let msg = match Message::parse(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%line, error = %e, "dropping unparseable line");
                return Ok(None);
            }
        };
        debug!(%line, "<<");

        if !self.session.handle(&msg, Instant::now())? {
            return Ok(None);
        }
        let Some(event) = self.dispatcher.classify(&msg, self.session.nickname()) else {
            return Ok(None);
        };
        Ok(self.deliver(event, local_ip).await)
    }

    /// Run the handler for one event and apply what it asked for.
    async fn deliver(&mut self, event: Event, local_ip: IpAddr) -> Option<Shutdown> {
        match &event {
            Event::ChannelMessage {
                source,
                channel,
                text,
            } => self.transcript.log_message(channel, source, text),
            Event::PrivateMessage { source, text } => {
                self.transcript.log_message(source, source, text)
            }
            _ => {}
        }

        let mut ctx = Context::new(self.session.nickname(), self.session.tracker());
        dispatch(&event, &mut self.handler, &mut ctx);
        let actions = ctx.into_actions();
        self.apply(actions, local_ip).await
    }

    /// Apply actions in order. A disconnect or terminate request queues the
    /// QUIT and discards whatever follows it.
    async fn apply(&mut self, actions: Vec<Action>, local_ip: IpAddr) -> Option<Shutdown> {
        for action in actions {
            match action {
                Action::Send(msg) => {
                    if msg.command.is("PRIVMSG") || msg.command.is("NOTICE") {
                        if let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) {
                            let nickname = self.session.nickname().to_string();
                            self.transcript.log_message(target, &nickname, text);
                        }
                    }
                    self.session.enqueue(msg);
                }
                Action::Disconnect { message } => {
                    info!(%message, "disconnecting");
                    self.session.enqueue(Message::quit(Some(&message)));
                    return Some(Shutdown::Disconnect);
                }
                Action::Terminate { message } => {
                    info!(%message, "terminating");
                    self.session.enqueue(Message::quit(Some(&message)));
                    return Some(Shutdown::Terminate);
                }
                Action::ConnectDcc { address, port } => {
                    self.dcc.connect(address, port);
                }
                Action::ListenDcc { nick } => match self.dcc.listen(local_ip).await {
                    Ok((_, payload)) => self.session.enqueue(Message::ctcp(&nick, &payload)),
                    Err(e) => warn!(%nick, error = %format!("{:#}", e), "cannot offer DCC CHAT"),
                },
                Action::SendDcc { session, text } => {
                    if let Err(e) = self.dcc.send(session, text) {
                        warn!(session, error = %e, "dropping DCC line");
                    }
                }
            }
        }
        None
    }

    async fn flush(&mut self, sink: &mut LineSink) -> Result<(), ConnectionError> {
        let mut sent = false;
        while let Some(msg) = self.session.next_outbound() {
            let line = msg.to_wire();
            debug!(%line, ">>");
            sink.feed(line).await?;
            sent = true;
        }
        if sent {
            sink.flush().await?;
        }
        Ok(())
    }
}

async fn connect_within<T>(
    limit: Duration,
    host: &str,
    port: u16,
    connect: impl Future<Output = io::Result<T>>,
) -> Result<T, ConnectionError> {
    match tokio::time::timeout(limit, connect).await {
        Ok(stream) => Ok(stream?),
        Err(_) => Err(ConnectionError::ConnectTimeout {
            host: host.to_string(),
            port,
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::app::handler::QuoteBot;
    use crate::config::{ConnectionConfig, IdentityConfig, ServerConfig};
    use crate::irc::error::RegistrationError;
    use crate::irc::session::ConnectionState;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpListener;

    pub(crate) fn test_config(port: u16) -> AppConfig {
        AppConfig {
            servers: vec![ServerConfig {
                host: "127.0.0.1".into(),
                port,
            }],
            channel: "#test".into(),
            identity: IdentityConfig {
                nickname: "bot".into(),
                ..IdentityConfig::default()
            },
            connection: ConnectionConfig {
                reconnect_delay_secs: 0,
                keepalive_secs: 0,
                ..ConnectionConfig::default()
            },
            quotes: Vec::new(),
            ..AppConfig::default()
        }
    }

    /// Server side of a fake IRC connection.
    pub(crate) struct FakeServer {
        lines: Lines<BufReader<OwnedReadHalf>>,
        write: OwnedWriteHalf,
    }

    impl FakeServer {
        pub(crate) async fn accept(listener: &TcpListener) -> Self {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, write) = stream.into_split();
            Self {
                lines: BufReader::new(read).lines(),
                write,
            }
        }

        pub(crate) async fn recv(&mut self) -> String {
            self.lines.next_line().await.unwrap().unwrap()
        }

        pub(crate) async fn send(&mut self, line: &str) {
            self.write.write_all(line.as_bytes()).await.unwrap();
            self.write.write_all(b"\r\n").await.unwrap();
        }

        /// Swallow client lines until it hangs up.
        pub(crate) async fn drain(&mut self) {
            while let Ok(Some(_)) = self.lines.next_line().await {}
        }

        /// Read the registration burst and welcome the client.
        pub(crate) async fn welcome(&mut self, nick: &str) {
            assert_eq!(self.recv().await, format!("NICK :{}", nick));
            assert!(self.recv().await.starts_with("USER "));
            self.send(&format!(":srv.test 001 {} :Welcome", nick)).await;
        }
    }

    #[tokio::test]
    async fn stats_round_trip_against_fake_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let mut server = FakeServer::accept(&listener).await;
            // Garbage lines are dropped, the connection survives.
            server.send(":").await;
            server.welcome("bot").await;
            assert_eq!(server.recv().await, "JOIN :#test");

            server.send(":bot!b@h JOIN #test").await;
            server.send(":srv.test 353 bot = #test :bot @carol +dave alice").await;
            server.send(":alice!a@h PRIVMSG bot :stats").await;
            let mut replies = Vec::new();
            for _ in 0..5 {
                replies.push(server.recv().await);
            }

            server.send("PING :abc").await;
            let pong = server.recv().await;

            server.send(":alice!a@h PRIVMSG bot :die").await;
            let quit = server.recv().await;
            (replies, pong, quit)
        });

        let config = test_config(port);
        let mut client = Client::new(&config, QuoteBot::from_config(&config));
        let shutdown = client.run_once("127.0.0.1", port).await.unwrap();
        assert_eq!(shutdown, Shutdown::Terminate);
        assert_eq!(client.session().state(), ConnectionState::Disconnected);

        let (replies, pong, quit) = server.await.unwrap();
        assert_eq!(
            replies,
            vec![
                "NOTICE alice :--- Channel statistics ---",
                "NOTICE alice :Channel: #test",
                "NOTICE alice :Users: alice, bot, carol, dave",
                "NOTICE alice :Opers: carol",
                "NOTICE alice :Voiced: dave",
            ]
        );
        assert_eq!(pong, "PONG :abc");
        assert_eq!(quit, "QUIT :Bye, cruel world!");
    }

    #[tokio::test]
    async fn server_hangup_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut server = FakeServer::accept(&listener).await;
            server.welcome("bot").await;
        });

        let config = test_config(port);
        let mut client = Client::new(&config, QuoteBot::from_config(&config));
        let err = client.run_once("127.0.0.1", port).await.unwrap_err();
        assert!(!err.is_terminal());
    }

    #[tokio::test]
    async fn overlong_line_is_a_framing_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut server = FakeServer::accept(&listener).await;
            server.send(&format!(":srv.test NOTICE * :{}", "x".repeat(600))).await;
            server.drain().await;
        });

        let mut config = test_config(port);
        config.connection.max_line_len = 512;
        let mut client = Client::new(&config, QuoteBot::from_config(&config));
        let err = client.run_once("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Framing(_)));
    }

    #[tokio::test]
    async fn nickname_exhaustion_is_terminal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut server = FakeServer::accept(&listener).await;
            server.recv().await;
            server.recv().await;
            server.send(":srv.test 433 * bot :Nickname is already in use").await;
            assert_eq!(server.recv().await, "NICK :bot_");
            server.send(":srv.test 433 * bot_ :Nickname is already in use").await;
            server.drain().await;
        });

        let mut config = test_config(port);
        config.connection.max_nick_attempts = 1;
        let mut client = Client::new(&config, QuoteBot::from_config(&config));
        let err = client.run_once("127.0.0.1", port).await.unwrap_err();
        assert!(err.is_terminal());
        assert!(matches!(
            err,
            ConnectionError::Registration(RegistrationError::NicknameExhausted { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn dcc_command_sends_offer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let mut server = FakeServer::accept(&listener).await;
            server.welcome("bot").await;
            server.recv().await;
            server.send(":alice!a@h PRIVMSG bot :dcc").await;
            let offer = server.recv().await;
            server.send(":alice!a@h PRIVMSG bot :die").await;
            server.recv().await;
            offer
        });

        let mut config = test_config(port);
        config.dcc.listen_address = IpAddr::from([127, 0, 0, 1]);
        let mut client = Client::new(&config, QuoteBot::from_config(&config));
        client.run_once("127.0.0.1", port).await.unwrap();

        let offer = server.await.unwrap();
        assert!(
            offer.starts_with("PRIVMSG alice :\x01DCC CHAT chat 2130706433 "),
            "unexpected offer {:?}",
            offer
        );
    }

    #[tokio::test]
    async fn stalled_connect_times_out() {
        let stalled = std::future::pending::<io::Result<()>>();
        let err = connect_within(Duration::from_millis(20), "irc.example", 6667, stalled)
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            ConnectionError::ConnectTimeout { host, port: 6667 } if host == "irc.example"
        ));
        assert!(!err.is_terminal());
    }

    #[tokio::test]
    async fn refused_connect_is_a_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = test_config(port);
        let mut client = Client::new(&config, QuoteBot::from_config(&config));
        let err = client.run_once("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Io(_)));
        assert_eq!(client.session().state(), ConnectionState::Disconnected);
    }
}
