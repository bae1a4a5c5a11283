//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a default, so a missing config file gives the bot its
//! stock behavior: `#SpaceGoatsChat` on freenode with the built-in quotes.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Servers tried in order; reconnects cycle through the list.
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerConfig>,
    /// Channel joined after registration.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub dcc: DccConfig,
    #[serde(default)]
    pub ctcp: CtcpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_quotes")]
    pub quotes: Vec<QuoteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            channel: default_channel(),
            identity: IdentityConfig::default(),
            connection: ConnectionConfig::default(),
            dcc: DccConfig::default(),
            ctcp: CtcpConfig::default(),
            logging: LoggingConfig::default(),
            quotes: default_quotes(),
        }
    }
}

fn default_servers() -> Vec<ServerConfig> {
    vec![ServerConfig {
        host: "irc.freenode.net".into(),
        port: default_port(),
    }]
}

fn default_quotes() -> Vec<QuoteConfig> {
    let quote = |search: &str, reply: &str, delay_secs: u64| QuoteConfig {
        search: search.into(),
        reply: reply.into(),
        delay_secs,
    };
    vec![
        quote("test", "test passed", 60),
        quote("lunch", "http://www.youtube.com/watch?v=XU1wk2HWtwA", 60),
        quote("the mall", "http://www.youtube.com/watch?v=IY_bhVSGKEg", 60),
        quote("...", "...", 5 * 60),
        quote(">.>", "<.<", 5 * 60),
        quote("<.<", ">.>", 5 * 60),
    ]
}

/// A single IRC server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address of the IRC server.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Who the bot says it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Desired nickname. Empty means "pick a random one".
    #[serde(default = "default_nickname")]
    pub nickname: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    /// Server password, sent as `PASS` before registering.
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            username: None,
            realname: None,
            password: None,
        }
    }
}

impl IdentityConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }
}

/// Connection lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// How many alternative nicknames to try before giving up.
    #[serde(default = "default_max_nick_attempts")]
    pub max_nick_attempts: u32,
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    /// Idle time before we PING the server; twice this is a timeout.
    /// Zero disables the client-side keepalive.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Give up on a TCP connect that has not completed after this long.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
            max_nick_attempts: default_max_nick_attempts(),
            max_line_len: default_max_line_len(),
            keepalive_secs: default_keepalive(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// DCC CHAT settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DccConfig {
    /// Local address the passive listener binds to.
    #[serde(default = "default_listen_address")]
    pub listen_address: IpAddr,
    /// Address advertised in passive offers. Defaults to the local address
    /// of the IRC connection, which is wrong behind NAT.
    #[serde(default)]
    pub advertise_address: Option<IpAddr>,
    #[serde(default = "default_accept_timeout")]
    pub accept_timeout_secs: u64,
    #[serde(default)]
    pub reject_private_ips: bool,
}

impl Default for DccConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            advertise_address: None,
            accept_timeout_secs: default_accept_timeout(),
            reject_private_ips: false,
        }
    }
}

/// CTCP (Client-To-Client Protocol) auto-reply settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtcpConfig {
    #[serde(default = "default_true")]
    pub reply_version: bool,
    #[serde(default = "default_true")]
    pub reply_ping: bool,
    #[serde(default = "default_true")]
    pub reply_time: bool,
    #[serde(default = "default_version_string")]
    pub version_string: String,
}

impl Default for CtcpConfig {
    fn default() -> Self {
        Self {
            reply_version: true,
            reply_ping: true,
            reply_time: true,
            version_string: default_version_string(),
        }
    }
}

/// Diagnostics and chat transcript settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` level: error, warn, info, debug or trace.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub transcript: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            transcript: false,
            log_dir: default_log_dir(),
        }
    }
}

/// A canned reply fired when `search` appears in channel traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteConfig {
    pub search: String,
    pub reply: String,
    #[serde(default = "default_quote_delay")]
    pub delay_secs: u64,
}

fn default_channel() -> String {
    "#SpaceGoatsChat".to_string()
}
fn default_nickname() -> String {
    "SpaceGoatsBot".to_string()
}
fn default_port() -> u16 {
    6667
}
fn default_true() -> bool {
    true
}
fn default_reconnect_delay() -> u64 {
    60
}
fn default_max_nick_attempts() -> u32 {
    5
}
fn default_max_line_len() -> usize {
    crate::irc::framer::MAX_LINE_LEN
}
fn default_keepalive() -> u64 {
    180
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_listen_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}
fn default_accept_timeout() -> u64 {
    120
}
fn default_version_string() -> String {
    concat!("quipbot ", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_level() -> String {
    "info".to_string()
}
fn default_log_dir() -> String {
    "~/.local/share/quipbot/logs".to_string()
}
fn default_quote_delay() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_stock_bot() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.servers, default_servers());
        assert_eq!(config.channel, "#SpaceGoatsChat");
        assert_eq!(config.identity.nickname, "SpaceGoatsBot");
        assert_eq!(config.connection.reconnect_delay_secs, 60);
        assert_eq!(config.connection.connect_timeout_secs, 30);
        assert_eq!(config.quotes.len(), 6);
        assert_eq!(config.quotes[3].delay_secs, 300);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config: AppConfig = toml::from_str(
            r##"
            channel = "#rust"

            [[servers]]
            host = "irc.libera.chat"

            [[servers]]
            host = "irc.oftc.net"
            port = 6668

            [identity]
            nickname = "quip"
            realname = "Quote Bot"

            [connection]
            max_nick_attempts = 2

            [[quotes]]
            search = "ping"
            reply = "pong"
            "##,
        )
        .unwrap();

        assert_eq!(config.servers[0].port, 6667);
        assert_eq!(config.servers[1].port, 6668);
        assert_eq!(config.identity.username(), "quip");
        assert_eq!(config.identity.realname(), "Quote Bot");
        assert_eq!(config.connection.max_nick_attempts, 2);
        assert_eq!(config.connection.reconnect_delay_secs, 60);
        assert_eq!(
            config.quotes,
            vec![QuoteConfig {
                search: "ping".into(),
                reply: "pong".into(),
                delay_secs: 60,
            }]
        );
        assert!(config.ctcp.reply_version);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.quotes, config.quotes);
        assert_eq!(back.dcc.listen_address, config.dcc.listen_address);
    }
}
