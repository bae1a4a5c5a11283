//! Diagnostics and chat transcripts.
//!
//! Diagnostics go through `tracing`; [`init_tracing`] installs the fmt
//! subscriber at the configured level (`RUST_LOG` wins when set).
//!
//! When enabled, [`Transcript`] writes chat lines to daily log files named
//! `<target>_<date>.log` in the configured log directory (default:
//! `~/.local/share/quipbot/logs/`).

use crate::config::LoggingConfig;
use chrono::Local;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Writes chat lines to per-channel/per-nick daily log files.
///
/// File handles are cached for the lifetime of the transcript. A file that
/// cannot be opened is reported once and then skipped.
pub struct Transcript {
    enabled: bool,
    log_dir: PathBuf,
    file_handles: HashMap<String, Option<fs::File>>,
}

impl Transcript {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.transcript,
            log_dir: expand_home(&config.log_dir),
            file_handles: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            log_dir: PathBuf::new(),
            file_handles: HashMap::new(),
        }
    }

    /// Record `<sender> text` in `target`'s log. No-op when disabled.
    pub fn log_message(&mut self, target: &str, sender: &str, text: &str) {
        if !self.enabled {
            return;
        }

        let now = Local::now();
        let line = format!("[{}] <{}> {}", now.format("%H:%M:%S"), sender, text);
        let filename = format!("{}_{}.log", safe_target(target), now.format("%Y-%m-%d"));

        let log_dir = &self.log_dir;
        let handle = self.file_handles.entry(filename).or_insert_with_key(|filename| {
            let path = log_dir.join(filename);
            let opened = fs::create_dir_all(log_dir)
                .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));
            match opened {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot open transcript file");
                    None
                }
            }
        });

        if let Some(file) = handle {
            if let Err(e) = writeln!(file, "{}", line) {
                warn!(error = %e, "failed to write transcript line");
            }
        }
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix('~') {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(dir),
        },
        None => PathBuf::from(dir),
    }
}

fn safe_target(target: &str) -> String {
    target
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
