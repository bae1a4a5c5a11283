use crate::config::QuoteConfig;
use std::time::{Duration, Instant};

/// A canned reply with its own cooldown.
#[derive(Debug, Clone)]
pub struct Quote {
    search: String,
    reply: String,
    delay: Duration,
    last_fired: Option<Instant>,
}

impl Quote {
    pub fn new(search: &str, reply: &str, delay: Duration) -> Self {
        Self {
            search: search.to_string(),
            reply: reply.to_string(),
            delay,
            last_fired: None,
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn matches(&self, text: &str) -> bool {
        !self.search.is_empty() && text.contains(&self.search)
    }

    /// A quote that never fired is always ready; afterwards strictly more
    /// than `delay` must have passed.
    pub fn enough_time_passed(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.delay,
        }
    }

    /// Return the reply if `text` triggers this quote and the cooldown has
    /// elapsed, starting a new cooldown.
    pub fn fire(&mut self, text: &str, now: Instant) -> Option<&str> {
        if !self.matches(text) || !self.enough_time_passed(now) {
            return None;
        }
        self.last_fired = Some(now);
        Some(&self.reply)
    }
}

impl From<&QuoteConfig> for Quote {
    fn from(config: &QuoteConfig) -> Self {
        Quote::new(
            &config.search,
            &config.reply,
            Duration::from_secs(config.delay_secs),
        )
    }
}
