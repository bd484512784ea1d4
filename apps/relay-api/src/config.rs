use std::str::FromStr;
use std::time::Duration;

/// Relay configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Slots in each session's outbound queue.
    pub queue_capacity: usize,
    /// How long a fan-out waits on one full queue before dropping the message.
    pub delivery_timeout: Duration,
    /// Consecutive malformed messages tolerated before a session is closed.
    /// `None` tolerates any number.
    pub max_malformed: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            queue_capacity: 64,
            delivery_timeout: Duration::from_millis(250),
            max_malformed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            queue_capacity: parsed::<usize>(&lookup, "RELAY_QUEUE_CAPACITY")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.queue_capacity),
            delivery_timeout: parsed(&lookup, "RELAY_DELIVERY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.delivery_timeout),
            max_malformed: parsed::<u32>(&lookup, "RELAY_MAX_MALFORMED").filter(|&n| n > 0),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}
