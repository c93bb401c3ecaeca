//! Session configuration.
//!
//! A [`Config`] is fixed for the lifetime of every session created from it.
//! Build one with [`ConfigBuilder`]; invalid combinations are rejected at
//! build time rather than discovered mid-stream.

use std::time::Duration;

use super::constants::{
    DEFAULT_MAX_PAYLOAD, DEFAULT_RETRANSMIT_TIMEOUT, DEFAULT_TIMER_INTERVAL, DEFAULT_WINDOW,
    MAX_PAYLOAD_CAPACITY, MAX_WINDOW,
};
use super::error::ConfigError;

/// Protocol configuration shared by every session of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of outstanding Data segments (W), at most
    /// [`MAX_WINDOW`].
    pub window: usize,

    /// Fixed retransmission timeout. No backoff is applied.
    pub retransmit_timeout: Duration,

    /// Interval at which the driver delivers timer ticks.
    pub timer_interval: Duration,

    /// Maximum payload bytes per Data segment.
    pub max_payload: usize,

    /// Retransmissions allowed per segment before the session is aborted.
    /// `None` retries forever.
    pub max_retransmits: Option<u32>,

    /// How long a closed session keeps answering retransmitted
    /// end-of-stream segments before it is reaped.
    pub close_linger: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            retransmit_timeout: DEFAULT_RETRANSMIT_TIMEOUT,
            timer_interval: DEFAULT_TIMER_INTERVAL,
            max_payload: DEFAULT_MAX_PAYLOAD,
            max_retransmits: None,
            close_linger: DEFAULT_RETRANSMIT_TIMEOUT * 2,
        }
    }
}

impl Config {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Check every field against the protocol limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.window > MAX_WINDOW {
            return Err(ConfigError::WindowTooLarge {
                window: self.window,
                max: MAX_WINDOW,
            });
        }
        if self.retransmit_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.timer_interval.is_zero() {
            return Err(ConfigError::ZeroTimerInterval);
        }
        if self.timer_interval > self.retransmit_timeout {
            return Err(ConfigError::TimerSlowerThanTimeout {
                timer_ms: self.timer_interval.as_millis(),
                timeout_ms: self.retransmit_timeout.as_millis(),
            });
        }
        if self.max_payload == 0 || self.max_payload > MAX_PAYLOAD_CAPACITY {
            return Err(ConfigError::PayloadOutOfRange {
                len: self.max_payload,
                max: MAX_PAYLOAD_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
    linger_set: bool,
}

impl ConfigBuilder {
    /// Create a builder holding the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            linger_set: false,
        }
    }

    /// Set the window size.
    pub fn window(mut self, window: usize) -> Self {
        self.config.window = window;
        self
    }

    /// Set the retransmission timeout.
    ///
    /// Unless set explicitly, the close linger follows at twice this value.
    pub fn retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.config.retransmit_timeout = timeout;
        self
    }

    /// Set the timer tick interval.
    pub fn timer_interval(mut self, interval: Duration) -> Self {
        self.config.timer_interval = interval;
        self
    }

    /// Set the maximum payload per segment.
    pub fn max_payload(mut self, len: usize) -> Self {
        self.config.max_payload = len;
        self
    }

    /// Bound retransmissions per segment.
    pub fn max_retransmits(mut self, limit: Option<u32>) -> Self {
        self.config.max_retransmits = limit;
        self
    }

    /// Set the close linger.
    pub fn close_linger(mut self, linger: Duration) -> Self {
        self.config.close_linger = linger;
        self.linger_set = true;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(mut self) -> Result<Config, ConfigError> {
        if !self.linger_set {
            self.config.close_linger = self.config.retransmit_timeout * 2;
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
