//! Process-wide configuration (C10).
//!
//! Loaded once at startup from built-in defaults, an optional TOML file, and
//! environment variable overrides (in increasing priority), then wrapped in
//! an `Arc` and handed by reference to every component that needs it —
//! mirroring the original's `Config::cfg` global without a literal global.

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Fixed width, in bytes, of a [`crate::model::Ticker`] symbol. `Ticker`
/// wraps a `[u8; TICKER_SIZE]`, so unlike the other three knobs in this
/// module this one is load-bearing on the type system and cannot itself
/// become a runtime value; [`VenueConfig::ticker_size`] exists so it is
/// still visible and validated as a configuration value per spec, and
/// [`VenueConfig::validate`] rejects any resolved config that disagrees
/// with it.
pub const TICKER_SIZE: usize = 8;

/// Process-wide immutable settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    /// Port the order-ingress stream listener binds.
    pub port_tcp_in: u16,
    /// Port the fill-egress stream listener binds.
    pub port_tcp_out: u16,
    /// Port the price-broadcast datagram socket binds and sends to.
    pub port_udp: u16,
    /// Microseconds between price-feed ticks.
    pub price_feed_rate_us: u64,
    /// The fixed set of tickers the venue trades, in universe order.
    pub ticker_universe: Vec<String>,
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or `"venue_engine=debug"`.
    pub log_level: String,
    /// Size of each framed endpoint's rotating read buffer, in bytes.
    pub buffer_size: usize,
    /// Upper bound on a single encoded message body, in bytes.
    pub max_serialized_message_size: usize,
    /// Maximum number of distinct price levels per side, per book.
    pub order_book_limit: usize,
    /// Fixed width, in bytes, of a ticker symbol. Must equal [`TICKER_SIZE`];
    /// present so the value is a visible, validated configuration entry
    /// rather than a silent compile-time constant.
    pub ticker_size: usize,
}

impl Default for VenueConfig {
    fn default() -> Self {
        VenueConfig {
            port_tcp_in: 7000,
            port_tcp_out: 7001,
            port_udp: 7002,
            price_feed_rate_us: 500_000,
            ticker_universe: vec![
                "AAAA".to_string(),
                "BBBB".to_string(),
                "CCCC".to_string(),
            ],
            log_level: "info".to_string(),
            buffer_size: 64 * 1024,
            max_serialized_message_size: 1024,
            order_book_limit: 4096,
            ticker_size: TICKER_SIZE,
        }
    }
}

impl VenueConfig {
    /// Load defaults, optionally overlaid by a TOML file, then by environment
    /// variables prefixed `VENUE_` (e.g. `VENUE_PORT_TCP_IN=9000`).
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a given file path cannot be read or parsed,
    /// or if the resolved configuration has an empty ticker universe.
    pub fn load(file_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match file_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                toml::from_str(&text).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            None => VenueConfig::default(),
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VENUE_PORT_TCP_IN") {
            if let Ok(p) = v.parse() {
                self.port_tcp_in = p;
            }
        }
        if let Ok(v) = std::env::var("VENUE_PORT_TCP_OUT") {
            if let Ok(p) = v.parse() {
                self.port_tcp_out = p;
            }
        }
        if let Ok(v) = std::env::var("VENUE_PORT_UDP") {
            if let Ok(p) = v.parse() {
                self.port_udp = p;
            }
        }
        if let Ok(v) = std::env::var("VENUE_PRICE_FEED_RATE_US") {
            if let Ok(p) = v.parse() {
                self.price_feed_rate_us = p;
            }
        }
        if let Ok(v) = std::env::var("VENUE_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("VENUE_BUFFER_SIZE") {
            if let Ok(p) = v.parse() {
                self.buffer_size = p;
            }
        }
        if let Ok(v) = std::env::var("VENUE_MAX_SERIALIZED_MESSAGE_SIZE") {
            if let Ok(p) = v.parse() {
                self.max_serialized_message_size = p;
            }
        }
        if let Ok(v) = std::env::var("VENUE_ORDER_BOOK_LIMIT") {
            if let Ok(p) = v.parse() {
                self.order_book_limit = p;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker_universe.is_empty() {
            return Err(ConfigError::EmptyTickerUniverse);
        }
        if self.ticker_size != TICKER_SIZE {
            return Err(ConfigError::InvalidTickerSize {
                expected: TICKER_SIZE,
                got: self.ticker_size,
            });
        }
        if self.order_book_limit == 0 {
            return Err(ConfigError::ZeroOrderBookLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = VenueConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_ticker_universe_is_rejected() {
        let cfg = VenueConfig {
            ticker_universe: vec![],
            ..VenueConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EmptyTickerUniverse)
        ));
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("venue.toml");
        std::fs::write(
            &path,
            r#"
            port_tcp_in = 9000
            port_tcp_out = 9001
            port_udp = 9002
            price_feed_rate_us = 1000
            ticker_universe = ["AAAA", "BBBB"]
            log_level = "debug"
            "#,
        )
        .unwrap();

        let cfg = VenueConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.port_tcp_in, 9000);
        assert_eq!(cfg.ticker_universe, vec!["AAAA", "BBBB"]);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = VenueConfig::load(Some(Path::new("/nonexistent/venue.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn mismatched_ticker_size_is_rejected() {
        let cfg = VenueConfig {
            ticker_size: TICKER_SIZE + 1,
            ..VenueConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTickerSize { .. })
        ));
    }

    #[test]
    fn zero_order_book_limit_is_rejected() {
        let cfg = VenueConfig {
            order_book_limit: 0,
            ..VenueConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroOrderBookLimit)));
    }
}
