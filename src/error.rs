//! Error taxonomy (C12).
//!
//! One `#[non_exhaustive]` enum per subsystem, each with a hand-written
//! `Display` and `impl std::error::Error`, following the convention already
//! established by the order-book crate this was built from
//! (`OrderBookError`, `JournalError`) rather than a `thiserror` derive.

use std::fmt;
use std::path::PathBuf;

/// Errors from the framed async endpoint (C1).
#[derive(Debug)]
#[non_exhaustive]
pub enum FramingError {
    /// The decoder could not make sense of a frame's body.
    Decode {
        /// Underlying codec error message.
        message: String,
    },
    /// A caller tried to write a message whose encoded body exceeds
    /// `MAX_SERIALIZED_MESSAGE_SIZE`.
    MessageTooLarge {
        /// The encoded size that was rejected.
        encoded_len: usize,
        /// The configured limit.
        limit: usize,
    },
    /// The underlying socket returned a non-EOF I/O error.
    Io {
        /// Underlying I/O error message.
        message: String,
    },
    /// The peer closed the connection cleanly.
    Closed,
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::Decode { message } => write!(f, "frame decode error: {message}"),
            FramingError::MessageTooLarge { encoded_len, limit } => write!(
                f,
                "encoded message of {encoded_len} bytes exceeds the {limit}-byte limit"
            ),
            FramingError::Io { message } => write!(f, "transport I/O error: {message}"),
            FramingError::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for FramingError {}

/// Errors from the order book (C5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OrderBookError {
    /// The side already holds `ORDER_BOOK_LIMIT` price levels.
    CapacityExceeded {
        /// Number of price levels currently on the rejecting side.
        levels: usize,
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::CapacityExceeded { levels, limit } => write!(
                f,
                "order book at capacity: {levels} price levels already open (limit {limit})"
            ),
        }
    }
}

impl std::error::Error for OrderBookError {}

/// Errors from loading [`crate::config::VenueConfig`] (C10).
#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// The config file's contents were not valid TOML for `VenueConfig`.
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error message.
        message: String,
    },
    /// The resolved configuration names no tickers.
    EmptyTickerUniverse,
    /// `ticker_size` disagrees with the compile-time-fixed `TICKER_SIZE`.
    InvalidTickerSize {
        /// The compiled-in ticker byte width.
        expected: usize,
        /// The value found in the resolved configuration.
        got: usize,
    },
    /// `order_book_limit` of 0 would reject every order outright.
    ZeroOrderBookLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "failed to read config {}: {message}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "failed to parse config {}: {message}", path.display())
            }
            ConfigError::EmptyTickerUniverse => {
                write!(f, "config defines an empty ticker universe")
            }
            ConfigError::InvalidTickerSize { expected, got } => write!(
                f,
                "ticker_size {got} does not match the compiled-in width of {expected}"
            ),
            ConfigError::ZeroOrderBookLimit => {
                write!(f, "order_book_limit of 0 would reject every order")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level error returned from the server bootstrap (C13).
#[derive(Debug)]
#[non_exhaustive]
pub enum VenueError {
    /// Configuration could not be loaded.
    Config(ConfigError),
    /// A listener or socket could not be bound.
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error message.
        message: String,
    },
}

impl fmt::Display for VenueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueError::Config(err) => write!(f, "configuration error: {err}"),
            VenueError::Bind { addr, message } => {
                write!(f, "failed to bind {addr}: {message}")
            }
        }
    }
}

impl std::error::Error for VenueError {}

impl From<ConfigError> for VenueError {
    fn from(err: ConfigError) -> Self {
        VenueError::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_formats_with_counts() {
        let err = OrderBookError::CapacityExceeded {
            levels: 5,
            limit: 4,
        };
        let text = err.to_string();
        assert!(text.contains('5'));
        assert!(text.contains('4'));
    }

    #[test]
    fn venue_error_wraps_config_error() {
        let err: VenueError = ConfigError::EmptyTickerUniverse.into();
        assert!(matches!(err, VenueError::Config(ConfigError::EmptyTickerUniverse)));
    }
}
