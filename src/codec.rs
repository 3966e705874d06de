//! Pluggable wire codec (C9).
//!
//! The framing layer (C1) treats serialization as opaque: `encode(msg) →
//! bytes`, `decode<T>(bytes) → T | DecodeError`. Two implementations are
//! provided, following the same pattern as the order-book crate's
//! `EventSerializer` trait (`JsonEventSerializer` always on,
//! `BincodeEventSerializer` behind a feature flag) — `decode` never reads
//! past the supplied slice, and round-trip is lossless for every
//! [`crate::model::WireMessage`].

use crate::error::FramingError;
use crate::model::WireMessage;

/// Encodes and decodes wire messages. Implementations must guarantee that
/// `decode` never reads past the supplied byte slice and that `encode` is
/// self-describing enough for `decode::<T>` to validate the result.
pub trait Codec: Send + Sync + 'static {
    /// Serialize `msg` into a fresh byte buffer.
    fn encode<T: WireMessage>(&self, msg: &T) -> Result<Vec<u8>, FramingError>;

    /// Deserialize a `T` from `bytes`, failing if the bytes are malformed or
    /// incomplete.
    fn decode<T: WireMessage>(&self, bytes: &[u8]) -> Result<T, FramingError>;
}

/// JSON codec built on `serde_json`. Always available; human-readable,
/// convenient for debugging the trader client against the venue.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: WireMessage>(&self, msg: &T) -> Result<Vec<u8>, FramingError> {
        serde_json::to_vec(msg).map_err(|e| FramingError::Decode {
            message: e.to_string(),
        })
    }

    fn decode<T: WireMessage>(&self, bytes: &[u8]) -> Result<T, FramingError> {
        serde_json::from_slice(bytes).map_err(|e| FramingError::Decode {
            message: e.to_string(),
        })
    }
}

/// Compact binary codec built on `bincode`, enabled by the `bincode` feature.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

#[cfg(feature = "bincode")]
impl Codec for BincodeCodec {
    fn encode<T: WireMessage>(&self, msg: &T) -> Result<Vec<u8>, FramingError> {
        bincode::serde::encode_to_vec(msg, bincode::config::standard()).map_err(|e| {
            FramingError::Decode {
                message: e.to_string(),
            }
        })
    }

    fn decode<T: WireMessage>(&self, bytes: &[u8]) -> Result<T, FramingError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(value, _)| value)
            .map_err(|e| FramingError::Decode {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Order, OrderStatus, Ticker, TickerPrice};

    fn sample_order() -> Order {
        Order {
            trader_id: 42,
            order_id: 7,
            ticker: Ticker::new("AAAA"),
            quantity: 10,
            price: 100,
            action: Action::Buy,
        }
    }

    #[test]
    fn json_round_trips_order() {
        let codec = JsonCodec;
        let order = sample_order();
        let bytes = codec.encode(&order).unwrap();
        let decoded: Order = codec.decode(&bytes).unwrap();
        assert_eq!(order, decoded);
    }

    #[test]
    fn json_round_trips_order_status_and_ticker_price() {
        let codec = JsonCodec;
        let status = OrderStatus {
            order_id: 1,
            trader_id: 2,
            ticker: Ticker::new("BBBB"),
            action: Action::Sell,
            fill_price: 50,
            fill_quantity: 3,
            state: crate::model::OrderState::Full,
        };
        let bytes = codec.encode(&status).unwrap();
        let decoded: OrderStatus = codec.decode(&bytes).unwrap();
        assert_eq!(status, decoded);

        let tick = TickerPrice {
            ticker: Ticker::new("CCCC"),
            price: 123,
        };
        let bytes = codec.encode(&tick).unwrap();
        let decoded: TickerPrice = codec.decode(&bytes).unwrap();
        assert_eq!(tick, decoded);
    }

    #[test]
    fn decode_error_on_garbage() {
        let codec = JsonCodec;
        let err = codec.decode::<Order>(b"not json").unwrap_err();
        assert!(matches!(err, FramingError::Decode { .. }));
    }

    #[cfg(feature = "bincode")]
    #[test]
    fn bincode_round_trips_order() {
        let codec = BincodeCodec;
        let order = sample_order();
        let bytes = codec.encode(&order).unwrap();
        let decoded: Order = codec.decode(&bytes).unwrap();
        assert_eq!(order, decoded);
    }
}
