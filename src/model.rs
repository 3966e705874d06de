//! Wire entities shared by the server and trader client.
//!
//! Every type here derives `serde::Serialize`/`Deserialize` so either codec
//! backend in [`crate::codec`] can encode it without per-type glue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fixed-width ticker symbol, padded with ASCII spaces to [`TICKER_SIZE`](crate::config::TICKER_SIZE) bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(pub [u8; crate::config::TICKER_SIZE]);

impl Ticker {
    /// Build a ticker from a symbol, padding with spaces or truncating to fit.
    pub fn new(symbol: &str) -> Self {
        let mut bytes = [b' '; crate::config::TICKER_SIZE];
        for (slot, b) in bytes.iter_mut().zip(symbol.as_bytes()) {
            *slot = *b;
        }
        Ticker(bytes)
    }

    /// The symbol with trailing padding trimmed.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().rposition(|b| *b != b' ').map_or(0, |i| i + 1);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one live trader session, derived once from the remote address.
pub type TraderId = u32;

/// Monotonic nanosecond-timestamp order identifier, assigned at creation.
pub type OrderId = u32;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

/// Whether a fill fully or partially consumed the resting order's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Partial,
    Full,
}

/// An inbound order. Orders are values; once filed into a book they are
/// owned by it until fully filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub trader_id: TraderId,
    pub order_id: OrderId,
    pub ticker: Ticker,
    pub quantity: u32,
    pub price: u32,
    pub action: Action,
}

impl Order {
    /// Assign a fresh, monotonic `order_id` from the current nanosecond clock.
    pub fn next_order_id() -> OrderId {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as u32
    }
}

/// A partial or complete execution of an order, reported back to its trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: OrderId,
    pub trader_id: TraderId,
    pub ticker: Ticker,
    pub action: Action,
    pub fill_price: u32,
    pub fill_quantity: u32,
    pub state: OrderState,
}

/// A synthetic price tick for one ticker, broadcast over the datagram feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerPrice {
    pub ticker: Ticker,
    pub price: u32,
}

/// Any message that can cross the wire, used by the codec's `decode<T>` bound
/// and by the framed endpoint to tell broadcast ticks (no trader context)
/// apart from session-scoped messages.
pub trait WireMessage: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {}

impl WireMessage for Order {}
impl WireMessage for OrderStatus {}
impl WireMessage for TickerPrice {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_pads_and_trims() {
        let t = Ticker::new("AAAA");
        assert_eq!(t.as_str(), "AAAA");
        assert_eq!(t.0.len(), crate::config::TICKER_SIZE);
        assert_eq!(t.0[4], b' ');
    }

    #[test]
    fn ticker_truncates_overlong_symbols() {
        let t = Ticker::new("TOOLONGTICKER");
        assert_eq!(t.as_str().len(), crate::config::TICKER_SIZE);
    }

    #[test]
    fn order_ids_are_monotonic() {
        let a = Order::next_order_id();
        let b = Order::next_order_id();
        assert!(b >= a);
    }
}
