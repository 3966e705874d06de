//! Match dispatcher: groups fills by trader and forwards each trader's
//! subspan to their egress session in one pass (C6).

use tracing::warn;

use crate::model::OrderStatus;
use crate::session::SessionRegistry;

/// Stably sort `fills` by `trader_id`, then hand each trader's contiguous
/// subspan to their registered egress channel. A trader with no open
/// session has their fills logged and dropped — there is nowhere to send
/// them.
///
/// "Front subspan" batching: rather than grouping into a map, repeatedly
/// take the longest prefix sharing a `trader_id`, forward it, and continue
/// with the remainder. Ordering within a trader's subspan is preserved by
/// the stable sort and reflects match order.
pub fn dispatch(mut fills: Vec<OrderStatus>, registry: &SessionRegistry) {
    fills.sort_by_key(|f| f.trader_id);

    let mut remaining = &fills[..];
    while let Some(first) = remaining.first() {
        let trader_id = first.trader_id;
        let split = remaining
            .iter()
            .position(|f| f.trader_id != trader_id)
            .unwrap_or(remaining.len());
        let (subspan, rest) = remaining.split_at(split);
        remaining = rest;

        match registry.sender_for(trader_id) {
            Some(sender) => {
                for status in subspan {
                    if sender.try_send(*status).is_err() {
                        warn!(trader_id, "egress channel full or closed, dropping fill");
                        break;
                    }
                }
            }
            None => {
                warn!(trader_id, fills = subspan.len(), "trader offline, dropping fills");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, OrderState, Ticker};

    fn status(order_id: u32, trader_id: u32) -> OrderStatus {
        OrderStatus {
            order_id,
            trader_id,
            ticker: Ticker::new("AAAA"),
            action: Action::Buy,
            fill_price: 100,
            fill_quantity: 1,
            state: OrderState::Full,
        }
    }

    #[tokio::test]
    async fn groups_fills_by_trader_and_preserves_order_within_subspan() {
        let registry = SessionRegistry::new();
        let (tx_a, mut rx_a) = tokio::sync::mpsc::channel(8);
        let (tx_b, mut rx_b) = tokio::sync::mpsc::channel(8);
        registry.register(1, tx_a);
        registry.register(2, tx_b);

        let fills = vec![status(10, 2), status(11, 1), status(12, 1), status(13, 2)];
        dispatch(fills, &registry);

        let a1 = rx_a.recv().await.unwrap();
        let a2 = rx_a.recv().await.unwrap();
        assert_eq!((a1.order_id, a2.order_id), (11, 12));

        let b1 = rx_b.recv().await.unwrap();
        let b2 = rx_b.recv().await.unwrap();
        assert_eq!((b1.order_id, b2.order_id), (10, 13));
    }

    #[test]
    fn offline_trader_fills_are_dropped_without_panic() {
        let registry = SessionRegistry::new();
        dispatch(vec![status(1, 99)], &registry);
    }
}
