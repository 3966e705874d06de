//! Order router: buckets an inbound batch by ticker and drives each book
//! through `add` then `match` (C4).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::book::OrderBook;
use crate::model::{Order, OrderStatus, Ticker};

/// Owns one [`OrderBook`] per ticker in the universe, fixed at construction.
pub struct OrderRouter {
    books: HashMap<Ticker, Arc<OrderBook>>,
}

impl OrderRouter {
    /// Build one book per ticker in `universe`, in the given order, each
    /// bounded by `order_book_limit` price levels per side (§6 config).
    pub fn new(universe: &[Ticker], order_book_limit: usize) -> Self {
        let books = universe
            .iter()
            .map(|&ticker| (ticker, Arc::new(OrderBook::new(ticker, order_book_limit))))
            .collect();
        OrderRouter { books }
    }

    pub fn book(&self, ticker: &Ticker) -> Option<&Arc<OrderBook>> {
        self.books.get(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.books.keys()
    }

    /// Bucket `orders` by ticker, run `add` + `match` on each affected book,
    /// and concatenate the resulting fills. Orders for a ticker outside the
    /// universe are dropped with a warning (§7 "unknown ticker").
    pub fn route_batch(&self, orders: Vec<Order>) -> Vec<OrderStatus> {
        let mut buckets: HashMap<Ticker, Vec<Order>> = HashMap::new();
        for order in orders {
            buckets.entry(order.ticker).or_default().push(order);
        }

        let mut fills = Vec::new();
        for (ticker, bucket) in buckets {
            let Some(book) = self.books.get(&ticker) else {
                warn!(ticker = %ticker, "order for unknown ticker dropped");
                continue;
            };

            let Some(guard) = book.try_acquire() else {
                warn!(ticker = %ticker, "book busy on its own router cycle, dropping batch");
                continue;
            };

            let rejected = book.add(&guard, &bucket);
            for (order, err) in &rejected {
                warn!(order_id = order.order_id, error = %err, "order rejected");
            }
            let batch_fills = book.match_orders(&guard);
            trace!(ticker = %ticker, fills = batch_fills.len(), "book matched");
            fills.extend(batch_fills);
        }

        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Action;

    fn order(id: u32, ticker: &str, action: Action, qty: u32, price: u32) -> Order {
        Order {
            trader_id: 1,
            order_id: id,
            ticker: Ticker::new(ticker),
            quantity: qty,
            price,
            action,
        }
    }

    #[test]
    fn routes_orders_to_the_matching_ticker_book() {
        let universe = vec![Ticker::new("AAAA"), Ticker::new("BBBB")];
        let router = OrderRouter::new(&universe, 4096);

        let fills = router.route_batch(vec![
            order(1, "AAAA", Action::Buy, 10, 100),
            order(2, "AAAA", Action::Sell, 10, 90),
            order(3, "BBBB", Action::Buy, 5, 50),
        ]);

        assert_eq!(fills.len(), 2);
        assert!(fills.iter().all(|f| f.ticker == Ticker::new("AAAA")));
    }

    #[test]
    fn unknown_ticker_is_dropped_without_panicking() {
        let universe = vec![Ticker::new("AAAA")];
        let router = OrderRouter::new(&universe, 4096);

        let fills = router.route_batch(vec![order(1, "ZZZZ", Action::Buy, 1, 1)]);
        assert!(fills.is_empty());
    }
}
