//! Per-ticker order book: price-level ladders, add, match (C5).
//!
//! Each side is a `SkipMap<price, Mutex<VecDeque<Order>>>`, the same
//! concurrent ordered map the teacher crate uses for its own price ladders
//! (`orderbook::book::OrderBook::bids`/`asks`). Best price is the last entry
//! for bids (highest key) and the first entry for asks (lowest key) via
//! `.iter().next_back()` / `.iter().next()`, exactly as the teacher reads
//! its own ladders. Within a level, `match()` pops from the tail (§9 Q1:
//! the original's `pop_back()`, newest-first, rather than classic FIFO
//! price-time priority). The per-level `Mutex` is a safety net, not the
//! primary concurrency control — the book's busy flag is what the router
//! relies on to serialize `add`/`match` calls.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam_skiplist::SkipMap;

use crate::error::OrderBookError;
use crate::model::{Action, Order, OrderId, OrderState, OrderStatus, Ticker};

type Ladder = SkipMap<u32, Mutex<VecDeque<Order>>>;

/// One instrument's resting orders, guarded by an explicit try-lock busy
/// flag rather than relying solely on a single coarse lock for the access
/// discipline the spec describes: the router acquires once per batch,
/// performs `add` then `match`, and releases — contention is a defensive
/// backstop, not the expected path.
pub struct OrderBook {
    ticker: Ticker,
    order_book_limit: usize,
    busy: AtomicBool,
    bids: Ladder,
    asks: Ladder,
    last_added: Mutex<HashSet<OrderId>>,
}

/// RAII guard returned by [`OrderBook::try_acquire`]; releases the busy flag
/// on drop so a panicking handler can't leave the book permanently locked.
pub struct BookGuard<'a> {
    book: &'a OrderBook,
}

impl Drop for BookGuard<'_> {
    fn drop(&mut self) {
        self.book.busy.store(false, Ordering::Release);
    }
}

impl OrderBook {
    /// Build an empty book. `order_book_limit` (§6 config) bounds the number
    /// of distinct price levels per side (I3).
    pub fn new(ticker: Ticker, order_book_limit: usize) -> Self {
        OrderBook {
            ticker,
            order_book_limit,
            busy: AtomicBool::new(false),
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            last_added: Mutex::new(HashSet::new()),
        }
    }

    pub fn ticker(&self) -> Ticker {
        self.ticker
    }

    fn side(&self, action: Action) -> &Ladder {
        match action {
            Action::Buy => &self.bids,
            Action::Sell => &self.asks,
        }
    }

    /// Attempt to acquire the book's busy flag. `None` means another task
    /// already holds it — under the router's "one task per book per batch"
    /// invariant this should not happen; a caller that sees it should treat
    /// it as a signal to requeue rather than spin (§5).
    pub fn try_acquire(&self) -> Option<BookGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BookGuard { book: self })
    }

    /// File each order into its price level (I1–I3). Rejects (and drops,
    /// logging at the call site) an order that would open a new level
    /// beyond this book's `order_book_limit` on its side.
    pub fn add(&self, _guard: &BookGuard<'_>, orders: &[Order]) -> Vec<(Order, OrderBookError)> {
        let mut rejected = Vec::new();
        for &order in orders {
            let ladder = self.side(order.action);
            let is_new_level = ladder.get(&order.price).is_none();
            if is_new_level && ladder.len() >= self.order_book_limit {
                rejected.push((
                    order,
                    OrderBookError::CapacityExceeded {
                        levels: ladder.len(),
                        limit: self.order_book_limit,
                    },
                ));
                continue;
            }
            if is_new_level {
                ladder.insert(order.price, Mutex::new(VecDeque::with_capacity(1)));
            }
            let entry = ladder.get(&order.price).expect("level just inserted or pre-existing");
            entry.value().lock().expect("price level mutex poisoned").push_back(order);
            self.last_added.lock().expect("last_added mutex poisoned").insert(order.order_id);
        }
        rejected
    }

    /// Run the cross loop until no more price levels overlap, emitting a
    /// fill per side per trade for orders present in this cycle's
    /// `LastAddedSet` (§9 Q3: per-trade, not per-cycle), then clear the set.
    pub fn match_orders(&self, _guard: &BookGuard<'_>) -> Vec<OrderStatus> {
        let mut fills = Vec::new();

        loop {
            let best_bid_price = match self.bids.iter().next_back().map(|e| *e.key()) {
                Some(p) => p,
                None => break,
            };
            let best_ask_price = match self.asks.iter().next().map(|e| *e.key()) {
                Some(p) => p,
                None => break,
            };
            if best_bid_price < best_ask_price {
                break;
            }
            let fill_price = best_ask_price;

            let bid_entry = self.bids.get(&best_bid_price).expect("best bid level present");
            let ask_entry = self.asks.get(&best_ask_price).expect("best ask level present");
            let mut bid_level = bid_entry.value().lock().expect("bid level mutex poisoned");
            let mut ask_level = ask_entry.value().lock().expect("ask level mutex poisoned");

            let (bid_done, ask_done) = {
                let bid = bid_level.back_mut().expect("non-empty bid level");
                let ask = ask_level.back_mut().expect("non-empty ask level");

                let q = bid.quantity.min(ask.quantity);
                bid.quantity -= q;
                ask.quantity -= q;

                let bid_done = bid.quantity == 0;
                let ask_done = ask.quantity == 0;

                let last_added = self.last_added.lock().expect("last_added mutex poisoned");
                if last_added.contains(&bid.order_id) {
                    fills.push(OrderStatus {
                        order_id: bid.order_id,
                        trader_id: bid.trader_id,
                        ticker: bid.ticker,
                        action: bid.action,
                        fill_price,
                        fill_quantity: q,
                        state: if bid_done { OrderState::Full } else { OrderState::Partial },
                    });
                }
                if last_added.contains(&ask.order_id) {
                    fills.push(OrderStatus {
                        order_id: ask.order_id,
                        trader_id: ask.trader_id,
                        ticker: ask.ticker,
                        action: ask.action,
                        fill_price,
                        fill_quantity: q,
                        state: if ask_done { OrderState::Full } else { OrderState::Partial },
                    });
                }
                (bid_done, ask_done)
            };

            if bid_done {
                bid_level.pop_back();
            }
            if ask_done {
                ask_level.pop_back();
            }
            let bid_empty = bid_level.is_empty();
            let ask_empty = ask_level.is_empty();
            drop(bid_level);
            drop(ask_level);

            if bid_empty {
                self.bids.remove(&best_bid_price);
            }
            if ask_empty {
                self.asks.remove(&best_ask_price);
            }
        }

        self.last_added.lock().expect("last_added mutex poisoned").clear();
        fills
    }

    /// Number of open price levels on each side; test/introspection only.
    pub fn level_counts(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }
}
