//! Price-feed scheduler: timer-driven synthetic price updates broadcast
//! over the datagram endpoint (C7).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use rand::Rng;
use tokio::time::{self, Duration};
use tracing::debug;

use crate::codec::Codec;
use crate::framing::FramedEndpoint;
use crate::model::{Ticker, TickerPrice};

/// Upper (exclusive) bound of the synthetic price draw.
const PRICE_CEILING: u32 = 900;

/// Tickers advanced per tick.
const TICKERS_PER_TICK: usize = 5;

/// Single-writer (the feed's own tick handler), many-reader view onto each
/// ticker's current price. `AtomicCell<u32>` gives torn-free reads without a
/// lock, matching the "word-sized write, possibly-stale-but-never-torn
/// read" discipline in §5.
pub struct PricesView {
    prices: HashMap<Ticker, AtomicCell<u32>>,
}

impl PricesView {
    pub fn new(universe: &[Ticker]) -> Arc<Self> {
        let prices = universe.iter().map(|&t| (t, AtomicCell::new(0))).collect();
        Arc::new(PricesView { prices })
    }

    pub fn get(&self, ticker: &Ticker) -> Option<u32> {
        self.prices.get(ticker).map(|cell| cell.load())
    }

    fn set(&self, ticker: &Ticker, price: u32) {
        if let Some(cell) = self.prices.get(ticker) {
            cell.store(price);
        }
    }
}

/// Timer-driven generator of [`TickerPrice`] updates. `enabled` is a plain
/// atomic gate checked each tick rather than a literal timer
/// cancel/re-arm — the interval keeps firing; a disabled tick is a no-op,
/// which is the re-expression of "cancellation completes as a no-op" for an
/// async runtime that doesn't expose cancellable timer handles directly.
pub struct PriceFeed {
    universe: Vec<Ticker>,
    prices: Arc<PricesView>,
    enabled: Arc<AtomicBool>,
    cursor: AtomicUsize,
}

impl PriceFeed {
    pub fn new(universe: Vec<Ticker>, prices: Arc<PricesView>) -> Self {
        PriceFeed {
            universe,
            prices,
            enabled: Arc::new(AtomicBool::new(false)),
            cursor: AtomicUsize::new(0),
        }
    }

    /// A cheap handle the control plane can use to toggle the feed without
    /// touching the running loop directly.
    pub fn handle(&self) -> PriceFeedHandle {
        PriceFeedHandle {
            enabled: self.enabled.clone(),
        }
    }

    /// Advance the cursor by up to [`TICKERS_PER_TICK`] tickers, drawing a
    /// fresh `[0, PRICE_CEILING)` price for each and updating [`PricesView`].
    fn advance(&self, rng: &mut impl Rng) -> Vec<TickerPrice> {
        if self.universe.is_empty() {
            return Vec::new();
        }
        let mut batch = Vec::with_capacity(TICKERS_PER_TICK);
        let start = self.cursor.load(Ordering::Relaxed);
        for step in 0..TICKERS_PER_TICK.min(self.universe.len()) {
            let idx = (start + step) % self.universe.len();
            let ticker = self.universe[idx];
            let price = rng.gen_range(0..PRICE_CEILING);
            self.prices.set(&ticker, price);
            batch.push(TickerPrice { ticker, price });
        }
        let next = (start + TICKERS_PER_TICK) % self.universe.len();
        self.cursor.store(next, Ordering::Relaxed);
        batch
    }

    /// Run the tick loop forever, broadcasting each batch over `broadcast`.
    /// Intended to be spawned as its own task; returns only on a broadcast
    /// I/O error.
    pub async fn run<C: Codec>(
        &self,
        rate_us: u64,
        mut broadcast: FramedEndpoint<C>,
    ) -> Result<(), crate::error::FramingError> {
        let mut ticker = time::interval(Duration::from_micros(rate_us.max(1)));
        let mut rng = rand::thread_rng();
        loop {
            ticker.tick().await;
            if !self.enabled.load(Ordering::Acquire) {
                continue;
            }
            let batch = self.advance(&mut rng);
            if batch.is_empty() {
                continue;
            }
            debug!(n = batch.len(), "broadcasting price updates");
            broadcast.write(&batch).await?;
        }
    }
}

/// Enable/disable handle for the control plane (C8).
#[derive(Clone)]
pub struct PriceFeedHandle {
    enabled: Arc<AtomicBool>,
}

impl PriceFeedHandle {
    pub fn start(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe(n: usize) -> Vec<Ticker> {
        (0..n).map(|i| Ticker::new(&format!("T{i:03}"))).collect()
    }

    #[test]
    fn advance_wraps_cursor_across_calls() {
        let u = universe(3);
        let prices = PricesView::new(&u);
        let feed = PriceFeed::new(u.clone(), prices);
        let mut rng = rand::thread_rng();

        // universe smaller than TICKERS_PER_TICK: each tick touches every
        // ticker, cursor still advances modulo the universe size.
        let first = feed.advance(&mut rng);
        assert_eq!(first.len(), 3);
        let second = feed.advance(&mut rng);
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn prices_view_reports_last_written_price() {
        let u = universe(1);
        let view = PricesView::new(&u);
        view.set(&u[0], 42);
        assert_eq!(view.get(&u[0]), Some(42));
        assert_eq!(view.get(&Ticker::new("ZZZZ")), None);
    }

    #[test]
    fn handle_toggles_enabled_state() {
        let u = universe(1);
        let feed = PriceFeed::new(u.clone(), PricesView::new(&u));
        let handle = feed.handle();
        assert!(!handle.is_enabled());
        handle.start();
        assert!(handle.is_enabled());
        handle.stop();
        assert!(!handle.is_enabled());
    }

    #[test]
    fn drawn_prices_stay_within_ceiling() {
        let u = universe(5);
        let feed = PriceFeed::new(u, PricesView::new(&[]));
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            for tp in feed.advance(&mut rng) {
                assert!(tp.price < PRICE_CEILING);
            }
        }
    }
}
