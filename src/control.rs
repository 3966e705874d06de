//! Control plane: out-of-band commands mapped to non-blocking handlers
//! (C8).

use std::collections::HashMap;

use tracing::{info, warn};

use crate::price_feed::PriceFeedHandle;

/// Recognized control commands (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    PriceFeedStart,
    PriceFeedStop,
}

impl Command {
    /// Parse a command from a line of text delivered over the
    /// administrative channel (stdin, a local socket, ...).
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "PriceFeedStart" => Some(Command::PriceFeedStart),
            "PriceFeedStop" => Some(Command::PriceFeedStop),
            _ => None,
        }
    }
}

type Handler = Box<dyn Fn() + Send + Sync>;

/// A command-value to handler-list map, dispatching on the control
/// executor. Handlers must be non-blocking — they're invoked synchronously
/// from [`ControlPlane::dispatch`].
#[derive(Default)]
pub struct ControlPlane {
    handlers: HashMap<Command, Vec<Handler>>,
}

impl ControlPlane {
    pub fn new() -> Self {
        ControlPlane {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` to run whenever `command` is dispatched.
    pub fn register(&mut self, command: Command, handler: impl Fn() + Send + Sync + 'static) {
        self.handlers.entry(command).or_default().push(Box::new(handler));
    }

    /// Wire up the price feed's start/stop handlers. A thin convenience
    /// over [`Self::register`] for the one subscriber the core ships with.
    pub fn register_price_feed(&mut self, feed: PriceFeedHandle) {
        let start = feed.clone();
        self.register(Command::PriceFeedStart, move || start.start());
        let stop = feed;
        self.register(Command::PriceFeedStop, move || stop.stop());
    }

    /// Run every handler registered for `command`. Unknown commands
    /// (no registered handlers) are logged and ignored.
    pub fn dispatch(&self, command: Command) {
        match self.handlers.get(&command) {
            Some(handlers) => {
                info!(?command, subscribers = handlers.len(), "dispatching control command");
                for handler in handlers {
                    handler();
                }
            }
            None => warn!(?command, "no subscribers for control command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn parses_known_commands_and_rejects_unknown() {
        assert_eq!(Command::parse("PriceFeedStart"), Some(Command::PriceFeedStart));
        assert_eq!(Command::parse(" PriceFeedStop \n"), Some(Command::PriceFeedStop));
        assert_eq!(Command::parse("Nonsense"), None);
    }

    #[test]
    fn dispatch_runs_every_registered_handler() {
        let mut plane = ControlPlane::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let a = calls.clone();
        let b = calls.clone();
        plane.register(Command::PriceFeedStart, move || {
            a.fetch_add(1, Ordering::SeqCst);
        });
        plane.register(Command::PriceFeedStart, move || {
            b.fetch_add(1, Ordering::SeqCst);
        });

        plane.dispatch(Command::PriceFeedStart);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn price_feed_handlers_toggle_the_feed() {
        use crate::price_feed::{PriceFeed, PricesView};

        let universe = vec![crate::model::Ticker::new("AAAA")];
        let feed = PriceFeed::new(universe.clone(), PricesView::new(&universe));
        let mut plane = ControlPlane::new();
        plane.register_price_feed(feed.handle());

        plane.dispatch(Command::PriceFeedStart);
        assert!(feed.handle().is_enabled());
        plane.dispatch(Command::PriceFeedStop);
        assert!(!feed.handle().is_enabled());
    }
}
