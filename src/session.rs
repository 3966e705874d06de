//! Session identity and the registry that maps a trader to their egress
//! endpoint (C3).
//!
//! A `TraderId` is derived once per connection from the peer's IP address —
//! not the full socket address, so a trader's ingress and egress
//! connections (opened against two different ports, from two different
//! ephemeral source ports) resolve to the same id. This mirrors the
//! original's single stable hash of the remote endpoint (§9 Q4).

use std::hash::Hasher;
use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::model::{OrderStatus, TraderId};

/// Derive a [`TraderId`] from a peer's IP address. Two connections from the
/// same host (ingress and egress) always hash to the same id; two different
/// hosts collide only in the birthday-bound sense of a 32-bit hash.
pub fn trader_id_for(addr: IpAddr) -> TraderId {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    match addr {
        IpAddr::V4(v4) => hasher.write(&v4.octets()),
        IpAddr::V6(v6) => hasher.write(&v6.octets()),
    }
    hasher.finish() as u32
}

/// The sending half of a trader's egress channel: a queue drained by the
/// task that owns the egress `FramedEndpoint` and writes to the socket.
pub type EgressSender = mpsc::Sender<OrderStatus>;

/// Concurrent trader_id -> egress-channel map. Single writer per key (the
/// egress accept loop, on connect/disconnect), many concurrent readers (the
/// match dispatcher, one lookup per fill) — the access pattern `DashMap` is
/// built for.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<TraderId, EgressSender>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(SessionRegistry {
            sessions: DashMap::new(),
        })
    }

    /// Register (or replace) the egress channel for `trader_id`, e.g. when
    /// its egress connection is accepted.
    pub fn register(&self, trader_id: TraderId, sender: EgressSender) {
        self.sessions.insert(trader_id, sender);
    }

    /// Remove a trader's egress channel, e.g. when its egress connection
    /// closes.
    pub fn remove(&self, trader_id: TraderId) {
        self.sessions.remove(&trader_id);
    }

    /// Look up the egress channel to forward a fill through. Absence means
    /// the trader has no open egress connection; the caller drops the fill
    /// rather than blocking.
    pub fn sender_for(&self, trader_id: TraderId) -> Option<EgressSender> {
        self.sessions.get(&trader_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_ip_yields_same_trader_id() {
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(trader_id_for(a), trader_id_for(b));
    }

    #[test]
    fn different_ip_yields_different_trader_id() {
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.5".parse().unwrap();
        assert_ne!(trader_id_for(a), trader_id_for(b));
    }

    #[tokio::test]
    async fn register_remove_and_lookup_round_trip() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(7, tx);
        assert_eq!(registry.len(), 1);

        let sender = registry.sender_for(7).expect("registered sender");
        sender
            .send(OrderStatus {
                order_id: 1,
                trader_id: 7,
                ticker: crate::model::Ticker::new("AAAA"),
                action: crate::model::Action::Buy,
                fill_price: 10,
                fill_quantity: 1,
                state: crate::model::OrderState::Full,
            })
            .await
            .unwrap();
        assert!(rx.recv().await.is_some());

        registry.remove(7);
        assert!(registry.is_empty());
        assert!(registry.sender_for(7).is_none());
    }
}
