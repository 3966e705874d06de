//! Server bootstrap (C13): binds the ingress/egress/broadcast sockets and
//! wires C1-C9 together into running tasks.
//!
//! Out of scope for the core (§1): this module is the "external
//! collaborator" that owns process-level concerns (binding, task
//! supervision, shutdown) around the core components it assembles.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::codec::JsonCodec;
use crate::config::VenueConfig;
use crate::control::{Command, ControlPlane};
use crate::dispatch::dispatch;
use crate::error::VenueError;
use crate::framing::FramedEndpoint;
use crate::model::{Order, Ticker};
use crate::price_feed::{PriceFeed, PricesView};
use crate::router::OrderRouter;
use crate::session::{trader_id_for, SessionRegistry};

/// Orders pulled off one ingress connection's read loop, waiting to be
/// batched into a router cycle.
const INGRESS_CHANNEL_CAPACITY: usize = 4096;

/// Fills queued for one trader's egress writer between flushes.
const EGRESS_CHANNEL_CAPACITY: usize = 256;

/// The running venue: owns nothing directly once spawned — every subsystem
/// is an independent task, torn down together on shutdown.
pub struct VenueServer;

impl VenueServer {
    /// Bind every listening socket described by `config`, spawn the
    /// ingress/egress acceptors, the router/dispatch cycle, the price feed,
    /// and the stdin control plane, then run until ctrl-c.
    pub async fn run(config: VenueConfig) -> Result<(), VenueError> {
        let universe: Vec<Ticker> = config.ticker_universe.iter().map(|s| Ticker::new(s)).collect();
        let router = Arc::new(OrderRouter::new(&universe, config.order_book_limit));
        let registry = SessionRegistry::new();
        let prices = PricesView::new(&universe);
        let price_feed = Arc::new(PriceFeed::new(universe, prices));

        let ingress_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port_tcp_in);
        let ingress_listener = TcpListener::bind(ingress_addr).await.map_err(|e| VenueError::Bind {
            addr: ingress_addr.to_string(),
            message: e.to_string(),
        })?;

        let egress_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port_tcp_out);
        let egress_listener = TcpListener::bind(egress_addr).await.map_err(|e| VenueError::Bind {
            addr: egress_addr.to_string(),
            message: e.to_string(),
        })?;

        let broadcast_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port_udp);
        let broadcast_socket = UdpSocket::bind(broadcast_addr).await.map_err(|e| VenueError::Bind {
            addr: broadcast_addr.to_string(),
            message: e.to_string(),
        })?;
        broadcast_socket.set_broadcast(true).map_err(|e| VenueError::Bind {
            addr: broadcast_addr.to_string(),
            message: e.to_string(),
        })?;
        broadcast_socket
            .connect(SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), config.port_udp))
            .await
            .map_err(|e| VenueError::Bind {
                addr: "255.255.255.255".to_string(),
                message: e.to_string(),
            })?;
        let buffer_size = config.buffer_size;
        let max_message_size = config.max_serialized_message_size;
        let broadcast = FramedEndpoint::from_udp_socket(broadcast_socket, JsonCodec, buffer_size, max_message_size);

        let (order_tx, order_rx) = mpsc::channel::<Order>(INGRESS_CHANNEL_CAPACITY);

        let mut control = ControlPlane::new();
        control.register_price_feed(price_feed.handle());

        let rate_us = config.price_feed_rate_us;
        let (port_tcp_in, port_tcp_out, port_udp) = (config.port_tcp_in, config.port_tcp_out, config.port_udp);

        let ingress_task = tokio::spawn(ingress_accept_loop(
            ingress_listener,
            order_tx,
            buffer_size,
            max_message_size,
        ));
        let egress_task = tokio::spawn(egress_accept_loop(
            egress_listener,
            registry.clone(),
            buffer_size,
            max_message_size,
        ));
        let router_task = tokio::spawn(router_cycle_loop(order_rx, router, registry));
        let price_feed_task = {
            let feed = price_feed.clone();
            tokio::spawn(async move {
                if let Err(err) = feed.run(rate_us, broadcast).await {
                    error!(%err, "price feed broadcast failed, feed stopped");
                }
            })
        };
        let control_task = tokio::spawn(control_stdin_loop(control));

        info!(port_tcp_in, port_tcp_out, port_udp, "venue server listening");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
            }
        }

        ingress_task.abort();
        egress_task.abort();
        router_task.abort();
        price_feed_task.abort();
        control_task.abort();
        Ok(())
    }
}

async fn ingress_accept_loop(
    listener: TcpListener,
    order_tx: mpsc::Sender<Order>,
    buffer_size: usize,
    max_message_size: usize,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "ingress accept failed");
                continue;
            }
        };
        let order_tx = order_tx.clone();
        tokio::spawn(handle_ingress_connection(stream, peer, order_tx, buffer_size, max_message_size));
    }
}

async fn handle_ingress_connection(
    stream: TcpStream,
    peer: SocketAddr,
    order_tx: mpsc::Sender<Order>,
    buffer_size: usize,
    max_message_size: usize,
) {
    let trader_id = trader_id_for(peer.ip());
    let mut endpoint = match FramedEndpoint::from_tcp_stream(stream, JsonCodec, buffer_size, max_message_size) {
        Ok(e) => e,
        Err(err) => {
            warn!(%err, %peer, "failed to prepare ingress socket");
            return;
        }
    };

    let result = endpoint
        .read_loop::<Order, _>(|mut order| {
            order.trader_id = trader_id;
            if order_tx.try_send(order).is_err() {
                warn!(trader_id, "ingress router channel full, dropping order");
            }
        })
        .await;

    if let Err(err) = result {
        info!(trader_id, %err, "ingress session closed");
    }
}

async fn egress_accept_loop(
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    buffer_size: usize,
    max_message_size: usize,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "egress accept failed");
                continue;
            }
        };
        let registry = registry.clone();
        tokio::spawn(handle_egress_connection(stream, peer, registry, buffer_size, max_message_size));
    }
}

async fn handle_egress_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<SessionRegistry>,
    buffer_size: usize,
    max_message_size: usize,
) {
    let trader_id = trader_id_for(peer.ip());
    let mut endpoint = match FramedEndpoint::from_tcp_stream(stream, JsonCodec, buffer_size, max_message_size) {
        Ok(e) => e,
        Err(err) => {
            warn!(%err, %peer, "failed to prepare egress socket");
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(EGRESS_CHANNEL_CAPACITY);
    registry.register(trader_id, tx);

    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(status) = rx.try_recv() {
            batch.push(status);
        }
        if let Err(err) = endpoint.write(&batch).await {
            warn!(trader_id, %err, "egress write failed, session remains for retry");
        }
    }

    registry.remove(trader_id);
}

async fn router_cycle_loop(mut order_rx: mpsc::Receiver<Order>, router: Arc<OrderRouter>, registry: Arc<SessionRegistry>) {
    while let Some(first) = order_rx.recv().await {
        let mut batch = vec![first];
        while let Ok(order) = order_rx.try_recv() {
            batch.push(order);
        }
        let fills = router.route_batch(batch);
        if !fills.is_empty() {
            dispatch(fills, &registry);
        }
    }
}

async fn control_stdin_loop(control: ControlPlane) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match Command::parse(&line) {
                Some(cmd) => control.dispatch(cmd),
                None => warn!(line, "unrecognized control command"),
            },
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "control stdin read error");
                break;
            }
        }
    }
}
