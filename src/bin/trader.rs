//! Minimal trader client: connects ingress and egress, optionally a price
//! broadcast listener, sends a handful of orders, and prints whatever comes
//! back. Contains no trading logic — it exists to exercise the server end
//! to end, grounded in the original's `trader/src/main.cpp`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rand::Rng;
use tracing_subscriber::EnvFilter;
use venue_engine::codec::JsonCodec;
use venue_engine::config::VenueConfig;
use venue_engine::framing::FramedEndpoint;
use venue_engine::model::{Action, Order, OrderStatus, Ticker, TickerPrice};

struct Args {
    host: IpAddr,
    port_tcp_in: u16,
    port_tcp_out: u16,
    port_udp: Option<u16>,
    order_count: usize,
}

fn parse_args() -> Args {
    let mut host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let mut port_tcp_in = 7000u16;
    let mut port_tcp_out = 7001u16;
    let mut port_udp = None;
    let mut order_count = 5usize;

    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--host" => host = it.next().and_then(|v| v.parse().ok()).unwrap_or(host),
            "--port-in" => port_tcp_in = it.next().and_then(|v| v.parse().ok()).unwrap_or(port_tcp_in),
            "--port-out" => port_tcp_out = it.next().and_then(|v| v.parse().ok()).unwrap_or(port_tcp_out),
            "--port-udp" => port_udp = it.next().and_then(|v| v.parse().ok()),
            "--orders" => order_count = it.next().and_then(|v| v.parse().ok()).unwrap_or(order_count),
            other => eprintln!("ignoring unrecognized flag: {other}"),
        }
    }

    Args {
        host,
        port_tcp_in,
        port_tcp_out,
        port_udp,
        order_count,
    }
}

fn synthetic_orders(n: usize) -> Vec<Order> {
    let mut rng = rand::thread_rng();
    let tickers = ["AAAA", "BBBB", "CCCC"];
    (0..n)
        .map(|_| Order {
            trader_id: 0,
            order_id: Order::next_order_id(),
            ticker: Ticker::new(tickers[rng.gen_range(0..tickers.len())]),
            quantity: rng.gen_range(1..100),
            price: rng.gen_range(0..900),
            action: if rng.gen_bool(0.5) { Action::Buy } else { Action::Sell },
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new("info").unwrap())
        .init();

    let args = parse_args();
    // No server config file at hand here; the framing knobs only need to
    // agree with whatever the connected server was started with, so the
    // defaults double as this client's assumption.
    let defaults = VenueConfig::default();
    let buffer_size = defaults.buffer_size;
    let max_message_size = defaults.max_serialized_message_size;

    let mut egress = FramedEndpoint::connect(
        SocketAddr::new(args.host, args.port_tcp_out),
        JsonCodec,
        buffer_size,
        max_message_size,
    )
    .await?;
    tokio::spawn(async move {
        let result = egress
            .read_loop::<OrderStatus, _>(|status| {
                println!("fill: {status:?}");
            })
            .await;
        if let Err(err) = result {
            eprintln!("egress connection closed: {err}");
        }
    });

    if let Some(port_udp) = args.port_udp {
        tokio::spawn(async move {
            let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port_udp);
            let socket = match tokio::net::UdpSocket::bind(bind_addr).await {
                Ok(s) => s,
                Err(err) => {
                    eprintln!("failed to bind price feed listener: {err}");
                    return;
                }
            };
            let mut endpoint = FramedEndpoint::from_udp_socket(socket, JsonCodec, buffer_size, max_message_size);
            let result = endpoint
                .read_loop::<TickerPrice, _>(|tick| {
                    println!("price: {} = {}", tick.ticker, tick.price);
                })
                .await;
            if let Err(err) = result {
                eprintln!("price feed listener stopped: {err}");
            }
        });
    }

    let mut ingress = FramedEndpoint::connect(
        SocketAddr::new(args.host, args.port_tcp_in),
        JsonCodec,
        buffer_size,
        max_message_size,
    )
    .await?;
    let orders = synthetic_orders(args.order_count);
    ingress.write(&orders).await?;
    println!("sent {} orders", orders.len());

    tokio::signal::ctrl_c().await?;
    Ok(())
}
