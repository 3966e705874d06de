//! Length-prefixed framing over a rotating read buffer (C1).
//!
//! Wire format: `len:u16-LE || body[len]`, the same framing on both stream
//! and datagram transports (§6 of the spec) — ported from
//! `common/src/network/async_socket.hpp` in the original implementation.
//! The buffer/decode logic is factored into [`FrameReader`] so it can be
//! driven by either a `TcpStream` or a `UdpSocket` and unit-tested without a
//! real socket at all.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::codec::Codec;
use crate::error::FramingError;
use crate::model::WireMessage;

/// Below this many writable bytes, rotate the buffer proactively (step 3 of
/// the read algorithm in the spec).
const ROTATE_THRESHOLD: usize = 256;

/// A single byte array with two cursors: `[head, tail)` is pending-decoded
/// bytes, `[tail, size)` is writable. Rotating moves pending bytes down to
/// offset 0 to reclaim writable space (P3: byte-for-byte, `head` becomes 0).
struct ReadBuffer {
    buf: Vec<u8>,
    head: usize,
    tail: usize,
}

impl ReadBuffer {
    fn new(size: usize) -> Self {
        ReadBuffer {
            buf: vec![0u8; size],
            head: 0,
            tail: 0,
        }
    }

    fn writable_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.tail..]
    }

    fn writable_len(&self) -> usize {
        self.buf.len() - self.tail
    }

    fn pending_len(&self) -> usize {
        self.tail - self.head
    }

    fn rotate(&mut self) {
        self.buf.copy_within(self.head..self.tail, 0);
        self.tail -= self.head;
        self.head = 0;
    }

    /// Decode error policy (§9 Q5): reset both cursors and discard whatever
    /// was buffered, resynchronising the stream by dropping it entirely.
    fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

/// Drives the rotating-buffer decode loop described in §4.1 of the spec,
/// independent of the transport that fills it.
pub struct FrameReader<C> {
    codec: C,
    buf: ReadBuffer,
}

impl<C: Codec> FrameReader<C> {
    /// `buffer_size` is the rotating read buffer's capacity in bytes
    /// (`buffer_size` config, §6).
    pub fn new(codec: C, buffer_size: usize) -> Self {
        FrameReader {
            codec,
            buf: ReadBuffer::new(buffer_size),
        }
    }

    /// The writable tail of the buffer; a transport reads or `recv`s into
    /// this before calling [`Self::ingest`].
    pub fn writable_mut(&mut self) -> &mut [u8] {
        self.buf.writable_mut()
    }

    /// Record that `n` freshly-received bytes now occupy the front of the
    /// previously-writable region, then decode and hand every complete frame
    /// to `on_message` in order. Returns `Err` (and resets the buffer) on the
    /// first decode failure — a stricter, session-fatal variant of the
    /// original's resync-by-discard (§9 Q5).
    pub fn ingest<M, H>(&mut self, n: usize, mut on_message: H) -> Result<(), FramingError>
    where
        M: WireMessage,
        H: FnMut(M),
    {
        self.buf.tail += n;

        loop {
            if self.buf.pending_len() < 2 {
                break;
            }
            let len_bytes = [self.buf.buf[self.buf.head], self.buf.buf[self.buf.head + 1]];
            let body_len = u16::from_le_bytes(len_bytes) as usize;

            if self.buf.head + 2 + body_len > self.buf.buf.len() {
                // Doesn't fit even with the tail fully advanced; compact and
                // let the next read make room.
                self.buf.rotate();
                break;
            }
            if self.buf.head + 2 + body_len > self.buf.tail {
                // Incomplete frame; wait for more bytes.
                break;
            }

            let body_start = self.buf.head + 2;
            let body = &self.buf.buf[body_start..body_start + body_len];
            match self.codec.decode::<M>(body) {
                Ok(msg) => {
                    on_message(msg);
                    self.buf.head = body_start + body_len;
                }
                Err(err) => {
                    self.buf.reset();
                    return Err(err);
                }
            }
        }

        if self.buf.writable_len() < ROTATE_THRESHOLD {
            self.buf.rotate();
        }
        Ok(())
    }
}

/// The transport capability set a framed endpoint needs: async receive,
/// async send, and whether it is a stream (as opposed to datagram) — a
/// closed variant rather than the original's templated socket type.
enum Transport {
    Stream(TcpStream),
    Datagram(UdpSocket),
}

/// Wraps one socket (stream or datagram) with a [`FrameReader`] and a write
/// path that serializes a batch into a single contiguous buffer before
/// issuing one write/send (§4.1).
pub struct FramedEndpoint<C> {
    transport: Transport,
    reader: FrameReader<C>,
    max_message_size: usize,
}

impl<C: Codec> FramedEndpoint<C> {
    /// Wrap an already-accepted or already-connected `TcpStream`. Disables
    /// Nagle's algorithm (the "low-latency flag" in §4.1). `buffer_size` and
    /// `max_message_size` are the `buffer_size`/`max_serialized_message_size`
    /// config values (§6).
    pub fn from_tcp_stream(
        stream: TcpStream,
        codec: C,
        buffer_size: usize,
        max_message_size: usize,
    ) -> std::io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(FramedEndpoint {
            transport: Transport::Stream(stream),
            reader: FrameReader::new(codec, buffer_size),
            max_message_size,
        })
    }

    /// Connect a new stream endpoint to `addr`.
    pub async fn connect(
        addr: SocketAddr,
        codec: C,
        buffer_size: usize,
        max_message_size: usize,
    ) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_tcp_stream(stream, codec, buffer_size, max_message_size)
    }

    /// Wrap a bound `UdpSocket`. `connect`ed datagram sockets let `write`
    /// reuse the same `send`/`recv` calls as the stream path.
    pub fn from_udp_socket(socket: UdpSocket, codec: C, buffer_size: usize, max_message_size: usize) -> Self {
        FramedEndpoint {
            transport: Transport::Datagram(socket),
            reader: FrameReader::new(codec, buffer_size),
            max_message_size,
        }
    }

    /// Continuously receive into the rotating buffer and decode `M`
    /// messages, invoking `on_message` for each. Returns when the transport
    /// reports a session-fatal condition (clean EOF, I/O error, or a decode
    /// error — §7).
    pub async fn read_loop<M, H>(&mut self, mut on_message: H) -> Result<(), FramingError>
    where
        M: WireMessage,
        H: FnMut(M),
    {
        loop {
            let n = match &mut self.transport {
                Transport::Stream(stream) => {
                    let buf = self.reader.writable_mut();
                    stream
                        .read(buf)
                        .await
                        .map_err(|e| FramingError::Io { message: e.to_string() })?
                }
                Transport::Datagram(socket) => {
                    let buf = self.reader.writable_mut();
                    socket
                        .recv(buf)
                        .await
                        .map_err(|e| FramingError::Io { message: e.to_string() })?
                }
            };

            if n == 0 {
                return Err(FramingError::Closed);
            }

            self.reader.ingest::<M, _>(n, &mut on_message)?;
        }
    }

    /// Serialize `messages` into one contiguous buffer and issue a single
    /// write (stream) or send (datagram).
    pub async fn write<M: WireMessage>(&mut self, messages: &[M]) -> Result<(), FramingError> {
        let mut buf = Vec::with_capacity(messages.len() * self.max_message_size);
        for msg in messages {
            let body = self.reader.codec.encode(msg)?;
            if body.len() > self.max_message_size {
                return Err(FramingError::MessageTooLarge {
                    encoded_len: body.len(),
                    limit: self.max_message_size,
                });
            }
            buf.extend_from_slice(&(body.len() as u16).to_le_bytes());
            buf.extend_from_slice(&body);
        }

        match &mut self.transport {
            Transport::Stream(stream) => stream
                .write_all(&buf)
                .await
                .map_err(|e| FramingError::Io { message: e.to_string() }),
            Transport::Datagram(socket) => socket
                .send(&buf)
                .await
                .map(|_| ())
                .map_err(|e| FramingError::Io { message: e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::model::{Action, Order, Ticker};

    fn sample_order(id: u32) -> Order {
        Order {
            trader_id: 0,
            order_id: id,
            ticker: Ticker::new("AAAA"),
            quantity: 10,
            price: 100,
            action: Action::Buy,
        }
    }

    fn encode_frame(codec: &JsonCodec, order: &Order) -> Vec<u8> {
        let body = codec.encode(order).unwrap();
        let mut framed = Vec::with_capacity(2 + body.len());
        framed.extend_from_slice(&(body.len() as u16).to_le_bytes());
        framed.extend_from_slice(&body);
        framed
    }

    const TEST_BUFFER_SIZE: usize = 64 * 1024;

    /// P2: whole messages come out regardless of how the bytes were chopped
    /// into receive completions. Also covers S4 (1-byte chunks).
    #[test]
    fn fragmented_one_byte_reads_yield_exact_messages() {
        let codec = JsonCodec;
        let orders = vec![sample_order(1), sample_order(2), sample_order(3)];
        let wire: Vec<u8> = orders.iter().flat_map(|o| encode_frame(&codec, o)).collect();

        let mut reader = FrameReader::new(codec, TEST_BUFFER_SIZE);
        let mut decoded = Vec::new();
        for byte in wire {
            let buf = reader.writable_mut();
            buf[0] = byte;
            reader
                .ingest::<Order, _>(1, |o: Order| decoded.push(o))
                .unwrap();
        }

        assert_eq!(decoded, orders);
    }

    #[test]
    fn single_large_read_yields_same_messages_as_fragmented() {
        let codec = JsonCodec;
        let orders = vec![sample_order(1), sample_order(2), sample_order(3)];
        let wire: Vec<u8> = orders.iter().flat_map(|o| encode_frame(&codec, o)).collect();

        let mut reader = FrameReader::new(codec, TEST_BUFFER_SIZE);
        let mut decoded = Vec::new();
        {
            let buf = reader.writable_mut();
            buf[..wire.len()].copy_from_slice(&wire);
        }
        reader
            .ingest::<Order, _>(wire.len(), |o: Order| decoded.push(o))
            .unwrap();

        assert_eq!(decoded, orders);
    }

    /// S5/P3: rotating preserves `[head, tail)` byte-for-byte and resets
    /// `head` to 0.
    #[test]
    fn rotate_compacts_without_losing_bytes() {
        let mut buf = ReadBuffer::new(16);
        buf.buf[..6].copy_from_slice(b"abcdef");
        buf.head = 4;
        buf.tail = 6;

        buf.rotate();

        assert_eq!(buf.head, 0);
        assert_eq!(buf.tail, 2);
        assert_eq!(&buf.buf[..2], b"ef");
    }

    #[test]
    fn buffer_rotates_when_tail_runs_low() {
        let codec = JsonCodec;
        let mut reader = FrameReader::new(codec, TEST_BUFFER_SIZE);
        // Drive the tail up near capacity with a single tiny frame, then
        // confirm the writable region is restored to (almost) full size
        // once that frame is consumed.
        let order = sample_order(9);
        let frame = encode_frame(&JsonCodec, &order);
        let cap = reader.buf.buf.len();

        // Simulate a near-full buffer by writing junk ahead of tail, then
        // backing tail off so only the one real frame remains pending.
        reader.buf.tail = cap - frame.len() - 1;
        reader.buf.head = reader.buf.tail;
        {
            let dst = &mut reader.buf.buf[reader.buf.head..reader.buf.head + frame.len()];
            dst.copy_from_slice(&frame);
        }

        let mut decoded = Vec::new();
        reader
            .ingest::<Order, _>(frame.len(), |o: Order| decoded.push(o))
            .unwrap();

        assert_eq!(decoded, vec![order]);
        assert!(reader.buf.writable_len() > cap - 300);
    }

    #[test]
    fn decode_error_resets_cursors() {
        let codec = JsonCodec;
        let mut reader = FrameReader::new(codec, TEST_BUFFER_SIZE);
        let garbage = b"not json";
        let mut framed = Vec::new();
        framed.extend_from_slice(&(garbage.len() as u16).to_le_bytes());
        framed.extend_from_slice(garbage);

        {
            let buf = reader.writable_mut();
            buf[..framed.len()].copy_from_slice(&framed);
        }
        let err = reader
            .ingest::<Order, _>(framed.len(), |_: Order| {})
            .unwrap_err();

        assert!(matches!(err, FramingError::Decode { .. }));
        assert_eq!(reader.buf.head, 0);
        assert_eq!(reader.buf.tail, 0);
    }
}
