//! A framed TCP connection, split into a reader task and a writer task so
//! the owning side (the coordinator's connection manager, or a helper/
//! client's own event loop) never blocks on socket I/O directly — it only
//! ever touches channels. Mirrors the `tx_out`/pump-task split the COS301
//! websocket multiplexer uses for the same reason.

use bytes::{Bytes, BytesMut};
use ga_protocol::framing::{encode_frame, try_decode_frame};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

pub type ConnId = u64;

/// Something a reader task observed on its connection, tagged with the
/// connection it came from so a fan-in receiver can tell peers apart.
#[derive(Debug)]
pub enum ConnEvent {
    Frame(ConnId, Bytes),
    Closed(ConnId),
}

const READ_CHUNK: usize = 8 * 1024;
const WRITE_QUEUE_DEPTH: usize = 64;

/// A lightweight, cloneable view onto one live connection: enough to queue
/// a frame for write and to ask how long it has been idle in either
/// direction. The actual socket halves live in the reader/writer tasks
/// spawned by [`spawn`].
#[derive(Clone)]
pub struct ConnHandle {
    pub id: ConnId,
    write_tx: mpsc::Sender<Bytes>,
    last_read: Arc<Mutex<Instant>>,
    last_write: Arc<Mutex<Instant>>,
}

impl ConnHandle {
    /// Frames `payload` and queues it for the writer task. Never blocks;
    /// a full queue (a wedged peer) is surfaced as an error rather than
    /// stalling the caller's event loop.
    pub fn send(&self, payload: Vec<u8>) -> ga_error::Result<()> {
        let frame = encode_frame(&payload)?;
        self.write_tx
            .try_send(frame)
            .map_err(|e| ga_error::ga_err!(Transport: "connection {} write queue: {}", self.id, e))
    }

    pub fn idle_read_for(&self) -> Duration {
        self.last_read.lock().unwrap().elapsed()
    }

    pub fn idle_write_for(&self) -> Duration {
        self.last_write.lock().unwrap().elapsed()
    }
}

/// Splits `stream` and spawns its reader/writer tasks. Every decoded frame
/// (and the eventual close) is sent to `events_tx`, shared by every
/// connection a single owning loop is multiplexing.
pub fn spawn(stream: TcpStream, id: ConnId, events_tx: mpsc::Sender<ConnEvent>) -> ConnHandle {
    stream.set_nodelay(true).ok();
    let (read_half, write_half) = stream.into_split();
    let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);

    let last_read = Arc::new(Mutex::new(Instant::now()));
    let last_write = Arc::new(Mutex::new(Instant::now()));

    tokio::spawn(reader_loop(read_half, id, events_tx, last_read.clone()));
    tokio::spawn(writer_loop(write_half, write_rx, last_write.clone()));

    ConnHandle {
        id,
        write_tx,
        last_read,
        last_write,
    }
}

async fn reader_loop(
    mut read_half: OwnedReadHalf,
    id: ConnId,
    events_tx: mpsc::Sender<ConnEvent>,
    last_read: Arc<Mutex<Instant>>,
) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        match try_decode_frame(&mut buf) {
            Ok(Some(payload)) => {
                *last_read.lock().unwrap() = Instant::now();
                if events_tx.send(ConnEvent::Frame(id, payload)).await.is_err() {
                    return;
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(conn = id, error = %e, "dropping connection on framing error");
                let _ = events_tx.send(ConnEvent::Closed(id)).await;
                return;
            }
        }

        match read_half.read_buf(&mut buf).await {
            Ok(0) => {
                let _ = events_tx.send(ConnEvent::Closed(id)).await;
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn = id, error = %e, "read error, closing connection");
                let _ = events_tx.send(ConnEvent::Closed(id)).await;
                return;
            }
        }
    }
}

async fn writer_loop(
    mut write_half: OwnedWriteHalf,
    mut write_rx: mpsc::Receiver<Bytes>,
    last_write: Arc<Mutex<Instant>>,
) {
    while let Some(frame) = write_rx.recv().await {
        if write_half.write_all(&frame).await.is_err() {
            return;
        }
        *last_write.lock().unwrap() = Instant::now();
    }
}
