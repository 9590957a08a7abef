//! Per-connection session handling: line framing, the outbound message queue
//! and the reader/writer task pair.

use log::{debug, info};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::coordinator::SessionEvent;

/// Capacity of a session's outbound message queue. When a client reads
/// slowly enough to fill it, the coordinator's enqueue blocks, which is the
/// accepted backpressure model.
pub const OUTBOUND_QUEUE_SIZE: usize = 16;

/// Handle to a connected client, held by the coordinator's tables and by any
/// game the client participates in. Cloning is cheap; all clones enqueue to
/// the same outbound queue. Identity is the connection id, so handles compare
/// and hash by id alone.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: u32,
    addr: SocketAddr,
    outbound: mpsc::Sender<String>,
    closing: mpsc::Sender<()>,
}

impl ClientHandle {
    pub(crate) fn new(
        id: u32,
        addr: SocketAddr,
        outbound: mpsc::Sender<String>,
        closing: mpsc::Sender<()>,
    ) -> Self {
        Self { id, addr, outbound, closing }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Enqueues one protocol line for this client, waiting for queue space
    /// when the client is slow. A closed queue means the session is already
    /// gone; the message is dropped silently in that case.
    pub async fn send(&self, message: impl Into<String>) {
        if self.outbound.send(message.into()).await.is_err() {
            debug!("client {} is gone, dropping message", self.id);
        }
    }

    /// Signals the session to shut down. The reader stops at its next
    /// suspension point and the connection is torn down as if the client had
    /// hung up; messages already queued still reach the socket first.
    /// Signaling an already-closing session is a no-op.
    pub fn close(&self) {
        let _ = self.closing.try_send(());
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientHandle {}

impl Hash for ClientHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Services one accepted connection until it closes.
///
/// Runs the read loop on the current task and spawns the writer alongside it.
/// Each input line is whitespace-tokenized into a command and its arguments
/// and forwarded to the coordinator. The loop ends on EOF, on a read error,
/// on an empty line, after forwarding `QUIT`, or when the server signals the
/// session away via [`ClientHandle::close`]; it then submits a
/// [`SessionEvent::Disconnected`] so the coordinator drops the client from
/// its tables (an implicit leave). The writer exits once every handle clone
/// has been dropped and the queue is drained, so trailing acknowledgements
/// still reach the socket.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: u32,
    events: mpsc::Sender<SessionEvent>,
) {
    info!("client {} connected from {}", id, addr);

    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
    let (closing_tx, mut closing_rx) = mpsc::channel(1);
    let client = ClientHandle::new(id, addr, outbound_tx, closing_tx);

    let writer = tokio::spawn(drain_outbound(write_half, outbound_rx, id));

    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = tokio::select! {
            result = lines.next_line() => match result {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    debug!("client {} read error: {}", id, e);
                    break;
                }
            },
            _ = closing_rx.recv() => {
                debug!("client {} closed by the server", id);
                break;
            }
        };

        let mut fields = line.split_whitespace().map(str::to_owned);
        let cmd = match fields.next() {
            Some(cmd) => cmd,
            None => break,
        };
        let args: Vec<String> = fields.collect();
        let quitting = cmd == "QUIT";

        let event = SessionEvent::Command { client: client.clone(), cmd, args };
        if events.send(event).await.is_err() {
            break;
        }
        if quitting {
            break;
        }
    }

    let _ = events.send(SessionEvent::Disconnected { client_id: id }).await;
    drop(client);
    let _ = writer.await;
    info!("client {} disconnected", id);
}

// Writer half of a session: drains the outbound queue onto the socket,
// terminating each message with CRLF. A write error ends the task; the
// unreadable socket will surface in the read loop as well.
async fn drain_outbound(write_half: OwnedWriteHalf, mut outbound: mpsc::Receiver<String>, id: u32) {
    let mut writer = BufWriter::new(write_half);
    while let Some(message) = outbound.recv().await {
        let write = async {
            writer.write_all(message.as_bytes()).await?;
            writer.write_all(b"\r\n").await?;
            writer.flush().await
        };
        if let Err(e) = write.await {
            debug!("client {} write error: {}", id, e);
            break;
        }
    }
}
