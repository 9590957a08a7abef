//! TCP listener wiring the coordinator and per-connection sessions together.

use log::{error, info};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::coordinator::{Coordinator, INBOUND_QUEUE_SIZE};
use crate::session;

/// The accept loop. One accepted connection becomes one session; all
/// sessions feed a single coordinator task through one bounded channel.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// Actual bound address, for callers that bind port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) {
        let (events_tx, events_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);
        tokio::spawn(Coordinator::new().run(events_rx));

        let mut next_client_id: u32 = 1;
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = next_client_id;
                    next_client_id += 1;
                    tokio::spawn(session::handle_connection(stream, addr, id, events_tx.clone()));
                }
                Err(e) => error!("accept failed: {}", e),
            }
        }
    }
}
