// In-process channel transport for tests and embedding without a network

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::errors::TransportError;
use super::traits::{ChannelConnection, ChannelConnector};

#[derive(Debug, Default)]
struct ConnectorState {
    attempts: Vec<String>,
    refusals: u32,
}

#[derive(Debug)]
enum PeerFrame {
    Text(String),
    Fail(String),
}

/// Connector whose connections terminate in [`MemoryPeer`]s handed to a [`MemoryServer`].
#[derive(Debug)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Server side of a [`MemoryConnector`]: accepts peers and scripts failures.
#[derive(Debug)]
pub struct MemoryServer {
    state: Arc<Mutex<ConnectorState>>,
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
    pub fn pair() -> (Self, MemoryServer) {
        let state = Arc::new(Mutex::new(ConnectorState::default()));
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Arc::clone(&state),
                peers: peers_tx,
            },
            MemoryServer {
                state,
                peers: peers_rx,
            },
        )
    }
}

impl MemoryServer {
    /// Next connection opened by the client, in open order.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Refuse the next `count` open attempts.
    pub fn refuse_next(&self, count: u32) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refusals = count;
    }

    /// Addresses of every open attempt so far, refused ones included.
    pub fn attempts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
            .clone()
    }
}

#[async_trait]
impl ChannelConnector for MemoryConnector {
    async fn open(&self, url: &str) -> Result<Box<dyn ChannelConnection>, TransportError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.attempts.push(url.to_string());
            if state.refusals > 0 {
                state.refusals -= 1;
                return Err(TransportError::Connect(format!("connection refused: {url}")));
            }
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let _ = self.peers.send(MemoryPeer {
            url: url.to_string(),
            to_client: Some(to_client),
            from_client,
        });

        Ok(Box::new(MemoryConnection {
            inbound,
            outbound,
            closed: false,
        }))
    }
}

/// Producer end of one in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    to_client: Option<mpsc::UnboundedSender<PeerFrame>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn push_text(&self, text: &str) -> bool {
        self.deliver(PeerFrame::Text(text.to_string()))
    }

    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.deliver(PeerFrame::Text(value.to_string()))
    }

    /// Make the client's next read fail.
    pub fn fail(&self, reason: &str) -> bool {
        self.deliver(PeerFrame::Fail(reason.to_string()))
    }

    /// Close from the producer side.
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Next frame the client sent; `None` once the client has closed.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    fn deliver(&self, frame: PeerFrame) -> bool {
        match &self.to_client {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }
}

struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<PeerFrame>,
    outbound: mpsc::UnboundedSender<String>,
    closed: bool,
}

#[async_trait]
impl ChannelConnection for MemoryConnection {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        if self.closed {
            return Ok(None);
        }
        match self.inbound.recv().await {
            Some(PeerFrame::Text(text)) => Ok(Some(text)),
            Some(PeerFrame::Fail(reason)) => Err(TransportError::Protocol(reason)),
            None => Ok(None),
        }
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.closed = true;
        self.inbound.close();
    }
}
