// Seams between the channel manager and a concrete streaming transport

use async_trait::async_trait;

use super::errors::TransportError;

/// Opens streaming connections to a channel address.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn ChannelConnection>, TransportError>;
}

/// One live streaming connection carrying text frames.
#[async_trait]
pub trait ChannelConnection: Send {
    /// Next inbound text frame. `Ok(None)` means the peer closed the connection.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. Must tolerate an already-closed peer.
    async fn close(&mut self);
}
