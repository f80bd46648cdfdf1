// Streaming channel lifecycle: connect, receive, reconnect with a fixed delay

pub mod channel;
pub mod errors;
pub mod memory;
pub mod traits;
pub mod websocket;

pub use channel::{ChannelEvent, ChannelManager, LinkState, DEFAULT_RECONNECT_DELAY};
pub use errors::TransportError;
pub use memory::{MemoryConnector, MemoryPeer, MemoryServer};
pub use traits::{ChannelConnection, ChannelConnector};
pub use websocket::WebSocketConnector;
