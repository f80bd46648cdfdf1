use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::TransportError;
use super::traits::ChannelConnector;

/// Delay before a dropped channel is reopened while a workflow is bound.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// What the channel manager reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected { url: String },
    Message(serde_json::Value),
    Error(String),
    Closed { reconnect_scheduled: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
enum Signal {
    Opened,
    Frame(String),
    Failed(TransportError),
    Closed,
}

/// Signals carry the generation of the link that produced them so that
/// anything queued by a torn-down link is discarded.
#[derive(Debug)]
struct Tagged {
    generation: u64,
    signal: Signal,
}

#[derive(Debug)]
struct Link {
    url: String,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<String>,
}

enum Wake {
    Reconnect,
    Signal(Option<Tagged>),
}

/// Owns the lifecycle of the single streaming connection for a bound workflow.
///
/// All state changes happen on the task that calls [`ChannelManager::next_event`];
/// connection I/O runs on a spawned link task that only forwards signals.
pub struct ChannelManager {
    connector: Arc<dyn ChannelConnector>,
    base_url: String,
    reconnect_delay: Duration,
    workflow_id: Option<String>,
    state: LinkState,
    generation: u64,
    link: Option<Link>,
    reconnect: Option<Pin<Box<Sleep>>>,
    signals_tx: mpsc::UnboundedSender<Tagged>,
    signals_rx: mpsc::UnboundedReceiver<Tagged>,
}

impl ChannelManager {
    pub fn new(connector: Arc<dyn ChannelConnector>, base_url: impl Into<String>) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            workflow_id: None,
            state: LinkState::Disconnected,
            generation: 0,
            link: None,
            reconnect: None,
            signals_tx,
            signals_rx,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Scope subsequent connections to a workflow. Does not touch a live connection.
    pub fn bind(&mut self, workflow_id: Option<String>) {
        self.workflow_id = workflow_id;
    }

    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref()
    }

    pub fn address(&self) -> String {
        match &self.workflow_id {
            Some(id) => format!("{}/ws/{}", self.base_url, id),
            None => format!("{}/ws", self.base_url),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// True while there is a link or a scheduled reconnect, i.e. while
    /// [`ChannelManager::next_event`] has something to wait for.
    pub fn is_engaged(&self) -> bool {
        self.link.is_some() || self.reconnect.is_some()
    }

    /// Open a connection to the current address. No-op while one is open or opening.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&mut self) {
        if self.state != LinkState::Disconnected {
            debug!(state = ?self.state, "Channel already open, ignoring connect");
            return;
        }

        self.reconnect = None;
        self.generation += 1;
        let url = self.address();
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        info!(url = %url, generation = self.generation, "Opening workflow channel");
        tokio::spawn(run_link(
            Arc::clone(&self.connector),
            url.clone(),
            self.generation,
            self.signals_tx.clone(),
            cancel.clone(),
            outbound_rx,
        ));

        self.link = Some(Link {
            url,
            cancel,
            outbound: outbound_tx,
        });
        self.state = LinkState::Connecting;
    }

    /// Cancel any pending reconnect and close the live connection. Safe to repeat.
    pub fn disconnect(&mut self) {
        if self.reconnect.take().is_some() {
            debug!("Cancelled pending channel reconnect");
        }
        if let Some(link) = self.link.take() {
            info!(url = %link.url, "Closing workflow channel");
            link.cancel.cancel();
        }
        self.generation += 1;
        self.state = LinkState::Disconnected;
    }

    /// Queue a frame on the live connection. Dropped unless connected.
    pub fn send(&self, message: &serde_json::Value) -> bool {
        let link = match (&self.link, self.state) {
            (Some(link), LinkState::Connected) => link,
            _ => {
                debug!("Channel not connected, dropping outbound frame");
                return false;
            }
        };
        link.outbound.send(message.to_string()).is_ok()
    }

    /// Wait for the next channel event, driving reconnects along the way.
    ///
    /// Never resolves while the manager is not engaged.
    pub async fn next_event(&mut self) -> ChannelEvent {
        loop {
            let wake = tokio::select! {
                _ = reconnect_elapsed(&mut self.reconnect) => Wake::Reconnect,
                tagged = self.signals_rx.recv() => Wake::Signal(tagged),
            };

            match wake {
                Wake::Reconnect => {
                    self.reconnect = None;
                    info!(workflow_id = ?self.workflow_id, "Reconnecting workflow channel");
                    self.connect();
                }
                Wake::Signal(None) => {
                    return ChannelEvent::Closed {
                        reconnect_scheduled: false,
                    };
                }
                Wake::Signal(Some(tagged)) => {
                    if tagged.generation != self.generation {
                        debug!(
                            generation = tagged.generation,
                            current = self.generation,
                            "Dropping signal from a stale channel"
                        );
                        continue;
                    }
                    if let Some(event) = self.absorb(tagged.signal) {
                        return event;
                    }
                }
            }
        }
    }

    fn absorb(&mut self, signal: Signal) -> Option<ChannelEvent> {
        match signal {
            Signal::Opened => {
                self.state = LinkState::Connected;
                let url = self
                    .link
                    .as_ref()
                    .map(|link| link.url.clone())
                    .unwrap_or_else(|| self.address());
                info!(url = %url, "Workflow channel connected");
                Some(ChannelEvent::Connected { url })
            }
            Signal::Frame(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => Some(ChannelEvent::Message(value)),
                Err(e) => {
                    warn!(error = %e, "Failed to parse channel frame, discarding");
                    None
                }
            },
            Signal::Failed(e) => {
                warn!(error = %e, "Workflow channel error");
                Some(ChannelEvent::Error(e.to_string()))
            }
            Signal::Closed => {
                self.state = LinkState::Disconnected;
                self.link = None;
                let reconnect_scheduled = self.workflow_id.is_some();
                if reconnect_scheduled {
                    info!(
                        workflow_id = ?self.workflow_id,
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "Workflow channel closed, scheduling reconnect"
                    );
                    self.reconnect = Some(Box::pin(sleep(self.reconnect_delay)));
                } else {
                    info!("Workflow channel closed");
                }
                Some(ChannelEvent::Closed {
                    reconnect_scheduled,
                })
            }
        }
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("base_url", &self.base_url)
            .field("workflow_id", &self.workflow_id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("reconnect_pending", &self.reconnect.is_some())
            .finish()
    }
}

async fn reconnect_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(delay) => delay.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn run_link(
    connector: Arc<dyn ChannelConnector>,
    url: String,
    generation: u64,
    signals: mpsc::UnboundedSender<Tagged>,
    cancel: CancellationToken,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let emit = |signal: Signal| {
        let _ = signals.send(Tagged { generation, signal });
    };

    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = connector.open(&url) => opened,
    };

    let mut connection = match opened {
        Ok(connection) => connection,
        Err(e) => {
            // A failed open is reported as a close so the reconnect policy applies.
            emit(Signal::Failed(e));
            emit(Signal::Closed);
            return;
        }
    };
    emit(Signal::Opened);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                connection.close().await;
                return;
            }
            Some(frame) = outbound.recv() => {
                if let Err(e) = connection.send(frame).await {
                    emit(Signal::Failed(e));
                }
            }
            received = connection.recv() => match received {
                Ok(Some(text)) => emit(Signal::Frame(text)),
                Ok(None) => {
                    emit(Signal::Closed);
                    return;
                }
                Err(e) => {
                    emit(Signal::Failed(e));
                    emit(Signal::Closed);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{MemoryConnector, MemoryServer};
    use serde_json::json;
    use tokio::time::{timeout, Instant};

    fn manager() -> (ChannelManager, MemoryServer) {
        let (connector, server) = MemoryConnector::pair();
        let manager = ChannelManager::new(Arc::new(connector), "ws://localhost:8000/api/v1/");
        (manager, server)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_uses_scoped_address_and_is_idempotent() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        channel.connect();
        channel.connect();

        let event = channel.next_event().await;
        assert_eq!(
            event,
            ChannelEvent::Connected {
                url: "ws://localhost:8000/api/v1/ws/w1".to_string()
            }
        );
        channel.connect();

        let peer = server.accept().await.unwrap();
        assert_eq!(peer.url(), "ws://localhost:8000/api/v1/ws/w1");
        assert_eq!(server.attempts().len(), 1);
        assert!(channel.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbound_channel_uses_unscoped_address() {
        let (channel, _server) = manager();
        assert_eq!(channel.address(), "ws://localhost:8000/api/v1/ws");
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frames_are_discarded_without_closing() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        channel.connect();
        channel.next_event().await;
        let peer = server.accept().await.unwrap();

        peer.push_text("{not json");
        peer.push_json(&json!({"type": "workflow_error", "error": "x"}));

        let event = channel.next_event().await;
        assert_eq!(
            event,
            ChannelEvent::Message(json!({"type": "workflow_error", "error": "x"}))
        );
        assert!(channel.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_bound_schedules_one_reconnect_after_delay() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        channel.connect();
        channel.next_event().await;
        let mut peer = server.accept().await.unwrap();

        peer.close();
        assert_eq!(
            channel.next_event().await,
            ChannelEvent::Closed {
                reconnect_scheduled: true
            }
        );
        assert!(channel.reconnect_pending());
        assert_eq!(server.attempts().len(), 1);

        let started = Instant::now();
        let event = channel.next_event().await;
        assert!(matches!(event, ChannelEvent::Connected { .. }));
        assert!(started.elapsed() >= DEFAULT_RECONNECT_DELAY);
        assert_eq!(server.attempts().len(), 2);

        // Nothing else is scheduled until the next close.
        assert!(timeout(Duration::from_secs(10), channel.next_event()).await.is_err());
        assert_eq!(server.attempts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_unbound_is_terminal() {
        let (mut channel, mut server) = manager();
        channel.connect();
        channel.next_event().await;
        let mut peer = server.accept().await.unwrap();

        peer.close();
        assert_eq!(
            channel.next_event().await,
            ChannelEvent::Closed {
                reconnect_scheduled: false
            }
        );
        assert!(!channel.is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        channel.connect();
        channel.next_event().await;
        let mut peer = server.accept().await.unwrap();
        peer.close();
        channel.next_event().await;
        assert!(channel.reconnect_pending());

        channel.disconnect();
        channel.disconnect();

        assert!(!channel.reconnect_pending());
        assert!(timeout(Duration::from_secs(5), channel.next_event()).await.is_err());
        assert_eq!(server.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_open_reports_error_then_close() {
        let (mut channel, server) = manager();
        server.refuse_next(1);
        channel.bind(Some("w1".to_string()));
        channel.connect();

        assert!(matches!(channel.next_event().await, ChannelEvent::Error(_)));
        assert_eq!(
            channel.next_event().await,
            ChannelEvent::Closed {
                reconnect_scheduled: true
            }
        );
        assert!(matches!(
            channel.next_event().await,
            ChannelEvent::Connected { .. }
        ));
        assert_eq!(server.attempts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_is_reported_before_close() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        channel.connect();
        channel.next_event().await;
        let peer = server.accept().await.unwrap();

        peer.fail("reset by peer");
        assert_eq!(
            channel.next_event().await,
            ChannelEvent::Error("channel protocol error: reset by peer".to_string())
        );
        assert_eq!(
            channel.next_event().await,
            ChannelEvent::Closed {
                reconnect_scheduled: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_only_delivers_when_connected() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        assert!(!channel.send(&json!({"ping": 1})));

        channel.connect();
        assert!(!channel.send(&json!({"ping": 2})));
        channel.next_event().await;
        let mut peer = server.accept().await.unwrap();

        assert!(channel.send(&json!({"ping": 3})));
        assert_eq!(peer.next_sent().await.as_deref(), Some(r#"{"ping":3}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_from_torn_down_link_are_dropped() {
        let (mut channel, mut server) = manager();
        channel.bind(Some("w1".to_string()));
        channel.connect();
        channel.next_event().await;
        let mut old_peer = server.accept().await.unwrap();

        old_peer.push_json(&json!({"type": "workflow_progress", "progress": {}}));
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        channel.disconnect();
        assert_eq!(old_peer.next_sent().await, None);

        channel.connect();
        assert!(matches!(
            channel.next_event().await,
            ChannelEvent::Connected { .. }
        ));
        assert_eq!(server.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_idle_manager_has_nothing_to_wait_for() {
        let (mut channel, _server) = manager();
        assert!(!channel.is_engaged());
        assert_eq!(channel.state(), LinkState::Disconnected);

        let mut pending = tokio_test::task::spawn(channel.next_event());
        tokio_test::assert_pending!(pending.poll());
        tokio::task::yield_now().await;
        tokio_test::assert_pending!(pending.poll());
    }
}
