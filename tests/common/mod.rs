//! Shared harness for the lifecycle integration tests.

use async_trait::async_trait;
use bytes::Bytes;
use kestrel_gateway::connection::GatewayConnection;
use kestrel_gateway::error::{Error, Result};
use kestrel_gateway::listener::ConnectionListener;
use kestrel_gateway::strategy::ConnectionStrategy;
use kestrel_gateway::transport::{Channel, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "kestrel_gateway=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A lifecycle event observed by the [`RecordingListener`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Success,
    Failure(String),
    Closure,
}

/// Records every notification, tagging success events with whether the
/// completion hook had already run.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<LifecycleEvent>>,
    pub hook_ran: AtomicBool,
    pub hook_ran_before_success: AtomicBool,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionListener for RecordingListener {
    fn handle_connection_success(&self, _connection: &GatewayConnection) {
        self.hook_ran_before_success
            .store(self.hook_ran.load(Ordering::SeqCst), Ordering::SeqCst);
        self.events.lock().unwrap().push(LifecycleEvent::Success);
    }

    fn handle_connection_failure(&self, _connection: &GatewayConnection, cause: &Error) {
        self.events
            .lock()
            .unwrap()
            .push(LifecycleEvent::Failure(cause.to_string()));
    }

    fn handle_connection_closure(&self, _connection: &GatewayConnection) {
        self.events.lock().unwrap().push(LifecycleEvent::Closure);
    }
}

/// A channel whose TLS handshake succeeds after a scripted delay.
#[derive(Debug)]
pub struct ScriptedChannel {
    handshake_delay: Duration,
    handshake_done: AtomicBool,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl ScriptedChannel {
    pub fn new(handshake_delay: Duration) -> Arc<Self> {
        let (closed_tx, closed_rx) = watch::channel(false);
        Arc::new(Self {
            handshake_delay,
            handshake_done: AtomicBool::new(false),
            closed_tx,
            closed_rx,
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    pub fn simulate_peer_close(&self) {
        self.closed_tx.send_replace(true);
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn complete_handshake(&self) -> Result<()> {
        sleep(self.handshake_delay).await;
        self.handshake_done.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn handshake_done(&self) -> bool {
        self.handshake_done.load(Ordering::SeqCst)
    }

    async fn send(&self, _payload: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Bytes> {
        std::future::pending().await
    }

    async fn wait_closed(&self) {
        let mut closed_rx = self.closed_rx.clone();
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    async fn close(&self) {
        self.closed_tx.send_replace(true);
    }
}

/// A transport whose raw connect succeeds after a scripted delay.
#[derive(Debug)]
pub struct ScriptedTransport {
    connect_delay: Duration,
    channel: Arc<ScriptedChannel>,
}

impl ScriptedTransport {
    pub fn new(connect_delay: Duration, channel: Arc<ScriptedChannel>) -> Self {
        Self {
            connect_delay,
            channel,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, _host: &str, _port: u16) -> Result<Arc<dyn Channel>> {
        sleep(self.connect_delay).await;
        Ok(self.channel.clone())
    }
}

/// A strategy wiring a scripted transport to a fixed endpoint and a
/// recording listener.
pub struct ScriptedStrategy {
    pub transport: Arc<ScriptedTransport>,
    pub listener: Arc<RecordingListener>,
    pub host: String,
    pub port: u16,
}

impl ConnectionStrategy for ScriptedStrategy {
    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn host(&self) -> String {
        self.host.clone()
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn handle_connection_completion(&self, _channel: &Arc<dyn Channel>) {
        self.listener.hook_ran.store(true, Ordering::SeqCst);
    }

    fn listener(&self) -> Option<Arc<dyn ConnectionListener>> {
        Some(self.listener.clone())
    }
}
