//! Periodic message sending.
//!
//! One concrete loop engine ([`PeriodicSender`]) drives every periodic
//! component: a [`MessageSupplier`] decides *what* to send each cycle and a
//! [`SendStrategy`] decides *how* one encoded message leaves the machine.
//! The advertisement and discovery senders are the same engine with
//! different suppliers and strategies.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::constants;
use crate::error::Result;
use crate::message::{ServiceInfo, SsdpMessage};
use crate::state::{State, StateHolder};
use crate::transport::Transport;
use crate::worker::{CancelToken, WorkerPool};

/// Supplies the batch of messages for one send cycle.
pub trait MessageSupplier: Send + Sync {
    /// Messages to send this cycle. An empty batch still sleeps the full
    /// delay before the next cycle; an error is logged and retried next
    /// cycle.
    fn messages_to_send(&self) -> Result<Vec<SsdpMessage>>;
}

impl<F> MessageSupplier for F
where
    F: Fn() -> Result<Vec<SsdpMessage>> + Send + Sync,
{
    fn messages_to_send(&self) -> Result<Vec<SsdpMessage>> {
        self()
    }
}

/// Outbound path for one encoded message.
///
/// Implementations queue the actual socket work on the shared pool so send
/// latency never stalls the sender's loop; failures are logged inside the
/// job.
pub trait SendStrategy: Send + Sync {
    fn dispatch(&self, text: String);
}

/// Runs a send/sleep cycle until cancelled.
///
/// State convention: `Stopped` until [`PeriodicSender::run`] starts, then
/// `Started` while fetching and dispatching, `Sleep` during the delay, back
/// to `Started`, and terminally `Stopped` once the cancellation signal is
/// observed. A cancelled sender cannot be restarted; build a new one.
pub struct PeriodicSender {
    state: StateHolder<State>,
    cancel: Arc<CancelToken>,
    delay: Mutex<Duration>,
    supplier: Arc<dyn MessageSupplier>,
    strategy: Arc<dyn SendStrategy>,
}

impl PeriodicSender {
    /// Engine with the default cycle delay.
    pub fn new(supplier: Arc<dyn MessageSupplier>, strategy: Arc<dyn SendStrategy>) -> Self {
        let state = StateHolder::new();
        state.set_state(State::Stopped);

        Self {
            state,
            cancel: Arc::new(CancelToken::new()),
            delay: Mutex::new(Duration::from_millis(constants::DEFAULT_DELAY_MS)),
            supplier,
            strategy,
        }
    }

    /// Engine wired to the default multicast send path.
    pub fn multicast(
        transport: Arc<dyn Transport>,
        pool: Arc<WorkerPool>,
        host: impl Into<String>,
        port: u16,
        interfaces: Vec<Ipv4Addr>,
        supplier: Arc<dyn MessageSupplier>,
    ) -> Self {
        let strategy = Arc::new(MulticastSendStrategy {
            transport,
            pool,
            host: host.into(),
            port,
            interfaces,
        });
        Self::new(supplier, strategy)
    }

    pub fn state(&self) -> Option<State> {
        self.state.get()
    }

    pub fn state_holder(&self) -> &StateHolder<State> {
        &self.state
    }

    pub fn delay(&self) -> Duration {
        *self.delay.lock()
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Token observed by the running loop; cancel it to stop the sender.
    pub fn cancel_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.cancel)
    }

    /// Request the loop to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run the send/sleep cycle on the calling thread until cancelled.
    pub fn run(&self) {
        self.state.set_state(State::Started);

        while !self.cancel.is_cancelled() && self.state.get() != Some(State::Stopped) {
            if self.state.get() != Some(State::Sleep) {
                match self.supplier.messages_to_send() {
                    Ok(messages) => {
                        debug!(count = messages.len(), "dispatching periodic messages");
                        for message in &messages {
                            self.strategy.dispatch(message.to_string());
                        }
                    }
                    Err(e) => {
                        // Transient failure: sleep and retry next cycle.
                        warn!("failed to build periodic messages: {e}");
                    }
                }
                self.state.set_state(State::Sleep);
            }

            if self.cancel.wait_timeout(self.delay()) {
                break;
            }
            self.state.set_state(State::Started);
        }

        self.state.set_state(State::Stopped);
    }
}

/// Fire-and-forget multicast of each message to the configured group, once
/// per configured interface.
pub struct MulticastSendStrategy {
    transport: Arc<dyn Transport>,
    pool: Arc<WorkerPool>,
    host: String,
    port: u16,
    interfaces: Vec<Ipv4Addr>,
}

impl MulticastSendStrategy {
    pub fn new(
        transport: Arc<dyn Transport>,
        pool: Arc<WorkerPool>,
        host: impl Into<String>,
        port: u16,
        interfaces: Vec<Ipv4Addr>,
    ) -> Self {
        Self {
            transport,
            pool,
            host: host.into(),
            port,
            interfaces,
        }
    }
}

impl SendStrategy for MulticastSendStrategy {
    fn dispatch(&self, text: String) {
        let group: IpAddr = match self.host.parse() {
            Ok(group) => group,
            Err(_) => {
                warn!(host = %self.host, "invalid multicast group, message dropped");
                return;
            }
        };

        let transport = Arc::clone(&self.transport);
        let interfaces = self.interfaces.clone();
        let port = self.port;

        self.pool.execute(move || {
            if interfaces.is_empty() {
                if let Err(e) = transport.send_multicast(&text, group, port, None) {
                    warn!("multicast send failed: {e}");
                }
            } else {
                for interface in interfaces {
                    if let Err(e) = transport.send_multicast(&text, group, port, Some(interface)) {
                        warn!(%interface, "multicast send failed: {e}");
                    }
                }
            }
        });
    }
}

/// Advertises every registered service as `ssdp:alive`, `repeat` times per
/// cycle.
pub struct AliveMessageSupplier {
    services: Arc<Mutex<Vec<ServiceInfo>>>,
    cache_control: String,
    server: String,
    repeat: usize,
}

impl AliveMessageSupplier {
    pub fn new(
        services: Arc<Mutex<Vec<ServiceInfo>>>,
        cache_control: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            services,
            cache_control: cache_control.into(),
            server: server.into(),
            repeat: 1,
        }
    }

    /// Send each service's alive message `repeat` times per cycle (at least
    /// once).
    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat.max(1);
        self
    }
}

impl MessageSupplier for AliveMessageSupplier {
    fn messages_to_send(&self) -> Result<Vec<SsdpMessage>> {
        let services = self.services.lock().clone();
        let mut messages = Vec::with_capacity(services.len() * self.repeat);

        for info in &services {
            let mut message = crate::message::alive_for_service(info);
            message.cache_control = self.cache_control.clone();
            message.server = self.server.clone();

            for _ in 0..self.repeat {
                messages.push(SsdpMessage::Alive(message.clone()));
            }
        }
        Ok(messages)
    }
}

/// Supplier with nothing to say; the default periodic sender until an
/// application installs its own.
pub struct EmptySupplier;

impl MessageSupplier for EmptySupplier {
    fn messages_to_send(&self) -> Result<Vec<SsdpMessage>> {
        Ok(Vec::new())
    }
}
