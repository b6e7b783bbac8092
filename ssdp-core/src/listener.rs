//! Multicast receive loop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::constants;
use crate::error::{Result, SsdpError};
use crate::handler::ResponseHandler;
use crate::state::{State, StateHolder};
use crate::transport::{MulticastReceiver, ReceiverBinding, Transport};
use crate::worker::CancelToken;

/// Joins one or more multicast groups and forwards every received datagram's
/// text to a [`ResponseHandler`].
///
/// When interfaces are configured the group is joined once per interface;
/// otherwise the single group derived from the host is joined. On loop exit
/// the listener reports `Stopped` and leaves every group it joined,
/// swallowing cleanup errors.
///
/// # Known limitation
///
/// In blocking mode (the default) a cancellation request is only observed
/// after the next datagram arrives: the receive call blocks indefinitely and
/// the loop's cancellation check runs between receives. A listener blocked
/// on a quiet network cannot be force-stopped. Run in non-blocking mode when
/// prompt shutdown matters; cancellation is then observed within one timeout
/// period.
pub struct MulticastListener {
    state: StateHolder<State>,
    cancel: Arc<CancelToken>,
    transport: Arc<dyn Transport>,
    binding: ReceiverBinding,
    host: String,
    port: u16,
    interfaces: Vec<Ipv4Addr>,
    timeout: Duration,
    blocking: bool,
    handler: Mutex<Option<Arc<dyn ResponseHandler>>>,
}

impl MulticastListener {
    /// Listener for `host:port` with the default timeout, in blocking mode.
    pub fn new(transport: Arc<dyn Transport>, host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let state = StateHolder::new();
        state.set_state(State::Stopped);

        Self {
            state,
            cancel: Arc::new(CancelToken::new()),
            transport,
            binding: ReceiverBinding::Port(port),
            host,
            port,
            interfaces: Vec::new(),
            timeout: Duration::from_millis(constants::DEFAULT_SOCKET_TIMEOUT_MS),
            blocking: true,
            handler: Mutex::new(None),
        }
    }

    /// Listener bound to an exact socket address; the group to join is the
    /// address's IP.
    pub fn bound_to(transport: Arc<dyn Transport>, address: SocketAddr) -> Self {
        let mut listener = Self::new(transport, address.ip().to_string(), address.port());
        listener.binding = ReceiverBinding::Address(address);
        listener
    }

    /// Join the group once per given interface instead of once globally.
    pub fn with_interfaces(mut self, interfaces: Vec<Ipv4Addr>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Timeout for each receive in non-blocking mode.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Switch between blocking receives (default) and timed receives.
    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn set_response_handler(&self, handler: Arc<dyn ResponseHandler>) {
        *self.handler.lock() = Some(handler);
    }

    pub fn state(&self) -> Option<State> {
        self.state.get()
    }

    pub fn state_holder(&self) -> &StateHolder<State> {
        &self.state
    }

    pub fn cancel_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.cancel)
    }

    /// Request the loop to stop; see the blocking-mode caveat on the type.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run the receive loop on the calling thread until it exits.
    ///
    /// The loop ends on cancellation, on a receive error, or when the
    /// response handler fails; the terminal state is always `Stopped`.
    pub fn run(&self) {
        self.state.set_state(State::Started);

        let receiver = match self.transport.open_receiver(self.binding) {
            Ok(receiver) => receiver,
            Err(e) => {
                warn!("failed to open multicast receiver: {e}");
                self.state.set_state(State::Stopped);
                return;
            }
        };

        let mut joined = Vec::new();
        match self.join_groups(receiver.as_ref(), &mut joined) {
            Ok(()) => self.receive_loop(receiver.as_ref()),
            Err(e) => warn!("failed to join multicast group: {e}"),
        }

        self.state.set_state(State::Stopped);
        for (group, interface) in joined {
            if let Err(e) = receiver.leave_group(group, interface) {
                debug!(%group, "failed to leave multicast group: {e}");
            }
        }
    }

    fn join_groups(
        &self,
        receiver: &dyn MulticastReceiver,
        joined: &mut Vec<(IpAddr, Option<Ipv4Addr>)>,
    ) -> Result<()> {
        let group: IpAddr = self
            .host
            .parse()
            .map_err(|_| SsdpError::InvalidAddress(self.host.clone()))?;

        if self.interfaces.is_empty() {
            receiver.join_group(group, None)?;
            joined.push((group, None));
        } else {
            for interface in &self.interfaces {
                receiver.join_group(group, Some(*interface))?;
                joined.push((group, Some(*interface)));
            }
        }

        debug!(%group, port = self.port, "listening for multicast traffic");
        Ok(())
    }

    fn receive_loop(&self, receiver: &dyn MulticastReceiver) {
        while !self.cancel.is_cancelled() && self.state.get() != Some(State::Stopped) {
            match receiver.receive(self.blocking, self.timeout) {
                Ok(Some(datagram)) => {
                    let handler = self.handler.lock().clone();
                    if let Some(handler) = handler {
                        if let Err(e) = handler.handle_from(datagram.source, &datagram.text) {
                            warn!("response handler failed, stopping listener: {e}");
                            break;
                        }
                    }
                }
                // Nothing arrived within the non-blocking timeout.
                Ok(None) => {}
                Err(e) => {
                    warn!("multicast receive failed, stopping listener: {e}");
                    break;
                }
            }
        }
    }
}
