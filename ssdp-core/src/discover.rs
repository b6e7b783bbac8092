//! Active discovery: periodic M-SEARCH with reply correlation.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::constants;
use crate::error::Result;
use crate::handler::ResponseHandler;
use crate::message::{DiscoverMessage, SsdpMessage};
use crate::sender::{MessageSupplier, PeriodicSender, SendStrategy};
use crate::state::{State, StateHolder};
use crate::transport::{Transport, UnicastSender};
use crate::worker::{CancelToken, WorkerPool};

/// Sends the same M-SEARCH twice per cycle and correlates replies.
///
/// The redundant send is deliberate: SSDP runs over UDP and a single
/// request datagram is routinely lost. Each send is dispatched onto the
/// shared pool, where the worker (not this sender's loop) waits up to the
/// configured TTL for one reply and forwards it to the response handler.
/// A window elapsing without a reply is not an error.
pub struct DiscoverSender {
    engine: PeriodicSender,
    strategy: Arc<DiscoverSendStrategy>,
}

impl DiscoverSender {
    /// Discovery of root devices on `host:port` with default delay and TTL.
    pub fn new(
        transport: Arc<dyn Transport>,
        pool: Arc<WorkerPool>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self::with_target(
            transport,
            pool,
            host,
            port,
            constants::ST_ROOT_DEVICE,
            Duration::from_secs(constants::DEFAULT_DISCOVER_TTL_SECS),
        )
    }

    /// Discovery with an explicit search target and reply TTL.
    pub fn with_target(
        transport: Arc<dyn Transport>,
        pool: Arc<WorkerPool>,
        host: impl Into<String>,
        port: u16,
        search_target: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let host = host.into();
        let supplier = Arc::new(DiscoverSupplier {
            host: host.clone(),
            port,
            mx: ttl.as_secs().min(u64::from(u32::MAX)) as u32,
            st: search_target.into(),
        });
        let strategy = Arc::new(DiscoverSendStrategy {
            transport,
            pool,
            host,
            port: Mutex::new(port),
            ttl,
            handler: Mutex::new(None),
            sender_handle: Mutex::new(None),
        });

        Self {
            engine: PeriodicSender::new(supplier, Arc::clone(&strategy) as Arc<dyn SendStrategy>),
            strategy,
        }
    }

    /// Handler receiving decoded reply text together with the responder's
    /// address and port.
    pub fn set_response_handler(&self, handler: Arc<dyn ResponseHandler>) {
        *self.strategy.handler.lock() = Some(handler);
    }

    /// Retarget the unicast sends.
    ///
    /// Invalidates the lazily-created unicast handle; the next send
    /// recreates it.
    pub fn set_port(&self, port: u16) {
        *self.strategy.port.lock() = port;
        *self.strategy.sender_handle.lock() = None;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.engine.set_delay(delay);
    }

    pub fn state(&self) -> Option<State> {
        self.engine.state()
    }

    pub fn state_holder(&self) -> &StateHolder<State> {
        self.engine.state_holder()
    }

    pub fn cancel_token(&self) -> Arc<CancelToken> {
        self.engine.cancel_token()
    }

    pub fn cancel(&self) {
        self.engine.cancel();
    }

    /// Run the discovery cycle on the calling thread until cancelled.
    pub fn run(&self) {
        self.engine.run();
    }
}

/// Yields the same discovery request twice per cycle.
struct DiscoverSupplier {
    host: String,
    port: u16,
    mx: u32,
    st: String,
}

impl MessageSupplier for DiscoverSupplier {
    fn messages_to_send(&self) -> Result<Vec<SsdpMessage>> {
        let message: SsdpMessage =
            DiscoverMessage::new(self.host.clone(), self.port, self.mx, self.st.clone(), Vec::new())
                .into();
        Ok(vec![message.clone(), message])
    }
}

/// Unicast send with a bounded wait for one reply, on a pool worker.
struct DiscoverSendStrategy {
    transport: Arc<dyn Transport>,
    pool: Arc<WorkerPool>,
    host: String,
    port: Mutex<u16>,
    ttl: Duration,
    handler: Mutex<Option<Arc<dyn ResponseHandler>>>,
    sender_handle: Mutex<Option<Arc<dyn UnicastSender>>>,
}

impl DiscoverSendStrategy {
    /// Reuse the cached unicast handle, creating it on first use.
    fn unicast_sender(&self) -> Result<Arc<dyn UnicastSender>> {
        let mut handle = self.sender_handle.lock();
        if let Some(sender) = handle.as_ref() {
            return Ok(Arc::clone(sender));
        }

        let sender: Arc<dyn UnicastSender> = Arc::from(self.transport.create_unicast_sender()?);
        *handle = Some(Arc::clone(&sender));
        Ok(sender)
    }
}

impl SendStrategy for DiscoverSendStrategy {
    fn dispatch(&self, text: String) {
        let addr: IpAddr = match self.host.parse() {
            Ok(addr) => addr,
            Err(_) => {
                warn!(host = %self.host, "invalid discovery target, message dropped");
                return;
            }
        };

        let sender = match self.unicast_sender() {
            Ok(sender) => sender,
            Err(e) => {
                warn!("failed to create unicast sender: {e}");
                return;
            }
        };

        let port = *self.port.lock();
        let ttl = self.ttl;
        let handler = self.handler.lock().clone();

        debug!(%addr, port, "sending M-SEARCH");
        self.pool.execute(move || {
            match sender.send_awaiting_reply(&text, addr, port, ttl) {
                Ok(Some(reply)) => {
                    if let Some(handler) = handler {
                        if let Err(e) = handler.handle_from(reply.source, &reply.text) {
                            warn!("discover response handler failed: {e}");
                        }
                    }
                }
                Ok(None) => trace!("no M-SEARCH reply within {ttl:?}"),
                Err(e) => warn!("M-SEARCH send failed: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::transport::{Datagram, MulticastReceiver, ReceiverBinding};

    use super::*;

    #[derive(Default)]
    struct CountingTransport {
        senders_created: AtomicUsize,
    }

    struct CountingUnicastSender {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl UnicastSender for CountingUnicastSender {
        fn send(&self, text: &str, _addr: IpAddr, _port: u16) -> Result<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }

        fn send_awaiting_reply(
            &self,
            text: &str,
            _addr: IpAddr,
            _port: u16,
            _ttl: Duration,
        ) -> Result<Option<Datagram>> {
            self.sent.lock().push(text.to_string());
            Ok(None)
        }
    }

    impl Transport for CountingTransport {
        fn send_multicast(
            &self,
            _text: &str,
            _group: IpAddr,
            _port: u16,
            _interface: Option<Ipv4Addr>,
        ) -> Result<()> {
            Ok(())
        }

        fn send_unicast(&self, _text: &str, _addr: IpAddr, _port: u16) -> Result<()> {
            Ok(())
        }

        fn create_unicast_sender(&self) -> Result<Box<dyn UnicastSender>> {
            self.senders_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingUnicastSender {
                sent: Arc::new(Mutex::new(Vec::new())),
            }))
        }

        fn open_receiver(&self, _binding: ReceiverBinding) -> Result<Box<dyn MulticastReceiver>> {
            unimplemented!("not used by the discover sender")
        }
    }

    #[test]
    fn test_supplier_yields_same_message_twice() {
        let supplier = DiscoverSupplier {
            host: "239.255.255.250".to_string(),
            port: 1900,
            mx: 3,
            st: "upnp:rootdevice".to_string(),
        };

        let batch = supplier.messages_to_send().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], batch[1]);
        assert!(matches!(batch[0], SsdpMessage::Discover(_)));
    }

    #[test]
    fn test_unicast_handle_is_reused() {
        let transport = Arc::new(CountingTransport::default());
        let pool = Arc::new(WorkerPool::new(1));
        let sender =
            DiscoverSender::new(Arc::clone(&transport) as Arc<dyn Transport>, pool, "239.255.255.250", 1900);

        sender.strategy.dispatch("M-SEARCH * HTTP/1.1\r\n\r\n".to_string());
        sender.strategy.dispatch("M-SEARCH * HTTP/1.1\r\n\r\n".to_string());
        assert_eq!(transport.senders_created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_port_invalidates_unicast_handle() {
        let transport = Arc::new(CountingTransport::default());
        let pool = Arc::new(WorkerPool::new(1));
        let sender =
            DiscoverSender::new(Arc::clone(&transport) as Arc<dyn Transport>, pool, "239.255.255.250", 1900);

        sender.strategy.dispatch("M-SEARCH * HTTP/1.1\r\n\r\n".to_string());
        assert_eq!(transport.senders_created.load(Ordering::SeqCst), 1);

        sender.set_port(1901);
        sender.strategy.dispatch("M-SEARCH * HTTP/1.1\r\n\r\n".to_string());
        assert_eq!(transport.senders_created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reply_is_forwarded_to_handler() {
        struct ReplyingSender;

        impl UnicastSender for ReplyingSender {
            fn send(&self, _text: &str, _addr: IpAddr, _port: u16) -> Result<()> {
                Ok(())
            }

            fn send_awaiting_reply(
                &self,
                _text: &str,
                _addr: IpAddr,
                _port: u16,
                _ttl: Duration,
            ) -> Result<Option<Datagram>> {
                Ok(Some(Datagram {
                    text: "HTTP/1.1 200 OK\r\nST: upnp:rootdevice\r\n\r\n".to_string(),
                    source: SocketAddr::from(([192, 168, 1, 50], 1900)),
                }))
            }
        }

        struct RecordingHandler {
            received: Mutex<Vec<(SocketAddr, String)>>,
        }

        impl ResponseHandler for RecordingHandler {
            fn handle(&self, _text: &str) -> Result<()> {
                Ok(())
            }

            fn handle_from(&self, source: SocketAddr, text: &str) -> Result<()> {
                self.received.lock().push((source, text.to_string()));
                Ok(())
            }
        }

        let transport = Arc::new(CountingTransport::default());
        let pool = Arc::new(WorkerPool::new(1));
        let sender =
            DiscoverSender::new(Arc::clone(&transport) as Arc<dyn Transport>, pool, "239.255.255.250", 1900);

        let handler = Arc::new(RecordingHandler {
            received: Mutex::new(Vec::new()),
        });
        sender.set_response_handler(handler.clone());

        // Swap in a replying handle so the pool job sees a response.
        *sender.strategy.sender_handle.lock() = Some(Arc::new(ReplyingSender));
        sender.strategy.dispatch("M-SEARCH * HTTP/1.1\r\n\r\n".to_string());

        // The reply arrives via a pool worker.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while handler.received.lock().is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        let received = handler.received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, SocketAddr::from(([192, 168, 1, 50], 1900)));
        assert!(received[0].1.starts_with("HTTP/1.1 200 OK"));
    }
}
