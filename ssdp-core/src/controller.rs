//! Central coordination: service registry, handler dispatch, component
//! lifecycle.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::constants;
use crate::discover::DiscoverSender;
use crate::error::{Result, SsdpError};
use crate::handler::{ControllerResponseHandler, DiscoverResponseHandler, MessageHandler};
use crate::listener::MulticastListener;
use crate::message::{ServiceInfo, SsdpMessage};
use crate::sender::{AliveMessageSupplier, EmptySupplier, PeriodicSender};
use crate::transport::Transport;
use crate::worker::WorkerPool;

/// Tunables for a controller and the components it builds.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Multicast group to advertise and listen on.
    /// Default: `239.255.255.250`
    pub host: String,

    /// Multicast port.
    /// Default: 1900
    pub port: u16,

    /// Outbound/join interfaces, identified by their IPv4 address. Empty
    /// means the system default.
    pub interfaces: Vec<Ipv4Addr>,

    /// Size of the worker pool shared by the components and their send jobs.
    /// Default: 5
    pub worker_pool_size: usize,

    /// Delay between periodic send cycles.
    /// Default: 5 seconds
    pub delay: Duration,

    /// Receive timeout for the listener in non-blocking mode.
    /// Default: 3 seconds
    pub receive_timeout: Duration,

    /// Per-send reply wait of the discover sender.
    /// Default: 3 seconds
    pub discover_ttl: Duration,

    /// Search target of the discover sender.
    /// Default: `upnp:rootdevice`
    pub discover_target: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_IP.to_string(),
            port: constants::DEFAULT_PORT,
            interfaces: Vec::new(),
            worker_pool_size: 5,
            delay: Duration::from_millis(constants::DEFAULT_DELAY_MS),
            receive_timeout: Duration::from_millis(constants::DEFAULT_SOCKET_TIMEOUT_MS),
            discover_ttl: Duration::from_secs(constants::DEFAULT_DISCOVER_TTL_SECS),
            discover_target: constants::ST_ROOT_DEVICE.to_string(),
        }
    }
}

/// Owns the service registry, the message handlers, and the three running
/// components, and routes every decoded message to the handlers.
///
/// The transport is injected at construction and shared with every
/// component. Components can be replaced wholesale before [`start`]; after
/// [`stop`] the controller is terminal and a fresh instance is required.
///
/// [`start`]: SsdpController::start
/// [`stop`]: SsdpController::stop
pub struct SsdpController {
    config: ControllerConfig,
    transport: Arc<dyn Transport>,
    pool: Arc<WorkerPool>,

    services: Arc<Mutex<Vec<ServiceInfo>>>,
    handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,

    discover_sender: RwLock<Arc<DiscoverSender>>,
    periodic_sender: RwLock<Arc<PeriodicSender>>,
    multicast_listener: RwLock<Arc<MulticastListener>>,

    discover_sender_enabled: AtomicBool,
    periodic_sender_enabled: AtomicBool,
    multicast_listener_enabled: AtomicBool,
}

impl SsdpController {
    /// Controller for the default SSDP group and port.
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_config(ControllerConfig::default(), transport)
    }

    /// Controller with explicit tunables.
    pub fn with_config(config: ControllerConfig, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new_cyclic(|controller: &Weak<SsdpController>| {
            let pool = Arc::new(WorkerPool::new(config.worker_pool_size));
            let services = Arc::new(Mutex::new(Vec::new()));

            let discover_sender = DiscoverSender::with_target(
                Arc::clone(&transport),
                Arc::clone(&pool),
                config.host.clone(),
                config.port,
                config.discover_target.clone(),
                config.discover_ttl,
            );
            discover_sender.set_delay(config.delay);
            discover_sender.set_response_handler(Arc::new(DiscoverResponseHandler::new(
                controller.clone(),
            )));

            let periodic_sender = PeriodicSender::multicast(
                Arc::clone(&transport),
                Arc::clone(&pool),
                config.host.clone(),
                config.port,
                config.interfaces.clone(),
                Arc::new(EmptySupplier),
            );
            periodic_sender.set_delay(config.delay);

            let multicast_listener = MulticastListener::new(
                Arc::clone(&transport),
                config.host.clone(),
                config.port,
            )
            .with_interfaces(config.interfaces.clone())
            .with_timeout(config.receive_timeout);
            multicast_listener.set_response_handler(Arc::new(ControllerResponseHandler::new(
                controller.clone(),
            )));

            Self {
                config,
                transport,
                pool,
                services,
                handlers: RwLock::new(Vec::new()),
                discover_sender: RwLock::new(Arc::new(discover_sender)),
                periodic_sender: RwLock::new(Arc::new(periodic_sender)),
                multicast_listener: RwLock::new(Arc::new(multicast_listener)),
                discover_sender_enabled: AtomicBool::new(true),
                periodic_sender_enabled: AtomicBool::new(true),
                multicast_listener_enabled: AtomicBool::new(true),
            }
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Pool shared by the components and their send jobs; replacement
    /// components should run their work on it.
    pub fn worker_pool(&self) -> Arc<WorkerPool> {
        Arc::clone(&self.pool)
    }

    // --- message handlers -------------------------------------------------

    /// Register a handler; dispatch order is registration order.
    pub fn add_message_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers.write().push(handler);
    }

    /// Remove a handler registered earlier (pointer identity).
    pub fn remove_message_handler(&self, handler: &Arc<dyn MessageHandler>) {
        self.handlers
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, handler));
    }

    pub fn message_handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    // --- service registry -------------------------------------------------

    /// Add a service to advertise. Duplicates are allowed.
    pub fn add_service(&self, info: ServiceInfo) {
        self.services.lock().push(info);
    }

    /// Remove the first registered service equal to `info`.
    pub fn remove_service(&self, info: &ServiceInfo) -> bool {
        let mut services = self.services.lock();
        match services.iter().position(|registered| registered == info) {
            Some(index) => {
                services.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the registry, in insertion order.
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.services.lock().clone()
    }

    /// Replace the registry wholesale.
    pub fn set_services(&self, services: Vec<ServiceInfo>) {
        *self.services.lock() = services;
    }

    /// Shared handle to the registry, for suppliers that advertise it.
    pub fn services_handle(&self) -> Arc<Mutex<Vec<ServiceInfo>>> {
        Arc::clone(&self.services)
    }

    /// Replace the periodic sender with one advertising every registered
    /// service as `ssdp:alive` using the given `CACHE-CONTROL` and `SERVER`
    /// values.
    pub fn advertise_services(
        &self,
        cache_control: impl Into<String>,
        server: impl Into<String>,
    ) {
        let supplier = Arc::new(AliveMessageSupplier::new(
            self.services_handle(),
            cache_control,
            server,
        ));
        let sender = PeriodicSender::multicast(
            Arc::clone(&self.transport),
            Arc::clone(&self.pool),
            self.config.host.clone(),
            self.config.port,
            self.config.interfaces.clone(),
            supplier,
        );
        sender.set_delay(self.config.delay);
        self.set_periodic_sender(Arc::new(sender));
    }

    // --- components and enable flags --------------------------------------

    pub fn discover_sender(&self) -> Arc<DiscoverSender> {
        Arc::clone(&self.discover_sender.read())
    }

    pub fn set_discover_sender(&self, sender: Arc<DiscoverSender>) {
        *self.discover_sender.write() = sender;
    }

    pub fn periodic_sender(&self) -> Arc<PeriodicSender> {
        Arc::clone(&self.periodic_sender.read())
    }

    pub fn set_periodic_sender(&self, sender: Arc<PeriodicSender>) {
        *self.periodic_sender.write() = sender;
    }

    pub fn multicast_listener(&self) -> Arc<MulticastListener> {
        Arc::clone(&self.multicast_listener.read())
    }

    pub fn set_multicast_listener(&self, listener: Arc<MulticastListener>) {
        *self.multicast_listener.write() = listener;
    }

    pub fn discover_sender_enabled(&self) -> bool {
        self.discover_sender_enabled.load(Ordering::SeqCst)
    }

    pub fn set_discover_sender_enabled(&self, enabled: bool) {
        self.discover_sender_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn periodic_sender_enabled(&self) -> bool {
        self.periodic_sender_enabled.load(Ordering::SeqCst)
    }

    pub fn set_periodic_sender_enabled(&self, enabled: bool) {
        self.periodic_sender_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn multicast_listener_enabled(&self) -> bool {
        self.multicast_listener_enabled.load(Ordering::SeqCst)
    }

    pub fn set_multicast_listener_enabled(&self, enabled: bool) {
        self.multicast_listener_enabled.store(enabled, Ordering::SeqCst);
    }

    // --- lifecycle ---------------------------------------------------------

    /// Schedule every enabled component on the shared pool.
    ///
    /// Components whose enable flag is false are never started.
    pub fn start(&self) {
        info!(host = %self.config.host, port = self.config.port, "starting SSDP controller");

        if self.discover_sender_enabled() {
            let sender = self.discover_sender();
            self.pool.execute(move || sender.run());
        }
        if self.periodic_sender_enabled() {
            let sender = self.periodic_sender();
            self.pool.execute(move || sender.run());
        }
        if self.multicast_listener_enabled() {
            let listener = self.multicast_listener();
            self.pool.execute(move || listener.run());
        }
    }

    /// Request cancellation of every component and shut the pool down.
    ///
    /// Best-effort signal, not a join: components may still be winding down
    /// when this returns. The controller cannot be restarted afterwards.
    pub fn stop(&self) {
        info!("stopping SSDP controller");

        self.discover_sender().cancel();
        self.periodic_sender().cancel();
        self.multicast_listener().cancel();
        self.pool.shutdown();
    }

    // --- dispatch ----------------------------------------------------------

    /// Dispatch a message whose sender is unknown.
    pub fn process_message(&self, message: &SsdpMessage) -> Result<()> {
        self.process_message_from(None, message)
    }

    /// Dispatch a message to every registered handler, in registration
    /// order.
    ///
    /// If a handler fails, dispatch of this message stops: the error
    /// surfaces to the caller and the remaining handlers are not invoked.
    pub fn process_message_from(
        &self,
        remote: Option<SocketAddr>,
        message: &SsdpMessage,
    ) -> Result<()> {
        let handlers = self.handlers.read().clone();
        debug!(handlers = handlers.len(), "dispatching SSDP message");

        for handler in &handlers {
            match message {
                SsdpMessage::Discover(m) => handler.on_discover(remote, m),
                SsdpMessage::Alive(m) => handler.on_alive(m),
                SsdpMessage::Update(m) => handler.on_update(m),
                SsdpMessage::ByeBye(m) => handler.on_byebye(m),
                SsdpMessage::DiscoverResponse(m) => handler.on_discover_response(m),
            }
            .map_err(SsdpError::Handler)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SsdpController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsdpController")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("services", &self.services.lock().len())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}
