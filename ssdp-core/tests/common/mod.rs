//! Shared test doubles: a scriptable transport and a recording handler.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ssdp_core::error::{Result, SsdpError};
use ssdp_core::handler::{HandlerError, MessageHandler};
use ssdp_core::message::{
    AliveMessage, ByeByeMessage, DiscoverMessage, DiscoverResponseMessage, UpdateMessage,
};
use ssdp_core::transport::{
    Datagram, MulticastReceiver, ReceiverBinding, Transport, UnicastSender,
};

/// One scripted receive outcome.
pub enum Step {
    Datagram(&'static str),
    Timeout,
    Error,
}

/// Transport whose receiver replays a fixed script (last element first) and
/// which records every multicast send.
#[derive(Default)]
pub struct MockTransport {
    pub multicast_sent: Mutex<Vec<String>>,
    script: Mutex<Vec<Step>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue receive outcomes; the receiver consumes them back to front.
    pub fn script(&self, steps: Vec<Step>) {
        *self.script.lock().unwrap() = steps;
    }
}

impl Transport for MockTransport {
    fn send_multicast(
        &self,
        text: &str,
        _group: IpAddr,
        _port: u16,
        _interface: Option<Ipv4Addr>,
    ) -> Result<()> {
        self.multicast_sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn send_unicast(&self, _text: &str, _addr: IpAddr, _port: u16) -> Result<()> {
        Ok(())
    }

    fn create_unicast_sender(&self) -> Result<Box<dyn UnicastSender>> {
        Ok(Box::new(SilentUnicastSender))
    }

    fn open_receiver(&self, _binding: ReceiverBinding) -> Result<Box<dyn MulticastReceiver>> {
        let steps = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::new(ScriptedReceiver {
            steps: Mutex::new(steps),
        }))
    }
}

/// Unicast handle that never hears a reply.
struct SilentUnicastSender;

impl UnicastSender for SilentUnicastSender {
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
        Ok(None)
    }
}

struct ScriptedReceiver {
    steps: Mutex<Vec<Step>>,
}

impl MulticastReceiver for ScriptedReceiver {
    fn join_group(&self, _group: IpAddr, _interface: Option<Ipv4Addr>) -> Result<()> {
        Ok(())
    }

    fn leave_group(&self, _group: IpAddr, _interface: Option<Ipv4Addr>) -> Result<()> {
        Ok(())
    }

    fn receive(&self, _blocking: bool, _timeout: Duration) -> Result<Option<Datagram>> {
        let step = self.steps.lock().unwrap().pop();
        match step {
            Some(Step::Datagram(text)) => Ok(Some(Datagram {
                text: text.to_string(),
                source: remote_addr(),
            })),
            Some(Step::Timeout) => Ok(None),
            Some(Step::Error) | None => Err(SsdpError::Transport(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "script exhausted",
            ))),
        }
    }
}

/// The remote peer every scripted datagram appears to come from.
pub fn remote_addr() -> SocketAddr {
    SocketAddr::from(([192, 168, 1, 50], 50000))
}

/// Install the env-filter subscriber once so `RUST_LOG` works in tests.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Counts per-variant callbacks; optionally fails on alive messages.
#[derive(Default)]
pub struct RecordingHandler {
    pub alive: AtomicUsize,
    pub update: AtomicUsize,
    pub byebye: AtomicUsize,
    pub discover: AtomicUsize,
    pub discover_response: AtomicUsize,
    pub last_discover_remote: Mutex<Option<SocketAddr>>,
    pub fail_on_alive: bool,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on_alive() -> Arc<Self> {
        Arc::new(Self {
            fail_on_alive: true,
            ..Self::default()
        })
    }

    pub fn total(&self) -> usize {
        self.alive.load(Ordering::SeqCst)
            + self.update.load(Ordering::SeqCst)
            + self.byebye.load(Ordering::SeqCst)
            + self.discover.load(Ordering::SeqCst)
            + self.discover_response.load(Ordering::SeqCst)
    }
}

impl MessageHandler for RecordingHandler {
    fn on_alive(&self, _message: &AliveMessage) -> std::result::Result<(), HandlerError> {
        self.alive.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_alive {
            return Err("alive handler rejected the message".into());
        }
        Ok(())
    }

    fn on_update(&self, _message: &UpdateMessage) -> std::result::Result<(), HandlerError> {
        self.update.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_byebye(&self, _message: &ByeByeMessage) -> std::result::Result<(), HandlerError> {
        self.byebye.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_discover(
        &self,
        remote: Option<SocketAddr>,
        _message: &DiscoverMessage,
    ) -> std::result::Result<(), HandlerError> {
        self.discover.fetch_add(1, Ordering::SeqCst);
        *self.last_discover_remote.lock().unwrap() = remote;
        Ok(())
    }

    fn on_discover_response(
        &self,
        _message: &DiscoverResponseMessage,
    ) -> std::result::Result<(), HandlerError> {
        self.discover_response.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Raw alive text for a root device, as it would arrive off the wire.
pub const ALIVE_TEXT: &str = "NOTIFY * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    NT: upnp:rootdevice\r\n\
    NTS: ssdp:alive\r\n\
    LOCATION: http://192.168.1.10:9000/description.xml\r\n\
    USN: uuid:ABC::upnp:rootdevice\r\n\
    CACHE-CONTROL: max-age=1800\r\n\
    SERVER: Linux/6.1 UPnP/1.0 ssdp-rs/0.3\r\n\
    \r\n";

pub const MSEARCH_TEXT: &str = "M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    MX: 2\r\n\
    ST: upnp:rootdevice\r\n\
    \r\n";
