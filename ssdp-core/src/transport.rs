//! Transport interface consumed by the engine.
//!
//! The engine never opens sockets itself: senders and the listener receive a
//! [`Transport`] at construction and treat every operation failure as
//! recoverable unless documented otherwise. The `ssdp-network` crate ships
//! the default blocking UDP implementation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::Result;

/// One received datagram: payload text plus its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub text: String,
    pub source: SocketAddr,
}

/// Where a multicast receiver binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverBinding {
    /// Bind the wildcard address on this port.
    Port(u16),
    /// Bind this exact socket address.
    Address(SocketAddr),
}

/// Datagram plumbing the engine depends on.
pub trait Transport: Send + Sync {
    /// Multicast `text` to `group:port`, optionally through one local
    /// interface (identified by its IPv4 address).
    fn send_multicast(
        &self,
        text: &str,
        group: IpAddr,
        port: u16,
        interface: Option<Ipv4Addr>,
    ) -> Result<()>;

    /// Send `text` to `addr:port` from an ephemeral socket.
    fn send_unicast(&self, text: &str, addr: IpAddr, port: u16) -> Result<()>;

    /// Create a reusable unicast handle for request/response exchanges.
    fn create_unicast_sender(&self) -> Result<Box<dyn UnicastSender>>;

    /// One-shot request/response: send `text` and wait up to `ttl` for a
    /// single reply on a fresh handle. `Ok(None)` means no reply arrived.
    fn send_unicast_awaiting_reply(
        &self,
        text: &str,
        addr: IpAddr,
        port: u16,
        ttl: Duration,
    ) -> Result<Option<Datagram>> {
        self.create_unicast_sender()?
            .send_awaiting_reply(text, addr, port, ttl)
    }

    /// Open a receiver for multicast traffic on `binding`.
    fn open_receiver(&self, binding: ReceiverBinding) -> Result<Box<dyn MulticastReceiver>>;
}

/// A unicast socket handle that can wait for a single reply per send.
pub trait UnicastSender: Send + Sync {
    /// Fire-and-forget send.
    fn send(&self, text: &str, addr: IpAddr, port: u16) -> Result<()>;

    /// Send `text` and wait up to `ttl` for one reply datagram.
    ///
    /// `Ok(None)` means the window elapsed with no reply, which is not an
    /// error.
    fn send_awaiting_reply(
        &self,
        text: &str,
        addr: IpAddr,
        port: u16,
        ttl: Duration,
    ) -> Result<Option<Datagram>>;
}

/// A bound socket that has joined one or more multicast groups.
pub trait MulticastReceiver: Send {
    /// Join `group`, optionally on one local interface.
    fn join_group(&self, group: IpAddr, interface: Option<Ipv4Addr>) -> Result<()>;

    /// Leave a previously joined group.
    fn leave_group(&self, group: IpAddr, interface: Option<Ipv4Addr>) -> Result<()>;

    /// Receive one datagram.
    ///
    /// In blocking mode this waits indefinitely. Otherwise it waits up to
    /// `timeout` and returns `Ok(None)` when nothing arrived.
    fn receive(&self, blocking: bool, timeout: Duration) -> Result<Option<Datagram>>;
}
