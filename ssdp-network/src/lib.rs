//! Default blocking UDP transport for the `ssdp-core` engine.
//!
//! Sockets are built through `socket2` so the listener port can be shared
//! with other SSDP stacks on the same machine (`SO_REUSEADDR`), then
//! converted into `std::net::UdpSocket` for plain blocking I/O.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace};

use ssdp_core::error::Result;
use ssdp_core::transport::{
    Datagram, MulticastReceiver, ReceiverBinding, Transport, UnicastSender,
};

/// Receive buffer for one datagram. SSDP messages are a handful of header
/// lines; 2 KiB leaves room for vendor attributes.
const RECV_BUFFER_SIZE: usize = 2048;

/// Blocking UDP implementation of the engine's transport interface.
#[derive(Debug, Default)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        Self
    }
}

fn ephemeral_socket() -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0).into())?;
    Ok(socket)
}

impl Transport for UdpTransport {
    fn send_multicast(
        &self,
        text: &str,
        group: IpAddr,
        port: u16,
        interface: Option<Ipv4Addr>,
    ) -> Result<()> {
        let socket = ephemeral_socket()?;
        if let Some(interface) = interface {
            socket.set_multicast_if_v4(&interface)?;
        }

        let socket: UdpSocket = socket.into();
        debug!(%group, port, "sending multicast datagram");
        socket.send_to(text.as_bytes(), SocketAddr::new(group, port))?;
        Ok(())
    }

    fn send_unicast(&self, text: &str, addr: IpAddr, port: u16) -> Result<()> {
        let socket: UdpSocket = ephemeral_socket()?.into();
        debug!(%addr, port, "sending unicast datagram");
        socket.send_to(text.as_bytes(), SocketAddr::new(addr, port))?;
        Ok(())
    }

    fn create_unicast_sender(&self) -> Result<Box<dyn UnicastSender>> {
        Ok(Box::new(UdpUnicastSender {
            socket: ephemeral_socket()?.into(),
        }))
    }

    fn open_receiver(&self, binding: ReceiverBinding) -> Result<Box<dyn MulticastReceiver>> {
        let bind_addr = match binding {
            ReceiverBinding::Port(port) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port),
            ReceiverBinding::Address(addr) => addr,
        };

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&bind_addr.into())?;

        debug!(%bind_addr, "multicast receiver bound");
        Ok(Box::new(UdpMulticastReceiver {
            socket: socket.into(),
        }))
    }
}

/// Reusable unicast handle; one socket serves every send and its reply wait.
pub struct UdpUnicastSender {
    socket: UdpSocket,
}

impl UnicastSender for UdpUnicastSender {
    fn send(&self, text: &str, addr: IpAddr, port: u16) -> Result<()> {
        self.socket
            .send_to(text.as_bytes(), SocketAddr::new(addr, port))?;
        Ok(())
    }

    fn send_awaiting_reply(
        &self,
        text: &str,
        addr: IpAddr,
        port: u16,
        ttl: Duration,
    ) -> Result<Option<Datagram>> {
        self.socket.set_read_timeout(Some(ttl))?;
        self.socket
            .send_to(text.as_bytes(), SocketAddr::new(addr, port))?;

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        match self.socket.recv_from(&mut buffer) {
            Ok((length, source)) => Ok(Some(Datagram {
                text: String::from_utf8_lossy(&buffer[..length]).into_owned(),
                source,
            })),
            Err(e) if is_timeout(&e) => {
                trace!(%addr, port, "no reply within {ttl:?}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Bound multicast socket; membership is managed per group and interface.
pub struct UdpMulticastReceiver {
    socket: UdpSocket,
}

impl MulticastReceiver for UdpMulticastReceiver {
    fn join_group(&self, group: IpAddr, interface: Option<Ipv4Addr>) -> Result<()> {
        match group {
            IpAddr::V4(group) => {
                let interface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
                self.socket.join_multicast_v4(&group, &interface)?;
            }
            IpAddr::V6(group) => {
                self.socket.join_multicast_v6(&group, 0)?;
            }
        }
        debug!(%group, "joined multicast group");
        Ok(())
    }

    fn leave_group(&self, group: IpAddr, interface: Option<Ipv4Addr>) -> Result<()> {
        match group {
            IpAddr::V4(group) => {
                let interface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
                self.socket.leave_multicast_v4(&group, &interface)?;
            }
            IpAddr::V6(group) => {
                self.socket.leave_multicast_v6(&group, 0)?;
            }
        }
        debug!(%group, "left multicast group");
        Ok(())
    }

    fn receive(&self, blocking: bool, timeout: Duration) -> Result<Option<Datagram>> {
        if blocking {
            self.socket.set_read_timeout(None)?;
        } else {
            self.socket.set_read_timeout(Some(timeout))?;
        }

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        match self.socket.recv_from(&mut buffer) {
            Ok((length, source)) => Ok(Some(Datagram {
                text: String::from_utf8_lossy(&buffer[..length]).into_owned(),
                source,
            })),
            Err(e) if !blocking && is_timeout(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
