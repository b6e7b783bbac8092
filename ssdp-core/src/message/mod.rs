//! SSDP message model and text-wire codec.
//!
//! The wire format is line-oriented: CRLF-terminated header lines, a first
//! line identifying the message shape (`NOTIFY * HTTP/1.1`,
//! `M-SEARCH * HTTP/1.1` or `HTTP/1.1 200 OK`), and a terminating blank
//! line. [`SsdpMessage::decode`] classifies inbound text; each message's
//! `Display` implementation is the encoder.
//!
//! Header lines that the grammar does not recognize are preserved in order
//! in each message's `attributes` and re-emitted verbatim on encode, so a
//! decode/encode round trip is lossless.

mod codec;
mod service;
mod usn;

pub use codec::{alive_for_service, byebye_for_service, decode, update_for_service};
pub use service::ServiceInfo;
pub use usn::UsnInfo;

use std::fmt;

use crate::constants;

/// A keep-alive advertisement (`NTS: ssdp:alive`), sent periodically while a
/// service is available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliveMessage {
    pub host: String,
    pub port: u16,
    pub nt: String,
    pub usn: String,
    pub location: String,
    pub cache_control: String,
    pub server: String,
    /// Unrecognized header lines, in original order.
    pub attributes: Vec<String>,
}

/// A departure notification (`NTS: ssdp:byebye`), sent when a service leaves
/// the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByeByeMessage {
    pub host: String,
    pub port: u16,
    pub nt: String,
    pub usn: String,
    pub content_length: String,
    /// Unrecognized header lines, in original order.
    pub attributes: Vec<String>,
}

/// An advertisement update (`NTS: ssdp:update`), sent when a service's
/// details change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateMessage {
    pub host: String,
    pub port: u16,
    pub nt: String,
    pub usn: String,
    pub location: String,
    pub cache_control: String,
    pub server: String,
    /// Unrecognized header lines, in original order.
    pub attributes: Vec<String>,
}

/// A discovery request (M-SEARCH), multicast by control points searching for
/// devices and services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverMessage {
    pub host: String,
    /// Target port; the encoder falls back to the default SSDP port when
    /// unset.
    pub port: Option<u16>,
    /// Search target (ST), e.g. `upnp:rootdevice` or `ssdp:all`.
    pub st: String,
    /// Maximum response wait hint in seconds (MX).
    pub mx: Option<u32>,
    /// Unrecognized header lines, in original order.
    pub attributes: Vec<String>,
}

impl DiscoverMessage {
    /// Build a discovery request for `st`, advertising `mx` seconds as the
    /// maximum response wait.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        mx: u32,
        st: impl Into<String>,
        attributes: Vec<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
            st: st.into(),
            mx: Some(mx),
            attributes,
        }
    }
}

/// A unicast reply to a discovery request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverResponseMessage {
    pub cache_control: String,
    pub date: String,
    pub location: String,
    pub server: String,
    pub st: String,
    pub ext: String,
    pub usn: String,
    pub content_length: String,
    /// Unrecognized header lines, in original order.
    pub attributes: Vec<String>,
}

/// The closed set of SSDP message shapes.
///
/// Produced by [`SsdpMessage::decode`] or by explicit construction; encoded
/// through `Display`. Every encoder is deterministic given the fields and
/// terminates the message with a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsdpMessage {
    Alive(AliveMessage),
    ByeBye(ByeByeMessage),
    Update(UpdateMessage),
    Discover(DiscoverMessage),
    DiscoverResponse(DiscoverResponseMessage),
}

impl SsdpMessage {
    /// Parse raw datagram text into a message.
    ///
    /// Returns `None` for anything the grammar cannot classify; unparseable
    /// traffic is logged and dropped, never an error.
    pub fn decode(text: &str) -> Option<Self> {
        codec::decode(text)
    }
}

impl fmt::Display for SsdpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsdpMessage::Alive(m) => m.fmt(f),
            SsdpMessage::ByeBye(m) => m.fmt(f),
            SsdpMessage::Update(m) => m.fmt(f),
            SsdpMessage::Discover(m) => m.fmt(f),
            SsdpMessage::DiscoverResponse(m) => m.fmt(f),
        }
    }
}

impl From<AliveMessage> for SsdpMessage {
    fn from(m: AliveMessage) -> Self {
        SsdpMessage::Alive(m)
    }
}

impl From<ByeByeMessage> for SsdpMessage {
    fn from(m: ByeByeMessage) -> Self {
        SsdpMessage::ByeBye(m)
    }
}

impl From<UpdateMessage> for SsdpMessage {
    fn from(m: UpdateMessage) -> Self {
        SsdpMessage::Update(m)
    }
}

impl From<DiscoverMessage> for SsdpMessage {
    fn from(m: DiscoverMessage) -> Self {
        SsdpMessage::Discover(m)
    }
}

impl From<DiscoverResponseMessage> for SsdpMessage {
    fn from(m: DiscoverResponseMessage) -> Self {
        SsdpMessage::DiscoverResponse(m)
    }
}

fn write_attributes(f: &mut fmt::Formatter<'_>, attributes: &[String]) -> fmt::Result {
    for attribute in attributes {
        write!(f, "{attribute}\r\n")?;
    }
    Ok(())
}

impl fmt::Display for AliveMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", constants::NOTIFY_LINE)?;
        write!(f, "{} {}:{}\r\n", constants::HOST, self.host, self.port)?;
        write!(f, "{} {}\r\n", constants::NT, self.nt)?;
        write!(f, "{} {}\r\n", constants::NTS, constants::NTS_ALIVE)?;
        write!(f, "{} {}\r\n", constants::LOCATION, self.location)?;
        write!(f, "{} {}\r\n", constants::USN, self.usn)?;
        write!(f, "{} {}\r\n", constants::CACHE_CONTROL, self.cache_control)?;
        write!(f, "{} {}\r\n", constants::SERVER, self.server)?;
        write_attributes(f, &self.attributes)?;
        write!(f, "\r\n")
    }
}

impl fmt::Display for ByeByeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", constants::NOTIFY_LINE)?;
        write!(f, "{} {}:{}\r\n", constants::HOST, self.host, self.port)?;
        write!(f, "{} {}\r\n", constants::NT, self.nt)?;
        write!(f, "{} {}\r\n", constants::NTS, constants::NTS_BYEBYE)?;
        write!(f, "{} {}\r\n", constants::USN, self.usn)?;
        write!(f, "{} {}\r\n", constants::CONTENT_LENGTH, self.content_length)?;
        write_attributes(f, &self.attributes)?;
        write!(f, "\r\n")
    }
}

impl fmt::Display for UpdateMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", constants::NOTIFY_LINE)?;
        write!(f, "{} {}:{}\r\n", constants::HOST, self.host, self.port)?;
        write!(f, "{} {}\r\n", constants::NT, self.nt)?;
        write!(f, "{} {}\r\n", constants::NTS, constants::NTS_UPDATE)?;
        write!(f, "{} {}\r\n", constants::LOCATION, self.location)?;
        write!(f, "{} {}\r\n", constants::USN, self.usn)?;
        write!(f, "{} {}\r\n", constants::CACHE_CONTROL, self.cache_control)?;
        write!(f, "{} {}\r\n", constants::SERVER, self.server)?;
        write_attributes(f, &self.attributes)?;
        write!(f, "\r\n")
    }
}

impl fmt::Display for DiscoverMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = self.port.unwrap_or(constants::DEFAULT_PORT);

        write!(f, "{}\r\n", constants::MSEARCH_LINE)?;
        write!(f, "{} {}:{}\r\n", constants::HOST, self.host, port)?;
        write!(f, "{} {}\r\n", constants::MAN, constants::MAN_DISCOVER)?;
        if let Some(mx) = self.mx {
            write!(f, "{} {}\r\n", constants::MX, mx)?;
        }
        write!(f, "{} {}\r\n", constants::ST, self.st)?;
        write_attributes(f, &self.attributes)?;
        write!(f, "\r\n")
    }
}

impl fmt::Display for DiscoverResponseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", constants::OK_LINE)?;
        write!(f, "{} {}\r\n", constants::CACHE_CONTROL, self.cache_control)?;
        write!(f, "{} {}\r\n", constants::DATE, self.date)?;
        write!(f, "{} {}\r\n", constants::LOCATION, self.location)?;
        write!(f, "{} {}\r\n", constants::SERVER, self.server)?;
        write!(f, "{} {}\r\n", constants::ST, self.st)?;
        write!(f, "{} {}\r\n", constants::EXT, self.ext)?;
        write!(f, "{} {}\r\n", constants::USN, self.usn)?;
        write!(f, "{} {}\r\n", constants::CONTENT_LENGTH, self.content_length)?;
        write_attributes(f, &self.attributes)?;
        write!(f, "\r\n")
    }
}
