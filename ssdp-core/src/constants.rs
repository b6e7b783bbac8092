//! Wire-format constants shared across the engine.
//!
//! Header tags carry their trailing colon so they can be matched and emitted
//! verbatim. NTS values identify the lifecycle event of a NOTIFY message.

/// Multicast group reserved for SSDP by IANA.
pub const DEFAULT_IP: &str = "239.255.255.250";

/// Default SSDP port, assumed when a `HOST` header carries no port.
pub const DEFAULT_PORT: u16 = 1900;

/// Default delay between periodic send cycles, in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 5000;

/// Default timeout for non-blocking receives, in milliseconds.
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 3000;

/// Default wait for a reply to a single M-SEARCH datagram, in seconds.
pub const DEFAULT_DISCOVER_TTL_SECS: u64 = 3;

/// First line of every NOTIFY message.
pub const NOTIFY_LINE: &str = "NOTIFY * HTTP/1.1";

/// First line of a discovery request.
pub const MSEARCH_LINE: &str = "M-SEARCH * HTTP/1.1";

/// First line of a discovery response.
pub const OK_LINE: &str = "HTTP/1.1 200 OK";

pub const CACHE_CONTROL: &str = "CACHE-CONTROL:";
pub const DATE: &str = "DATE:";
pub const LOCATION: &str = "LOCATION:";
pub const SERVER: &str = "SERVER:";
pub const ST: &str = "ST:";
pub const EXT: &str = "EXT:";
pub const USN: &str = "USN:";
pub const CONTENT_LENGTH: &str = "CONTENT-LENGTH:";
pub const HOST: &str = "HOST:";
pub const NT: &str = "NT:";
pub const NTS: &str = "NTS:";
pub const MAN: &str = "MAN:";
pub const MX: &str = "MX:";

/// NTS value of a keep-alive advertisement.
pub const NTS_ALIVE: &str = "ssdp:alive";

/// NTS value sent when a service leaves the network.
pub const NTS_BYEBYE: &str = "ssdp:byebye";

/// NTS value of an advertisement update.
pub const NTS_UPDATE: &str = "ssdp:update";

/// MAN value of a discovery request. The quotes are part of the wire format.
pub const MAN_DISCOVER: &str = "\"ssdp:discover\"";

/// Search target matching every device and service.
pub const ST_ALL: &str = "ssdp:all";

/// Search target matching root devices only.
pub const ST_ROOT_DEVICE: &str = "upnp:rootdevice";
