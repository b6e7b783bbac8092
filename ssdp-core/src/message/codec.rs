//! Wire-text decoding and message construction helpers.

use tracing::{debug, trace};

use crate::constants;

use super::{
    AliveMessage, ByeByeMessage, DiscoverMessage, DiscoverResponseMessage, ServiceInfo,
    SsdpMessage, UpdateMessage,
};

/// Match `line` against a header tag, case-insensitively, returning the
/// trimmed value after the tag.
fn header_value<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    if line.len() >= tag.len() && line[..tag.len()].eq_ignore_ascii_case(tag) {
        Some(line[tag.len()..].trim())
    } else {
        None
    }
}

/// Header fields accumulated while scanning one message.
#[derive(Default)]
struct Headers {
    cache_control: String,
    date: String,
    location: String,
    server: String,
    st: String,
    ext: String,
    usn: String,
    content_length: String,
    host: String,
    port: Option<u16>,
    nt: String,
    nts: String,
    mx: Option<u32>,
    attributes: Vec<String>,
}

/// Parse raw datagram text into a message.
///
/// Line 0 selects the shape: an `M-SEARCH` request line yields
/// [`SsdpMessage::Discover`], a `200 OK` status line yields
/// [`SsdpMessage::DiscoverResponse`], and otherwise the `NTS` header picks
/// the NOTIFY variant. Anything else is logged and dropped (`None`), never
/// an error.
pub fn decode(text: &str) -> Option<SsdpMessage> {
    if text.trim().is_empty() {
        return None;
    }

    let mut first_line = "";
    let mut headers = Headers::default();

    for (index, line) in text.lines().enumerate() {
        if index == 0 {
            first_line = line.trim();
            continue;
        }

        if let Some(value) = header_value(line, constants::CACHE_CONTROL) {
            headers.cache_control = value.to_string();
        } else if let Some(value) = header_value(line, constants::DATE) {
            headers.date = value.to_string();
        } else if let Some(value) = header_value(line, constants::LOCATION) {
            headers.location = value.to_string();
        } else if let Some(value) = header_value(line, constants::SERVER) {
            headers.server = value.to_string();
        } else if let Some(value) = header_value(line, constants::ST) {
            headers.st = value.to_string();
        } else if let Some(value) = header_value(line, constants::EXT) {
            headers.ext = value.to_string();
        } else if let Some(value) = header_value(line, constants::USN) {
            headers.usn = value.to_string();
        } else if let Some(value) = header_value(line, constants::CONTENT_LENGTH) {
            headers.content_length = value.to_string();
        } else if let Some(value) = header_value(line, constants::HOST) {
            // Split off the port; substitute the default when absent.
            match value.split_once(':') {
                Some((host, port)) => {
                    headers.host = host.to_string();
                    headers.port = Some(
                        port.trim()
                            .parse()
                            .unwrap_or(constants::DEFAULT_PORT),
                    );
                }
                None => {
                    headers.host = value.to_string();
                    headers.port = Some(constants::DEFAULT_PORT);
                }
            }
        } else if let Some(value) = header_value(line, constants::NTS) {
            headers.nts = value.to_string();
        } else if let Some(value) = header_value(line, constants::NT) {
            headers.nt = value.to_string();
        } else if let Some(value) = header_value(line, constants::MX) {
            headers.mx = value.parse().ok();
        } else if header_value(line, constants::MAN).is_some() {
            // Recognized but carries no message state.
        } else if !line.trim().is_empty() {
            headers.attributes.push(line.trim_end().to_string());
        }
    }

    if first_line
        .get(.."M-SEARCH".len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("M-SEARCH"))
    {
        return Some(SsdpMessage::Discover(DiscoverMessage {
            host: headers.host,
            port: headers.port,
            st: headers.st,
            mx: headers.mx,
            attributes: headers.attributes,
        }));
    }

    if first_line.eq_ignore_ascii_case(constants::OK_LINE) {
        return Some(SsdpMessage::DiscoverResponse(DiscoverResponseMessage {
            cache_control: headers.cache_control,
            date: headers.date,
            location: headers.location,
            server: headers.server,
            st: headers.st,
            ext: headers.ext,
            usn: headers.usn,
            content_length: headers.content_length,
            attributes: headers.attributes,
        }));
    }

    if !headers.nts.is_empty() {
        let port = headers.port.unwrap_or(constants::DEFAULT_PORT);

        return match headers.nts.as_str() {
            constants::NTS_ALIVE => Some(SsdpMessage::Alive(AliveMessage {
                host: headers.host,
                port,
                nt: headers.nt,
                usn: headers.usn,
                location: headers.location,
                cache_control: headers.cache_control,
                server: headers.server,
                attributes: headers.attributes,
            })),
            constants::NTS_UPDATE => Some(SsdpMessage::Update(UpdateMessage {
                host: headers.host,
                port,
                nt: headers.nt,
                usn: headers.usn,
                location: headers.location,
                cache_control: headers.cache_control,
                server: headers.server,
                attributes: headers.attributes,
            })),
            constants::NTS_BYEBYE => Some(SsdpMessage::ByeBye(ByeByeMessage {
                host: headers.host,
                port,
                nt: headers.nt,
                usn: headers.usn,
                content_length: headers.content_length,
                attributes: headers.attributes,
            })),
            other => {
                debug!(nts = other, "NOTIFY message with unrecognized NTS dropped");
                None
            }
        };
    }

    trace!("unclassifiable SSDP text dropped");
    None
}

/// Build an `ssdp:alive` notification advertising `info`.
///
/// `CACHE-CONTROL` and `SERVER` are left empty for the caller to fill in.
pub fn alive_for_service(info: &ServiceInfo) -> AliveMessage {
    AliveMessage {
        host: info.host.clone(),
        port: info.port,
        nt: info.nt.clone(),
        usn: info.usn.to_string(),
        location: info.location.clone(),
        ..AliveMessage::default()
    }
}

/// Build an `ssdp:update` notification for `info`.
pub fn update_for_service(info: &ServiceInfo) -> UpdateMessage {
    UpdateMessage {
        host: info.host.clone(),
        port: info.port,
        nt: info.nt.clone(),
        usn: info.usn.to_string(),
        ..UpdateMessage::default()
    }
}

/// Build an `ssdp:byebye` notification announcing the departure of `info`.
pub fn byebye_for_service(info: &ServiceInfo) -> ByeByeMessage {
    ByeByeMessage {
        host: info.host.clone(),
        port: info.port,
        nt: info.nt.clone(),
        usn: info.usn.to_string(),
        content_length: "0".to_string(),
        ..ByeByeMessage::default()
    }
}
