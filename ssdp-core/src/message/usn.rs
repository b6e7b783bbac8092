//! Unique Service Name handling.

use std::cmp::Ordering;
use std::fmt;

use crate::error::SsdpError;

/// Unique Service Name (USN): identifies one service instance across the
/// network, formed from a UUID and a URN joined by `::`.
///
/// Neither part is mandatory; an empty URN produces a UUID-only token.
/// The canonical form always carries the `uuid:` prefix.
///
/// # Example
///
/// ```
/// use ssdp_core::message::UsnInfo;
///
/// let usn = UsnInfo::parse("uuid:9dcf6222-fc4b-33eb-bf49-e54643b4f416::upnp:rootdevice").unwrap();
/// assert_eq!(usn.urn, "upnp:rootdevice");
/// assert_eq!(
///     usn.to_string(),
///     "uuid:9dcf6222-fc4b-33eb-bf49-e54643b4f416::upnp:rootdevice"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UsnInfo {
    /// Universally unique identifier, with or without the `uuid:` prefix.
    pub uuid: String,
    /// Uniform resource name, e.g. `urn:schemas-upnp-org:device:MediaServer:1`.
    pub urn: String,
}

impl UsnInfo {
    /// Create a USN from its two parts. Either may be empty.
    pub fn new(uuid: impl Into<String>, urn: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            urn: urn.into(),
        }
    }

    /// Parse a full USN token of the form `<uuid>::<urn>`.
    ///
    /// Fails with [`SsdpError::MalformedUsn`] when the `::` separator is
    /// absent.
    pub fn parse(token: &str) -> Result<Self, SsdpError> {
        let separator = token
            .find("::")
            .ok_or_else(|| SsdpError::MalformedUsn(token.to_string()))?;

        Ok(Self {
            uuid: token[..separator].to_string(),
            urn: token[separator + 2..].to_string(),
        })
    }

    fn canonical(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for UsnInfo {
    /// Canonical token: `uuid:` is prefixed onto the UUID when missing, and
    /// `::<urn>` is appended only when the URN is non-empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.uuid.to_ascii_lowercase().starts_with("uuid:") {
            write!(f, "uuid:")?;
        }
        write!(f, "{}", self.uuid)?;

        if !self.urn.is_empty() {
            write!(f, "::{}", self.urn)?;
        }
        Ok(())
    }
}

impl Ord for UsnInfo {
    /// Ordered by the canonical string form, ignoring ASCII case.
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl PartialOrd for UsnInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
