//! Locally-advertised service descriptions.

use std::cmp::Ordering;
use std::fmt;

use super::usn::UsnInfo;

/// Describes one device or service advertised over the network.
///
/// Held in the controller's service registry; the periodic sender turns each
/// entry into `ssdp:alive` notifications, and the entries feed `byebye` and
/// `update` messages through the codec helpers.
///
/// # Example
///
/// ```
/// use ssdp_core::constants;
/// use ssdp_core::message::{ServiceInfo, UsnInfo};
///
/// let info = ServiceInfo::new(
///     constants::DEFAULT_IP,
///     constants::DEFAULT_PORT,
///     "upnp:rootdevice",
///     "http://127.0.0.1:9000/config",
///     UsnInfo::new("1acf6222-fc4b-33eb-bf49-e54643b4f416", "upnp:rootdevice"),
/// );
/// assert_eq!(info.location_path().as_deref(), Some("/config"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ServiceInfo {
    /// Multicast group the service advertises on.
    pub host: String,
    /// Multicast port the service advertises on.
    pub port: u16,
    /// Notification type (NT), e.g. `upnp:rootdevice`.
    pub nt: String,
    /// URL where the device publishes further description.
    pub location: String,
    /// Unique Service Name of this instance.
    pub usn: UsnInfo,
}

impl ServiceInfo {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        nt: impl Into<String>,
        location: impl Into<String>,
        usn: UsnInfo,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            nt: nt.into(),
            location: location.into(),
            usn,
        }
    }

    /// Path component of `location` when it is an `http://` URL.
    ///
    /// Returns `None` for non-`http://` locations, and an empty string for an
    /// `http://` URL without any path (e.g. `http://localhost:8080`).
    pub fn location_path(&self) -> Option<String> {
        let lower = self.location.to_ascii_lowercase();
        let rest = lower.strip_prefix("http://")?;

        match rest.find('/') {
            Some(index) => Some(self.location["http://".len() + index..].to_string()),
            None => Some(String::new()),
        }
    }

    fn canonical(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for ServiceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "host={}", self.host)?;
        writeln!(f, "port={}", self.port)?;
        writeln!(f, "nt={}", self.nt)?;
        writeln!(f, "location={}", self.location)?;
        writeln!(f, "usn={}", self.usn)
    }
}

impl Ord for ServiceInfo {
    /// Ordered by the canonical string form, ignoring ASCII case.
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl PartialOrd for ServiceInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn service_with_location(location: &str) -> ServiceInfo {
        ServiceInfo::new(
            "239.255.255.250",
            1900,
            "upnp:rootdevice",
            location,
            UsnInfo::new("1acf6222", "upnp:rootdevice"),
        )
    }

    #[rstest]
    #[case("http://127.0.0.1:9000/config", Some("/config"))]
    #[case("http://localhost:8080", Some(""))]
    #[case("http://localhost:8080/", Some("/"))]
    #[case("HTTP://localhost/a/b", Some("/a/b"))]
    #[case("https://localhost/secure", None)]
    #[case("ftp://localhost/file", None)]
    #[case("", None)]
    fn test_location_path(#[case] location: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            service_with_location(location).location_path().as_deref(),
            expected
        );
    }

    #[test]
    fn test_equality_is_field_wise() {
        let a = service_with_location("http://127.0.0.1:9000/config");
        let b = service_with_location("http://127.0.0.1:9000/config");
        assert_eq!(a, b);

        let mut c = b.clone();
        c.port = 1901;
        assert_ne!(a, c);
    }

    #[test]
    fn test_ordering_by_canonical_string() {
        let mut a = service_with_location("http://127.0.0.1:9000/config");
        let mut b = a.clone();
        a.nt = "upnp:rootdevice".to_string();
        b.nt = "urn:schemas-upnp-org:device:MediaServer:1".to_string();
        assert!(a < b);

        let upper = ServiceInfo {
            nt: a.nt.to_uppercase(),
            ..a.clone()
        };
        assert_eq!(a.cmp(&upper), Ordering::Equal);
    }
}
