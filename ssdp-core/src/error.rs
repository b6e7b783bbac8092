//! Error types for the SSDP engine.

use thiserror::Error;

/// Errors surfaced by the SSDP engine.
///
/// Two conditions are deliberately *not* errors: text that the codec cannot
/// classify decodes to `None`, and an M-SEARCH reply window elapsing without
/// a response yields `Ok(None)` from the transport.
#[derive(Error, Debug)]
pub enum SsdpError {
    /// A USN token could not be split into UUID and URN.
    #[error("malformed USN {0:?}: missing \"::\" separator")]
    MalformedUsn(String),

    /// A multicast group or unicast target could not be parsed as an address.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// A socket-level operation failed.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// An application message handler failed during dispatch.
    ///
    /// Dispatch of the message stops at the failing handler; handlers
    /// registered after it are not invoked for that message.
    #[error("message handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SsdpError>;
