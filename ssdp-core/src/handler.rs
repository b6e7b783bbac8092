//! Handler contracts and the default raw-text handlers.

use std::net::SocketAddr;
use std::sync::Weak;

use tracing::debug;

use crate::controller::SsdpController;
use crate::error::Result;
use crate::message::{
    AliveMessage, ByeByeMessage, DiscoverMessage, DiscoverResponseMessage, SsdpMessage,
    UpdateMessage,
};

/// Error type for application message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Application-side sink for dispatched messages, one method per inbound
/// variant.
///
/// Every method defaults to a logged no-op, so implementors only override
/// the variants they care about. Handlers are invoked from multiple
/// components concurrently and must be thread-safe.
///
/// A handler error aborts dispatch of that message to handlers registered
/// after it; see [`SsdpController::process_message`].
pub trait MessageHandler: Send + Sync {
    fn on_alive(&self, message: &AliveMessage) -> std::result::Result<(), HandlerError> {
        debug!(usn = %message.usn, "unhandled ssdp:alive");
        Ok(())
    }

    fn on_update(&self, message: &UpdateMessage) -> std::result::Result<(), HandlerError> {
        debug!(usn = %message.usn, "unhandled ssdp:update");
        Ok(())
    }

    fn on_byebye(&self, message: &ByeByeMessage) -> std::result::Result<(), HandlerError> {
        debug!(usn = %message.usn, "unhandled ssdp:byebye");
        Ok(())
    }

    fn on_discover(
        &self,
        remote: Option<SocketAddr>,
        message: &DiscoverMessage,
    ) -> std::result::Result<(), HandlerError> {
        debug!(?remote, st = %message.st, "unhandled M-SEARCH");
        Ok(())
    }

    fn on_discover_response(
        &self,
        message: &DiscoverResponseMessage,
    ) -> std::result::Result<(), HandlerError> {
        debug!(usn = %message.usn, "unhandled M-SEARCH response");
        Ok(())
    }
}

/// Sink for raw datagram text, before any decoding.
///
/// The multicast listener and the discover sender's reply path both feed
/// one of these.
pub trait ResponseHandler: Send + Sync {
    /// Handle text whose sender is unknown.
    fn handle(&self, text: &str) -> Result<()>;

    /// Handle text received from `source`.
    fn handle_from(&self, source: SocketAddr, text: &str) -> Result<()>;
}

/// Decodes raw text and routes the message into a controller.
///
/// Holds the controller weakly: the controller owns its components, which
/// own their handlers, and this back-edge must not keep the controller
/// alive. Text received after the controller is gone is dropped.
pub struct ControllerResponseHandler {
    controller: Weak<SsdpController>,
}

impl ControllerResponseHandler {
    pub(crate) fn new(controller: Weak<SsdpController>) -> Self {
        Self { controller }
    }

    fn dispatch(&self, source: Option<SocketAddr>, text: &str) -> Result<()> {
        let Some(message) = SsdpMessage::decode(text) else {
            return Ok(());
        };
        let Some(controller) = self.controller.upgrade() else {
            debug!("controller dropped, message discarded");
            return Ok(());
        };
        controller.process_message_from(source, &message)
    }
}

impl ResponseHandler for ControllerResponseHandler {
    fn handle(&self, text: &str) -> Result<()> {
        self.dispatch(None, text)
    }

    fn handle_from(&self, source: SocketAddr, text: &str) -> Result<()> {
        self.dispatch(Some(source), text)
    }
}

/// [`ControllerResponseHandler`] variant for M-SEARCH reply traffic.
///
/// A discover sender can hear its own requests echoed back; those are
/// dropped here instead of being dispatched.
pub struct DiscoverResponseHandler {
    inner: ControllerResponseHandler,
}

impl DiscoverResponseHandler {
    pub(crate) fn new(controller: Weak<SsdpController>) -> Self {
        Self {
            inner: ControllerResponseHandler::new(controller),
        }
    }
}

impl ResponseHandler for DiscoverResponseHandler {
    fn handle(&self, text: &str) -> Result<()> {
        if text.starts_with("M-SEARCH") {
            return Ok(());
        }
        self.inner.handle(text)
    }

    fn handle_from(&self, source: SocketAddr, text: &str) -> Result<()> {
        if text.starts_with("M-SEARCH") {
            return Ok(());
        }
        self.inner.handle_from(source, text)
    }
}
