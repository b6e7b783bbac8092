//! SSDP protocol engine.
//!
//! Implements the Simple Service Discovery Protocol: UDP-multicast-based
//! advertisement and discovery of network services, with no central
//! registry. This crate is the transport-agnostic core — the message model
//! and its text-wire codec, the dispatch controller, the shared lifecycle
//! state machine, the periodic-advertisement and discovery senders, and the
//! multicast receive loop. Sockets live behind the [`transport::Transport`]
//! trait; the companion `ssdp-network` crate provides the default blocking
//! UDP implementation.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ssdp_core::controller::SsdpController;
//! use ssdp_core::message::{ServiceInfo, UsnInfo};
//! use ssdp_core::transport::Transport;
//!
//! fn advertise(transport: Arc<dyn Transport>) {
//!     let controller = SsdpController::new(transport);
//!
//!     controller.add_service(ServiceInfo::new(
//!         "239.255.255.250",
//!         1900,
//!         "upnp:rootdevice",
//!         "http://192.168.1.10:9000/description.xml",
//!         UsnInfo::new("9dcf6222-fc4b-33eb-bf49-e54643b4f416", "upnp:rootdevice"),
//!     ));
//!     controller.advertise_services("max-age=1800", "Linux/6.1 UPnP/1.0 ssdp-rs/0.3");
//!
//!     controller.start();
//! }
//! ```
//!
//! Inbound flow: datagram → transport → [`handler::ResponseHandler`] →
//! [`message::SsdpMessage::decode`] → [`controller::SsdpController::process_message_from`]
//! → registered [`handler::MessageHandler`]s. Outbound flow: registry →
//! [`sender::MessageSupplier`] → encode → sender → transport.

pub mod constants;
pub mod controller;
pub mod discover;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod sender;
pub mod state;
pub mod transport;
pub mod worker;

pub use controller::{ControllerConfig, SsdpController};
pub use error::{Result, SsdpError};
pub use message::{ServiceInfo, SsdpMessage, UsnInfo};
pub use state::{State, StateHolder};
