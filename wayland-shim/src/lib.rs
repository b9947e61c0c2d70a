//! In-process emulation of the Wayland client protocol
//!
//! This crate lets an application written against the Wayland client API run without a
//! compositor. Requests sent by the application are answered locally: objects are created in
//! a per-connection arena, the events a compositor would send in reply are synthesized into a
//! bounded queue, and the visible side effects (presenting a buffer, creating a window,
//! drawing decorations) are forwarded to a [`Host`][host::Host]. The host is whatever event
//! loop drives the application, and feeds back input and frame notifications.
//!
//! The entry point is [`Connection`][client::Connection], which stands for the `wl_display`.
//! Objects are manipulated through [`Proxy`][client::Proxy] handles, and events are delivered
//! to the [`Listener`][client::Listener] of their target when the connection is dispatched.
//!
//! ```
//! use wayland_shim::{client::Connection, config::Config};
//!
//! let (connection, _host) = Connection::connect_headless(Config::default());
//! let registry = connection.display().send_request("get_registry", [
//!     wayland_shim::protocol::Argument::NewId(wayland_shim::client::ObjectId::null()),
//! ]);
//! assert!(matches!(registry, Ok(Some(_))));
//! // one `global` event per advertised global
//! assert_eq!(connection.pending_events(), 5);
//! ```
//!
//! ## Logging
//!
//! This crate can generate some runtime error message (notably when an event cannot be queued).
//! By default those messages are piped through the `log` crate. If you deactivate the `log`
//! cargo feature, they will instead be printed to stderr.
//!
//! Setting the `WAYLAND_DEBUG` environment variable to `1` or `client` traces every request and
//! event to stderr, in the same format as libwayland.

#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(unstable_coverage, feature(coverage_attribute))]
// Doc feature labels can be tested locally by running RUSTDOCFLAGS="--cfg=docsrs" cargo +nightly doc -p <crate>
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

/// Reexport of the `smallvec` crate, which is part of `wayland-shim`'s public API.
pub extern crate smallvec;

// internal imports for dispatching logging depending on the `log` feature
#[cfg(feature = "log")]
#[allow(unused_imports)]
use log::{debug as log_debug, error as log_error, info as log_info, warn as log_warn};
#[cfg(not(feature = "log"))]
#[allow(unused_imports)]
use std::{
    eprintln as log_error, eprintln as log_warn, eprintln as log_info, eprintln as log_debug,
};

pub mod client;
pub mod codec;
pub mod config;
mod debug;
pub mod host;
pub mod interfaces;
mod map;
pub mod protocol;
mod queue;
pub mod types;
pub mod xkb;

#[cfg(test)]
mod test;
