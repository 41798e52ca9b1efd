//! Core library for the httpfstream service.
//!
//! Streams file appends to many live-following readers in near-real-time.
//! A single writer at a time (enforced per path by [`registry::writer`])
//! appends bytes over an upgraded connection; every byte is fanned out to
//! the followers registered for that path ([`registry::follower`]) while
//! also being persisted through the [`store`] adapter. A follower that
//! attaches while nobody is writing gets a plain one-shot download
//! ([`static_serve`]); one that attaches while a writer is active gets the
//! persisted prefix followed by a live tail ([`session::follow`]).
//!
//! Quick start:
//! - Build an [`dispatch::Engine`] over a [`store::FsStore`] and call
//!   [`server::Server::bind`] to accept connections on a `TcpListener`.
//! - Use [`client::append`] / [`client::follow`] to drive the same
//!   protocol from the client side.
//! - Load tunables via [`config::load`]; initialize logging via
//!   [`logging::init`] or [`logging::init_stderr`].

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod path;
pub mod registry;
pub mod server;
pub mod session;
pub mod static_serve;
pub mod store;
pub mod transport;
