//! Core domain + application logic for the kawaii-keeper image-feed bot.
//!
//! This crate is intentionally framework-agnostic. Telegram, the image catalog
//! API and durable storage live behind ports (traits) implemented in adapter
//! crates.

pub mod callbacks;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod paging;
pub mod ports;
pub mod store;

pub use errors::{Error, Result};

#[cfg(test)]
pub(crate) mod testing;
