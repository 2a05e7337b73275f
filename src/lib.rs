//! DDNS Crab
//!
//! A small self-hosted dynamic DNS service: clients post a subdomain name (and optionally a
//! zone and address) to an HTTP form endpoint, and the resulting `A`/`AAAA` records are served
//! by a built-in authoritative DNS server.
//!
//! Updates are idempotent. Posting the same address twice leaves the record and its
//! timestamp untouched; posting a new address replaces the old one.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
#[doc(hidden)]
pub mod crab;
pub mod dns;
pub mod error;
pub mod record_store;
pub mod update;

use crate::record_store::{file, memory};
pub use api::new as new_http;
pub use config::{Config, Shared};
pub use dns::new as new_dns;
pub use file::FileRecordStore;
pub use memory::InMemoryRecordStore;
