//! Dynamic address record storage.
//!
//! Supports a generic interface for upserting one address per `(zone, name)` pair, and for
//! looking records up by FQDN when answering DNS queries.
//!
//! Two implementations are provided, [`memory::InMemoryRecordStore`] and
//! [`file::FileRecordStore`]. The former is not durable across restarts. The latter will write
//! its state to disk for each change and load this state again on startup.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use trust_dns_client::rr::{LowerName, Name};

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileRecordStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryRecordStore;

/// `DynRecordStore` is a type alias for a [`RecordStore`] that can be used by multiple
/// read/write consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the
/// [`RecordStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynRecordStore = Arc<RwLock<dyn RecordStore + Send + Sync>>;

/// The stored mapping from `name.zone` to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// A single DNS label, lower case.
    pub name: String,
    /// The fully qualified parent domain.
    pub zone: LowerName,
    pub address: IpAddr,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl Record {
    #[must_use]
    pub fn new(name: String, zone: LowerName, address: IpAddr, last_updated: OffsetDateTime) -> Self {
        Record {
            name,
            zone,
            address,
            last_updated,
        }
    }

    /// The name this record answers for in the [DNS server][crate::dns].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if `name.zone` isn't a valid DNS name.
    pub fn fqdn(&self) -> Result<LowerName, Error> {
        fqdn(&self.zone, &self.name)
    }
}

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated { previous: IpAddr },
    Unchanged,
}

impl UpsertOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated { .. } => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

/// The record as stored after an upsert, and what the upsert did to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub record: Record,
    pub outcome: UpsertOutcome,
}

/// Join a label onto a zone.
///
/// # Errors
///
/// Returns [`Error::DNSError`] if the label or the joined name is invalid, e.g. too long.
pub fn fqdn(zone: &LowerName, name: &str) -> Result<LowerName, Error> {
    let zone: Name = zone.into();
    Ok(Name::from_ascii(name)?.append_domain(&zone)?.into())
}

/// An async trait describing dynamic storage of address records, unique by `(zone, name)` and
/// served by FQDN in the [DNS API][crate::dns].
#[async_trait::async_trait]
pub trait RecordStore {
    /// Create the record for `(zone, name)`, or change its address if it differs. An unchanged
    /// address leaves the record, including its timestamp, as it was. Returns the stored record.
    async fn upsert(
        &mut self,
        zone: LowerName,
        name: String,
        address: IpAddr,
        now: OffsetDateTime,
    ) -> Result<Upserted, Error>;

    /// Get the record for `(zone, name)` (if any).
    async fn get(&self, zone: &LowerName, name: &str) -> Option<Record>;

    /// Get the record answering for `fqdn` (if any).
    async fn lookup(&self, fqdn: &LowerName) -> Option<Record>;

    /// All records, ordered by FQDN.
    async fn records(&self) -> Vec<Record>;
}
