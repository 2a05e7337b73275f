//! A JSON file-backed implementation of the [`RecordStore`][super::RecordStore] trait.
//!
//! Wraps a [`InMemoryRecordStore`][super::memory::InMemoryRecordStore] instance, persisting
//! changes to a JSON file on disk that can be reloaded across restarts.
use crate::error::Error;
use crate::record_store::memory::InMemoryRecordStore;
use crate::record_store::{fqdn, Record, RecordStore, UpsertOutcome, Upserted};
use std::io::ErrorKind;
use std::net::IpAddr;
use time::OffsetDateTime;
use tokio::fs::File;
use tokio::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use trust_dns_client::rr::LowerName;

/// A file-backed implementation of a dynamic record store. After each change a JSON file on
/// disk is replaced with the new data. This file can be reloaded across restarts to avoid
/// losing state.
///
/// Wraps a [`InMemoryRecordStore`][super::memory::InMemoryRecordStore], operating the same
/// way except for maintaining state beyond in-memory.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileRecordStore {
    record_store: InMemoryRecordStore,
    path: String,
}

impl FileRecordStore {
    /// Save the state of the record store as JSON to the store's configured path, or return an
    /// Error. The state is written to a sibling temporary file first and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if a record in the store can't be serialized to JSON.
    ///
    /// Returns [`Error::IO`] if the serialized state can't be written to the backing file path.
    pub async fn save(&self) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(&self.record_store)?;
        let tmp_path = format!("{}.tmp", self.path);
        let mut output_file = File::create(&tmp_path).await?;
        output_file.write_all(data.as_bytes()).await?;
        output_file.flush().await?;
        output_file.sync_all().await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Load a [`FileRecordStore`] from the JSON record state located at the given path, or
    /// return an Error. A missing file is created holding an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the JSON state file is invalid.
    ///
    /// Returns [`Error::IO`] if the path can't be opened or read.
    pub async fn try_from_file(p: &str) -> Result<Self, Error> {
        let contents = match File::open(p).await {
            Ok(mut f) => {
                let mut buf = vec![];
                f.read_to_end(&mut buf).await?;
                buf
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Self::write_empty_state(File::create(&p).await?).await?,
                _ => return Err(Error::IO(err)),
            },
        };

        let record_store: InMemoryRecordStore = serde_json::from_slice(&contents)?;
        tracing::debug!("loaded {} records from {p}", record_store.len());
        Ok(Self {
            path: p.to_string(),
            record_store,
        })
    }

    async fn write_empty_state(mut f: File) -> io::Result<Vec<u8>> {
        let default_data = serde_json::to_string_pretty(&InMemoryRecordStore::default())?;
        let default_bytes = default_data.as_bytes();
        f.write_all(default_bytes).await?;
        f.flush().await?;
        Ok(default_bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl RecordStore for FileRecordStore {
    async fn upsert(
        &mut self,
        zone: LowerName,
        name: String,
        address: IpAddr,
        now: OffsetDateTime,
    ) -> Result<Upserted, Error> {
        let key = fqdn(&zone, &name)?;
        let previous = self.record_store.snapshot(&key);
        let upserted = self.record_store.upsert(zone, name, address, now).await?;
        if upserted.outcome == UpsertOutcome::Unchanged {
            return Ok(upserted);
        }
        if let Err(err) = self.save().await {
            tracing::error!("failed to persist record state to {}: {err:?}", self.path);
            self.record_store.restore(key, previous);
            return Err(err);
        }
        Ok(upserted)
    }

    async fn get(&self, zone: &LowerName, name: &str) -> Option<Record> {
        self.record_store.get(zone, name).await
    }

    async fn lookup(&self, fqdn: &LowerName) -> Option<Record> {
        self.record_store.lookup(fqdn).await
    }

    async fn records(&self) -> Vec<Record> {
        self.record_store.records().await
    }
}
