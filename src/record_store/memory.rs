use crate::error::Error;
use crate::record_store::{fqdn, Record, RecordStore, UpsertOutcome, Upserted};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::IpAddr;
use time::OffsetDateTime;
use trust_dns_client::rr::LowerName;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryRecordStore {
    records: HashMap<LowerName, Record>,
}

impl InMemoryRecordStore {
    pub(super) fn restore(&mut self, key: LowerName, previous: Option<Record>) {
        match previous {
            Some(record) => self.records.insert(key, record),
            None => self.records.remove(&key),
        };
    }

    pub(super) fn snapshot(&self, key: &LowerName) -> Option<Record> {
        self.records.get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert(
        &mut self,
        zone: LowerName,
        name: String,
        address: IpAddr,
        now: OffsetDateTime,
    ) -> Result<Upserted, Error> {
        if !zone.is_fqdn() {
            return Err(Error::NotFQDN(zone));
        }
        let key = fqdn(&zone, &name)?;
        let (record, outcome) = match self.records.entry(key) {
            Entry::Vacant(entry) => (
                entry.insert(Record::new(name, zone, address, now)),
                UpsertOutcome::Created,
            ),
            Entry::Occupied(entry) => {
                let record = entry.into_mut();
                if record.address == address {
                    (record, UpsertOutcome::Unchanged)
                } else {
                    let previous = record.address;
                    record.address = address;
                    record.last_updated = now;
                    (record, UpsertOutcome::Updated { previous })
                }
            }
        };
        Ok(Upserted {
            record: record.clone(),
            outcome,
        })
    }

    async fn get(&self, zone: &LowerName, name: &str) -> Option<Record> {
        let key = fqdn(zone, name).ok()?;
        self.records.get(&key).cloned()
    }

    async fn lookup(&self, fqdn: &LowerName) -> Option<Record> {
        self.records.get(fqdn).cloned()
    }

    async fn records(&self) -> Vec<Record> {
        let mut records: Vec<(String, Record)> = self
            .records
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        records.sort_by(|(a, _), (b, _)| a.cmp(b));
        records.into_iter().map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use time::Duration;
    use trust_dns_client::rr::Name;

    fn zone(s: &str) -> LowerName {
        LowerName::from(Name::from_str(s).unwrap())
    }

    #[tokio::test]
    async fn upsert_lifecycle() {
        let mut store = InMemoryRecordStore::default();
        let z = zone("dyn.example.com.");
        let t0 = OffsetDateTime::now_utc();
        let a: IpAddr = "192.0.2.1".parse().unwrap();
        let b: IpAddr = "2001:db8::1".parse().unwrap();

        let upserted = store.upsert(z.clone(), "nas".into(), a, t0).await.unwrap();
        assert_eq!(upserted.outcome, UpsertOutcome::Created);
        assert_eq!(upserted.record, Record::new("nas".into(), z.clone(), a, t0));

        let upserted = store
            .upsert(z.clone(), "nas".into(), a, t0 + Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(upserted.outcome, UpsertOutcome::Unchanged);
        assert_eq!(upserted.record.last_updated, t0);
        assert_eq!(store.get(&z, "nas").await.unwrap().last_updated, t0);

        let t1 = t0 + Duration::minutes(1);
        let upserted = store.upsert(z.clone(), "nas".into(), b, t1).await.unwrap();
        assert_eq!(upserted.outcome, UpsertOutcome::Updated { previous: a });
        assert_eq!(upserted.record.address, b);

        let record = store.get(&z, "nas").await.unwrap();
        assert_eq!(record.address, b);
        assert_eq!(record.last_updated, t1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn same_name_in_two_zones_is_two_records() {
        let mut store = InMemoryRecordStore::default();
        let now = OffsetDateTime::now_utc();
        let a: IpAddr = "192.0.2.1".parse().unwrap();
        store
            .upsert(zone("dyn.example.com."), "nas".into(), a, now)
            .await
            .unwrap();
        store
            .upsert(zone("home.example.org."), "nas".into(), a, now)
            .await
            .unwrap();

        let records = store.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].zone, zone("dyn.example.com."));
        assert_eq!(records[1].zone, zone("home.example.org."));
    }

    #[tokio::test]
    async fn lookup_by_fqdn_is_case_insensitive() {
        let mut store = InMemoryRecordStore::default();
        let a: IpAddr = "192.0.2.1".parse().unwrap();
        store
            .upsert(zone("dyn.example.com."), "nas".into(), a, OffsetDateTime::now_utc())
            .await
            .unwrap();
        let found = store.lookup(&zone("NAS.Dyn.Example.com.")).await.unwrap();
        assert_eq!(found.address, a);
        assert!(store.lookup(&zone("other.dyn.example.com.")).await.is_none());
    }

    #[tokio::test]
    async fn relative_zone_is_rejected() {
        let mut store = InMemoryRecordStore::default();
        let err = store
            .upsert(
                zone("dyn.example.com"),
                "nas".into(),
                "192.0.2.1".parse().unwrap(),
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFQDN(_)));
        assert!(store.is_empty());
    }
}
