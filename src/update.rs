//! The update handler: validates a `(zone, name, ip)` submission and applies it to a
//! [`RecordStore`][crate::record_store::RecordStore].
//!
//! Validation happens entirely before the store is touched, so a rejected update never
//! creates or modifies a record.

use crate::config::Config;
use crate::error::Error;
use crate::record_store::{fqdn, DynRecordStore, Upserted};
use std::net::IpAddr;
use time::OffsetDateTime;
use trust_dns_client::rr::LowerName;

const MAX_LABEL_LEN: usize = 63;

/// A single update submission, as read from either HTTP form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    pub zone: Option<String>,
    pub name: String,
    pub ip: Option<String>,
}

/// A validated update, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUpdate {
    pub zone: LowerName,
    pub name: String,
    pub address: IpAddr,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelValidationError {
    #[error("name is empty")]
    Empty,
    #[error("name is {0} characters long, at most 63 are allowed")]
    TooLong(usize),
    #[error("invalid character {0:?}, only letters, digits and hyphens are allowed")]
    InvalidCharacter(char),
    #[error("name must not start or end with a hyphen")]
    EdgeHyphen,
    #[error("name and zone together are too long")]
    NameTooLong,
}

/// Check `name` is a single DNS label: letters, digits and hyphens, 1 to 63 characters, not
/// starting or ending with a hyphen.
///
/// # Errors
///
/// Returns the first rule the label breaks.
pub fn valid_label(name: &str) -> Result<(), LabelValidationError> {
    if name.is_empty() {
        return Err(LabelValidationError::Empty);
    }
    if let Some(c) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(LabelValidationError::InvalidCharacter(c));
    }
    if name.len() > MAX_LABEL_LEN {
        return Err(LabelValidationError::TooLong(name.len()));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(LabelValidationError::EdgeHyphen);
    }
    Ok(())
}

/// Unwrap IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`), as seen from dual-stack listeners.
#[must_use]
pub fn canonical_addr(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(addr, IpAddr::V4),
        IpAddr::V4(_) => addr,
    }
}

impl UpdateRequest {
    /// Validate the request for a caller whose TCP peer address is `peer_ip`, and whose
    /// observed address (used when `ip` is absent) is `observed_ip`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`], [`Error::InvalidAddress`], [`Error::UnknownZone`],
    /// [`Error::AuthForbidden`] or [`Error::ReservedName`].
    pub fn validate(
        &self,
        config: &Config,
        peer_ip: IpAddr,
        observed_ip: IpAddr,
    ) -> Result<ValidUpdate, Error> {
        let name = self.name.trim();
        valid_label(name).map_err(|err| Error::InvalidName(name.to_string(), err))?;

        let address = match non_blank(self.ip.as_deref()) {
            Some(ip) => ip
                .parse::<IpAddr>()
                .map_err(|_| Error::InvalidAddress(ip.to_string()))?,
            None => canonical_addr(observed_ip),
        };

        let zone = config.resolve_zone(non_blank(self.zone.as_deref()))?;
        if !config.update_permitted(canonical_addr(peer_ip), &zone) {
            return Err(Error::AuthForbidden(peer_ip, zone));
        }

        let name = name.to_ascii_lowercase();
        let record_fqdn = fqdn(&zone, &name)
            .map_err(|_| Error::InvalidName(name.clone(), LabelValidationError::NameTooLong))?;
        if config.is_static_name(&record_fqdn) {
            return Err(Error::ReservedName(record_fqdn));
        }

        Ok(ValidUpdate {
            zone,
            name,
            address,
        })
    }
}

impl ValidUpdate {
    /// Upsert the record, stamping it with `now` if it is created or changed.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying store, e.g. [`Error::IO`] when a file-backed store
    /// can't persist its state.
    pub async fn apply(self, store: &DynRecordStore, now: OffsetDateTime) -> Result<Upserted, Error> {
        let mut store = store.write().await;
        store
            .upsert(self.zone, self.name, self.address, now)
            .await
    }
}

fn non_blank(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::record_store::{InMemoryRecordStore, UpsertOutcome};
    use std::sync::Arc;
    use time::Duration;
    use tokio::sync::RwLock;

    fn store() -> DynRecordStore {
        Arc::new(RwLock::new(InMemoryRecordStore::default()))
    }

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    fn request(zone: Option<&str>, name: &str, ip: Option<&str>) -> UpdateRequest {
        UpdateRequest {
            zone: zone.map(String::from),
            name: name.to_string(),
            ip: ip.map(String::from),
        }
    }

    #[test]
    fn label_rules() {
        assert_eq!(valid_label("host-1"), Ok(()));
        assert_eq!(valid_label("a"), Ok(()));
        assert_eq!(valid_label(&"a".repeat(63)), Ok(()));
        assert_eq!(valid_label(""), Err(LabelValidationError::Empty));
        assert_eq!(
            valid_label(&"a".repeat(64)),
            Err(LabelValidationError::TooLong(64))
        );
        assert_eq!(valid_label("-host"), Err(LabelValidationError::EdgeHyphen));
        assert_eq!(valid_label("host-"), Err(LabelValidationError::EdgeHyphen));
        assert_eq!(
            valid_label("my_host"),
            Err(LabelValidationError::InvalidCharacter('_'))
        );
        assert_eq!(
            valid_label("sub.host"),
            Err(LabelValidationError::InvalidCharacter('.'))
        );
        assert_eq!(
            valid_label("hôte"),
            Err(LabelValidationError::InvalidCharacter('ô'))
        );
    }

    #[test]
    fn mapped_addresses_are_unwrapped() {
        let mapped: IpAddr = "::ffff:192.0.2.1".parse().unwrap();
        assert_eq!(canonical_addr(mapped), "192.0.2.1".parse::<IpAddr>().unwrap());
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(canonical_addr(v6), v6);
    }

    #[test]
    fn omitted_ip_uses_observed_address() {
        let config = test_config();
        let observed: IpAddr = "198.51.100.4".parse().unwrap();
        for ip in [None, Some(""), Some("   ")] {
            let valid = request(None, "laptop", ip)
                .validate(&config, localhost(), observed)
                .unwrap();
            assert_eq!(valid.address, observed);
            assert_eq!(valid.zone, config.domain);
        }
    }

    #[test]
    fn name_is_trimmed_and_lowercased() {
        let config = test_config();
        let valid = request(Some(" "), " LapTop ", Some("2001:db8::7"))
            .validate(&config, localhost(), localhost())
            .unwrap();
        assert_eq!(valid.name, "laptop");
        assert_eq!(valid.address, "2001:db8::7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn rejections() {
        let config = test_config();
        let err = request(None, "bad_name", None)
            .validate(&config, localhost(), localhost())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName(n, _) if n == "bad_name"));

        let err = request(None, "host", Some("300.1.1.1"))
            .validate(&config, localhost(), localhost())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(a) if a == "300.1.1.1"));

        let err = request(Some("example.net"), "host", None)
            .validate(&config, localhost(), localhost())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownZone(_)));

        let lan: IpAddr = "192.168.1.20".parse().unwrap();
        let err = request(Some("home.example.org"), "host", None)
            .validate(&config, lan, lan)
            .unwrap_err();
        assert!(matches!(err, Error::AuthForbidden(ip, _) if ip == lan));
    }

    #[test]
    fn configured_names_are_reserved() {
        let mut config = test_config();
        // ns1.dyn.example.com. is a static host in the test config.
        let err = request(None, "NS1", Some("192.0.2.66"))
            .validate(&config, localhost(), localhost())
            .unwrap_err();
        assert!(
            matches!(err, Error::ReservedName(ref n) if n.to_string() == "ns1.dyn.example.com.")
        );

        config
            .zones
            .insert(crate::record_store::fqdn(&config.domain, "lab").unwrap());
        let err = request(None, "lab", None)
            .validate(&config, localhost(), localhost())
            .unwrap_err();
        assert!(matches!(err, Error::ReservedName(_)));

        assert!(request(None, "ns2", None)
            .validate(&config, localhost(), localhost())
            .is_ok());
    }

    #[tokio::test]
    async fn same_update_twice_is_idempotent() {
        let config = test_config();
        let store = store();
        let t0 = OffsetDateTime::now_utc();
        let req = request(None, "laptop", Some("192.0.2.10"));

        let first = req
            .validate(&config, localhost(), localhost())
            .unwrap()
            .apply(&store, t0)
            .await
            .unwrap();
        assert_eq!(first.outcome, UpsertOutcome::Created);

        let second = req
            .validate(&config, localhost(), localhost())
            .unwrap()
            .apply(&store, t0 + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(second.outcome, UpsertOutcome::Unchanged);
        assert_eq!(second.record.last_updated, t0);

        let records = store.read().await.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "192.0.2.10".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn new_address_updates_record_and_timestamp() {
        let config = test_config();
        let store = store();
        let t0 = OffsetDateTime::now_utc();
        let t1 = t0 + Duration::hours(1);

        request(None, "laptop", Some("192.0.2.10"))
            .validate(&config, localhost(), localhost())
            .unwrap()
            .apply(&store, t0)
            .await
            .unwrap();
        let applied = request(None, "laptop", Some("192.0.2.11"))
            .validate(&config, localhost(), localhost())
            .unwrap()
            .apply(&store, t1)
            .await
            .unwrap();

        assert_eq!(
            applied.outcome,
            UpsertOutcome::Updated {
                previous: "192.0.2.10".parse().unwrap()
            }
        );
        assert_eq!(applied.record.address, "192.0.2.11".parse::<IpAddr>().unwrap());
        assert_eq!(applied.record.last_updated, t1);
        assert_eq!(store.read().await.records().await.len(), 1);
    }
}
