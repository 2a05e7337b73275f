use crate::error::Error;
use crate::record_store::{DynRecordStore, FileRecordStore, InMemoryRecordStore};
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use trust_dns_client::rr::{LowerName, Name};

pub type Shared = Arc<Config>;

const DEFAULT_RECORD_TTL: u32 = 60;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Base domain. Updates that don't name a zone land here.
    pub domain: LowerName,
    /// Additional zones that updates may name.
    #[serde(default)]
    pub zones: HashSet<LowerName>,
    pub ns_domain: LowerName,
    pub ns_admin: String,
    pub record_store_state_path: Option<String>,
    pub api_bind_addr: SocketAddr,
    #[serde(default)]
    pub api_public: bool,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    /// Use the first `X-Forwarded-For` address as the caller address when no `ip` is given.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    pub dns_udp_bind_addr: SocketAddr,
    pub dns_tcp_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dns_tcp_timeout: Duration,
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,
    pub acl: HashMap<IpNetwork, HashSet<LowerName>>,
    #[serde(default)]
    pub addrs: HashMap<LowerName, Vec<IpAddr>>,
    #[serde(default)]
    pub ns_records: HashMap<LowerName, Vec<LowerName>>,
}

fn default_record_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

fn to_fqdn(name: &LowerName) -> LowerName {
    let mut name: Name = name.into();
    name.set_fqdn(true);
    name.into()
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    /// Load and check a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] or [`Error::InvalidJSON`] if the file can't be read or parsed, and
    /// [`Error::InsecureAPIBind`] if the API would listen on a public address without
    /// `api_public` set.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf.fully_qualified())
    }

    /// Treat every configured name as rooted, so `dyn.example.com` and `dyn.example.com.` are
    /// the same zone everywhere names are compared.
    #[must_use]
    pub fn fully_qualified(mut self) -> Self {
        self.domain = to_fqdn(&self.domain);
        self.ns_domain = to_fqdn(&self.ns_domain);
        self.zones = self.zones.iter().map(to_fqdn).collect();
        for zones in self.acl.values_mut() {
            *zones = zones.iter().map(to_fqdn).collect();
        }
        self.addrs = self
            .addrs
            .drain()
            .map(|(name, addrs)| (to_fqdn(&name), addrs))
            .collect();
        self.ns_records = self
            .ns_records
            .drain()
            .map(|(name, targets)| (to_fqdn(&name), targets.iter().map(to_fqdn).collect()))
            .collect();
        self
    }

    /// Build the record store described by `record_store_state_path`: file-backed when a path
    /// is set, in-memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but can't be read or parsed.
    pub async fn record_store(&self) -> Result<DynRecordStore, Error> {
        let record_store: DynRecordStore = match &self.record_store_state_path {
            Some(path) => {
                tracing::info!("loading record state from {path}");
                Arc::new(RwLock::new(FileRecordStore::try_from_file(path).await?))
            }
            None => {
                tracing::warn!("no record_store_state_path configured, records are not durable");
                Arc::new(RwLock::new(InMemoryRecordStore::default()))
            }
        };
        Ok(record_store)
    }

    /// Resolve the zone an update targets. An absent zone means the base domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownZone`] if the zone isn't the base domain or one of `zones`.
    pub fn resolve_zone(&self, zone: Option<&str>) -> Result<LowerName, Error> {
        let Some(zone) = zone else {
            return Ok(self.domain.clone());
        };
        let name = Name::from_str(zone).map_err(|_| Error::UnknownZone(zone.to_string()))?;
        let zone_name = to_fqdn(&LowerName::from(name));
        if self.is_known_zone(&zone_name) {
            Ok(zone_name)
        } else {
            Err(Error::UnknownZone(zone.to_string()))
        }
    }

    pub fn is_known_zone(&self, zone: &LowerName) -> bool {
        *zone == self.domain || self.zones.contains(zone)
    }

    /// Names answered from the config rather than the record store.
    pub fn is_static_name(&self, fqdn: &LowerName) -> bool {
        self.is_known_zone(fqdn)
            || *fqdn == self.ns_domain
            || self.addrs.contains_key(fqdn)
            || self.ns_records.contains_key(fqdn)
    }

    pub fn update_permitted(&self, source_ip: IpAddr, zone: &LowerName) -> bool {
        self.acl.iter().any(|(allowed_network, allowed_zones)| {
            allowed_network.contains(source_ip) && allowed_zones.contains(zone)
        })
    }

    pub fn ns_admin(&self) -> Result<Name, Error> {
        Ok(Name::from_str(&self.sanitized_ns_admin())?)
    }

    fn sanitized_ns_admin(&self) -> Cow<str> {
        match self.ns_admin.split_once('@') {
            Some((user, domain)) => {
                let user = user.replace('.', "\\.");
                Cow::Owned(format!("{user}.{domain}"))
            }
            _ => Cow::Borrowed(&self.ns_admin),
        }
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        if self.api_public {
            tracing::warn!("API bind address {} is allowed to be public", self.api_bind_addr);
            return Ok(());
        }
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}
