//! Error types.

use std::net::IpAddr;
use trust_dns_server::client::rr::LowerName;
use trust_dns_server::proto::error::ProtoError;

use crate::update::LabelValidationError;

/// Error enumerates the possible DDNS Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when an update specifies a `name` that isn't a single valid DNS label: letters,
    /// digits and hyphens, 1 to 63 characters, not starting or ending with a hyphen.
    #[error("invalid subdomain name \"{0}\": {1}")]
    InvalidName(String, LabelValidationError),

    /// Returned when an update specifies an `ip` that isn't an IPv4 or IPv6 literal.
    #[error("invalid IP address \"{0}\"")]
    InvalidAddress(String),

    /// Returned when an update specifies a `zone` that is neither the
    /// [`Config::domain`][`crate::config::Config::domain`] nor one of the
    /// [`Config::zones`][`crate::config::Config::zones`].
    #[error("unknown zone \"{0}\"")]
    UnknownZone(String),

    /// Returned when an update targets a name the [`Config`][`crate::config::Config`] already
    /// serves statically: a zone apex, the name server, or a host in `addrs` or `ns_records`.
    #[error("\"{0}\" is reserved by the server configuration")]
    ReservedName(LowerName),

    /// Returned when clients `POST` an update from a source IP address that isn't in a
    /// [`Config::acl`][`crate::config::Config::acl`] network listing the requested zone.
    #[error("IP {0} is not authorized to update zone \"{1}\"")]
    AuthForbidden(IpAddr, LowerName),

    /// Returned when a non-fully qualified zone is provided to
    /// [`RecordStore::upsert`][`crate::record_store::RecordStore::upsert`].
    #[error("record store zone is not a fully qualified name: \"{0}\"")]
    NotFQDN(LowerName),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space, and
    /// [`Config::api_public`][`crate::config::Config::api_public`] was not set.
    #[error("API bind address ({0}) must be a loopback or private IP unless api_public is set")]
    InsecureAPIBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g. the config file, or the
    /// [`FileRecordStore`][crate::record_store::file::FileRecordStore] state) fails.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when a name can't be built, or the DNS server hits a protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
