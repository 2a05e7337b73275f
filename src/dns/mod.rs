//! Authoritative DNS server for the dynamic records.
//!
//! # Dynamic A/AAAA Records
//!
//! DDNS Crab will serve a response to `A` or `AAAA` class queries for every record created
//! through the [HTTP API][crate::api]. A record holds a single address, so a name updated with
//! an IPv4 address answers `A` queries and returns an empty authoritative answer for `AAAA`,
//! and the other way around.
//!
//! E.g. with config:
//! ```json
//! {
//!   "domain": "dyn.example.com.",
//!   "acl": { "192.168.1.0/24": [ "dyn.example.com." ] },
//!   ...
//! }
//! ```
//!
//! If a client at `192.168.1.44` `POST`s the [`/subdomain` API endpoint][crate::api]:
//!
//! ```bash
//! ❯ curl -d name=nas http://192.168.1.1:3000/subdomain
//! {"fqdn":"nas.dyn.example.com.","ip":"192.168.1.44","status":"created",...}
//! ```
//!
//! Then an `A` class query for `nas.dyn.example.com` would return:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short nas.dyn.example.com A
//! 192.168.1.44
//! ```
//!
//! Answers use the [`Config::record_ttl`][`crate::config::Config::record_ttl`] TTL.
//!
//! # Static Records
//!
//! Several record types are served based on the static [Config][`crate::config::Config`] used
//! to create the DNS server. These do not change at runtime and can't be influenced by the
//! [HTTP API][crate::api].
//!
//! ## A/AAAA
//!
//! Each FQDN in [`Config::addrs`][`crate::config::Config::addrs`] answers `A` queries with its
//! IPv4 values and `AAAA` queries with its IPv6 values, e.g. for the name server's own host.
//!
//! ## NS
//!
//! Each FQDN in [`Config::ns_records`][`crate::config::Config::ns_records`] answers `NS`
//! queries with the listed names.
//!
//! ## SOA
//!
//! The base [`Config::domain`][`crate::config::Config::domain`] and every entry of
//! [`Config::zones`][`crate::config::Config::zones`] answer `SOA` queries using the
//! [`Config::ns_domain`][`crate::config::Config::ns_domain`] and
//! [`Config::ns_admin`][`crate::config::Config::ns_admin`] settings:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 dyn.example.com +short SOA
//! ns1.example.com. dns-admin.example.com. 20230312 86400 7200 3600000 172800
//! ```
//!
//! _Note: The zone serial (`20230312`) will differ based on the date the query is performed._
//!
//! Names that are neither stored nor configured get `NXDOMAIN`. Other query types, including
//! zone transfers, get `NOTIMP`.

mod handlers;
pub mod server;

pub use server::new;
