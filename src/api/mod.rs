//! HTTP API for dynamic address record updates.
//!
//! Both update endpoints take `application/x-www-form-urlencoded` bodies, as posted by a plain
//! HTML form, and answer with JSON.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/subdomain` (POST)
//!
//!   Expects a form body with a single field:
//!
//!   ```text
//!   name=laptop
//!   ```
//!
//!   Creates or updates `laptop.<domain>` to point at the caller's address, where `<domain>` is
//!   the configured [`Config::domain`][`crate::config::Config::domain`].
//!
//! ## `/update` (POST)
//!
//!   Expects a form body of the form:
//!
//!   ```text
//!   zone=home.example.org&name=laptop&ip=192.0.2.10
//!   ```
//!
//!   `zone` and `ip` are optional; empty values count as absent. Without a `zone` the record is
//!   placed in the configured [`Config::domain`][`crate::config::Config::domain`]. Without an
//!   `ip` the caller's address is used (the first `X-Forwarded-For` address if
//!   [`Config::trust_forwarded_for`][`crate::config::Config::trust_forwarded_for`] is set).
//!
//!   The client `POST`ing the update must have a source IP address within a network listed in
//!   [`Config::acl`][`crate::config::Config::acl`] with the target zone.
//!
//! ## Responses
//!
//!  For successful updates, both endpoints return HTTP 200 (OK) and a JSON body of the form:
//!
//!  ```json
//!  {
//!    "fqdn": "laptop.home.example.org.",
//!    "ip": "192.0.2.10",
//!    "status": "created",
//!    "last_updated": "2023-05-01T12:00:00.123456Z"
//!  }
//!  ```
//!
//!  `status` is one of `created`, `updated` or `unchanged`. Repeating an update with the same
//!  address is `unchanged` and keeps the previous `last_updated`.
//!
//!  Failures return a JSON body `{"error": "..."}` with HTTP 400 for an invalid name, address
//!  or unknown zone, HTTP 403 for a caller outside the ACL, HTTP 415 for a non-form body, and
//!  HTTP 422 for a form missing `name`.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
