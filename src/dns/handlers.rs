use crate::config::Shared;
use crate::error::Error;
use crate::record_store::DynRecordStore;
use lazy_static::lazy_static;
use std::net::IpAddr;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::error;
use trust_dns_proto::rr::rdata::SOA;
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::client::rr::{LowerName, RData, Record, RecordType};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

#[derive(Clone)]
pub struct Handler {
    config: Shared,
    record_store: DynRecordStore,
}

/// How a query is answered, before it is written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Answer {
    /// Authoritative answer. Empty means the name exists without data of the queried type.
    Records(Vec<RData>),
    NxDomain,
    NotImp,
}

lazy_static! {
    static ref SERIAL_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day]");
}

impl Handler {
    pub(super) fn new(config: Shared, record_store: DynRecordStore) -> Self {
        Handler {
            config,
            record_store,
        }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }

        let query = request.query();
        match self.answer(query.name(), query.query_type()).await? {
            Answer::Records(rdata) => self.send_auth_resp(request, response, rdata).await,
            Answer::NxDomain => self.send_nxdomain(request, response).await,
            Answer::NotImp => self.handle_notimpl(request, response).await,
        }
    }

    pub(super) async fn answer(
        &self,
        name: &LowerName,
        query_type: RecordType,
    ) -> Result<Answer, Error> {
        let answer = match query_type {
            RecordType::A | RecordType::AAAA => {
                let addrs = self.addrs(name).await;
                if addrs.is_empty() && !self.name_exists(name).await {
                    return Ok(Answer::NxDomain);
                }
                Answer::Records(
                    addrs
                        .into_iter()
                        .filter_map(|ip| match (query_type, ip) {
                            (RecordType::A, IpAddr::V4(v4)) => Some(RData::A(v4)),
                            (RecordType::AAAA, IpAddr::V6(v6)) => Some(RData::AAAA(v6)),
                            _ => None,
                        })
                        .collect(),
                )
            }
            RecordType::SOA if self.config.is_known_zone(name) => {
                Answer::Records(vec![self.soa_rdata()?])
            }
            RecordType::NS if self.config.ns_records.contains_key(name) => {
                Answer::Records(self.ns_rdata(name))
            }
            RecordType::SOA | RecordType::NS => {
                if self.name_exists(name).await {
                    Answer::Records(vec![])
                } else {
                    Answer::NxDomain
                }
            }
            _ => Answer::NotImp,
        };
        Ok(answer)
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    /// Stored record address first, then any static addresses from the config.
    async fn addrs(&self, fqdn: &LowerName) -> Vec<IpAddr> {
        let stored = self.record_store.read().await.lookup(fqdn).await;
        stored
            .map(|record| record.address)
            .into_iter()
            .chain(self.config.addrs.get(fqdn).into_iter().flatten().copied())
            .collect()
    }

    async fn name_exists(&self, fqdn: &LowerName) -> bool {
        self.config.is_known_zone(fqdn)
            || self.config.addrs.contains_key(fqdn)
            || self.config.ns_records.contains_key(fqdn)
            || self.record_store.read().await.lookup(fqdn).await.is_some()
    }

    fn soa_rdata(&self) -> Result<RData, Error> {
        // NB: unwraps are safe: known date format producing values that will always parse as u32.
        let serial: u32 = OffsetDateTime::now_utc()
            .format(&SERIAL_FORMATTER)
            .unwrap()
            .parse()
            .unwrap();
        let ns_admin = self.config.ns_admin()?;
        // See RIPE 203[0] for recommended values.
        // [0]: https://www.ripe.net/publications/docs/ripe-203
        Ok(RData::SOA(SOA::new(
            self.config.ns_domain.clone().into(),
            ns_admin,
            serial,
            86_400,    // 24 hrs.
            7_200,     // 2 hours.
            3_600_000, // 1000 hours.
            172_800,   // 2 days.
        )))
    }

    fn ns_rdata(&self, fqdn: &LowerName) -> Vec<RData> {
        self.config
            .ns_records
            .get(fqdn)
            .into_iter()
            .flatten()
            .map(|n| RData::NS(n.into()))
            .collect()
    }

    async fn send_auth_resp<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        rdata: Vec<RData>,
    ) -> Result<ResponseInfo, Error> {
        let records: Vec<Record> = rdata
            .into_iter()
            .map(|rd| {
                Record::from_rdata(request.query().name().into(), self.config.record_ttl, rd)
            })
            .collect();
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(header, records.iter(), &[], &[], &[]);
        Ok(response_handle.send_response(response).await?)
    }

    async fn send_nxdomain<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(ResponseCode::NXDomain);
        let response = builder.build_no_records(header);
        Ok(response_handle.send_response(response).await?)
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::record_store::{InMemoryRecordStore, RecordStore};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use trust_dns_server::client::rr::Name;

    fn name(s: &str) -> LowerName {
        LowerName::from(Name::from_str(s).unwrap())
    }

    async fn handler_with(records: &[(&str, &str)]) -> Handler {
        let config = Arc::new(test_config());
        let mut store = InMemoryRecordStore::default();
        for (label, ip) in records {
            store
                .upsert(
                    config.domain.clone(),
                    (*label).to_string(),
                    ip.parse().unwrap(),
                    OffsetDateTime::now_utc(),
                )
                .await
                .unwrap();
        }
        Handler::new(config, Arc::new(RwLock::new(store)))
    }

    #[tokio::test]
    async fn stored_records_answer_by_family() {
        let handler = handler_with(&[("nas", "192.0.2.8"), ("tv", "2001:db8::8")]).await;

        let a = handler
            .answer(&name("NAS.dyn.example.com."), RecordType::A)
            .await
            .unwrap();
        assert_eq!(
            a,
            Answer::Records(vec![RData::A(Ipv4Addr::new(192, 0, 2, 8))])
        );

        let aaaa = handler
            .answer(&name("nas.dyn.example.com."), RecordType::AAAA)
            .await
            .unwrap();
        assert_eq!(aaaa, Answer::Records(vec![]));

        let aaaa = handler
            .answer(&name("tv.dyn.example.com."), RecordType::AAAA)
            .await
            .unwrap();
        assert_eq!(
            aaaa,
            Answer::Records(vec![RData::AAAA(Ipv6Addr::from_str("2001:db8::8").unwrap())])
        );
    }

    #[tokio::test]
    async fn updates_are_visible_to_queries() {
        let handler = handler_with(&[("nas", "192.0.2.8")]).await;
        handler
            .record_store
            .write()
            .await
            .upsert(
                handler.config.domain.clone(),
                "nas".into(),
                "192.0.2.9".parse().unwrap(),
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        let a = handler
            .answer(&name("nas.dyn.example.com."), RecordType::A)
            .await
            .unwrap();
        assert_eq!(
            a,
            Answer::Records(vec![RData::A(Ipv4Addr::new(192, 0, 2, 9))])
        );
    }

    #[tokio::test]
    async fn unknown_names_are_nxdomain() {
        let handler = handler_with(&[]).await;
        for query_type in [RecordType::A, RecordType::AAAA, RecordType::SOA, RecordType::NS] {
            let answer = handler
                .answer(&name("missing.dyn.example.com."), query_type)
                .await
                .unwrap();
            assert_eq!(answer, Answer::NxDomain);
        }
    }

    #[tokio::test]
    async fn static_addrs_and_zone_apex() {
        let handler = handler_with(&[]).await;
        let a = handler
            .answer(&name("ns1.dyn.example.com."), RecordType::A)
            .await
            .unwrap();
        assert_eq!(
            a,
            Answer::Records(vec![RData::A(Ipv4Addr::new(10, 0, 0, 53))])
        );

        let apex = handler
            .answer(&name("home.example.org."), RecordType::A)
            .await
            .unwrap();
        assert_eq!(apex, Answer::Records(vec![]));
    }

    #[tokio::test]
    async fn soa_and_ns_for_zones() {
        let handler = handler_with(&[]).await;

        for zone in ["dyn.example.com.", "home.example.org."] {
            match handler.answer(&name(zone), RecordType::SOA).await.unwrap() {
                Answer::Records(rdata) => {
                    assert_eq!(rdata.len(), 1);
                    assert!(matches!(rdata[0], RData::SOA(_)));
                }
                other => panic!("unexpected SOA answer for {zone}: {other:?}"),
            }
        }

        let ns = handler
            .answer(&name("dyn.example.com."), RecordType::NS)
            .await
            .unwrap();
        assert_eq!(
            ns,
            Answer::Records(vec![RData::NS(
                Name::from_str("ns1.dyn.example.com.").unwrap()
            )])
        );
    }

    #[tokio::test]
    async fn other_types_are_not_implemented() {
        let handler = handler_with(&[("nas", "192.0.2.8")]).await;
        for query_type in [RecordType::TXT, RecordType::AXFR, RecordType::MX] {
            let answer = handler
                .answer(&name("nas.dyn.example.com."), query_type)
                .await
                .unwrap();
            assert_eq!(answer, Answer::NotImp);
        }
    }
}
