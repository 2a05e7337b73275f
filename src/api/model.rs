use crate::record_store::Upserted;
use crate::update::UpdateRequest;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Form body of `POST /subdomain`.
#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct SubdomainForm {
    pub name: String,
}

/// Form body of `POST /update`.
#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct UpdateForm {
    #[serde(default)]
    pub zone: Option<String>,
    pub name: String,
    #[serde(default)]
    pub ip: Option<String>,
}

impl From<SubdomainForm> for UpdateRequest {
    fn from(form: SubdomainForm) -> Self {
        UpdateRequest {
            zone: None,
            name: form.name,
            ip: None,
        }
    }
}

impl From<UpdateForm> for UpdateRequest {
    fn from(form: UpdateForm) -> Self {
        UpdateRequest {
            zone: form.zone,
            name: form.name,
            ip: form.ip,
        }
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub(super) struct UpdateRecordResult {
    pub fqdn: String,
    pub ip: String,
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl From<&Upserted> for UpdateRecordResult {
    fn from(upserted: &Upserted) -> Self {
        let record = &upserted.record;
        UpdateRecordResult {
            fqdn: record
                .fqdn()
                .map_or_else(|_| format!("{}.{}", record.name, record.zone), |n| n.to_string()),
            ip: record.address.to_string(),
            status: upserted.outcome.as_str(),
            last_updated: record.last_updated,
        }
    }
}
