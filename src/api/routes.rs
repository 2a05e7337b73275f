use crate::api::api_error::APIError;
use crate::api::model::{SubdomainForm, UpdateForm, UpdateRecordResult};
use crate::api::server::AppState;
use crate::config::Config;
use crate::update::UpdateRequest;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use time::OffsetDateTime;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const FORWARDED_FOR: &str = "x-forwarded-for";

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/subdomain", post(subdomain))
        .route("/update", post(update))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn subdomain(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Form(form), _): WithRejection<Form<SubdomainForm>, APIError>,
) -> Result<Json<UpdateRecordResult>, APIError> {
    apply_update(&state, client_addr.ip(), &headers, form.into()).await
}

async fn update(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Form(form), _): WithRejection<Form<UpdateForm>, APIError>,
) -> Result<Json<UpdateRecordResult>, APIError> {
    apply_update(&state, client_addr.ip(), &headers, form.into()).await
}

async fn apply_update(
    state: &AppState,
    client_addr: IpAddr,
    headers: &HeaderMap,
    request: UpdateRequest,
) -> Result<Json<UpdateRecordResult>, APIError> {
    let observed_addr = observed_addr(&state.config, client_addr, headers);
    let valid = match request.validate(&state.config, client_addr, observed_addr) {
        Err(err) => {
            tracing::debug!(
                "rejected update from {client_addr} for \"{}\": {err}",
                request.name
            );
            return Err(err.into());
        }
        Ok(valid) => valid,
    };

    let upserted = valid
        .apply(&state.record_store, OffsetDateTime::now_utc())
        .await?;
    let result = UpdateRecordResult::from(&upserted);
    tracing::info!(
        "accepted update from {client_addr}: \"{}\" {} ({})",
        result.fqdn,
        result.ip,
        result.status
    );
    Ok(Json(result))
}

/// The address a caller is seen as. Only consults `X-Forwarded-For` when the config trusts it.
fn observed_addr(config: &Config, client_addr: IpAddr, headers: &HeaderMap) -> IpAddr {
    if !config.trust_forwarded_for {
        return client_addr;
    }
    headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|addr| addr.trim().parse::<IpAddr>().ok())
        .unwrap_or(client_addr)
}
