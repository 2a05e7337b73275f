use crate::api::routes;
use crate::config::Shared;
use crate::record_store::DynRecordStore;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub record_store: DynRecordStore,
}

pub fn new(
    config: Shared,
    record_store: DynRecordStore,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr).serve(
        routes::new(AppState {
            config,
            record_store,
        })
        .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
