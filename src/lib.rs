use crate::app_env::ServiceSettings;
use axum::Router;
use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod db;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod integrations;
pub mod logging;
pub mod persistence;
pub mod routing_utils;
pub mod todo_client;

/// Everything request handlers share: connectivity to external systems and service settings
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub settings: ServiceSettings,
}

pub type AppState = State<Arc<SharedData>>;

/// Assembles every route the service exposes, along with the API documentation and request tracing
pub fn build_router(shared_data: SharedData) -> Router {
    let todo_list = api::todo_list::todo_list_routes().merge(api::downstream::downstream_routes());
    let router = Router::new()
        .nest("/api/TodoList", todo_list)
        .merge(api::swagger_main::build_documentation())
        .with_state(Arc::new(shared_data));

    logging::attach_tracing_http(router)
}
