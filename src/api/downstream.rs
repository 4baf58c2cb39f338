//! Endpoints which act against downstream APIs on behalf of the caller

use crate::api::identity::CallerIdentity;
use crate::app_env::ServiceSettings;
use crate::domain::calendar::driving_ports::CalendarPort;
use crate::domain::directory::driving_ports::DirectoryPort;
use crate::external_connections::ExternalConnectivity;
use crate::integrations::graph::GraphDirectory;
use crate::integrations::inferno::InfernoEventSource;
use crate::integrations::token_exchange::OnBehalfOfTokenSource;
use crate::routing_utils::{BasicErrorResponse, DirectoryErrorResponse, EventErrorResponse, Json};
use crate::{AppState, SharedData, domain, dto};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(create_event, list_users),
    components(schemas(dto::CalendarEvent), responses(BasicErrorResponse))
)]
/// Defines the OpenAPI spec for endpoints backed by downstream APIs
pub struct DownstreamApi;

/// Builds a router for the calendar event and directory routes
pub fn downstream_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/createevent/:id",
            get(
                |State(app_state): AppState,
                 caller: CallerIdentity,
                 Path(event_id): Path<String>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let calendar_service = domain::calendar::CalendarService::default();

                    create_event(
                        &caller,
                        &event_id,
                        &app_state.settings,
                        &mut ext_cxn,
                        &calendar_service,
                    )
                    .await
                },
            ),
        )
        .route(
            "/getallusers",
            get(
                |State(app_state): AppState, caller: CallerIdentity| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let directory_service = domain::directory::DirectoryService;

                    list_users(&caller, &app_state.settings, &mut ext_cxn, &directory_service).await
                },
            ),
        )
}

/// Creates an event on the caller's calendar from an Inferno event
///
/// When the Inferno event can't be fetched, a placeholder lunch invitation is created instead.
#[utoipa::path(
    get,
    path = "/api/TodoList/createevent/{id}",
    tag = super::todo_list::TODO_LIST_API_GROUP,
    params(("id" = String, Path, description = "ID of the Inferno event")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The event as created on the caller's calendar", body = dto::CalendarEvent),
        (status = 401, description = "The caller must consent to more scopes. The body describes the provider error.", body = String, content_type = "text/plain"),
        (status = 500, response = BasicErrorResponse),
        (status = 502, response = BasicErrorResponse),
    ),
)]
async fn create_event(
    caller: &CallerIdentity,
    event_id: &str,
    settings: &ServiceSettings,
    ext_cxn: &mut impl ExternalConnectivity,
    calendar_service: &impl CalendarPort,
) -> Result<Json<dto::CalendarEvent>, ErrorResponse> {
    info!("{} is creating a calendar event from {event_id}", caller.identity);
    let token_source = OnBehalfOfTokenSource {
        identity: settings.identity.clone(),
    };
    let directory = GraphDirectory {
        base_url: settings.graph_base_url.clone(),
    };
    let event_source = InfernoEventSource {
        base_url: settings.inferno_base_url.clone(),
    };

    let created = calendar_service
        .create_event(
            &caller.assertion,
            &settings.inferno_api_key,
            event_id,
            &mut *ext_cxn,
            &token_source,
            &directory,
            &event_source,
        )
        .await
        .map_err(EventErrorResponse::from)?;

    Ok(Json(created.into()))
}

/// Lists the principal names of every enabled account in the caller's directory
#[utoipa::path(
    get,
    path = "/api/TodoList/getallusers",
    tag = super::todo_list::TODO_LIST_API_GROUP,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Principal names of enabled accounts", body = Vec<String>),
        (status = 401, description = "The caller must consent to more scopes. The body describes the provider error.", body = String, content_type = "text/plain"),
        (status = 500, response = BasicErrorResponse),
    ),
)]
async fn list_users(
    caller: &CallerIdentity,
    settings: &ServiceSettings,
    ext_cxn: &mut impl ExternalConnectivity,
    directory_service: &impl DirectoryPort,
) -> Result<Json<Vec<String>>, ErrorResponse> {
    info!("{} is listing directory users", caller.identity);
    let token_source = OnBehalfOfTokenSource {
        identity: settings.identity.clone(),
    };
    let directory = GraphDirectory {
        base_url: settings.graph_base_url.clone(),
    };

    let user_names = directory_service
        .list_user_names(&caller.assertion, &mut *ext_cxn, &token_source, &directory)
        .await
        .map_err(DirectoryErrorResponse::from)?;

    Ok(Json(user_names))
}
