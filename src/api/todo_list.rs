use crate::api::identity::CallerIdentity;
use crate::domain::todo::driving_ports::TodoPort;
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{BasicErrorResponse, Json, TodoErrorResponse, ValidationErrorResponse};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(
    paths(list_items, get_item, add_item, update_item, delete_item),
    components(schemas(dto::TodoItem, dto::NewTodoItem), responses(BasicErrorResponse))
)]
/// Defines the OpenAPI spec for the to-do list endpoints
pub struct TodoListApi;

/// Used to group to-do list endpoints together in the OpenAPI documentation
pub const TODO_LIST_API_GROUP: &str = "TodoList";

/// Builds a router for the to-do list CRUD routes
pub fn todo_list_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState, caller: CallerIdentity| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    list_items(&caller, &mut ext_cxn, &todo_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 caller: CallerIdentity,
                 Json(new_item): Json<dto::NewTodoItem>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    add_item(&caller, new_item, &mut ext_cxn, &todo_service).await
                },
            ),
        )
        .route(
            "/:id",
            get(
                |State(app_state): AppState,
                 caller: CallerIdentity,
                 Path(item_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    get_item(&caller, item_id, &mut ext_cxn, &todo_service).await
                },
            )
            .put(
                |State(app_state): AppState,
                 caller: CallerIdentity,
                 Path(item_id): Path<i32>,
                 Json(item): Json<dto::TodoItem>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    update_item(&caller, item_id, item, &mut ext_cxn, &todo_service).await
                },
            )
            .delete(
                |State(app_state): AppState,
                 caller: CallerIdentity,
                 Path(item_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    delete_item(&caller, item_id, &mut ext_cxn, &todo_service).await
                },
            ),
        )
}

/// Lists the caller's to-do items
///
/// Only items in the caller's tenant which were assigned to or by the caller are returned.
#[utoipa::path(
    get,
    path = "/api/TodoList",
    tag = TODO_LIST_API_GROUP,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's to-do items", body = Vec<dto::TodoItem>),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
async fn list_items(
    caller: &CallerIdentity,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<Vec<dto::TodoItem>>, ErrorResponse> {
    info!("Listing to-do items for {}", caller.identity);
    let todo_reader = persistence::db_todo_driven_ports::DbTodoReader;

    let items = todo_service
        .items_for_viewer(caller.viewer(), &mut *ext_cxn, &todo_reader)
        .await
        .map_err(TodoErrorResponse::from)?;

    Ok(Json(items.into_iter().map(dto::TodoItem::from).collect()))
}

/// Retrieves a single to-do item
#[utoipa::path(
    get,
    path = "/api/TodoList/{id}",
    tag = TODO_LIST_API_GROUP,
    params(("id" = i32, Path, description = "ID of the to-do item")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The requested to-do item", body = dto::TodoItem),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
async fn get_item(
    caller: &CallerIdentity,
    item_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<dto::TodoItem>, ErrorResponse> {
    info!("Getting to-do item {item_id}");
    let todo_reader = persistence::db_todo_driven_ports::DbTodoReader;

    let item = todo_service
        .item_by_id(&caller.tenant_id, item_id, &mut *ext_cxn, &todo_reader)
        .await
        .map_err(TodoErrorResponse::from)?;

    Ok(Json(item.into()))
}

/// Adds a to-do item
///
/// The service assigns the new item's ID and returns the stored item.
#[utoipa::path(
    post,
    path = "/api/TodoList",
    tag = TODO_LIST_API_GROUP,
    request_body = dto::NewTodoItem,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The created to-do item", body = dto::TodoItem),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
async fn add_item(
    caller: &CallerIdentity,
    new_item: dto::NewTodoItem,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<dto::TodoItem>, ErrorResponse> {
    info!("{} is adding to-do item {}", caller.identity, new_item);
    new_item.validate().map_err(ValidationErrorResponse::from)?;

    let todo_writer = persistence::db_todo_driven_ports::DbTodoWriter;
    let created = todo_service
        .add_item(&new_item.into(), &mut *ext_cxn, &todo_writer)
        .await
        .map_err(TodoErrorResponse::from)?;

    Ok(Json(created.into()))
}

/// Replaces the content of a to-do item
#[utoipa::path(
    put,
    path = "/api/TodoList/{id}",
    tag = TODO_LIST_API_GROUP,
    params(("id" = i32, Path, description = "ID of the to-do item, which must match the body")),
    request_body = dto::TodoItem,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The updated to-do item", body = dto::TodoItem),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 409, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
async fn update_item(
    caller: &CallerIdentity,
    item_id: i32,
    item: dto::TodoItem,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<dto::TodoItem>, ErrorResponse> {
    info!("Updating to-do item {item_id}");
    item.validate().map_err(ValidationErrorResponse::from)?;

    let todo_reader = persistence::db_todo_driven_ports::DbTodoReader;
    let todo_writer = persistence::db_todo_driven_ports::DbTodoWriter;
    let updated = todo_service
        .update_item(
            &caller.tenant_id,
            item_id,
            &item.into(),
            &mut *ext_cxn,
            &todo_reader,
            &todo_writer,
        )
        .await
        .map_err(TodoErrorResponse::from)?;

    Ok(Json(updated.into()))
}

/// Deletes a to-do item, returning what was deleted
#[utoipa::path(
    delete,
    path = "/api/TodoList/{id}",
    tag = TODO_LIST_API_GROUP,
    params(("id" = i32, Path, description = "ID of the to-do item")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The deleted to-do item", body = dto::TodoItem),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
async fn delete_item(
    caller: &CallerIdentity,
    item_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<dto::TodoItem>, ErrorResponse> {
    info!("Deleting to-do item {item_id}");
    let todo_reader = persistence::db_todo_driven_ports::DbTodoReader;
    let todo_writer = persistence::db_todo_driven_ports::DbTodoWriter;

    let deleted = todo_service
        .delete_item(
            &caller.tenant_id,
            item_id,
            &mut *ext_cxn,
            &todo_reader,
            &todo_writer,
        )
        .await
        .map_err(TodoErrorResponse::from)?;

    Ok(Json(deleted.into()))
}
