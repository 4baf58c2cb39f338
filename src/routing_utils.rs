use axum::extract::rejection::JsonRejection;
use axum::http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_macros::FromRequest;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::openapi::{RefOr, Schema};
use utoipa::{ToResponse, ToSchema, openapi};
use validator::ValidationErrors;

use crate::domain::calendar::driving_ports::EventError;
use crate::domain::directory::AuthorizationRequired;
use crate::domain::directory::driving_ports::DirectoryError;
use crate::domain::todo::driving_ports::TodoError;

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToResponse)]
#[response(examples(
    ("Not Found" = (
        summary = "To-do item could not be found in the caller's tenant (404)",
        value = json!({
            "error_code": "not_found",
            "error_description": "The requested to-do item could not be found.",
            "extra_info": null
        })
    )),

    ("ID Mismatch" = (
        summary = "The item ID in the body differs from the one in the path (400)",
        value = json!({
            "error_code": "id_mismatch",
            "error_description": "The ID in the request body does not match the ID in the path.",
            "extra_info": "path ID 4, body ID 5"
        })
    )),

    ("Conflict" = (
        summary = "The item was changed concurrently (409)",
        value = json!({
            "error_code": "conflict",
            "error_description": "The to-do item was modified by another request.",
            "extra_info": null
        })
    )),

    ("Unauthenticated" = (
        summary = "The caller's bearer token was missing or unreadable (401)",
        value = json!({
            "error_code": "unauthenticated",
            "error_description": "A bearer token identifying the caller and their tenant is required.",
            "extra_info": "no bearer token was provided"
        })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({
            "error_code": "internal_error",
            "error_description": "Could not access data to complete your request",
            "extra_info": null
        })
    )),

    ("Creation Failed" = (
        summary = "The calendar provider acknowledged no event (502)",
        value = json!({
            "error_code": "creation_failed",
            "error_description": "The calendar provider did not return the created event.",
            "extra_info": null
        })
    )),

    ("Invalid Input" = (
        summary = "Invalid request body was passed (400)",
        value = json!({
            "error_code": "invalid_input",
            "error_description": "Submitted data was invalid.",
            "extra_info": {
                "title": [
                    {
                        "code": "length",
                        "message": null,
                        "params": {
                            "value": "",
                            "min": 1
                        }
                    }
                ]
            }
        })
    )),

    ("Malformed JSON" = (
        summary = "Invalid JSON passed to server (400)",
        value = json!({
            "error_code": "invalid_json",
            "error_description": "The passed request body contained malformed or unreadable JSON.",
            "extra_info": "Failed to parse the request body as JSON: EOF while parsing an object at line 4 column 0"
        })
    ))
))]
pub struct BasicErrorResponse {
    pub error_code: String,
    pub error_description: String,
    pub extra_info: Option<ExtraInfo>,
}

impl BasicErrorResponse {
    fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

/// Response type for unexpected failures. The cause is logged, not sent to the caller.
pub struct GenericErrorResponse(pub anyhow::Error);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        error!("Request failed unexpectedly: {:#}", self.0);

        BasicErrorResponse {
            error_code: "internal_error".into(),
            error_description: "Could not access data to complete your request".into(),
            extra_info: None,
        }
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Response type that wraps to-do errors and turns them into [BasicErrorResponse]s
pub struct TodoErrorResponse(TodoError);

impl IntoResponse for TodoErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            TodoError::NotFound(_) => BasicErrorResponse {
                error_code: "not_found".into(),
                error_description: "The requested to-do item could not be found.".into(),
                extra_info: None,
            }
            .with_status(StatusCode::NOT_FOUND),

            TodoError::IdMismatch { path_id, body_id } => BasicErrorResponse {
                error_code: "id_mismatch".into(),
                error_description: "The ID in the request body does not match the ID in the path."
                    .into(),
                extra_info: Some(ExtraInfo::Message(format!(
                    "path ID {path_id}, body ID {body_id}"
                ))),
            }
            .with_status(StatusCode::BAD_REQUEST),

            TodoError::Conflict(item_id) => {
                warn!("Rejected a conflicting write to to-do item {item_id}");
                BasicErrorResponse {
                    error_code: "conflict".into(),
                    error_description: "The to-do item was modified by another request.".into(),
                    extra_info: None,
                }
                .with_status(StatusCode::CONFLICT)
            }

            TodoError::PortError(err) => GenericErrorResponse(err).into_response(),
        }
    }
}

impl From<TodoError> for TodoErrorResponse {
    fn from(value: TodoError) -> Self {
        Self(value)
    }
}

/// Tells the caller they need to go through interactive consent before the downstream API can be
/// called for them. The body is plain text and the challenge header lists the scopes to consent to.
pub struct AuthorizationRequiredResponse(AuthorizationRequired);

impl IntoResponse for AuthorizationRequiredResponse {
    fn into_response(self) -> Response {
        let auth_required = self.0;
        warn!(
            "Downstream token acquisition needs user interaction: {}",
            auth_required.error_code
        );

        let body = format!(
            "An authentication error occurred while acquiring a token for downstream API\n{}\n{}",
            auth_required.error_code, auth_required.message
        );
        let mut response = (
            StatusCode::UNAUTHORIZED,
            [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
            body,
        )
            .into_response();

        let challenge = format!(
            "Bearer error=\"{}\", scope=\"{}\"",
            auth_required.error_code,
            auth_required.scopes.join(" ")
        );
        match HeaderValue::from_str(&challenge) {
            Ok(challenge_header) => {
                response.headers_mut().insert(WWW_AUTHENTICATE, challenge_header);
            }
            Err(header_err) => warn!("Could not build the consent challenge header: {header_err}"),
        }

        response
    }
}

impl From<AuthorizationRequired> for AuthorizationRequiredResponse {
    fn from(value: AuthorizationRequired) -> Self {
        Self(value)
    }
}

/// Response type for failures while creating a calendar event
pub struct EventErrorResponse(EventError);

impl IntoResponse for EventErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            EventError::AuthorizationRequired(auth_required) => {
                AuthorizationRequiredResponse(auth_required).into_response()
            }
            EventError::CreationFailed => BasicErrorResponse {
                error_code: "creation_failed".into(),
                error_description: "The calendar provider did not return the created event.".into(),
                extra_info: None,
            }
            .with_status(StatusCode::BAD_GATEWAY),
            EventError::PortError(err) => GenericErrorResponse(err).into_response(),
        }
    }
}

impl From<EventError> for EventErrorResponse {
    fn from(value: EventError) -> Self {
        Self(value)
    }
}

/// Response type for failures while reading the directory
pub struct DirectoryErrorResponse(DirectoryError);

impl IntoResponse for DirectoryErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            DirectoryError::AuthorizationRequired(auth_required) => {
                AuthorizationRequiredResponse(auth_required).into_response()
            }
            DirectoryError::PortError(err) => GenericErrorResponse(err).into_response(),
        }
    }
}

impl From<DirectoryError> for DirectoryErrorResponse {
    fn from(value: DirectoryError) -> Self {
        Self(value)
    }
}

/// Rejection for requests that don't identify the caller
pub struct UnauthenticatedResponse(pub String);

impl IntoResponse for UnauthenticatedResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse {
            error_code: "unauthenticated".into(),
            error_description: "A bearer token identifying the caller and their tenant is required."
                .into(),
            extra_info: Some(ExtraInfo::Message(self.0)),
        }
        .with_status(StatusCode::UNAUTHORIZED)
    }
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse {
            error_code: "invalid_input".into(),
            error_description: "Submitted data was invalid.".to_owned(),
            extra_info: Some(ExtraInfo::ValidationIssues(ValidationErrorSchema(self.0))),
        }
        .with_status(StatusCode::BAD_REQUEST)
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        BasicErrorResponse {
            error_code: "invalid_json".into(),
            error_description: "The passed request body contained malformed or unreadable JSON."
                .into(),
            extra_info: Some(ExtraInfo::Message(self.parse_problem)),
        }
        .with_status(StatusCode::BAD_REQUEST)
    }
}
