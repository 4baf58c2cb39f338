use crate::routing_utils::{BasicErrorResponse, ExtraInfo, ValidationErrorSchema};
use utoipa::OpenApi;

pub mod event;
pub mod todo;

pub use event::*;
pub use todo::*;

/// Registers the payload schemas and shared error responses used across the API
#[derive(OpenApi)]
#[openapi(
    components(
        schemas(
            TodoItem,
            NewTodoItem,
            CalendarEvent,
            ItemBody,
            BodyType,
            DateTimeTimeZone,
            Attendee,
            AttendeeType,
            EmailAddress,
            ExtraInfo,
            ValidationErrorSchema,
        ),
        responses(BasicErrorResponse),
    )
)]
pub struct OpenApiSchemas;
