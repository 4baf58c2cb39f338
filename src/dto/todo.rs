use crate::domain;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for a to-do item as stored by the service. Also the payload for a full replace.
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    #[schema(example = 42)]
    pub id: i32,
    #[validate(length(min = 1))]
    #[schema(example = "Prepare the quarterly report")]
    pub title: String,
    #[validate(length(min = 1))]
    #[schema(example = "adele@contoso.com")]
    pub assigned_to: String,
    #[validate(length(min = 1))]
    #[schema(example = "megan@contoso.com")]
    pub assigned_by: String,
    #[validate(length(min = 1))]
    #[schema(example = "72f988bf-86f1-41af-91ab-2d7cd011db47")]
    pub tenant_id: String,
}

impl From<domain::todo::TodoItem> for TodoItem {
    fn from(value: domain::todo::TodoItem) -> Self {
        TodoItem {
            id: value.id,
            title: value.title,
            assigned_to: value.assigned_to,
            assigned_by: value.assigned_by,
            tenant_id: value.tenant_id,
        }
    }
}

impl From<TodoItem> for domain::todo::TodoItem {
    fn from(value: TodoItem) -> Self {
        domain::todo::TodoItem {
            id: value.id,
            title: value.title,
            assigned_to: value.assigned_to,
            assigned_by: value.assigned_by,
            tenant_id: value.tenant_id,
        }
    }
}

/// DTO for creating a to-do item. Any ID sent along is ignored, the service assigns one.
#[derive(Serialize, Deserialize, Display, Validate, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
#[display("\"{title}\" for {assigned_to} from {assigned_by}")]
pub struct NewTodoItem {
    #[validate(length(min = 1))]
    #[schema(example = "Prepare the quarterly report")]
    pub title: String,
    #[validate(length(min = 1))]
    #[schema(example = "adele@contoso.com")]
    pub assigned_to: String,
    #[validate(length(min = 1))]
    #[schema(example = "megan@contoso.com")]
    pub assigned_by: String,
    #[validate(length(min = 1))]
    #[schema(example = "72f988bf-86f1-41af-91ab-2d7cd011db47")]
    pub tenant_id: String,
}

impl From<NewTodoItem> for domain::todo::NewTodoItem {
    fn from(value: NewTodoItem) -> Self {
        domain::todo::NewTodoItem {
            title: value.title,
            assigned_to: value.assigned_to,
            assigned_by: value.assigned_by,
            tenant_id: value.tenant_id,
        }
    }
}
