//! Typed client for the to-do list API, used by front ends which forward the signed-in user's
//! token to this service.

use crate::domain::calendar::PLACEHOLDER_EVENT_ID;
use crate::dto;
use anyhow::{Context, anyhow};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue, WWW_AUTHENTICATE};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The service couldn't get a downstream token for the user. The user has to go through an
    /// interactive consent flow for the scopes named in the challenge.
    #[error("the user must consent before the service can act for them: {message}")]
    ConsentRequired {
        challenge: Option<String>,
        message: String,
    },
    #[error("the service responded with {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub struct TodoListClient {
    base_url: Url,
    http_client: ClientWithMiddleware,
}

impl TodoListClient {
    pub fn new(base_url: &str, http_client: ClientWithMiddleware) -> Result<Self, anyhow::Error> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid service URL {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("service URL {base_url} cannot have a path"));
        }

        Ok(TodoListClient {
            base_url,
            http_client,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "TodoList"]).extend(segments);
        }

        url
    }

    pub async fn list_items(&self, user_token: &str) -> Result<Vec<dto::TodoItem>, ClientError> {
        let request = self.http_client.get(self.url(&[])).bearer_auth(user_token);
        self.expect_body(request).await
    }

    /// Fetches an item, returning [None] if the service doesn't know it
    pub async fn item_by_id(
        &self,
        user_token: &str,
        item_id: i32,
    ) -> Result<Option<dto::TodoItem>, ClientError> {
        let request = self
            .http_client
            .get(self.url(&[&item_id.to_string()]))
            .bearer_auth(user_token);
        self.send(request).await
    }

    pub async fn list_users(&self, user_token: &str) -> Result<Vec<String>, ClientError> {
        let request = self
            .http_client
            .get(self.url(&["getallusers"]))
            .bearer_auth(user_token);
        self.expect_body(request).await
    }

    pub async fn add_item(
        &self,
        user_token: &str,
        new_item: &dto::NewTodoItem,
    ) -> Result<dto::TodoItem, ClientError> {
        let request = with_json_body(
            self.http_client.post(self.url(&[])).bearer_auth(user_token),
            new_item,
        )?;
        self.expect_body(request).await
    }

    pub async fn edit_item(
        &self,
        user_token: &str,
        item: &dto::TodoItem,
    ) -> Result<dto::TodoItem, ClientError> {
        let request = with_json_body(
            self.http_client
                .put(self.url(&[&item.id.to_string()]))
                .bearer_auth(user_token),
            item,
        )?;
        self.expect_body(request).await
    }

    pub async fn delete_item(&self, user_token: &str, item_id: i32) -> Result<(), ClientError> {
        let request = self
            .http_client
            .delete(self.url(&[&item_id.to_string()]))
            .bearer_auth(user_token);
        let _deleted: dto::TodoItem = self.expect_body(request).await?;

        Ok(())
    }

    /// Asks the service to put an Inferno event on the user's calendar. Without an event ID the
    /// placeholder event is requested.
    pub async fn create_event(
        &self,
        user_token: &str,
        event_id: Option<&str>,
    ) -> Result<dto::CalendarEvent, ClientError> {
        let event_id = event_id.unwrap_or(PLACEHOLDER_EVENT_ID);
        let request = self
            .http_client
            .get(self.url(&["createevent", event_id]))
            .bearer_auth(user_token);
        self.expect_body(request).await
    }

    async fn expect_body<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        self.send(request).await?.ok_or_else(|| ClientError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        })
    }

    /// Sends a request, mapping a 404 to [None] and other failures to [ClientError]s
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ClientError> {
        let response = request
            .send()
            .await
            .context("sending a request to the to-do list service")?;
        let status = response.status();
        debug!("To-do list service responded with {status}");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|val| val.to_str().ok())
                .map(str::to_owned);
            let message = response.text().await.unwrap_or_default();
            warn!("The to-do list service needs the user to consent again");

            return Err(ClientError::ConsentRequired { challenge, message });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, body });
        }

        let body = response
            .bytes()
            .await
            .context("reading the to-do list service response")?;
        let parsed = serde_json::from_slice(&body).context("parsing the to-do list service response")?;

        Ok(Some(parsed))
    }
}

fn with_json_body(request: RequestBuilder, payload: &impl Serialize) -> Result<RequestBuilder, ClientError> {
    let body = serde_json::to_vec(payload).context("serializing the request body")?;

    Ok(request
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body))
}
