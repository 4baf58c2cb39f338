//! Works out who is calling from the bearer token on the request. Signatures are checked before
//! requests reach this service, so only the claims segment of the token is decoded here.

use crate::domain::todo::TodoViewer;
use crate::logging;
use crate::routing_utils::UnauthenticatedResponse;
use anyhow::{Context, anyhow};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use std::fmt::{self, Debug, Formatter};
use tracing::{Span, debug};

/// The signed-in user making a request
#[derive(Clone)]
pub struct CallerIdentity {
    pub tenant_id: String,
    /// Preferred username of the caller, which is what to-do items are assigned to and by
    pub identity: String,
    /// The caller's raw token, exchanged for downstream tokens on their behalf
    pub assertion: String,
}

impl Debug for CallerIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerIdentity")
            .field("tenant_id", &self.tenant_id)
            .field("identity", &self.identity)
            .field("assertion", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct Claims {
    tid: Option<String>,
    preferred_username: Option<String>,
    name: Option<String>,
}

impl CallerIdentity {
    pub fn from_bearer_token(token: &str) -> Result<Self, anyhow::Error> {
        let claims_segment = token
            .split('.')
            .nth(1)
            .ok_or_else(|| anyhow!("the bearer token is not a JWT"))?;
        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_segment.trim_end_matches('='))
            .context("decoding the token claims")?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).context("parsing the token claims")?;

        let tenant_id = claims
            .tid
            .filter(|tid| !tid.is_empty())
            .ok_or_else(|| anyhow!("the token has no tenant claim"))?;
        let identity = claims
            .preferred_username
            .or(claims.name)
            .filter(|ident| !ident.is_empty())
            .ok_or_else(|| anyhow!("the token does not name the caller"))?;

        Ok(CallerIdentity {
            tenant_id,
            identity,
            assertion: token.to_owned(),
        })
    }

    pub fn viewer(&self) -> TodoViewer<'_> {
        TodoViewer {
            tenant_id: &self.tenant_id,
            identity: &self.identity,
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = UnauthenticatedResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|val| val.to_str().ok())
            .ok_or_else(|| UnauthenticatedResponse("no bearer token was provided".to_owned()))?;
        let token = authorization
            .strip_prefix("Bearer ")
            .or_else(|| authorization.strip_prefix("bearer "))
            .ok_or_else(|| {
                UnauthenticatedResponse("the authorization header is not a bearer token".to_owned())
            })?;

        let caller = CallerIdentity::from_bearer_token(token.trim()).map_err(|err| {
            debug!("Rejected caller token: {err:#}");
            UnauthenticatedResponse(err.to_string())
        })?;
        Span::current().record(logging::TENANT_FIELD, caller.tenant_id.as_str());

        Ok(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::unsigned_token;
    use axum::http::Request;
    use speculoos::prelude::*;

    #[test]
    fn reads_tenant_and_username() {
        let token = unsigned_token(serde_json::json!({
            "tid": "contoso",
            "preferred_username": "megan@contoso.com",
            "name": "Megan Bowen"
        }));

        let caller = CallerIdentity::from_bearer_token(&token);
        assert_that!(caller).is_ok().matches(|caller| {
            caller.tenant_id == "contoso"
                && caller.identity == "megan@contoso.com"
                && caller.assertion == token
        });
    }

    #[test]
    fn falls_back_to_display_name() {
        let token = unsigned_token(serde_json::json!({
            "tid": "contoso",
            "name": "Megan Bowen"
        }));

        let caller = CallerIdentity::from_bearer_token(&token);
        assert_that!(caller)
            .is_ok()
            .matches(|caller| caller.identity == "Megan Bowen");
    }

    #[test]
    fn rejects_token_without_tenant() {
        let token = unsigned_token(serde_json::json!({
            "preferred_username": "megan@contoso.com"
        }));

        assert_that!(CallerIdentity::from_bearer_token(&token)).is_err();
        assert_that!(CallerIdentity::from_bearer_token("not-a-jwt")).is_err();
    }

    #[tokio::test]
    async fn extracts_from_authorization_header() {
        let token = unsigned_token(serde_json::json!({
            "tid": "contoso",
            "preferred_username": "megan@contoso.com"
        }));
        let (mut parts, _) = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts();

        let caller = CallerIdentity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(caller, Ok(CallerIdentity { tenant_id, .. }) if tenant_id == "contoso"));
    }

    #[test]
    fn debug_output_hides_the_token() {
        let token = unsigned_token(serde_json::json!({
            "tid": "contoso",
            "preferred_username": "megan@contoso.com"
        }));
        let caller = CallerIdentity::from_bearer_token(&token);
        assert_that!(caller).is_ok();

        let debug_output = format!("{caller:?}");
        assert!(debug_output.contains("megan@contoso.com"));
        assert!(!debug_output.contains(&token));
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let caller = CallerIdentity::from_request_parts(&mut parts, &()).await;
        assert!(caller.is_err());
    }
}
