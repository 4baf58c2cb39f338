use crate::app_env::IdentitySettings;
use crate::domain::directory::driven_ports::DelegatedTokenSource;
use crate::domain::directory::{AccessToken, AuthorizationRequired, TokenAcquisitionError};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Provider error codes which mean the user has to sign in or consent again interactively
const INTERACTIVE_ERROR_CODES: &[&str] = &[
    "invalid_grant",
    "interaction_required",
    "consent_required",
    "login_required",
];

/// Exchanges the caller's token for a downstream token with the OAuth2 on-behalf-of flow
pub struct OnBehalfOfTokenSource {
    pub identity: IdentitySettings,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
    suberror: Option<String>,
}

impl TokenErrorResponse {
    fn into_acquisition_error(self, scopes: &[&str]) -> TokenAcquisitionError {
        if INTERACTIVE_ERROR_CODES.contains(&self.error.as_str()) {
            AuthorizationRequired {
                error_code: self.error,
                message: self.error_description,
                scopes: scopes.iter().map(|scope| scope.to_string()).collect(),
            }
            .into()
        } else {
            anyhow!(
                "the identity provider refused the token exchange ({}): {}",
                self.error,
                self.error_description
            )
            .into()
        }
    }
}

impl DelegatedTokenSource for OnBehalfOfTokenSource {
    async fn acquire_delegated_token(
        &self,
        user_assertion: &str,
        scopes: &[&str],
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<AccessToken, TokenAcquisitionError> {
        let scope = scopes.join(" ");
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("client_id", &self.identity.client_id)
            .append_pair("client_secret", &self.identity.client_secret)
            .append_pair("assertion", user_assertion)
            .append_pair("scope", &scope)
            .append_pair("requested_token_use", "on_behalf_of")
            .finish();
        debug!("Requesting a delegated token for scopes [{scope}]");

        let response = ext_cxn
            .http_client()
            .post(self.identity.token_endpoint())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(form)
            .send()
            .await
            .context("contacting the identity provider")?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("reading the token exchange response")?;
        if status.is_success() {
            let token: TokenResponse =
                serde_json::from_slice(&body).context("parsing the issued token")?;
            return Ok(AccessToken(token.access_token));
        }

        let provider_error: TokenErrorResponse = serde_json::from_slice(&body)
            .with_context(|| format!("parsing the token exchange failure ({status})"))?;
        info!(
            "Token exchange was refused with {}{}",
            provider_error.error,
            provider_error
                .suberror
                .as_deref()
                .map(|sub| format!("/{sub}"))
                .unwrap_or_default()
        );

        Err(provider_error.into_acquisition_error(scopes))
    }
}
