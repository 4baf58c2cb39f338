use crate::api::identity::CallerIdentity;
use axum::body;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Used in tests to both extract the raw bytes from the HTTP response body and then deserialize them into the
/// requested type. Will panic and fail the test if either step fails somehow.
pub async fn deserialize_body<T: DeserializeOwned>(response_body: body::Body) -> T {
    let bytes = body::to_bytes(response_body, usize::MAX)
        .await
        .expect("Could not read data from response body!");

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!(
            "Could not parse body content into data structure! Error: {}, Received body: {:?}",
            err, bytes
        )
    })
}

/// Reads a response body as UTF-8 text, failing the test if that isn't possible
pub async fn read_text_body(response_body: body::Body) -> String {
    let bytes = body::to_bytes(response_body, usize::MAX)
        .await
        .expect("Could not read data from response body!");

    String::from_utf8(bytes.to_vec()).expect("response body was not UTF-8")
}

/// The parts of a [BasicErrorResponse][crate::routing_utils::BasicErrorResponse] tests check
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub error_code: String,
    #[allow(dead_code)]
    pub error_description: String,
}

/// Builds an unsigned token carrying the given claims. Only the claims segment is ever read.
pub fn unsigned_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

    format!("{header}.{payload}.")
}

pub fn caller(identity: &str, tenant_id: &str) -> CallerIdentity {
    CallerIdentity {
        tenant_id: tenant_id.to_owned(),
        identity: identity.to_owned(),
        assertion: unsigned_token(serde_json::json!({
            "tid": tenant_id,
            "preferred_username": identity,
        })),
    }
}
