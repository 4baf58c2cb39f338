//! Driven adapters for the HTTP services this service calls out to. Each adapter sends its
//! requests through the traced client owned by [ExternalConnectivity][crate::external_connections::ExternalConnectivity].

pub mod graph;
pub mod inferno;
pub mod token_exchange;

use anyhow::anyhow;
use url::Url;

/// Appends path segments to a base URL, percent-encoding each segment
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url, anyhow::Error> {
    let mut url = Url::parse(base_url).map_err(|err| anyhow!("invalid base URL {base_url}: {err}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL {base_url} cannot have a path"))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Reads whatever text a failed response carried so it can be attached to an error
async fn failure_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("{status}: {body}"),
        _ => status.to_string(),
    }
}
