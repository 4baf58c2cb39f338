use anyhow::anyhow;

/// URL for accessing the PostrgeSQL database (should contain a schema name in the path)
pub const DB_URL: &str = "DATABASE_URL";
/// Log level configuration for the application. For formatting info, see [tracing_subscriber's EnvFilter](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Address the HTTP server binds to, "0.0.0.0:8080" by default
pub const SERVER_ADDRESS: &str = "SERVER_ADDRESS";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Bearer credential sent to the Inferno events API
pub const INFERNO_API_KEY: &str = "INFERNO_API_KEY";
/// Base address of the Inferno events API
pub const INFERNO_API_BASE_URL: &str = "INFERNO_API_BASE_URL";
/// Base address of the Microsoft Graph API, including the version segment
pub const GRAPH_API_BASE_URL: &str = "GRAPH_API_BASE_URL";
/// Identity provider host used for on-behalf-of token exchange
pub const AAD_INSTANCE: &str = "AAD_INSTANCE";
/// Tenant segment of the token endpoint ("organizations" for multi-tenant apps)
pub const AAD_TENANT_ID: &str = "AAD_TENANT_ID";
/// Application (client) ID this service authenticates as
pub const AAD_CLIENT_ID: &str = "AAD_CLIENT_ID";
/// Client secret this service authenticates with
pub const AAD_CLIENT_SECRET: &str = "AAD_CLIENT_SECRET";

const DEFAULT_INFERNO_API_BASE_URL: &str = "https://api.infernocore.jolokia.com";
const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_AAD_INSTANCE: &str = "https://login.microsoftonline.com";
const DEFAULT_AAD_TENANT_ID: &str = "organizations";

/// Credentials this service uses to exchange a caller's token for a downstream one
#[derive(Clone, Debug)]
pub struct IdentitySettings {
    pub instance: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl IdentitySettings {
    /// The OAuth2 v2 token endpoint for the configured tenant
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.instance.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

/// Settings for the outbound integrations of the service
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub inferno_api_key: String,
    pub inferno_base_url: String,
    pub graph_base_url: String,
    pub identity: IdentitySettings,
}

impl ServiceSettings {
    /// Reads settings from the process environment
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup. Required values that are missing or blank
    /// produce an error naming the variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let value = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let required = |key: &str| {
            value(key).ok_or_else(|| anyhow!("the {key} environment variable must be set"))
        };
        let with_default = |key: &str, default: &str| value(key).unwrap_or_else(|| default.to_owned());

        Ok(ServiceSettings {
            inferno_api_key: required(INFERNO_API_KEY)?,
            inferno_base_url: with_default(INFERNO_API_BASE_URL, DEFAULT_INFERNO_API_BASE_URL),
            graph_base_url: with_default(GRAPH_API_BASE_URL, DEFAULT_GRAPH_API_BASE_URL),
            identity: IdentitySettings {
                instance: with_default(AAD_INSTANCE, DEFAULT_AAD_INSTANCE),
                tenant_id: with_default(AAD_TENANT_ID, DEFAULT_AAD_TENANT_ID),
                client_id: required(AAD_CLIENT_ID)?,
                client_secret: required(AAD_CLIENT_SECRET)?,
            },
        })
    }
}
