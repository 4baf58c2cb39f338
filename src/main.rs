use anyhow::Context;
use dotenv::dotenv;
use std::env;
use todo_list_service::app_env::{self, ServiceSettings};
use todo_list_service::{SharedData, build_router, db, logging, persistence};
use tracing::info;

const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let otel_exporters = match (
        env::var(app_env::OTEL_SPAN_EXPORT_URL),
        env::var(app_env::OTEL_METRIC_EXPORT_URL),
    ) {
        (Ok(span_url), Ok(metric_url)) => Some(logging::init_exporters(&span_url, &metric_url)?),
        _ => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter()?, otel_exporters)?;

    let settings = ServiceSettings::from_env()?;
    let db_url = env::var(app_env::DB_URL)
        .with_context(|| format!("the {} environment variable must be set", app_env::DB_URL))?;

    info!("Connecting to database...");
    let pool = db::connect_sqlx(&db_url).await?;
    db::run_migrations(&pool).await?;

    let shared_data = SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(pool)?,
        settings,
    };
    let router = build_router(shared_data);

    let server_address =
        env::var(app_env::SERVER_ADDRESS).unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_owned());
    let listener = tokio::net::TcpListener::bind(&server_address)
        .await
        .with_context(|| format!("binding to {server_address}"))?;

    info!("Serving requests on {server_address}");
    axum::serve(listener, router)
        .await
        .context("serving HTTP requests")
}
