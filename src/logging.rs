use crate::app_env;
use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use opentelemetry_sdk::{Resource, runtime};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing::{Span, debug, debug_span, field};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// Name the service reports itself under to OpenTelemetry collectors
const SERVICE_NAME: &str = "todo-list-service";

/// Field on the request span naming the caller's tenant, filled in once the caller is identified
pub const TENANT_FIELD: &str = "tenant_id";

/// Trace and metric pipelines feeding an OTLP collector
pub struct OtelExporters {
    pub tracer: Tracer,
    pub meter: SdkMeterProvider,
}

/// Opens a "request" span around every request, joined to any W3C trace context the caller sent.
/// The span carries the method, path, caller tenant, response status and latency.
pub fn attach_tracing_http<T>(router: Router<T>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let req_span = debug_span!(
                "request",
                method = request.method().as_str(),
                path = request.uri().path(),
                tenant_id = field::Empty,
                response_status = field::Empty,
                latency_ms = field::Empty,
            );
            let caller_context = global::get_text_map_propagator(|propagator| {
                propagator.extract(&HeaderExtractor(request.headers()))
            });
            req_span.set_parent(caller_context);

            req_span
        })
        .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
            span.record("response_status", field::display(response.status()));
            span.record("latency_ms", latency.as_millis() as u64);
            debug!("Finished handling request");
        });

    router.layer(trace_layer)
}

/// Builds OTLP exporters sending spans and metrics over gRPC, usually to a collector sidecar on
/// http://localhost:4317
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let service_resource = || Resource::new([KeyValue::new("service.name", SERVICE_NAME)]);

    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()
        .context("building the span exporter")?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()
        .context("building the metric exporter")?;

    let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(service_resource())
        .build()
        .tracer(SERVICE_NAME);
    let meter = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(meter_export, runtime::Tokio).build())
        .with_resource(service_resource())
        .build();

    Ok(OtelExporters { tracer, meter })
}

/// Per-module log filter read from [app_env::LOG_LEVEL], "info" when unset
pub fn init_env_filter() -> Result<EnvFilter, anyhow::Error> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(app_env::LOG_LEVEL)
        .from_env()
        .with_context(|| format!("parsing the {} filter", app_env::LOG_LEVEL))
}

/// Installs the global subscriber. JSON logs go to stdout through [env_filter]. When exporters
/// are given, everything at "debug" and above is also exported as spans and metrics.
pub fn setup_logging_and_tracing(
    env_filter: EnvFilter,
    otel_exporters: Option<OtelExporters>,
) -> Result<(), anyhow::Error> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let (otel_traces, otel_metrics) = match otel_exporters {
        Some(exporters) => (
            Some(OpenTelemetryLayer::new(exporters.tracer)),
            Some(MetricsLayer::new(exporters.meter)),
        ),
        None => (None, None),
    };

    registry()
        .with(LevelFilter::DEBUG)
        .with(otel_traces)
        .with(otel_metrics)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_filter(env_filter),
        )
        .try_init()
        .context("installing the global log subscriber")
}
