use std::collections::HashMap;

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::{trace, Resource};
use sentry::ClientInitGuard;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};
use tracing_tree::HierarchicalLayer;

const HONEYCOMB_ENDPOINT: &str = "https://api.honeycomb.io/v1/traces";

/// Start Sentry when a DSN is configured. Keep the guard alive for the whole program.
pub fn setup_sentry() -> Option<ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    )))
}

pub fn setup_tracing(service_name: &str) -> crate::Result<()> {
    color_eyre::install()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{}=debug", env!("CARGO_CRATE_NAME"))));

    let tree_layer = HierarchicalLayer::default()
        .with_writer(std::io::stdout)
        .with_indent_lines(true)
        .with_indent_amount(2)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_verbose_exit(true)
        .with_verbose_entry(true)
        .with_targets(true);

    let otel_layer = match std::env::var("HONEYCOMB_API_KEY") {
        Ok(api_key) => {
            let headers = HashMap::from([("x-honeycomb-team".to_string(), api_key)]);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .http()
                        .with_endpoint(HONEYCOMB_ENDPOINT)
                        .with_headers(headers),
                )
                .with_trace_config(trace::config().with_resource(Resource::new(vec![
                    KeyValue::new("service.name", service_name.to_string()),
                ])))
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tree_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}
