//! Search Adapter Smoke Runner
//!
//! Runs the end-to-end scenarios of `search-adapter` against a live
//! OpenSearch node and exits with an error if any of them fails.

mod errors;
mod fixtures;
mod scenarios;

use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use search_adapter::{
    AdapterContext, OpenSearchConfig, OpenSearchTransport, SearchAdapter, TracingLogger,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::SmokeError;

/// Default prefix of the indexes created by the scenarios.
const DEFAULT_INDEX_PREFIX: &str = "search-adapter-smoke";

/// Initialize tracing/logging.
///
/// `LOG_FORMAT=json` switches to JSON output; otherwise output is pretty
/// console logs.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("search_adapter=debug,search_adapter_smoke=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "search-adapter-smoke",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "search-adapter-smoke",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

/// Build the adapter from environment variables.
///
/// # Environment Variables
///
/// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
fn build_adapter() -> Result<SearchAdapter, SmokeError> {
    let config = OpenSearchConfig::from_env();
    info!(url = %config.url, "Connecting to OpenSearch");

    let transport = OpenSearchTransport::from_config(&config)?;
    let context = AdapterContext::new(Arc::new(transport)).with_logger(Arc::new(TracingLogger));

    Ok(SearchAdapter::new(context))
}

#[tokio::main]
async fn main() -> Result<(), SmokeError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    let prefix = env::var("SMOKE_INDEX_PREFIX")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_string());

    let adapter = match build_adapter() {
        Ok(adapter) => adapter,
        Err(e) => {
            error!(error = %e, "Failed to initialize adapter");
            return Err(e);
        }
    };

    let mut failed = 0;
    for scenario in scenarios::SCENARIOS {
        match scenarios::run(&adapter, &prefix, scenario).await {
            Ok(()) => info!(scenario, "Scenario passed"),
            Err(e) => {
                failed += 1;
                error!(scenario, error = %e, "Scenario failed");
            }
        }
    }

    let total = scenarios::SCENARIOS.len();
    if failed > 0 {
        return Err(SmokeError::ScenariosFailed { failed, total });
    }

    info!(total, "All scenarios passed");
    Ok(())
}
