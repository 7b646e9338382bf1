use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};
use valuhub_engine::config::AppConfig;
use valuhub_engine::interfaces::LoggingEventProducer;
use valuhub_engine::observability::metrics::register_metrics;
use valuhub_engine::observability::tracing::init_tracing;
use valuhub_engine::types::property::ValuationRequest;
use valuhub_engine::ValuationOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("VALUHUB_ENV").unwrap_or_else(|_| "development".to_string());
    init_tracing(env == "production");
    register_metrics();

    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Falling back to built-in configuration");
            AppConfig::default()
        }
    };

    let orchestrator = ValuationOrchestrator::from_config(&config, Arc::new(LoggingEventProducer::new()))
        .context("building valuation engine")?;
    orchestrator.market().start();

    let request = ValuationRequest {
        area: Some(120.0),
        location: Some("furong".to_string()),
        building_type: Some("商业".to_string()),
        valuation_method: Some("综合估价法".to_string()),
        ..ValuationRequest::default()
    };

    match orchestrator.perform_valuation(request).await {
        Ok(result) => {
            info!(
                total_value = result.total_value,
                unit_price = result.unit_price,
                confidence = result.confidence,
                "Demo valuation complete"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Err(e) => {
            for message in e.user_messages() {
                eprintln!("{}", message);
            }
        }
    }

    let status = orchestrator.market().status();
    info!(
        state = ?status.state,
        sources = ?status.contributing_sources,
        scheduler_healthy = status.scheduler_healthy,
        "Market data status"
    );

    orchestrator.market().stop();
    Ok(())
}
