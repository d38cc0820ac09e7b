use std::process::ExitCode;
use std::sync::Arc;

use adaptive_engine::adaptive::config::EngineConfig;
use adaptive_engine::adaptive::engine::AdaptiveEngine;
use adaptive_engine::config::Config;
use adaptive_engine::error::EngineError;
use adaptive_engine::logging::{init_tracing, LogConfig};
use adaptive_engine::scenario::{self, Scenario};
use adaptive_engine::store::Store;

const USAGE: &str = "usage: adaptive-engine <scenario.json>";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&LogConfig::from(&config));

    let Some(scenario_path) = std::env::args().nth(1) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(&config, &scenario_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, path = %scenario_path, "Scenario replay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, scenario_path: &str) -> Result<(), EngineError> {
    let engine_config = match &config.engine_config_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            tracing::info!(path = %path, "Loading engine config file");
            EngineConfig::from_json(&raw, &config.engine)?
        }
        None => EngineConfig::from_env(&config.engine),
    };

    let scenario = Scenario::load(scenario_path).await?;
    let catalog = scenario.catalog()?;

    let store = Arc::new(Store::open(&config.sled_path)?);
    tracing::info!(
        sled_path = %config.sled_path,
        skills = catalog.len(),
        answers = scenario.answers.len(),
        "Starting adaptive-engine replay"
    );

    let engine = AdaptiveEngine::new(engine_config, catalog, store.clone())?;
    let report = scenario::run(&engine, &scenario).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    store.flush()?;
    Ok(())
}
