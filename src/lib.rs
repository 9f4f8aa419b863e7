pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod logger;
pub mod matrix;
pub mod model;
pub mod outcome;
pub mod predictor;
pub mod roster;
pub mod server;
pub mod types;

use crate::config::AppConfig;
use crate::context::BattleContext;
use crate::model::PokemonId;
use crate::outcome::{NdjsonOutcomeLog, OutcomeLog};
use crate::predictor::DenseNetwork;
use crate::roster::Roster;
use crate::server::PredictService;
use crate::types::TypeChart;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Command {
    /// Serve `POST /predict/` until interrupted.
    Serve,
    /// Print one prediction as JSON.
    Predict {
        first: PokemonId,
        second: PokemonId,
    },
    /// Score every ordered pair of `ids` and write a CSV matrix.
    Matrix {
        ids: Vec<PokemonId>,
        output_path: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub config: AppConfig,
    pub command: Command,
}

/// Loads roster, chart and model. Any failure here must stop start-up.
pub fn load_context(config: &AppConfig) -> anyhow::Result<BattleContext> {
    let roster = Roster::load(&config.roster_path)?;
    if roster.is_empty() {
        anyhow::bail!("Roster {} has no Pokemon", config.roster_path.display());
    }
    let chart = match &config.type_chart_path {
        Some(path) => TypeChart::load(path)?,
        None => TypeChart::Builtin,
    };
    let model = DenseNetwork::load(&config.model_path)?;
    log::info!(
        "Loaded {} Pokemon from {}, model {} with layers {:?}",
        roster.len(),
        config.roster_path.display(),
        config.model_path.display(),
        model.layer_sizes()
    );
    Ok(BattleContext::new(roster, chart, model))
}

pub fn build_service(config: &AppConfig) -> anyhow::Result<PredictService> {
    let context = load_context(config)?;
    let outcomes: Option<Box<dyn OutcomeLog>> = match &config.outcome_log_path {
        Some(path) => {
            let outcome_log = NdjsonOutcomeLog::open(path)?;
            log::info!("Recording battle outcomes to {}", outcome_log.path().display());
            Some(Box::new(outcome_log))
        }
        None => None,
    };
    Ok(PredictService::new(context, outcomes))
}

async fn serve_until_shutdown(config: &AppConfig) -> anyhow::Result<()> {
    let service = Arc::new(build_service(config)?);
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    tokio::select! {
        res = server::serve(listener, service) => res,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

pub fn run(opts: CliOptions) -> anyhow::Result<()> {
    let config = opts.config;
    match opts.command {
        Command::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve_until_shutdown(&config))
        }
        Command::Predict { first, second } => {
            let ctx = load_context(&config)?;
            let features = ctx.features(first, second)?;
            let prediction = ctx.predict(first, second)?;
            let out = serde_json::json!({
                "predictor": ctx.predictor_name(),
                "features": features,
                "prediction": prediction,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Command::Matrix { ids, output_path } => {
            let ctx = load_context(&config)?;
            let matrix = matrix::compute_matrix(&ctx, &ids)?;
            matrix::write_csv(&ids, &matrix, &output_path)?;
            println!(
                "Wrote {}x{} matrix to {}",
                matrix.len(),
                matrix.first().map(|r| r.len()).unwrap_or(0),
                output_path.display()
            );
            Ok(())
        }
    }
}
