use crate::error::{PredictError, Result};
use crate::features::{build_features, decide_winner, FeatureVector};
use crate::model::PokemonId;
use crate::predictor::Predictor;
use crate::roster::Roster;
use crate::types::TypeChart;
use serde::Serialize;

/// Everything a prediction needs, loaded once at start-up and shared read-only.
pub struct BattleContext {
    roster: Roster,
    chart: TypeChart,
    predictor: Box<dyn Predictor>,
}

impl std::fmt::Debug for BattleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleContext")
            .field("roster", &self.roster)
            .field("chart", &self.chart)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub first: PokemonId,
    pub second: PokemonId,
    pub score: f32,
    pub winner_id: PokemonId,
    pub winner_name: String,
}

impl BattleContext {
    pub fn new(roster: Roster, chart: TypeChart, predictor: impl Predictor + 'static) -> Self {
        Self::with_boxed_predictor(roster, chart, Box::new(predictor))
    }

    pub fn with_boxed_predictor(
        roster: Roster,
        chart: TypeChart,
        predictor: Box<dyn Predictor>,
    ) -> Self {
        BattleContext {
            roster,
            chart,
            predictor,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    pub fn features(&self, first: PokemonId, second: PokemonId) -> Result<FeatureVector> {
        build_features(&self.roster, &self.chart, first, second)
    }

    /// Classifier probability that `first` beats `second`.
    pub fn score(&self, first: PokemonId, second: PokemonId) -> Result<f32> {
        let features = self.features(first, second)?;
        let score = self.predictor.score(&features)?;
        if !(0.0..=1.0).contains(&score) {
            return Err(PredictError::InvalidScore(score));
        }
        Ok(score)
    }

    pub fn predict(&self, first: PokemonId, second: PokemonId) -> Result<Prediction> {
        let score = self.score(first, second)?;
        let winner_id = decide_winner(score, first, second);
        let winner_name = self
            .roster
            .get(winner_id)
            .map(|p| p.name.clone())
            .ok_or(PredictError::UnknownPokemon(winner_id))?;
        log::debug!("{first} vs {second}: score {score:.4}, winner {winner_id} ({winner_name})");
        Ok(Prediction {
            first,
            second,
            score,
            winner_id,
            winner_name,
        })
    }
}
