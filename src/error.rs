use crate::model::PokemonId;
use crate::predictor::PredictorError;
use thiserror::Error;

/// Failures while answering a single matchup.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The id is not in the roster. Reported back to the caller.
    #[error("Invalid Pokémon ID")]
    UnknownPokemon(PokemonId),

    #[error("predictor failed: {0}")]
    Predictor(#[from] PredictorError),

    #[error("predictor returned {0}, expected a probability in [0, 1]")]
    InvalidScore(f32),
}

impl PredictError {
    /// True when the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::UnknownPokemon(_))
    }
}

pub type Result<T> = std::result::Result<T, PredictError>;
