use crate::error::PredictError;
use crate::model::{Pokemon, PokemonId};
use crate::roster::Roster;
use crate::types::{type_effectiveness, TypeChart};
use serde::Serialize;

/// Width of the classifier input.
pub const FEATURE_COUNT: usize = 15;

/// Score strictly above this picks the first Pokemon.
pub const WIN_THRESHOLD: f32 = 0.5;

/// Classifier input, in training order:
/// `[p1 hp, atk, def, spa, spd, spe, legendary, p2 hp, atk, def, spa, spd, spe, legendary, type effectiveness]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_array(values: [f32; FEATURE_COUNT]) -> Self {
        FeatureVector(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_array(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    pub fn type_effectiveness(&self) -> f32 {
        self.0[FEATURE_COUNT - 1]
    }
}

fn side_features(p: &Pokemon) -> [f32; 7] {
    let s = p.stats.as_array();
    [
        s[0] as f32,
        s[1] as f32,
        s[2] as f32,
        s[3] as f32,
        s[4] as f32,
        s[5] as f32,
        if p.legendary { 1.0 } else { 0.0 },
    ]
}

/// Builds the vector for two already resolved Pokemon, `first` attacking `second`.
pub fn matchup_features(chart: &TypeChart, first: &Pokemon, second: &Pokemon) -> FeatureVector {
    let effectiveness = type_effectiveness(chart, first.type_slots(), second.type_slots());
    let mut values = [0.0f32; FEATURE_COUNT];
    values[..7].copy_from_slice(&side_features(first));
    values[7..14].copy_from_slice(&side_features(second));
    values[14] = effectiveness;
    FeatureVector(values)
}

/// Looks up both ids and builds the vector. Fails on the first id missing from the roster.
pub fn build_features(
    roster: &Roster,
    chart: &TypeChart,
    first: PokemonId,
    second: PokemonId,
) -> Result<FeatureVector, PredictError> {
    let p1 = roster.get(first).ok_or(PredictError::UnknownPokemon(first))?;
    let p2 = roster.get(second).ok_or(PredictError::UnknownPokemon(second))?;
    Ok(matchup_features(chart, p1, p2))
}

/// Picks the winner id for a classifier score. A score of exactly 0.5 goes to `second`.
pub fn decide_winner(score: f32, first: PokemonId, second: PokemonId) -> PokemonId {
    if score > WIN_THRESHOLD {
        first
    } else {
        second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stats;
    use crate::types::PokemonType;

    fn mon(id: PokemonId, name: &str, types: [Option<PokemonType>; 2], stats: [u32; 6]) -> Pokemon {
        let [hp, atk, def, spa, spd, spe] = stats;
        Pokemon {
            id,
            name: name.to_string(),
            primary_type: types[0].unwrap_or(PokemonType::Normal),
            secondary_type: types[1],
            stats: Stats {
                hp,
                atk,
                def,
                spa,
                spd,
                spe,
            },
            legendary: false,
        }
    }

    fn roster() -> Roster {
        let mut mewtwo = mon(
            150,
            "Mewtwo",
            [Some(PokemonType::Psychic), None],
            [106, 110, 90, 154, 90, 130],
        );
        mewtwo.legendary = true;
        Roster::from_pokemon(vec![
            mon(4, "Charmander", [Some(PokemonType::Fire), None], [39, 52, 43, 60, 50, 65]),
            mon(7, "Squirtle", [Some(PokemonType::Water), None], [44, 48, 65, 50, 64, 43]),
            mewtwo,
        ])
        .unwrap()
    }

    #[test]
    fn charmander_vs_squirtle_vector() {
        let fv = build_features(&roster(), &TypeChart::Builtin, 4, 7).unwrap();
        assert_eq!(
            fv.as_array(),
            &[39.0, 52.0, 43.0, 60.0, 50.0, 65.0, 0.0, 44.0, 48.0, 65.0, 50.0, 64.0, 43.0, 0.0, 0.5]
        );
    }

    #[test]
    fn order_of_ids_sets_attacker() {
        let roster = roster();
        let fv = build_features(&roster, &TypeChart::Builtin, 7, 4).unwrap();
        assert_eq!(fv.as_slice().len(), FEATURE_COUNT);
        assert_eq!(fv.as_slice()[0], 44.0);
        assert_eq!(fv.type_effectiveness(), 2.0);
    }

    #[test]
    fn legendary_flag_is_numeric() {
        let fv = build_features(&roster(), &TypeChart::Builtin, 150, 4).unwrap();
        assert_eq!(fv.as_slice()[6], 1.0);
        assert_eq!(fv.as_slice()[13], 0.0);
        assert_eq!(fv.type_effectiveness(), 1.0);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let roster = roster();
        assert!(matches!(
            build_features(&roster, &TypeChart::Builtin, -1, 4),
            Err(PredictError::UnknownPokemon(-1))
        ));
        assert!(matches!(
            build_features(&roster, &TypeChart::Builtin, 4, 999),
            Err(PredictError::UnknownPokemon(999))
        ));
    }

    #[test]
    fn threshold_ties_go_to_second() {
        assert_eq!(decide_winner(0.5, 4, 7), 7);
        assert_eq!(decide_winner(0.50001, 4, 7), 4);
        assert_eq!(decide_winner(0.0, 4, 7), 7);
        assert_eq!(decide_winner(1.0, 4, 7), 4);
    }
}
