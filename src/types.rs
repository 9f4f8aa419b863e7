use anyhow::Context;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl PokemonType {
    pub const ALL: [PokemonType; 18] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Electric,
        PokemonType::Grass,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dragon,
        PokemonType::Dark,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PokemonType::Normal => "Normal",
            PokemonType::Fire => "Fire",
            PokemonType::Water => "Water",
            PokemonType::Electric => "Electric",
            PokemonType::Grass => "Grass",
            PokemonType::Ice => "Ice",
            PokemonType::Fighting => "Fighting",
            PokemonType::Poison => "Poison",
            PokemonType::Ground => "Ground",
            PokemonType::Flying => "Flying",
            PokemonType::Psychic => "Psychic",
            PokemonType::Bug => "Bug",
            PokemonType::Rock => "Rock",
            PokemonType::Ghost => "Ghost",
            PokemonType::Dragon => "Dragon",
            PokemonType::Dark => "Dark",
            PokemonType::Steel => "Steel",
            PokemonType::Fairy => "Fairy",
        }
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PokemonType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PokemonType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("Unknown type {wanted:?}"))
    }
}

// Only the attacking types the classifier was trained against are listed.
// Missing attackers and defenders fall back to a neutral 1.0.
static BUILTIN_CHART: phf::Map<&'static str, &'static [(PokemonType, f32)]> = phf_map! {
    "Normal" => &[
        (PokemonType::Rock, 0.5),
        (PokemonType::Ghost, 0.0),
        (PokemonType::Steel, 0.5),
    ],
    "Fire" => &[
        (PokemonType::Fire, 0.5),
        (PokemonType::Water, 0.5),
        (PokemonType::Grass, 2.0),
        (PokemonType::Ice, 2.0),
        (PokemonType::Bug, 2.0),
        (PokemonType::Rock, 0.5),
        (PokemonType::Dragon, 0.5),
        (PokemonType::Steel, 2.0),
    ],
    "Water" => &[
        (PokemonType::Fire, 2.0),
        (PokemonType::Water, 0.5),
        (PokemonType::Grass, 0.5),
        (PokemonType::Ground, 2.0),
        (PokemonType::Rock, 2.0),
        (PokemonType::Dragon, 0.5),
    ],
    "Electric" => &[
        (PokemonType::Water, 2.0),
        (PokemonType::Electric, 0.5),
        (PokemonType::Grass, 0.5),
        (PokemonType::Ground, 0.0),
        (PokemonType::Flying, 2.0),
        (PokemonType::Dragon, 0.5),
    ],
    "Grass" => &[
        (PokemonType::Fire, 0.5),
        (PokemonType::Water, 2.0),
        (PokemonType::Grass, 0.5),
        (PokemonType::Poison, 0.5),
        (PokemonType::Ground, 2.0),
        (PokemonType::Flying, 0.5),
        (PokemonType::Bug, 0.5),
        (PokemonType::Rock, 2.0),
        (PokemonType::Dragon, 0.5),
        (PokemonType::Steel, 0.5),
    ],
    "Ice" => &[
        (PokemonType::Fire, 0.5),
        (PokemonType::Water, 0.5),
        (PokemonType::Ice, 0.5),
        (PokemonType::Ground, 2.0),
        (PokemonType::Flying, 2.0),
        (PokemonType::Dragon, 2.0),
        (PokemonType::Steel, 0.5),
    ],
    "Fighting" => &[
        (PokemonType::Normal, 2.0),
        (PokemonType::Ice, 2.0),
        (PokemonType::Rock, 2.0),
        (PokemonType::Dark, 2.0),
        (PokemonType::Steel, 2.0),
        (PokemonType::Poison, 0.5),
        (PokemonType::Flying, 0.5),
        (PokemonType::Psychic, 0.5),
        (PokemonType::Bug, 0.5),
        (PokemonType::Ghost, 0.0),
        (PokemonType::Fairy, 0.5),
    ],
};

/// Attacking type -> defending type -> multiplier.
#[derive(Debug, Clone, Default)]
pub enum TypeChart {
    /// The static chart compiled into the binary.
    #[default]
    Builtin,
    /// A replacement chart loaded from JSON.
    Custom(HashMap<PokemonType, HashMap<PokemonType, f32>>),
}

impl TypeChart {
    /// Multiplier for a single attacker/defender pairing. Unlisted pairs are 1.0.
    pub fn multiplier(&self, attacking: PokemonType, defending: PokemonType) -> f32 {
        match self {
            TypeChart::Builtin => BUILTIN_CHART
                .get(attacking.name())
                .and_then(|row| row.iter().find(|(t, _)| *t == defending))
                .map(|(_, m)| *m)
                .unwrap_or(1.0),
            TypeChart::Custom(rows) => rows
                .get(&attacking)
                .and_then(|row| row.get(&defending))
                .copied()
                .unwrap_or(1.0),
        }
    }

    /// Parses a chart of the form `{"Fire": {"Water": 0.5, ...}, ...}`.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: HashMap<String, HashMap<String, f32>> =
            serde_json::from_str(raw).context("Type chart must be a JSON object of objects")?;
        let mut rows = HashMap::new();
        for (atk_name, entries) in parsed {
            let atk: PokemonType = atk_name
                .parse()
                .with_context(|| format!("Invalid attacking type in chart: {atk_name}"))?;
            let mut row = HashMap::new();
            for (def_name, value) in entries {
                let def: PokemonType = def_name.parse().with_context(|| {
                    format!("Invalid defending type in chart row {atk_name}: {def_name}")
                })?;
                if !value.is_finite() || value < 0.0 {
                    anyhow::bail!("Multiplier for {atk_name} -> {def_name} must be >= 0, got {value}");
                }
                if row.insert(def, value).is_some() {
                    anyhow::bail!("Defending type {def} is listed twice in chart row {atk_name}");
                }
            }
            if rows.insert(atk, row).is_some() {
                anyhow::bail!("Attacking type {atk} is listed twice in chart");
            }
        }
        Ok(TypeChart::Custom(rows))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read type chart at {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse type chart from {}", path.display()))
    }
}

/// Product of the chart entries over every present (attacking, defending) slot pair.
///
/// Empty slots are skipped rather than counted as neutral, so a single-typed
/// side only contributes the pairs it actually has.
pub fn type_effectiveness(
    chart: &TypeChart,
    attacker: [Option<PokemonType>; 2],
    defender: [Option<PokemonType>; 2],
) -> f32 {
    let mut multiplier = 1.0;
    for atk in attacker.iter().flatten() {
        for def in defender.iter().flatten() {
            multiplier *= chart.multiplier(*atk, *def);
        }
    }
    multiplier
}
