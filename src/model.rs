use crate::types::PokemonType;
use serde::{Deserialize, Serialize};

/// Roster identifiers as they appear in the dataset's `#` column.
pub type PokemonId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub spa: u32,
    pub spd: u32,
    pub spe: u32,
}

impl Stats {
    /// Stats in dataset column order: HP, Attack, Defense, Sp. Atk, Sp. Def, Speed.
    pub fn as_array(&self) -> [u32; 6] {
        [self.hp, self.atk, self.def, self.spa, self.spd, self.spe]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: PokemonId,
    pub name: String,
    pub primary_type: PokemonType,
    #[serde(default)]
    pub secondary_type: Option<PokemonType>,
    pub stats: Stats,
    #[serde(default)]
    pub legendary: bool,
}

impl Pokemon {
    /// Both type slots; the second is `None` for single-typed Pokemon.
    pub fn type_slots(&self) -> [Option<PokemonType>; 2] {
        [Some(self.primary_type), self.secondary_type]
    }
}
