use crate::model::{Pokemon, PokemonId, Stats};
use crate::types::PokemonType;
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

const COL_ID: &str = "#";
const COL_NAME: &str = "Name";
const COL_TYPE1: &str = "Type 1";
const COL_TYPE2: &str = "Type 2";
const COL_HP: &str = "HP";
const COL_ATK: &str = "Attack";
const COL_DEF: &str = "Defense";
const COL_SPA: &str = "Sp. Atk";
const COL_SPD: &str = "Sp. Def";
const COL_SPE: &str = "Speed";
const COL_LEGENDARY: &str = "Legendary";

/// Read-only Pokemon table keyed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: HashMap<PokemonId, Pokemon>,
}

impl Roster {
    pub fn from_pokemon(pokemon: impl IntoIterator<Item = Pokemon>) -> anyhow::Result<Self> {
        let mut entries: HashMap<PokemonId, Pokemon> = HashMap::new();
        for p in pokemon {
            if p.id <= 0 {
                anyhow::bail!("Pokemon id must be positive, got {} ({})", p.id, p.name);
            }
            if let Some(existing) = entries.get(&p.id) {
                anyhow::bail!(
                    "Duplicate Pokemon id {}: {} and {}",
                    p.id,
                    existing.name,
                    p.name
                );
            }
            entries.insert(p.id, p);
        }
        Ok(Roster { entries })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster at {}", path.display()))?;
        Self::from_csv(&raw).with_context(|| format!("Failed to parse roster {}", path.display()))
    }

    pub fn from_csv(raw: &str) -> anyhow::Result<Self> {
        let mut lines = raw
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());
        let (_, header) = lines.next().ok_or_else(|| anyhow::anyhow!("Roster is empty"))?;
        let columns = Columns::from_header(&split_csv_line(header)?)?;

        let mut pokemon = Vec::new();
        for (line_no, line) in lines {
            let fields = split_csv_line(line).with_context(|| format!("line {line_no}"))?;
            let p = columns
                .parse_row(&fields)
                .with_context(|| format!("Invalid roster row at line {line_no}"))?;
            pokemon.push(p);
        }
        Self::from_pokemon(pokemon)
    }

    pub fn get(&self, id: PokemonId) -> Option<&Pokemon> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: PokemonId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<PokemonId> {
        let mut ids: Vec<PokemonId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

struct Columns {
    id: usize,
    name: usize,
    type1: usize,
    type2: usize,
    stats: [usize; 6],
    legendary: usize,
}

impl Columns {
    fn from_header(header: &[String]) -> anyhow::Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow::anyhow!("Roster header is missing column {name:?}"))
        };
        Ok(Columns {
            id: find(COL_ID)?,
            name: find(COL_NAME)?,
            type1: find(COL_TYPE1)?,
            type2: find(COL_TYPE2)?,
            stats: [
                find(COL_HP)?,
                find(COL_ATK)?,
                find(COL_DEF)?,
                find(COL_SPA)?,
                find(COL_SPD)?,
                find(COL_SPE)?,
            ],
            legendary: find(COL_LEGENDARY)?,
        })
    }

    fn parse_row(&self, fields: &[String]) -> anyhow::Result<Pokemon> {
        let field = |idx: usize, name: &str| {
            fields
                .get(idx)
                .map(|f| f.trim())
                .ok_or_else(|| anyhow::anyhow!("Missing value for column {name:?}"))
        };

        let id_raw = field(self.id, COL_ID)?;
        let id: PokemonId = id_raw
            .parse()
            .with_context(|| format!("Invalid id {id_raw:?}"))?;
        let name = field(self.name, COL_NAME)?.to_string();
        let primary_type: PokemonType = field(self.type1, COL_TYPE1)?.parse()?;
        let type2_raw = field(self.type2, COL_TYPE2)?;
        let secondary_type = if type2_raw.is_empty() {
            None
        } else {
            Some(type2_raw.parse::<PokemonType>()?)
        };

        let names = [COL_HP, COL_ATK, COL_DEF, COL_SPA, COL_SPD, COL_SPE];
        let mut values = [0u32; 6];
        for (slot, (&idx, col)) in values.iter_mut().zip(self.stats.iter().zip(names)) {
            let raw = field(idx, col)?;
            *slot = raw
                .parse()
                .with_context(|| format!("Invalid {col} value {raw:?}"))?;
        }
        let [hp, atk, def, spa, spd, spe] = values;

        let legendary = parse_bool(field(self.legendary, COL_LEGENDARY)?)?;

        Ok(Pokemon {
            id,
            name,
            primary_type,
            secondary_type,
            stats: Stats {
                hp,
                atk,
                def,
                spa,
                spd,
                spe,
            },
            legendary,
        })
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => anyhow::bail!("Invalid Legendary value {other:?} (use True/False)"),
    }
}

/// Splits one CSV record. Double-quoted fields may contain commas and `""` escapes.
fn split_csv_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        anyhow::bail!("Unterminated quoted field");
    }
    fields.push(current);
    Ok(fields)
}
