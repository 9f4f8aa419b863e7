//! Append-only record of served predictions.

use crate::context::Prediction;
use crate::model::PokemonId;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecord {
    pub first_pokemon: PokemonId,
    pub second_pokemon: PokemonId,
    pub winner: PokemonId,
}

impl From<&Prediction> for BattleRecord {
    fn from(p: &Prediction) -> Self {
        BattleRecord {
            first_pokemon: p.first,
            second_pokemon: p.second,
            winner: p.winner_id,
        }
    }
}

pub trait OutcomeLog: Send + Sync {
    fn record(&self, record: &BattleRecord) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct LogLine<'a> {
    #[serde(flatten)]
    record: &'a BattleRecord,
    recorded_at: String,
}

/// One JSON object per line, opened for append.
pub struct NdjsonOutcomeLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl NdjsonOutcomeLog {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open outcome log at {}", path.display()))?;
        Ok(NdjsonOutcomeLog {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutcomeLog for NdjsonOutcomeLog {
    fn record(&self, record: &BattleRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(&LogLine {
            record,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        })?;
        line.push(b'\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("Outcome log lock poisoned"))?;
        // One write per record.
        file.write_all(&line)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps records in memory for callers that inspect outcomes in-process.
#[derive(Default)]
pub struct MemoryOutcomeLog {
    records: Mutex<Vec<BattleRecord>>,
}

impl MemoryOutcomeLog {
    pub fn records(&self) -> Vec<BattleRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutcomeLog for MemoryOutcomeLog {
    fn record(&self, record: &BattleRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Reads every record back from an NDJSON outcome log.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<BattleRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: BattleRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid record on line {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}
