use crate::context::BattleContext;
use crate::error::PredictError;
use crate::model::PokemonId;
use rayon::prelude::*;

/// Row `i`, column `j` holds the probability that `ids[i]` beats `ids[j]`.
pub fn compute_matrix(
    ctx: &BattleContext,
    ids: &[PokemonId],
) -> Result<Vec<Vec<f32>>, PredictError> {
    if let Some(&missing) = ids.iter().find(|id| !ctx.roster().contains(**id)) {
        return Err(PredictError::UnknownPokemon(missing));
    }
    let tasks: Vec<(usize, usize)> = (0..ids.len())
        .flat_map(|a| (0..ids.len()).map(move |b| (a, b)))
        .collect();
    let cell_results: Vec<CellResult> = tasks
        .par_iter()
        .map(|(a_idx, b_idx)| -> Result<CellResult, PredictError> {
            let score = ctx.score(ids[*a_idx], ids[*b_idx])?;
            Ok(CellResult {
                a_idx: *a_idx,
                b_idx: *b_idx,
                score,
            })
        })
        .collect::<Result<Vec<_>, PredictError>>()?;

    let mut matrix = vec![vec![0.0; ids.len()]; ids.len()];
    for cell in cell_results {
        matrix[cell.a_idx][cell.b_idx] = cell.score;
    }
    Ok(matrix)
}

/// Writes the matrix with a header row and a leading column of ids.
pub fn write_csv(
    ids: &[PokemonId],
    matrix: &[Vec<f32>],
    path: &std::path::Path,
) -> anyhow::Result<()> {
    if matrix.len() != ids.len() {
        anyhow::bail!("Matrix has {} rows for {} ids", matrix.len(), ids.len());
    }
    let mut out = String::from("#");
    for id in ids {
        out.push_str(&format!(",{id}"));
    }
    for (id, row) in ids.iter().zip(matrix) {
        out.push('\n');
        out.push_str(&id.to_string());
        for value in row {
            out.push_str(&format!(",{value:.4}"));
        }
    }
    out.push('\n');
    std::fs::write(path, out)?;
    Ok(())
}

/// Parses a comma separated id list such as `1,4,7`.
pub fn parse_id_list(raw: &str) -> anyhow::Result<Vec<PokemonId>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PokemonId>()
                .map_err(|_| anyhow::anyhow!("Invalid Pokemon id {s:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if ids.is_empty() {
        anyhow::bail!("Expected at least one Pokemon id");
    }
    Ok(ids)
}

struct CellResult {
    a_idx: usize,
    b_idx: usize,
    score: f32,
}
