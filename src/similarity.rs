use candle_core::Tensor;
use rayon::prelude::*;

use crate::{embedding::EmbeddingMatrix, error::Result};

/// A stored document scored against one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Index of the document in the candidate slice.
    pub position: usize,
    pub score: f32,
}

/// Find the `k` candidates most similar to `query`, nearest first.
///
/// For each candidate:
/// 1. Compute similarity matrix: query_emb @ doc_emb^T
/// 2. Take row-wise max (best matching document token per query token)
/// 3. Sum the maxes to get the MaxSim score
///
/// Candidates that cannot be scored (e.g. a dimension mismatch) are
/// skipped. Equal scores keep candidate order.
pub fn nearest(
    query: &EmbeddingMatrix,
    candidates: &[&EmbeddingMatrix],
    k: usize,
) -> Result<Vec<Neighbor>> {
    let query_tensor = query.to_tensor()?;

    // Scoring runs in parallel; collect keeps candidate order.
    let mut scored: Vec<Neighbor> = candidates
        .par_iter()
        .enumerate()
        .filter_map(|(position, candidate)| {
            let doc_tensor = candidate.to_tensor().ok()?;
            let score = maxsim(&query_tensor, &doc_tensor).ok()?;
            Some(Neighbor { position, score })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);

    Ok(scored)
}

/// Compute the MaxSim score between a query embedding and a document embedding.
///
/// query_embedding: [Q, D] where Q = query tokens, D = embedding dimension
/// doc_embedding: [T, D] where T = document tokens, D = embedding dimension
///
/// MaxSim = sum over query tokens of max(query_token . doc_token for all doc tokens)
pub fn maxsim(query_embedding: &Tensor, doc_embedding: &Tensor) -> Result<f32> {
    let sim_matrix = query_embedding.matmul(&doc_embedding.t()?)?;
    let row_maxes = sim_matrix.max(1)?;
    Ok(row_maxes.sum_all()?.to_scalar::<f32>()?)
}
