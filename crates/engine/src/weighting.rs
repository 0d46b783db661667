use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::MetaError;
use crate::graph::{CandidateGraph, WeightedGraph};
use crate::model::Pair;

/// Edge weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Shared blocks over the union of both entities' blocks.
    Jaccard,
    /// Common Blocks Scheme: shared blocks normalized by the heaviest edge.
    Cbs,
}

impl std::fmt::Display for Weighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jaccard => write!(f, "jaccard"),
            Self::Cbs => write!(f, "cbs"),
        }
    }
}

impl Weighting {
    pub fn apply(&self, graph: &CandidateGraph<u32>) -> Result<WeightedGraph, MetaError> {
        match self {
            Self::Jaccard => jaccard(graph),
            Self::Cbs => cbs(graph),
        }
    }
}

/// `c / (n_i + n_j - c)` for an edge shared by `c` blocks.
///
/// Fails when an edge count exceeds the block count of either endpoint.
pub fn jaccard(graph: &CandidateGraph<u32>) -> Result<WeightedGraph, MetaError> {
    let mut inconsistent: Option<(Pair, u32)> = None;
    let weighted = graph.map_edges(|&(i, j), &count| {
        let (n_i, n_j) = (graph.node_count(i), graph.node_count(j));
        if count > n_i || count > n_j || n_i == 0 || n_j == 0 {
            inconsistent.get_or_insert(((i, j), count));
            return 0.0;
        }
        let union = u64::from(n_i) + u64::from(n_j) - u64::from(count);
        f64::from(count) / union as f64
    });
    if let Some(((i, j), count)) = inconsistent {
        return Err(MetaError::InvariantViolation(format!(
            "edge ({i}, {j}) counts {count} shared blocks but its endpoints occur in {} and {}",
            graph.node_count(i),
            graph.node_count(j),
        )));
    }
    debug!("jaccard weighting: {} edges", weighted.edge_count());
    Ok(weighted)
}

/// `c / max(c')` over every edge of the graph.
pub fn cbs(graph: &CandidateGraph<u32>) -> Result<WeightedGraph, MetaError> {
    let max = graph
        .edges()
        .values()
        .copied()
        .max()
        .ok_or(MetaError::EmptyInput { stage: "cbs weighting" })?;
    let max = f64::from(max);
    let weighted = graph.map_edges(|_, &count| f64::from(count) / max);
    debug!("cbs weighting: {} edges, max count {max}", weighted.edge_count());
    Ok(weighted)
}
