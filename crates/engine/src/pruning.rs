use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use log::debug;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::MetaError;
use crate::graph::WeightedGraph;
use crate::model::{EntityId, Pair};

/// Share of each node's neighborhood kept by cardinality node pruning.
pub const DEFAULT_CNP_FRACTION: f64 = 0.1;

/// Edge pruning scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pruning {
    /// Weighted Edge Pruning: keep edges at or above the global mean weight.
    Wep,
    /// Cardinality Node Pruning: keep each node's heaviest `ceil(n * fraction)` edges.
    Cnp,
}

impl std::fmt::Display for Pruning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wep => write!(f, "wep"),
            Self::Cnp => write!(f, "cnp"),
        }
    }
}

impl Pruning {
    pub fn apply(&self, graph: &WeightedGraph) -> Result<RetainedEdges, MetaError> {
        prune(graph, *self, DEFAULT_CNP_FRACTION)
    }
}

// ---------------------------------------------------------------------------
// Retained edges
// ---------------------------------------------------------------------------

/// Candidate pairs that survived pruning, in selection order.
///
/// CNP selections are directed, so one logical pair may appear in both
/// orientations. `shift` is the collection-2 offset of the source graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetainedEdges {
    pairs: Vec<Pair>,
    shift: EntityId,
}

impl RetainedEdges {
    pub fn new(pairs: Vec<Pair>, shift: EntityId) -> Self {
        Self { pairs, shift }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.iter()
    }

    pub fn shift(&self) -> EntityId {
        self.shift
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Logical pairs, oriented (collection-1, shifted collection-2).
    pub fn unordered(&self) -> HashSet<Pair> {
        self.pairs.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect()
    }
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

pub fn prune(
    graph: &WeightedGraph,
    scheme: Pruning,
    cnp_fraction: f64,
) -> Result<RetainedEdges, MetaError> {
    match scheme {
        Pruning::Wep => weighted_edge_pruning(graph),
        Pruning::Cnp => cardinality_node_pruning(graph, cnp_fraction),
    }
}

/// Relative slack, in machine epsilons, below the mean that still counts as
/// "at the mean". Weights equal to the mean in exact arithmetic can land a few
/// ulps on either side of the computed mean, and scaling moves them.
const WEP_SLACK_EPSILONS: f64 = 64.0;

/// Keep every edge whose weight is at least the mean edge weight.
///
/// The comparison allows a few ulps of slack relative to the mean, so the
/// retained set does not change when every weight is multiplied by the same
/// positive constant.
pub fn weighted_edge_pruning(graph: &WeightedGraph) -> Result<RetainedEdges, MetaError> {
    let weights: Vec<f64> = graph.edges().values().copied().collect();
    let mean = mean(&weights).ok_or(MetaError::EmptyInput { stage: "weighted edge pruning" })?;
    // The heaviest edge is never below the exact mean; rounding must not drop it.
    let max = weights.iter().copied().fold(f64::MIN, f64::max);
    let threshold = mean.min(max);
    let floor = threshold - threshold.abs() * WEP_SLACK_EPSILONS * f64::EPSILON;

    let pairs: Vec<Pair> = graph
        .edges()
        .iter()
        .filter(|(_, &w)| w >= floor)
        .map(|(pair, _)| *pair)
        .collect();

    debug!(
        "wep: threshold {threshold}, kept {} of {} edges",
        pairs.len(),
        graph.edge_count(),
    );
    Ok(RetainedEdges::new(pairs, graph.shift()))
}

/// Keep, for every node, its `ceil(degree * fraction)` heaviest edges.
///
/// Ranking is weight descending, then neighbor id ascending. Nodes are visited
/// in id order and a degree-0 node selects nothing.
pub fn cardinality_node_pruning(
    graph: &WeightedGraph,
    fraction: f64,
) -> Result<RetainedEdges, MetaError> {
    if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
        return Err(MetaError::InvariantViolation(format!(
            "cnp fraction must be in (0, 1], got {fraction}"
        )));
    }

    let adjacency = adjacency(graph);
    let empty: Vec<(EntityId, f64)> = Vec::new();
    let select = |node: &EntityId| -> Vec<Pair> {
        let neighborhood = adjacency.get(node).unwrap_or(&empty);
        top_neighbors(*node, neighborhood, fraction)
    };

    #[cfg(feature = "parallel")]
    let per_node: Vec<Vec<Pair>> = {
        use rayon::prelude::*;
        let nodes: Vec<&EntityId> = graph.nodes().keys().collect();
        nodes.par_iter().map(|&node| select(node)).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let per_node: Vec<Vec<Pair>> = graph.nodes().keys().map(select).collect();

    let pairs: Vec<Pair> = per_node.into_iter().flatten().collect();
    debug!(
        "cnp: fraction {fraction}, kept {} selections over {} nodes",
        pairs.len(),
        graph.nodes().len(),
    );
    Ok(RetainedEdges::new(pairs, graph.shift()))
}

/// Selection size for a neighborhood of `degree` edges.
pub fn cardinality(degree: usize, fraction: f64) -> usize {
    (degree as f64 * fraction).ceil() as usize
}

fn top_neighbors(node: EntityId, neighborhood: &[(EntityId, f64)], fraction: f64) -> Vec<Pair> {
    let k = cardinality(neighborhood.len(), fraction);
    let mut ranked: Vec<&(EntityId, f64)> = neighborhood.iter().collect();
    ranked.sort_by_key(|&&(neighbor, weight)| (Reverse(OrderedFloat(weight)), neighbor));
    ranked.into_iter().take(k).map(|&(neighbor, _)| (node, neighbor)).collect()
}

fn adjacency(graph: &WeightedGraph) -> BTreeMap<EntityId, Vec<(EntityId, f64)>> {
    let mut adjacency: BTreeMap<EntityId, Vec<(EntityId, f64)>> = BTreeMap::new();
    for (&(a, b), &w) in graph.edges() {
        adjacency.entry(a).or_default().push((b, w));
        adjacency.entry(b).or_default().push((a, w));
    }
    adjacency
}

/// Arithmetic mean with compensated summation, `None` when empty.
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for &v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    Some((sum + compensation) / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::model::fixtures::blocks;
    use crate::weighting::{cbs, jaccard};

    fn star() -> WeightedGraph {
        // Entity 0 of collection 1 shares 3, 2, 1 blocks with right 0, 1, 2
        build(&blocks(&[
            ("a", &[0], &[0, 1, 2]),
            ("b", &[0], &[0, 1]),
            ("c", &[0], &[0]),
        ]))
        .map_edges(|_, &c| f64::from(c))
    }

    #[test]
    fn wep_keeps_edges_at_or_above_mean() {
        let g = star();
        // weights 3, 2, 1: mean 2
        let kept = weighted_edge_pruning(&g).unwrap();
        assert_eq!(kept.pairs(), &[(0, 1), (0, 2)]);
        assert_eq!(kept.shift(), 1);
    }

    #[test]
    fn wep_keeps_all_equal_weights() {
        let g = build(&blocks(&[("a", &[0, 1, 2], &[0])])).map_edges(|_, _| 0.1);
        assert_eq!(weighted_edge_pruning(&g).unwrap().len(), 3);
    }

    #[test]
    fn wep_keeps_weights_at_the_mean_under_any_scale() {
        // weights 0.3, 0.2, 0.1: the 0.2 edge sits exactly on the mean
        let base = star().map_edges(|_, &w| w / 10.0);
        let expected = vec![(0, 1), (0, 2)];
        assert_eq!(weighted_edge_pruning(&base).unwrap().pairs(), &expected[..]);
        for factor in [0.01, 0.3, 1.0 / 3.0, 3.0, 7.0, 100.0] {
            let scaled = base.map_edges(|_, &w| w * factor);
            assert_eq!(
                weighted_edge_pruning(&scaled).unwrap().pairs(),
                &expected[..],
                "factor {factor}"
            );
        }
    }

    #[test]
    fn wep_rejects_empty_graph() {
        let g = jaccard(&build(&blocks(&[("a", &[0], &[])]))).unwrap();
        assert_eq!(
            Pruning::Wep.apply(&g).unwrap_err(),
            MetaError::EmptyInput { stage: "weighted edge pruning" }
        );
    }

    #[test]
    fn cnp_ranks_by_weight_then_neighbor() {
        let g = star();
        let kept = cardinality_node_pruning(&g, 0.1).unwrap();
        // node 0: degree 3 -> k = 1 -> heaviest (0, 1)
        // nodes 1, 2, 3: degree 1 -> k = 1 -> their only edge, reversed
        assert_eq!(kept.pairs(), &[(0, 1), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(kept.unordered().len(), 3);
    }

    #[test]
    fn cnp_ties_resolve_to_lowest_neighbor() {
        let g = build(&blocks(&[("a", &[0], &[3, 1, 2])])).map_edges(|_, _| 1.0);
        let kept = cardinality_node_pruning(&g, 0.1).unwrap();
        assert_eq!(kept.pairs()[0], (0, 2));
    }

    #[test]
    fn cnp_skips_isolated_nodes() {
        let g = cbs(&build(&blocks(&[("a", &[0], &[0]), ("b", &[7], &[])]))).unwrap();
        let kept = cardinality_node_pruning(&g, 0.1).unwrap();
        assert!(kept.iter().all(|&(a, _)| a != 7));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn cnp_fraction_is_validated() {
        let g = star();
        assert!(cardinality_node_pruning(&g, 0.0).is_err());
        assert!(cardinality_node_pruning(&g, 1.5).is_err());
        assert!(cardinality_node_pruning(&g, f64::NAN).is_err());
        assert_eq!(cardinality_node_pruning(&g, 1.0).unwrap().len(), 6);
    }

    #[test]
    fn cardinality_follows_ceiling() {
        assert_eq!(cardinality(0, 0.1), 0);
        assert_eq!(cardinality(1, 0.1), 1);
        assert_eq!(cardinality(10, 0.1), 1);
        assert_eq!(cardinality(11, 0.1), 2);
        assert_eq!(cardinality(20, 0.25), 5);
    }

    #[test]
    fn mean_is_compensated() {
        assert_eq!(mean(&[]), None);
        assert!(mean(&[0.1, 0.1, 0.1]).unwrap() <= 0.1);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
