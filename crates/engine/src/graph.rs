use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::model::{BlockCollection, EntityId, Pair};

/// Co-occurrence graph between the entities of two collections.
///
/// Collection-2 ids are stored shifted by `max_index + 1`, where `max_index`
/// is the largest collection-1 id of the block collection the graph was built
/// from. Edges always run from a collection-1 id to a shifted collection-2 id.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGraph<W> {
    nodes: BTreeMap<EntityId, u32>,
    edges: BTreeMap<Pair, W>,
    max_index: EntityId,
}

/// A graph whose co-occurrence counts were replaced by edge weights.
pub type WeightedGraph = CandidateGraph<f64>;

impl<W> CandidateGraph<W> {
    pub(crate) fn from_parts(
        nodes: BTreeMap<EntityId, u32>,
        edges: BTreeMap<Pair, W>,
        max_index: EntityId,
    ) -> Self {
        Self { nodes, edges, max_index }
    }

    /// Number of blocks each entity occurs in.
    pub fn nodes(&self) -> &BTreeMap<EntityId, u32> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeMap<Pair, W> {
        &self.edges
    }

    pub fn node_count(&self, id: EntityId) -> u32 {
        self.nodes.get(&id).copied().unwrap_or(0)
    }

    pub fn max_index(&self) -> EntityId {
        self.max_index
    }

    /// Offset added to collection-2 ids.
    pub fn shift(&self) -> EntityId {
        self.max_index + 1
    }

    pub fn is_left(&self, id: EntityId) -> bool {
        id < self.shift()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Same nodes and edge keys, new edge values.
    pub fn map_edges<V>(&self, mut f: impl FnMut(&Pair, &W) -> V) -> CandidateGraph<V> {
        CandidateGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.iter().map(|(pair, w)| (*pair, f(pair, w))).collect(),
            max_index: self.max_index,
        }
    }
}

/// Build the co-occurrence graph of a block collection.
///
/// First pass counts collection-1 occurrences and finds `max_index`; second
/// pass counts shifted collection-2 occurrences and one edge increment per
/// (collection-1, collection-2) member pair of each block. An id listed twice
/// on one side of a block still counts once for that block.
pub fn build(blocks: &BlockCollection) -> CandidateGraph<u32> {
    let mut nodes: BTreeMap<EntityId, u32> = BTreeMap::new();
    let mut edges: BTreeMap<Pair, u32> = BTreeMap::new();
    let mut max_index: EntityId = 0;

    let members: Vec<(BTreeSet<EntityId>, BTreeSet<EntityId>)> = blocks
        .blocks()
        .map(|b| (b.left.iter().copied().collect(), b.right.iter().copied().collect()))
        .collect();

    for (left, _) in &members {
        for &l in left {
            *nodes.entry(l).or_insert(0) += 1;
            max_index = max_index.max(l);
        }
    }

    let shift = max_index + 1;
    for (left, right) in &members {
        for &r in right {
            let r = r + shift;
            *nodes.entry(r).or_insert(0) += 1;
            for &l in left {
                *edges.entry((l, r)).or_insert(0) += 1;
            }
        }
    }

    debug!(
        "built candidate graph: {} blocks, {} nodes, {} edges, shift {}",
        blocks.len(),
        nodes.len(),
        edges.len(),
        shift,
    );

    CandidateGraph::from_parts(nodes, edges, max_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::blocks;

    #[test]
    fn two_block_scenario() {
        let bc = blocks(&[("b1", &[0, 1], &[0]), ("b2", &[1], &[0, 1])]);
        let g = build(&bc);

        assert_eq!(g.max_index(), 1);
        assert_eq!(g.shift(), 2);
        let nodes: Vec<(EntityId, u32)> = g.nodes().iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(nodes, vec![(0, 1), (1, 2), (2, 2), (3, 1)]);
        let edges: Vec<(Pair, u32)> = g.edges().iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(edges, vec![((0, 2), 1), ((1, 2), 1), ((1, 3), 1)]);
    }

    #[test]
    fn no_same_side_edges() {
        let bc = blocks(&[("t", &[0, 1, 2], &[0, 1])]);
        let g = build(&bc);
        assert_eq!(g.edge_count(), 6);
        for &(a, b) in g.edges().keys() {
            assert!(g.is_left(a));
            assert!(!g.is_left(b));
        }
    }

    #[test]
    fn one_sided_blocks_add_nodes_but_no_edges() {
        let bc = blocks(&[("x", &[4], &[]), ("y", &[], &[0])]);
        let g = build(&bc);
        assert_eq!(g.shift(), 5);
        assert_eq!(g.node_count(4), 1);
        assert_eq!(g.node_count(5), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn edge_counts_shared_blocks() {
        let bc = blocks(&[("a", &[0], &[0]), ("b", &[0], &[0]), ("c", &[0], &[1])]);
        let g = build(&bc);
        assert_eq!(g.edges()[&(0, 1)], 2);
        assert_eq!(g.edges()[&(0, 2)], 1);
        assert_eq!(g.node_count(0), 3);
    }

    #[test]
    fn repeated_ids_in_a_block_count_once() {
        let bc = blocks(&[("dup", &[0, 0, 0], &[0, 0]), ("one", &[0, 0], &[0])]);
        let g = build(&bc);
        assert_eq!(g.shift(), 1);
        assert_eq!(g.edges()[&(0, 1)], 2);
        assert_eq!(g.node_count(0), 2);
        assert_eq!(g.node_count(1), 2);
    }

    #[test]
    fn shift_is_scoped_to_each_build() {
        let wide = blocks(&[("a", &[9], &[0])]);
        let narrow = blocks(&[("a", &[1], &[0])]);
        assert_eq!(build(&wide).shift(), 10);
        assert_eq!(build(&narrow).shift(), 2);
    }

    #[test]
    fn empty_collection() {
        let g = build(&BlockCollection::new());
        assert_eq!(g.shift(), 1);
        assert!(g.nodes().is_empty());
        assert_eq!(g.edge_count(), 0);
    }
}
