use std::collections::BTreeMap;

use crate::error::MetaError;
use crate::model::{Block, BlockCollection, EntityId};
use crate::pruning::RetainedEdges;

/// Node → entities still connected to it after pruning, in retained order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructedBlocks {
    blocks: BTreeMap<EntityId, Vec<EntityId>>,
}

impl ReconstructedBlocks {
    pub fn get(&self, node: EntityId) -> Option<&[EntityId]> {
        self.blocks.get(&node).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Vec<EntityId>)> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Back to collection-local coordinates for another meta-blocking round.
    ///
    /// A collection-1 key `a` becomes the block `([a], neighbors - shift)`, a
    /// shifted collection-2 key `b` the block `(neighbors, [b - shift])`.
    pub fn to_block_collection(&self, shift: EntityId) -> Result<BlockCollection, MetaError> {
        let mut collection = BlockCollection::new();
        for (&node, neighbors) in &self.blocks {
            let block = if node < shift {
                let right = neighbors
                    .iter()
                    .map(|&n| unshift(n, shift))
                    .collect::<Result<Vec<_>, _>>()?;
                Block::new(vec![node], right)
            } else {
                if let Some(&bad) = neighbors.iter().find(|&&n| n >= shift) {
                    return Err(MetaError::InvariantViolation(format!(
                        "node {node} is linked to {bad}, both on the collection-2 side"
                    )));
                }
                Block::new(neighbors.clone(), vec![node - shift])
            };
            collection.insert(node.to_string(), block);
        }
        Ok(collection)
    }
}

fn unshift(id: EntityId, shift: EntityId) -> Result<EntityId, MetaError> {
    id.checked_sub(shift).ok_or_else(|| {
        MetaError::InvariantViolation(format!(
            "entity {id} is below the collection-2 shift {shift}"
        ))
    })
}

/// Group retained pairs by their first entity.
pub fn collect(retained: &RetainedEdges) -> ReconstructedBlocks {
    let mut blocks: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
    for &(a, b) in retained.iter() {
        blocks.entry(a).or_default().push(b);
    }
    ReconstructedBlocks { blocks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;

    #[test]
    fn groups_in_retained_order() {
        let retained = RetainedEdges::new(vec![(0, 5), (1, 4), (0, 3), (4, 1)], 3);
        let blocks = collect(&retained);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks.get(0), Some(&[5, 3][..]));
        assert_eq!(blocks.get(1), Some(&[4][..]));
        assert_eq!(blocks.get(4), Some(&[1][..]));
        assert_eq!(blocks.get(2), None);
    }

    #[test]
    fn round_trips_into_local_coordinates() {
        let retained = RetainedEdges::new(vec![(0, 2), (1, 3), (3, 1)], 2);
        let bc = collect(&retained).to_block_collection(2).unwrap();
        assert_eq!(bc.get("0"), Some(&Block::new(vec![0], vec![0])));
        assert_eq!(bc.get("1"), Some(&Block::new(vec![1], vec![1])));
        assert_eq!(bc.get("3"), Some(&Block::new(vec![1], vec![1])));

        let g = build(&bc);
        assert_eq!(g.shift(), 2);
        assert_eq!(g.edges()[&(1, 3)], 2);
    }

    #[test]
    fn same_side_links_are_rejected() {
        let retained = RetainedEdges::new(vec![(0, 1)], 2);
        assert!(matches!(
            collect(&retained).to_block_collection(2),
            Err(MetaError::InvariantViolation(_))
        ));
        let retained = RetainedEdges::new(vec![(3, 2)], 2);
        assert!(collect(&retained).to_block_collection(2).is_err());
    }

    #[test]
    fn empty_retained_set() {
        let blocks = collect(&RetainedEdges::new(Vec::new(), 1));
        assert!(blocks.is_empty());
        assert!(blocks.to_block_collection(1).unwrap().is_empty());
    }
}
