//! Attribute clustering blocking.
//!
//! Attributes of the two collections are linked to their most similar
//! counterpart (Jaccard over the attribute's token set), linked attributes are
//! grouped into clusters, and token blocking runs separately inside each
//! cluster. Two records then share a block only when they share a token in
//! attributes that look alike.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use petgraph::unionfind::UnionFind;
use serde::Serialize;

use crate::blocking::{join_blocks_with_prefix, token_blocker};
use crate::error::MetaError;
use crate::model::{BlockCollection, EntityCollection};
use crate::tokenize::{merge_token_lists, tokenize_column, TokenLists};

/// Columns of each collection that ended up in one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeCluster {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

struct Attribute {
    column: usize,
    tokens: TokenLists,
    vocabulary: HashSet<String>,
}

impl Attribute {
    fn new(collection: &EntityCollection, column: usize) -> Result<Self, MetaError> {
        if column >= collection.headers.len() {
            return Err(MetaError::InvariantViolation(format!(
                "collection '{}' has no column {column}",
                collection.name
            )));
        }
        let tokens = tokenize_column(collection, column);
        let vocabulary = tokens.iter().flatten().cloned().collect();
        Ok(Self { column, tokens, vocabulary })
    }
}

/// |a ∩ b| / |a ∪ b|, 0 when both sets are empty.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Most similar attribute of `others`; the first one wins ties. `None` when
/// nothing overlaps.
fn best_link(attribute: &Attribute, others: &[Attribute]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, other) in others.iter().enumerate() {
        let sim = jaccard_similarity(&attribute.vocabulary, &other.vocabulary);
        if sim > best.map_or(0.0, |(_, s)| s) {
            best = Some((i, sim));
        }
    }
    best.map(|(i, _)| i)
}

fn cluster_attributes(
    left: &[Attribute],
    right: &[Attribute],
    glue_cluster: bool,
) -> Vec<AttributeCluster> {
    // Node ids: left attributes first, then right attributes.
    let offset = left.len();
    let mut components = UnionFind::<usize>::new(left.len() + right.len());
    let mut linked = vec![false; left.len() + right.len()];

    for (i, attribute) in left.iter().enumerate() {
        if let Some(j) = best_link(attribute, right) {
            components.union(i, offset + j);
            linked[i] = true;
            linked[offset + j] = true;
        }
    }
    for (j, attribute) in right.iter().enumerate() {
        if let Some(i) = best_link(attribute, left) {
            components.union(offset + j, i);
            linked[offset + j] = true;
            linked[i] = true;
        }
    }

    // Keyed by smallest member so cluster numbering follows column order.
    let mut by_root: BTreeMap<usize, AttributeCluster> = BTreeMap::new();
    let mut first_member: BTreeMap<usize, usize> = BTreeMap::new();
    let mut glue = AttributeCluster::default();
    for node in 0..linked.len() {
        let (is_left, column) = if node < offset {
            (true, left[node].column)
        } else {
            (false, right[node - offset].column)
        };
        let cluster = if linked[node] {
            let root = components.find(node);
            let first = *first_member.entry(root).or_insert(node);
            by_root.entry(first).or_default()
        } else {
            &mut glue
        };
        if is_left {
            cluster.left.push(column);
        } else {
            cluster.right.push(column);
        }
    }

    let mut clusters: Vec<AttributeCluster> = by_root.into_values().collect();
    if glue_cluster && (!glue.left.is_empty() || !glue.right.is_empty()) {
        clusters.push(glue);
    }
    clusters
}

/// Cluster the given attribute columns of both collections.
pub fn attribute_clusters(
    left: &EntityCollection,
    right: &EntityCollection,
    left_columns: &[usize],
    right_columns: &[usize],
    glue_cluster: bool,
) -> Result<Vec<AttributeCluster>, MetaError> {
    let left_attrs = attributes(left, left_columns)?;
    let right_attrs = attributes(right, right_columns)?;
    Ok(cluster_attributes(&left_attrs, &right_attrs, glue_cluster))
}

fn attributes(collection: &EntityCollection, columns: &[usize]) -> Result<Vec<Attribute>, MetaError> {
    columns.iter().map(|&c| Attribute::new(collection, c)).collect()
}

/// Concatenated token lists of one side's attributes inside a cluster.
fn cluster_tokens(
    attributes: &[Attribute],
    columns: &[usize],
    records: usize,
) -> Result<TokenLists, MetaError> {
    let mut merged: TokenLists = vec![Vec::new(); records];
    for attribute in attributes.iter().filter(|a| columns.contains(&a.column)) {
        merged = merge_token_lists(merged, attribute.tokens.clone())?;
    }
    Ok(merged)
}

/// Attribute clustering blocking. Block keys are `"{cluster}:{token}"`.
pub fn attribute_clustering_blocking(
    left: &EntityCollection,
    right: &EntityCollection,
    left_columns: &[usize],
    right_columns: &[usize],
    glue_cluster: bool,
) -> Result<BlockCollection, MetaError> {
    let left_attrs = attributes(left, left_columns)?;
    let right_attrs = attributes(right, right_columns)?;
    let clusters = cluster_attributes(&left_attrs, &right_attrs, glue_cluster);
    debug!("attribute clustering: {} clusters: {:?}", clusters.len(), clusters);

    let mut blocks = BlockCollection::new();
    for (i, cluster) in clusters.iter().enumerate() {
        if cluster.left.is_empty() || cluster.right.is_empty() {
            continue;
        }
        let left_index = token_blocker(&cluster_tokens(&left_attrs, &cluster.left, left.len())?);
        let right_index = token_blocker(&cluster_tokens(&right_attrs, &cluster.right, right.len())?);
        let prefix = i.to_string();
        for (key, block) in join_blocks_with_prefix(&left_index, &right_index, Some(&prefix)).iter() {
            blocks.insert(key.clone(), block.clone());
        }
    }
    debug!("attribute clustering: {} blocks", blocks.len());
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::collection;
    use crate::model::Block;

    fn set(tokens: &[&str]) -> HashSet<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn left() -> EntityCollection {
        collection(
            "amazon",
            &["id", "title", "manufacturer", "price"],
            &[
                &["a1", "ipod nano", "apple", "149"],
                &["a2", "zune player", "microsoft", "99"],
            ],
        )
    }

    fn right() -> EntityCollection {
        collection(
            "google",
            &["id", "name", "brand", "notes"],
            &[
                &["g1", "apple ipod nano", "apple", "refurbished"],
                &["g2", "zune", "microsoft", "sealed"],
            ],
        )
    }

    #[test]
    fn similarity() {
        assert_eq!(jaccard_similarity(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn links_similar_attributes_and_collects_glue() {
        let clusters = attribute_clusters(&left(), &right(), &[1, 2, 3], &[1, 2, 3], true).unwrap();
        // title <-> name, manufacturer <-> brand; brand's tokens also appear in
        // the name column, but brand matches manufacturer exactly.
        assert_eq!(
            clusters,
            vec![
                AttributeCluster { left: vec![1], right: vec![1] },
                AttributeCluster { left: vec![2], right: vec![2] },
                AttributeCluster { left: vec![3], right: vec![3] },
            ]
        );

        let without_glue = attribute_clusters(&left(), &right(), &[1, 2, 3], &[1, 2, 3], false).unwrap();
        assert_eq!(without_glue.len(), 2);
    }

    #[test]
    fn blocks_are_scoped_by_cluster() {
        let bc = attribute_clustering_blocking(&left(), &right(), &[1, 2, 3], &[1, 2, 3], true).unwrap();
        // "appl" is a token of name (cluster 0) and of brand (cluster 1) on the
        // right side, but only of manufacturer (cluster 1) on the left side.
        assert_eq!(bc.get("0:appl"), None);
        assert_eq!(bc.get("1:appl"), Some(&Block::new(vec![0], vec![0])));
        assert_eq!(bc.get("0:ipod"), Some(&Block::new(vec![0], vec![0])));
        assert_eq!(bc.get("0:zune"), Some(&Block::new(vec![1], vec![1])));
        // glue cluster (price, notes) shares no tokens
        assert!(bc.iter().all(|(k, _)| !k.starts_with("2:")));
    }

    #[test]
    fn unknown_column_is_rejected() {
        assert!(attribute_clusters(&left(), &right(), &[9], &[1], true).is_err());
    }
}
