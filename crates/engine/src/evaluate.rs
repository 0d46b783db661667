use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::error::MetaError;
use crate::model::{BlockCollection, EntityCollection, EntityId, GoldStandard, Pair};
use crate::pruning::RetainedEdges;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Quality of a pruned candidate set against a gold standard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Percentage of gold pairs present among the retained pairs.
    pub pair_completeness: f64,
    /// Percentage of the full cross product that is never compared.
    pub reduction_ratio: f64,
    pub gold_pairs: usize,
    pub matched_pairs: usize,
    pub retained_pairs: usize,
    pub unique_pairs: usize,
}

/// Quality of a raw block collection against a gold standard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockEvaluation {
    pub pair_completeness: f64,
    /// Against every comparison implied by the blocks, redundant ones included.
    pub reduction_ratio: f64,
    /// Against the distinct comparisons only.
    pub reduction_ratio_unique: f64,
    pub blocks: usize,
    pub comparisons: usize,
    pub unique_comparisons: usize,
}

// ---------------------------------------------------------------------------
// Gold standard mapping
// ---------------------------------------------------------------------------

/// Translate gold primary-key pairs into `(left index, right index + shift)`.
///
/// Keys are matched exactly against each collection's primary-key column. When
/// a key occurs more than once the first row wins.
pub fn gold_standard_index(
    left: &EntityCollection,
    right: &EntityCollection,
    gold: &GoldStandard,
    shift: EntityId,
) -> Result<Vec<Pair>, MetaError> {
    let left_index = key_index(left);
    let right_index = key_index(right);

    gold.pairs
        .iter()
        .map(|(lk, rk)| {
            let l = lookup(&left_index, left, lk)?;
            let r = lookup(&right_index, right, rk)?;
            Ok((l, r + shift))
        })
        .collect()
}

fn key_index(collection: &EntityCollection) -> HashMap<&str, EntityId> {
    let mut index = HashMap::with_capacity(collection.len());
    for (i, key) in collection.primary_keys().enumerate() {
        index.entry(key).or_insert(i);
    }
    index
}

fn lookup(
    index: &HashMap<&str, EntityId>,
    collection: &EntityCollection,
    key: &str,
) -> Result<EntityId, MetaError> {
    index.get(key).copied().ok_or_else(|| MetaError::Lookup {
        collection: collection.name.clone(),
        key: key.to_string(),
    })
}

fn check_sizes(
    left: &EntityCollection,
    right: &EntityCollection,
    gold: &GoldStandard,
) -> Result<f64, MetaError> {
    if gold.is_empty() {
        return Err(MetaError::EmptyInput { stage: "evaluation: gold standard" });
    }
    if left.is_empty() || right.is_empty() {
        return Err(MetaError::EmptyInput { stage: "evaluation: collections" });
    }
    Ok(left.len() as f64 * right.len() as f64)
}

fn percentage(part: usize, whole: f64) -> f64 {
    part as f64 / whole * 100.0
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Pair completeness and reduction ratio of a retained edge set.
///
/// A gold pair counts as found when either orientation was retained. The
/// reduction ratio counts every retained selection, so a pair kept from both
/// endpoints costs two comparisons.
pub fn evaluate(
    left: &EntityCollection,
    right: &EntityCollection,
    retained: &RetainedEdges,
    gold: &GoldStandard,
) -> Result<Evaluation, MetaError> {
    let cross_product = check_sizes(left, right, gold)?;
    let gold_pairs = gold_standard_index(left, right, gold, retained.shift())?;
    let unique = retained.unordered();

    let matched_pairs = gold_pairs.iter().filter(|p| unique.contains(p)).count();
    let evaluation = Evaluation {
        pair_completeness: percentage(matched_pairs, gold_pairs.len() as f64),
        reduction_ratio: 100.0 - percentage(retained.len(), cross_product),
        gold_pairs: gold_pairs.len(),
        matched_pairs,
        retained_pairs: retained.len(),
        unique_pairs: unique.len(),
    };
    debug!(
        "evaluated {} retained pairs: pc {:.2}%, rr {:.2}%",
        evaluation.retained_pairs, evaluation.pair_completeness, evaluation.reduction_ratio,
    );
    Ok(evaluation)
}

/// Evaluate the comparisons implied by a block collection, in local coordinates.
pub fn evaluate_blocks(
    left: &EntityCollection,
    right: &EntityCollection,
    blocks: &BlockCollection,
    gold: &GoldStandard,
) -> Result<BlockEvaluation, MetaError> {
    let cross_product = check_sizes(left, right, gold)?;
    let gold_pairs = gold_standard_index(left, right, gold, 0)?;

    let mut unique: HashSet<Pair> = HashSet::new();
    for block in blocks.blocks() {
        for &l in &block.left {
            for &r in &block.right {
                unique.insert((l, r));
            }
        }
    }
    let comparisons = blocks.comparisons();

    let matched = gold_pairs.iter().filter(|p| unique.contains(p)).count();
    Ok(BlockEvaluation {
        pair_completeness: percentage(matched, gold_pairs.len() as f64),
        reduction_ratio: 100.0 - percentage(comparisons, cross_product),
        reduction_ratio_unique: 100.0 - percentage(unique.len(), cross_product),
        blocks: blocks.len(),
        comparisons,
        unique_comparisons: unique.len(),
    })
}
