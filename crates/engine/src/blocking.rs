use std::collections::BTreeMap;

use log::debug;

use crate::error::MetaError;
use crate::model::{Block, BlockCollection, EntityCollection, EntityId};
use crate::tokenize::multi_column_tokens;

/// Token → records containing it, for one collection.
pub type TokenIndex = BTreeMap<String, Vec<EntityId>>;

/// Index records by token. A record appears once per token even when the
/// token repeats inside it.
pub fn token_blocker(token_lists: &[Vec<String>]) -> TokenIndex {
    let mut index: TokenIndex = BTreeMap::new();
    for (record, tokens) in token_lists.iter().enumerate() {
        for token in tokens {
            let ids = index.entry(token.clone()).or_default();
            if ids.last() != Some(&record) {
                ids.push(record);
            }
        }
    }
    index
}

/// Pair up the two collections' indexes; tokens missing on either side are dropped.
pub fn join_blocks(left: &TokenIndex, right: &TokenIndex) -> BlockCollection {
    join_blocks_with_prefix(left, right, None)
}

pub(crate) fn join_blocks_with_prefix(
    left: &TokenIndex,
    right: &TokenIndex,
    prefix: Option<&str>,
) -> BlockCollection {
    left.iter()
        .filter_map(|(token, l)| {
            let r = right.get(token)?;
            let key = match prefix {
                Some(p) => format!("{p}:{token}"),
                None => token.clone(),
            };
            Some((key, Block::new(l.clone(), r.clone())))
        })
        .collect()
}

/// Token blocking over the given attribute columns of both collections.
pub fn token_blocking(
    left: &EntityCollection,
    right: &EntityCollection,
    left_columns: &[usize],
    right_columns: &[usize],
) -> Result<BlockCollection, MetaError> {
    let left_index = token_blocker(&multi_column_tokens(left, left_columns)?);
    let right_index = token_blocker(&multi_column_tokens(right, right_columns)?);
    let blocks = join_blocks(&left_index, &right_index);
    debug!(
        "token blocking: {} + {} tokens, {} shared blocks",
        left_index.len(),
        right_index.len(),
        blocks.len(),
    );
    Ok(blocks)
}
