use std::collections::BTreeMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Positional index of a record inside its collection.
///
/// Inside a candidate graph, collection-2 ids are shifted by the graph's
/// `shift()` so both collections share one flat id space.
pub type EntityId = usize;

/// A candidate comparison `(a, b)`.
pub type Pair = (EntityId, EntityId);

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Entities of both collections that share some cheap signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Block {
    pub left: Vec<EntityId>,
    pub right: Vec<EntityId>,
}

impl Block {
    pub fn new(left: Vec<EntityId>, right: Vec<EntityId>) -> Self {
        Self { left, right }
    }

    /// Number of cross-collection comparisons this block implies.
    pub fn comparisons(&self) -> usize {
        self.left.len() * self.right.len()
    }

    pub fn is_productive(&self) -> bool {
        !self.left.is_empty() && !self.right.is_empty()
    }
}

/// Block key → block. Ordered by key so every run iterates identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BlockCollection {
    blocks: BTreeMap<String, Block>,
}

impl BlockCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, block: Block) -> Option<Block> {
        self.blocks.insert(key.into(), block)
    }

    pub fn get(&self, key: &str) -> Option<&Block> {
        self.blocks.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Block)> {
        self.blocks.iter()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total comparisons across all blocks, redundant ones included.
    pub fn comparisons(&self) -> usize {
        self.blocks.values().map(Block::comparisons).sum()
    }
}

impl<K: Into<String>> FromIterator<(K, Block)> for BlockCollection {
    fn from_iter<I: IntoIterator<Item = (K, Block)>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().map(|(k, b)| (k.into(), b)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A fully materialized record collection. Every row has `headers.len()` fields.
#[derive(Debug, Clone)]
pub struct EntityCollection {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Index of the primary-key column in `headers`.
    pub primary_key: usize,
}

impl EntityCollection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column, one per row. Short rows yield "".
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &str> {
        self.column(self.primary_key)
    }
}

/// True matches, as (collection-1 key, collection-2 key).
#[derive(Debug, Clone, Default)]
pub struct GoldStandard {
    pub pairs: Vec<(String, String)>,
}

impl GoldStandard {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a collection whose first column is the primary key.
    pub fn collection(name: &str, headers: &[&str], rows: &[&[&str]]) -> EntityCollection {
        EntityCollection {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
            primary_key: 0,
        }
    }

    pub fn blocks(entries: &[(&str, &[EntityId], &[EntityId])]) -> BlockCollection {
        entries
            .iter()
            .map(|(k, l, r)| (*k, Block::new(l.to_vec(), r.to_vec())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn comparisons_count_redundant_pairs() {
        let bc = blocks(&[("a", &[0, 1], &[0]), ("b", &[1], &[0, 1]), ("c", &[2], &[])]);
        assert_eq!(bc.comparisons(), 2 + 2);
        assert!(!bc.get("c").unwrap().is_productive());
    }

    #[test]
    fn column_lookup() {
        let c = collection("left", &["id", "title"], &[&["A", "ipod nano"], &["B"]]);
        assert_eq!(c.column_index("title"), Some(1));
        assert_eq!(c.column(1).collect::<Vec<_>>(), vec!["ipod nano", ""]);
        assert_eq!(c.primary_keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }
}
