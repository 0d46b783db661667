//! `metablock-engine` — Block generation, meta-blocking and evaluation for
//! entity resolution between two record collections.
//!
//! Pure engine crate: receives pre-loaded collections, returns blocks, pruned
//! candidate pairs and metrics. No CLI or IO dependencies.

pub mod blocking;
pub mod clustering;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod model;
pub mod pruning;
pub mod reconstruct;
pub mod tokenize;
pub mod weighting;

pub use error::MetaError;
pub use evaluate::{evaluate, evaluate_blocks, BlockEvaluation, Evaluation};
pub use graph::{build, CandidateGraph, WeightedGraph};
pub use model::{Block, BlockCollection, EntityCollection, EntityId, GoldStandard, Pair};
pub use pruning::{prune, Pruning, RetainedEdges, DEFAULT_CNP_FRACTION};
pub use reconstruct::{collect, ReconstructedBlocks};
pub use weighting::Weighting;
