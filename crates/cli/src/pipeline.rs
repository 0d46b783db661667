//! Experiment driver: load inputs, generate blocks, then sweep every
//! configured (weighting, pruning) combination over the candidate graph.

use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use metablock_engine::blocking::token_blocking;
use metablock_engine::clustering::{attribute_clustering_blocking, attribute_clusters, AttributeCluster};
use metablock_engine::{
    build, collect, evaluate, evaluate_blocks, prune, BlockCollection, BlockEvaluation,
    CandidateGraph, Evaluation, GoldStandard, Pruning, RetainedEdges, Weighting,
};
use metablock_io::{load_collection, load_gold_standard, LoadedCollection};
use serde::Serialize;

use crate::config::{BlockingMethod, ExperimentConfig, MetaConfig};
use crate::error::RunError;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

pub struct ExperimentInputs {
    pub left: LoadedCollection,
    pub right: LoadedCollection,
    pub gold: GoldStandard,
}

/// Load both collections and the gold standard. Relative paths resolve
/// against `base_dir`.
pub fn load_inputs(config: &ExperimentConfig, base_dir: &Path) -> Result<ExperimentInputs, RunError> {
    let left = load_collection(
        &ExperimentConfig::resolve(base_dir, &config.left.file),
        &config.left.primary_key,
        &config.left.columns,
    )?;
    let right = load_collection(
        &ExperimentConfig::resolve(base_dir, &config.right.file),
        &config.right.primary_key,
        &config.right.columns,
    )?;
    let gold = load_gold_standard(
        &ExperimentConfig::resolve(base_dir, &config.gold.file),
        &config.gold.left,
        &config.gold.right,
    )?;
    Ok(ExperimentInputs { left, right, gold })
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub meta: RunMeta,
    pub inputs: InputSummary,
    pub methods: Vec<MethodReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
    pub cnp_fraction: f64,
    pub rounds: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub left: CollectionSummary,
    pub right: CollectionSummary,
    pub gold_pairs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub records: usize,
    pub attributes: Vec<String>,
}

impl CollectionSummary {
    fn of(loaded: &LoadedCollection) -> Self {
        let c = &loaded.collection;
        Self {
            name: c.name.clone(),
            records: c.len(),
            attributes: loaded.attributes.iter().map(|&i| c.headers[i].clone()).collect(),
        }
    }
}

/// Results for one blocking method.
#[derive(Debug, Clone, Serialize)]
pub struct MethodReport {
    pub method: BlockingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clusters: Option<Vec<AttributeCluster>>,
    pub blocks: BlockEvaluation,
    pub graph: GraphSummary,
    pub combinations: Vec<CombinationReport>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub shift: usize,
}

impl GraphSummary {
    fn of<W>(graph: &CandidateGraph<W>) -> Self {
        Self {
            nodes: graph.nodes().len(),
            edges: graph.edge_count(),
            shift: graph.shift(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinationReport {
    pub weighting: Weighting,
    pub pruning: Pruning,
    pub rounds: Vec<RoundReport>,
    pub elapsed_ms: u64,
}

impl CombinationReport {
    /// Evaluation after the last round that ran.
    pub fn final_evaluation(&self) -> Option<&Evaluation> {
        self.rounds.last().map(|r| &r.evaluation)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub round: usize,
    /// Edges of the candidate graph this round pruned.
    pub graph_edges: usize,
    pub evaluation: Evaluation,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub fn run_experiment(
    config: &ExperimentConfig,
    inputs: &ExperimentInputs,
) -> Result<ExperimentReport, RunError> {
    let left = &inputs.left;
    let right = &inputs.right;
    info!(
        "experiment '{}': {} x {} records, {} gold pairs",
        config.name,
        left.collection.len(),
        right.collection.len(),
        inputs.gold.len(),
    );

    let mut methods = Vec::with_capacity(config.blocking.methods.len());
    for &method in &config.blocking.methods {
        methods.push(run_method(config, inputs, method)?);
    }

    Ok(ExperimentReport {
        meta: RunMeta {
            name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            cnp_fraction: config.meta.cnp_fraction,
            rounds: config.meta.rounds,
        },
        inputs: InputSummary {
            left: CollectionSummary::of(left),
            right: CollectionSummary::of(right),
            gold_pairs: inputs.gold.len(),
        },
        methods,
    })
}

fn run_method(
    config: &ExperimentConfig,
    inputs: &ExperimentInputs,
    method: BlockingMethod,
) -> Result<MethodReport, RunError> {
    let (left, right) = (&inputs.left, &inputs.right);
    let (blocks, clusters) = generate_blocks(method, left, right, config.blocking.glue_cluster)?;
    let block_eval = evaluate_blocks(&left.collection, &right.collection, &blocks, &inputs.gold)?;
    info!(
        "{method}: {} blocks, {} comparisons, pc {:.2}%",
        block_eval.blocks, block_eval.comparisons, block_eval.pair_completeness,
    );

    let graph = build(&blocks);
    let mut combinations = Vec::new();
    if graph.edge_count() == 0 {
        warn!("{method}: blocks share no cross-collection pair, skipping meta-blocking");
    } else {
        for (weighting, pruning) in config.meta.combinations() {
            let report = run_combination(&graph, weighting, pruning, &config.meta, inputs)?;
            if let Some(ev) = report.final_evaluation() {
                info!(
                    "{method} {weighting}/{pruning}: pc {:.2}%, rr {:.2}% in {} ms",
                    ev.pair_completeness, ev.reduction_ratio, report.elapsed_ms,
                );
            }
            combinations.push(report);
        }
    }

    Ok(MethodReport {
        method,
        clusters,
        blocks: block_eval,
        graph: GraphSummary::of(&graph),
        combinations,
    })
}

fn generate_blocks(
    method: BlockingMethod,
    left: &LoadedCollection,
    right: &LoadedCollection,
    glue_cluster: bool,
) -> Result<(BlockCollection, Option<Vec<AttributeCluster>>), RunError> {
    let (l, r) = (&left.collection, &right.collection);
    match method {
        BlockingMethod::Token => Ok((token_blocking(l, r, &left.attributes, &right.attributes)?, None)),
        BlockingMethod::AttributeClustering => {
            let clusters = attribute_clusters(l, r, &left.attributes, &right.attributes, glue_cluster)?;
            let blocks =
                attribute_clustering_blocking(l, r, &left.attributes, &right.attributes, glue_cluster)?;
            Ok((blocks, Some(clusters)))
        }
    }
}

/// Weight, prune and evaluate; extra rounds re-run on the blocks rebuilt
/// from the previous round's retained edges.
fn run_combination(
    graph: &CandidateGraph<u32>,
    weighting: Weighting,
    pruning: Pruning,
    meta: &MetaConfig,
    inputs: &ExperimentInputs,
) -> Result<CombinationReport, RunError> {
    let start = Instant::now();
    let mut rounds = Vec::with_capacity(meta.rounds);

    let mut retained = prune(&weighting.apply(graph)?, pruning, meta.cnp_fraction)?;
    rounds.push(round_report(1, graph.edge_count(), &retained, inputs)?);

    for round in 2..=meta.rounds {
        if retained.is_empty() {
            warn!("{weighting}/{pruning}: nothing retained after round {}, stopping", round - 1);
            break;
        }
        let blocks = collect(&retained).to_block_collection(retained.shift())?;
        let next = build(&blocks);
        retained = prune(&weighting.apply(&next)?, pruning, meta.cnp_fraction)?;
        rounds.push(round_report(round, next.edge_count(), &retained, inputs)?);
    }

    Ok(CombinationReport {
        weighting,
        pruning,
        rounds,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

fn round_report(
    round: usize,
    graph_edges: usize,
    retained: &RetainedEdges,
    inputs: &ExperimentInputs,
) -> Result<RoundReport, RunError> {
    let evaluation = evaluate(
        &inputs.left.collection,
        &inputs.right.collection,
        retained,
        &inputs.gold,
    )?;
    Ok(RoundReport { round, graph_edges, evaluation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use metablock_engine::EntityCollection;

    fn loaded(name: &str, headers: &[&str], rows: &[&[&str]]) -> LoadedCollection {
        LoadedCollection {
            collection: EntityCollection {
                name: name.into(),
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: rows.iter().map(|r| r.iter().map(|v| v.to_string()).collect()).collect(),
                primary_key: 0,
            },
            attributes: (1..headers.len()).collect(),
        }
    }

    fn inputs() -> ExperimentInputs {
        ExperimentInputs {
            left: loaded(
                "amazon",
                &["id", "title", "manufacturer"],
                &[
                    &["a1", "ipod nano 8gb", "apple"],
                    &["a2", "zune player 30gb", "microsoft"],
                    &["a3", "office home student", "microsoft"],
                ],
            ),
            right: loaded(
                "google",
                &["id", "name", "brand"],
                &[
                    &["g1", "apple ipod nano", "apple"],
                    &["g2", "microsoft zune 30gb", "microsoft"],
                    &["g3", "microsoft office student edition", "microsoft"],
                ],
            ),
            gold: GoldStandard {
                pairs: vec![
                    ("a1".into(), "g1".into()),
                    ("a2".into(), "g2".into()),
                    ("a3".into(), "g3".into()),
                ],
            },
        }
    }

    fn config(extra: &str) -> ExperimentConfig {
        let toml = format!(
            r#"
name = "unit"
[left]
file = "l.csv"
primary_key = "id"
[right]
file = "r.csv"
primary_key = "id"
[gold]
file = "g.csv"
left = "a"
right = "b"
{extra}
"#
        );
        ExperimentConfig::from_toml(&toml).unwrap()
    }

    #[test]
    fn sweeps_every_combination() {
        let report = run_experiment(&config(""), &inputs()).unwrap();
        assert_eq!(report.methods.len(), 1);
        let token = &report.methods[0];
        assert_eq!(token.method, BlockingMethod::Token);
        assert!(token.clusters.is_none());
        assert_eq!(token.blocks.pair_completeness, 100.0);
        assert_eq!(token.combinations.len(), 4);
        for c in &token.combinations {
            assert_eq!(c.rounds.len(), 1);
            assert_eq!(c.final_evaluation().unwrap().gold_pairs, 3);
        }
        assert_eq!(report.inputs.left.attributes, vec!["title", "manufacturer"]);
        assert_eq!(report.meta.engine_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn attribute_clustering_reports_clusters() {
        let cfg = config("[blocking]\nmethods = [\"attribute_clustering\"]\n");
        let report = run_experiment(&cfg, &inputs()).unwrap();
        let clusters = report.methods[0].clusters.as_ref().unwrap();
        assert!(!clusters.is_empty());
    }

    #[test]
    fn extra_rounds_never_grow_the_candidate_set() {
        let cfg = config("[meta]\nweighting = [\"jaccard\"]\npruning = [\"wep\"]\nrounds = 3\n");
        let report = run_experiment(&cfg, &inputs()).unwrap();
        let rounds = &report.methods[0].combinations[0].rounds;
        assert!(!rounds.is_empty() && rounds.len() <= 3);
        for pair in rounds.windows(2) {
            assert!(pair[1].evaluation.unique_pairs <= pair[0].evaluation.unique_pairs);
            assert_eq!(pair[1].round, pair[0].round + 1);
        }
    }

    #[test]
    fn unknown_gold_key_fails_the_run() {
        let mut bad = inputs();
        bad.gold.pairs.push(("a9".into(), "g1".into()));
        let err = run_experiment(&config(""), &bad).unwrap_err();
        assert!(matches!(err, RunError::Meta(metablock_engine::MetaError::Lookup { .. })));
    }
}
