use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use metablock_engine::{Pruning, Weighting, DEFAULT_CNP_FRACTION};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One meta-blocking experiment, usually read from a `*.mblock.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub left: CollectionConfig,
    pub right: CollectionConfig,
    pub gold: GoldConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub meta: MetaConfig,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub file: PathBuf,
    pub primary_key: String,
    /// Attribute columns used for blocking. Empty means every non-key column.
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Gold standard file and the names of its two key columns.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldConfig {
    pub file: PathBuf,
    pub left: String,
    pub right: String,
}

// ---------------------------------------------------------------------------
// Blocking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingMethod {
    Token,
    AttributeClustering,
}

impl fmt::Display for BlockingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::AttributeClustering => write!(f, "attribute_clustering"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockingConfig {
    #[serde(default = "default_methods")]
    pub methods: Vec<BlockingMethod>,
    /// Group attributes that link to nothing into one extra cluster.
    #[serde(default = "default_true")]
    pub glue_cluster: bool,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            methods: default_methods(),
            glue_cluster: true,
        }
    }
}

fn default_methods() -> Vec<BlockingMethod> {
    vec![BlockingMethod::Token]
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Meta-blocking
// ---------------------------------------------------------------------------

/// The (weighting, pruning) sweep and its parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_weighting")]
    pub weighting: Vec<Weighting>,
    #[serde(default = "default_pruning")]
    pub pruning: Vec<Pruning>,
    #[serde(default = "default_cnp_fraction")]
    pub cnp_fraction: f64,
    /// Meta-blocking passes per combination; passes after the first run on
    /// the blocks reconstructed from the previous pass.
    #[serde(default = "default_rounds")]
    pub rounds: usize,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            weighting: default_weighting(),
            pruning: default_pruning(),
            cnp_fraction: DEFAULT_CNP_FRACTION,
            rounds: 1,
        }
    }
}

fn default_weighting() -> Vec<Weighting> {
    vec![Weighting::Jaccard, Weighting::Cbs]
}

fn default_pruning() -> Vec<Pruning> {
    vec![Pruning::Wep, Pruning::Cnp]
}

fn default_cnp_fraction() -> f64 {
    DEFAULT_CNP_FRACTION
}

fn default_rounds() -> usize {
    1
}

impl MetaConfig {
    /// Every configured (weighting, pruning) combination, weighting-major.
    pub fn combinations(&self) -> Vec<(Weighting, Pruning)> {
        self.weighting
            .iter()
            .flat_map(|&w| self.pruning.iter().map(move |&p| (w, p)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ExperimentConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: ExperimentConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("name must not be empty".into()));
        }

        for (side, collection) in [("left", &self.left), ("right", &self.right)] {
            if collection.file.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("[{side}] file must not be empty")));
            }
            if collection.primary_key.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "[{side}] primary_key must not be empty"
                )));
            }
            if collection.columns.contains(&collection.primary_key) {
                return Err(ConfigError::Validation(format!(
                    "[{side}] columns must not include the primary key '{}'",
                    collection.primary_key
                )));
            }
        }

        if self.gold.file.as_os_str().is_empty() {
            return Err(ConfigError::Validation("[gold] file must not be empty".into()));
        }
        if self.gold.left.is_empty() || self.gold.right.is_empty() {
            return Err(ConfigError::Validation(
                "[gold] left and right key columns are required".into(),
            ));
        }

        require_unique("blocking.methods", &self.blocking.methods)?;
        require_unique("meta.weighting", &self.meta.weighting)?;
        require_unique("meta.pruning", &self.meta.pruning)?;

        let fraction = self.meta.cnp_fraction;
        if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "meta.cnp_fraction must be in (0, 1], got {fraction}"
            )));
        }
        if self.meta.rounds == 0 {
            return Err(ConfigError::Validation("meta.rounds must be at least 1".into()));
        }

        Ok(())
    }

    /// Resolve a config-relative path against the config file's directory.
    pub fn resolve(base_dir: &Path, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            base_dir.join(file)
        }
    }
}

fn require_unique<T>(field: &str, values: &[T]) -> Result<(), ConfigError>
where
    T: fmt::Display + Eq + std::hash::Hash,
{
    if values.is_empty() {
        return Err(ConfigError::Validation(format!("{field} must list at least one entry")));
    }
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(ConfigError::Validation(format!("{field} lists '{value}' twice")));
        }
    }
    Ok(())
}
