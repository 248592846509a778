//! Configuration types for the architecture search.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::SearchSpaceType;

/// Optimization direction for fitness values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Objective {
    /// Higher fitness is better (accuracy).
    #[default]
    Maximize,
    /// Lower fitness is better (loss).
    Minimize,
}

impl Objective {
    /// Whether `a` is strictly better than `b`.
    #[inline]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Objective::Maximize => a > b,
            Objective::Minimize => a < b,
        }
    }

    /// The better of two values.
    #[inline]
    pub fn best_of(self, a: f64, b: f64) -> f64 {
        if self.is_better(b, a) { b } else { a }
    }

    /// Sentinel substituted for a missing or NaN fitness.
    #[inline]
    pub fn worst(self) -> f64 {
        match self {
            Objective::Maximize => f64::MIN,
            Objective::Minimize => f64::MAX,
        }
    }

    /// Map a fitness to a score where higher is always better.
    #[inline]
    pub fn score(self, fitness: f64) -> f64 {
        match self {
            Objective::Maximize => fitness,
            Objective::Minimize => -fitness,
        }
    }
}

/// Parent selection method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Linear rank-based selection.
    RankBased,
    /// Fitness-proportionate selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    2
}

/// How two parents are recombined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CrossoverType {
    /// Every gene independently from either parent.
    #[default]
    Uniform,
    /// Every node's genes together from either parent.
    Node,
    /// Prefix from the first parent, suffix from the second.
    SinglePoint,
}

/// Settings of the genetic algorithm searcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneticConfig {
    /// Individuals per generation.
    pub generation_size: usize,
    /// Maximum number of distinct genotypes kept in the ledger.
    pub population_size: usize,
    /// Top ledger entries copied unchanged into each generation.
    pub keep_size: usize,
    /// Extra `update_population` calls before the generation turns over.
    pub delay: usize,
    /// Per-gene mutation probability. `None` means one gene per individual
    /// on average.
    pub mutation_p: Option<f64>,
    /// Probability of recombining two parents instead of copying one.
    pub p_cross_over: f64,
    /// Recombination scheme.
    pub cross_over_type: CrossoverType,
    /// Parent selection scheme.
    pub selection: SelectionMethod,
    /// Optimization direction.
    pub objective: Objective,
    /// Random seed for reproducibility.
    pub random_seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            generation_size: default_generation_size(),
            population_size: default_population_size(),
            keep_size: 0,
            delay: 0,
            mutation_p: None,
            p_cross_over: default_p_cross_over(),
            cross_over_type: CrossoverType::default(),
            selection: SelectionMethod::default(),
            objective: Objective::default(),
            random_seed: None,
        }
    }
}

impl GeneticConfig {
    /// Validate relative sizes and rates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_size == 0 {
            return Err(ConfigError::EmptyGeneration);
        }
        if self.generation_size > self.population_size {
            return Err(ConfigError::GenerationExceedsPopulation {
                generation: self.generation_size,
                population: self.population_size,
            });
        }
        if self.keep_size > self.population_size {
            return Err(ConfigError::KeepExceedsPopulation {
                keep: self.keep_size,
                population: self.population_size,
            });
        }
        if let Some(p) = self.mutation_p {
            check_rate(p, "mutation_p")?;
        }
        check_rate(self.p_cross_over, "p_cross_over")?;
        if let SelectionMethod::Tournament { size } = self.selection
            && size == 0
        {
            return Err(ConfigError::InvalidTournamentSize);
        }
        Ok(())
    }
}

fn check_rate(value: f64, name: &'static str) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

/// Top-level search configuration as stored in `config.json`.
///
/// Every field has a default, so a partial file only overrides the keys it
/// names. Keys used by the external training loop are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Nodes per cell template.
    #[serde(default = "default_n_nodes")]
    pub n_nodes: usize,
    /// Number of independent cell templates (1, 2 or 3).
    #[serde(default = "default_n_block_type")]
    pub n_block_type: usize,
    /// Keep probability of the drop-path sampling bias.
    #[serde(default = "default_drop_path_keep_prob")]
    pub drop_path_keep_prob: f64,
    /// Epoch at which the drop-path sampling bias is switched on.
    #[serde(default)]
    pub drop_path_start_epoch: Option<usize>,
    #[serde(default = "default_generation_size")]
    pub generation_size: usize,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default)]
    pub keep_size: usize,
    #[serde(default)]
    pub delay: usize,
    #[serde(default)]
    pub mutation_p: Option<f64>,
    #[serde(default = "default_p_cross_over")]
    pub p_cross_over: f64,
    #[serde(default)]
    pub cross_over_type: CrossoverType,
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Minimize fitness instead of maximizing it.
    #[serde(default)]
    pub min_objective: bool,
    /// Number of search epochs run by the driver.
    #[serde(default = "default_n_epochs")]
    pub n_epochs: usize,
    /// Population updates per epoch.
    #[serde(default = "default_generation_per_epoch")]
    pub generation_per_epoch: usize,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_nodes: default_n_nodes(),
            n_block_type: default_n_block_type(),
            drop_path_keep_prob: default_drop_path_keep_prob(),
            drop_path_start_epoch: None,
            generation_size: default_generation_size(),
            population_size: default_population_size(),
            keep_size: 0,
            delay: 0,
            mutation_p: None,
            p_cross_over: default_p_cross_over(),
            cross_over_type: CrossoverType::default(),
            selection: SelectionMethod::default(),
            min_objective: false,
            n_epochs: default_n_epochs(),
            generation_per_epoch: default_generation_per_epoch(),
            random_seed: None,
        }
    }
}

fn default_n_nodes() -> usize {
    5
}
fn default_n_block_type() -> usize {
    1
}
fn default_drop_path_keep_prob() -> f64 {
    1.0
}
fn default_generation_size() -> usize {
    20
}
fn default_population_size() -> usize {
    60
}
fn default_p_cross_over() -> f64 {
    1.0
}
fn default_n_epochs() -> usize {
    310
}
fn default_generation_per_epoch() -> usize {
    1
}

impl SearchConfig {
    /// Load a configuration file, filling missing keys with defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Write the configuration as `config.json` inside `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, ConfigError> {
        let path = dir.as_ref().join("config.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Cell topology selected by `n_block_type`.
    pub fn space_type(&self) -> Result<SearchSpaceType, ConfigError> {
        SearchSpaceType::from_block_types(self.n_block_type)
            .ok_or(ConfigError::InvalidBlockType(self.n_block_type))
    }

    pub fn objective(&self) -> Objective {
        if self.min_objective {
            Objective::Minimize
        } else {
            Objective::Maximize
        }
    }

    /// Searcher settings carried by this file.
    pub fn genetic(&self) -> GeneticConfig {
        GeneticConfig {
            generation_size: self.generation_size,
            population_size: self.population_size,
            keep_size: self.keep_size,
            delay: self.delay,
            mutation_p: self.mutation_p,
            p_cross_over: self.p_cross_over,
            cross_over_type: self.cross_over_type,
            selection: self.selection.clone(),
            objective: self.objective(),
            random_seed: self.random_seed,
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        self.space_type()?;
        check_rate(self.drop_path_keep_prob, "drop_path_keep_prob")?;
        if self.generation_per_epoch == 0 {
            return Err(ConfigError::InvalidRate {
                name: "generation_per_epoch",
                value: 0.0,
            });
        }
        self.genetic().validate()
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Generation size must be non-zero")]
    EmptyGeneration,
    #[error("Generation size {generation} exceeds population size {population}")]
    GenerationExceedsPopulation { generation: usize, population: usize },
    #[error("Keep size {keep} exceeds population size {population}")]
    KeepExceedsPopulation { keep: usize, population: usize },
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Tournament size must be non-zero")]
    InvalidTournamentSize,
    #[error("Cells must contain at least one node")]
    NoNodes,
    #[error("n_block_type must be 1, 2 or 3, got {0}")]
    InvalidBlockType(usize),
    #[error("Cell {cell} node {node} has an empty gene alphabet")]
    EmptyAlphabet { cell: usize, node: usize },
    #[error("Cell {cell} node {node} references a later tensor")]
    ForwardInput { cell: usize, node: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert!(GeneticConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_keep() {
        let config = GeneticConfig {
            keep_size: 61,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::KeepExceedsPopulation { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_generation() {
        let config = GeneticConfig {
            generation_size: 100,
            population_size: 50,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GenerationExceedsPopulation { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_rate() {
        let config = GeneticConfig {
            mutation_p: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate { name: "mutation_p", .. })
        ));
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let json = r#"{
            "population_size": 200,
            "n_block_type": 2,
            "min_objective": true,
            "learning_rate": 0.25,
            "selection": {"method": "RankBased"}
        }"#;
        let config: SearchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.population_size, 200);
        assert_eq!(config.generation_size, 20);
        assert_eq!(config.space_type().unwrap(), SearchSpaceType::DualCell);
        assert_eq!(config.objective(), Objective::Minimize);
        assert_eq!(config.selection, SelectionMethod::RankBased);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            keep_size: 4,
            random_seed: Some(7),
            ..Default::default()
        };
        let path = config.save(dir.path()).unwrap();
        let loaded = SearchConfig::load(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_objective_ordering() {
        assert!(Objective::Maximize.is_better(0.9, 0.1));
        assert!(Objective::Minimize.is_better(0.1, 0.9));
        assert_eq!(Objective::Minimize.best_of(0.3, 0.2), 0.2);
        assert!(Objective::Maximize.score(Objective::Maximize.worst()) < -1e300);
    }
}
