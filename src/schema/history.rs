//! Per-generation statistics and the search history.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Statistics returned by one population update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationStats {
    /// Fitness of the ledger entries carried into the next generation as
    /// elites, best first.
    pub elite_fitness: Vec<f64>,
    /// Mean fitness of the evaluated generation.
    pub mean: f64,
    /// Best fitness of the evaluated generation.
    pub max: f64,
    /// Worst fitness of the evaluated generation.
    pub min: f64,
    /// Distinct genotypes newly introduced into the ledger.
    pub n_diff: usize,
}

/// Where the searcher stands within the current generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SearchPhase {
    /// Some individuals of the generation still lack fitness.
    Collecting,
    /// Every individual has fitness; the population can be updated.
    AllEvaluated,
    /// A fresh generation was just produced and nothing was reported yet.
    Advanced,
}

/// History of fitness statistics across population updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHistory {
    /// Fitness of every generation slot, per update.
    pub generation_fitness: Vec<Vec<f64>>,
    /// Fitness of every ledger entry after the update, best first.
    pub population_fitness: Vec<Vec<f64>>,
    /// Best fitness ever recorded, per update.
    pub best_fitness: Vec<f64>,
    /// Generation mean fitness, per update.
    pub mean_fitness: Vec<f64>,
    /// Generation fitness standard deviation, per update.
    pub fitness_std: Vec<f64>,
    /// New distinct genotypes, per update.
    pub n_diff: Vec<usize>,
}

impl SearchHistory {
    /// Number of recorded updates.
    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }

    /// Write the history as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
