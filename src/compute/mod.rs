//! Compute module - Search algorithms and genotype rendering.

pub mod evolution;
pub mod render;

pub use evolution::{
    FitnessEvaluator, GeneticAlgorithmSearcher, NetworkAdapter, PopulationLedger, SearchError,
    SearchSpace, SyntheticEvaluator,
};
