//! Evolutionary architecture search.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Search Space** (`space`): Per-node gene alphabets, sampling, mutation and crossover
//! - **Population Ledger** (`ledger`): Bounded best-fitness-per-genotype archive
//! - **Searcher** (`search`): Generation bookkeeping, selection and breeding
//! - **Fitness** (`fitness`): Seams to the external network and evaluation loop
//!
//! # Example
//!
//! ```rust,no_run
//! use gnas::compute::evolution::{
//!     GeneticAlgorithmSearcher, SearchSpace, SyntheticEvaluator, evaluate_generation,
//! };
//! use gnas::schema::{DropPathControl, GeneticConfig, SearchSpaceType};
//!
//! let space = SearchSpace::enas_cnn(5, DropPathControl::default(), SearchSpaceType::SingleCell)
//!     .unwrap();
//! let config = GeneticConfig {
//!     population_size: 200,
//!     generation_size: 20,
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//! let mut ga = GeneticAlgorithmSearcher::new(space, config).unwrap();
//! let evaluator = SyntheticEvaluator::new(0, 0.01);
//!
//! for _ in 0..30 {
//!     evaluate_generation(&mut ga, &evaluator);
//!     let stats = ga.update_population();
//!     println!("max={:.3} n_diff={}", stats.max, stats.n_diff);
//! }
//! println!("best: {:?}", ga.best_fitness());
//! ```

mod fitness;
mod ledger;
mod search;
mod space;

pub use fitness::{
    FitnessEvaluator, NetworkAdapter, SyntheticEvaluator, evaluate_generation,
    evaluate_generation_parallel, evaluate_generation_with,
};
pub use ledger::PopulationLedger;
pub use search::{GeneticAlgorithmSearcher, SearchError};
pub use space::{ENAS_CNN_OPERATIONS, SearchSpace};
