//! GNAS - Genetic neural architecture search over weight-shared cells.
//!
//! This crate implements the search core of a weight-sharing architecture
//! search: a discrete space of convolutional cell genotypes and a genetic
//! algorithm that evolves them from fitness reported by an external
//! training loop.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, genotype, token and history types
//! - `compute`: Search space operators, population ledger, searcher and rendering
//!
//! # Example
//!
//! ```rust,no_run
//! use gnas::{GeneticAlgorithmSearcher, SearchConfig};
//!
//! let config = SearchConfig {
//!     population_size: 200,
//!     generation_size: 20,
//!     random_seed: Some(0),
//!     ..Default::default()
//! };
//! let mut ga = GeneticAlgorithmSearcher::from_config(&config).unwrap();
//!
//! for _ in 0..30 {
//!     let generation = ga.get_current_generation().to_vec();
//!     for ind in &generation {
//!         // Load `ind` into the network and evaluate it here.
//!         ga.update_current_individual_fitness(ind, 0.5);
//!     }
//!     let stats = ga.update_population();
//!     println!("best={:.3} n_diff={}", stats.max, stats.n_diff);
//! }
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{GeneticAlgorithmSearcher, SearchSpace};
pub use schema::{GeneticConfig, Individual, IndividualToken, SearchConfig, SearchSpaceType};
