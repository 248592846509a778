//! Schema module - Configuration, genotype and history types for the search.

mod config;
mod genotype;
mod history;
mod space;

pub use config::*;
pub use genotype::*;
pub use history::*;
pub use space::*;
