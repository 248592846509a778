//! Fitness evaluation seams between the searcher and the trained network.
//!
//! The network and its evaluation loop live outside this crate. They plug in
//! through `NetworkAdapter` and `FitnessEvaluator`; the helpers below walk a
//! generation, score every member and report the results back.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand_distr::Normal;
use rayon::prelude::*;

use crate::schema::{Individual, Operation};

use super::search::GeneticAlgorithmSearcher;

/// A weight-shared network that activates the sub-graph of one genotype.
pub trait NetworkAdapter {
    /// Select the sub-graph used by subsequent forward passes.
    fn set_individual(&mut self, individual: &Individual);
}

/// Produces a scalar fitness for a genotype.
pub trait FitnessEvaluator {
    fn evaluate(&self, individual: &Individual) -> f64;
}

impl<F> FitnessEvaluator for F
where
    F: Fn(&Individual) -> f64,
{
    fn evaluate(&self, individual: &Individual) -> f64 {
        self(individual)
    }
}

/// Score every member of the current generation and report it.
///
/// Returns the fitness of each generation slot.
pub fn evaluate_generation<E>(searcher: &mut GeneticAlgorithmSearcher, evaluator: &E) -> Vec<f64>
where
    E: FitnessEvaluator + ?Sized,
{
    let generation = searcher.get_current_generation().to_vec();
    let scores: Vec<f64> = generation
        .iter()
        .map(|ind| evaluator.evaluate(ind))
        .collect();
    report(searcher, &generation, &scores);
    scores
}

/// Score the current generation in parallel, then report in slot order.
pub fn evaluate_generation_parallel<E>(
    searcher: &mut GeneticAlgorithmSearcher,
    evaluator: &E,
) -> Vec<f64>
where
    E: FitnessEvaluator + Sync + ?Sized,
{
    let generation = searcher.get_current_generation().to_vec();
    let scores: Vec<f64> = generation
        .par_iter()
        .map(|ind| evaluator.evaluate(ind))
        .collect();
    report(searcher, &generation, &scores);
    scores
}

/// Load each member into the network, run `forward`, and report the result.
pub fn evaluate_generation_with<N, F>(
    searcher: &mut GeneticAlgorithmSearcher,
    network: &mut N,
    mut forward: F,
) -> Vec<f64>
where
    N: NetworkAdapter + ?Sized,
    F: FnMut(&mut N) -> f64,
{
    let generation = searcher.get_current_generation().to_vec();
    let mut scores = Vec::with_capacity(generation.len());
    for ind in &generation {
        network.set_individual(ind);
        scores.push(forward(network));
    }
    report(searcher, &generation, &scores);
    scores
}

fn report(searcher: &mut GeneticAlgorithmSearcher, generation: &[Individual], scores: &[f64]) {
    for (ind, &fitness) in generation.iter().zip(scores.iter()) {
        searcher.update_current_individual_fitness(ind, fitness);
    }
}

/// Deterministic surrogate objective for exercising the search without a
/// trained network.
///
/// Rewards convolutions over pooling and skips, and inputs drawn from
/// intermediate nodes over the cell inputs. Optional Gaussian noise is seeded
/// per genotype, so repeated evaluations agree.
#[derive(Debug, Clone)]
pub struct SyntheticEvaluator {
    seed: u64,
    noise: Option<Normal<f64>>,
}

impl SyntheticEvaluator {
    /// Create an evaluator; `noise_std <= 0` disables the noise term.
    pub fn new(seed: u64, noise_std: f64) -> Self {
        let noise = if noise_std > 0.0 {
            Normal::new(0.0, noise_std).ok()
        } else {
            None
        };
        Self { seed, noise }
    }

    /// Noise-free part of the objective, in `[0, 1]`.
    pub fn base_score(individual: &Individual) -> f64 {
        let mut op_total = 0.0;
        let mut depth_total = 0.0;
        let mut count = 0usize;

        for node in individual.cells().iter().flatten() {
            for (&input, &op) in node.inputs.iter().zip(node.ops.iter()) {
                op_total += operation_weight(op);
                depth_total += if input >= 2 { 1.0 } else { 0.0 };
                count += 1;
            }
        }

        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        0.6 * (op_total / n) + 0.4 * (depth_total / n)
    }
}

impl FitnessEvaluator for SyntheticEvaluator {
    fn evaluate(&self, individual: &Individual) -> f64 {
        let base = Self::base_score(individual);
        let Some(noise) = &self.noise else {
            return base;
        };

        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        individual.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        (base + noise.sample(&mut rng)).clamp(0.0, 1.0)
    }
}

fn operation_weight(op: Operation) -> f64 {
    match op {
        Operation::Dw5x5 => 1.0,
        Operation::Dw3x3 => 0.9,
        Operation::Max3x3 => 0.55,
        Operation::Avg3x3 => 0.5,
        Operation::Identity => 0.35,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::SearchSpace;
    use crate::schema::{DropPathControl, GeneticConfig, NodeGene, SearchSpaceType};

    fn searcher(seed: u64) -> GeneticAlgorithmSearcher {
        let space =
            SearchSpace::enas_cnn(4, DropPathControl::default(), SearchSpaceType::DualCell)
                .unwrap();
        let config = GeneticConfig {
            population_size: 40,
            generation_size: 12,
            keep_size: 2,
            random_seed: Some(seed),
            ..Default::default()
        };
        GeneticAlgorithmSearcher::new(space, config).unwrap()
    }

    #[derive(Default)]
    struct RecordingNetwork {
        loaded: Vec<Individual>,
    }

    impl NetworkAdapter for RecordingNetwork {
        fn set_individual(&mut self, individual: &Individual) {
            self.loaded.push(individual.clone());
        }
    }

    #[test]
    fn test_base_score_prefers_deep_convolutions() {
        let shallow = Individual::from_cells(vec![vec![NodeGene {
            inputs: [0, 1],
            ops: [Operation::Identity, Operation::Identity],
        }; 2]]);
        let deep = Individual::from_cells(vec![vec![
            NodeGene {
                inputs: [0, 1],
                ops: [Operation::Dw5x5, Operation::Dw5x5],
            },
            NodeGene {
                inputs: [2, 2],
                ops: [Operation::Dw5x5, Operation::Dw5x5],
            },
        ]]);
        assert!(SyntheticEvaluator::base_score(&deep) > SyntheticEvaluator::base_score(&shallow));
    }

    #[test]
    fn test_noise_is_deterministic_per_genotype() {
        let evaluator = SyntheticEvaluator::new(3, 0.05);
        let mut ga = searcher(1);
        let ind = ga.sample_child();
        let a = evaluator.evaluate(&ind);
        let b = evaluator.evaluate(&ind);
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let evaluator = SyntheticEvaluator::new(9, 0.02);
        let mut seq = searcher(5);
        let mut par = searcher(5);

        for _ in 0..5 {
            let a = evaluate_generation(&mut seq, &evaluator);
            let b = evaluate_generation_parallel(&mut par, &evaluator);
            assert_eq!(a, b);
            assert_eq!(seq.update_population(), par.update_population());
        }
        assert_eq!(seq.get_current_generation(), par.get_current_generation());
    }

    #[test]
    fn test_network_adapter_sees_every_member() {
        let mut ga = searcher(7);
        let mut network = RecordingNetwork::default();
        let generation = ga.get_current_generation().to_vec();

        let scores = evaluate_generation_with(&mut ga, &mut network, |net| {
            net.loaded.last().map_or(0.0, SyntheticEvaluator::base_score)
        });

        assert_eq!(network.loaded, generation);
        assert_eq!(scores.len(), generation.len());
        assert!(ga.pending_individuals().is_empty());
    }

    #[test]
    fn test_closure_evaluator() {
        let mut ga = searcher(11);
        let scores = evaluate_generation(&mut ga, &|ind: &Individual| ind.gene_count() as f64);
        assert!(scores.iter().all(|&s| s == 32.0));
    }

    #[test]
    fn test_search_improves_synthetic_objective() {
        let evaluator = SyntheticEvaluator::new(0, 0.0);
        let mut ga = searcher(13);

        evaluate_generation(&mut ga, &evaluator);
        let first = ga.update_population().max;
        for _ in 0..40 {
            evaluate_generation(&mut ga, &evaluator);
            ga.update_population();
        }
        assert!(ga.best_fitness().unwrap() >= first);
    }
}
