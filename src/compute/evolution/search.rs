//! Genetic algorithm searcher driving the architecture search.

use std::collections::HashMap;

use log::{debug, info, warn};
use rand::prelude::*;

use crate::schema::{
    ConfigError, EncodingError, GenerationStats, GeneticConfig, Individual, IndividualToken,
    Objective, SearchConfig, SearchHistory, SearchPhase, SelectionMethod,
};

use super::ledger::PopulationLedger;
use super::space::SearchSpace;

/// Errors surfaced by the searcher.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{missing} individuals of the current generation have no fitness")]
    IncompleteGeneration { missing: usize },
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid genotype: {0}")]
    Encoding(#[from] EncodingError),
}

/// Evolutionary searcher over a `SearchSpace`.
///
/// The caller evaluates every individual of `get_current_generation`, reports
/// each fitness through `update_current_individual_fitness`, then calls
/// `update_population` to fold the results into the ledger and breed the next
/// generation. All randomness comes from the searcher's own seeded RNG.
pub struct GeneticAlgorithmSearcher {
    config: GeneticConfig,
    space: SearchSpace,
    rng: StdRng,
    mutation_p: f64,
    generation: Vec<Individual>,
    observations: HashMap<Individual, f64>,
    /// Genotypes in the order they were first reported.
    reported: Vec<Individual>,
    ledger: PopulationLedger,
    best: Option<(Individual, f64)>,
    history: SearchHistory,
    updates: usize,
    stale_rounds: usize,
}

impl GeneticAlgorithmSearcher {
    /// Create a searcher and sample its first generation uniformly.
    pub fn new(space: SearchSpace, config: GeneticConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mutation_p = config
            .mutation_p
            .unwrap_or_else(|| space.default_mutation_p());

        let generation = (0..config.generation_size)
            .map(|_| space.sample_architecture(&mut rng))
            .collect();
        let ledger = PopulationLedger::new(config.population_size, config.objective);

        debug!(
            "searcher created: seed={} generation_size={} population_size={} mutation_p={:.4}",
            seed, config.generation_size, config.population_size, mutation_p
        );

        Ok(Self {
            config,
            space,
            rng,
            mutation_p,
            generation,
            observations: HashMap::new(),
            reported: Vec::new(),
            ledger,
            best: None,
            history: SearchHistory::default(),
            updates: 0,
            stale_rounds: 0,
        })
    }

    /// Build the search space and searcher described by a config file.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = SearchSpace::from_config(config)?;
        Self::new(space, config.genetic())
    }

    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    pub fn search_space(&self) -> &SearchSpace {
        &self.space
    }

    /// Mutable access to the space, e.g. to switch on the drop-path bias.
    pub fn search_space_mut(&mut self) -> &mut SearchSpace {
        &mut self.space
    }

    pub fn ledger(&self) -> &PopulationLedger {
        &self.ledger
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    /// Number of `update_population` calls so far.
    pub fn generation_index(&self) -> usize {
        self.updates
    }

    /// Effective per-gene mutation probability.
    pub fn mutation_p(&self) -> f64 {
        self.mutation_p
    }

    /// Best genotype ever recorded in the ledger.
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best.as_ref().map(|(ind, _)| ind)
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, f)| *f)
    }

    /// Persisted form of the best genotype.
    pub fn export_best(&self) -> Option<IndividualToken> {
        self.best_individual().map(|ind| self.space.encode(ind))
    }

    /// One member of the current generation for immediate use.
    pub fn sample_child(&mut self) -> Individual {
        let idx = self.rng.gen_range(0..self.generation.len());
        self.generation[idx].clone()
    }

    /// The batch awaiting evaluation. Unchanged until the population advances.
    pub fn get_current_generation(&self) -> &[Individual] {
        &self.generation
    }

    /// Record a fitness observation. Repeated observations keep the better value.
    pub fn update_current_individual_fitness(&mut self, individual: &Individual, fitness: f64) {
        let objective = self.config.objective;
        let fitness = if fitness.is_nan() {
            warn!("NaN fitness reported; substituting the worst value");
            objective.worst()
        } else {
            fitness
        };

        match self.observations.get_mut(individual) {
            Some(current) => *current = objective.best_of(*current, fitness),
            None => {
                self.observations.insert(individual.clone(), fitness);
                self.reported.push(individual.clone());
            }
        }
    }

    /// Observed fitness of a genotype in the current generation.
    pub fn current_fitness(&self, individual: &Individual) -> Option<f64> {
        self.observations.get(individual).copied()
    }

    /// Members of the current generation that still lack fitness.
    pub fn pending_individuals(&self) -> Vec<&Individual> {
        self.generation
            .iter()
            .filter(|ind| !self.observations.contains_key(*ind))
            .collect()
    }

    pub fn phase(&self) -> SearchPhase {
        if self.observations.is_empty() {
            SearchPhase::Advanced
        } else if self.pending_individuals().is_empty() {
            SearchPhase::AllEvaluated
        } else {
            SearchPhase::Collecting
        }
    }

    /// Strict variant of `update_population` that refuses a partially
    /// evaluated generation.
    pub fn try_update_population(&mut self) -> Result<GenerationStats, SearchError> {
        let missing = self.pending_individuals().len();
        if missing > 0 {
            return Err(SearchError::IncompleteGeneration { missing });
        }
        Ok(self.update_population())
    }

    /// Fold the current generation into the ledger and breed the next one.
    ///
    /// Individuals without a reported fitness are scored with the objective's
    /// worst value.
    pub fn update_population(&mut self) -> GenerationStats {
        let objective = self.config.objective;

        // Generation members first, in slot order, then other observations.
        let mut slot_fitness = Vec::with_capacity(self.generation.len());
        let mut missing = 0usize;
        for ind in &self.generation {
            let fitness = match self.observations.get(ind) {
                Some(&f) => f,
                None => {
                    missing += 1;
                    objective.worst()
                }
            };
            slot_fitness.push(fitness);
        }
        if missing > 0 {
            warn!(
                "updating population with {} of {} individuals unevaluated",
                missing,
                self.generation.len()
            );
        }

        let mut introduced = Vec::new();
        for (ind, &fitness) in self.generation.iter().zip(slot_fitness.iter()) {
            if self.ledger.merge(ind.clone(), fitness) {
                introduced.push(ind.clone());
            }
        }
        for ind in &self.reported {
            if let Some(&fitness) = self.observations.get(ind)
                && self.ledger.merge(ind.clone(), fitness)
            {
                introduced.push(ind.clone());
            }
        }

        let evicted = self.ledger.truncate();
        let n_diff = introduced
            .iter()
            .filter(|ind| self.ledger.contains(ind))
            .count();

        if let Some((ind, fitness)) = self.ledger.best() {
            let improved = match &self.best {
                Some((_, best)) => objective.is_better(fitness, *best),
                None => true,
            };
            if improved {
                info!("new best fitness {:.6} at update {}", fitness, self.updates);
                self.best = Some((ind.clone(), fitness));
            }
        }

        let ranked: Vec<(Individual, f64)> = self
            .ledger
            .ranked()
            .into_iter()
            .map(|(ind, f)| (ind.clone(), f))
            .collect();
        let elite_count = self
            .config
            .keep_size
            .min(ranked.len())
            .min(self.config.generation_size);
        let elite_fitness: Vec<f64> = ranked[..elite_count].iter().map(|(_, f)| *f).collect();

        let stats = summarize(&slot_fitness, elite_fitness, n_diff);
        self.record_history(slot_fitness, &stats);

        debug!(
            "update {}: mean={:.4} max={:.4} min={:.4} n_diff={} ledger={} evicted={}",
            self.updates,
            stats.mean,
            stats.max,
            stats.min,
            n_diff,
            self.ledger.len(),
            evicted.len()
        );

        if self.stale_rounds < self.config.delay {
            self.stale_rounds += 1;
            debug!(
                "keeping generation for re-evaluation ({}/{})",
                self.stale_rounds, self.config.delay
            );
        } else {
            self.stale_rounds = 0;
            self.generation = self.breed(&ranked, elite_count);
        }

        self.observations.clear();
        self.reported.clear();
        self.updates += 1;
        stats
    }

    /// Elites first, then offspring of rank-biased parent pairs.
    fn breed(&mut self, ranked: &[(Individual, f64)], elite_count: usize) -> Vec<Individual> {
        let size = self.config.generation_size;
        let mut next: Vec<Individual> = ranked[..elite_count]
            .iter()
            .map(|(ind, _)| ind.clone())
            .collect();

        if ranked.is_empty() {
            while next.len() < size {
                next.push(self.space.sample_architecture(&mut self.rng));
            }
            return next;
        }

        while next.len() < size {
            let a = self.select_index(ranked);
            let b = self.select_index(ranked);

            let child = if self.rng.r#gen::<f64>() < self.config.p_cross_over {
                self.space.crossover(
                    &ranked[a].0,
                    &ranked[b].0,
                    self.config.cross_over_type,
                    &mut self.rng,
                )
            } else {
                ranked[a].0.clone()
            };

            next.push(self.space.mutate(&child, self.mutation_p, &mut self.rng));
        }
        next
    }

    /// Select a parent index from a best-first ranking.
    fn select_index(&mut self, ranked: &[(Individual, f64)]) -> usize {
        let n = ranked.len();
        match self.config.selection {
            SelectionMethod::Tournament { size } => (0..size.max(1))
                .map(|_| self.rng.gen_range(0..n))
                .min()
                .unwrap_or(0),
            SelectionMethod::RankBased => rank_select(n, &mut self.rng),
            SelectionMethod::RouletteWheel => {
                let objective = self.config.objective;
                roulette_select(ranked, objective, &mut self.rng)
                    .unwrap_or_else(|| rank_select(n, &mut self.rng))
            }
        }
    }

    fn record_history(&mut self, slot_fitness: Vec<f64>, stats: &GenerationStats) {
        let n = slot_fitness.len().max(1) as f64;
        let variance = slot_fitness
            .iter()
            .map(|f| (f - stats.mean).powi(2))
            .sum::<f64>()
            / n;

        let best = self
            .best_fitness()
            .unwrap_or_else(|| self.config.objective.worst());
        let population = self.ledger.fitness_values();

        self.history.generation_fitness.push(slot_fitness);
        self.history.population_fitness.push(population);
        self.history.best_fitness.push(best);
        self.history.mean_fitness.push(stats.mean);
        self.history.fitness_std.push(variance.sqrt());
        self.history.n_diff.push(stats.n_diff);
    }
}

/// Rank-proportional draw: index `i` of `n` has weight `n - i`.
fn rank_select<R: Rng + ?Sized>(n: usize, rng: &mut R) -> usize {
    let total_rank: usize = n * (n + 1) / 2;
    let mut target = rng.gen_range(0..total_rank);
    for i in 0..n {
        let rank = n - i;
        if target < rank {
            return i;
        }
        target -= rank;
    }
    0
}

/// Fitness-proportionate draw after shifting the worst entry to zero weight.
///
/// Returns `None` when the weights are degenerate.
fn roulette_select<R: Rng + ?Sized>(
    ranked: &[(Individual, f64)],
    objective: Objective,
    rng: &mut R,
) -> Option<usize> {
    let scores: Vec<f64> = ranked.iter().map(|(_, f)| objective.score(*f)).collect();
    let floor = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let total: f64 = scores.iter().map(|s| s - floor).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let target = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, score) in scores.iter().enumerate() {
        cumulative += score - floor;
        if cumulative > target {
            return Some(i);
        }
    }
    Some(scores.len() - 1)
}

fn summarize(slot_fitness: &[f64], elite_fitness: Vec<f64>, n_diff: usize) -> GenerationStats {
    let n = slot_fitness.len().max(1) as f64;
    GenerationStats {
        elite_fitness,
        mean: slot_fitness.iter().sum::<f64>() / n,
        max: slot_fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: slot_fitness.iter().copied().fold(f64::INFINITY, f64::min),
        n_diff,
    }
}
