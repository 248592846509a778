//! Population ledger: bounded best-fitness-per-genotype archive.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::schema::{Individual, Objective};

#[derive(Debug, Clone, Copy)]
struct Record {
    fitness: f64,
    /// Insertion sequence, used to break fitness ties.
    seq: u64,
}

/// Best fitness ever observed for each distinct genotype.
///
/// Ranking is by fitness under the configured objective, with ties going to
/// the entry inserted first. Ranking never depends on hash order, so eviction
/// and selection are reproducible for a fixed seed.
#[derive(Debug, Clone)]
pub struct PopulationLedger {
    entries: HashMap<Individual, Record>,
    capacity: usize,
    objective: Objective,
    next_seq: u64,
}

impl PopulationLedger {
    /// Create an empty ledger holding at most `capacity` genotypes.
    pub fn new(capacity: usize, objective: Objective) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            capacity,
            objective,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Best recorded fitness of a genotype.
    pub fn get(&self, individual: &Individual) -> Option<f64> {
        self.entries.get(individual).map(|r| r.fitness)
    }

    pub fn contains(&self, individual: &Individual) -> bool {
        self.entries.contains_key(individual)
    }

    /// Record an observation, keeping the better fitness for known genotypes.
    ///
    /// Returns `true` if the genotype was not in the ledger before.
    pub fn merge(&mut self, individual: Individual, fitness: f64) -> bool {
        let objective = self.objective;
        match self.entries.get_mut(&individual) {
            Some(record) => {
                record.fitness = objective.best_of(record.fitness, fitness);
                false
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.entries.insert(individual, Record { fitness, seq });
                true
            }
        }
    }

    /// Evict the worst entries until the ledger fits its capacity.
    ///
    /// Returns the evicted genotypes, worst last.
    pub fn truncate(&mut self) -> Vec<Individual> {
        if self.entries.len() <= self.capacity {
            return Vec::new();
        }

        let excess = self.entries.len() - self.capacity;
        let evicted: Vec<Individual> = self
            .ranked()
            .into_iter()
            .skip(self.capacity)
            .map(|(ind, _)| ind.clone())
            .collect();
        debug_assert_eq!(evicted.len(), excess);

        for individual in &evicted {
            self.entries.remove(individual);
        }
        evicted
    }

    /// Every entry, best first.
    pub fn ranked(&self) -> Vec<(&Individual, f64)> {
        let objective = self.objective;
        let mut entries: Vec<(&Individual, &Record)> = self.entries.iter().collect();
        entries.sort_by(|a, b| rank_order(objective, a.1, b.1));
        entries
            .into_iter()
            .map(|(ind, record)| (ind, record.fitness))
            .collect()
    }

    /// The `k` best entries, best first.
    pub fn top(&self, k: usize) -> Vec<(&Individual, f64)> {
        let mut ranked = self.ranked();
        ranked.truncate(k);
        ranked
    }

    /// The best entry.
    pub fn best(&self) -> Option<(&Individual, f64)> {
        let objective = self.objective;
        self.entries
            .iter()
            .min_by(|a, b| rank_order(objective, a.1, b.1))
            .map(|(ind, record)| (ind, record.fitness))
    }

    /// Fitness of every entry, best first.
    pub fn fitness_values(&self) -> Vec<f64> {
        self.ranked().into_iter().map(|(_, f)| f).collect()
    }
}

/// Better fitness first; ties go to the older entry.
fn rank_order(objective: Objective, a: &Record, b: &Record) -> Ordering {
    objective
        .score(b.fitness)
        .total_cmp(&objective.score(a.fitness))
        .then(a.seq.cmp(&b.seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NodeGene, Operation};

    fn ind(tag: u8) -> Individual {
        Individual::from_cells(vec![vec![NodeGene {
            inputs: [tag % 2, (tag / 2) % 2],
            ops: [
                Operation::from_tag(tag % 5).unwrap(),
                Operation::from_tag((tag / 5) % 5).unwrap(),
            ],
        }]])
    }

    #[test]
    fn test_merge_keeps_best() {
        let mut ledger = PopulationLedger::new(10, Objective::Maximize);
        assert!(ledger.merge(ind(1), 0.4));
        assert!(!ledger.merge(ind(1), 0.9));
        assert!(!ledger.merge(ind(1), 0.2));
        assert_eq!(ledger.get(&ind(1)), Some(0.9));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_merge_minimize() {
        let mut ledger = PopulationLedger::new(10, Objective::Minimize);
        ledger.merge(ind(1), 0.4);
        ledger.merge(ind(1), 0.9);
        assert_eq!(ledger.get(&ind(1)), Some(0.4));
    }

    #[test]
    fn test_truncate_evicts_worst() {
        let mut ledger = PopulationLedger::new(2, Objective::Maximize);
        ledger.merge(ind(1), 0.3);
        ledger.merge(ind(2), 0.5);
        ledger.merge(ind(3), 0.7);

        let evicted = ledger.truncate();
        assert_eq!(evicted, vec![ind(1)]);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&ind(3)));
    }

    #[test]
    fn test_ties_favor_older_entries() {
        let mut ledger = PopulationLedger::new(2, Objective::Maximize);
        ledger.merge(ind(4), 0.5);
        ledger.merge(ind(2), 0.5);
        ledger.merge(ind(3), 0.5);

        ledger.truncate();
        assert!(ledger.contains(&ind(4)));
        assert!(ledger.contains(&ind(2)));
        assert!(!ledger.contains(&ind(3)));
        assert_eq!(ledger.best().unwrap().0, &ind(4));
    }

    #[test]
    fn test_top_n() {
        let mut ledger = PopulationLedger::new(10, Objective::Maximize);
        ledger.merge(ind(1), 0.3);
        ledger.merge(ind(2), 0.7);
        ledger.merge(ind(3), 0.5);

        let top2 = ledger.top(2);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].0, &ind(2));
        assert_eq!(top2[1].0, &ind(3));
        assert_eq!(ledger.fitness_values(), vec![0.7, 0.5, 0.3]);
    }
}
