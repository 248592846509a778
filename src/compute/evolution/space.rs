//! Search space: per-node gene alphabets plus sampling, mutation and crossover.

use rand::Rng;

use crate::schema::{
    ConfigError, CrossoverType, DropPathControl, EncodingError, Individual, IndividualToken,
    NodeConfig, NodeGene, Operation, SearchConfig, SearchSpaceType,
};

/// Operations offered by the ENAS convolutional cell.
pub const ENAS_CNN_OPERATIONS: [Operation; 5] = Operation::ALL;

/// The legal gene alphabet of every node of every cell template.
///
/// The space itself holds no random state. Every stochastic primitive takes
/// the caller's RNG so a seeded searcher stays reproducible.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    space_type: SearchSpaceType,
    cells: Vec<Vec<NodeConfig>>,
    drop_path: DropPathControl,
}

impl SearchSpace {
    /// ENAS convolutional search space with `n_nodes` nodes per cell.
    pub fn enas_cnn(
        n_nodes: usize,
        drop_path: DropPathControl,
        space_type: SearchSpaceType,
    ) -> Result<Self, ConfigError> {
        let cell: Vec<NodeConfig> = (0..n_nodes)
            .map(|i| NodeConfig::enas(i, &ENAS_CNN_OPERATIONS))
            .collect();
        let cells = vec![cell; space_type.cell_count()];
        Self::with_cells(space_type, cells, drop_path)
    }

    /// Build the space described by a search configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ConfigError> {
        Self::enas_cnn(
            config.n_nodes,
            DropPathControl::new(config.drop_path_keep_prob),
            config.space_type()?,
        )
    }

    /// Build from explicit node alphabets.
    pub fn with_cells(
        space_type: SearchSpaceType,
        cells: Vec<Vec<NodeConfig>>,
        drop_path: DropPathControl,
    ) -> Result<Self, ConfigError> {
        if cells.len() != space_type.cell_count() {
            return Err(ConfigError::InvalidBlockType(cells.len()));
        }
        for (c, cell) in cells.iter().enumerate() {
            if cell.is_empty() {
                return Err(ConfigError::NoNodes);
            }
            for (n, node) in cell.iter().enumerate() {
                if node.inputs.is_empty() || node.ops.is_empty() {
                    return Err(ConfigError::EmptyAlphabet { cell: c, node: n });
                }
                if node.inputs.iter().any(|&i| i as usize >= n + 2) {
                    return Err(ConfigError::ForwardInput { cell: c, node: n });
                }
            }
        }

        Ok(Self {
            space_type,
            cells,
            drop_path,
        })
    }

    pub fn space_type(&self) -> SearchSpaceType {
        self.space_type
    }

    /// Number of cell templates.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Nodes in the first cell template.
    pub fn node_count(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Total number of genes of an individual.
    pub fn gene_count(&self) -> usize {
        self.cells.iter().map(|c| c.len() * NodeGene::GENES).sum()
    }

    /// Node alphabets of one cell template.
    pub fn cell_config(&self, cell: usize) -> Option<&[NodeConfig]> {
        self.cells.get(cell).map(Vec::as_slice)
    }

    pub fn node_config(&self, cell: usize, node: usize) -> Option<&NodeConfig> {
        self.cells.get(cell).and_then(|c| c.get(node))
    }

    pub fn drop_path(&self) -> &DropPathControl {
        &self.drop_path
    }

    pub fn drop_path_mut(&mut self) -> &mut DropPathControl {
        &mut self.drop_path
    }

    /// Mutation rate that changes one gene per individual on average.
    pub fn default_mutation_p(&self) -> f64 {
        1.0 / self.gene_count().max(1) as f64
    }

    /// Draw one architecture, one gene per node position.
    pub fn sample_architecture<R: Rng + ?Sized>(&self, rng: &mut R) -> Individual {
        let cells = self
            .cells
            .iter()
            .map(|cell| {
                cell.iter()
                    .map(|node| NodeGene {
                        inputs: [self.sample_input(node, rng), self.sample_input(node, rng)],
                        ops: [self.sample_op(node, rng), self.sample_op(node, rng)],
                    })
                    .collect()
            })
            .collect();
        Individual::from_cells(cells)
    }

    /// Draw a predecessor, biased toward the cell inputs while drop-path is on.
    fn sample_input<R: Rng + ?Sized>(&self, node: &NodeConfig, rng: &mut R) -> u8 {
        let drop = self.drop_path.drop_prob();
        if drop > 0.0 && rng.gen_bool(drop) {
            let shallow: Vec<u8> = node.inputs.iter().copied().filter(|&i| i < 2).collect();
            if !shallow.is_empty() {
                return shallow[rng.gen_range(0..shallow.len())];
            }
        }
        node.inputs[rng.gen_range(0..node.inputs.len())]
    }

    /// Draw an operation, biased toward `Identity` while drop-path is on.
    fn sample_op<R: Rng + ?Sized>(&self, node: &NodeConfig, rng: &mut R) -> Operation {
        let drop = self.drop_path.drop_prob();
        if drop > 0.0 && rng.gen_bool(drop) && node.allows_op(Operation::Identity) {
            return Operation::Identity;
        }
        node.ops[rng.gen_range(0..node.ops.len())]
    }

    /// Resample each gene independently with probability `rate`.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        individual: &Individual,
        rate: f64,
        rng: &mut R,
    ) -> Individual {
        let cells = individual
            .cells()
            .iter()
            .zip(self.cells.iter())
            .map(|(genes, configs)| {
                genes
                    .iter()
                    .zip(configs.iter())
                    .map(|(gene, node)| {
                        let mut gene = *gene;
                        for slot in 0..2 {
                            if rng.r#gen::<f64>() < rate {
                                gene.inputs[slot] = self.sample_input(node, rng);
                            }
                        }
                        for slot in 0..2 {
                            if rng.r#gen::<f64>() < rate {
                                gene.ops[slot] = self.sample_op(node, rng);
                            }
                        }
                        gene
                    })
                    .collect()
            })
            .collect();
        Individual::from_cells(cells)
    }

    /// Recombine two parents drawn from this space.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        a: &Individual,
        b: &Individual,
        kind: CrossoverType,
        rng: &mut R,
    ) -> Individual {
        let cut = match kind {
            CrossoverType::SinglePoint => rng.gen_range(0..=self.gene_count()),
            _ => 0,
        };

        let mut position = 0usize;
        let cells = a
            .cells()
            .iter()
            .zip(b.cells().iter())
            .map(|(cell_a, cell_b)| {
                cell_a
                    .iter()
                    .zip(cell_b.iter())
                    .map(|(ga, gb)| {
                        let child = match kind {
                            CrossoverType::Uniform => NodeGene {
                                inputs: [
                                    pick(ga.inputs[0], gb.inputs[0], rng),
                                    pick(ga.inputs[1], gb.inputs[1], rng),
                                ],
                                ops: [
                                    pick(ga.ops[0], gb.ops[0], rng),
                                    pick(ga.ops[1], gb.ops[1], rng),
                                ],
                            },
                            CrossoverType::Node => pick(*ga, *gb, rng),
                            CrossoverType::SinglePoint => {
                                let from_a = |offset: usize| position + offset < cut;
                                NodeGene {
                                    inputs: [
                                        if from_a(0) { ga.inputs[0] } else { gb.inputs[0] },
                                        if from_a(1) { ga.inputs[1] } else { gb.inputs[1] },
                                    ],
                                    ops: [
                                        if from_a(2) { ga.ops[0] } else { gb.ops[0] },
                                        if from_a(3) { ga.ops[1] } else { gb.ops[1] },
                                    ],
                                }
                            }
                        };
                        position += NodeGene::GENES;
                        child
                    })
                    .collect()
            })
            .collect();
        Individual::from_cells(cells)
    }

    /// Check that every gene lies within its node's alphabet.
    pub fn validate(&self, individual: &Individual) -> Result<(), EncodingError> {
        if individual.cells().len() != self.cells.len() {
            return Err(EncodingError::CellCount {
                expected: self.cells.len(),
                found: individual.cells().len(),
            });
        }
        let pairs = individual.cells().iter().zip(self.cells.iter());
        for (c, (genes, configs)) in pairs.enumerate() {
            if genes.len() != configs.len() {
                return Err(EncodingError::NodeCount {
                    cell: c,
                    expected: configs.len(),
                    found: genes.len(),
                });
            }
            for (n, (gene, node)) in genes.iter().zip(configs.iter()).enumerate() {
                if let Some(&value) = gene.inputs.iter().find(|&&i| !node.allows_input(i)) {
                    return Err(EncodingError::InvalidInput { cell: c, node: n, value });
                }
                if let Some(op) = gene.ops.iter().find(|&&op| !node.allows_op(op)) {
                    return Err(EncodingError::InvalidOperation {
                        cell: c,
                        node: n,
                        value: op.tag(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Encode an individual of this space into its persisted token.
    pub fn encode(&self, individual: &Individual) -> IndividualToken {
        individual.to_token(self.space_type)
    }

    /// Decode and validate a persisted token.
    pub fn decode(&self, token: &IndividualToken) -> Result<Individual, EncodingError> {
        if token.version != crate::schema::TOKEN_VERSION {
            return Err(EncodingError::UnsupportedVersion(token.version));
        }
        if token.space_type != self.space_type {
            return Err(EncodingError::SpaceMismatch {
                expected: self.space_type,
                found: token.space_type,
            });
        }

        let mut cells = Vec::with_capacity(token.cells.len());
        for (c, cell) in token.cells.iter().enumerate() {
            let mut nodes = Vec::with_capacity(cell.len());
            for (n, tags) in cell.iter().enumerate() {
                let op = |value: u8| {
                    Operation::from_tag(value).ok_or(EncodingError::InvalidOperation {
                        cell: c,
                        node: n,
                        value,
                    })
                };
                nodes.push(NodeGene {
                    inputs: [tags[0], tags[1]],
                    ops: [op(tags[2])?, op(tags[3])?],
                });
            }
            cells.push(nodes);
        }

        let individual = Individual::from_cells(cells);
        self.validate(&individual)?;
        Ok(individual)
    }
}

#[inline]
fn pick<T, R: Rng + ?Sized>(a: T, b: T, rng: &mut R) -> T {
    if rng.gen_bool(0.5) { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn space(space_type: SearchSpaceType) -> SearchSpace {
        SearchSpace::enas_cnn(5, DropPathControl::default(), space_type).unwrap()
    }

    #[test]
    fn test_enas_layout() {
        let ss = space(SearchSpaceType::DualCell);
        assert_eq!(ss.cell_count(), 2);
        assert_eq!(ss.node_count(), 5);
        assert_eq!(ss.gene_count(), 40);
        assert_eq!(ss.node_config(0, 4).unwrap().inputs.len(), 6);
    }

    #[test]
    fn test_rejects_empty_alphabet() {
        let cells = vec![vec![NodeConfig {
            inputs: vec![0, 1],
            ops: vec![],
        }]];
        let err =
            SearchSpace::with_cells(SearchSpaceType::SingleCell, cells, DropPathControl::default())
                .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyAlphabet { cell: 0, node: 0 }));
    }

    #[test]
    fn test_sampled_individuals_are_valid() {
        let ss = space(SearchSpaceType::TripleCell);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let ind = ss.sample_architecture(&mut rng);
            assert!(ss.validate(&ind).is_ok());
        }
    }

    #[test]
    fn test_mutation_rate_bounds() {
        let ss = space(SearchSpaceType::SingleCell);
        let mut rng = StdRng::seed_from_u64(2);
        let ind = ss.sample_architecture(&mut rng);

        assert_eq!(ss.mutate(&ind, 0.0, &mut rng), ind);

        for _ in 0..50 {
            let mutated = ss.mutate(&ind, 1.0, &mut rng);
            assert!(ss.validate(&mutated).is_ok());
        }
    }

    #[test]
    fn test_crossover_inherits_parent_genes() {
        let ss = space(SearchSpaceType::DualCell);
        let mut rng = StdRng::seed_from_u64(3);
        let a = ss.sample_architecture(&mut rng);
        let b = ss.sample_architecture(&mut rng);

        for kind in [CrossoverType::Uniform, CrossoverType::Node, CrossoverType::SinglePoint] {
            let child = ss.crossover(&a, &b, kind, &mut rng);
            assert!(ss.validate(&child).is_ok());
            let (ta, tb, tc) = (a.gene_tags(), b.gene_tags(), child.gene_tags());
            for i in 0..tc.len() {
                assert!(tc[i] == ta[i] || tc[i] == tb[i]);
            }
        }
    }

    #[test]
    fn test_crossover_of_identical_parents() {
        let ss = space(SearchSpaceType::SingleCell);
        let mut rng = StdRng::seed_from_u64(4);
        let a = ss.sample_architecture(&mut rng);
        assert_eq!(ss.crossover(&a, &a, CrossoverType::Uniform, &mut rng), a);
    }

    #[test]
    fn test_drop_path_biases_toward_identity() {
        let mut ss = space(SearchSpaceType::SingleCell);
        ss.drop_path_mut().keep_prob = 0.0;
        ss.drop_path_mut().enable();

        let mut rng = StdRng::seed_from_u64(5);
        let ind = ss.sample_architecture(&mut rng);
        for node in ind.cells()[0].iter() {
            assert_eq!(node.ops, [Operation::Identity, Operation::Identity]);
            assert!(node.inputs.iter().all(|&i| i < 2));
        }
    }

    #[test]
    fn test_decode_rejects_out_of_alphabet() {
        let ss = space(SearchSpaceType::SingleCell);
        let mut rng = StdRng::seed_from_u64(6);
        let ind = ss.sample_architecture(&mut rng);

        let token = ss.encode(&ind);
        assert_eq!(ss.decode(&token).unwrap(), ind);

        let mut bad_input = token.clone();
        bad_input.cells[0][0][0] = 2;
        assert!(matches!(
            ss.decode(&bad_input),
            Err(EncodingError::InvalidInput { cell: 0, node: 0, value: 2 })
        ));

        let mut bad_op = token.clone();
        bad_op.cells[0][1][3] = 9;
        assert!(matches!(
            ss.decode(&bad_op),
            Err(EncodingError::InvalidOperation { cell: 0, node: 1, value: 9 })
        ));

        let mut wrong_space = token;
        wrong_space.space_type = SearchSpaceType::DualCell;
        assert!(matches!(
            ss.decode(&wrong_space),
            Err(EncodingError::SpaceMismatch { .. })
        ));
    }
}
