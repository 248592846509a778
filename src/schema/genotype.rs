//! Genotype representation and its persisted token form.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Operation, SearchSpaceType};

/// Current token format version.
pub const TOKEN_VERSION: u32 = 1;

/// Gene choices of one node: two predecessors, each with an operation.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct NodeGene {
    /// Predecessor indices (0 and 1 are the cell inputs).
    pub inputs: [u8; 2],
    /// Operation applied to each input.
    pub ops: [Operation; 2],
}

impl NodeGene {
    /// Number of genes carried by one node.
    pub const GENES: usize = 4;

    /// Flat gene tags in `[input_a, input_b, op_a, op_b]` order.
    #[inline]
    pub fn tags(&self) -> [u8; 4] {
        [
            self.inputs[0],
            self.inputs[1],
            self.ops[0].tag(),
            self.ops[1].tag(),
        ]
    }
}

/// One concrete architecture: a node gene per node, per cell template.
///
/// Individuals are immutable once built; variation operators return new
/// values. Equality and hashing are structural, so duplicates collapse in
/// the population ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Individual {
    cells: Vec<Vec<NodeGene>>,
}

impl Individual {
    /// Build from raw cells without checking them against a search space.
    ///
    /// Use `SearchSpace::validate` before handing the result to a network.
    pub fn from_cells(cells: Vec<Vec<NodeGene>>) -> Self {
        Self { cells }
    }

    /// Node genes of every cell template.
    pub fn cells(&self) -> &[Vec<NodeGene>] {
        &self.cells
    }

    /// Node genes of one cell template.
    pub fn cell(&self, cell: usize) -> Option<&[NodeGene]> {
        self.cells.get(cell).map(Vec::as_slice)
    }

    /// Total number of genes.
    pub fn gene_count(&self) -> usize {
        self.cells.iter().map(|c| c.len() * NodeGene::GENES).sum()
    }

    /// Flat gene tag sequence, cell by cell and node by node.
    pub fn gene_tags(&self) -> Vec<u8> {
        self.cells
            .iter()
            .flat_map(|cell| cell.iter().flat_map(|node| node.tags()))
            .collect()
    }

    /// Number of gene positions where two individuals differ.
    pub fn hamming_distance(&self, other: &Individual) -> usize {
        let a = self.gene_tags();
        let b = other.gene_tags();
        let common = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
        common + a.len().abs_diff(b.len())
    }

    /// Encode into the versioned persisted form.
    pub fn to_token(&self, space_type: SearchSpaceType) -> IndividualToken {
        IndividualToken {
            version: TOKEN_VERSION,
            space_type,
            n_nodes: self.cells.first().map_or(0, Vec::len),
            cells: self
                .cells
                .iter()
                .map(|cell| cell.iter().map(NodeGene::tags).collect())
                .collect(),
        }
    }
}

/// Versioned, search-space-tagged encoding of an individual.
///
/// Each node is stored as `[input_a, input_b, op_a_tag, op_b_tag]`.
/// Decoding (with alphabet validation) is done by `SearchSpace::decode`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndividualToken {
    /// Format version.
    pub version: u32,
    /// Topology the individual was found in.
    pub space_type: SearchSpaceType,
    /// Nodes per cell.
    pub n_nodes: usize,
    /// Gene tags per cell, per node.
    pub cells: Vec<Vec<[u8; 4]>>,
}

impl IndividualToken {
    /// Write the token as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EncodingError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a token from JSON. The genes are not validated here.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EncodingError> {
        let json = fs::read_to_string(path)?;
        let token: IndividualToken = serde_json::from_str(&json)?;
        if token.version != TOKEN_VERSION {
            return Err(EncodingError::UnsupportedVersion(token.version));
        }
        Ok(token)
    }
}

/// Errors raised when an externally supplied genotype cannot be accepted.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Unsupported token version {0}")]
    UnsupportedVersion(u32),
    #[error("Token was produced for {found:?}, search space is {expected:?}")]
    SpaceMismatch {
        expected: SearchSpaceType,
        found: SearchSpaceType,
    },
    #[error("Expected {expected} cells, found {found}")]
    CellCount { expected: usize, found: usize },
    #[error("Cell {cell}: expected {expected} nodes, found {found}")]
    NodeCount {
        cell: usize,
        expected: usize,
        found: usize,
    },
    #[error("Cell {cell} node {node}: input {value} is not a legal predecessor")]
    InvalidInput { cell: usize, node: usize, value: u8 },
    #[error("Cell {cell} node {node}: operation tag {value} is not allowed")]
    InvalidOperation { cell: usize, node: usize, value: u8 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
