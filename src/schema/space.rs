//! Search space topology types: cell variants, operations and per-node alphabets.

use serde::{Deserialize, Serialize};

/// Number of independent cell templates in the searched network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SearchSpaceType {
    /// One cell template shared by every block.
    #[default]
    SingleCell,
    /// Separate normal and reduction cells.
    DualCell,
    /// Three independent cell templates.
    TripleCell,
}

impl SearchSpaceType {
    /// Map the `n_block_type` config value (1-based) to a variant.
    pub fn from_block_types(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::SingleCell),
            2 => Some(Self::DualCell),
            3 => Some(Self::TripleCell),
            _ => None,
        }
    }

    /// Number of cell templates.
    #[inline]
    pub fn cell_count(self) -> usize {
        match self {
            Self::SingleCell => 1,
            Self::DualCell => 2,
            Self::TripleCell => 3,
        }
    }

    /// Display name of a cell template.
    pub fn cell_name(self, cell: usize) -> &'static str {
        match (self, cell) {
            (Self::SingleCell, _) => "cell",
            (Self::DualCell, 0) => "normal",
            (Self::DualCell, _) => "reduction",
            (Self::TripleCell, 0) => "normal",
            (Self::TripleCell, 1) => "reduction",
            (Self::TripleCell, _) => "auxiliary",
        }
    }
}

/// Candidate operation applied to a node input.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[repr(u8)]
pub enum Operation {
    /// Depthwise-separable 3x3 convolution.
    Dw3x3 = 0,
    /// Skip connection.
    Identity = 1,
    /// Depthwise-separable 5x5 convolution.
    Dw5x5 = 2,
    /// 3x3 average pooling.
    Avg3x3 = 3,
    /// 3x3 max pooling.
    Max3x3 = 4,
}

impl Operation {
    /// Every operation in tag order.
    pub const ALL: [Operation; 5] = [
        Operation::Dw3x3,
        Operation::Identity,
        Operation::Dw5x5,
        Operation::Avg3x3,
        Operation::Max3x3,
    ];

    /// Stable numeric tag used by persisted tokens.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    /// Short label used in renderings.
    pub fn label(self) -> &'static str {
        match self {
            Operation::Dw3x3 => "dw3x3",
            Operation::Identity => "identity",
            Operation::Dw5x5 => "dw5x5",
            Operation::Avg3x3 => "avg3x3",
            Operation::Max3x3 => "max3x3",
        }
    }
}

/// Legal gene alphabet of one node in a cell template.
///
/// Each node combines two inputs, each passed through one operation. Input
/// index 0 and 1 are the cell inputs; index `k + 2` is the output of node `k`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Predecessor indices this node may read from.
    pub inputs: Vec<u8>,
    /// Operations this node may apply.
    pub ops: Vec<Operation>,
}

impl NodeConfig {
    /// ENAS-style node at position `index`: may read any earlier tensor.
    pub fn enas(index: usize, ops: &[Operation]) -> Self {
        Self {
            inputs: (0..(index + 2) as u8).collect(),
            ops: ops.to_vec(),
        }
    }

    #[inline]
    pub fn allows_input(&self, input: u8) -> bool {
        self.inputs.contains(&input)
    }

    #[inline]
    pub fn allows_op(&self, op: Operation) -> bool {
        self.ops.contains(&op)
    }
}

/// Sampling bias toward skip/shallow choices.
///
/// While disabled, genes are drawn uniformly. Once enabled, each operation
/// gene becomes `Identity` with probability `1 - keep_prob` and each input
/// gene is drawn from the cell inputs with probability `1 - keep_prob`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DropPathControl {
    /// Probability of keeping the uniform draw once enabled.
    pub keep_prob: f64,
    /// Whether the bias is currently active.
    #[serde(default)]
    pub enabled: bool,
}

impl DropPathControl {
    pub fn new(keep_prob: f64) -> Self {
        Self {
            keep_prob,
            enabled: false,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Probability of forcing a skip/shallow choice for one gene.
    #[inline]
    pub fn drop_prob(&self) -> f64 {
        if self.enabled {
            (1.0 - self.keep_prob).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for DropPathControl {
    fn default() -> Self {
        Self::new(1.0)
    }
}
