//! Text renderings of a genotype's selected sub-graph.

use std::fmt::Write;

use crate::compute::evolution::SearchSpace;
use crate::schema::{Individual, NodeGene};

/// Graphviz DOT description of every cell of an individual.
///
/// Cell inputs are `in0`/`in1`, node `k` is `nk`, and the cell output
/// concatenates every node no later node reads from.
pub fn to_dot(space: &SearchSpace, individual: &Individual) -> String {
    let space_type = space.space_type();
    let mut dot = String::from("digraph gnas {\n  rankdir=LR;\n");

    for (c, cell) in individual.cells().iter().enumerate() {
        let name = space_type.cell_name(c);
        let _ = writeln!(dot, "  subgraph cluster_{c} {{");
        let _ = writeln!(dot, "    label=\"{name}\";");
        let _ = writeln!(dot, "    c{c}_in0 [label=\"input 0\", shape=box];");
        let _ = writeln!(dot, "    c{c}_in1 [label=\"input 1\", shape=box];");

        for (k, node) in cell.iter().enumerate() {
            let _ = writeln!(dot, "    c{c}_n{k} [label=\"node {k}\"];");
            for (&input, op) in node.inputs.iter().zip(node.ops.iter()) {
                let _ = writeln!(
                    dot,
                    "    {} -> c{c}_n{k} [label=\"{}\"];",
                    tensor_id(c, input),
                    op.label()
                );
            }
        }

        let _ = writeln!(dot, "    c{c}_out [label=\"output\", shape=box];");
        for k in loose_ends(cell) {
            let _ = writeln!(dot, "    c{c}_n{k} -> c{c}_out;");
        }
        dot.push_str("  }\n");
    }

    dot.push_str("}\n");
    dot
}

/// One line per node: `cell/node: op(input) + op(input)`.
pub fn describe(space: &SearchSpace, individual: &Individual) -> String {
    let space_type = space.space_type();
    let mut out = String::new();
    for (c, cell) in individual.cells().iter().enumerate() {
        for (k, node) in cell.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}/{}: {}({}) + {}({})",
                space_type.cell_name(c),
                k,
                node.ops[0].label(),
                tensor_label(node.inputs[0]),
                node.ops[1].label(),
                tensor_label(node.inputs[1]),
            );
        }
    }
    out
}

/// Nodes whose output no later node consumes.
pub fn loose_ends(cell: &[NodeGene]) -> Vec<usize> {
    let mut used = vec![false; cell.len()];
    for node in cell {
        for &input in &node.inputs {
            if input >= 2 && ((input - 2) as usize) < cell.len() {
                used[(input - 2) as usize] = true;
            }
        }
    }
    (0..cell.len()).filter(|&k| !used[k]).collect()
}

fn tensor_id(cell: usize, input: u8) -> String {
    match input {
        0 | 1 => format!("c{cell}_in{input}"),
        k => format!("c{cell}_n{}", k - 2),
    }
}

fn tensor_label(input: u8) -> String {
    match input {
        0 | 1 => format!("in{input}"),
        k => format!("n{}", k - 2),
    }
}
