//! Basic-block partitioning.
//!
//! Entry statements are: the first quadruple; any quadruple that is the
//! target of a jump; any quadruple immediately after a jump. A block runs
//! from an entry to the next entry, and a jump always terminates its
//! block.

use cmmc_ir::{Operand, Quad, QuadList};

/// A straight-line run of quadruples. The ids are the original ones.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    /// Original id of the first quadruple.
    pub start: usize,
    pub quads: Vec<Quad>,
}

/// Splits a quadruple list into basic blocks.
pub fn partition(quads: &QuadList) -> Vec<BasicBlock> {
    let len = quads.len();
    if len == 0 {
        return Vec::new();
    }

    let mut is_entry = vec![false; len];
    is_entry[0] = true;
    for quad in quads.iter() {
        if quad.op.is_jump() {
            if let Some(Operand::Target(target)) = quad.result {
                if target < len {
                    is_entry[target] = true;
                }
            }
            if quad.id + 1 < len {
                is_entry[quad.id + 1] = true;
            }
        }
    }

    let mut blocks = Vec::new();
    let mut current: Vec<Quad> = Vec::new();
    for quad in quads.iter() {
        if is_entry[quad.id] && !current.is_empty() {
            let start = current[0].id;
            blocks.push(BasicBlock {
                start,
                quads: std::mem::take(&mut current),
            });
        }
        let terminates = quad.op.is_jump();
        current.push(quad.clone());
        if terminates {
            let start = current[0].id;
            blocks.push(BasicBlock {
                start,
                quads: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        let start = current[0].id;
        blocks.push(BasicBlock {
            start,
            quads: current,
        });
    }
    blocks
}

/// A map from original quadruple id to the index of its block.
pub fn block_index(blocks: &[BasicBlock], total: usize) -> Vec<usize> {
    let mut index = vec![0; total];
    for (b, block) in blocks.iter().enumerate() {
        for quad in &block.quads {
            index[quad.id] = b;
        }
    }
    index
}

/// Renders the basic-block dump.
pub fn dump_blocks(blocks: &[BasicBlock]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        out.push_str(&format!("block {}:\n", i));
        for quad in &block.quads {
            out.push_str(&quad.to_string());
            out.push('\n');
        }
    }
    out
}
