//! Per-block DAG construction and regeneration.
//!
//! Local value numbering: every distinct computed value gets one node.
//! Integer-literal pairs fold into constant nodes; a binary operation
//! whose `(op, left, right)` already exists reuses the node (scanning
//! latest first, since label reassignment can re-home earlier nodes).
//!
//! Labels obey a priority order - constant over user variable over
//! temporary (prefix `T` or `$`) - with exactly one main label per node.
//! When a name is assigned a new value it is removed from every other
//! node first, so stale aliases cannot survive a reassignment.
//!
//! Side-effecting and control operations (`para`, `call`, `ret`, `sys`,
//! jumps, function entries) become non-combinable nodes in creation
//! order and are re-emitted with their operands' current main labels.

use cmmc_ir::{Op, Operand, Quad, QuadList};

use crate::block::BasicBlock;

/// Label priority: constant over user variable over temporary.
fn label_priority(label: &Operand) -> u8 {
    if label.is_literal() {
        2
    } else if label.is_temp() {
        0
    } else {
        1
    }
}

fn is_user_var(label: &Operand) -> bool {
    matches!(label, Operand::Name(_)) && !label.is_temp()
}

/// One DAG node.
#[derive(Clone, Debug)]
struct DagNode {
    /// `None` marks a leaf.
    op: Option<Op>,
    /// The main label; `None` only for result-less special nodes.
    main: Option<Operand>,
    extras: Vec<Operand>,
    left: Option<usize>,
    right: Option<usize>,
    is_const: bool,
    /// Original jump target for jump nodes.
    target: Option<usize>,
    /// Callee operand for call nodes.
    callee: Option<Operand>,
}

impl DagNode {
    fn leaf(value: Operand) -> Self {
        DagNode {
            op: None,
            main: Some(value),
            extras: Vec::new(),
            left: None,
            right: None,
            is_const: value.is_literal(),
            target: None,
            callee: None,
        }
    }
}

/// The per-block DAG.
pub struct BlockDag {
    nodes: Vec<DagNode>,
}

impl BlockDag {
    /// Builds the DAG for one block.
    pub fn build(block: &BasicBlock) -> Self {
        let mut dag = BlockDag { nodes: Vec::new() };
        for quad in &block.quads {
            dag.absorb(quad);
        }
        dag
    }

    /// Finds the node a label currently resolves to, scanning latest
    /// first.
    fn resolve(&self, label: &Operand) -> Option<usize> {
        for (id, node) in self.nodes.iter().enumerate().rev() {
            if node.main.as_ref() == Some(label) || node.extras.contains(label) {
                return Some(id);
            }
        }
        None
    }

    /// The node holding a value, created as a leaf on demand.
    fn get_or_add(&mut self, value: Operand) -> usize {
        if let Some(id) = self.resolve(&value) {
            return id;
        }
        self.nodes.push(DagNode::leaf(value));
        self.nodes.len() - 1
    }

    /// Removes a label from every node. If it was a main label, the
    /// highest-priority extra is promoted; with no extras the stale main
    /// stays (regeneration order makes the later overwrite land after the
    /// last read).
    fn remove_label(&mut self, label: &Operand) {
        for node in &mut self.nodes {
            node.extras.retain(|l| l != label);
            if node.main.as_ref() == Some(label) && !node.extras.is_empty() {
                let best = node
                    .extras
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, l)| label_priority(l))
                    .map(|(i, _)| i)
                    .unwrap();
                node.main = Some(node.extras.remove(best));
            }
        }
    }

    /// Binds `label` to a node, demoting the current main label when the
    /// newcomer has higher priority.
    fn attach(&mut self, label: Operand, id: usize) {
        self.remove_label(&label);
        let node = &mut self.nodes[id];
        match &node.main {
            Some(main) if label_priority(&label) > label_priority(main) => {
                let old = node.main.replace(label).unwrap();
                node.extras.push(old);
            },
            Some(_) => node.extras.push(label),
            None => node.main = Some(label),
        }
    }

    /// Latest-first search for an existing `(op, left, right)` node.
    fn find_existing(&self, op: Op, left: usize, right: Option<usize>) -> Option<usize> {
        for (id, node) in self.nodes.iter().enumerate().rev() {
            if node.op == Some(op) && node.left == Some(left) && node.right == right {
                return Some(id);
            }
        }
        None
    }

    /// Incorporates one quadruple.
    fn absorb(&mut self, quad: &Quad) {
        let op = quad.op;
        match op {
            Op::Assign => {
                let src = quad.arg1.unwrap_or(Operand::Int(0));
                let id = self.get_or_add(src);
                if let Some(dst) = quad.result {
                    self.attach(dst, id);
                }
            },
            _ if op.is_foldable_binary() => {
                let a = quad.arg1.unwrap_or(Operand::Int(0));
                let b = quad.arg2.unwrap_or(Operand::Int(0));
                let left = self.get_or_add(a);
                let right = self.get_or_add(b);

                let folded = match (self.nodes[left].main, self.nodes[right].main) {
                    (Some(Operand::Int(x)), Some(Operand::Int(y)))
                        if self.nodes[left].is_const && self.nodes[right].is_const =>
                    {
                        Some(fold_int(op, x, y))
                    },
                    _ => None,
                };

                if let Some(value) = folded {
                    let id = self.get_or_add(Operand::Int(value));
                    if let Some(dst) = quad.result {
                        self.attach(dst, id);
                    }
                    return;
                }

                if let Some(existing) = self.find_existing(op, left, Some(right)) {
                    if let Some(dst) = quad.result {
                        self.attach(dst, existing);
                    }
                    return;
                }

                if let Some(dst) = quad.result {
                    self.remove_label(&dst);
                }
                self.nodes.push(DagNode {
                    op: Some(op),
                    main: quad.result,
                    extras: Vec::new(),
                    left: Some(left),
                    right: Some(right),
                    is_const: false,
                    target: None,
                    callee: None,
                });
            },
            Op::Neg | Op::Not | Op::Pos => {
                let a = quad.arg1.unwrap_or(Operand::Int(0));
                let left = self.get_or_add(a);
                if let Some(existing) = self.find_existing(op, left, None) {
                    if let Some(dst) = quad.result {
                        self.attach(dst, existing);
                    }
                    return;
                }
                if let Some(dst) = quad.result {
                    self.remove_label(&dst);
                }
                self.nodes.push(DagNode {
                    op: Some(op),
                    main: quad.result,
                    extras: Vec::new(),
                    left: Some(left),
                    right: None,
                    is_const: false,
                    target: None,
                    callee: None,
                });
            },
            _ => self.absorb_special(quad),
        }
    }

    /// `para`, `call`, `ret`, `sys`, jumps and entry labels: kept in
    /// order, never merged.
    fn absorb_special(&mut self, quad: &Quad) {
        let op = quad.op;
        let (left, right, callee) = match op {
            Op::Para | Op::Ret | Op::Jz | Op::Jnz => {
                let left = quad.arg1.map(|a| self.get_or_add(a));
                (left, None, None)
            },
            Op::Jlt | Op::Jle | Op::Jgt | Op::Jge | Op::Jeq | Op::Jne => {
                let left = quad.arg1.map(|a| self.get_or_add(a));
                let right = quad.arg2.map(|b| self.get_or_add(b));
                (left, right, None)
            },
            Op::Call => (None, None, quad.arg1),
            _ => (None, None, None),
        };

        // A call result is a fresh value; its name must stop aliasing
        // anything older.
        if op == Op::Call {
            if let Some(dst) = quad.result {
                self.remove_label(&dst);
            }
        }

        let target = quad.result.and_then(|r| r.as_target());
        let main = match op {
            Op::Call => quad.result,
            _ => None,
        };
        self.nodes.push(DagNode {
            op: Some(op),
            main,
            extras: Vec::new(),
            left,
            right,
            is_const: false,
            target,
            callee,
        });
    }

    /// The main label of a node, for operand positions.
    fn label_of(&self, id: usize) -> Operand {
        self.nodes[id].main.unwrap_or(Operand::Int(0))
    }

    /// Regenerates the block into `out`, in node-creation order. Jump
    /// targets keep their original ids; the caller remaps them once every
    /// block has been regenerated.
    pub fn regenerate(&self, out: &mut QuadList) {
        for node in &self.nodes {
            match node.op {
                None => {
                    // A leaf: materialize aliases for user variables.
                    let main = node.main.unwrap_or(Operand::Int(0));
                    for extra in &node.extras {
                        if is_user_var(extra) {
                            out.add(Op::Assign, Some(main), None, Some(*extra));
                        }
                    }
                },
                Some(op) => match op {
                    Op::Para => {
                        let a = node.left.map(|l| self.label_of(l));
                        out.add(Op::Para, a, None, None);
                    },
                    Op::Call => {
                        out.add(Op::Call, node.callee, None, node.main);
                    },
                    Op::Ret => {
                        let a = node.left.map(|l| self.label_of(l));
                        out.add(Op::Ret, a, None, None);
                    },
                    Op::Sys => {
                        out.add(Op::Sys, None, None, None);
                    },
                    Op::Entry(name) => {
                        out.add(Op::Entry(name), None, None, None);
                    },
                    Op::Jmp => {
                        out.add(Op::Jmp, None, None, node.target.map(Operand::Target));
                    },
                    Op::Jz | Op::Jnz => {
                        let a = node.left.map(|l| self.label_of(l));
                        out.add(op, a, None, node.target.map(Operand::Target));
                    },
                    Op::Jlt | Op::Jle | Op::Jgt | Op::Jge | Op::Jeq | Op::Jne => {
                        let a = node.left.map(|l| self.label_of(l));
                        let b = node.right.map(|r| self.label_of(r));
                        out.add(op, a, b, node.target.map(Operand::Target));
                    },
                    Op::Neg | Op::Not | Op::Pos => {
                        let a = node.left.map(|l| self.label_of(l));
                        out.add(op, a, None, node.main);
                        self.materialize_extras(node, out);
                    },
                    _ => {
                        let a = node.left.map(|l| self.label_of(l));
                        let b = node.right.map(|r| self.label_of(r));
                        out.add(op, a, b, node.main);
                        self.materialize_extras(node, out);
                    },
                },
            }
        }
    }

    /// Aliases of an operation node: user-variable extras still need
    /// their stores.
    fn materialize_extras(&self, node: &DagNode, out: &mut QuadList) {
        let Some(main) = node.main else { return };
        for extra in &node.extras {
            if is_user_var(extra) {
                out.add(Op::Assign, Some(main), None, Some(*extra));
            }
        }
    }
}

/// Integer constant folding. Division and modulus by zero fold to zero;
/// the analyzer has already reported those.
fn fold_int(op: Op, x: i64, y: i64) -> i64 {
    match op {
        Op::Add => x.wrapping_add(y),
        Op::Sub => x.wrapping_sub(y),
        Op::Mul => x.wrapping_mul(y),
        Op::Div => x.checked_div(y).unwrap_or(0),
        Op::Mod => x.checked_rem(y).unwrap_or(0),
        Op::And => ((x != 0) && (y != 0)) as i64,
        Op::Or => ((x != 0) || (y != 0)) as i64,
        Op::Lt => (x < y) as i64,
        Op::Le => (x <= y) as i64,
        Op::Gt => (x > y) as i64,
        Op::Ge => (x >= y) as i64,
        Op::Eq => (x == y) as i64,
        Op::Ne => (x != y) as i64,
        _ => 0,
    }
}
