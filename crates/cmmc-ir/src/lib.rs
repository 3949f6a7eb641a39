//! cmmc-ir - The quadruple intermediate representation.
//!
//! A quadruple is a three-address instruction `(id, op, arg1, arg2,
//! result)`. The analyzer emits an append-only [`QuadList`]; the DAG
//! optimizer rewrites one list into another; the code emitter lowers a
//! list to assembly. The `id` of a quadruple always equals its index in
//! the list, which is what makes jump targets (plain indices) and
//! backpatching (writing a target into an already-emitted quadruple) work.
//!
//! Operands are a tagged sum ([`Operand`]) instead of stringly-typed
//! fields: integer, float and character literals, interned names (variables
//! and temporaries), and jump-target ids. Absent fields render as `<nil>`
//! in dumps.

mod quad;

pub use quad::{Op, Operand, Quad, QuadList};
