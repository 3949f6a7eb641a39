//! cmmc-gen - Target-code emitter.
//!
//! Lowers a quadruple list plus its symbol table to 16-bit 8086-style
//! assembly: `ds` holds the globals (and `main`'s locals), `ss` the stack
//! frames of called functions, `es` the intermediate temporaries of
//! `main`. The emitter is a straight dispatch over the quadruple
//! operators; frame layout for a function is computed when its entry
//! quadruple is encountered.
//!
//! Problems (a name with no address) are reported into the caller's
//! [`Handler`]; emission continues with a placeholder operand so the rest
//! of the program still renders.

mod asm;
pub mod frame;

pub use asm::Emitter;
pub use frame::{build_frame, FrameLayout};

use cmmc_ir::QuadList;
use cmmc_sem::SymbolTable;
use cmmc_util::Handler;

/// Emits assembly for a quadruple list.
pub fn emit(quads: &QuadList, table: &SymbolTable, handler: &Handler) -> String {
    Emitter::new(quads, table, handler).run()
}
