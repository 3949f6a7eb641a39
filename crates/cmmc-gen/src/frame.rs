//! Per-function stack-frame layout.
//!
//! Formal parameters live above the saved base pointer: `ss:[bp+4]`,
//! `ss:[bp+6]`, … in declared order (`bp+0` is the saved BP, `bp+2` the
//! return address). Locals and temporaries grow downward from
//! `ss:[bp-2]` in order of first use. Names that are never referenced get
//! no slot. The frame size handed to `SUB SP` counts two bytes for every
//! assigned slot, parameters included.

use cmmc_ir::{Op, Operand, QuadList};
use cmmc_sem::{Scope, SymbolTable};
use cmmc_util::Symbol;
use indexmap::IndexMap;

/// Addressing-mode strings for one function's names.
#[derive(Debug, Default)]
pub struct FrameLayout {
    slots: IndexMap<Symbol, String>,
    param_count: usize,
    temp_count: usize,
    /// Bytes reserved by the prologue's `SUB SP`.
    pub size: i32,
}

impl FrameLayout {
    /// The addressing mode of a name, if it has a slot.
    pub fn address_of(&self, name: Symbol) -> Option<&str> {
        self.slots.get(&name).map(|s| s.as_str())
    }

    fn assign_param(&mut self, name: Symbol) {
        let addr = format!("ss:[bp+{}]", 4 + self.param_count * 2);
        self.slots.insert(name, addr);
        self.param_count += 1;
        self.size += 2;
    }

    fn assign_local(&mut self, name: Symbol) {
        let addr = format!("ss:[bp-{}]", 2 + self.temp_count * 2);
        self.slots.insert(name, addr);
        self.temp_count += 1;
        self.size += 2;
    }
}

/// Computes the frame for the function whose entry quadruple sits at
/// `entry_id`, scanning forward to the next function entry.
pub fn build_frame(
    quads: &QuadList,
    entry_id: usize,
    table: &SymbolTable,
    func: Symbol,
) -> FrameLayout {
    let mut frame = FrameLayout::default();

    // Formals first, in declared order.
    if let Some(info) = table.find_function(func) {
        for &param in &info.param_names {
            frame.assign_param(param);
        }
    }

    let scope = Scope::Func(func);
    let mut consider = |frame: &mut FrameLayout, operand: &Option<Operand>| {
        let Some(Operand::Name(name)) = operand else { return };
        if frame.address_of(*name).is_some() {
            return;
        }
        // Globals stay in the data segment.
        let is_global = table
            .find_variable(Scope::Global, *name)
            .map(|i| i.scope == Scope::Global)
            .unwrap_or(false)
            || table
                .find_constant(Scope::Global, *name)
                .map(|i| i.scope == Scope::Global)
                .unwrap_or(false);
        if is_global {
            return;
        }
        // Formals that somehow escaped the declared list.
        let is_param = table
            .find_variable(scope, *name)
            .map(|i| i.is_param)
            .unwrap_or(false);
        if is_param {
            frame.assign_param(*name);
        } else {
            frame.assign_local(*name);
        }
    };

    for id in entry_id + 1..quads.len() {
        let quad = quads.get(id);
        if matches!(quad.op, Op::Entry(_)) {
            break;
        }
        // A call's first operand is the callee, not a datum.
        if quad.op != Op::Call {
            consider(&mut frame, &quad.arg1);
        }
        consider(&mut frame, &quad.arg2);
        consider(&mut frame, &quad.result);
    }

    frame
}
