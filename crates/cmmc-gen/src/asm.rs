//! Quadruple-to-8086 lowering.
//!
//! The output is a DOS-style skeleton: a data segment with one word per
//! global, a code segment starting at `START:`, one labeled instruction
//! group per quadruple (`_N:`), and the `quit:` exit stub. Functions get
//! a `PUSH BP / MOV BP,SP / SUB SP,n` prologue sized by the frame layout;
//! `ret` restores `SP`/`BP` and returns.

use cmmc_ir::{Op, Operand, QuadList};
use cmmc_sem::{Scope, SymbolTable};
use cmmc_util::{Handler, Pos, Symbol};

use crate::frame::{build_frame, FrameLayout};

const ASM_HEAD: &str = "DATA SEGMENT\n";
const ASM_START: &str = "DATA ENDS\n\
                         CODE SEGMENT\n\
                         \tASSUME CS:CODE,DS:DATA\n\
                         START:\tMOV AX,DATA\n\
                         \tMOV DS,AX\n";
const ASM_END: &str = "CODE ENDS\n\tEND START\n";

/// The assembly emitter.
pub struct Emitter<'a> {
    quads: &'a QuadList,
    table: &'a SymbolTable,
    handler: &'a Handler,
    out: String,
    current_func: Symbol,
    frame: FrameLayout,
}

impl<'a> Emitter<'a> {
    pub fn new(quads: &'a QuadList, table: &'a SymbolTable, handler: &'a Handler) -> Self {
        Self {
            quads,
            table,
            handler,
            out: String::new(),
            current_func: Symbol::intern("main"),
            frame: FrameLayout::default(),
        }
    }

    /// Runs the emission phases and returns the assembly text.
    pub fn run(mut self) -> String {
        self.out.push_str(ASM_HEAD);
        self.emit_data_segment();
        self.out.push_str(ASM_START);
        for quad in self.quads.iter() {
            self.emit_quad(quad.id);
        }
        self.out.push_str(ASM_END);
        self.out
    }

    /// Reserves one word per global variable and constant. `main`'s
    /// locals are static words as well; only temporaries live in `es`.
    fn emit_data_segment(&mut self) {
        let main = Scope::Func(Symbol::intern("main"));
        for scope in [Scope::Global, main] {
            for info in self.table.variables_in(scope) {
                self.out.push_str(&format!("\t_{} dw 0\n", info.name));
            }
        }
        for scope in [Scope::Global, main] {
            for info in self.table.constants_in(scope) {
                let value = info.value.map(word_value).unwrap_or(0);
                self.out.push_str(&format!("\t_{} dw {}\n", info.name, value));
            }
        }
    }

    /// The assembly operand for a datum.
    fn address(&self, operand: &Operand) -> String {
        match operand {
            Operand::Int(n) => n.to_string(),
            Operand::Float(x) => (*x as i64).to_string(),
            Operand::Char(c) => (*c as u32).to_string(),
            Operand::Target(t) => t.to_string(),
            Operand::Name(name) => self.name_address(*name),
        }
    }

    fn name_address(&self, name: Symbol) -> String {
        let scope = Scope::Func(self.current_func);
        let in_tables = self.table.find_variable(scope, name).is_some()
            || self.table.find_constant(scope, name).is_some();

        if self.current_func.as_str() == "main" {
            // Temporaries go through the extra segment; everything else is
            // a data-segment word.
            if !in_tables && is_temp_name(name) {
                return format!("es:[{}]", 2 * temp_index(name));
            }
            return format!("ds:[_{}]", name);
        }

        let is_global = self
            .table
            .find_variable(Scope::Global, name)
            .map(|i| i.scope == Scope::Global)
            .unwrap_or(false)
            || self
                .table
                .find_constant(Scope::Global, name)
                .map(|i| i.scope == Scope::Global)
                .unwrap_or(false);
        if is_global {
            return format!("ds:[_{}]", name);
        }

        match self.frame.address_of(name) {
            Some(addr) => addr.to_string(),
            None => {
                self.handler.report_bare(
                    Pos::DUMMY,
                    format!("no frame slot for {} in {}", name, self.current_func),
                );
                "0".to_string()
            },
        }
    }

    /// The jump label for a target id, forwarding to `quit` when the
    /// target is the program terminator.
    fn jump_label(&self, target: usize) -> String {
        if target < self.quads.len() && self.quads.get(target).op == Op::Sys {
            "quit".to_string()
        } else {
            format!("_{}", target)
        }
    }

    fn emit_quad(&mut self, id: usize) {
        let quad = self.quads.get(id).clone();
        let a1 = quad.arg1.as_ref().map(|a| self.address(a)).unwrap_or_default();
        let a2 = quad.arg2.as_ref().map(|a| self.address(a)).unwrap_or_default();
        let res = quad.result.as_ref().map(|r| self.address(r)).unwrap_or_default();
        let i = id;

        match quad.op {
            Op::Entry(name) if name.as_str() == "main" => {},
            Op::Entry(name) => {
                self.current_func = name;
                self.frame = build_frame(self.quads, id, self.table, name);
                self.out.push_str(&format!(
                    "{}:\tPUSH BP\n\tMOV BP,SP\n\tSUB SP,{}\n",
                    name, self.frame.size
                ));
            },
            Op::Assign => {
                self.out
                    .push_str(&format!("_{}:\tMOV AX,{}\n\tMOV {},AX\n", i, a1, res));
            },
            Op::Pos => {
                // Unary identity.
                self.out
                    .push_str(&format!("_{}:\tMOV AX,{}\n\tMOV {},AX\n", i, a1, res));
            },
            Op::Add => {
                self.out.push_str(&format!(
                    "_{}:\tMOV AX,{}\n\tADD AX,{}\n\tMOV {},AX\n",
                    i, a1, a2, res
                ));
            },
            Op::Sub => {
                self.out.push_str(&format!(
                    "_{}:\tMOV AX,{}\n\tSUB AX,{}\n\tMOV {},AX\n",
                    i, a1, a2, res
                ));
            },
            Op::Neg => {
                // 0 - arg.
                self.out.push_str(&format!(
                    "_{}:\tMOV AX,0\n\tSUB AX,{}\n\tMOV {},AX\n",
                    i, a1, res
                ));
            },
            Op::Mul => {
                self.out.push_str(&format!(
                    "_{}:\tMOV AX,{}\n\tMOV BX,{}\n\tMUL BX\n\tMOV {},AX\n",
                    i, a1, a2, res
                ));
            },
            Op::Div => {
                self.out.push_str(&format!(
                    "_{}:\tMOV AX,{}\n\tMOV DX,0\n\tMOV BX,{}\n\tDIV BX\n\tMOV {},AX\n",
                    i, a1, a2, res
                ));
            },
            Op::Mod => {
                self.out.push_str(&format!(
                    "_{}:\tMOV AX,{}\n\tMOV DX,0\n\tMOV BX,{}\n\tDIV BX\n\tMOV {},DX\n",
                    i, a1, a2, res
                ));
            },
            Op::Lt => self.emit_compare(i, &a1, &a2, &res, "JL", "GT"),
            Op::Le => self.emit_compare(i, &a1, &a2, &res, "JLE", "LE"),
            Op::Gt => self.emit_compare(i, &a1, &a2, &res, "JG", "LT"),
            Op::Ge => self.emit_compare(i, &a1, &a2, &res, "JGE", "GE"),
            Op::Eq => self.emit_compare(i, &a1, &a2, &res, "JE", "EQ"),
            Op::Ne => self.emit_compare(i, &a1, &a2, &res, "JNE", "NE"),
            Op::And => {
                self.out.push_str(&format!(
                    "_{i}:\tMOV DX,0\n\tMOV AX,{a1}\n\tCMP AX,0\n\tJE _AND_{i}\n\
                     \tMOV AX,{a2}\n\tCMP AX,0\n\tJE _AND_{i}\n\tMOV DX,1\n\
                     _AND_{i}:\tMOV {res},DX\n"
                ));
            },
            Op::Or => {
                self.out.push_str(&format!(
                    "_{i}:\tMOV DX,1\n\tMOV AX,{a1}\n\tCMP AX,0\n\tJNE _OR_{i}\n\
                     \tMOV AX,{a2}\n\tCMP AX,0\n\tJNE _OR_{i}\n\tMOV DX,0\n\
                     _OR_{i}:\tMOV {res},DX\n"
                ));
            },
            Op::Not => {
                self.out.push_str(&format!(
                    "_{i}:\tMOV DX,1\n\tMOV AX,{a1}\n\tCMP AX,0\n\tJE _NOT_{i}\n\
                     \tMOV DX,0\n_NOT_{i}:\tMOV {res},DX\n"
                ));
            },
            Op::Jmp => {
                let target = quad.result.and_then(|r| r.as_target()).unwrap_or(0);
                let label = self.jump_label(target);
                self.out
                    .push_str(&format!("_{}:\tJMP far ptr {}\n", i, label));
            },
            Op::Jz => {
                let target = quad.result.and_then(|r| r.as_target()).unwrap_or(0);
                let label = self.jump_label(target);
                self.out.push_str(&format!(
                    "_{i}:\tMOV AX,{a1}\n\tCMP AX,0\n\tJNE _NE_{i}\n\
                     \tJMP far ptr {label}\n_NE_{i}:\tNOP\n"
                ));
            },
            Op::Jnz => {
                let target = quad.result.and_then(|r| r.as_target()).unwrap_or(0);
                let label = self.jump_label(target);
                self.out.push_str(&format!(
                    "_{i}:\tMOV AX,{a1}\n\tCMP AX,0\n\tJE _EZ_{i}\n\
                     \tJMP far ptr {label}\n_EZ_{i}:\tNOP\n"
                ));
            },
            Op::Jlt => self.emit_cond_jump(i, &a1, &a2, &quad, "jl"),
            Op::Jle => self.emit_cond_jump(i, &a1, &a2, &quad, "jle"),
            Op::Jgt => self.emit_cond_jump(i, &a1, &a2, &quad, "jg"),
            Op::Jge => self.emit_cond_jump(i, &a1, &a2, &quad, "jge"),
            Op::Jeq => self.emit_cond_jump(i, &a1, &a2, &quad, "je"),
            Op::Jne => self.emit_cond_jump(i, &a1, &a2, &quad, "jne"),
            Op::Para => {
                self.out
                    .push_str(&format!("_{}:\tMOV AX,{}\n\tPUSH AX\n", i, a1));
            },
            Op::Call => {
                let callee = quad
                    .arg1
                    .and_then(|c| c.as_name())
                    .map(|n| n.as_str().to_string())
                    .unwrap_or_default();
                self.out.push_str(&format!("_{}:\tCALL {}\n", i, callee));
                if quad.result.is_some() {
                    self.out.push_str(&format!("\tMOV {},AX\n", res));
                }
            },
            Op::Ret => {
                if quad.arg1.is_some() {
                    self.out.push_str(&format!(
                        "_{}:\tMOV AX,{}\n\tMOV SP,BP\n\tPOP BP\n\tRET\n",
                        i, a1
                    ));
                } else {
                    self.out
                        .push_str(&format!("_{}:\tMOV SP,BP\n\tPOP BP\n\tRET\n", i));
                }
            },
            Op::Sys => {
                self.out.push_str("quit:\tMOV AH,4Ch\n\tINT 21h\n");
            },
        }
    }

    /// Compare-and-set with a local join label.
    fn emit_compare(&mut self, i: usize, a1: &str, a2: &str, res: &str, jcc: &str, tag: &str) {
        self.out.push_str(&format!(
            "_{i}:\tMOV DX,1\n\tMOV AX,{a1}\n\tCMP AX,{a2}\n\t{jcc} _{tag}_{i}\n\
             \tMOV DX,0\n_{tag}_{i}:\tMOV {res},DX\n"
        ));
    }

    fn emit_cond_jump(&mut self, i: usize, a1: &str, a2: &str, quad: &cmmc_ir::Quad, jcc: &str) {
        let target = quad.result.and_then(|r| r.as_target()).unwrap_or(0);
        self.out.push_str(&format!(
            "_{}:\tMOV AX,{}\n\tCMP AX,{}\n\t{} _{}\n",
            i, a1, a2, jcc, target
        ));
    }
}

/// The data-segment word for an initialized constant.
fn word_value(value: Operand) -> i64 {
    match value {
        Operand::Int(n) => n,
        Operand::Float(x) => x as i64,
        Operand::Char(c) => c as u32 as i64,
        Operand::Name(_) | Operand::Target(_) => 0,
    }
}

fn is_temp_name(name: Symbol) -> bool {
    let text = name.as_str();
    text.starts_with('T') || text.starts_with('$')
}

/// The numeric suffix of a temporary name (`T7`, `$T7` → 7).
fn temp_index(name: Symbol) -> usize {
    name.as_str()
        .trim_start_matches('$')
        .trim_start_matches('T')
        .parse()
        .unwrap_or(0)
}
