//! The expression stack engine.
//!
//! An operator-precedence evaluator with two interleaved modes:
//!
//! - **arithmetic mode** reduces to straight-line quadruples over fresh
//!   temporaries;
//! - **condition mode** (inside `if`/`while`/`do-while`/`for` conditions)
//!   turns relational operators into conditional-jump pairs and resolves
//!   `&&`/`||` short-circuit flow by keeping per-level true/false exit
//!   lists that the analyzer backpatches at structural boundaries.
//!
//! Every `(` opens a fresh [`CalStack`] on the bracket stack. In
//! arithmetic mode `)` collapses the inner stack to a single value pushed
//! into the enclosing stack. In condition mode a parenthesized *condition*
//! group instead pushes its whole [`LogicStack`] plus a synthetic `Move`
//! operator; `Move` later joins those exits into the enclosing level
//! according to the logical context (`&&`, `||`, or top level).
//!
//! `&&` and `||` are never stored in condition mode. They trigger an
//! immediate reduce of the pending operand, and when that operand produced
//! no relational jump a synthetic `NoRela` reduce materializes the
//! comparison-against-zero exit pair, so a bare `if (x && y)` still short
//! circuits.

use cmmc_ir::{Op, Operand, QuadList};
use cmmc_util::Symbol;

/// Operators as they live on the operator stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Pos,
    Not,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Param,
    Call,
    Ret,
    /// Synthetic: a parenthesized condition group waiting to be joined.
    Move,
}

impl StackOp {
    /// Shunting priority; smaller binds tighter. The reduce loop pops
    /// while `priority(top) <= priority(incoming)`.
    fn priority(self) -> u8 {
        match self {
            StackOp::Not | StackOp::Neg | StackOp::Pos => 2,
            StackOp::Mul | StackOp::Div | StackOp::Mod => 3,
            StackOp::Add | StackOp::Sub => 4,
            StackOp::Lt | StackOp::Le | StackOp::Gt | StackOp::Ge => 5,
            StackOp::Eq | StackOp::Ne => 6,
            StackOp::Move => 7,
            StackOp::And => 8,
            StackOp::Or => 9,
            StackOp::Param => 10,
            StackOp::Call => 11,
            StackOp::Assign => 12,
            StackOp::Ret => 13,
        }
    }

    fn is_rel(self) -> bool {
        matches!(
            self,
            StackOp::Lt | StackOp::Le | StackOp::Gt | StackOp::Ge | StackOp::Eq | StackOp::Ne
        )
    }

    /// The IR operator for a value-producing reduce.
    fn to_ir(self) -> Op {
        match self {
            StackOp::Assign => Op::Assign,
            StackOp::Add => Op::Add,
            StackOp::Sub => Op::Sub,
            StackOp::Mul => Op::Mul,
            StackOp::Div => Op::Div,
            StackOp::Mod => Op::Mod,
            StackOp::Neg => Op::Neg,
            StackOp::Pos => Op::Pos,
            StackOp::Not => Op::Not,
            StackOp::Lt => Op::Lt,
            StackOp::Le => Op::Le,
            StackOp::Gt => Op::Gt,
            StackOp::Ge => Op::Ge,
            StackOp::Eq => Op::Eq,
            StackOp::Ne => Op::Ne,
            StackOp::And => Op::And,
            StackOp::Or => Op::Or,
            StackOp::Param => Op::Para,
            StackOp::Call => Op::Call,
            StackOp::Ret => Op::Ret,
            StackOp::Move => Op::Assign,
        }
    }

    fn to_cond_jump(self) -> Op {
        match self {
            StackOp::Lt => Op::Jlt,
            StackOp::Le => Op::Jle,
            StackOp::Gt => Op::Jgt,
            StackOp::Ge => Op::Jge,
            StackOp::Eq => Op::Jeq,
            StackOp::Ne => Op::Jne,
            _ => unreachable!("not a relational operator"),
        }
    }
}

/// The logical context a condition operand reduces under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicCtx {
    /// The operand is the left side of `&&`.
    And,
    /// The operand is the left side of `||`.
    Or,
    /// The operand ends the (sub)condition.
    Top,
}

/// Pending jump ids awaiting their targets: taken-when-true and
/// taken-when-false exits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogicStack {
    pub true_exits: Vec<usize>,
    pub false_exits: Vec<usize>,
}

impl LogicStack {
    /// Patches and drains the true exits to `target`.
    pub fn patch_true(&mut self, quads: &mut QuadList, target: usize) {
        for id in self.true_exits.drain(..) {
            quads.patch_target(id, target);
        }
    }

    /// Patches and drains the false exits to `target`.
    pub fn patch_false(&mut self, quads: &mut QuadList, target: usize) {
        for id in self.false_exits.drain(..) {
            quads.patch_target(id, target);
        }
    }
}

/// A value on the operand stack: a plain operand or the exit lists of a
/// reduced parenthesized condition group.
#[derive(Clone, Debug)]
enum StackVal {
    Operand(Operand),
    Logic(LogicStack),
}

/// One bracket level: operand stack, operator stack, and the exits
/// collected at this level.
#[derive(Debug, Default)]
struct CalStack {
    nums: Vec<StackVal>,
    ops: Vec<StackOp>,
    logic: LogicStack,
}

impl CalStack {
    /// True when this level holds condition content (pending relational,
    /// collected exits, or an unjoined inner group) rather than a plain
    /// arithmetic subexpression.
    fn is_condition_group(&self) -> bool {
        !self.logic.true_exits.is_empty()
            || !self.logic.false_exits.is_empty()
            || self
                .ops
                .iter()
                .any(|op| op.is_rel() || *op == StackOp::Move)
            || self.nums.iter().any(|v| matches!(v, StackVal::Logic(_)))
    }
}

/// The engine: a stack of bracket levels plus the mode flags.
#[derive(Debug)]
pub struct CalStacks {
    brackets: Vec<CalStack>,
    /// Condition mode; set by the analyzer for the span of a control
    /// statement's condition.
    pub cond_mode: bool,
    /// Constant-folding mode for `const` initializers: literal reduces
    /// compute instead of emitting temporaries.
    pub const_fold: bool,
    /// The value of the most recent assignment reduce.
    pub result: Option<Operand>,
}

impl Default for CalStacks {
    fn default() -> Self {
        Self::new()
    }
}

impl CalStacks {
    pub fn new() -> Self {
        Self {
            brackets: vec![CalStack::default()],
            cond_mode: false,
            const_fold: false,
            result: None,
        }
    }

    fn current(&mut self) -> &mut CalStack {
        if self.brackets.is_empty() {
            self.brackets.push(CalStack::default());
        }
        self.brackets.last_mut().unwrap()
    }

    /// Drops everything back to a single empty level. Called at statement
    /// boundaries.
    pub fn clear(&mut self) {
        self.brackets.clear();
        self.brackets.push(CalStack::default());
    }

    /// Pushes an operand.
    pub fn push_operand(&mut self, value: Operand) {
        self.current().nums.push(StackVal::Operand(value));
    }

    /// The top operand, if the top of the stack is one.
    pub fn peek_operand(&mut self) -> Option<Operand> {
        match self.current().nums.last() {
            Some(StackVal::Operand(v)) => Some(*v),
            _ => None,
        }
    }

    /// Registers a function call: the call operator plus the callee name
    /// as its operand.
    pub fn push_func_call(&mut self, name: Symbol) {
        let cur = self.current();
        cur.ops.push(StackOp::Call);
        cur.nums.push(StackVal::Operand(Operand::Name(name)));
    }

    /// Pushes `ret` under the expression that follows it. Its priority is
    /// the weakest, so it stays put until `finish_ret`.
    pub fn push_ret(&mut self) {
        self.current().ops.push(StackOp::Ret);
    }

    /// Opens a bracket level.
    pub fn open_paren(&mut self) {
        self.brackets.push(CalStack::default());
    }

    /// Closes a bracket level from a `factor` production.
    ///
    /// In arithmetic mode (and for purely arithmetic groups inside a
    /// condition) the group collapses to its value. A condition group
    /// instead hands its logic stack to the enclosing level, tagged with
    /// `Move`.
    pub fn close_paren(&mut self, quads: &mut QuadList) {
        if self.cond_mode && self.current().is_condition_group() {
            self.finish_operand(LogicCtx::Top, quads);
            if self.brackets.len() > 1 {
                let inner = self.brackets.pop().unwrap();
                let cur = self.current();
                cur.nums.push(StackVal::Logic(inner.logic));
                cur.ops.push(StackOp::Move);
            }
            return;
        }

        self.cal_all_current(quads);
        if self.brackets.len() > 1 {
            let inner = self.brackets.pop().unwrap();
            if let Some(StackVal::Operand(value)) = inner.nums.last() {
                let value = *value;
                self.push_operand(value);
            }
        }
    }

    /// Closes the structural condition of a control statement, returning
    /// the pending exits for the analyzer to backpatch.
    pub fn close_condition(&mut self, quads: &mut QuadList) -> LogicStack {
        self.finish_operand(LogicCtx::Top, quads);
        if self.brackets.len() > 1 {
            self.brackets.pop().unwrap().logic
        } else {
            std::mem::take(&mut self.current().logic)
        }
    }

    /// Pushes an operator, reducing by priority first.
    ///
    /// Two exceptions to the plain shunting rule: consecutive `param`
    /// operators never collapse each other (arguments stack up until the
    /// call reduces), and in condition mode `&&`/`||` are not pushed at
    /// all; they reduce the pending operand immediately.
    pub fn push_op(&mut self, op: StackOp, quads: &mut QuadList) {
        if self.cond_mode && matches!(op, StackOp::And | StackOp::Or) {
            let ctx = if op == StackOp::And {
                LogicCtx::And
            } else {
                LogicCtx::Or
            };
            self.finish_operand(ctx, quads);
            return;
        }

        while let Some(&top) = self.current().ops.last() {
            if top.priority() > op.priority() {
                break;
            }
            if top == StackOp::Param && op == StackOp::Param {
                break;
            }
            self.current().ops.pop();
            self.reduce_one(top, quads);
        }
        self.current().ops.push(op);
    }

    /// Reduces everything left on the current level.
    pub fn finish_all(&mut self, quads: &mut QuadList) {
        self.result = None;
        while let Some(op) = self.current().ops.pop() {
            self.reduce_one(op, quads);
        }
    }

    /// Reduces until the pending `call` has been emitted. `want_result`
    /// distinguishes a call used as a value (fresh temporary) from a call
    /// statement.
    pub fn finish_call(&mut self, want_result: bool, quads: &mut QuadList) {
        while let Some(op) = self.current().ops.pop() {
            if op == StackOp::Call {
                self.reduce_call(want_result, quads);
                return;
            }
            self.reduce_one(op, quads);
        }
    }

    /// Reduces until the pending `ret` has been emitted.
    pub fn finish_ret(&mut self, quads: &mut QuadList) {
        while let Some(op) = self.current().ops.pop() {
            if op == StackOp::Ret {
                self.reduce_ret(quads);
                return;
            }
            self.reduce_one(op, quads);
        }
        // No `ret` was pending: a bare `return;`.
        self.reduce_ret(quads);
    }

    /// Pops an operand, degrading gracefully on malformed stacks.
    fn pop_operand(&mut self) -> Operand {
        match self.current().nums.pop() {
            Some(StackVal::Operand(v)) => v,
            _ => Operand::Int(0),
        }
    }

    /// One value-semantics reduce of an already-popped operator.
    fn reduce_one(&mut self, op: StackOp, quads: &mut QuadList) {
        match op {
            StackOp::Neg | StackOp::Pos | StackOp::Not => {
                let a = self.pop_operand();
                if self.const_fold && a.is_literal() {
                    self.push_operand(fold_unary(op, a));
                    return;
                }
                let temp = quads.new_temp();
                quads.add(op.to_ir(), Some(a), None, Some(Operand::Name(temp)));
                self.push_operand(Operand::Name(temp));
            },
            StackOp::Param => {
                let a = self.pop_operand();
                quads.add(Op::Para, Some(a), None, None);
            },
            StackOp::Call => {
                // A call reduced through `finish_all`: a call statement
                // when the callee name is the only operand left.
                let want_result = self.current().nums.len() > 1;
                self.reduce_call(want_result, quads);
            },
            StackOp::Ret => self.reduce_ret(quads),
            StackOp::Assign => {
                let src = self.pop_operand();
                let dst = self.pop_operand();
                quads.add(Op::Assign, Some(src), None, Some(dst));
                self.result = Some(src);
            },
            StackOp::Move => {
                // A condition group consumed as a value; nothing sensible
                // remains, keep the stacks balanced.
                self.current().nums.pop();
                self.push_operand(Operand::Int(0));
            },
            _ => {
                let b = self.pop_operand();
                let a = self.pop_operand();
                if self.const_fold && a.is_literal() && b.is_literal() {
                    self.push_operand(fold_binary(op, a, b));
                    return;
                }
                let temp = quads.new_temp();
                quads.add(op.to_ir(), Some(a), Some(b), Some(Operand::Name(temp)));
                self.push_operand(Operand::Name(temp));
            },
        }
    }

    fn reduce_call(&mut self, want_result: bool, quads: &mut QuadList) {
        let callee = self.pop_operand();
        if want_result {
            let temp = quads.new_temp();
            quads.add(Op::Call, Some(callee), None, Some(Operand::Name(temp)));
            self.push_operand(Operand::Name(temp));
        } else {
            quads.add(Op::Call, Some(callee), None, None);
        }
    }

    fn reduce_ret(&mut self, quads: &mut QuadList) {
        if matches!(self.current().nums.last(), Some(StackVal::Operand(_))) {
            let a = self.pop_operand();
            quads.add(Op::Ret, Some(a), None, None);
        } else {
            quads.add(Op::Ret, None, None, None);
        }
    }

    /// Reduces the pending condition operand under `ctx`.
    ///
    /// Arithmetic leftovers reduce to values; a relational operator or an
    /// inner group's `Move` produces/joins the jump exits. When neither
    /// occurred, the synthetic `NoRela` reduce emits the
    /// comparison-against-zero pair for a bare boolean operand.
    pub fn finish_operand(&mut self, ctx: LogicCtx, quads: &mut QuadList) {
        let mut exits_emitted = false;
        while let Some(&top) = self.current().ops.last() {
            match top {
                op if op.is_rel() => {
                    self.current().ops.pop();
                    self.reduce_relational(op, ctx, quads);
                    exits_emitted = true;
                },
                StackOp::Move => {
                    self.current().ops.pop();
                    let inner = match self.current().nums.pop() {
                        Some(StackVal::Logic(l)) => l,
                        other => {
                            // Keep balance on malformed input.
                            if let Some(v) = other {
                                self.current().nums.push(v);
                            }
                            LogicStack::default()
                        },
                    };
                    self.reduce_move(inner, ctx, quads);
                    exits_emitted = true;
                },
                StackOp::Call | StackOp::Ret | StackOp::Assign => break,
                op => {
                    self.current().ops.pop();
                    self.reduce_one(op, quads);
                },
            }
        }
        if !exits_emitted {
            self.reduce_norela(ctx, quads);
        }
    }

    /// `a rel b` in condition mode: the jump pair plus context-dependent
    /// patching.
    fn reduce_relational(&mut self, op: StackOp, ctx: LogicCtx, quads: &mut QuadList) {
        let b = self.pop_operand();
        let a = self.pop_operand();
        let jop = op.to_cond_jump();
        match ctx {
            LogicCtx::Top => {
                let q1 = quads.add(jop, Some(a), Some(b), None);
                let q2 = quads.add(Op::Jmp, None, None, None);
                let logic = &mut self.current().logic;
                logic.true_exits.push(q1);
                logic.false_exits.push(q2);
            },
            LogicCtx::And => {
                let q1 = quads.add(jop, Some(a), Some(b), None);
                quads.patch_target(q1, q1 + 2);
                let q2 = quads.add(Op::Jmp, None, None, None);
                self.current().logic.false_exits.push(q2);
            },
            LogicCtx::Or => {
                let q1 = quads.add(jop, Some(a), Some(b), None);
                let q2 = quads.add(Op::Jmp, None, None, None);
                quads.patch_target(q2, q1 + 2);
                self.current().logic.true_exits.push(q1);
                let next = quads.next_id();
                self.current().logic.patch_false(quads, next);
            },
        }
    }

    /// A bare boolean operand in condition mode: jump-if-nonzero plus the
    /// complementary unconditional jump.
    fn reduce_norela(&mut self, ctx: LogicCtx, quads: &mut QuadList) {
        if !matches!(self.current().nums.last(), Some(StackVal::Operand(_))) {
            return;
        }
        let x = self.pop_operand();
        match ctx {
            LogicCtx::Top => {
                let q1 = quads.add(Op::Jnz, Some(x), None, None);
                let q2 = quads.add(Op::Jmp, None, None, None);
                let logic = &mut self.current().logic;
                logic.true_exits.push(q1);
                logic.false_exits.push(q2);
            },
            LogicCtx::And => {
                let q1 = quads.add(Op::Jnz, Some(x), None, None);
                quads.patch_target(q1, q1 + 2);
                let q2 = quads.add(Op::Jmp, None, None, None);
                self.current().logic.false_exits.push(q2);
            },
            LogicCtx::Or => {
                let q1 = quads.add(Op::Jnz, Some(x), None, None);
                let q2 = quads.add(Op::Jmp, None, None, None);
                quads.patch_target(q2, q1 + 2);
                self.current().logic.true_exits.push(q1);
                let next = quads.next_id();
                self.current().logic.patch_false(quads, next);
            },
        }
    }

    /// Joins the exits of a parenthesized condition group into the
    /// current level.
    fn reduce_move(&mut self, mut inner: LogicStack, ctx: LogicCtx, quads: &mut QuadList) {
        match ctx {
            LogicCtx::Top => {
                let logic = &mut self.current().logic;
                logic.true_exits.append(&mut inner.true_exits);
                logic.false_exits.append(&mut inner.false_exits);
            },
            LogicCtx::And => {
                // True falls into the right operand's code.
                let next = quads.next_id();
                inner.patch_true(quads, next);
                self.current()
                    .logic
                    .false_exits
                    .append(&mut inner.false_exits);
            },
            LogicCtx::Or => {
                // False falls into the right operand's code.
                let next = quads.next_id();
                inner.patch_false(quads, next);
                self.current()
                    .logic
                    .true_exits
                    .append(&mut inner.true_exits);
            },
        }
    }

    /// Reduces every operator on the current level with value semantics.
    fn cal_all_current(&mut self, quads: &mut QuadList) {
        while let Some(op) = self.current().ops.pop() {
            self.reduce_one(op, quads);
        }
    }
}

/// Constant folding for unary operators over literals.
fn fold_unary(op: StackOp, a: Operand) -> Operand {
    match (op, a) {
        (StackOp::Neg, Operand::Int(n)) => Operand::Int(-n),
        (StackOp::Neg, Operand::Float(x)) => Operand::Float(-x),
        (StackOp::Pos, v) => v,
        (StackOp::Not, Operand::Int(n)) => Operand::Int((n == 0) as i64),
        (StackOp::Not, Operand::Float(x)) => Operand::Int((x == 0.0) as i64),
        (_, v) => v,
    }
}

/// Constant folding for binary operators over literals. Integer pairs stay
/// integral; anything involving a float computes in `f64`.
fn fold_binary(op: StackOp, a: Operand, b: Operand) -> Operand {
    fn as_f64(v: Operand) -> f64 {
        match v {
            Operand::Int(n) => n as f64,
            Operand::Float(x) => x,
            Operand::Char(c) => c as u32 as f64,
            _ => 0.0,
        }
    }

    if let (Operand::Int(x), Operand::Int(y)) = (a, b) {
        let value = match op {
            StackOp::Add => x.wrapping_add(y),
            StackOp::Sub => x.wrapping_sub(y),
            StackOp::Mul => x.wrapping_mul(y),
            StackOp::Div => x.checked_div(y).unwrap_or(0),
            StackOp::Mod => x.checked_rem(y).unwrap_or(0),
            StackOp::And => ((x != 0) && (y != 0)) as i64,
            StackOp::Or => ((x != 0) || (y != 0)) as i64,
            StackOp::Lt => (x < y) as i64,
            StackOp::Le => (x <= y) as i64,
            StackOp::Gt => (x > y) as i64,
            StackOp::Ge => (x >= y) as i64,
            StackOp::Eq => (x == y) as i64,
            StackOp::Ne => (x != y) as i64,
            _ => 0,
        };
        return Operand::Int(value);
    }

    let (x, y) = (as_f64(a), as_f64(b));
    match op {
        StackOp::Add => Operand::Float(x + y),
        StackOp::Sub => Operand::Float(x - y),
        StackOp::Mul => Operand::Float(x * y),
        StackOp::Div => Operand::Float(if y == 0.0 { 0.0 } else { x / y }),
        StackOp::Mod => Operand::Float(if y == 0.0 { 0.0 } else { x % y }),
        StackOp::And => Operand::Int(((x != 0.0) && (y != 0.0)) as i64),
        StackOp::Or => Operand::Int(((x != 0.0) || (y != 0.0)) as i64),
        StackOp::Lt => Operand::Int((x < y) as i64),
        StackOp::Le => Operand::Int((x <= y) as i64),
        StackOp::Gt => Operand::Int((x > y) as i64),
        StackOp::Ge => Operand::Int((x >= y) as i64),
        StackOp::Eq => Operand::Int((x == y) as i64),
        StackOp::Ne => Operand::Int((x != y) as i64),
        _ => Operand::Int(0),
    }
}
