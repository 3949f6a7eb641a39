//! Semantic analysis + quadruple generation.
//!
//! One recursive traversal over the concrete syntax tree does both name
//! resolution and emission. Statement walkers manage scopes, levels and
//! the backpatch lists; expression walkers feed operands and operators
//! into the stack engine in source order and let it do the reducing.
//!
//! Loops carry their pending `break`/`continue` jumps on an explicit
//! stack of contexts; `if`-chains collect their exit jumps in a list
//! threaded through the chain recursion. Both are patched at the
//! statement's structural end, which is what makes arbitrary nesting
//! work.

use cmmc_ir::{Op, Operand, QuadList};
use cmmc_lex::{decode_char, Token, TokenKind};
use cmmc_par::{CstKind, Node};
use cmmc_util::{Handler, Symbol};

use crate::stacks::{CalStacks, LogicStack, StackOp};
use crate::symtab::{Info, Scope, SymbolTable};

/// Pending jumps of one enclosing loop.
#[derive(Debug, Default)]
struct LoopCtx {
    break_jumps: Vec<usize>,
    continue_jumps: Vec<usize>,
}

/// The analyzer state.
pub struct Analyzer<'a> {
    handler: &'a Handler,
    pub table: SymbolTable,
    pub quads: QuadList,
    engine: CalStacks,
    scope: Scope,
    level: i32,
    current_func: Option<Symbol>,
    /// Return type written before `main`, if any.
    main_type: Option<Symbol>,
    /// Name of the declaration entry currently being processed.
    pending_name: Option<Token>,
    /// Whether that entry has an initializer.
    pending_init: bool,
    /// Set when the current statement already failed name resolution.
    err: bool,
    /// The `/` token awaiting the divisor check.
    div_token: Option<Token>,
    /// Whether a top-level `return` was seen in the current function.
    has_return: bool,
    loops: Vec<LoopCtx>,
}

impl<'a> Analyzer<'a> {
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            handler,
            table: SymbolTable::new(),
            quads: QuadList::new(),
            engine: CalStacks::new(),
            scope: Scope::Global,
            level: 0,
            current_func: None,
            main_type: None,
            pending_name: None,
            pending_init: false,
            err: false,
            div_token: None,
            has_return: false,
            loops: Vec::new(),
        }
    }

    /// Walks a whole program tree.
    pub fn run(&mut self, root: &Node) {
        self.table.ensure_scope(Scope::Global);
        for child in &root.children {
            match child.kind {
                CstKind::DeclStmt => self.decl_stmt(child),
                CstKind::Terminal => {
                    let token = child.token.as_ref().unwrap();
                    if token.kind.is_func_type() {
                        self.main_type = Some(Symbol::intern(&token.lexeme));
                    } else if token.kind == TokenKind::KwMain {
                        self.setup_main();
                    }
                },
                CstKind::Compound => {
                    self.compound(child);
                    self.quads.add(Op::Sys, None, None, None);
                },
                CstKind::FuncBlock => self.func_block(child),
                _ => {},
            }
        }
    }

    fn setup_main(&mut self) {
        let main = Symbol::intern("main");
        self.table.ensure_scope(Scope::Func(main));
        self.quads.add(Op::Entry(main), None, None, None);
        let ty = self.main_type.unwrap_or_else(|| Symbol::intern("void"));
        self.table
            .add_function(Info::new(Scope::Global, main, ty, 0));
        self.scope = Scope::Func(main);
        self.current_func = Some(main);
    }

    // ------------------------------------------------------------------
    // Errors and checks
    // ------------------------------------------------------------------

    fn report(&self, token: &Token, message: impl Into<String>) {
        self.handler.report(
            token.pos,
            token.kind.code(),
            token.lexeme.clone(),
            message,
        );
    }

    /// Use-site check for a name: it must resolve (current scope, then
    /// global) to a variable or constant visible from here.
    fn check_var(&mut self, token: &Token) -> bool {
        let name = Symbol::intern(&token.lexeme);
        let info = self
            .table
            .find_variable(self.scope, name)
            .or_else(|| self.table.find_constant(self.scope, name));
        match info {
            None => {
                self.report(token, "variable not defined");
                false
            },
            Some(info) => {
                let visible = info.level == 0
                    || (info.scope == self.scope && info.level <= self.level);
                if !visible {
                    self.report(token, "variable scope mismatch");
                }
                visible
            },
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn decl_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::ValueDecl => self.value_decl(child),
                CstKind::FuncDeclStmt => self.func_decl_stmt(child),
                CstKind::FuncDef => self.func_def(child),
                _ => {},
            }
        }
    }

    fn value_decl(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::ConstDecl => self.const_decl(child),
                CstKind::VarDecl => self.var_decl(child),
                _ => {},
            }
        }
    }

    fn const_decl(&mut self, node: &Node) {
        let mut ty = Symbol::intern("int");
        self.engine.const_fold = true;
        for child in &node.children {
            match child.kind {
                CstKind::ConstType => {
                    if let Some(tok) = child.leaf_token() {
                        ty = Symbol::intern(&tok.lexeme);
                    }
                },
                CstKind::ConstTable => self.const_table(child, ty),
                _ => {},
            }
        }
        self.engine.const_fold = false;
    }

    fn const_table(&mut self, node: &Node, ty: Symbol) {
        for child in &node.children {
            match child.kind {
                CstKind::Var => {
                    if let Some(tok) = child.leaf_token() {
                        self.pending_name = Some(tok.clone());
                        self.engine
                            .push_operand(Operand::name(&tok.lexeme));
                    }
                },
                CstKind::Terminal => {
                    if child.token.as_ref().map(|t| t.kind) == Some(TokenKind::Assign) {
                        self.engine.push_op(StackOp::Assign, &mut self.quads);
                    }
                },
                CstKind::ConstTable0 => self.const_table0(child, ty),
                _ => {},
            }
        }
    }

    fn const_table0(&mut self, node: &Node, ty: Symbol) {
        for child in &node.children {
            match child.kind {
                CstKind::ConstValue => {
                    for value_child in &child.children {
                        if value_child.kind == CstKind::ArithExpr {
                            self.walk_arith_expr(value_child);
                        }
                    }
                },
                CstKind::ConstTable1 => self.const_table1(child, ty),
                _ => {},
            }
        }
    }

    fn const_table1(&mut self, node: &Node, ty: Symbol) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => self.finish_const_entry(ty),
                CstKind::ConstTable => self.const_table(child, ty),
                _ => {},
            }
        }
    }

    fn finish_const_entry(&mut self, ty: Symbol) {
        if !self.err {
            self.engine.finish_all(&mut self.quads);
            let value = self.engine.result;
            if let Some(tok) = self.pending_name.take() {
                let name = Symbol::intern(&tok.lexeme);
                if self.table.name_exists(self.scope, name) {
                    self.report(&tok, format!("constant {} redefined", name));
                } else if value.is_none() {
                    self.report(&tok, format!("constant {} not valued", name));
                } else {
                    let mut info = Info::new(self.scope, name, ty, self.level);
                    info.value = value;
                    info.initialized = true;
                    self.table.add_constant(info);
                }
            }
        }
        self.pending_name = None;
        self.err = false;
        self.engine.clear();
    }

    fn var_decl(&mut self, node: &Node) {
        let mut ty = Symbol::intern("int");
        for child in &node.children {
            match child.kind {
                CstKind::VarType => {
                    if let Some(tok) = child.leaf_token() {
                        ty = Symbol::intern(&tok.lexeme);
                    }
                },
                CstKind::VarTable => self.var_table(child, ty),
                _ => {},
            }
        }
    }

    fn var_table(&mut self, node: &Node, ty: Symbol) {
        for child in &node.children {
            match child.kind {
                CstKind::SingleVar => self.single_var(child),
                CstKind::VarTable0 => self.var_table0(child, ty),
                _ => {},
            }
        }
    }

    fn single_var(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Var => {
                    if let Some(tok) = child.leaf_token() {
                        self.pending_name = Some(tok.clone());
                        self.pending_init = false;
                    }
                },
                CstKind::SingleVar0 if child.is_legal() => {
                    // "=" bool-expr
                    if let Some(tok) = &self.pending_name {
                        let name = Operand::name(&tok.lexeme);
                        self.engine.push_operand(name);
                    }
                    self.pending_init = true;
                    self.engine.push_op(StackOp::Assign, &mut self.quads);
                    for init_child in &child.children {
                        if init_child.kind == CstKind::BoolExpr {
                            self.walk_bool_expr(init_child);
                        }
                    }
                },
                _ => {},
            }
        }
    }

    fn var_table0(&mut self, node: &Node, ty: Symbol) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => self.finish_var_entry(ty),
                CstKind::VarTable => self.var_table(child, ty),
                _ => {},
            }
        }
    }

    fn finish_var_entry(&mut self, ty: Symbol) {
        if !self.err {
            if let Some(tok) = self.pending_name.take() {
                let name = Symbol::intern(&tok.lexeme);
                if self.table.name_exists(self.scope, name) {
                    self.report(&tok, format!("variable {} redefined", name));
                } else {
                    let mut info = Info::new(self.scope, name, ty, self.level);
                    if self.pending_init {
                        self.engine.finish_all(&mut self.quads);
                        info.value = self.engine.result;
                        info.initialized = true;
                    }
                    self.table.add_variable(info);
                }
            }
        }
        self.pending_name = None;
        self.pending_init = false;
        self.err = false;
        self.engine.clear();
    }

    fn func_decl_stmt(&mut self, node: &Node) {
        let mut ty = Symbol::intern("void");
        let mut name_tok = None;
        let mut param_types = Vec::new();
        for child in &node.children {
            if child.kind == CstKind::FuncDecl {
                for decl_child in &child.children {
                    match decl_child.kind {
                        CstKind::FuncType => {
                            if let Some(tok) = decl_child.leaf_token() {
                                ty = Symbol::intern(&tok.lexeme);
                            }
                        },
                        CstKind::Var => name_tok = decl_child.leaf_token().cloned(),
                        CstKind::DeclParams => {
                            collect_params(decl_child, &mut param_types, &mut Vec::new())
                        },
                        _ => {},
                    }
                }
            }
        }

        let Some(tok) = name_tok else { return };
        let name = Symbol::intern(&tok.lexeme);
        if self.table.name_exists(self.scope, name) {
            self.report(&tok, format!("function {} redefined", name));
            return;
        }
        self.table.ensure_scope(Scope::Func(name));
        let mut info = Info::new(Scope::Global, name, ty, 0);
        info.param_types = param_types;
        self.table.add_function(info);
    }

    fn func_block(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::FuncDef => self.func_def(child),
                CstKind::FuncBlock => self.func_block(child),
                _ => {},
            }
        }
    }

    fn func_def(&mut self, node: &Node) {
        let mut ty = Symbol::intern("void");
        let mut fname: Option<Symbol> = None;
        let mut param_types = Vec::new();
        let mut param_names: Vec<Option<Token>> = Vec::new();

        for child in &node.children {
            match child.kind {
                CstKind::FuncType => {
                    if let Some(tok) = child.leaf_token() {
                        ty = Symbol::intern(&tok.lexeme);
                    }
                },
                CstKind::Var => {
                    let Some(tok) = child.leaf_token().cloned() else { continue };
                    let name = Symbol::intern(&tok.lexeme);
                    if !self.table.function_exists(name) {
                        self.report(&tok, "function not declared");
                        self.err = true;
                        continue;
                    }
                    fname = Some(name);
                    self.current_func = Some(name);
                    self.quads.add(Op::Entry(name), None, None, None);
                    self.scope = Scope::Func(name);
                    self.table.ensure_scope(self.scope);
                    let declared_ty = self.table.find_function(name).map(|f| f.ty);
                    if declared_ty != Some(ty) {
                        self.report(&tok, "function return type mismatch");
                        self.err = true;
                    }
                },
                CstKind::DefParams | CstKind::DeclParams => {
                    collect_params(child, &mut param_types, &mut param_names);
                },
                CstKind::Terminal => {
                    if child.token.as_ref().map(|t| t.kind) == Some(TokenKind::RParen) {
                        if let Some(fname) = fname {
                            self.register_params(fname, &param_types, &param_names);
                        }
                    }
                },
                CstKind::Compound => {
                    self.has_return = false;
                    self.compound(child);
                    if !self.has_return {
                        let is_void = self
                            .current_func
                            .and_then(|f| self.table.find_function(f))
                            .map(|f| f.ty.as_str() == "void")
                            .unwrap_or(true);
                        if is_void {
                            self.quads.add(Op::Ret, None, None, None);
                        } else if let Some(f) = self.current_func {
                            self.handler.report_bare(
                                cmmc_util::Pos::DUMMY,
                                format!("function {} is missing a return statement", f),
                            );
                        }
                    }
                    self.has_return = false;
                },
                _ => {},
            }
        }
        self.err = false;
    }

    /// Checks a definition's parameter list against the declaration and
    /// registers the formals in the function's scope.
    fn register_params(
        &mut self,
        fname: Symbol,
        param_types: &[Symbol],
        param_names: &[Option<Token>],
    ) {
        let Some(declared) = self.table.find_function(fname).map(|f| f.param_types.clone())
        else {
            return;
        };
        if declared.len() != param_types.len() {
            self.handler.report_bare(
                cmmc_util::Pos::DUMMY,
                format!("function {}: parameter count mismatch", fname),
            );
            return;
        }

        for (i, pty) in param_types.iter().enumerate() {
            if declared[i] != *pty {
                self.handler.report_bare(
                    cmmc_util::Pos::DUMMY,
                    format!("function {}: parameter type mismatch", fname),
                );
                return;
            }
            let Some(Some(tok)) = param_names.get(i) else {
                self.handler.report_bare(
                    cmmc_util::Pos::DUMMY,
                    format!("function {}: parameter missing a name", fname),
                );
                return;
            };
            let name = Symbol::intern(&tok.lexeme);
            if self.table.name_exists(self.scope, name) {
                self.report(tok, format!("variable {} redefined", name));
                return;
            }
            let mut info = Info::new(self.scope, name, *pty, 1);
            info.is_param = true;
            self.table.add_variable(info);
            if let Some(f) = self.table.find_function_mut(fname) {
                f.param_names.push(name);
            }
        }
        if let Some(f) = self.table.find_function_mut(fname) {
            f.defined = true;
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn compound(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => match child.token.as_ref().map(|t| t.kind) {
                    Some(TokenKind::LBrace) => self.level += 1,
                    Some(TokenKind::RBrace) => self.level -= 1,
                    _ => {},
                },
                CstKind::StmtTable => self.stmt_table(child),
                _ => {},
            }
        }
    }

    fn stmt_table(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Stmt => self.stmt(child),
                CstKind::StmtTable0 => {
                    for table_child in &child.children {
                        if table_child.kind == CstKind::StmtTable {
                            self.stmt_table(table_child);
                        }
                    }
                },
                _ => {},
            }
        }
    }

    fn stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::ValueDecl => self.value_decl(child),
                CstKind::ExecStmt => self.exec_stmt(child),
                _ => {},
            }
        }
    }

    fn exec_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Compound => self.compound(child),
                CstKind::DataStmt => self.data_stmt(child),
                CstKind::ControlStmt => self.control_stmt(child),
                _ => {},
            }
        }
    }

    fn data_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::AssignStmt => self.assign_stmt(child),
                CstKind::CallStmt => self.call_stmt(child),
                _ => {},
            }
        }
    }

    fn assign_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::AssignExpr => self.assign_expr(child),
                CstKind::Terminal => {
                    if !self.err {
                        self.engine.finish_all(&mut self.quads);
                    }
                    self.engine.clear();
                    self.err = false;
                },
                _ => {},
            }
        }
    }

    fn assign_expr(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Var => {
                    let Some(tok) = child.leaf_token().cloned() else { continue };
                    let name = Symbol::intern(&tok.lexeme);
                    if self.table.constant_exists(self.scope, name) {
                        self.report(&tok, "cannot assign to a constant");
                        self.err = true;
                    } else if !self.table.variable_exists(self.scope, name) {
                        self.report(&tok, "variable not defined");
                        self.err = true;
                    } else if self.check_var(&tok) {
                        self.engine.push_operand(Operand::Name(name));
                    } else {
                        self.err = true;
                    }
                },
                CstKind::Terminal => {
                    if child.token.as_ref().map(|t| t.kind) == Some(TokenKind::Assign) {
                        self.engine.push_op(StackOp::Assign, &mut self.quads);
                    }
                },
                CstKind::BoolExpr => self.walk_bool_expr(child),
                _ => {},
            }
        }
    }

    fn call_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::FuncCall => self.func_call(child, true),
                CstKind::Terminal => {
                    self.engine.clear();
                    self.err = false;
                },
                _ => {},
            }
        }
    }

    /// `is_statement` decides whether the call's value is discarded.
    fn func_call(&mut self, node: &Node, is_statement: bool) {
        let mut known = false;
        for child in &node.children {
            match child.kind {
                CstKind::Var => {
                    let Some(tok) = child.leaf_token().cloned() else { continue };
                    let name = Symbol::intern(&tok.lexeme);
                    if !self.table.function_exists(name) {
                        self.report(&tok, "function not defined");
                        self.err = true;
                    } else {
                        known = true;
                        self.engine.push_func_call(name);
                    }
                },
                CstKind::Args => {
                    if child.is_legal() {
                        self.engine.push_op(StackOp::Param, &mut self.quads);
                        self.walk_args(child);
                    }
                },
                CstKind::Terminal => {
                    if child.token.as_ref().map(|t| t.kind) == Some(TokenKind::RParen) && known
                    {
                        self.engine.finish_call(!is_statement, &mut self.quads);
                    }
                },
                _ => {},
            }
        }
    }

    fn walk_args(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Arg => self.walk_arg(child),
                _ => {},
            }
        }
    }

    fn walk_arg(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::BoolExpr => self.walk_bool_expr(child),
                CstKind::Arg0 => {
                    for tail_child in &child.children {
                        match tail_child.kind {
                            CstKind::Terminal => {
                                self.engine.push_op(StackOp::Param, &mut self.quads)
                            },
                            CstKind::Arg => self.walk_arg(tail_child),
                            _ => {},
                        }
                    }
                },
                _ => {},
            }
        }
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    fn control_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::If => {
                    let mut exits = Vec::new();
                    self.if_stmt(child, &mut exits);
                    let next = self.quads.next_id();
                    for id in exits {
                        self.quads.patch_target(id, next);
                    }
                },
                CstKind::While => {
                    self.loops.push(LoopCtx::default());
                    let continue_pos = self.while_stmt(child);
                    self.finish_loop(continue_pos);
                },
                CstKind::DoWhile => {
                    self.loops.push(LoopCtx::default());
                    let continue_pos = self.do_while_stmt(child);
                    self.finish_loop(continue_pos);
                },
                CstKind::For => {
                    self.loops.push(LoopCtx::default());
                    let continue_pos = self.for_stmt(child);
                    self.finish_loop(continue_pos);
                },
                CstKind::Return => self.return_stmt(child),
                CstKind::Break => self.break_stmt(child),
                CstKind::Continue => self.continue_stmt(child),
                _ => {},
            }
        }
    }

    /// Patches the innermost loop's continue jumps to `continue_pos` and
    /// its break jumps past the loop.
    fn finish_loop(&mut self, continue_pos: usize) {
        let ctx = self.loops.pop().unwrap_or_default();
        for id in ctx.continue_jumps {
            self.quads.patch_target(id, continue_pos);
        }
        let after = self.quads.next_id();
        for id in ctx.break_jumps {
            self.quads.patch_target(id, after);
        }
    }

    /// Walks a control-statement body (a compound block or one statement).
    fn walk_body(&mut self, node: &Node) {
        match node.kind {
            CstKind::Compound => self.compound(node),
            CstKind::Stmt => self.stmt(node),
            _ => {},
        }
    }

    fn if_stmt(&mut self, node: &Node, exits: &mut Vec<usize>) {
        let mut logic = LogicStack::default();
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => match child.token.as_ref().map(|t| t.kind) {
                    Some(TokenKind::LParen) => {
                        self.engine.cond_mode = true;
                        self.engine.open_paren();
                    },
                    Some(TokenKind::RParen) => {
                        logic = self.engine.close_condition(&mut self.quads);
                        self.engine.cond_mode = false;
                        let next = self.quads.next_id();
                        logic.patch_true(&mut self.quads, next);
                    },
                    _ => {},
                },
                CstKind::BoolExpr => self.walk_bool_expr(child),
                CstKind::Compound | CstKind::Stmt => self.walk_body(child),
                CstKind::IfTail => {
                    if !child.is_legal() {
                        // No else: false exits fall to whatever follows.
                        let next = self.quads.next_id();
                        logic.patch_false(&mut self.quads, next);
                    } else {
                        let id = self.quads.add(Op::Jmp, None, None, None);
                        exits.push(id);
                        let next = self.quads.next_id();
                        logic.patch_false(&mut self.quads, next);
                        for tail_child in &child.children {
                            if tail_child.kind == CstKind::IfTail0 {
                                for branch in &tail_child.children {
                                    match branch.kind {
                                        CstKind::If => self.if_stmt(branch, exits),
                                        CstKind::Compound | CstKind::Stmt => {
                                            self.walk_body(branch)
                                        },
                                        _ => {},
                                    }
                                }
                            }
                        }
                    }
                },
                _ => {},
            }
        }
    }

    fn while_stmt(&mut self, node: &Node) -> usize {
        let mut cond_pos = self.quads.next_id();
        let mut logic = LogicStack::default();
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => match child.token.as_ref().map(|t| t.kind) {
                    Some(TokenKind::LParen) => {
                        cond_pos = self.quads.next_id();
                        self.engine.cond_mode = true;
                        self.engine.open_paren();
                    },
                    Some(TokenKind::RParen) => {
                        logic = self.engine.close_condition(&mut self.quads);
                        self.engine.cond_mode = false;
                        let next = self.quads.next_id();
                        logic.patch_true(&mut self.quads, next);
                    },
                    _ => {},
                },
                CstKind::BoolExpr => self.walk_bool_expr(child),
                CstKind::Compound | CstKind::Stmt => {
                    self.walk_body(child);
                    self.quads
                        .add(Op::Jmp, None, None, Some(Operand::Target(cond_pos)));
                    let next = self.quads.next_id();
                    logic.patch_false(&mut self.quads, next);
                },
                _ => {},
            }
        }
        cond_pos
    }

    fn do_while_stmt(&mut self, node: &Node) -> usize {
        let mut body_pos = self.quads.next_id();
        let mut continue_pos = body_pos;
        let mut seen_do = false;
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => match child.token.as_ref().map(|t| t.kind) {
                    Some(TokenKind::KwDo) => {
                        body_pos = self.quads.next_id();
                        seen_do = true;
                    },
                    Some(TokenKind::KwWhile) => {
                        continue_pos = self.quads.next_id();
                    },
                    Some(TokenKind::LParen) => {
                        self.engine.cond_mode = true;
                        self.engine.open_paren();
                    },
                    Some(TokenKind::RParen) => {
                        let mut logic = self.engine.close_condition(&mut self.quads);
                        self.engine.cond_mode = false;
                        logic.patch_true(&mut self.quads, body_pos);
                        let next = self.quads.next_id();
                        logic.patch_false(&mut self.quads, next);
                    },
                    _ => {},
                },
                CstKind::BoolExpr => self.walk_bool_expr(child),
                CstKind::Compound | CstKind::Stmt => {
                    if seen_do {
                        self.walk_body(child);
                    }
                },
                _ => {},
            }
        }
        continue_pos
    }

    fn for_stmt(&mut self, node: &Node) -> usize {
        let mut cond_pos = 0;
        let mut step_pos = 0;
        let mut assign_seen = 0;
        let mut logic = LogicStack::default();
        for child in &node.children {
            match child.kind {
                CstKind::AssignExpr => {
                    assign_seen += 1;
                    self.assign_expr(child);
                    if !self.err {
                        self.engine.finish_all(&mut self.quads);
                    }
                    self.engine.clear();
                    self.err = false;
                    if assign_seen == 1 {
                        // The initializer ran once; the condition starts
                        // here.
                        cond_pos = self.quads.next_id();
                        self.engine.cond_mode = true;
                        self.engine.open_paren();
                    } else {
                        // After the step, loop back to the condition.
                        self.quads
                            .add(Op::Jmp, None, None, Some(Operand::Target(cond_pos)));
                    }
                },
                CstKind::BoolExpr => {
                    self.walk_bool_expr(child);
                    logic = self.engine.close_condition(&mut self.quads);
                    self.engine.cond_mode = false;
                    step_pos = self.quads.next_id();
                },
                CstKind::Compound | CstKind::Stmt => {
                    let next = self.quads.next_id();
                    logic.patch_true(&mut self.quads, next);
                    self.walk_body(child);
                    self.quads
                        .add(Op::Jmp, None, None, Some(Operand::Target(step_pos)));
                    let next = self.quads.next_id();
                    logic.patch_false(&mut self.quads, next);
                },
                _ => {},
            }
        }
        step_pos
    }

    fn return_stmt(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => {
                    if self.level == 1 {
                        self.has_return = true;
                    }
                },
                CstKind::Return0 => {
                    let mut has_expr = false;
                    for tail_child in &child.children {
                        match tail_child.kind {
                            CstKind::BoolExpr => {
                                has_expr = true;
                                self.engine.push_ret();
                                self.walk_bool_expr(tail_child);
                            },
                            CstKind::Terminal => {
                                if has_expr {
                                    self.engine.finish_ret(&mut self.quads);
                                    self.engine.clear();
                                } else {
                                    self.quads.add(Op::Ret, None, None, None);
                                }
                            },
                            _ => {},
                        }
                    }
                },
                _ => {},
            }
        }
    }

    fn break_stmt(&mut self, node: &Node) {
        let id = self.quads.add(Op::Jmp, None, None, None);
        match self.loops.last_mut() {
            Some(ctx) => ctx.break_jumps.push(id),
            None => {
                if let Some(tok) = first_terminal(node) {
                    self.report(tok, "break outside a loop");
                }
            },
        }
    }

    fn continue_stmt(&mut self, node: &Node) {
        let id = self.quads.add(Op::Jmp, None, None, None);
        match self.loops.last_mut() {
            Some(ctx) => ctx.continue_jumps.push(id),
            None => {
                if let Some(tok) = first_terminal(node) {
                    self.report(tok, "continue outside a loop");
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn walk_bool_expr(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::BoolTerm => self.walk_bool_term(child),
                CstKind::BoolExpr0 => self.walk_bool_expr0(child),
                _ => {},
            }
        }
    }

    fn walk_bool_expr0(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => self.engine.push_op(StackOp::Or, &mut self.quads),
                CstKind::BoolTerm => self.walk_bool_term(child),
                CstKind::BoolExpr0 => self.walk_bool_expr0(child),
                _ => {},
            }
        }
    }

    fn walk_bool_term(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::BoolFactor => self.walk_bool_factor(child),
                CstKind::BoolTerm0 => self.walk_bool_term0(child),
                _ => {},
            }
        }
    }

    fn walk_bool_term0(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => self.engine.push_op(StackOp::And, &mut self.quads),
                CstKind::BoolFactor => self.walk_bool_factor(child),
                CstKind::BoolTerm0 => self.walk_bool_term0(child),
                _ => {},
            }
        }
    }

    fn walk_bool_factor(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::ArithExpr => self.walk_arith_expr(child),
                CstKind::BoolFactor0 => {
                    if child.is_legal() {
                        for tail_child in &child.children {
                            match tail_child.kind {
                                CstKind::RelOp => self.walk_rel_op(tail_child),
                                CstKind::ArithExpr => self.walk_arith_expr(tail_child),
                                _ => {},
                            }
                        }
                    }
                },
                _ => {},
            }
        }
    }

    fn walk_rel_op(&mut self, node: &Node) {
        let Some(tok) = node.leaf_token() else { return };
        let op = match tok.kind {
            TokenKind::Lt => StackOp::Lt,
            TokenKind::Le => StackOp::Le,
            TokenKind::Gt => StackOp::Gt,
            TokenKind::Ge => StackOp::Ge,
            TokenKind::EqEq => StackOp::Eq,
            TokenKind::Ne => StackOp::Ne,
            _ => return,
        };
        self.engine.push_op(op, &mut self.quads);
    }

    fn walk_arith_expr(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Term => self.walk_term(child),
                CstKind::ArithExpr0 => self.walk_arith_expr0(child),
                _ => {},
            }
        }
    }

    fn walk_arith_expr0(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => {
                    let op = match child.token.as_ref().map(|t| t.kind) {
                        Some(TokenKind::Plus) => StackOp::Add,
                        Some(TokenKind::Minus) => StackOp::Sub,
                        _ => continue,
                    };
                    self.engine.push_op(op, &mut self.quads);
                },
                CstKind::Term => self.walk_term(child),
                CstKind::ArithExpr0 => self.walk_arith_expr0(child),
                _ => {},
            }
        }
    }

    fn walk_term(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Factor => self.walk_factor(child),
                CstKind::Term0 => self.walk_term0(child),
                _ => {},
            }
        }
    }

    fn walk_term0(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => {
                    let tok = child.token.as_ref().unwrap();
                    let op = match tok.kind {
                        TokenKind::Star => StackOp::Mul,
                        TokenKind::Slash => {
                            self.div_token = Some(tok.clone());
                            StackOp::Div
                        },
                        TokenKind::Percent => StackOp::Mod,
                        _ => continue,
                    };
                    self.engine.push_op(op, &mut self.quads);
                },
                CstKind::Factor => {
                    self.walk_factor(child);
                    if let Some(div_tok) = self.div_token.take() {
                        self.check_divisor(&div_tok);
                    }
                },
                CstKind::Term0 => self.walk_term0(child),
                _ => {},
            }
        }
    }

    /// The divisor check is syntactic: a literal zero, or a name whose
    /// recorded value is zero, is reported at the `/` token. The
    /// quadruple is still emitted.
    fn check_divisor(&mut self, div_tok: &Token) {
        let Some(top) = self.engine.peek_operand() else { return };
        let is_zero = match top {
            Operand::Int(0) => true,
            Operand::Float(x) => x == 0.0,
            Operand::Name(name) => {
                let value = self
                    .table
                    .find_variable(self.scope, name)
                    .or_else(|| self.table.find_constant(self.scope, name))
                    .and_then(|info| info.value);
                matches!(value, Some(Operand::Int(0)))
                    || matches!(value, Some(Operand::Float(x)) if x == 0.0)
            },
            _ => false,
        };
        if is_zero {
            self.report(div_tok, "division by zero");
        }
    }

    fn walk_factor(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => match child.token.as_ref().map(|t| t.kind) {
                    Some(TokenKind::LParen) => self.engine.open_paren(),
                    Some(TokenKind::RParen) => self.engine.close_paren(&mut self.quads),
                    _ => {},
                },
                CstKind::BoolExpr => self.walk_bool_expr(child),
                CstKind::Constant => self.walk_constant(child),
                CstKind::Var => self.factor_var(child),
                CstKind::FuncCall => self.func_call(child, false),
                CstKind::Factor0 => self.walk_factor0(child),
                _ => {},
            }
        }
    }

    fn walk_factor0(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                CstKind::Terminal => {
                    let op = match child.token.as_ref().map(|t| t.kind) {
                        Some(TokenKind::Plus) => StackOp::Pos,
                        Some(TokenKind::Minus) => StackOp::Neg,
                        Some(TokenKind::Bang) => StackOp::Not,
                        _ => continue,
                    };
                    self.engine.push_op(op, &mut self.quads);
                },
                CstKind::Factor => self.walk_factor(child),
                _ => {},
            }
        }
    }

    fn factor_var(&mut self, node: &Node) {
        let Some(tok) = node.leaf_token().cloned() else { return };
        let name = Symbol::intern(&tok.lexeme);

        if self.engine.const_fold {
            // Constant initializers fold: the name must already carry a
            // value.
            let value = self
                .table
                .find_constant(self.scope, name)
                .or_else(|| self.table.find_variable(self.scope, name))
                .and_then(|info| info.value);
            match value {
                Some(v) => self.engine.push_operand(v),
                None => {
                    self.report(&tok, "constant not valued");
                    self.err = true;
                },
            }
            return;
        }

        if self.check_var(&tok) {
            self.engine.push_operand(Operand::Name(name));
        } else {
            self.err = true;
        }
    }

    fn walk_constant(&mut self, node: &Node) {
        // <constant> wraps <number-const> or <char-const>, which wrap the
        // literal terminal.
        let Some(tok) = node.children.first().and_then(|c| c.leaf_token()) else {
            return;
        };
        let value = literal_operand(tok);
        self.engine.push_operand(value);
    }
}

/// The first terminal token under a node, for error anchoring.
fn first_terminal(node: &Node) -> Option<&Token> {
    node.children
        .iter()
        .find(|c| c.kind == CstKind::Terminal)
        .and_then(|c| c.token.as_ref())
}

/// Collects `(type, name?)` pairs from a parameter list node (both the
/// declaration and definition shapes).
fn collect_params(node: &Node, types: &mut Vec<Symbol>, names: &mut Vec<Option<Token>>) {
    match node.kind {
        CstKind::DeclParam | CstKind::DefParam => {
            let mut name = None;
            for child in &node.children {
                match child.kind {
                    CstKind::VarType => {
                        if let Some(tok) = child.leaf_token() {
                            types.push(Symbol::intern(&tok.lexeme));
                        }
                    },
                    CstKind::Var => name = child.leaf_token().cloned(),
                    CstKind::DeclParam0 | CstKind::DefParam0 => {},
                    _ => {},
                }
            }
            names.push(name);
            for child in &node.children {
                if matches!(child.kind, CstKind::DeclParam0 | CstKind::DefParam0) {
                    for tail in &child.children {
                        collect_params(tail, types, names);
                    }
                }
            }
        },
        CstKind::DeclParams | CstKind::DefParams => {
            for child in &node.children {
                collect_params(child, types, names);
            }
        },
        _ => {},
    }
}

/// Converts a literal token into an IR operand, honoring the numeric
/// bases and exponent forms the lexer produces.
fn literal_operand(tok: &Token) -> Operand {
    let text = tok.lexeme.as_str();
    match tok.kind {
        TokenKind::Integer => Operand::Int(text.parse().unwrap_or(0)),
        TokenKind::Bin => Operand::Int(i64::from_str_radix(&text[2..], 2).unwrap_or(0)),
        TokenKind::Oct => {
            let digits = text.trim_start_matches('0');
            if digits.is_empty() {
                Operand::Int(0)
            } else {
                Operand::Int(i64::from_str_radix(digits, 8).unwrap_or(0))
            }
        },
        TokenKind::Hex => Operand::Int(i64::from_str_radix(&text[2..], 16).unwrap_or(0)),
        TokenKind::FloatNumber => Operand::Float(text.parse().unwrap_or(0.0)),
        TokenKind::Exponent => {
            if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                // Hex binary-exponent form: mantissa p exponent.
                let mut parts = rest.splitn(2, ['p', 'P']);
                let mantissa = parts
                    .next()
                    .and_then(|m| i64::from_str_radix(m, 16).ok())
                    .unwrap_or(0) as f64;
                let exp: i32 = parts.next().and_then(|e| e.parse().ok()).unwrap_or(0);
                Operand::Float(mantissa * 2f64.powi(exp))
            } else {
                Operand::Float(text.parse().unwrap_or(0.0))
            }
        },
        TokenKind::Character => Operand::Char(decode_char(text).unwrap_or('\0')),
        _ => Operand::Int(0),
    }
}
