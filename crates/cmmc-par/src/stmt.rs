//! Statement productions: compound blocks, statement tables, data
//! statements and control flow.

use cmmc_lex::TokenKind;

use crate::cst::{CstKind, Node};
use crate::Parser;

/// Tokens that can start an executable statement.
fn starts_exec_stmt(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LBrace
            | TokenKind::Identifier
            | TokenKind::KwIf
            | TokenKind::KwDo
            | TokenKind::KwWhile
            | TokenKind::KwFor
            | TokenKind::KwReturn
            | TokenKind::KwBreak
            | TokenKind::KwContinue
    )
}

/// Tokens that can start a value declaration. A bare type keyword starts a
/// C-style local (`int x;`).
fn starts_value_decl(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::KwVar | TokenKind::KwConst) || kind.is_var_type()
}

impl Parser<'_> {
    /// A control-statement body: a compound block or a single statement.
    fn body(&mut self) -> (bool, Node) {
        if self.at(TokenKind::LBrace) {
            self.compound()
        } else {
            self.stmt()
        }
    }

    /// `compound := "{" stmt-table? "}"`
    pub(crate) fn compound(&mut self) -> (bool, Node) {
        let name = "<compound>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::Compound);
        match self.expect(TokenKind::LBrace, name, "'{'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        if !self.at(TokenKind::RBrace) && !self.is_finished() {
            let (table_ok, table_node) = self.stmt_table();
            ok &= table_ok;
            root.add(table_node);
        }
        match self.expect(TokenKind::RBrace, name, "'}'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `stmt-table := stmt stmt-table0`
    fn stmt_table(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::StmtTable);
        let (stmt_ok, stmt_node) = self.stmt();
        ok &= stmt_ok;
        root.add(stmt_node);
        let (tail_ok, tail_node) = self.stmt_table0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `stmt-table0 := ε | stmt-table`
    ///
    /// The empty case leaves the node childless, matching the analyzer's
    /// legality check.
    fn stmt_table0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::StmtTable0);
        let kind = self.peek(1).kind;
        if starts_value_decl(kind) || starts_exec_stmt(kind) {
            let (ok, node) = self.stmt_table();
            root.add(node);
            (ok, root)
        } else {
            (true, root)
        }
    }

    /// `stmt := value-decl | exec-stmt`
    ///
    /// Only value declarations are allowed inside a block; a function
    /// declaration here is a syntax error.
    fn stmt(&mut self) -> (bool, Node) {
        let name = "<stmt>";
        let mut root = Node::nonterminal(CstKind::Stmt);
        let kind = self.peek(1).kind;
        if starts_value_decl(kind) {
            let (ok, node) = self.value_decl();
            root.add(node);
            (ok, root)
        } else if starts_exec_stmt(kind) {
            let (ok, node) = self.exec_stmt();
            root.add(node);
            (ok, root)
        } else {
            let tok = self.next();
            self.error(&tok, name, "not a statement");
            (false, root)
        }
    }

    /// `exec-stmt := compound | data-stmt | control-stmt`
    fn exec_stmt(&mut self) -> (bool, Node) {
        let name = "<exec-stmt>";
        let mut root = Node::nonterminal(CstKind::ExecStmt);
        match self.peek(1).kind {
            TokenKind::LBrace => {
                let (ok, node) = self.compound();
                root.add(node);
                (ok, root)
            },
            TokenKind::Identifier => {
                let (ok, node) = self.data_stmt();
                root.add(node);
                (ok, root)
            },
            kind if starts_exec_stmt(kind) => {
                let (ok, node) = self.control_stmt();
                root.add(node);
                (ok, root)
            },
            _ => {
                let tok = self.next();
                self.error(&tok, name, "not an executable statement");
                (false, root)
            },
        }
    }

    /// `data-stmt := assign-stmt | call-stmt`, decided by `peek(2)`.
    fn data_stmt(&mut self) -> (bool, Node) {
        let name = "<data-stmt>";
        let mut root = Node::nonterminal(CstKind::DataStmt);
        match self.peek(2).kind {
            TokenKind::Assign => {
                let (ok, node) = self.assign_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::LParen => {
                let (ok, node) = self.call_stmt();
                root.add(node);
                (ok, root)
            },
            _ => {
                let tok = self.peek(2).clone();
                self.error(&tok, name, "missing '=' or '('");
                // Consume the identifier so recovery makes progress.
                self.next();
                (false, root)
            },
        }
    }

    /// `assign-stmt := assign-expr ";"`
    fn assign_stmt(&mut self) -> (bool, Node) {
        let name = "<assign-stmt>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::AssignStmt);
        let (expr_ok, expr_node) = self.assign_expr();
        ok &= expr_ok;
        root.add(expr_node);
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `assign-expr := var "=" bool-expr`
    pub(crate) fn assign_expr(&mut self) -> (bool, Node) {
        let name = "<assign-expr>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::AssignExpr);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        match self.expect(TokenKind::Assign, name, "'='") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (expr_ok, expr_node) = self.bool_expr();
        ok &= expr_ok;
        root.add(expr_node);
        (ok, root)
    }

    /// `call-stmt := func-call ";"`
    fn call_stmt(&mut self) -> (bool, Node) {
        let name = "<call-stmt>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::CallStmt);
        let (call_ok, call_node) = self.func_call();
        ok &= call_ok;
        root.add(call_node);
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `control-stmt := if | for | while | do-while | return | break ";" |
    /// continue ";"`
    fn control_stmt(&mut self) -> (bool, Node) {
        let name = "<control-stmt>";
        let mut root = Node::nonterminal(CstKind::ControlStmt);
        match self.peek(1).kind {
            TokenKind::KwIf => {
                let (ok, node) = self.if_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwFor => {
                let (ok, node) = self.for_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwWhile => {
                let (ok, node) = self.while_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwDo => {
                let (ok, node) = self.do_while_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwReturn => {
                let (ok, node) = self.return_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwBreak => {
                let (ok, node) = self.break_stmt();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwContinue => {
                let (ok, node) = self.continue_stmt();
                root.add(node);
                (ok, root)
            },
            _ => {
                let tok = self.next();
                self.error(&tok, name, "not a control statement");
                (false, root)
            },
        }
    }

    /// `if := "if" "(" bool-expr ")" compound if-tail`
    fn if_stmt(&mut self) -> (bool, Node) {
        let name = "<if>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::If);
        match self.expect(TokenKind::KwIf, name, "'if'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (cond_ok, cond_node) = self.bool_expr();
        ok &= cond_ok;
        root.add(cond_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (body_ok, body_node) = self.body();
        ok &= body_ok;
        root.add(body_node);
        let (tail_ok, tail_node) = self.if_tail();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `if-tail := ε | "else" if-tail0`
    fn if_tail(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::IfTail);
        if let Some(else_tok) = self.accept(TokenKind::KwElse) {
            root.add(Node::terminal(else_tok));
            let (ok, node) = self.if_tail0();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `if-tail0 := compound | if | stmt`
    fn if_tail0(&mut self) -> (bool, Node) {
        let name = "<if-tail0>";
        let mut root = Node::nonterminal(CstKind::IfTail0);
        match self.peek(1).kind {
            TokenKind::LBrace => {
                let (ok, node) = self.compound();
                root.add(node);
                (ok, root)
            },
            TokenKind::KwIf => {
                let (ok, node) = self.if_stmt();
                root.add(node);
                (ok, root)
            },
            kind if starts_exec_stmt(kind) || starts_value_decl(kind) => {
                let (ok, node) = self.stmt();
                root.add(node);
                (ok, root)
            },
            _ => {
                let tok = self.next();
                self.error(&tok, name, "else missing '{' or 'if'");
                (false, root)
            },
        }
    }

    /// `while := "while" "(" bool-expr ")" compound`
    fn while_stmt(&mut self) -> (bool, Node) {
        let name = "<while>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::While);
        match self.expect(TokenKind::KwWhile, name, "'while'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (cond_ok, cond_node) = self.bool_expr();
        ok &= cond_ok;
        root.add(cond_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (body_ok, body_node) = self.body();
        ok &= body_ok;
        root.add(body_node);
        (ok, root)
    }

    /// `do-while := "do" compound "while" "(" bool-expr ")" ";"`
    fn do_while_stmt(&mut self) -> (bool, Node) {
        let name = "<do-while>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::DoWhile);
        match self.expect(TokenKind::KwDo, name, "'do'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (body_ok, body_node) = self.body();
        ok &= body_ok;
        root.add(body_node);
        match self.expect(TokenKind::KwWhile, name, "'while'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (cond_ok, cond_node) = self.bool_expr();
        ok &= cond_ok;
        root.add(cond_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `for := "for" "(" assign-expr ";" bool-expr ";" assign-expr ")"
    /// compound`
    fn for_stmt(&mut self) -> (bool, Node) {
        let name = "<for>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::For);
        match self.expect(TokenKind::KwFor, name, "'for'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (init_ok, init_node) = self.assign_expr();
        ok &= init_ok;
        root.add(init_node);
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (cond_ok, cond_node) = self.bool_expr();
        ok &= cond_ok;
        root.add(cond_node);
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (step_ok, step_node) = self.assign_expr();
        ok &= step_ok;
        root.add(step_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (body_ok, body_node) = self.body();
        ok &= body_ok;
        root.add(body_node);
        (ok, root)
    }

    /// `return := "return" return0`
    fn return_stmt(&mut self) -> (bool, Node) {
        let name = "<return>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::Return);
        match self.expect(TokenKind::KwReturn, name, "'return'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (tail_ok, tail_node) = self.return0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `return0 := ";" | bool-expr ";"`
    fn return0(&mut self) -> (bool, Node) {
        let name = "<return0>";
        let mut root = Node::nonterminal(CstKind::Return0);
        if let Some(semi) = self.accept(TokenKind::Semicolon) {
            root.add(Node::terminal(semi));
            return (true, root);
        }
        let mut ok = true;
        let (expr_ok, expr_node) = self.bool_expr();
        ok &= expr_ok;
        root.add(expr_node);
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `break := "break" ";"`
    fn break_stmt(&mut self) -> (bool, Node) {
        let name = "<break>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::Break);
        match self.expect(TokenKind::KwBreak, name, "'break'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `continue := "continue" ";"`
    fn continue_stmt(&mut self) -> (bool, Node) {
        let name = "<continue>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::Continue);
        match self.expect(TokenKind::KwContinue, name, "'continue'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        match self.expect(TokenKind::Semicolon, name, "';'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }
}
