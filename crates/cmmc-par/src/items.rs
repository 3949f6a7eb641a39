//! Top-level productions: the program, declarations, and function
//! definitions.

use cmmc_lex::TokenKind;

use crate::cst::{CstKind, Node};
use crate::Parser;

impl Parser<'_> {
    /// `program := decl-stmt* [func-type] "main" "(" ")" compound func-block`
    ///
    /// Declarations run until `main` shows up, either bare or behind an
    /// optional return type (`int main()`); the type leaf is kept in the
    /// tree and the analyzer decides what to make of it.
    pub fn program(&mut self) -> Node {
        let name = "<program>";
        let mut root = Node::nonterminal(CstKind::Program);

        loop {
            let tok = self.peek(1);
            if tok.kind == TokenKind::KwMain
                || (tok.kind.is_func_type() && self.peek(2).kind == TokenKind::KwMain)
                || tok.kind == TokenKind::Eof
            {
                break;
            }
            let before = self.cursor();
            let (_, node) = self.decl_stmt();
            if !node.is_legal() && self.cursor() == before {
                // No production matched and nothing was consumed; skip the
                // offender so the loop cannot stall.
                let bad = self.next();
                self.error(&bad, name, "unexpected token before main");
                continue;
            }
            root.add(node);
        }

        if self.peek(1).kind.is_func_type() {
            root.add(Node::terminal(self.next()));
        }
        if let Some(node) = self.expect(TokenKind::KwMain, name, "main function") {
            root.add(node);
        }
        if let Some(node) = self.expect(TokenKind::LParen, name, "'('") {
            root.add(node);
        }
        if let Some(node) = self.expect(TokenKind::RParen, name, "')'") {
            root.add(node);
        }
        let (_, compound) = self.compound();
        root.add(compound);
        let (_, block) = self.func_block();
        root.add(block);
        root
    }

    /// `decl-stmt := value-decl | func-decl-stmt | func-def | ε`
    ///
    /// A leading type keyword is ambiguous between a global variable
    /// (`int x;`), a prototype (`int f(int);`) and a definition placed
    /// before `main` (`int f(int x) { … }`). The first two are separated
    /// by `peek(3)`; the last two by what follows the parameter list.
    pub(crate) fn decl_stmt(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::DeclStmt);
        let tok = self.peek(1);
        if matches!(tok.kind, TokenKind::KwVar | TokenKind::KwConst) {
            let (ok, node) = self.value_decl();
            root.add(node);
            (ok, root)
        } else if tok.kind.is_func_type() {
            if self.peek(2).kind == TokenKind::Identifier
                && self.peek(3).kind != TokenKind::LParen
            {
                let (ok, node) = self.value_decl();
                root.add(node);
                return (ok, root);
            }
            let (ok, node) = self.func_decl_or_def();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// Parses a function head, then decides between a prototype
    /// (`… ;` → func-decl-stmt) and an early definition (`… { }` →
    /// func-def).
    fn func_decl_or_def(&mut self) -> (bool, Node) {
        let name = "<func-decl-stmt>";
        let (mut ok, head) = self.func_decl();
        if self.at(TokenKind::LBrace) {
            let mut root = Node::nonterminal(CstKind::FuncDef);
            for child in head.children {
                root.add(child);
            }
            let (body_ok, body_node) = self.compound();
            ok &= body_ok;
            root.add(body_node);
            (ok, root)
        } else {
            let mut root = Node::nonterminal(CstKind::FuncDeclStmt);
            root.add(head);
            match self.expect(TokenKind::Semicolon, name, "';'") {
                Some(node) => root.add(node),
                None => ok = false,
            }
            (ok, root)
        }
    }

    /// `value-decl := const-decl | var-decl`
    pub(crate) fn value_decl(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::ValueDecl);
        if self.at(TokenKind::KwConst) {
            let (ok, node) = self.const_decl();
            root.add(node);
            (ok, root)
        } else {
            let (ok, node) = self.var_decl();
            root.add(node);
            (ok, root)
        }
    }

    /// `const-decl := "const" const-type const-table`
    fn const_decl(&mut self) -> (bool, Node) {
        let name = "<const-decl>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::ConstDecl);
        match self.expect(TokenKind::KwConst, name, "'const'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (type_ok, type_node) = self.const_type();
        ok &= type_ok;
        root.add(type_node);
        let (table_ok, table_node) = self.const_table();
        ok &= table_ok;
        root.add(table_node);
        (ok, root)
    }

    /// `const-type := "int" | "float" | "char"`
    fn const_type(&mut self) -> (bool, Node) {
        let name = "<const-type>";
        let mut root = Node::nonterminal(CstKind::ConstType);
        let tok = self.next();
        if tok.kind.is_var_type() {
            root.add(Node::terminal(tok));
            (true, root)
        } else {
            self.error(&tok, name, "missing constant type");
            (false, root)
        }
    }

    /// `const-table := var "=" const-table0`
    fn const_table(&mut self) -> (bool, Node) {
        let name = "<const-table>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::ConstTable);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        match self.expect(TokenKind::Assign, name, "'='") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (tail_ok, tail_node) = self.const_table0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `const-table0 := const-value const-table1`
    fn const_table0(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::ConstTable0);
        let (value_ok, value_node) = self.const_value();
        ok &= value_ok;
        root.add(value_node);
        let (tail_ok, tail_node) = self.const_table1();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `const-table1 := ";" | "," const-table`
    fn const_table1(&mut self) -> (bool, Node) {
        let name = "<const-table1>";
        let mut root = Node::nonterminal(CstKind::ConstTable1);
        let tok = self.next();
        match tok.kind {
            TokenKind::Semicolon => {
                root.add(Node::terminal(tok));
                (true, root)
            },
            TokenKind::Comma => {
                root.add(Node::terminal(tok));
                let (ok, node) = self.const_table();
                root.add(node);
                (ok, root)
            },
            _ => {
                self.backup();
                self.error(&tok, name, "missing ';' or ','");
                (false, root)
            },
        }
    }

    /// `const-value := arith-expr`
    ///
    /// The analyzer folds the expression to a literal; operands must be
    /// literals or already-valued constants.
    fn const_value(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::ConstValue);
        let (ok, node) = self.arith_expr();
        root.add(node);
        (ok, root)
    }

    /// `var-decl := ["var"] var-type var-table`
    ///
    /// The `var` keyword is optional so that C-style declarations
    /// (`int x;`) work both at top level and inside blocks.
    fn var_decl(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::VarDecl);
        if let Some(kw) = self.accept(TokenKind::KwVar) {
            root.add(Node::terminal(kw));
        }
        let (type_ok, type_node) = self.var_type();
        ok &= type_ok;
        root.add(type_node);
        let (table_ok, table_node) = self.var_table();
        ok &= table_ok;
        root.add(table_node);
        (ok, root)
    }

    /// `var-type := "int" | "float" | "char"`
    pub(crate) fn var_type(&mut self) -> (bool, Node) {
        let name = "<var-type>";
        let mut root = Node::nonterminal(CstKind::VarType);
        let tok = self.next();
        if tok.kind.is_var_type() {
            root.add(Node::terminal(tok));
            (true, root)
        } else {
            self.error(&tok, name, "missing variable type");
            (false, root)
        }
    }

    /// `var-table := single-var var-table0`
    fn var_table(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::VarTable);
        let (sv_ok, sv_node) = self.single_var();
        ok &= sv_ok;
        root.add(sv_node);
        let (tail_ok, tail_node) = self.var_table0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `single-var := var single-var0`
    fn single_var(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::SingleVar);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        let (init_ok, init_node) = self.single_var0();
        ok &= init_ok;
        root.add(init_node);
        (ok, root)
    }

    /// `single-var0 := ε | "=" bool-expr`
    fn single_var0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::SingleVar0);
        if let Some(eq) = self.accept(TokenKind::Assign) {
            root.add(Node::terminal(eq));
            let (ok, node) = self.bool_expr();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `var-table0 := ";" | "," var-table`
    fn var_table0(&mut self) -> (bool, Node) {
        let name = "<var-table0>";
        let mut root = Node::nonterminal(CstKind::VarTable0);
        let tok = self.next();
        match tok.kind {
            TokenKind::Semicolon => {
                root.add(Node::terminal(tok));
                (true, root)
            },
            TokenKind::Comma => {
                root.add(Node::terminal(tok));
                let (ok, node) = self.var_table();
                root.add(node);
                (ok, root)
            },
            _ => {
                self.backup();
                self.error(&tok, name, "missing ';' or ','");
                (false, root)
            },
        }
    }

    /// `func-decl := func-type var "(" decl-params ")"`
    fn func_decl(&mut self) -> (bool, Node) {
        let name = "<func-decl>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::FuncDecl);
        let (type_ok, type_node) = self.func_type();
        ok &= type_ok;
        root.add(type_node);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (params_ok, params_node) = self.decl_params();
        ok &= params_ok;
        root.add(params_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `func-type := "int" | "float" | "char" | "void"`
    pub(crate) fn func_type(&mut self) -> (bool, Node) {
        let name = "<func-type>";
        let mut root = Node::nonterminal(CstKind::FuncType);
        let tok = self.next();
        if tok.kind.is_func_type() {
            root.add(Node::terminal(tok));
            (true, root)
        } else {
            self.error(&tok, name, "missing function type");
            (false, root)
        }
    }

    /// `decl-params := ε | decl-param`
    fn decl_params(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::DeclParams);
        if self.peek(1).kind.is_var_type() {
            let (ok, node) = self.decl_param();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `decl-param := var-type [var] decl-param0`
    ///
    /// The parameter name is optional in a prototype and carries no
    /// meaning; only the type list is recorded.
    fn decl_param(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::DeclParam);
        let (type_ok, type_node) = self.var_type();
        ok &= type_ok;
        root.add(type_node);
        if self.at(TokenKind::Identifier) {
            let (var_ok, var_node) = self.var();
            ok &= var_ok;
            root.add(var_node);
        }
        let (tail_ok, tail_node) = self.decl_param0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `decl-param0 := ε | "," decl-param`
    fn decl_param0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::DeclParam0);
        if let Some(comma) = self.accept(TokenKind::Comma) {
            root.add(Node::terminal(comma));
            let (ok, node) = self.decl_param();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `func-block := ε | func-def func-block`
    pub(crate) fn func_block(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::FuncBlock);
        if !self.peek(1).kind.is_func_type() {
            root.add(Node::epsilon());
            return (true, root);
        }
        let mut ok = true;
        let (def_ok, def_node) = self.func_def();
        ok &= def_ok;
        root.add(def_node);
        let (rest_ok, rest_node) = self.func_block();
        ok &= rest_ok;
        root.add(rest_node);
        (ok, root)
    }

    /// `func-def := func-type var "(" def-params ")" compound`
    fn func_def(&mut self) -> (bool, Node) {
        let name = "<func-def>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::FuncDef);
        let (type_ok, type_node) = self.func_type();
        ok &= type_ok;
        root.add(type_node);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (params_ok, params_node) = self.def_params();
        ok &= params_ok;
        root.add(params_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (body_ok, body_node) = self.compound();
        ok &= body_ok;
        root.add(body_node);
        (ok, root)
    }

    /// `def-params := ε | def-param`
    fn def_params(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::DefParams);
        if self.peek(1).kind.is_var_type() {
            let (ok, node) = self.def_param();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `def-param := var-type var def-param0`
    fn def_param(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::DefParam);
        let (type_ok, type_node) = self.var_type();
        ok &= type_ok;
        root.add(type_node);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        let (tail_ok, tail_node) = self.def_param0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `def-param0 := ε | "," def-param`
    fn def_param0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::DefParam0);
        if let Some(comma) = self.accept(TokenKind::Comma) {
            root.add(Node::terminal(comma));
            let (ok, node) = self.def_param();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `var := identifier`
    pub(crate) fn var(&mut self) -> (bool, Node) {
        let name = "<var>";
        let mut root = Node::nonterminal(CstKind::Var);
        let tok = self.next();
        if tok.kind == TokenKind::Identifier {
            root.add(Node::terminal(tok));
            (true, root)
        } else {
            self.error(&tok, name, "missing identifier");
            (false, root)
        }
    }
}
