//! Expression productions.
//!
//! The grammar is stratified so that precedence falls out of the
//! production structure: `bool-expr` (‖) over `bool-term` (&&) over
//! `bool-factor` (relational) over `arith-expr` (+/−) over `term` (*, /, %)
//! over `factor`. Left recursion is already eliminated; each stratum has a
//! `…0` tail carrying the operator repetitions, and the analyzer walks the
//! tree in source order feeding its operator-precedence stacks.

use cmmc_lex::TokenKind;

use crate::cst::{CstKind, Node};
use crate::Parser;

impl Parser<'_> {
    /// `bool-expr := bool-term bool-expr0`
    pub(crate) fn bool_expr(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::BoolExpr);
        let (term_ok, term_node) = self.bool_term();
        ok &= term_ok;
        root.add(term_node);
        let (tail_ok, tail_node) = self.bool_expr0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `bool-expr0 := ε | "||" bool-term bool-expr0`
    fn bool_expr0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::BoolExpr0);
        if let Some(or) = self.accept(TokenKind::OrOr) {
            let mut ok = true;
            root.add(Node::terminal(or));
            let (term_ok, term_node) = self.bool_term();
            ok &= term_ok;
            root.add(term_node);
            let (tail_ok, tail_node) = self.bool_expr0();
            ok &= tail_ok;
            root.add(tail_node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `bool-term := bool-factor bool-term0`
    fn bool_term(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::BoolTerm);
        let (factor_ok, factor_node) = self.bool_factor();
        ok &= factor_ok;
        root.add(factor_node);
        let (tail_ok, tail_node) = self.bool_term0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `bool-term0 := ε | "&&" bool-factor bool-term0`
    fn bool_term0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::BoolTerm0);
        if let Some(and) = self.accept(TokenKind::AndAnd) {
            let mut ok = true;
            root.add(Node::terminal(and));
            let (factor_ok, factor_node) = self.bool_factor();
            ok &= factor_ok;
            root.add(factor_node);
            let (tail_ok, tail_node) = self.bool_term0();
            ok &= tail_ok;
            root.add(tail_node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `bool-factor := arith-expr bool-factor0`
    fn bool_factor(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::BoolFactor);
        let (expr_ok, expr_node) = self.arith_expr();
        ok &= expr_ok;
        root.add(expr_node);
        let (tail_ok, tail_node) = self.bool_factor0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `bool-factor0 := ε | rel-op arith-expr`
    fn bool_factor0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::BoolFactor0);
        if self.peek(1).kind.is_rel_op() {
            let mut ok = true;
            let (op_ok, op_node) = self.rel_op();
            ok &= op_ok;
            root.add(op_node);
            let (expr_ok, expr_node) = self.arith_expr();
            ok &= expr_ok;
            root.add(expr_node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `rel-op := "<" | "<=" | ">" | ">=" | "==" | "!="`
    fn rel_op(&mut self) -> (bool, Node) {
        let name = "<rel-op>";
        let mut root = Node::nonterminal(CstKind::RelOp);
        let tok = self.next();
        if tok.kind.is_rel_op() {
            root.add(Node::terminal(tok));
            (true, root)
        } else {
            self.error(&tok, name, "missing relational operator");
            (false, root)
        }
    }

    /// `arith-expr := term arith-expr0`
    pub(crate) fn arith_expr(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::ArithExpr);
        let (term_ok, term_node) = self.term();
        ok &= term_ok;
        root.add(term_node);
        let (tail_ok, tail_node) = self.arith_expr0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `arith-expr0 := ε | ("+"|"-") term arith-expr0`
    fn arith_expr0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::ArithExpr0);
        if matches!(self.peek(1).kind, TokenKind::Plus | TokenKind::Minus) {
            let mut ok = true;
            root.add(Node::terminal(self.next()));
            let (term_ok, term_node) = self.term();
            ok &= term_ok;
            root.add(term_node);
            let (tail_ok, tail_node) = self.arith_expr0();
            ok &= tail_ok;
            root.add(tail_node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `term := factor term0`
    fn term(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::Term);
        let (factor_ok, factor_node) = self.factor();
        ok &= factor_ok;
        root.add(factor_node);
        let (tail_ok, tail_node) = self.term0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `term0 := ε | ("*"|"/"|"%") factor term0`
    fn term0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::Term0);
        if matches!(
            self.peek(1).kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            let mut ok = true;
            root.add(Node::terminal(self.next()));
            let (factor_ok, factor_node) = self.factor();
            ok &= factor_ok;
            root.add(factor_node);
            let (tail_ok, tail_node) = self.term0();
            ok &= tail_ok;
            root.add(tail_node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }

    /// `factor := "(" bool-expr ")" | constant | var | func-call |
    /// ("+"|"-"|"!") factor`
    ///
    /// Identifier-vs-call needs the second lookahead token; parentheses
    /// wrap a full boolean expression so that grouped conditions
    /// (`(a>0||b>0) && c`) parse.
    pub(crate) fn factor(&mut self) -> (bool, Node) {
        let name = "<factor>";
        let mut root = Node::nonterminal(CstKind::Factor);
        let tok = self.peek(1);
        match tok.kind {
            TokenKind::LParen => {
                let mut ok = true;
                root.add(Node::terminal(self.next()));
                let (expr_ok, expr_node) = self.bool_expr();
                ok &= expr_ok;
                root.add(expr_node);
                match self.expect(TokenKind::RParen, name, "')'") {
                    Some(node) => root.add(node),
                    None => ok = false,
                }
                (ok, root)
            },
            kind if kind.is_const_literal() => {
                let (ok, node) = self.constant();
                root.add(node);
                (ok, root)
            },
            TokenKind::Identifier => {
                if self.peek(2).kind == TokenKind::LParen {
                    let (ok, node) = self.func_call();
                    root.add(node);
                    (ok, root)
                } else {
                    let (ok, node) = self.var();
                    root.add(node);
                    (ok, root)
                }
            },
            TokenKind::Plus | TokenKind::Minus | TokenKind::Bang => {
                let (ok, node) = self.factor0();
                root.add(node);
                (ok, root)
            },
            _ => {
                let bad = self.next();
                self.error(&bad, name, "not a factor");
                (false, root)
            },
        }
    }

    /// `factor0 := ("+"|"-"|"!") factor`
    fn factor0(&mut self) -> (bool, Node) {
        let name = "<factor0>";
        let mut root = Node::nonterminal(CstKind::Factor0);
        let tok = self.next();
        let mut ok = true;
        if matches!(tok.kind, TokenKind::Plus | TokenKind::Minus | TokenKind::Bang) {
            root.add(Node::terminal(tok));
        } else {
            self.error(&tok, name, "missing '+', '-' or '!'");
            ok = false;
        }
        let (factor_ok, factor_node) = self.factor();
        ok &= factor_ok;
        root.add(factor_node);
        (ok, root)
    }

    /// `constant := number-const | char-const`
    fn constant(&mut self) -> (bool, Node) {
        let name = "<constant>";
        let mut root = Node::nonterminal(CstKind::Constant);
        let kind = self.peek(1).kind;
        if kind == TokenKind::Character {
            let mut inner = Node::nonterminal(CstKind::CharConst);
            inner.add(Node::terminal(self.next()));
            root.add(inner);
            (true, root)
        } else if kind.is_const_literal() {
            let mut inner = Node::nonterminal(CstKind::NumberConst);
            inner.add(Node::terminal(self.next()));
            root.add(inner);
            (true, root)
        } else {
            let tok = self.next();
            self.error(&tok, name, "missing constant");
            (false, root)
        }
    }

    /// `func-call := var "(" args ")"`
    pub(crate) fn func_call(&mut self) -> (bool, Node) {
        let name = "<func-call>";
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::FuncCall);
        let (var_ok, var_node) = self.var();
        ok &= var_ok;
        root.add(var_node);
        match self.expect(TokenKind::LParen, name, "'('") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        let (args_ok, args_node) = self.args();
        ok &= args_ok;
        root.add(args_node);
        match self.expect(TokenKind::RParen, name, "')'") {
            Some(node) => root.add(node),
            None => ok = false,
        }
        (ok, root)
    }

    /// `args := ε | arg`
    fn args(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::Args);
        if self.at(TokenKind::RParen) {
            root.add(Node::epsilon());
            (true, root)
        } else {
            let (ok, node) = self.arg();
            root.add(node);
            (ok, root)
        }
    }

    /// `arg := bool-expr arg0`
    fn arg(&mut self) -> (bool, Node) {
        let mut ok = true;
        let mut root = Node::nonterminal(CstKind::Arg);
        let (expr_ok, expr_node) = self.bool_expr();
        ok &= expr_ok;
        root.add(expr_node);
        let (tail_ok, tail_node) = self.arg0();
        ok &= tail_ok;
        root.add(tail_node);
        (ok, root)
    }

    /// `arg0 := ε | "," arg`
    fn arg0(&mut self) -> (bool, Node) {
        let mut root = Node::nonterminal(CstKind::Arg0);
        if let Some(comma) = self.accept(TokenKind::Comma) {
            root.add(Node::terminal(comma));
            let (ok, node) = self.arg();
            root.add(node);
            (ok, root)
        } else {
            root.add(Node::epsilon());
            (true, root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_lex::{strip_comments, tokenize};
    use cmmc_util::Handler;

    fn parse_expr(source: &str) -> (bool, Node, Handler) {
        let lex_handler = Handler::new();
        let tokens = strip_comments(tokenize(source, &lex_handler));
        let handler = Handler::new();
        let mut parser = Parser::new(tokens, &handler);
        let (ok, node) = parser.bool_expr();
        (ok, node, handler)
    }

    #[test]
    fn test_simple_arith() {
        let (ok, node, handler) = parse_expr("2*3 + 4");
        assert!(ok);
        assert!(!handler.has_errors());
        assert_eq!(node.kind, CstKind::BoolExpr);
    }

    #[test]
    fn test_relational() {
        let (ok, _, handler) = parse_expr("a > 0");
        assert!(ok);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_short_circuit_chain() {
        let (ok, _, handler) = parse_expr("a > 0 && b < 5 || !c");
        assert!(ok);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_unary_chain() {
        let (ok, _, handler) = parse_expr("- - x");
        assert!(ok);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_call_in_expression() {
        let (ok, _, handler) = parse_expr("f(1, g(2)) + 3");
        assert!(ok);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_parenthesized_bool() {
        let (ok, _, handler) = parse_expr("(a > 0 || b > 0) && c < 1");
        assert!(ok);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_missing_operand_reports() {
        let (_, _, handler) = parse_expr("1 + ;");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_char_constant() {
        let (ok, _, handler) = parse_expr("'a'");
        assert!(ok);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_epsilon_tails_present() {
        let (_, node, _) = parse_expr("x");
        // bool-expr0 tail of a bare identifier must be an ε leaf
        let tail = &node.children[1];
        assert_eq!(tail.kind, CstKind::BoolExpr0);
        assert!(!tail.is_legal());
    }
}
