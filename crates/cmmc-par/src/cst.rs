//! Concrete syntax tree.
//!
//! The tree preserves the production structure verbatim: every nonterminal
//! the parser went through becomes a node, terminals keep their tokens, and
//! ε-productions leave an explicit ε leaf. The analyzer dispatches on
//! [`CstKind`] and walks children in source order, so nothing may be
//! flattened or reassociated here.

use std::fmt;

use cmmc_lex::Token;

/// Node kinds: one per grammar production, plus terminal and ε leaves.
///
/// The `…0`/`…1` variants are the tail productions left by eliminating
/// left recursion (`arith-expr0` is `{ ("+"|"-") term }` and so on).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CstKind {
    Program,
    DeclStmt,
    ValueDecl,
    ConstDecl,
    ConstType,
    ConstTable,
    ConstTable0,
    ConstTable1,
    ConstValue,
    Var,
    Constant,
    NumberConst,
    CharConst,
    VarDecl,
    VarType,
    VarTable,
    VarTable0,
    SingleVar,
    SingleVar0,
    FuncDeclStmt,
    FuncDecl,
    FuncType,
    DeclParams,
    DeclParam,
    DeclParam0,
    FuncBlock,
    FuncDef,
    DefParams,
    DefParam,
    DefParam0,
    Compound,
    StmtTable,
    StmtTable0,
    Stmt,
    ExecStmt,
    DataStmt,
    AssignStmt,
    AssignExpr,
    CallStmt,
    FuncCall,
    Args,
    Arg,
    Arg0,
    ControlStmt,
    If,
    IfTail,
    IfTail0,
    While,
    DoWhile,
    For,
    Return,
    Return0,
    Break,
    Continue,
    BoolExpr,
    BoolExpr0,
    BoolTerm,
    BoolTerm0,
    BoolFactor,
    BoolFactor0,
    RelOp,
    ArithExpr,
    ArithExpr0,
    Term,
    Term0,
    Factor,
    Factor0,
    /// A terminal leaf; the node's token holds position, kind and lexeme.
    Terminal,
    /// An ε leaf marking an empty production.
    Epsilon,
}

impl CstKind {
    /// The symbolic name used by the tree dump.
    pub fn name(self) -> &'static str {
        use CstKind::*;
        match self {
            Program => "<program>",
            DeclStmt => "<decl-stmt>",
            ValueDecl => "<value-decl>",
            ConstDecl => "<const-decl>",
            ConstType => "<const-type>",
            ConstTable => "<const-table>",
            ConstTable0 => "<const-table0>",
            ConstTable1 => "<const-table1>",
            ConstValue => "<const-value>",
            Var => "<var>",
            Constant => "<constant>",
            NumberConst => "<number-const>",
            CharConst => "<char-const>",
            VarDecl => "<var-decl>",
            VarType => "<var-type>",
            VarTable => "<var-table>",
            VarTable0 => "<var-table0>",
            SingleVar => "<single-var>",
            SingleVar0 => "<single-var0>",
            FuncDeclStmt => "<func-decl-stmt>",
            FuncDecl => "<func-decl>",
            FuncType => "<func-type>",
            DeclParams => "<decl-params>",
            DeclParam => "<decl-param>",
            DeclParam0 => "<decl-param0>",
            FuncBlock => "<func-block>",
            FuncDef => "<func-def>",
            DefParams => "<def-params>",
            DefParam => "<def-param>",
            DefParam0 => "<def-param0>",
            Compound => "<compound>",
            StmtTable => "<stmt-table>",
            StmtTable0 => "<stmt-table0>",
            Stmt => "<stmt>",
            ExecStmt => "<exec-stmt>",
            DataStmt => "<data-stmt>",
            AssignStmt => "<assign-stmt>",
            AssignExpr => "<assign-expr>",
            CallStmt => "<call-stmt>",
            FuncCall => "<func-call>",
            Args => "<args>",
            Arg => "<arg>",
            Arg0 => "<arg0>",
            ControlStmt => "<control-stmt>",
            If => "<if>",
            IfTail => "<if-tail>",
            IfTail0 => "<if-tail0>",
            While => "<while>",
            DoWhile => "<do-while>",
            For => "<for>",
            Return => "<return>",
            Return0 => "<return0>",
            Break => "<break>",
            Continue => "<continue>",
            BoolExpr => "<bool-expr>",
            BoolExpr0 => "<bool-expr0>",
            BoolTerm => "<bool-term>",
            BoolTerm0 => "<bool-term0>",
            BoolFactor => "<bool-factor>",
            BoolFactor0 => "<bool-factor0>",
            RelOp => "<rel-op>",
            ArithExpr => "<arith-expr>",
            ArithExpr0 => "<arith-expr0>",
            Term => "<term>",
            Term0 => "<term0>",
            Factor => "<factor>",
            Factor0 => "<factor0>",
            Terminal => "",
            Epsilon => "ε",
        }
    }
}

/// A syntax tree node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: CstKind,
    /// The token for terminal leaves; `None` on nonterminals and ε.
    pub token: Option<Token>,
    pub children: Vec<Node>,
}

impl Node {
    /// Creates an empty nonterminal node.
    pub fn nonterminal(kind: CstKind) -> Node {
        Node {
            kind,
            token: None,
            children: Vec::new(),
        }
    }

    /// Creates a terminal leaf for a token.
    pub fn terminal(token: Token) -> Node {
        Node {
            kind: CstKind::Terminal,
            token: Some(token),
            children: Vec::new(),
        }
    }

    /// Creates an ε leaf.
    pub fn epsilon() -> Node {
        Node {
            kind: CstKind::Epsilon,
            token: None,
            children: Vec::new(),
        }
    }

    /// Appends a child.
    pub fn add(&mut self, child: Node) {
        self.children.push(child);
    }

    /// The display label of this node: nonterminal name, terminal lexeme,
    /// or ε.
    pub fn label(&self) -> &str {
        match self.kind {
            CstKind::Terminal => self
                .token
                .as_ref()
                .map(|t| t.lexeme.as_str())
                .unwrap_or(""),
            kind => kind.name(),
        }
    }

    /// True when the node carries actual content: it has children and the
    /// first child is not ε. The analyzer skips nodes that fail this.
    pub fn is_legal(&self) -> bool {
        !self.children.is_empty() && self.children[0].kind != CstKind::Epsilon
    }

    /// The terminal token of this node's first child, if any. Convenience
    /// for `<var>`/`<constant>`-shaped wrappers.
    pub fn leaf_token(&self) -> Option<&Token> {
        self.children.first().and_then(|c| c.token.as_ref())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Renders the tree dump with box-drawing connectors, one node per line.
pub fn dump_tree(root: &Node) -> String {
    let mut out = String::new();
    render(root, "", true, &mut out);
    out
}

fn render(node: &Node, prefix: &str, is_last: bool, out: &mut String) {
    let connector = if is_last { "└── " } else { "├── " };
    out.push_str(prefix);
    out.push_str(connector);
    out.push_str(node.label());
    out.push('\n');

    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
    for (i, child) in node.children.iter().enumerate() {
        render(child, &child_prefix, i == node.children.len() - 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_lex::TokenKind;
    use cmmc_util::Pos;

    fn tok(lexeme: &str, kind: TokenKind) -> Token {
        Token::new(Pos::new(1, 0), kind, lexeme)
    }

    #[test]
    fn test_labels() {
        assert_eq!(Node::nonterminal(CstKind::Program).label(), "<program>");
        assert_eq!(Node::epsilon().label(), "ε");
        assert_eq!(
            Node::terminal(tok("x", TokenKind::Identifier)).label(),
            "x"
        );
    }

    #[test]
    fn test_is_legal() {
        let mut node = Node::nonterminal(CstKind::DeclStmt);
        assert!(!node.is_legal());
        node.add(Node::epsilon());
        assert!(!node.is_legal());

        let mut other = Node::nonterminal(CstKind::Var);
        other.add(Node::terminal(tok("x", TokenKind::Identifier)));
        assert!(other.is_legal());
    }

    #[test]
    fn test_dump_shape() {
        let mut root = Node::nonterminal(CstKind::Program);
        let mut var = Node::nonterminal(CstKind::Var);
        var.add(Node::terminal(tok("x", TokenKind::Identifier)));
        root.add(var);
        root.add(Node::epsilon());

        let dump = dump_tree(&root);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "└── <program>");
        assert_eq!(lines[1], "    ├── <var>");
        assert_eq!(lines[2], "    │   └── x");
        assert_eq!(lines[3], "    └── ε");
    }

    #[test]
    fn test_leaf_token() {
        let mut var = Node::nonterminal(CstKind::Var);
        var.add(Node::terminal(tok("count", TokenKind::Identifier)));
        assert_eq!(var.leaf_token().unwrap().lexeme, "count");
    }
}
