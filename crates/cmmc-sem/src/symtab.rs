//! Symbol tables.
//!
//! Three disjoint tables: variables and constants are per-scope maps,
//! functions live in one flat table. A scope is either the global scope or
//! one function; block-local variables are stored in their function's map
//! with the nesting level they were declared at, so redeclaring a name
//! deeper inside the same function reports a redefinition (the resolution
//! rule is current scope, then global, nothing in between).
//!
//! All maps are insertion-ordered so the symbol-table dump is
//! deterministic.

use std::fmt;

use cmmc_ir::Operand;
use cmmc_util::Symbol;
use indexmap::IndexMap;

/// A name-resolution scope: the global scope or one function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The global scope, rendered `@all` in dumps.
    Global,
    /// A function scope.
    Func(Symbol),
}

impl Scope {
    /// The dump name of this scope.
    pub fn name(self) -> &'static str {
        match self {
            Scope::Global => "@all",
            Scope::Func(f) => f.as_str(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One symbol-table entry.
#[derive(Clone, Debug)]
pub struct Info {
    pub scope: Scope,
    pub name: Symbol,
    /// Declared type name (`int`, `float`, `char`, `void`).
    pub ty: Symbol,
    /// Recorded value, when one is known (constants always, variables
    /// after a literal initializer).
    pub value: Option<Operand>,
    /// Nesting level of the declaration; 0 is global.
    pub level: i32,
    /// Parameter types, for functions.
    pub param_types: Vec<Symbol>,
    /// Parameter names in declared order, filled in at definition.
    pub param_names: Vec<Symbol>,
    /// Whether an initializer was present.
    pub initialized: bool,
    /// Whether the function body has been seen.
    pub defined: bool,
    /// Whether this variable is a formal parameter.
    pub is_param: bool,
}

impl Info {
    /// Creates an entry with everything beyond the identity defaulted.
    pub fn new(scope: Scope, name: Symbol, ty: Symbol, level: i32) -> Self {
        Self {
            scope,
            name,
            ty,
            value: None,
            level,
            param_types: Vec::new(),
            param_names: Vec::new(),
            initialized: false,
            defined: false,
            is_param: false,
        }
    }

    fn value_text(&self) -> String {
        match &self.value {
            Some(v) => v.to_string(),
            None => "<nil>".to_string(),
        }
    }

    fn row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.scope,
            self.level,
            self.name,
            self.ty,
            self.value_text()
        )
    }
}

/// The three tables.
#[derive(Debug, Default)]
pub struct SymbolTable {
    vars: IndexMap<Scope, IndexMap<Symbol, Info>>,
    consts: IndexMap<Scope, IndexMap<Symbol, Info>>,
    funcs: IndexMap<Symbol, Info>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure the variable and constant maps for a scope exist.
    pub fn ensure_scope(&mut self, scope: Scope) {
        self.vars.entry(scope).or_default();
        self.consts.entry(scope).or_default();
    }

    pub fn add_variable(&mut self, info: Info) {
        self.vars.entry(info.scope).or_default().insert(info.name, info);
    }

    pub fn add_constant(&mut self, info: Info) {
        self.consts
            .entry(info.scope)
            .or_default()
            .insert(info.name, info);
    }

    pub fn add_function(&mut self, info: Info) {
        self.funcs.insert(info.name, info);
    }

    /// Resolves a variable: the given scope first, then global.
    pub fn find_variable(&self, scope: Scope, name: Symbol) -> Option<&Info> {
        self.vars
            .get(&scope)
            .and_then(|t| t.get(&name))
            .or_else(|| self.vars.get(&Scope::Global).and_then(|t| t.get(&name)))
    }

    pub fn find_variable_mut(&mut self, scope: Scope, name: Symbol) -> Option<&mut Info> {
        if self
            .vars
            .get(&scope)
            .map(|t| t.contains_key(&name))
            .unwrap_or(false)
        {
            return self.vars.get_mut(&scope).and_then(|t| t.get_mut(&name));
        }
        self.vars
            .get_mut(&Scope::Global)
            .and_then(|t| t.get_mut(&name))
    }

    /// Resolves a constant: the given scope first, then global.
    pub fn find_constant(&self, scope: Scope, name: Symbol) -> Option<&Info> {
        self.consts
            .get(&scope)
            .and_then(|t| t.get(&name))
            .or_else(|| self.consts.get(&Scope::Global).and_then(|t| t.get(&name)))
    }

    pub fn find_function(&self, name: Symbol) -> Option<&Info> {
        self.funcs.get(&name)
    }

    pub fn find_function_mut(&mut self, name: Symbol) -> Option<&mut Info> {
        self.funcs.get_mut(&name)
    }

    pub fn variable_exists(&self, scope: Scope, name: Symbol) -> bool {
        self.find_variable(scope, name).is_some()
    }

    pub fn constant_exists(&self, scope: Scope, name: Symbol) -> bool {
        self.find_constant(scope, name).is_some()
    }

    /// Function existence; `read` and `write` are builtins of
    /// unrestricted arity.
    pub fn function_exists(&self, name: Symbol) -> bool {
        let text = name.as_str();
        text == "read" || text == "write" || self.funcs.contains_key(&name)
    }

    /// True when the name is taken by anything reachable from `scope`.
    pub fn name_exists(&self, scope: Scope, name: Symbol) -> bool {
        self.variable_exists(scope, name)
            || self.constant_exists(scope, name)
            || self.function_exists(name)
    }

    /// Iterates the variables of one scope in insertion order.
    pub fn variables_in(&self, scope: Scope) -> impl Iterator<Item = &Info> {
        self.vars.get(&scope).into_iter().flat_map(|t| t.values())
    }

    /// Iterates the constants of one scope in insertion order.
    pub fn constants_in(&self, scope: Scope) -> impl Iterator<Item = &Info> {
        self.consts.get(&scope).into_iter().flat_map(|t| t.values())
    }

    /// Renders the three-section symbol-table dump.
    pub fn dump(&self) -> String {
        let mut out = String::from("variables:\nscope\tlevel\tname\ttype\tvalue\n");
        for table in self.vars.values() {
            for info in table.values() {
                out.push_str(&info.row());
                out.push('\n');
            }
        }

        out.push_str("\nconstants:\nscope\tlevel\tname\ttype\tvalue\n");
        for table in self.consts.values() {
            for info in table.values() {
                out.push_str(&info.row());
                out.push('\n');
            }
        }

        out.push_str("\nfunctions:\nscope\tlevel\tname\ttype\tvalue\tparams\n");
        for info in self.funcs.values() {
            let params: Vec<&str> = info.param_types.iter().map(|p| p.as_str()).collect();
            out.push_str(&format!("{}\t[{}]\n", info.row(), params.join(", ")));
        }
        out
    }
}
