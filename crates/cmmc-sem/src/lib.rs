//! cmmc-sem - Semantic analysis and quadruple generation.
//!
//! A single traversal over the syntax tree resolves names against the
//! symbol tables and emits three-address quadruples, resolving
//! short-circuit boolean control flow by backpatching jump targets. The
//! expression evaluator lives in [`stacks`]: coupled operand, operator and
//! logic stacks with a bracket stack of levels.
//!
//! The pass never stops on an error; it reports into the caller's
//! [`Handler`] and produces a best-effort table and quadruple list either
//! way. The driver decides whether downstream stages may consume them.
//!
//! # Examples
//!
//! ```
//! use cmmc_lex::{strip_comments, tokenize};
//! use cmmc_par::parse;
//! use cmmc_sem::analyze;
//! use cmmc_util::Handler;
//!
//! let handler = Handler::new();
//! let tokens = strip_comments(tokenize("main() { return; }", &handler));
//! let tree = parse(tokens, &handler);
//! let analysis = analyze(&tree, &handler);
//! assert!(!handler.has_errors());
//! assert!(analysis.quads.len() >= 3); // main, ret, sys
//! ```

mod analyzer;
pub mod stacks;
pub mod symtab;

pub use analyzer::Analyzer;
pub use stacks::{CalStacks, LogicStack, StackOp};
pub use symtab::{Info, Scope, SymbolTable};

use cmmc_ir::QuadList;
use cmmc_par::Node;
use cmmc_util::Handler;

/// The outputs of semantic analysis.
pub struct Analysis {
    pub table: SymbolTable,
    pub quads: QuadList,
}

/// Analyzes a program tree, reporting errors into `handler`.
pub fn analyze(tree: &Node, handler: &Handler) -> Analysis {
    let mut analyzer = Analyzer::new(handler);
    analyzer.run(tree);
    Analysis {
        table: analyzer.table,
        quads: analyzer.quads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_lex::{strip_comments, tokenize};
    use cmmc_par::parse;

    fn run(source: &str) -> (Analysis, Handler) {
        let lex_handler = Handler::new();
        let tokens = strip_comments(tokenize(source, &lex_handler));
        assert!(!lex_handler.has_errors(), "lex errors: {}", lex_handler.render());
        let parse_handler = Handler::new();
        let tree = parse(tokens, &parse_handler);
        assert!(
            !parse_handler.has_errors(),
            "parse errors: {}",
            parse_handler.render()
        );
        let handler = Handler::new();
        let analysis = analyze(&tree, &handler);
        (analysis, handler)
    }

    /// Quadruple rows without the dump header.
    fn rows(analysis: &Analysis) -> Vec<String> {
        analysis.quads.dump().lines().skip(1).map(String::from).collect()
    }

    #[test]
    fn test_constant_folding_in_declarations() {
        // Scenario: constants fold at declaration time.
        let (analysis, handler) = run("const int A=1, B=A+2; int main(){ return B; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        assert_eq!(rows[0], "0\t=\t1\t<nil>\tA");
        assert_eq!(rows[1], "1\t=\t3\t<nil>\tB");
        assert_eq!(rows[2], "2\tmain\t<nil>\t<nil>\t<nil>");
        assert_eq!(rows[3], "3\tret\tB\t<nil>\t<nil>");
        assert_eq!(rows[4], "4\tsys\t<nil>\t<nil>\t<nil>");

        let a = analysis
            .table
            .find_constant(Scope::Global, cmmc_util::Symbol::intern("A"))
            .unwrap();
        assert_eq!(a.value, Some(cmmc_ir::Operand::Int(1)));
        let b = analysis
            .table
            .find_constant(Scope::Global, cmmc_util::Symbol::intern("B"))
            .unwrap();
        assert_eq!(b.value, Some(cmmc_ir::Operand::Int(3)));
    }

    #[test]
    fn test_straight_line_temporaries() {
        let (analysis, handler) = run("int main(){ int x; x = 2*3 + 4; return 0; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        assert_eq!(rows[0], "0\tmain\t<nil>\t<nil>\t<nil>");
        assert_eq!(rows[1], "1\t*\t2\t3\tT0");
        assert_eq!(rows[2], "2\t+\tT0\t4\tT1");
        assert_eq!(rows[3], "3\t=\tT1\t<nil>\tx");
        assert_eq!(rows[4], "4\tret\t0\t<nil>\t<nil>");
        assert_eq!(rows[5], "5\tsys\t<nil>\t<nil>\t<nil>");
    }

    #[test]
    fn test_short_circuit_and_with_else() {
        let (analysis, handler) =
            run("int main(){ int a,b; if (a>0 && b<5) a=1; else a=2; return 0; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        assert_eq!(rows[0], "0\tmain\t<nil>\t<nil>\t<nil>");
        // a>0 falls through into b<5 when true, jumps to else when false
        assert_eq!(rows[1], "1\tj>\ta\t0\t3");
        assert_eq!(rows[2], "2\tjmp\t<nil>\t<nil>\t7");
        assert_eq!(rows[3], "3\tj<\tb\t5\t5");
        assert_eq!(rows[4], "4\tjmp\t<nil>\t<nil>\t7");
        assert_eq!(rows[5], "5\t=\t1\t<nil>\ta");
        assert_eq!(rows[6], "6\tjmp\t<nil>\t<nil>\t8");
        assert_eq!(rows[7], "7\t=\t2\t<nil>\ta");
        assert_eq!(rows[8], "8\tret\t0\t<nil>\t<nil>");
        assert_eq!(rows[9], "9\tsys\t<nil>\t<nil>\t<nil>");
    }

    #[test]
    fn test_for_loop_backpatch_sites() {
        let (analysis, handler) =
            run("int main(){ int i,s; s=0; for(i=0;i<10;i=i+1) s=s+i; return s; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        assert_eq!(rows[0], "0\tmain\t<nil>\t<nil>\t<nil>");
        assert_eq!(rows[1], "1\t=\t0\t<nil>\ts");
        assert_eq!(rows[2], "2\t=\t0\t<nil>\ti");
        assert_eq!(rows[3], "3\tj<\ti\t10\t8");
        assert_eq!(rows[4], "4\tjmp\t<nil>\t<nil>\t11");
        assert_eq!(rows[5], "5\t+\ti\t1\tT0");
        assert_eq!(rows[6], "6\t=\tT0\t<nil>\ti");
        assert_eq!(rows[7], "7\tjmp\t<nil>\t<nil>\t3");
        assert_eq!(rows[8], "8\t+\ts\ti\tT1");
        assert_eq!(rows[9], "9\t=\tT1\t<nil>\ts");
        assert_eq!(rows[10], "10\tjmp\t<nil>\t<nil>\t5");
        assert_eq!(rows[11], "11\tret\ts\t<nil>\t<nil>");
        assert_eq!(rows[12], "12\tsys\t<nil>\t<nil>\t<nil>");
    }

    #[test]
    fn test_break_and_continue_targets() {
        let (analysis, handler) = run(
            "int main(){ int i,s; s=0; \
             for(i=0;i<10;i=i+1) { if (i==5) { break; } continue; } return s; }",
        );
        assert!(!handler.has_errors(), "{}", handler.render());

        // Layout: 3..=4 condition pair, 5..=7 step + loop-back, 8..=9 the
        // `i==5` pair, 10 break, 11 continue, 12 body-end jump to step.
        let dump = analysis.quads.dump();
        let target = |id: usize| match analysis.quads.get(id).result {
            Some(cmmc_ir::Operand::Target(t)) => t,
            other => panic!("quad {} has no target: {:?}\n{}", id, other, dump),
        };
        let after_loop = analysis
            .quads
            .iter()
            .find(|q| q.op == cmmc_ir::Op::Ret)
            .unwrap()
            .id;
        // break resolves to the first quadruple after the loop
        assert_eq!(target(10), after_loop, "{}", dump);
        // continue resolves to the step quadruple
        assert_eq!(target(11), 5, "{}", dump);
        // the body-end jump goes to the step as well
        assert_eq!(target(12), 5, "{}", dump);
    }

    #[test]
    fn test_function_call_and_params() {
        let (analysis, handler) =
            run("int f(int x); int main(){ return f(2); } int f(int x){ return x+1; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        assert_eq!(rows[0], "0\tmain\t<nil>\t<nil>\t<nil>");
        assert_eq!(rows[1], "1\tpara\t2\t<nil>\t<nil>");
        assert_eq!(rows[2], "2\tcall\tf\t<nil>\tT0");
        assert_eq!(rows[3], "3\tret\tT0\t<nil>\t<nil>");
        assert_eq!(rows[4], "4\tsys\t<nil>\t<nil>\t<nil>");
        assert_eq!(rows[5], "5\tf\t<nil>\t<nil>\t<nil>");
        assert_eq!(rows[6], "6\t+\tx\t1\tT1");
        assert_eq!(rows[7], "7\tret\tT1\t<nil>\t<nil>");

        let f = analysis
            .table
            .find_function(cmmc_util::Symbol::intern("f"))
            .unwrap();
        assert_eq!(f.param_types.len(), 1);
        assert_eq!(f.param_names.len(), 1);
        assert!(f.defined);
    }

    #[test]
    fn test_param_order_pins_right_to_left() {
        let (analysis, handler) = run(
            "int g(int a, int b); int main(){ g(1, 2); return 0; } \
             int g(int a, int b){ return a; }",
        );
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        // Last argument is pushed first, so the first declared parameter
        // ends up at bp+4.
        assert_eq!(rows[1], "1\tpara\t2\t<nil>\t<nil>");
        assert_eq!(rows[2], "2\tpara\t1\t<nil>\t<nil>");
        assert_eq!(rows[3], "3\tcall\tg\t<nil>\t<nil>");
    }

    #[test]
    fn test_division_by_literal_zero_is_reported() {
        let (analysis, handler) = run("int main(){ int x; x = 10/0; return 0; }");
        assert!(handler.has_errors());
        let rendered = handler.render();
        assert!(rendered.contains("division by zero"), "{}", rendered);
        // Emission still happened.
        assert!(analysis.quads.iter().any(|q| q.op == cmmc_ir::Op::Div));
    }

    #[test]
    fn test_division_by_zero_valued_constant() {
        let (_, handler) = run("const int Z=0; int main(){ int x; x = 1/Z; return 0; }");
        assert!(handler.render().contains("division by zero"));
    }

    #[test]
    fn test_while_loop_shape() {
        let (analysis, handler) = run("int main(){ int n; n=3; while (n>0) n=n-1; return 0; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        assert_eq!(rows[1], "1\t=\t3\t<nil>\tn");
        assert_eq!(rows[2], "2\tj>\tn\t0\t4");
        assert_eq!(rows[3], "3\tjmp\t<nil>\t<nil>\t7");
        assert_eq!(rows[4], "4\t-\tn\t1\tT0");
        assert_eq!(rows[5], "5\t=\tT0\t<nil>\tn");
        assert_eq!(rows[6], "6\tjmp\t<nil>\t<nil>\t2");
        assert_eq!(rows[7], "7\tret\t0\t<nil>\t<nil>");
    }

    #[test]
    fn test_do_while_true_exit_jumps_back() {
        let (analysis, handler) =
            run("int main(){ int n; n=0; do { n=n+1; } while (n<3); return n; }");
        assert!(!handler.has_errors(), "{}", handler.render());

        let rows = rows(&analysis);
        // body starts at 2 (n=n+1 is quads 2,3); condition at 4
        assert_eq!(rows[2], "2\t+\tn\t1\tT0");
        assert_eq!(rows[3], "3\t=\tT0\t<nil>\tn");
        assert_eq!(rows[4], "4\tj<\tn\t3\t2");
        assert_eq!(rows[5], "5\tjmp\t<nil>\t<nil>\t6");
        assert_eq!(rows[6], "6\tret\tn\t<nil>\t<nil>");
    }

    #[test]
    fn test_undefined_variable_reported() {
        let (_, handler) = run("int main(){ x = 1; return 0; }");
        assert!(handler.render().contains("variable not defined"));
    }

    #[test]
    fn test_assign_to_constant_reported() {
        let (_, handler) = run("const int C=1; int main(){ C = 2; return 0; }");
        assert!(handler.render().contains("cannot assign to a constant"));
    }

    #[test]
    fn test_redefinition_reported() {
        let (_, handler) = run("int main(){ int x; int x; return 0; }");
        assert!(handler.render().contains("redefined"));
    }

    #[test]
    fn test_inner_block_redeclaration_is_redefinition() {
        // Block locals live in the function scope map, so redeclaring at
        // a deeper level is a redefinition.
        let (_, handler) = run("int main(){ int x; { int x; } return 0; }");
        assert!(handler.render().contains("redefined"));
    }

    #[test]
    fn test_undeclared_function_definition_reported() {
        let (_, handler) = run("int main(){ return 0; } int h(int a){ return a; }");
        assert!(handler.render().contains("function not declared"));
    }

    #[test]
    fn test_return_type_mismatch_reported() {
        let (_, handler) =
            run("int f(int x); int main(){ return 0; } void f(int x){ return; }");
        assert!(handler.render().contains("return type mismatch"));
    }

    #[test]
    fn test_missing_return_in_nonvoid_reported() {
        let (_, handler) = run("int f(int x); int main(){ return 0; } int f(int x){ x = 1; }");
        assert!(handler.render().contains("missing a return statement"));
    }

    #[test]
    fn test_void_function_gets_implicit_ret() {
        let (analysis, handler) =
            run("void p(int x); int main(){ return 0; } void p(int x){ x = 1; }");
        assert!(!handler.has_errors(), "{}", handler.render());
        let last = analysis.quads.get(analysis.quads.len() - 1);
        assert_eq!(last.op, cmmc_ir::Op::Ret);
        assert_eq!(last.arg1, None);
    }

    #[test]
    fn test_builtin_read_write_accepted() {
        let (_, handler) = run("int main(){ int x; x = read(); write(x); return 0; }");
        assert!(!handler.has_errors(), "{}", handler.render());
    }

    #[test]
    fn test_bare_boolean_condition_uses_jnz() {
        let (analysis, handler) = run("int main(){ int x; x=1; if (x) x=2; return 0; }");
        assert!(!handler.has_errors(), "{}", handler.render());
        assert!(analysis.quads.iter().any(|q| q.op == cmmc_ir::Op::Jnz));
    }

    #[test]
    fn test_every_patched_jump_targets_valid_id() {
        let (analysis, handler) = run(
            "int main(){ int i,s; s=0; \
             for(i=0;i<9;i=i+1){ if(i%2==0 && s<50){ s=s+i; } else { s=s-1; } } \
             while (s>0) { s=s-1; } return s; }",
        );
        assert!(!handler.has_errors(), "{}", handler.render());
        for quad in analysis.quads.iter() {
            if quad.op.is_jump() {
                match quad.result {
                    Some(cmmc_ir::Operand::Target(t)) => {
                        assert!(t <= analysis.quads.len(), "jump {} out of range", quad.id)
                    },
                    other => panic!("jump {} left unpatched: {:?}", quad.id, other),
                }
            }
        }
    }

    #[test]
    fn test_symbol_table_dump_has_sections() {
        let (analysis, _) = run("const int A=1; int main(){ int x; x=A; return 0; }");
        let dump = analysis.table.dump();
        assert!(dump.contains("variables:"));
        assert!(dump.contains("constants:"));
        assert!(dump.contains("functions:"));
        assert!(dump.contains("main"));
    }
}
