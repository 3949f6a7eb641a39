//! Invariant checks over the pipeline outputs.

use cmmc_drv::{analyze_tree, lex_source, parse_tokens, run_dag};
use cmmc_ir::{Op, Operand};

const SAMPLE: &str = "const int MAX=10; \
     int twice(int n); \
     int main(){ int i,s; s=0; \
         for(i=0;i<MAX;i=i+1){ \
             if (i%2==0 || s>20) { s=s+twice(i); } else { s=s-1; } \
         } \
         while (s>0) { s=s-3; } \
         do { s=s+1; } while (s<2); \
         return s; } \
     int twice(int n){ return n*2; }";

fn analyze(source: &str) -> cmmc_drv::AnalyzeResult {
    let lexed = lex_source(source);
    assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);
    let parsed = parse_tokens(lexed.tokens);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    let result = analyze_tree(&parsed.tree);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    result
}

#[test]
fn law_ids_equal_indices() {
    let result = analyze(SAMPLE);
    for (i, quad) in result.quads.iter().enumerate() {
        assert_eq!(quad.id, i);
    }
}

#[test]
fn law_every_jump_target_is_valid() {
    let result = analyze(SAMPLE);
    let len = result.quads.len();
    for quad in result.quads.iter() {
        if quad.op.is_jump() {
            match quad.result {
                Some(Operand::Target(t)) => assert!(t <= len, "jump {} -> {}", quad.id, t),
                other => panic!("jump {} unpatched: {:?}", quad.id, other),
            }
        }
    }
}

#[test]
fn law_blocks_begin_at_entries_and_jumps_terminate() {
    let result = analyze(SAMPLE);
    let blocks = cmmc_opt::partition(&result.quads);

    // block starts ascend and cover the list
    let mut covered = 0;
    for block in &blocks {
        assert_eq!(block.quads[0].id, block.start);
        covered += block.quads.len();
        for (i, quad) in block.quads.iter().enumerate() {
            if quad.op.is_jump() {
                assert_eq!(i, block.quads.len() - 1, "jump inside block {}", block.start);
            }
        }
    }
    assert_eq!(covered, result.quads.len());

    // every jump target is some block's first statement
    let starts: Vec<usize> = blocks.iter().map(|b| b.start).collect();
    for quad in result.quads.iter() {
        if quad.op.is_jump() {
            if let Some(Operand::Target(t)) = quad.result {
                if t < result.quads.len() {
                    assert!(starts.contains(&t), "target {} not a block start", t);
                }
            }
        }
    }
}

#[test]
fn law_dag_constant_folding_and_reuse() {
    let result = analyze("int main(){ int x,y; x = 3*4; y = 3*4; return 0; }");
    let dag = run_dag(&result.quads);
    // both stores read the folded 12; no multiply survives
    let dump = &dag.quad_dump;
    assert!(dump.contains("=\t12\t<nil>\tx"), "{}", dump);
    assert!(dump.contains("=\t12\t<nil>\ty"), "{}", dump);
    assert!(!dump.contains("\t*\t"), "{}", dump);
}

#[test]
fn law_label_priority() {
    // user variable outranks temporary as main label
    let result = analyze("int main(){ int a,b,x,y; x = a*b; y = x; return 0; }");
    let dag = run_dag(&result.quads);
    assert!(dag.quad_dump.contains("*\ta\tb\tx"), "{}", dag.quad_dump);
}

#[test]
fn law_short_circuit_skips_rhs() {
    let result = analyze("int main(){ int a,b; if (a>0 && b<5) { a=1; } return 0; }");
    // the false exit of a>0 must jump past b<5's code
    let jgt = result.quads.iter().find(|q| q.op == Op::Jgt).unwrap();
    let jlt = result.quads.iter().find(|q| q.op == Op::Jlt).unwrap();
    let false_exit = result.quads.get(jgt.id + 1);
    assert_eq!(false_exit.op, Op::Jmp);
    let Some(Operand::Target(t)) = false_exit.result else {
        panic!("false exit unpatched")
    };
    assert!(t > jlt.id, "false exit does not skip the right operand");
}

#[test]
fn law_frame_layout_offsets() {
    let result = analyze(
        "int f(int a, int b); int main(){ int r; r = f(1,2); return 0; } \
         int f(int a, int b){ int c; c = a+b; return c; }",
    );
    let entry = result
        .quads
        .iter()
        .find(|q| matches!(q.op, Op::Entry(name) if name.as_str() == "f"))
        .unwrap();
    let frame = cmmc_gen::build_frame(
        &result.quads,
        entry.id,
        &result.table,
        cmmc_util::Symbol::intern("f"),
    );
    assert_eq!(
        frame.address_of(cmmc_util::Symbol::intern("a")),
        Some("ss:[bp+4]")
    );
    assert_eq!(
        frame.address_of(cmmc_util::Symbol::intern("b")),
        Some("ss:[bp+6]")
    );
    // first referenced local gets bp-2
    assert_eq!(
        frame.address_of(cmmc_util::Symbol::intern("c")),
        Some("ss:[bp-2]")
    );
}

#[test]
fn dag_roundtrip_is_stable() {
    // Optimizing an already-optimized list changes nothing structural.
    let result = analyze(SAMPLE);
    let once = run_dag(&result.quads);
    let twice = run_dag(&once.quads);
    let ops_once: Vec<String> = once.quads.iter().map(|q| q.op.to_string()).collect();
    let ops_twice: Vec<String> = twice.quads.iter().map(|q| q.op.to_string()).collect();
    assert_eq!(ops_once, ops_twice);
}
