//! Error propagation and recovery across the staged pipeline.

use cmmc_drv::{analyze_tree, lex_source, parse_tokens};

#[test]
fn lexer_reports_but_finishes() {
    let lexed = lex_source("int main(){ int x; x = 0b; }");
    assert!(!lexed.errors.is_empty());
    // dump still renders every token including the illegal one
    assert!(lexed.dump.contains("-2"));
    assert!(lexed.dump.lines().last().unwrap().contains("-1"));
}

#[test]
fn parser_recovers_to_sentinel() {
    let lexed = lex_source("int main(){ int x = ; return 0; }");
    assert!(lexed.errors.is_empty());
    let parsed = parse_tokens(lexed.tokens);
    assert!(!parsed.errors.is_empty());
    // a best-effort tree still comes back
    assert_eq!(parsed.tree.label(), "<program>");
}

#[test]
fn parser_error_names_the_production() {
    let lexed = lex_source("main( { }");
    let parsed = parse_tokens(lexed.tokens);
    assert!(!parsed.errors.is_empty());
    let joined: String = parsed
        .errors
        .iter()
        .map(|d| d.message.clone())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(joined.contains("<program>"), "{}", joined);
}

#[test]
fn analyzer_collects_multiple_errors() {
    let lexed = lex_source("int main(){ a = 1; b = 2; return 0; }");
    let parsed = parse_tokens(lexed.tokens);
    assert!(parsed.errors.is_empty());
    let analyzed = analyze_tree(&parsed.tree);
    assert!(analyzed.errors.len() >= 2, "{:?}", analyzed.errors);
}

#[test]
fn error_entries_carry_position_and_lexeme() {
    let lexed = lex_source("int main(){ x = 1; return 0; }");
    let parsed = parse_tokens(lexed.tokens);
    let analyzed = analyze_tree(&parsed.tree);
    let entry = &analyzed.errors[0];
    assert_eq!(entry.lexeme, "x");
    assert!(entry.pos.line >= 1);
    let rendered = format!("{}", entry);
    // line:col  kind-code  lexeme  message
    assert!(rendered.contains("700  x  "), "{}", rendered);
}

#[test]
fn empty_main_is_clean() {
    let lexed = lex_source("main() { }");
    assert!(lexed.errors.is_empty());
    let parsed = parse_tokens(lexed.tokens);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    let analyzed = analyze_tree(&parsed.tree);
    assert!(analyzed.errors.is_empty(), "{:?}", analyzed.errors);
    // entry + sys at least
    assert!(analyzed.quads.len() >= 2);
}

#[test]
fn comments_never_reach_the_parser() {
    let lexed = lex_source("main() { /* body */ } // trailer");
    let parsed = parse_tokens(lexed.tokens);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
}

#[test]
fn break_outside_loop_is_reported() {
    let lexed = lex_source("int main(){ break; return 0; }");
    let parsed = parse_tokens(lexed.tokens);
    let analyzed = analyze_tree(&parsed.tree);
    assert!(analyzed
        .errors
        .iter()
        .any(|d| d.message.contains("break outside")));
}

#[test]
fn deep_nesting_does_not_confuse_backpatching() {
    let source = "int main(){ int i,j,k,s; s=0; \
        for(i=0;i<3;i=i+1){ \
            for(j=0;j<3;j=j+1){ \
                while (k<10) { \
                    if (i==j && k%2==0) { s=s+1; } else { k=k+1; continue; } \
                    if (s>100) { break; } \
                } \
            } \
        } return s; }";
    let lexed = lex_source(source);
    let parsed = parse_tokens(lexed.tokens);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    let analyzed = analyze_tree(&parsed.tree);
    assert!(analyzed.errors.is_empty(), "{:?}", analyzed.errors);
    for quad in analyzed.quads.iter() {
        if quad.op.is_jump() {
            assert!(
                matches!(quad.result, Some(cmmc_ir::Operand::Target(_))),
                "unpatched jump {}:\n{}",
                quad.id,
                analyzed.quad_dump
            );
        }
    }
}
