//! cmmc-drv - Compiler driver.
//!
//! The driver orchestrates the pipeline
//!
//! ```text
//! source --lex--> tokens --parse--> tree --analyze--> (table, quads)
//!        --dag (optional)--> optimized quads --emit--> assembly
//! ```
//!
//! Each stage returns its textual artifact plus an error list; a
//! non-empty list blocks every following stage. The five staged
//! operations are exposed as plain functions ([`lex_source`],
//! [`parse_tokens`], [`analyze_tree`], [`run_dag`], [`emit_asm`]) so the
//! shell, the tests, and any embedding UI all drive the same code path.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use cmmc_ir::QuadList;
use cmmc_lex::{strip_comments, Token};
use cmmc_par::Node;
use cmmc_sem::SymbolTable;
use cmmc_util::{Diagnostic, Handler};
use thiserror::Error;

/// Driver-level failures.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} reported {count} error(s)")]
    StageFailed {
        stage: &'static str,
        count: usize,
        log: String,
    },
}

/// What the driver should print or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitKind {
    /// Token dump (`line:col  kind-code  lexeme`).
    Tokens,
    /// Syntax-tree dump.
    Tree,
    /// Symbol-table dump.
    Table,
    /// Quadruple dump straight out of analysis.
    Ir,
    /// Basic-block dump from the DAG pass.
    Blocks,
    /// Quadruple dump after DAG optimization.
    OptIr,
    /// Assembly text (the default).
    Asm,
}

impl EmitKind {
    fn parse(text: &str) -> Option<EmitKind> {
        Some(match text {
            "tokens" => EmitKind::Tokens,
            "tree" => EmitKind::Tree,
            "table" => EmitKind::Table,
            "ir" => EmitKind::Ir,
            "blocks" => EmitKind::Blocks,
            "opt-ir" => EmitKind::OptIr,
            "asm" => EmitKind::Asm,
            _ => return None,
        })
    }
}

impl fmt::Display for EmitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Driver configuration, filled from the command line.
#[derive(Debug)]
pub struct Config {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub emit: EmitKind,
    /// Run the DAG optimizer before emitting assembly.
    pub dag: bool,
}

impl Config {
    /// Parses command-line arguments (without the program name).
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Config, DriverError> {
        let mut input = None;
        let mut output = None;
        let mut emit = EmitKind::Asm;
        let mut dag = false;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-o" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| DriverError::Usage("-o needs a path".into()))?;
                    output = Some(PathBuf::from(path));
                },
                "--emit" => {
                    let kind = iter
                        .next()
                        .ok_or_else(|| DriverError::Usage("--emit needs a kind".into()))?;
                    emit = EmitKind::parse(&kind).ok_or_else(|| {
                        DriverError::Usage(format!(
                            "unknown emit kind '{}' (tokens|tree|table|ir|blocks|opt-ir|asm)",
                            kind
                        ))
                    })?;
                },
                "--dag" => dag = true,
                flag if flag.starts_with('-') => {
                    return Err(DriverError::Usage(format!("unknown flag '{}'", flag)));
                },
                path => {
                    if input.replace(PathBuf::from(path)).is_some() {
                        return Err(DriverError::Usage("more than one input file".into()));
                    }
                },
            }
        }

        let input = input.ok_or_else(|| DriverError::Usage("no input file".into()))?;
        Ok(Config {
            input,
            output,
            emit,
            dag,
        })
    }
}

/// Output of the lexing operation.
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub dump: String,
    pub errors: Vec<Diagnostic>,
}

/// `lex(src) → token-dump, errors`
pub fn lex_source(source: &str) -> LexResult {
    let handler = Handler::new();
    let tokens = cmmc_lex::tokenize(source, &handler);
    let dump = cmmc_lex::dump_tokens(&tokens);
    LexResult {
        tokens,
        dump,
        errors: handler.take(),
    }
}

/// Output of the parsing operation.
pub struct ParseResult {
    pub tree: Node,
    pub dump: String,
    pub errors: Vec<Diagnostic>,
}

/// `parse(tokens) → tree-dump, errors`. Comments are filtered here.
pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult {
    let handler = Handler::new();
    let tree = cmmc_par::parse(strip_comments(tokens), &handler);
    let dump = cmmc_par::dump_tree(&tree);
    ParseResult {
        tree,
        dump,
        errors: handler.take(),
    }
}

/// Output of the analysis operation.
pub struct AnalyzeResult {
    pub table: SymbolTable,
    pub quads: QuadList,
    pub table_dump: String,
    pub quad_dump: String,
    pub errors: Vec<Diagnostic>,
}

/// `analyze(tree) → symtab-dump, quad-dump, errors`
pub fn analyze_tree(tree: &Node) -> AnalyzeResult {
    let handler = Handler::new();
    let analysis = cmmc_sem::analyze(tree, &handler);
    AnalyzeResult {
        table_dump: analysis.table.dump(),
        quad_dump: analysis.quads.dump(),
        table: analysis.table,
        quads: analysis.quads,
        errors: handler.take(),
    }
}

/// Output of the DAG operation.
pub struct DagResult {
    pub quads: QuadList,
    pub blocks_dump: String,
    pub quad_dump: String,
}

/// `dag(quads) → basic-blocks-dump, optimized-quad-dump`
pub fn run_dag(quads: &QuadList) -> DagResult {
    let result = cmmc_opt::optimize(quads);
    DagResult {
        blocks_dump: result.blocks_dump,
        quad_dump: result.quads.dump(),
        quads: result.quads,
    }
}

/// Output of the emission operation.
pub struct EmitResult {
    pub asm: String,
    pub errors: Vec<Diagnostic>,
}

/// `emit(quads, symtab) → asm-text, errors`
pub fn emit_asm(quads: &QuadList, table: &SymbolTable) -> EmitResult {
    let handler = Handler::new();
    let asm = cmmc_gen::emit(quads, table, &handler);
    EmitResult {
        asm,
        errors: handler.take(),
    }
}

fn render(errors: &[Diagnostic]) -> String {
    errors
        .iter()
        .map(|d| format!("{}\n", d))
        .collect()
}

fn gate(stage: &'static str, errors: &[Diagnostic]) -> Result<(), DriverError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DriverError::StageFailed {
            stage,
            count: errors.len(),
            log: render(errors),
        })
    }
}

/// One compilation run.
pub struct Session {
    pub config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the pipeline far enough to produce the requested artifact.
    ///
    /// A stage with a non-empty error list aborts everything after it; if
    /// the requested artifact comes from that stage it is still produced,
    /// but the session reports failure.
    pub fn compile(&self) -> Result<String, DriverError> {
        let source = fs::read_to_string(&self.config.input).map_err(|source| DriverError::Io {
            path: self.config.input.clone(),
            source,
        })?;
        self.compile_source(&source)
    }

    /// The same pipeline over an in-memory source string.
    pub fn compile_source(&self, source: &str) -> Result<String, DriverError> {
        let lexed = lex_source(source);
        if self.config.emit == EmitKind::Tokens {
            gate("lexer", &lexed.errors)?;
            return Ok(lexed.dump);
        }
        gate("lexer", &lexed.errors)?;

        let parsed = parse_tokens(lexed.tokens);
        if self.config.emit == EmitKind::Tree {
            gate("parser", &parsed.errors)?;
            return Ok(parsed.dump);
        }
        gate("parser", &parsed.errors)?;

        let analyzed = analyze_tree(&parsed.tree);
        match self.config.emit {
            EmitKind::Table => {
                gate("analyzer", &analyzed.errors)?;
                return Ok(analyzed.table_dump);
            },
            EmitKind::Ir => {
                gate("analyzer", &analyzed.errors)?;
                return Ok(analyzed.quad_dump);
            },
            _ => gate("analyzer", &analyzed.errors)?,
        }

        let needs_dag = self.config.dag
            || matches!(self.config.emit, EmitKind::Blocks | EmitKind::OptIr);
        let (quads, dag_result) = if needs_dag {
            let result = run_dag(&analyzed.quads);
            (result.quads.clone(), Some(result))
        } else {
            (analyzed.quads.clone(), None)
        };

        match self.config.emit {
            EmitKind::Blocks => return Ok(dag_result.unwrap().blocks_dump),
            EmitKind::OptIr => return Ok(dag_result.unwrap().quad_dump),
            _ => {},
        }

        let emitted = emit_asm(&quads, &analyzed.table);
        gate("emitter", &emitted.errors)?;
        Ok(emitted.asm)
    }

    /// Compiles and writes/prints the artifact. Returns the artifact.
    pub fn run(&self) -> Result<String, DriverError> {
        let artifact = self.compile()?;
        match &self.config.output {
            Some(path) => {
                fs::write(path, &artifact).map_err(|source| DriverError::Io {
                    path: path.clone(),
                    source,
                })?;
            },
            None => print!("{}", artifact),
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(emit: EmitKind) -> Config {
        Config {
            input: PathBuf::from("unused"),
            output: None,
            emit,
            dag: false,
        }
    }

    #[test]
    fn test_config_parsing() {
        let cfg = Config::from_args(
            ["prog.cmm", "--emit", "ir", "-o", "out.txt", "--dag"]
                .map(String::from),
        )
        .unwrap();
        assert_eq!(cfg.input, PathBuf::from("prog.cmm"));
        assert_eq!(cfg.output, Some(PathBuf::from("out.txt")));
        assert_eq!(cfg.emit, EmitKind::Ir);
        assert!(cfg.dag);
    }

    #[test]
    fn test_config_rejects_garbage() {
        assert!(Config::from_args(["--frobnicate".to_string()]).is_err());
        assert!(Config::from_args(Vec::<String>::new()).is_err());
        assert!(Config::from_args(["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn test_emit_kind_parse() {
        assert_eq!(EmitKind::parse("opt-ir"), Some(EmitKind::OptIr));
        assert_eq!(EmitKind::parse("nonsense"), None);
    }

    #[test]
    fn test_pipeline_to_asm() {
        let session = Session::new(config(EmitKind::Asm));
        let asm = session
            .compile_source("int main(){ return 0; }")
            .expect("clean program");
        assert!(asm.contains("END START"));
    }

    #[test]
    fn test_lex_errors_block_parse() {
        let session = Session::new(config(EmitKind::Asm));
        let err = session.compile_source("int main() { int # ; }").unwrap_err();
        match err {
            DriverError::StageFailed { stage, .. } => assert_eq!(stage, "lexer"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_errors_block_analysis() {
        let session = Session::new(config(EmitKind::Ir));
        let err = session.compile_source("int main(){ int x return 0; }").unwrap_err();
        match err {
            DriverError::StageFailed { stage, .. } => assert_eq!(stage, "parser"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_semantic_errors_block_emission() {
        let session = Session::new(config(EmitKind::Asm));
        let err = session.compile_source("int main(){ x = 1; return 0; }").unwrap_err();
        match err {
            DriverError::StageFailed { stage, .. } => assert_eq!(stage, "analyzer"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_token_dump_artifact() {
        let session = Session::new(config(EmitKind::Tokens));
        let dump = session.compile_source("int main(){ }").unwrap();
        assert!(dump.lines().next().unwrap().contains("103"));
    }

    #[test]
    fn test_opt_ir_artifact_folds() {
        let session = Session::new(config(EmitKind::OptIr));
        let dump = session
            .compile_source("int main(){ int x; x = 2*3 + 4; return 0; }")
            .unwrap();
        assert!(dump.contains("=\t10\t<nil>\tx"), "{}", dump);
    }
}
