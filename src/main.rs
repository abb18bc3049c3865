//! `tlc` — drives the IR/peephole/codegen core over a fixture program and
//! writes the resulting C translation unit.
//!
//! Parsing and semantic analysis are out of scope for this crate (the
//! library's input contract is already a type-checked AST plus a symbol
//! table; see `tlc::ast` and `tlc::SymbolTable`). This binary exists to
//! exercise the pipeline end-to-end and as a place to wire a real parser in
//! later, not as a finished language front end.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use tlc::ast::{BinaryOp, Expr, Function, Literal, Parameter, Program, SourceLoc, Stmt};
use tlc::config::ManifestPath;
use tlc::symbols::StaticSymbolTable;
use tlc::types::DataType;
use tlc::{CompilerConfig, OptimizationLevel};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "tlc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "IR/peephole/codegen core for the tl language", long_about = None)]
struct Args {
    /// Where to write the generated C source (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optimization level: o0 skips the peephole pass, o1 (default) runs it.
    #[arg(long, value_enum, default_value = "o1")]
    opt: OptArg,

    /// TOML manifest of externally-declared functions to forward-declare.
    #[arg(long)]
    ffi_manifest: Option<ManifestPath>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OptArg {
    O0,
    O1,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let mut config = CompilerConfig::new().with_optimization_level(match args.opt {
        OptArg::O0 => OptimizationLevel::O0,
        OptArg::O1 => OptimizationLevel::O1,
    });
    if let Some(manifest) = &args.ffi_manifest {
        config = config
            .load_extern_manifest(manifest)
            .map_err(|e| e.to_string())?;
    }

    let program = fixture_program();
    let symbols = StaticSymbolTable::new()
        .with_var("n", DataType::Int)
        .with_var("fact", DataType::Int);
    let c_source = tlc::compile(&program, &symbols, &config).map_err(|e| e.to_string())?;

    match &args.output {
        Some(path) => std::fs::write(path, c_source).map_err(|e| e.to_string()),
        None => {
            print!("{c_source}");
            Ok(())
        }
    }
}

fn loc() -> SourceLoc {
    SourceLoc::new(0, 0)
}

fn lit_int(v: i64) -> Expr {
    Expr::Literal {
        value: Literal::Int(v),
        loc: loc(),
    }
}

/// `factorial(5)` (spec §8, end-to-end scenario 3) — recursion, comparison,
/// and a call result consumed by a binary operator exercise the whole
/// pipeline in one program.
fn fixture_program() -> Program {
    let fact = Function {
        name: "fact".into(),
        params: vec![Parameter {
            name: "n".into(),
            data_type: DataType::Int,
        }],
        return_type: DataType::Int,
        body: Stmt::Block {
            statements: vec![
                Stmt::If {
                    condition: Expr::Binary {
                        op: BinaryOp::Le,
                        left: Box::new(Expr::Variable {
                            name: "n".into(),
                            loc: loc(),
                        }),
                        right: Box::new(lit_int(1)),
                        loc: loc(),
                    },
                    then_branch: Box::new(Stmt::Return {
                        value: Some(lit_int(1)),
                        loc: loc(),
                    }),
                    else_branch: None,
                    loc: loc(),
                },
                Stmt::Return {
                    value: Some(Expr::Binary {
                        op: BinaryOp::Mul,
                        left: Box::new(Expr::Variable {
                            name: "n".into(),
                            loc: loc(),
                        }),
                        right: Box::new(Expr::Call {
                            name: "fact".into(),
                            args: vec![Expr::Binary {
                                op: BinaryOp::Sub,
                                left: Box::new(Expr::Variable {
                                    name: "n".into(),
                                    loc: loc(),
                                }),
                                right: Box::new(lit_int(1)),
                                loc: loc(),
                            }],
                            loc: loc(),
                        }),
                        loc: loc(),
                    }),
                    loc: loc(),
                },
            ],
            loc: loc(),
        },
    };

    let main_fn = Function {
        name: "main".into(),
        params: vec![],
        return_type: DataType::Int,
        body: Stmt::Block {
            statements: vec![
                Stmt::Print {
                    args: vec![Expr::Call {
                        name: "fact".into(),
                        args: vec![lit_int(5)],
                        loc: loc(),
                    }],
                    loc: loc(),
                },
                Stmt::Return {
                    value: Some(lit_int(0)),
                    loc: loc(),
                },
            ],
            loc: loc(),
        },
    };

    Program {
        functions: vec![fact, main_fn],
    }
}
