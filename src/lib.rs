//! IR generation, peephole optimization, and C code generation for the `tl`
//! language core (spec §1–§4): `ast` + symbol table in, a C11 translation
//! unit out.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod ir;
pub mod irgen;
pub mod peephole;
pub mod symbols;
pub mod types;

pub use config::{CompilerConfig, OptimizationLevel};
pub use error::{CodeGenError, IRBuildError};
pub use symbols::SymbolTable;

use std::fmt;
use tracing::debug_span;

/// Either stage of the pipeline can fail; codegen and IR generation raise
/// distinct error types (spec §7), so compiling end-to-end needs a small sum
/// type to carry either one out of `compile`.
#[derive(Debug)]
pub enum CompileError {
    IRBuild(IRBuildError),
    CodeGen(CodeGenError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::IRBuild(e) => write!(f, "{e}"),
            CompileError::CodeGen(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<IRBuildError> for CompileError {
    fn from(e: IRBuildError) -> Self {
        CompileError::IRBuild(e)
    }
}

impl From<CodeGenError> for CompileError {
    fn from(e: CodeGenError) -> Self {
        CompileError::CodeGen(e)
    }
}

/// Runs the full pipeline: AST → IR → (optionally) peephole-optimized IR →
/// C source text (spec §2 data flow).
pub fn compile(
    program: &ast::Program,
    symbols: &dyn SymbolTable,
    config: &CompilerConfig,
) -> Result<String, CompileError> {
    let _span = debug_span!("compile").entered();

    let mut ir_program = irgen::generate_program(program, symbols)?;

    if config.optimization_level.runs_peephole() {
        peephole::optimize_program(&mut ir_program);
    }

    Ok(codegen::generate_program(&ir_program, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::symbols::StaticSymbolTable;
    use crate::types::DataType;

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    /// `func main() -> int { print(1+2*3); return 0; }` (spec §8, scenario 1).
    #[test]
    fn end_to_end_arithmetic_and_print() {
        let program = Program {
            functions: vec![Function {
                name: "main".into(),
                params: vec![],
                return_type: DataType::Int,
                body: Stmt::Block {
                    statements: vec![
                        Stmt::Print {
                            args: vec![Expr::Binary {
                                op: BinaryOp::Add,
                                left: Box::new(Expr::Literal {
                                    value: Literal::Int(1),
                                    loc: loc(),
                                }),
                                right: Box::new(Expr::Binary {
                                    op: BinaryOp::Mul,
                                    left: Box::new(Expr::Literal {
                                        value: Literal::Int(2),
                                        loc: loc(),
                                    }),
                                    right: Box::new(Expr::Literal {
                                        value: Literal::Int(3),
                                        loc: loc(),
                                    }),
                                    loc: loc(),
                                }),
                                loc: loc(),
                            }],
                            loc: loc(),
                        },
                        Stmt::Return {
                            value: Some(Expr::Literal {
                                value: Literal::Int(0),
                                loc: loc(),
                            }),
                            loc: loc(),
                        },
                    ],
                    loc: loc(),
                },
            }],
        };
        let symbols = StaticSymbolTable::new();
        let c_source = compile(&program, &symbols, &CompilerConfig::new()).unwrap();
        assert!(c_source.contains("printf(\"%lld\\n\", "));
        assert!(c_source.contains("int main(void) {") || c_source.contains("int64_t main(void) {"));
    }

    #[test]
    fn o0_skips_peephole_but_still_compiles() {
        let program = Program {
            functions: vec![Function {
                name: "main".into(),
                params: vec![],
                return_type: DataType::Int,
                body: Stmt::Block {
                    statements: vec![Stmt::Return {
                        value: Some(Expr::Literal {
                            value: Literal::Int(0),
                            loc: loc(),
                        }),
                        loc: loc(),
                    }],
                    loc: loc(),
                },
            }],
        };
        let symbols = StaticSymbolTable::new();
        let config = CompilerConfig::new().with_optimization_level(OptimizationLevel::O0);
        assert!(compile(&program, &symbols, &config).is_ok());
    }

    #[test]
    fn irgen_error_propagates_as_compile_error() {
        let program = Program {
            functions: vec![Function {
                name: "main".into(),
                params: vec![],
                return_type: DataType::Void,
                body: Stmt::Block {
                    statements: vec![Stmt::Break { loc: loc() }],
                    loc: loc(),
                },
            }],
        };
        let symbols = StaticSymbolTable::new();
        let err = compile(&program, &symbols, &CompilerConfig::new()).unwrap_err();
        assert!(matches!(err, CompileError::IRBuild(_)));
    }
}
