//! IR generation: lowers a type-checked AST into the three-address IR
//! (spec §4.1).

mod expressions;
mod statements;

use crate::ast;
use crate::error::IRBuildError;
use crate::ir;
use crate::symbols::SymbolTable;
use tracing::debug_span;

/// Lowers an entire AST program into an IR program, preserving function
/// order (spec §3.5: order must survive into codegen since `main` is
/// emitted last and forward declarations are derived from this order).
pub fn generate_program(
    program: &ast::Program,
    symbols: &dyn SymbolTable,
) -> Result<ir::Program, IRBuildError> {
    let mut ir_program = ir::Program::new();
    for func in &program.functions {
        ir_program.add_function(generate_function(func, symbols)?);
    }
    Ok(ir_program)
}

/// Lowers a single AST function to an IR function (spec §4.1 signature
/// contract).
pub fn generate_function(
    func: &ast::Function,
    symbols: &dyn SymbolTable,
) -> Result<ir::Function, IRBuildError> {
    let _span = debug_span!("ir_generate_function", name = %func.name).entered();

    let mut ir_func = ir::Function::new(func.name.clone(), func.return_type.clone());
    for param in &func.params {
        ir_func.add_param(ir::Operand::var(
            param.name.clone(),
            param.data_type.clone(),
        ));
    }

    statements::lower_statement(&mut ir_func, &func.body, symbols)?;
    Ok(ir_func)
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

    #[test]
    fn generates_function_with_literal_return() {
        let func = Function {
            name: "main".into(),
            params: vec![],
            return_type: DataType::Int,
            body: Stmt::Block {
                statements: vec![Stmt::Return {
                    value: Some(Expr::Literal {
                        value: Literal::Int(7),
                        loc: loc(),
                    }),
                    loc: loc(),
                }],
                loc: loc(),
            },
        };
        let symbols = StaticSymbolTable::new();
        let ir_func = generate_function(&func, &symbols).unwrap();
        assert_eq!(ir_func.instructions.len(), 1);
        assert_eq!(ir_func.instructions[0].opcode, ir::Opcode::Return);
    }

    #[test]
    fn program_preserves_function_order() {
        let mk = |name: &str| Function {
            name: name.into(),
            params: vec![],
            return_type: DataType::Void,
            body: Stmt::Block {
                statements: vec![],
                loc: loc(),
            },
        };
        let program = Program {
            functions: vec![mk("helper"), mk("main")],
        };
        let symbols = StaticSymbolTable::new();
        let ir_program = generate_program(&program, &symbols).unwrap();
        assert_eq!(ir_program.functions[0].name, "helper");
        assert_eq!(ir_program.functions[1].name, "main");
    }
}
