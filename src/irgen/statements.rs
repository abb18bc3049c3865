//! Statement lowering (spec §4.1.1).

use super::expressions::lower_expression;
use crate::ast::Stmt;
use crate::error::IRBuildError;
use crate::ir::{Function, Instruction, Operand};
use crate::symbols::SymbolTable;

pub(super) fn lower_statement(
    func: &mut Function,
    stmt: &Stmt,
    symbols: &dyn SymbolTable,
) -> Result<(), IRBuildError> {
    match stmt {
        Stmt::Expr { expr, .. } => {
            lower_expression(func, expr, symbols)?;
            Ok(())
        }

        Stmt::VarDecl {
            name,
            data_type,
            initializer,
            ..
        } => {
            if let Some(init) = initializer {
                let value = lower_expression(func, init, symbols)?;
                let var = Operand::var(name.clone(), data_type.clone());
                func.push_instruction(Instruction::r#move(var, value));
            } else {
                func.push_instruction(Instruction::var_decl(name.clone(), data_type.clone()));
            }
            Ok(())
        }

        Stmt::ArrayDecl {
            name,
            element_type,
            size,
            initializer,
            loc,
        } => {
            if *size < 0 {
                return Err(IRBuildError::new(
                    format!("array '{name}' must have a statically known size"),
                    *loc,
                ));
            }
            if let Some(init) = initializer {
                let value = lower_expression(func, init, symbols)?;
                func.push_instruction(Instruction::array_init(
                    name.clone(),
                    *size,
                    element_type.clone(),
                    value,
                ));
            } else {
                func.push_instruction(Instruction::array_decl(
                    name.clone(),
                    *size,
                    element_type.clone(),
                ));
            }
            Ok(())
        }

        Stmt::Assignment { name, value, .. } => {
            let rhs = lower_expression(func, value, symbols)?;
            let data_type = symbols.type_of(name);
            let var = Operand::var(name.clone(), data_type);
            func.push_instruction(Instruction::r#move(var, rhs));
            Ok(())
        }

        Stmt::ArrayAssignment {
            array,
            index,
            value,
            loc,
        } => {
            let array_op = lower_expression(func, array, symbols)?;
            let index_op = lower_expression(func, index, symbols)?;
            let value_op = lower_expression(func, value, symbols)?;

            let size = match &array_op {
                Operand::Var { array_size, .. } if *array_size >= 0 => *array_size,
                Operand::Var { name, .. } => {
                    return Err(IRBuildError::new(
                        format!(
                            "array '{name}' has no statically known size; cannot emit a bounds check"
                        ),
                        *loc,
                    ));
                }
                _ => {
                    return Err(IRBuildError::new(
                        "assignment target is not an array variable",
                        *loc,
                    ));
                }
            };

            let error_label = func.new_label();
            func.push_instruction(Instruction::bounds_check(
                index_op.clone(),
                Operand::const_int(size),
                error_label,
            ));
            func.push_instruction(Instruction::array_store(array_op, index_op, value_op));
            Ok(())
        }

        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => lower_if(func, condition, then_branch, else_branch.as_deref(), symbols),

        Stmt::While {
            condition, body, ..
        } => lower_while(func, condition, body, symbols),

        Stmt::Break { loc } => {
            let loop_ctx = func
                .current_loop()
                .ok_or_else(|| IRBuildError::new("'break' outside a loop", *loc))?
                .clone();
            func.push_instruction(Instruction::jump(loop_ctx.end_label));
            Ok(())
        }

        Stmt::Continue { loc } => {
            let loop_ctx = func
                .current_loop()
                .ok_or_else(|| IRBuildError::new("'continue' outside a loop", *loc))?
                .clone();
            func.push_instruction(Instruction::jump(loop_ctx.start_label));
            Ok(())
        }

        Stmt::Return { value, .. } => {
            let value_op = match value {
                Some(expr) => Some(lower_expression(func, expr, symbols)?),
                None => None,
            };
            func.push_instruction(Instruction::r#return(value_op));
            Ok(())
        }

        Stmt::Print { args, .. } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(lower_expression(func, arg, symbols)?);
            }
            func.push_instruction(Instruction::print(values));
            Ok(())
        }

        Stmt::Block { statements, .. } => {
            for inner in statements {
                lower_statement(func, inner, symbols)?;
                if inner.always_returns() {
                    break;
                }
            }
            Ok(())
        }

        Stmt::Include { .. } => Ok(()),
    }
}

/// Spec §4.1.1's `If` lowering. The label names are exactly as spec'd: the
/// label called `then_label` is the branch target jumped to when the
/// condition is *false* (i.e. it marks where the else-branch, or the join
/// point when there is none, begins) — the then-branch itself runs
/// fall-through, with no label of its own. This matches the original
/// implementation's control-flow shape exactly; only the prose name is
/// counter-intuitive.
fn lower_if(
    func: &mut Function,
    condition: &crate::ast::Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
    symbols: &dyn SymbolTable,
) -> Result<(), IRBuildError> {
    let then_label = func.new_label();
    let end_label = func.new_label();

    let cond_op = lower_expression(func, condition, symbols)?;
    func.push_instruction(Instruction::jump_if_false(cond_op, then_label.clone()));

    lower_statement(func, then_branch, symbols)?;
    let then_returns = then_branch.always_returns();

    match else_branch {
        Some(else_branch) => {
            let else_label = func.new_label();
            if !then_returns {
                func.push_instruction(Instruction::jump(else_label.clone()));
            }
            func.push_instruction(Instruction::label(then_label));

            lower_statement(func, else_branch, symbols)?;
            let else_returns = else_branch.always_returns();
            if !else_returns {
                func.push_instruction(Instruction::label(else_label));
            }
        }
        None => {
            if !then_returns {
                func.push_instruction(Instruction::jump(end_label.clone()));
            }
            func.push_instruction(Instruction::label(then_label));
            if !then_returns {
                func.push_instruction(Instruction::label(end_label));
            }
        }
    }

    Ok(())
}

/// Spec §4.1.1's `While` lowering: loop context is pushed only around the
/// body, so `break`/`continue` lowered anywhere else (including a nested
/// function, if that were ever legal) never sees a stale context.
fn lower_while(
    func: &mut Function,
    condition: &crate::ast::Expr,
    body: &Stmt,
    symbols: &dyn SymbolTable,
) -> Result<(), IRBuildError> {
    let loop_label = func.new_label();
    let end_label = func.new_label();

    func.push_instruction(Instruction::label(loop_label.clone()));
    let cond_op = lower_expression(func, condition, symbols)?;
    func.push_instruction(Instruction::jump_if_false(cond_op, end_label.clone()));

    func.enter_loop(loop_label.clone(), end_label.clone());
    let result = lower_statement(func, body, symbols);
    func.exit_loop();
    result?;

    func.push_instruction(Instruction::jump(loop_label));
    func.push_instruction(Instruction::label(end_label));
    Ok(())
}
