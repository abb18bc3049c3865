//! Expression lowering (spec §4.1.2): every call returns an operand that
//! holds the value.

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp};
use crate::error::IRBuildError;
use crate::ir::{Function, Instruction, Opcode, Operand};
use crate::symbols::SymbolTable;
use crate::types::DataType;

/// Structurally infers an expression's static type from the (assumed
/// already type-checked) AST and the symbol table, so every IR operand can
/// carry its data type without re-running full semantic analysis (spec §9,
/// "temp type recovery").
pub(super) fn infer_type(expr: &Expr, symbols: &dyn SymbolTable) -> DataType {
    match expr {
        Expr::Literal { value, .. } => match value {
            Literal::Int(_) => DataType::Int,
            Literal::Bool(_) => DataType::Bool,
            Literal::Float(_) => DataType::Float,
            Literal::Double(_) => DataType::Double,
            Literal::Str(_) => DataType::String,
            Literal::Null => DataType::Null,
        },
        Expr::Variable { name, .. } => symbols.type_of(name),
        Expr::Binary { op, left, .. } => match op {
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::And
            | BinaryOp::Or => DataType::Bool,
            _ => infer_type(left, symbols),
        },
        Expr::Unary { op, operand, .. } => match op {
            UnaryOp::Not => DataType::Bool,
            UnaryOp::Neg => infer_type(operand, symbols),
        },
        Expr::Call { name, .. } => symbols.type_of(name),
        Expr::Group { inner, .. } => infer_type(inner, symbols),
        Expr::ArrayIndex { array, .. } => match infer_type(array, symbols) {
            DataType::Array(elem, _) => *elem,
            other => other,
        },
        Expr::StringIndex { .. } => DataType::String,
    }
}

fn binary_opcode(op: &BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}

/// The array size carried by an already-lowered array operand, rejecting
/// the "unknown" sentinel rather than silently substituting a fallback
/// constant (spec §9 — the dynamic-size-sentinel open question, resolved in
/// `SPEC_FULL.md` to fail loudly).
fn require_known_array_size(array: &Operand, expr: &Expr) -> Result<i64, IRBuildError> {
    match array {
        Operand::Var { array_size, .. } if *array_size >= 0 => Ok(*array_size),
        Operand::Var { array_size, name } if *array_size < 0 => Err(IRBuildError::new(
            format!("array '{name}' has no statically known size; cannot emit a bounds check"),
            expr.loc(),
        )),
        _ => Err(IRBuildError::new(
            "bounds check target is not an array variable",
            expr.loc(),
        )),
    }
}

pub(super) fn lower_expression(
    func: &mut Function,
    expr: &Expr,
    symbols: &dyn SymbolTable,
) -> Result<Operand, IRBuildError> {
    match expr {
        Expr::Literal { value, .. } => Ok(match value {
            Literal::Int(v) => Operand::const_int(*v),
            Literal::Bool(v) => Operand::const_bool(*v),
            Literal::Float(v) => Operand::float_const(*v as f64, DataType::Float),
            Literal::Double(v) => Operand::float_const(*v, DataType::Double),
            Literal::Str(s) => Operand::string_const(s.clone()),
            Literal::Null => Operand::Null,
        }),

        Expr::Variable { name, .. } => {
            let array_size = symbols.array_size_of(name);
            let data_type = symbols.type_of(name);
            if array_size != -1 {
                Ok(Operand::array_var(name.clone(), array_size, data_type))
            } else {
                Ok(Operand::var(name.clone(), data_type))
            }
        }

        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
            ..
        } => lower_short_circuit(func, left, right, symbols, true),
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
            ..
        } => lower_short_circuit(func, left, right, symbols, false),

        Expr::Binary {
            op, left, right, ..
        } => {
            let left_op = lower_expression(func, left, symbols)?;
            let right_op = lower_expression(func, right, symbols)?;
            let result_type = infer_type(expr, symbols);
            let result = Operand::temp(func.new_temp_id(), result_type);
            func.push_instruction(Instruction::binary(
                binary_opcode(op),
                result.clone(),
                left_op,
                right_op,
            ));
            Ok(result)
        }

        Expr::Unary { op, operand, .. } => {
            let operand_op = lower_expression(func, operand, symbols)?;
            let opcode = match op {
                UnaryOp::Neg => Opcode::Neg,
                UnaryOp::Not => Opcode::Not,
            };
            let result_type = infer_type(expr, symbols);
            let result = Operand::temp(func.new_temp_id(), result_type);
            func.push_instruction(Instruction::unary(opcode, result.clone(), operand_op));
            Ok(result)
        }

        Expr::Call { name, args, .. } => {
            let mut arg_ops = Vec::with_capacity(args.len());
            for arg in args {
                arg_ops.push(lower_expression(func, arg, symbols)?);
            }
            for arg_op in arg_ops {
                func.push_instruction(Instruction::param(arg_op));
            }

            let return_type = symbols.type_of(name);
            if return_type == DataType::Void {
                func.push_instruction(Instruction::call(None, name.clone()));
                Ok(Operand::Null)
            } else {
                let result = Operand::temp(func.new_temp_id(), return_type);
                func.push_instruction(Instruction::call(Some(result.clone()), name.clone()));
                Ok(result)
            }
        }

        Expr::Group { inner, .. } => lower_expression(func, inner, symbols),

        Expr::ArrayIndex { array, index, .. } => {
            let array_op = lower_expression(func, array, symbols)?;
            let index_op = lower_expression(func, index, symbols)?;
            let size = require_known_array_size(&array_op, array)?;

            let error_label = func.new_label();
            func.push_instruction(Instruction::bounds_check(
                index_op.clone(),
                Operand::const_int(size),
                error_label,
            ));

            let element_type = infer_type(expr, symbols);
            let result = Operand::temp(func.new_temp_id(), element_type);
            func.push_instruction(Instruction::array_load(
                result.clone(),
                array_op,
                index_op,
            ));
            Ok(result)
        }

        Expr::StringIndex { string, index, .. } => {
            let string_op = lower_expression(func, string, symbols)?;
            let index_op = lower_expression(func, index, symbols)?;
            func.push_instruction(Instruction::param(string_op));
            func.push_instruction(Instruction::param(index_op));
            let result = Operand::temp(func.new_temp_id(), DataType::String);
            func.push_instruction(Instruction::call(Some(result.clone()), "tl_char_at"));
            Ok(result)
        }
    }
}

/// Lowers `a && b` / `a || b` with short-circuit evaluation (spec §4.1.2):
/// a fresh temp seeded with the opcode's absorbing value, the left operand
/// evaluated and tested, and the right operand evaluated only when the left
/// didn't already decide the result.
fn lower_short_circuit(
    func: &mut Function,
    left: &Expr,
    right: &Expr,
    symbols: &dyn SymbolTable,
    is_and: bool,
) -> Result<Operand, IRBuildError> {
    let result = Operand::temp(func.new_temp_id(), DataType::Bool);
    let seed = Operand::const_bool(!is_and);
    func.push_instruction(Instruction::r#move(result.clone(), seed));

    let left_op = lower_expression(func, left, symbols)?;
    let skip_label = func.new_label();
    if is_and {
        func.push_instruction(Instruction::jump_if_false(left_op, skip_label.clone()));
    } else {
        func.push_instruction(Instruction::jump_if(left_op, skip_label.clone()));
    }

    let right_op = lower_expression(func, right, symbols)?;
    func.push_instruction(Instruction::r#move(result.clone(), right_op));
    func.push_instruction(Instruction::label(skip_label));

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceLoc;
    use crate::ir::Function as IrFunction;
    use crate::symbols::StaticSymbolTable;

    fn loc() -> SourceLoc {
        SourceLoc::new(1, 1)
    }

    fn lit_int(v: i64) -> Expr {
        Expr::Literal {
            value: Literal::Int(v),
            loc: loc(),
        }
    }

    fn lit_bool(v: bool) -> Expr {
        Expr::Literal {
            value: Literal::Bool(v),
            loc: loc(),
        }
    }

    #[test]
    fn literal_lowers_to_const_with_type() {
        let mut func = IrFunction::new("f", DataType::Void);
        let symbols = StaticSymbolTable::new();
        let op = lower_expression(&mut func, &lit_int(42), &symbols).unwrap();
        assert_eq!(op, Operand::const_int(42));
    }

    #[test]
    fn and_short_circuits_with_zero_seed() {
        let mut func = IrFunction::new("f", DataType::Void);
        let symbols = StaticSymbolTable::new();
        let expr = Expr::Binary {
            op: BinaryOp::And,
            left: Box::new(lit_bool(true)),
            right: Box::new(lit_bool(false)),
            loc: loc(),
        };
        lower_expression(&mut func, &expr, &symbols).unwrap();

        // MOVE r <- false(seed), JUMP_IF_FALSE ta -> skip, MOVE r <- tb, LABEL skip
        assert_eq!(func.instructions[0].opcode, Opcode::Move);
        assert_eq!(func.instructions[0].arg1, Some(Operand::const_bool(false)));
        assert_eq!(func.instructions[1].opcode, Opcode::JumpIfFalse);
        let last = func.instructions.last().unwrap();
        assert_eq!(last.opcode, Opcode::Label);
    }

    #[test]
    fn or_short_circuits_with_one_seed() {
        let mut func = IrFunction::new("f", DataType::Void);
        let symbols = StaticSymbolTable::new();
        let expr = Expr::Binary {
            op: BinaryOp::Or,
            left: Box::new(lit_bool(false)),
            right: Box::new(lit_bool(true)),
            loc: loc(),
        };
        lower_expression(&mut func, &expr, &symbols).unwrap();
        assert_eq!(func.instructions[0].arg1, Some(Operand::const_bool(true)));
        assert_eq!(func.instructions[1].opcode, Opcode::JumpIf);
    }

    #[test]
    fn array_index_without_known_size_is_rejected() {
        let mut func = IrFunction::new("f", DataType::Void);
        let symbols = StaticSymbolTable::new()
            .with_var("a", DataType::Array(Box::new(DataType::Int), -1));
        let expr = Expr::ArrayIndex {
            array: Box::new(Expr::Variable {
                name: "a".into(),
                loc: loc(),
            }),
            index: Box::new(lit_int(0)),
            loc: loc(),
        };
        let err = lower_expression(&mut func, &expr, &symbols).unwrap_err();
        assert!(err.message.contains("no statically known size"));
    }

    #[test]
    fn array_index_emits_bounds_check_then_load() {
        let mut func = IrFunction::new("f", DataType::Void);
        let symbols = StaticSymbolTable::new().with_array("a", DataType::Int, 3);
        let expr = Expr::ArrayIndex {
            array: Box::new(Expr::Variable {
                name: "a".into(),
                loc: loc(),
            }),
            index: Box::new(lit_int(1)),
            loc: loc(),
        };
        lower_expression(&mut func, &expr, &symbols).unwrap();
        assert_eq!(func.instructions[0].opcode, Opcode::BoundsCheck);
        assert_eq!(func.instructions[1].opcode, Opcode::ArrayLoad);
    }

    #[test]
    fn call_to_void_function_omits_result() {
        let mut func = IrFunction::new("f", DataType::Void);
        let symbols = StaticSymbolTable::new();
        let expr = Expr::Call {
            name: "log".into(),
            args: vec![],
            loc: loc(),
        };
        let op = lower_expression(&mut func, &expr, &symbols).unwrap();
        assert_eq!(op, Operand::Null);
        assert_eq!(func.instructions[0].result, None);
    }
}
