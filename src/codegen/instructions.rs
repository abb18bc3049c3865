//! Operand rendering and the opcode-to-C dispatch table (spec §4.3.3).

use super::state::FunctionState;
use crate::error::CodeGenError;
use crate::ir::{Instruction, Opcode, Operand};
use crate::types::DataType;
use std::fmt::Write as _;

/// Renders an operand as a C expression. Every `Temp` reaching this point
/// must already carry a `data_type` — one without it is a codegen bug in the
/// generator that produced it, not a recoverable input (spec §9, open
/// question on temp type recovery).
pub(super) fn render_operand(op: &Operand) -> Result<String, CodeGenError> {
    match op {
        Operand::Temp {
            id,
            data_type: Some(_),
        } => Ok(format!("t{id}")),
        Operand::Temp {
            id,
            data_type: None,
        } => Err(CodeGenError::logic(format!(
            "temp t{id} reached codegen with no data type"
        ))),
        Operand::Var { name, .. } => Ok(name.clone()),
        Operand::Const {
            value,
            data_type: DataType::Bool,
        } => Ok(if *value != 0 { "true" } else { "false" }.to_string()),
        Operand::Const { value, .. } => Ok(value.to_string()),
        Operand::FloatConst {
            value,
            data_type: DataType::Float,
        } => Ok(format!("{value}f")),
        Operand::FloatConst { value, .. } => Ok(value.to_string()),
        Operand::StringConst(s) => Ok(format!("\"{}\"", escape_c_string(s))),
        Operand::Label(name) => Ok(name.clone()),
        Operand::Null => Ok("NULL".to_string()),
    }
}

/// Escapes a source-language string literal for a C string literal. Rust's
/// `{:?}` debug formatting is not usable here: non-ASCII text comes out as
/// `\u{XXXX}`, which is Rust escape syntax, not C. Everything outside the
/// handful of required escapes is passed through as raw UTF-8 bytes, which
/// is a valid C string literal content byte-for-byte.
fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// The C type an operand's value would be declared with.
fn operand_c_type(op: &Operand) -> Result<&'static str, CodeGenError> {
    match op.data_type() {
        Some(dt) => dt.c_type(),
        None => Err(CodeGenError::logic(
            "operand reached codegen with no data type",
        )),
    }
}

/// Emits `result = rhs;`, declaring `result` on first definition (spec
/// §4.3.2 points 4–5).
fn emit_assignment(
    out: &mut String,
    state: &mut FunctionState,
    result: &Operand,
    rhs: &str,
) -> Result<(), CodeGenError> {
    let name = render_operand(result)?;
    let needs_decl = match result {
        Operand::Temp { id, .. } => state.declare_temp_once(*id),
        Operand::Var {
            name, array_size, ..
        } if *array_size < 0 => state.declare_var_once(name),
        Operand::Var { .. } => false,
        _ => false,
    };
    if needs_decl {
        writeln!(out, "{} {name} = {rhs};", operand_c_type(result)?)?;
    } else {
        writeln!(out, "{name} = {rhs};")?;
    }
    Ok(())
}

fn print_format_piece(op: &Operand) -> Result<&'static str, CodeGenError> {
    match op.data_type() {
        Some(DataType::Int) => Ok("%lld"),
        Some(DataType::Bool) => Ok("%d"),
        Some(DataType::Float) | Some(DataType::Double) => Ok("%g"),
        Some(DataType::String) => Ok("%s"),
        other => Err(CodeGenError::logic(format!(
            "PRINT cannot format operand of type {other:?}"
        ))),
    }
}

/// Dispatches one instruction to its C form, appending to `out`. `state`
/// tracks per-function declarations and the pending `PARAM` buffer.
pub(super) fn emit_instruction(
    out: &mut String,
    state: &mut FunctionState,
    instr: &Instruction,
) -> Result<(), CodeGenError> {
    match instr.opcode {
        Opcode::Nop => {}
        Opcode::Label => {
            writeln!(out, "{}:;", instr.label.as_deref().expect("LABEL carries a label"))?;
        }
        Opcode::Move => {
            let rhs = render_operand(instr.arg1.as_ref().expect("MOVE has arg1"))?;
            emit_assignment(out, state, instr.result.as_ref().expect("MOVE has result"), &rhs)?;
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::And
        | Opcode::Or
        | Opcode::Eq
        | Opcode::Ne
        | Opcode::Lt
        | Opcode::Le
        | Opcode::Gt
        | Opcode::Ge => {
            let sym = instr
                .opcode
                .infix_symbol()
                .expect("arithmetic/comparison opcodes always have an infix symbol");
            let a = render_operand(instr.arg1.as_ref().expect("binary op has arg1"))?;
            let b = render_operand(instr.arg2.as_ref().expect("binary op has arg2"))?;
            let result = instr.result.as_ref().expect("binary op has result");
            let rhs = if matches!(
                instr.opcode,
                Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge
            ) {
                format!("({a} {sym} {b})")
            } else {
                format!("{a} {sym} {b}")
            };
            emit_assignment(out, state, result, &rhs)?;
        }
        Opcode::Neg => {
            let a = render_operand(instr.arg1.as_ref().expect("NEG has arg1"))?;
            emit_assignment(
                out,
                state,
                instr.result.as_ref().expect("NEG has result"),
                &format!("-{a}"),
            )?;
        }
        Opcode::Not => {
            let a = render_operand(instr.arg1.as_ref().expect("NOT has arg1"))?;
            emit_assignment(
                out,
                state,
                instr.result.as_ref().expect("NOT has result"),
                &format!("!{a}"),
            )?;
        }
        Opcode::Jump => {
            writeln!(out, "goto {};", instr.label.as_deref().expect("JUMP carries a label"))?;
        }
        Opcode::JumpIf => {
            let c = render_operand(instr.arg1.as_ref().expect("JUMP_IF has arg1"))?;
            writeln!(
                out,
                "if ({c}) goto {};",
                instr.label.as_deref().expect("JUMP_IF carries a label")
            )?;
        }
        Opcode::JumpIfFalse => {
            let c = render_operand(instr.arg1.as_ref().expect("JUMP_IF_FALSE has arg1"))?;
            writeln!(
                out,
                "if (!{c}) goto {};",
                instr.label.as_deref().expect("JUMP_IF_FALSE carries a label")
            )?;
        }
        Opcode::Param => {
            let p = render_operand(instr.arg1.as_ref().expect("PARAM has arg1"))?;
            state.pending_params.push(p);
        }
        Opcode::Call => {
            let func_name = instr.label.as_deref().expect("CALL carries the callee name");
            let args = state.pending_params.join(", ");
            state.pending_params.clear();
            let call_expr = format!("{func_name}({args})");
            match &instr.result {
                Some(result) => emit_assignment(out, state, result, &call_expr)?,
                None => writeln!(out, "{call_expr};")?,
            }
        }
        Opcode::Return => match &instr.arg1 {
            Some(value) => {
                let v = render_operand(value)?;
                writeln!(out, "{} = {v};", state.return_slot_name())?;
                writeln!(out, "goto {};", state.epilogue_label)?;
            }
            None => {
                writeln!(out, "goto {};", state.epilogue_label)?;
            }
        },
        Opcode::Print => {
            let mut fmt = String::new();
            let mut rendered = Vec::with_capacity(instr.args.len());
            for arg in &instr.args {
                fmt.push_str(print_format_piece(arg)?);
                rendered.push(render_operand(arg)?);
            }
            fmt.push_str("\\n");
            if rendered.is_empty() {
                writeln!(out, "printf(\"{fmt}\");")?;
            } else {
                writeln!(out, "printf(\"{fmt}\", {});", rendered.join(", "))?;
            }
        }
        Opcode::ArrayDecl => {
            let result = instr.result.as_ref().expect("ARRAY_DECL has result");
            let (name, size) = array_name_and_size(result)?;
            state.declare_var_once(&name);
            writeln!(out, "{} {name}[{size}] = {{0}};", operand_c_type(result)?)?;
        }
        Opcode::ArrayInit => {
            let result = instr.result.as_ref().expect("ARRAY_INIT has result");
            let (name, size) = array_name_and_size(result)?;
            let v = render_operand(instr.arg1.as_ref().expect("ARRAY_INIT has arg1"))?;
            state.declare_var_once(&name);
            writeln!(out, "{} {name}[{size}] = {{{v}}};", operand_c_type(result)?)?;
        }
        Opcode::ArrayLoad => {
            let a = render_operand(instr.arg1.as_ref().expect("ARRAY_LOAD has arg1"))?;
            let i = render_operand(instr.arg2.as_ref().expect("ARRAY_LOAD has arg2"))?;
            emit_assignment(
                out,
                state,
                instr.result.as_ref().expect("ARRAY_LOAD has result"),
                &format!("{a}[{i}]"),
            )?;
        }
        Opcode::ArrayStore => {
            let a = render_operand(instr.arg1.as_ref().expect("ARRAY_STORE has arg1"))?;
            let i = render_operand(instr.arg2.as_ref().expect("ARRAY_STORE has arg2"))?;
            let v = render_operand(instr.result.as_ref().expect("ARRAY_STORE carries value in result"))?;
            writeln!(out, "{a}[{i}] = {v};")?;
        }
        Opcode::BoundsCheck => {
            let i = render_operand(instr.arg1.as_ref().expect("BOUNDS_CHECK has arg1"))?;
            let n = render_operand(instr.arg2.as_ref().expect("BOUNDS_CHECK has arg2"))?;
            writeln!(
                out,
                "if ({i} < 0 || {i} >= {n}) {{ fprintf(stderr, \"array index out of bounds\\n\"); exit(1); }}"
            )?;
        }
        Opcode::VarDecl => {
            let result = instr.result.as_ref().expect("VAR_DECL has result");
            let name = render_operand(result)?;
            if state.declare_var_once(&name) {
                writeln!(out, "{} {name} = {{0}};", operand_c_type(result)?)?;
            }
        }
        Opcode::InlineAsm => {
            writeln!(out, "{}", instr.label.as_deref().unwrap_or(""))?;
        }
    }
    Ok(())
}

fn array_name_and_size(op: &Operand) -> Result<(String, i64), CodeGenError> {
    match op {
        Operand::Var {
            name, array_size, ..
        } if *array_size >= 0 => Ok((name.clone(), *array_size)),
        other => Err(CodeGenError::logic(format!(
            "expected an array variable with known size, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;

    fn state() -> FunctionState {
        FunctionState::new("f", DataType::Int, &[])
    }

    #[test]
    fn move_declares_temp_on_first_definition() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::r#move(Operand::temp(0, DataType::Int), Operand::const_int(5));
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "int64_t t0 = 5;\n");
    }

    #[test]
    fn move_to_already_declared_temp_omits_type() {
        let mut out = String::new();
        let mut s = state();
        s.declare_temp_once(0);
        let instr = Instruction::r#move(Operand::temp(0, DataType::Int), Operand::const_int(5));
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "t0 = 5;\n");
    }

    #[test]
    fn comparison_wraps_result_in_parens() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::binary(
            Opcode::Lt,
            Operand::temp(0, DataType::Bool),
            Operand::var("n", DataType::Int),
            Operand::const_int(1),
        );
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "bool t0 = (n < 1);\n");
    }

    #[test]
    fn jump_if_false_negates_condition() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::jump_if_false(Operand::var("c", DataType::Bool), "L0");
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "if (!c) goto L0;\n");
    }

    #[test]
    fn call_consumes_pending_params_in_order() {
        let mut out = String::new();
        let mut s = state();
        emit_instruction(&mut out, &mut s, &Instruction::param(Operand::const_int(1))).unwrap();
        emit_instruction(&mut out, &mut s, &Instruction::param(Operand::const_int(2))).unwrap();
        let call = Instruction::call(Some(Operand::temp(0, DataType::Int)), "add");
        emit_instruction(&mut out, &mut s, &call).unwrap();
        assert_eq!(out, "int64_t t0 = add(1, 2);\n");
        assert!(s.pending_params.is_empty());
    }

    #[test]
    fn void_call_omits_assignment() {
        let mut out = String::new();
        let mut s = state();
        let call = Instruction::call(None, "log_it");
        emit_instruction(&mut out, &mut s, &call).unwrap();
        assert_eq!(out, "log_it();\n");
    }

    #[test]
    fn return_with_value_stores_then_jumps_to_epilogue() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::r#return(Some(Operand::const_int(7)));
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "__tl_retval = 7;\ngoto __tl_epilogue_f;\n");
    }

    #[test]
    fn void_return_only_jumps() {
        let mut out = String::new();
        let mut s = state();
        emit_instruction(&mut out, &mut s, &Instruction::r#return(None)).unwrap();
        assert_eq!(out, "goto __tl_epilogue_f;\n");
    }

    #[test]
    fn print_builds_format_string_per_argument_type() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::print(vec![
            Operand::const_int(1),
            Operand::const_bool(true),
            Operand::string_const("hi"),
        ]);
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "printf(\"%lld%d%s\\n\", 1, true, \"hi\");\n");
    }

    #[test]
    fn bounds_check_emits_guard() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::bounds_check(Operand::var("i", DataType::Int), Operand::const_int(3), "_");
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(
            out,
            "if (i < 0 || i >= 3) { fprintf(stderr, \"array index out of bounds\\n\"); exit(1); }\n"
        );
    }

    #[test]
    fn array_decl_zero_initializes() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::array_decl("a", 3, DataType::Int);
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "int64_t a[3] = {0};\n");
    }

    #[test]
    fn array_store_reads_value_from_result_slot() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::array_store(
            Operand::array_var("a", 3, DataType::Int),
            Operand::const_int(1),
            Operand::const_int(42),
        );
        emit_instruction(&mut out, &mut s, &instr).unwrap();
        assert_eq!(out, "a[1] = 42;\n");
    }

    #[test]
    fn string_const_escapes_quotes_and_backslashes() {
        assert_eq!(render_operand(&Operand::string_const("a\"b\\c")).unwrap(), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn string_const_passes_non_ascii_through_as_utf8() {
        assert_eq!(render_operand(&Operand::string_const("caf\u{e9}")).unwrap(), "\"caf\u{e9}\"");
    }

    #[test]
    fn temp_with_missing_data_type_is_rejected() {
        let mut out = String::new();
        let mut s = state();
        let instr = Instruction::r#move(Operand::temp_untyped(0), Operand::const_int(1));
        let err = emit_instruction(&mut out, &mut s, &instr).unwrap_err();
        assert!(matches!(err, CodeGenError::Logic(_)));
    }
}
