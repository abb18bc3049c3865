//! Per-function and whole-program emission (spec §4.3.2, §4.3.5).

use super::instructions::emit_instruction;
use super::runtime::{emit_extern_decls, emit_runtime_decls};
use super::state::FunctionState;
use crate::config::CompilerConfig;
use crate::error::CodeGenError;
use crate::ir::{Function, Operand, Program};
use crate::types::DataType;
use std::fmt::Write as _;
use tracing::debug_span;

const HEADER_PROLOGUE: &str = "\
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <stdint.h>
#include <stdbool.h>
";

/// Emits the complete C translation unit for `program` (spec §4.3: header,
/// forward declarations, function bodies, `main` entry, in that order).
pub fn generate_program(program: &Program, config: &CompilerConfig) -> Result<String, CodeGenError> {
    let mut out = String::new();
    out.push_str(HEADER_PROLOGUE);
    writeln!(out)?;
    emit_runtime_decls(&mut out)?;
    emit_extern_decls(&mut out, &config.extern_functions)?;

    for func in &program.functions {
        writeln!(out, "{};", prototype(func)?)?;
    }
    writeln!(out)?;

    let has_source_main = program.functions.iter().any(|f| f.name == "main");

    for func in &program.functions {
        generate_function(&mut out, func)?;
        writeln!(out)?;
    }

    if !has_source_main {
        writeln!(out, "int main(void) {{ return 0; }}")?;
    }

    Ok(out)
}

fn prototype(func: &Function) -> Result<String, CodeGenError> {
    let params = if func.params.is_empty() {
        "void".to_string()
    } else {
        func.params
            .iter()
            .map(param_decl)
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")
    };
    Ok(format!("{} {}({params})", func.return_type.c_type()?, func.name))
}

fn param_decl(param: &Operand) -> Result<String, CodeGenError> {
    match param {
        Operand::Var { name, data_type, .. } => Ok(format!("{} {name}", data_type.c_type()?)),
        other => panic!("function parameter must be a Var operand, got {other:?}"),
    }
}

/// Emits one C function body: prototype, reserved return slot, the
/// instruction walk, and the epilogue label (spec §4.3.2).
fn generate_function(out: &mut String, func: &Function) -> Result<(), CodeGenError> {
    let _span = debug_span!("codegen_function", name = %func.name).entered();
    writeln!(out, "{} {{", prototype(func)?)?;

    let param_names: Vec<String> = func
        .params
        .iter()
        .map(|p| match p {
            Operand::Var { name, .. } => name.clone(),
            other => panic!("function parameter must be a Var operand, got {other:?}"),
        })
        .collect();
    let mut state = FunctionState::new(&func.name, func.return_type.clone(), &param_names);

    if func.return_type != DataType::Void {
        writeln!(
            out,
            "{} {};",
            func.return_type.c_type()?,
            state.return_slot_name()
        )?;
    }

    for instr in &func.instructions {
        emit_instruction(out, &mut state, instr)?;
    }

    writeln!(out, "{}:;", state.epilogue_label)?;
    if func.return_type == DataType::Void {
        writeln!(out, "return;")?;
    } else {
        writeln!(out, "return {};", state.return_slot_name())?;
    }
    writeln!(out, "}}")?;
    Ok(())
}
