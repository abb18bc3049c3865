//! Peephole optimizer (spec §4.2): a single forward pass over each
//! function's instructions driven by local use-count analysis. No
//! cross-function or cross-block analysis; a candidate is legal only when no
//! `LABEL` separates its definer from its use.

use crate::error::peephole_bug;
use crate::ir::{Function, Instruction, Opcode, Operand, Program};
use std::collections::{HashMap, HashSet};
use tracing::{debug_span, warn};

pub fn optimize_program(program: &mut Program) {
    for func in &mut program.functions {
        optimize_function(func);
    }
}

/// Counts uses of each temp (appearances in `arg1`/`arg2`/`args`, never in
/// `result` — a definition is not a use). Every temp that is ever defined
/// gets an entry, including zero, so dead-result elimination can tell "never
/// read" apart from "not a temp at all".
fn count_temp_uses(func: &Function) -> HashMap<u32, u32> {
    let mut counts = HashMap::new();
    for instr in &func.instructions {
        if let Some(Operand::Temp { id, .. }) = &instr.result {
            counts.entry(*id).or_insert(0);
        }
    }
    for instr in &func.instructions {
        for op in [&instr.arg1, &instr.arg2].into_iter().flatten() {
            if let Operand::Temp { id, .. } = op {
                *counts.entry(*id).or_insert(0) += 1;
            }
        }
        for op in &instr.args {
            if let Operand::Temp { id, .. } = op {
                *counts.entry(*id).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// `true` when a `LABEL` lies strictly between `from` and `to` — the
/// legality boundary a candidate pair may never cross (spec §4.2).
fn label_crosses_block(func: &Function, from: usize, to: usize) -> bool {
    let (lo, hi) = if from < to { (from, to) } else { (to, from) };
    func.instructions[lo + 1..hi]
        .iter()
        .any(|instr| instr.opcode == Opcode::Label)
}

fn instr_reads_temp(instr: &Instruction, temp_id: u32) -> bool {
    [&instr.arg1, &instr.arg2]
        .into_iter()
        .flatten()
        .chain(instr.args.iter())
        .any(|op| matches!(op, Operand::Temp { id, .. } if *id == temp_id))
}

/// Pattern 1: `CALL` result consumed by exactly one `MOVE t -> var`
/// immediately reachable without crossing a block boundary. Returns the
/// index of that `MOVE` and the variable it moves into.
fn find_move_to_var(func: &Function, def_idx: usize, temp_id: u32) -> Option<(usize, Operand)> {
    func.instructions
        .iter()
        .enumerate()
        .skip(def_idx + 1)
        .find_map(|(j, instr)| {
            let is_match = instr.opcode == Opcode::Move
                && matches!(&instr.arg1, Some(Operand::Temp { id, .. }) if *id == temp_id)
                && matches!(&instr.result, Some(Operand::Var { .. }));
            if is_match && !label_crosses_block(func, def_idx, j) {
                Some((j, instr.result.clone().unwrap()))
            } else {
                None
            }
        })
}

/// `true` when a matching `MOVE` exists somewhere after `def_idx` but a
/// `LABEL` makes it illegal to fuse — used only for the `warn!` diagnostic,
/// never to change the rewrite decision itself.
fn move_to_var_blocked_by_label(func: &Function, def_idx: usize, temp_id: u32) -> bool {
    func.instructions
        .iter()
        .enumerate()
        .skip(def_idx + 1)
        .any(|(j, instr)| {
            instr.opcode == Opcode::Move
                && matches!(&instr.arg1, Some(Operand::Temp { id, .. }) if *id == temp_id)
                && matches!(&instr.result, Some(Operand::Var { .. }))
                && label_crosses_block(func, def_idx, j)
        })
}

/// Pattern 2 (§4.2, direct-consumer inlining): a `CALL` result read by
/// exactly one `PRINT`/`CALL`/`RETURN`/`ARRAY_STORE`. In three-address form
/// the consumer already references the defining `CALL`'s own temp — there
/// is no intervening `MOVE` to delete, so recognizing this pattern changes
/// nothing structurally. It exists so a single-use call result is never
/// mistaken for a dead one (see [`count_temp_uses`] and the dead-result
/// check below, which would already leave it alone since its use count is
/// 1, but the recognition is kept explicit for parity with pattern 1).
fn find_direct_consumer(func: &Function, def_idx: usize, temp_id: u32) -> Option<usize> {
    func.instructions
        .iter()
        .enumerate()
        .skip(def_idx + 1)
        .find_map(|(j, instr)| {
            let consumes = matches!(
                instr.opcode,
                Opcode::Print | Opcode::Call | Opcode::Return | Opcode::ArrayStore
            ) && instr_reads_temp(instr, temp_id);
            if consumes && !label_crosses_block(func, def_idx, j) {
                Some(j)
            } else {
                None
            }
        })
}

/// Pattern 3 (compare-to-zero fusion): `NE t, x, 0` immediately followed by
/// `JUMP_IF_FALSE t -> L` with `t` used exactly once, rewritten to
/// `JUMP_IF_FALSE x -> L` with the `NE` deleted.
fn find_ne_zero_fusion(
    func: &Function,
    use_counts: &HashMap<u32, u32>,
) -> Vec<(usize, usize, Operand)> {
    let mut fusions = Vec::new();
    for (i, instr) in func.instructions.iter().enumerate() {
        let Opcode::Ne = instr.opcode else { continue };
        let Some(Operand::Temp { id, .. }) = &instr.result else {
            continue;
        };
        let is_compare_to_zero = matches!(&instr.arg2, Some(Operand::Const { value: 0, .. }));
        if !is_compare_to_zero {
            continue;
        }
        let Some(next) = func.instructions.get(i + 1) else {
            continue;
        };
        let next_reads_it =
            next.opcode == Opcode::JumpIfFalse && matches!(&next.arg1, Some(Operand::Temp { id: next_id, .. }) if next_id == id);
        if !next_reads_it {
            continue;
        }
        if use_counts.get(id).copied().unwrap_or(0) != 1 {
            continue;
        }
        if label_crosses_block(func, i, i + 1) {
            continue;
        }
        fusions.push((i, i + 1, instr.arg1.clone().expect("NE always has arg1")));
    }
    fusions
}

/// Runs the peephole pass once over a function's instructions. Running it
/// again over the result is a no-op (spec §4.2 idempotence): every rewrite
/// removes the exact shape it matches against, so a second pass never finds
/// the same pattern twice.
pub fn optimize_function(func: &mut Function) {
    let _span = debug_span!("peephole_optimize_function", name = %func.name).entered();
    let use_counts = count_temp_uses(func);

    let mut skip: HashSet<usize> = HashSet::new();
    let mut redirect_result: HashMap<usize, Operand> = HashMap::new();
    let mut null_result: HashSet<usize> = HashSet::new();

    for i in 0..func.instructions.len() {
        let instr = &func.instructions[i];
        if instr.opcode != Opcode::Call {
            continue;
        }
        let Some(Operand::Temp { id, .. }) = instr.result.clone() else {
            continue;
        };

        if let Some((move_idx, var_operand)) = find_move_to_var(func, i, id) {
            redirect_result.insert(i, var_operand);
            skip.insert(move_idx);
        } else {
            if move_to_var_blocked_by_label(func, i, id) {
                warn!(temp = id, "MOVE inlining skipped: a LABEL separates the CALL from its MOVE");
            }
            let _direct_consumer_idx = find_direct_consumer(func, i, id);
            // No rewrite: the consumer already reads the CALL's own temp.
        }

        if use_counts.get(&id).copied().unwrap_or(0) == 0 {
            null_result.insert(i);
        }
    }

    for (i, next_i, ne_fusions_arg1) in find_ne_zero_fusion(func, &use_counts) {
        if skip.contains(&i) {
            peephole_bug!("NE at {i} already marked for removal by another rewrite");
        }
        skip.insert(i);
        func.instructions[next_i].arg1 = Some(ne_fusions_arg1);
    }

    for (i, var_operand) in redirect_result {
        func.instructions[i].result = Some(var_operand);
    }
    for i in null_result {
        if !skip.contains(&i) {
            func.instructions[i].result = None;
        }
    }

    let mut new_instructions = Vec::with_capacity(func.instructions.len());
    for (i, instr) in func.instructions.drain(..).enumerate() {
        if !skip.contains(&i) {
            new_instructions.push(instr);
        }
    }
    func.instructions = new_instructions;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn func_with(instrs: Vec<Instruction>) -> Function {
        let mut f = Function::new("f", DataType::Void);
        for instr in instrs {
            f.push_instruction(instr);
        }
        f
    }

    #[test]
    fn call_result_inlined_into_subsequent_move() {
        let t0 = Operand::temp(0, DataType::Int);
        let var_x = Operand::var("x", DataType::Int);
        let mut func = func_with(vec![
            Instruction::call(Some(t0.clone()), "compute"),
            Instruction::r#move(var_x.clone(), t0.clone()),
        ]);
        optimize_function(&mut func);

        assert_eq!(func.instructions.len(), 1);
        assert_eq!(func.instructions[0].opcode, Opcode::Call);
        assert_eq!(func.instructions[0].result, Some(var_x));
    }

    #[test]
    fn move_not_inlined_across_label() {
        let t0 = Operand::temp(0, DataType::Int);
        let var_x = Operand::var("x", DataType::Int);
        let mut func = func_with(vec![
            Instruction::call(Some(t0.clone()), "compute"),
            Instruction::label("L0"),
            Instruction::r#move(var_x, t0),
        ]);
        optimize_function(&mut func);

        // The label makes the MOVE illegal to fuse, so both instructions and
        // the label all survive untouched.
        assert_eq!(func.instructions.len(), 3);
        assert_eq!(func.instructions[0].opcode, Opcode::Call);
    }

    #[test]
    fn dead_call_result_is_nulled() {
        let t0 = Operand::temp(0, DataType::Int);
        let mut func = func_with(vec![Instruction::call(Some(t0), "side_effecting")]);
        optimize_function(&mut func);

        assert_eq!(func.instructions.len(), 1);
        assert_eq!(func.instructions[0].result, None);
    }

    #[test]
    fn single_use_in_print_is_not_mistaken_for_dead() {
        let t0 = Operand::temp(0, DataType::Int);
        let mut func = func_with(vec![
            Instruction::call(Some(t0.clone()), "compute"),
            Instruction::print(vec![t0]),
        ]);
        optimize_function(&mut func);

        assert_eq!(func.instructions.len(), 2);
        assert!(func.instructions[0].result.is_some());
    }

    #[test]
    fn ne_zero_fused_into_jump_if_false() {
        let t0 = Operand::temp(0, DataType::Bool);
        let x = Operand::var("x", DataType::Int);
        let mut func = func_with(vec![
            Instruction::binary(Opcode::Ne, t0.clone(), x.clone(), Operand::const_int(0)),
            Instruction::jump_if_false(t0, "L_end"),
        ]);
        optimize_function(&mut func);

        assert_eq!(func.instructions.len(), 1);
        assert_eq!(func.instructions[0].opcode, Opcode::JumpIfFalse);
        assert_eq!(func.instructions[0].arg1, Some(x));
    }

    #[test]
    fn ne_zero_not_fused_when_used_more_than_once() {
        let t0 = Operand::temp(0, DataType::Bool);
        let x = Operand::var("x", DataType::Int);
        let mut func = func_with(vec![
            Instruction::binary(Opcode::Ne, t0.clone(), x, Operand::const_int(0)),
            Instruction::jump_if_false(t0.clone(), "L_end"),
            Instruction::print(vec![t0]),
        ]);
        optimize_function(&mut func);

        assert_eq!(func.instructions.len(), 3);
        assert_eq!(func.instructions[0].opcode, Opcode::Ne);
    }

    #[test]
    fn never_deletes_call_print_return_array_store_or_label() {
        let t0 = Operand::temp(0, DataType::Int);
        let array = Operand::array_var("a", 4, DataType::Int);
        let mut func = func_with(vec![
            Instruction::label("entry"),
            Instruction::call(Some(t0.clone()), "f"),
            Instruction::array_store(array, Operand::const_int(0), t0),
            Instruction::r#return(None),
        ]);
        let before_opcodes: Vec<Opcode> = func.instructions.iter().map(|i| i.opcode).collect();
        optimize_function(&mut func);
        let after_opcodes: Vec<Opcode> = func.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(before_opcodes, after_opcodes);
    }

    #[test]
    fn idempotent_on_a_second_pass() {
        let t0 = Operand::temp(0, DataType::Int);
        let var_x = Operand::var("x", DataType::Int);
        let mut func = func_with(vec![
            Instruction::call(Some(t0.clone()), "compute"),
            Instruction::r#move(var_x, t0),
        ]);
        optimize_function(&mut func);
        let once = func.clone();
        optimize_function(&mut func);
        assert_eq!(func, once);
    }
}
