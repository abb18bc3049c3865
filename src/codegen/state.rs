//! Per-function codegen state: the accumulator threaded through instruction
//! dispatch (spec §4.3.2).

use crate::types::DataType;
use std::collections::HashSet;

/// Unique epilogue label for a function (spec §4.3.2 point 2).
pub(super) fn epilogue_label(func_name: &str) -> String {
    format!("__tl_epilogue_{func_name}")
}

/// Tracks what has been declared so far within one C function body, the
/// pending `PARAM` buffer awaiting its `CALL` (spec §4.3.4), and the name of
/// this function's reserved return slot.
pub(super) struct FunctionState {
    pub declared_temps: HashSet<u32>,
    pub declared_vars: HashSet<String>,
    pub pending_params: Vec<String>,
    pub return_type: DataType,
    pub epilogue_label: String,
}

impl FunctionState {
    pub fn new(func_name: &str, return_type: DataType, param_names: &[String]) -> Self {
        FunctionState {
            declared_temps: HashSet::new(),
            declared_vars: param_names.iter().cloned().collect(),
            pending_params: Vec::new(),
            return_type,
            epilogue_label: epilogue_label(func_name),
        }
    }

    /// Name of the reserved slot `RETURN` stores into before jumping to the
    /// epilogue (spec §9, "epilogue-label control flow").
    pub fn return_slot_name(&self) -> &'static str {
        "__tl_retval"
    }

    /// `true` the first time `id` is seen; subsequent calls return `false`.
    pub fn declare_temp_once(&mut self, id: u32) -> bool {
        self.declared_temps.insert(id)
    }

    /// `true` the first time `name` is seen in this function's scope.
    pub fn declare_var_once(&mut self, name: &str) -> bool {
        self.declared_vars.insert(name.to_string())
    }
}
