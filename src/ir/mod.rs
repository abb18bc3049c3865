//! The three-address intermediate representation (spec §3.2–§3.6).

use crate::types::DataType;
use std::fmt;

/// An IR opcode (spec §3.3's catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Label,
    Jump,
    JumpIf,
    JumpIfFalse,
    Return,
    Move,
    Param,
    Call,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Not,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Print,
    ArrayDecl,
    ArrayInit,
    ArrayLoad,
    ArrayStore,
    BoundsCheck,
    VarDecl,
    InlineAsm,
}

impl Opcode {
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Label => "LABEL",
            Opcode::Jump => "JUMP",
            Opcode::JumpIf => "JUMP_IF",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::Return => "RETURN",
            Opcode::Move => "MOVE",
            Opcode::Param => "PARAM",
            Opcode::Call => "CALL",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::Not => "NOT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Print => "PRINT",
            Opcode::ArrayDecl => "ARRAY_DECL",
            Opcode::ArrayInit => "ARRAY_INIT",
            Opcode::ArrayLoad => "ARRAY_LOAD",
            Opcode::ArrayStore => "ARRAY_STORE",
            Opcode::BoundsCheck => "BOUNDS_CHECK",
            Opcode::VarDecl => "VAR_DECL",
            Opcode::InlineAsm => "INLINE_ASM",
        }
    }

    /// Binary arithmetic/comparison/logic opcodes that take `(result, arg1,
    /// arg2)` and have a symbolic infix form, used by both the pretty
    /// printer and codegen's dispatch table.
    pub fn infix_symbol(self) -> Option<&'static str> {
        match self {
            Opcode::Add => Some("+"),
            Opcode::Sub => Some("-"),
            Opcode::Mul => Some("*"),
            Opcode::Div => Some("/"),
            Opcode::Mod => Some("%"),
            Opcode::Eq => Some("=="),
            Opcode::Ne => Some("!="),
            Opcode::Lt => Some("<"),
            Opcode::Le => Some("<="),
            Opcode::Gt => Some(">"),
            Opcode::Ge => Some(">="),
            Opcode::And => Some("&&"),
            Opcode::Or => Some("||"),
            _ => None,
        }
    }

    /// `true` for opcodes whose side effects mean the peephole pass may
    /// never delete an instruction carrying them outright (spec §4.2
    /// legality invariants).
    pub fn has_mandatory_side_effect(self) -> bool {
        matches!(
            self,
            Opcode::Call
                | Opcode::Print
                | Opcode::Return
                | Opcode::ArrayStore
                | Opcode::BoundsCheck
                | Opcode::Label
                | Opcode::Jump
                | Opcode::JumpIf
                | Opcode::JumpIfFalse
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An IR operand (spec §3.2). Every variant carries the data type codegen
/// needs to pick a C type without re-deriving it.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Function-scoped SSA-like virtual register.
    Temp { id: u32, data_type: Option<DataType> },
    /// A named source-language variable or parameter. `array_size` is `-1`
    /// for non-arrays (spec §3.2).
    Var {
        name: String,
        array_size: i64,
        data_type: DataType,
    },
    Const { value: i64, data_type: DataType },
    FloatConst { value: f64, data_type: DataType },
    StringConst(String),
    Label(String),
    Null,
}

impl Operand {
    pub fn temp(id: u32, data_type: DataType) -> Self {
        Operand::Temp {
            id,
            data_type: Some(data_type),
        }
    }

    /// A temp allocated before its type is known to the caller (only valid
    /// transiently inside `irgen`; every temp must be given a type before
    /// the instruction that defines it is emitted — spec §9).
    pub fn temp_untyped(id: u32) -> Self {
        Operand::Temp {
            id,
            data_type: None,
        }
    }

    pub fn var(name: impl Into<String>, data_type: DataType) -> Self {
        Operand::Var {
            name: name.into(),
            array_size: -1,
            data_type,
        }
    }

    pub fn array_var(name: impl Into<String>, array_size: i64, data_type: DataType) -> Self {
        Operand::Var {
            name: name.into(),
            array_size,
            data_type,
        }
    }

    pub fn const_int(value: i64) -> Self {
        Operand::Const {
            value,
            data_type: DataType::Int,
        }
    }

    pub fn const_bool(value: bool) -> Self {
        Operand::Const {
            value: if value { 1 } else { 0 },
            data_type: DataType::Bool,
        }
    }

    pub fn float_const(value: f64, data_type: DataType) -> Self {
        Operand::FloatConst { value, data_type }
    }

    pub fn string_const(value: impl Into<String>) -> Self {
        Operand::StringConst(value.into())
    }

    pub fn label(name: impl Into<String>) -> Self {
        Operand::Label(name.into())
    }

    pub fn data_type(&self) -> Option<&DataType> {
        match self {
            Operand::Temp { data_type, .. } => data_type.as_ref(),
            Operand::Var { data_type, .. } => Some(data_type),
            Operand::Const { data_type, .. } => Some(data_type),
            Operand::FloatConst { data_type, .. } => Some(data_type),
            Operand::StringConst(_) => Some(&DataType::String),
            Operand::Label(_) => None,
            Operand::Null => Some(&DataType::Null),
        }
    }

    pub fn as_temp_id(&self) -> Option<u32> {
        match self {
            Operand::Temp { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, Operand::Temp { .. })
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp { id, .. } => write!(f, "t{id}"),
            Operand::Var { name, .. } => write!(f, "{name}"),
            Operand::Const { value, .. } => write!(f, "{value}"),
            Operand::FloatConst { value, .. } => write!(f, "{value}"),
            Operand::StringConst(s) => write!(f, "{s:?}"),
            Operand::Label(name) => write!(f, "{name}"),
            Operand::Null => write!(f, "null"),
        }
    }
}

/// A single three-address instruction (spec §3.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub result: Option<Operand>,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    /// Variadic operand list, used only by `PRINT` (spec §3.3, §4.1.1).
    pub args: Vec<Operand>,
    /// Jump target / call target / bounds-check error label, depending on
    /// opcode.
    pub label: Option<String>,
}

impl Instruction {
    fn bare(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            result: None,
            arg1: None,
            arg2: None,
            args: Vec::new(),
            label: None,
        }
    }

    pub fn nop() -> Self {
        Instruction::bare(Opcode::Nop)
    }

    pub fn label(name: impl Into<String>) -> Self {
        Instruction {
            label: Some(name.into()),
            ..Instruction::bare(Opcode::Label)
        }
    }

    pub fn r#move(result: Operand, source: Operand) -> Self {
        Instruction {
            result: Some(result),
            arg1: Some(source),
            ..Instruction::bare(Opcode::Move)
        }
    }

    pub fn binary(opcode: Opcode, result: Operand, arg1: Operand, arg2: Operand) -> Self {
        Instruction {
            result: Some(result),
            arg1: Some(arg1),
            arg2: Some(arg2),
            ..Instruction::bare(opcode)
        }
    }

    pub fn unary(opcode: Opcode, result: Operand, arg: Operand) -> Self {
        Instruction {
            result: Some(result),
            arg1: Some(arg),
            ..Instruction::bare(opcode)
        }
    }

    pub fn jump(label: impl Into<String>) -> Self {
        Instruction {
            label: Some(label.into()),
            ..Instruction::bare(Opcode::Jump)
        }
    }

    pub fn jump_if(condition: Operand, label: impl Into<String>) -> Self {
        Instruction {
            arg1: Some(condition),
            label: Some(label.into()),
            ..Instruction::bare(Opcode::JumpIf)
        }
    }

    pub fn jump_if_false(condition: Operand, label: impl Into<String>) -> Self {
        Instruction {
            arg1: Some(condition),
            label: Some(label.into()),
            ..Instruction::bare(Opcode::JumpIfFalse)
        }
    }

    pub fn call(result: Option<Operand>, func_name: impl Into<String>) -> Self {
        Instruction {
            result,
            label: Some(func_name.into()),
            ..Instruction::bare(Opcode::Call)
        }
    }

    pub fn r#return(value: Option<Operand>) -> Self {
        Instruction {
            arg1: value,
            ..Instruction::bare(Opcode::Return)
        }
    }

    pub fn param(value: Operand) -> Self {
        Instruction {
            arg1: Some(value),
            ..Instruction::bare(Opcode::Param)
        }
    }

    pub fn print(values: Vec<Operand>) -> Self {
        Instruction {
            args: values,
            ..Instruction::bare(Opcode::Print)
        }
    }

    pub fn array_load(result: Operand, array: Operand, index: Operand) -> Self {
        Instruction {
            result: Some(result),
            arg1: Some(array),
            arg2: Some(index),
            ..Instruction::bare(Opcode::ArrayLoad)
        }
    }

    pub fn array_store(array: Operand, index: Operand, value: Operand) -> Self {
        Instruction {
            result: Some(value),
            arg1: Some(array),
            arg2: Some(index),
            ..Instruction::bare(Opcode::ArrayStore)
        }
    }

    pub fn bounds_check(index: Operand, size: Operand, error_label: impl Into<String>) -> Self {
        Instruction {
            arg1: Some(index),
            arg2: Some(size),
            label: Some(error_label.into()),
            ..Instruction::bare(Opcode::BoundsCheck)
        }
    }

    pub fn array_decl(name: impl Into<String>, size: i64, element_type: DataType) -> Self {
        Instruction {
            result: Some(Operand::array_var(name, size, element_type)),
            ..Instruction::bare(Opcode::ArrayDecl)
        }
    }

    pub fn array_init(
        name: impl Into<String>,
        size: i64,
        element_type: DataType,
        value: Operand,
    ) -> Self {
        Instruction {
            result: Some(Operand::array_var(name, size, element_type)),
            arg1: Some(value),
            ..Instruction::bare(Opcode::ArrayInit)
        }
    }

    pub fn var_decl(name: impl Into<String>, data_type: DataType) -> Self {
        Instruction {
            result: Some(Operand::var(name, data_type)),
            ..Instruction::bare(Opcode::VarDecl)
        }
    }

    pub fn inline_asm(text: impl Into<String>) -> Self {
        Instruction {
            label: Some(text.into()),
            ..Instruction::bare(Opcode::InlineAsm)
        }
    }

    /// All operand slots that reference a temp, for use-count analysis
    /// (spec §4.2 pre-analysis) and codegen's declaration tracking.
    pub fn temp_operands(&self) -> impl Iterator<Item = &Operand> {
        self.result
            .iter()
            .chain(self.arg1.iter())
            .chain(self.arg2.iter())
            .chain(self.args.iter())
            .filter(|op| op.is_temp())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Nop => write!(f, "NOP"),
            Opcode::Label => write!(f, "{}:", self.label.as_deref().unwrap_or("?")),
            Opcode::Move => write!(
                f,
                "{} = {}",
                self.result.as_ref().unwrap(),
                self.arg1.as_ref().unwrap()
            ),
            Opcode::Neg | Opcode::Not => write!(
                f,
                "{} = {} {}",
                self.result.as_ref().unwrap(),
                self.opcode,
                self.arg1.as_ref().unwrap()
            ),
            Opcode::Jump => write!(f, "GOTO {}", self.label.as_deref().unwrap_or("?")),
            Opcode::JumpIf => write!(
                f,
                "IF {} GOTO {}",
                self.arg1.as_ref().unwrap(),
                self.label.as_deref().unwrap_or("?")
            ),
            Opcode::JumpIfFalse => write!(
                f,
                "IF_FALSE {} GOTO {}",
                self.arg1.as_ref().unwrap(),
                self.label.as_deref().unwrap_or("?")
            ),
            Opcode::Call => {
                if let Some(result) = &self.result {
                    write!(f, "{result} = ")?;
                }
                write!(f, "CALL {}", self.label.as_deref().unwrap_or("?"))
            }
            Opcode::Return => {
                write!(f, "RETURN")?;
                if let Some(value) = &self.arg1 {
                    write!(f, " {value}")?;
                }
                Ok(())
            }
            Opcode::Param => write!(f, "PARAM {}", self.arg1.as_ref().unwrap()),
            Opcode::Print => {
                write!(f, "PRINT ")?;
                for (i, arg) in self.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                Ok(())
            }
            Opcode::ArrayLoad => write!(
                f,
                "{} = {}[{}]",
                self.result.as_ref().unwrap(),
                self.arg1.as_ref().unwrap(),
                self.arg2.as_ref().unwrap()
            ),
            Opcode::ArrayStore => write!(
                f,
                "{}[{}] = {}",
                self.arg1.as_ref().unwrap(),
                self.arg2.as_ref().unwrap(),
                self.result.as_ref().unwrap()
            ),
            Opcode::BoundsCheck => write!(
                f,
                "BOUNDS_CHECK {}, {} -> {}",
                self.arg1.as_ref().unwrap(),
                self.arg2.as_ref().unwrap(),
                self.label.as_deref().unwrap_or("?")
            ),
            Opcode::ArrayDecl => write!(f, "ARRAY_DECL {}", self.result.as_ref().unwrap()),
            Opcode::ArrayInit => write!(
                f,
                "ARRAY_INIT {} = {}",
                self.result.as_ref().unwrap(),
                self.arg1.as_ref().unwrap()
            ),
            Opcode::VarDecl => write!(f, "VAR_DECL {}", self.result.as_ref().unwrap()),
            Opcode::InlineAsm => write!(f, "INLINE_ASM {:?}", self.label.as_deref().unwrap_or("")),
            _ => {
                write!(
                    f,
                    "{} = {} {} {}",
                    self.result.as_ref().unwrap(),
                    self.arg1.as_ref().unwrap(),
                    self.opcode.infix_symbol().unwrap_or("?"),
                    self.arg2.as_ref().unwrap()
                )
            }
        }
    }
}

/// One entry of the loop-context stack (spec §3.4): start/end labels of one
/// enclosing loop, used to lower `break`/`continue`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopContext {
    pub start_label: String,
    pub end_label: String,
}

/// A single IR function (spec §3.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: DataType,
    pub params: Vec<Operand>,
    pub instructions: Vec<Instruction>,
    temp_counter: u32,
    label_counter: u32,
    /// Explicit stack, pushed at loop entry and popped at loop exit
    /// (spec §3.4, §5 resource discipline).
    loop_stack: Vec<LoopContext>,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: DataType) -> Self {
        Function {
            name: name.into(),
            return_type,
            params: Vec::new(),
            instructions: Vec::new(),
            temp_counter: 0,
            label_counter: 0,
            loop_stack: Vec::new(),
        }
    }

    pub fn add_param(&mut self, param: Operand) {
        self.params.push(param);
    }

    pub fn push_instruction(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Allocates the next temp id. Does not assign a data type — callers
    /// must pair this with [`Operand::temp`] once the type is known.
    pub fn new_temp_id(&mut self) -> u32 {
        let id = self.temp_counter;
        self.temp_counter += 1;
        id
    }

    pub fn new_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    pub fn enter_loop(&mut self, start_label: impl Into<String>, end_label: impl Into<String>) {
        self.loop_stack.push(LoopContext {
            start_label: start_label.into(),
            end_label: end_label.into(),
        });
    }

    pub fn exit_loop(&mut self) {
        self.loop_stack.pop();
    }

    pub fn current_loop(&self) -> Option<&LoopContext> {
        self.loop_stack.last()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {}({}) -> {}:", self.name, self.params.len(), self.return_type)?;
        for instr in &self.instructions {
            writeln!(f, "    {instr}")?;
        }
        Ok(())
    }
}

/// An ordered sequence of IR functions (spec §3.5). Order is preserved
/// end-to-end because `main` must be emitted last and forward declarations
/// are derived from this order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn add_function(&mut self, func: Function) {
        self.functions.push(func);
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.functions {
            writeln!(f, "{func}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_monotonic_per_function() {
        let mut func = Function::new("f", DataType::Void);
        assert_eq!(func.new_temp_id(), 0);
        assert_eq!(func.new_temp_id(), 1);
        assert_eq!(func.new_temp_id(), 2);
    }

    #[test]
    fn labels_are_monotonic_and_distinct() {
        let mut func = Function::new("f", DataType::Void);
        assert_eq!(func.new_label(), "L0");
        assert_eq!(func.new_label(), "L1");
    }

    #[test]
    fn loop_stack_pushes_and_pops_in_lockstep() {
        let mut func = Function::new("f", DataType::Void);
        assert!(func.current_loop().is_none());
        func.enter_loop("L0", "L1");
        assert_eq!(func.current_loop().unwrap().start_label, "L0");
        func.enter_loop("L2", "L3");
        assert_eq!(func.current_loop().unwrap().start_label, "L2");
        func.exit_loop();
        assert_eq!(func.current_loop().unwrap().start_label, "L0");
        func.exit_loop();
        assert!(func.current_loop().is_none());
    }

    #[test]
    fn display_renders_move_instruction() {
        let instr = Instruction::r#move(Operand::temp(0, DataType::Int), Operand::const_int(5));
        assert_eq!(instr.to_string(), "t0 = 5");
    }

    #[test]
    fn temp_operands_collects_every_slot() {
        let instr = Instruction::print(vec![
            Operand::temp(0, DataType::Int),
            Operand::const_int(1),
            Operand::temp(1, DataType::Int),
        ]);
        let ids: Vec<u32> = instr.temp_operands().filter_map(Operand::as_temp_id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
