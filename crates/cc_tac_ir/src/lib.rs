//! The three-address intermediate representation. Immutable once produced
//! by `cc_lower`; rewritten in place by `cc_optim` until fixed point.

use cc_ast::{BinaryOp, UnaryOp};
use cc_data::{CConst, StaticInit, Type};
use cc_ident::Ident;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(CConst),
    Variable(Ident),
}

impl Value {
    pub fn as_variable(&self) -> Option<Ident> {
        match self {
            Value::Variable(name) => Some(*name),
            Value::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&CConst> {
        match self {
            Value::Constant(c) => Some(c),
            Value::Variable(_) => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }
}

/// A lowering-only categorization of where an expression's value lives.
/// Never escapes into the final instruction stream: the caller always
/// collapses it into a `Load`/`Store`/`CopyFromOffset`/`CopyToOffset`/
/// `AddPtr` sequence before the result is used as an operand.
#[derive(Debug, Clone)]
pub enum ExpResult {
    PlainOperand(Value),
    DereferencedPointer(Value),
    SubObject(Ident, i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Return(Value),
    SignExtend { src: Value, dst: Ident },
    Truncate { src: Value, dst: Ident },
    ZeroExtend { src: Value, dst: Ident },
    DoubleToInt { src: Value, dst: Ident },
    DoubleToUInt { src: Value, dst: Ident },
    IntToDouble { src: Value, dst: Ident },
    UIntToDouble { src: Value, dst: Ident },
    FunCall { name: Ident, args: Vec<Value>, dst: Option<Ident> },
    Unary { op: UnaryOp, src: Value, dst: Ident },
    Binary { op: BinaryOp, src1: Value, src2: Value, dst: Ident },
    Copy { src: Value, dst: Ident },
    GetAddress { src: Ident, dst: Ident },
    Load { src_ptr: Value, dst: Ident },
    Store { src: Value, dst_ptr: Value },
    AddPtr { scale: i64, base: Value, index: Value, dst: Ident },
    /// `dst_name` must name a variable, never a temporary (spec invariant).
    CopyToOffset { dst_name: Ident, offset: i64, src: Value },
    CopyFromOffset { src_name: Ident, offset: i64, dst: Ident },
    Jump(Ident),
    JumpIfZero { cond: Value, target: Ident },
    JumpIfNotZero { cond: Value, target: Ident },
    Label(Ident),
}

impl Instruction {
    /// The variable this instruction defines, if any. Used by copy
    /// propagation to kill stale facts and by dead-store elimination to
    /// compute the kill set.
    pub fn dst(&self) -> Option<Ident> {
        match self {
            Instruction::SignExtend { dst, .. }
            | Instruction::Truncate { dst, .. }
            | Instruction::ZeroExtend { dst, .. }
            | Instruction::DoubleToInt { dst, .. }
            | Instruction::DoubleToUInt { dst, .. }
            | Instruction::IntToDouble { dst, .. }
            | Instruction::UIntToDouble { dst, .. }
            | Instruction::Unary { dst, .. }
            | Instruction::Binary { dst, .. }
            | Instruction::Copy { dst, .. }
            | Instruction::GetAddress { dst, .. }
            | Instruction::Load { dst, .. }
            | Instruction::AddPtr { dst, .. }
            | Instruction::CopyFromOffset { dst, .. } => Some(*dst),
            Instruction::FunCall { dst, .. } => *dst,
            Instruction::Return(_)
            | Instruction::Store { .. }
            | Instruction::CopyToOffset { .. }
            | Instruction::Jump(_)
            | Instruction::JumpIfZero { .. }
            | Instruction::JumpIfNotZero { .. }
            | Instruction::Label(_) => None,
        }
    }

    /// Every `Value` operand this instruction reads, in evaluation order.
    pub fn uses(&self) -> Vec<&Value> {
        match self {
            Instruction::Return(v) => vec![v],
            Instruction::SignExtend { src, .. }
            | Instruction::Truncate { src, .. }
            | Instruction::ZeroExtend { src, .. }
            | Instruction::DoubleToInt { src, .. }
            | Instruction::DoubleToUInt { src, .. }
            | Instruction::IntToDouble { src, .. }
            | Instruction::UIntToDouble { src, .. }
            | Instruction::Unary { src, .. }
            | Instruction::Copy { src, .. } => vec![src],
            Instruction::Binary { src1, src2, .. } => vec![src1, src2],
            Instruction::FunCall { args, .. } => args.iter().collect(),
            Instruction::Load { src_ptr, .. } => vec![src_ptr],
            Instruction::Store { src, dst_ptr } => vec![src, dst_ptr],
            Instruction::AddPtr { base, index, .. } => vec![base, index],
            Instruction::CopyToOffset { src, .. } => vec![src],
            Instruction::JumpIfZero { cond, .. } | Instruction::JumpIfNotZero { cond, .. } => vec![cond],
            Instruction::GetAddress { .. }
            | Instruction::CopyFromOffset { .. }
            | Instruction::Jump(_)
            | Instruction::Label(_) => vec![],
        }
    }

    /// Mutable counterpart to [`Instruction::uses`], for operand rewriting
    /// passes (copy propagation substitutes a `Variable` operand in place).
    pub fn uses_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Instruction::Return(v) => vec![v],
            Instruction::SignExtend { src, .. }
            | Instruction::Truncate { src, .. }
            | Instruction::ZeroExtend { src, .. }
            | Instruction::DoubleToInt { src, .. }
            | Instruction::DoubleToUInt { src, .. }
            | Instruction::IntToDouble { src, .. }
            | Instruction::UIntToDouble { src, .. }
            | Instruction::Unary { src, .. }
            | Instruction::Copy { src, .. } => vec![src],
            Instruction::Binary { src1, src2, .. } => vec![src1, src2],
            Instruction::FunCall { args, .. } => args.iter_mut().collect(),
            Instruction::Load { src_ptr, .. } => vec![src_ptr],
            Instruction::Store { src, dst_ptr } => vec![src, dst_ptr],
            Instruction::AddPtr { base, index, .. } => vec![base, index],
            Instruction::CopyToOffset { src, .. } => vec![src],
            Instruction::JumpIfZero { cond, .. } | Instruction::JumpIfNotZero { cond, .. } => vec![cond],
            Instruction::GetAddress { .. }
            | Instruction::CopyFromOffset { .. }
            | Instruction::Jump(_)
            | Instruction::Label(_) => vec![],
        }
    }

    pub fn is_jump_target_label(&self, name: Ident) -> bool {
        matches!(self, Instruction::Label(l) if *l == name)
    }

    pub fn jump_targets(&self) -> Vec<Ident> {
        match self {
            Instruction::Jump(t) => vec![*t],
            Instruction::JumpIfZero { target, .. } | Instruction::JumpIfNotZero { target, .. } => {
                vec![*target]
            }
            _ => vec![],
        }
    }

    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_)
                | Instruction::Jump(_)
                | Instruction::JumpIfZero { .. }
                | Instruction::JumpIfNotZero { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: Ident,
    pub is_global: bool,
    pub params: Vec<Ident>,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone)]
pub struct StaticVariable {
    pub name: Ident,
    pub is_global: bool,
    pub var_type: Type,
    pub inits: Vec<StaticInit>,
}

#[derive(Debug, Clone)]
pub struct StaticConstant {
    pub name: Ident,
    pub const_type: Type,
    pub init: StaticInit,
}

#[derive(Debug, Clone)]
pub enum TopLevel {
    Function(Function),
    StaticVariable(StaticVariable),
    StaticConstant(StaticConstant),
}

#[derive(Debug, Clone, Default)]
pub struct TacProgram {
    pub static_constants: Vec<StaticConstant>,
    pub static_variables: Vec<StaticVariable>,
    pub functions: Vec<Function>,
}

impl TacProgram {
    pub fn new() -> Self {
        Self::default()
    }
}
