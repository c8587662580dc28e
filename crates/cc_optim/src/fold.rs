//! Constant folding (spec §4.5): per instruction, if every source operand
//! is already a `Constant`, evaluate it and replace the instruction with a
//! `Copy` of the result — or, for a constant-conditioned branch, with an
//! unconditional `Jump` or nothing at all.
//!
//! Conversion instructions (`SignExtend`/`Truncate`/`ZeroExtend`/
//! `DoubleToInt`/`DoubleToUInt`/`IntToDouble`/`UIntToDouble`) are left
//! alone here: picking the right result width needs the destination
//! variable's declared type, which lowering does not currently thread
//! through the TAC (see DESIGN.md).

use cc_ast::{BinaryOp, UnaryOp};
use cc_data::CConst;
use cc_tac_ir::{Instruction, Value};

enum Step {
    Keep,
    Replace(Instruction),
    Remove,
}

/// Folds in place; returns whether anything changed.
pub fn fold_instructions(instrs: &mut Vec<Instruction>) -> bool {
    let mut changed = false;
    let mut out = Vec::with_capacity(instrs.len());
    for instr in instrs.drain(..) {
        match fold_step(&instr) {
            Step::Keep => out.push(instr),
            Step::Replace(new_instr) => {
                out.push(new_instr);
                changed = true;
            }
            Step::Remove => changed = true,
        }
    }
    *instrs = out;
    changed
}

fn fold_step(instr: &Instruction) -> Step {
    match instr {
        Instruction::Unary { op, src: Value::Constant(c), dst } => {
            Step::Replace(Instruction::Copy { src: Value::Constant(apply_unary(*op, *c)), dst: *dst })
        }
        Instruction::Binary { op, src1: Value::Constant(a), src2: Value::Constant(b), dst } => {
            Step::Replace(Instruction::Copy { src: Value::Constant(apply_binary(*op, *a, *b)), dst: *dst })
        }
        Instruction::JumpIfZero { cond: Value::Constant(c), target } => {
            if c.is_zero() {
                Step::Replace(Instruction::Jump(*target))
            } else {
                Step::Remove
            }
        }
        Instruction::JumpIfNotZero { cond: Value::Constant(c), target } => {
            if !c.is_zero() {
                Step::Replace(Instruction::Jump(*target))
            } else {
                Step::Remove
            }
        }
        _ => Step::Keep,
    }
}

fn apply_unary(op: UnaryOp, c: CConst) -> CConst {
    match op {
        UnaryOp::Not => CConst::Int(if c.is_zero() { 1 } else { 0 }),
        UnaryOp::Negate => match c {
            CConst::Double(v) => CConst::Double(-v),
            other => same_kind_from_i64(other, as_bits(other).wrapping_neg()),
        },
        UnaryOp::Complement => match c {
            CConst::Double(_) => c,
            other => same_kind_from_i64(other, !as_bits(other)),
        },
    }
}

fn apply_binary(op: BinaryOp, a: CConst, b: CConst) -> CConst {
    if op.is_relational() {
        return CConst::Int(if relational(op, a, b) { 1 } else { 0 });
    }
    if let (CConst::Double(x), CConst::Double(y)) = (a, b) {
        return CConst::Double(arithmetic_double(op, x, y));
    }
    if a.is_unsigned() {
        let (x, y) = (as_bits(a) as u64, as_bits(b) as u64);
        same_kind_from_i64(a, arithmetic_unsigned(op, x, y) as i64)
    } else {
        let (x, y) = (as_bits(a), as_bits(b));
        same_kind_from_i64(a, arithmetic_signed(op, x, y))
    }
}

fn relational(op: BinaryOp, a: CConst, b: CConst) -> bool {
    if let (CConst::Double(x), CConst::Double(y)) = (a, b) {
        return match op {
            BinaryOp::Equal => x == y,
            BinaryOp::NotEqual => x != y,
            BinaryOp::LessThan => x < y,
            BinaryOp::LessOrEqual => x <= y,
            BinaryOp::GreaterThan => x > y,
            BinaryOp::GreaterOrEqual => x >= y,
            _ => unreachable!("non-relational op passed to relational()"),
        };
    }
    if a.is_unsigned() {
        let (x, y) = (as_bits(a) as u64, as_bits(b) as u64);
        match op {
            BinaryOp::Equal => x == y,
            BinaryOp::NotEqual => x != y,
            BinaryOp::LessThan => x < y,
            BinaryOp::LessOrEqual => x <= y,
            BinaryOp::GreaterThan => x > y,
            BinaryOp::GreaterOrEqual => x >= y,
            _ => unreachable!("non-relational op passed to relational()"),
        }
    } else {
        let (x, y) = (as_bits(a), as_bits(b));
        match op {
            BinaryOp::Equal => x == y,
            BinaryOp::NotEqual => x != y,
            BinaryOp::LessThan => x < y,
            BinaryOp::LessOrEqual => x <= y,
            BinaryOp::GreaterThan => x > y,
            BinaryOp::GreaterOrEqual => x >= y,
            _ => unreachable!("non-relational op passed to relational()"),
        }
    }
}

fn arithmetic_double(op: BinaryOp, x: f64, y: f64) -> f64 {
    match op {
        BinaryOp::Add => x + y,
        BinaryOp::Subtract => x - y,
        BinaryOp::Multiply => x * y,
        BinaryOp::Divide => x / y,
        _ => unreachable!("non-arithmetic op on double operands"),
    }
}

fn arithmetic_signed(op: BinaryOp, x: i64, y: i64) -> i64 {
    match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Subtract => x.wrapping_sub(y),
        BinaryOp::Multiply => x.wrapping_mul(y),
        BinaryOp::Divide => {
            if y == 0 {
                0
            } else {
                x.wrapping_div(y)
            }
        }
        BinaryOp::Remainder => {
            if y == 0 {
                0
            } else {
                x.wrapping_rem(y)
            }
        }
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::BitShiftLeft => x.wrapping_shl((y as u32) & 63),
        BinaryOp::BitShiftRight | BinaryOp::BitShrArithmetic => x.wrapping_shr((y as u32) & 63),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::LessThan
        | BinaryOp::LessOrEqual | BinaryOp::GreaterThan | BinaryOp::GreaterOrEqual => {
            unreachable!("short-circuit/relational ops never reach arithmetic_signed")
        }
    }
}

fn arithmetic_unsigned(op: BinaryOp, x: u64, y: u64) -> u64 {
    match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Subtract => x.wrapping_sub(y),
        BinaryOp::Multiply => x.wrapping_mul(y),
        BinaryOp::Divide => {
            if y == 0 {
                0
            } else {
                x.wrapping_div(y)
            }
        }
        BinaryOp::Remainder => {
            if y == 0 {
                0
            } else {
                x.wrapping_rem(y)
            }
        }
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::BitShiftLeft => x.wrapping_shl((y as u32) & 63),
        // Unsigned right shift is always logical; `BitShrArithmetic` is
        // only ever retagged onto a signed LHS (spec §9), so it should
        // not appear here in practice.
        BinaryOp::BitShiftRight | BinaryOp::BitShrArithmetic => x.wrapping_shr((y as u32) & 63),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::LessThan
        | BinaryOp::LessOrEqual | BinaryOp::GreaterThan | BinaryOp::GreaterOrEqual => {
            unreachable!("short-circuit/relational ops never reach arithmetic_unsigned")
        }
    }
}

/// The constant's bit pattern, sign-extended/zero-extended into an `i64`
/// bucket as appropriate so arithmetic on the bucket reproduces the
/// original width's wraparound after truncating back with `same_kind_from_i64`.
fn as_bits(c: CConst) -> i64 {
    match c {
        CConst::Char(v) => v as i64,
        CConst::Int(v) => v as i64,
        CConst::Long(v) => v,
        CConst::UChar(v) => v as i64,
        CConst::UInt(v) => v as i64,
        CConst::ULong(v) => v as i64,
        CConst::Double(v) => v as i64,
    }
}

fn same_kind_from_i64(template: CConst, v: i64) -> CConst {
    match template {
        CConst::Char(_) => CConst::Char(v as i8),
        CConst::Int(_) => CConst::Int(v as i32),
        CConst::Long(_) => CConst::Long(v),
        CConst::UChar(_) => CConst::UChar(v as u8),
        CConst::UInt(_) => CConst::UInt(v as u32),
        CConst::ULong(_) => CConst::ULong(v as u64),
        CConst::Double(_) => unreachable!("integer result requested for a double operand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ident::IdentContext;

    #[test]
    fn folds_a_binary_add_of_two_constants_into_a_copy() {
        let mut idents = IdentContext::new();
        let dst = idents.fresh_var("t");
        let mut instrs = vec![Instruction::Binary {
            op: BinaryOp::Add,
            src1: Value::Constant(CConst::Int(2)),
            src2: Value::Constant(CConst::Int(2)),
            dst,
        }];
        assert!(fold_instructions(&mut instrs));
        assert_eq!(instrs, vec![Instruction::Copy { src: Value::Constant(CConst::Int(4)), dst }]);
    }

    #[test]
    fn division_by_a_constant_zero_folds_to_zero_rather_than_panicking() {
        let mut idents = IdentContext::new();
        let dst = idents.fresh_var("t");
        let mut instrs = vec![Instruction::Binary {
            op: BinaryOp::Divide,
            src1: Value::Constant(CConst::Int(7)),
            src2: Value::Constant(CConst::Int(0)),
            dst,
        }];
        fold_instructions(&mut instrs);
        assert_eq!(instrs, vec![Instruction::Copy { src: Value::Constant(CConst::Int(0)), dst }]);
    }

    #[test]
    fn a_false_jump_if_zero_is_deleted_outright() {
        let mut idents = IdentContext::new();
        let label = idents.fresh_label("L");
        let mut instrs = vec![Instruction::JumpIfZero { cond: Value::Constant(CConst::Int(1)), target: label }];
        assert!(fold_instructions(&mut instrs));
        assert!(instrs.is_empty());
    }

    #[test]
    fn a_true_jump_if_zero_becomes_an_unconditional_jump() {
        let mut idents = IdentContext::new();
        let label = idents.fresh_label("L");
        let mut instrs = vec![Instruction::JumpIfZero { cond: Value::Constant(CConst::Int(0)), target: label }];
        fold_instructions(&mut instrs);
        assert_eq!(instrs, vec![Instruction::Jump(label)]);
    }

    #[test]
    fn idempotent_on_an_already_folded_stream() {
        let mut idents = IdentContext::new();
        let dst = idents.fresh_var("t");
        let mut instrs = vec![Instruction::Copy { src: Value::Constant(CConst::Int(4)), dst }];
        assert!(!fold_instructions(&mut instrs));
    }

    #[test]
    fn unsigned_division_treats_a_negative_i32_pattern_as_a_large_magnitude() {
        // `UInt(u32::MAX)` is bit-for-bit `-1i32`; unsigned division must
        // not take the signed shortcut through that bit pattern.
        let mut idents = IdentContext::new();
        let dst = idents.fresh_var("t");
        let mut instrs = vec![Instruction::Binary {
            op: BinaryOp::Divide,
            src1: Value::Constant(CConst::UInt(u32::MAX)),
            src2: Value::Constant(CConst::UInt(2)),
            dst,
        }];
        fold_instructions(&mut instrs);
        assert_eq!(instrs, vec![Instruction::Copy { src: Value::Constant(CConst::UInt(u32::MAX / 2)), dst }]);
    }
}
