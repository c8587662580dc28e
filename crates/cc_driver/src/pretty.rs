//! A minimal textual dump of a [`TacProgram`] for `--emit-tac`. Not the
//! "real" pretty-printer named as out-of-scope in spec §4.8 — just enough
//! to eyeball what the pipeline produced.

use cc_data::CConst;
use cc_ident::IdentContext;
use cc_tac_ir::{Instruction, TacProgram, Value};

fn fmt_value(v: &Value, idents: &IdentContext) -> String {
    match v {
        Value::Variable(name) => idents.resolve(*name).to_string(),
        Value::Constant(c) => fmt_const(c),
    }
}

fn fmt_const(c: &CConst) -> String {
    match c {
        CConst::Char(v) => format!("{v}c"),
        CConst::Int(v) => v.to_string(),
        CConst::Long(v) => format!("{v}L"),
        CConst::UChar(v) => format!("{v}uc"),
        CConst::UInt(v) => format!("{v}u"),
        CConst::ULong(v) => format!("{v}uL"),
        CConst::Double(v) => v.to_string(),
    }
}

fn fmt_instruction(instr: &Instruction, idents: &IdentContext) -> String {
    let v = |x: &Value| fmt_value(x, idents);
    let n = |x: &cc_ident::Ident| idents.resolve(*x).to_string();
    match instr {
        Instruction::Return(val) => format!("return {}", v(val)),
        Instruction::SignExtend { src, dst } => format!("{} = sext {}", n(dst), v(src)),
        Instruction::Truncate { src, dst } => format!("{} = trunc {}", n(dst), v(src)),
        Instruction::ZeroExtend { src, dst } => format!("{} = zext {}", n(dst), v(src)),
        Instruction::DoubleToInt { src, dst } => format!("{} = d2i {}", n(dst), v(src)),
        Instruction::DoubleToUInt { src, dst } => format!("{} = d2u {}", n(dst), v(src)),
        Instruction::IntToDouble { src, dst } => format!("{} = i2d {}", n(dst), v(src)),
        Instruction::UIntToDouble { src, dst } => format!("{} = u2d {}", n(dst), v(src)),
        Instruction::FunCall { name, args, dst } => {
            let args = args.iter().map(v).collect::<Vec<_>>().join(", ");
            match dst {
                Some(d) => format!("{} = call {}({})", n(d), n(name), args),
                None => format!("call {}({})", n(name), args),
            }
        }
        Instruction::Unary { op, src, dst } => format!("{} = {op:?} {}", n(dst), v(src)),
        Instruction::Binary { op, src1, src2, dst } => format!("{} = {} {op:?} {}", n(dst), v(src1), v(src2)),
        Instruction::Copy { src, dst } => format!("{} = {}", n(dst), v(src)),
        Instruction::GetAddress { src, dst } => format!("{} = &{}", n(dst), n(src)),
        Instruction::Load { src_ptr, dst } => format!("{} = *{}", n(dst), v(src_ptr)),
        Instruction::Store { src, dst_ptr } => format!("*{} = {}", v(dst_ptr), v(src)),
        Instruction::AddPtr { base, index, scale, dst } => {
            format!("{} = {} + {} * {scale}", n(dst), v(base), v(index))
        }
        Instruction::CopyToOffset { dst_name, offset, src } => format!("{}+{offset} = {}", n(dst_name), v(src)),
        Instruction::CopyFromOffset { src_name, offset, dst } => format!("{} = {}+{offset}", n(dst), n(src_name)),
        Instruction::Jump(target) => format!("jump {}", n(target)),
        Instruction::JumpIfZero { cond, target } => format!("jz {} {}", v(cond), n(target)),
        Instruction::JumpIfNotZero { cond, target } => format!("jnz {} {}", v(cond), n(target)),
        Instruction::Label(name) => format!("{}:", n(name)),
    }
}

pub fn format_program(program: &TacProgram, idents: &IdentContext) -> String {
    let mut out = String::new();
    for function in &program.functions {
        out.push_str(&format!("fn {}:\n", idents.resolve(function.name)));
        for instr in &function.body {
            out.push_str("    ");
            out.push_str(&fmt_instruction(instr, idents));
            out.push('\n');
        }
    }
    out
}
