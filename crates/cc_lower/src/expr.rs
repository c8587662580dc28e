//! Expression lowering: walks a type-checked `CExp` and emits the
//! instructions that compute it, returning an `ExpResult` the caller
//! collapses with `read`/`assign_res` (spec §4.2).

use cc_ast::{AssignUnop, BinaryOp, CExp, CExpKind, UnaryOp};
use cc_data::{CConst, Type, TypeKind};
use cc_tac_ir::{ExpResult, Instruction, Value};

use crate::context::Lowering;

impl<'a> Lowering<'a> {
    /// Lowers `exp` to an rvalue, collapsing whatever `ExpResult` it
    /// produces through a load if it names an lvalue.
    pub fn lower_rvalue(&mut self, exp: &CExp) -> Value {
        let result = self.lower_exp(exp);
        self.read(result)
    }

    pub fn lower_exp(&mut self, exp: &CExp) -> ExpResult {
        match &exp.kind {
            CExpKind::Constant(c) => ExpResult::PlainOperand(Value::Constant(*c)),
            CExpKind::StringLiteral(lit) => {
                let label = self.intern_string_constant(*lit);
                ExpResult::PlainOperand(Value::Variable(label))
            }
            CExpKind::Var(name) => ExpResult::PlainOperand(Value::Variable(*name)),
            CExpKind::Cast { target, exp: inner } => self.lower_cast(exp, target, inner),
            CExpKind::Unary { op, exp: inner } => self.lower_unary(exp, *op, inner),
            CExpKind::Binary { op, lhs, rhs } => self.lower_binary(exp, *op, lhs, rhs),
            CExpKind::Assignment(a) => self.lower_assignment(exp, a),
            CExpKind::Conditional { cond, then_exp, else_exp } => {
                self.lower_conditional(exp, cond, then_exp, else_exp)
            }
            CExpKind::FunctionCall { name, args } => self.lower_call(exp, *name, args),
            CExpKind::Dereference(inner) => {
                let ptr = self.lower_rvalue(inner);
                ExpResult::DereferencedPointer(ptr)
            }
            CExpKind::AddrOf(inner) => self.lower_addrof(inner),
            CExpKind::Subscript { ptr, index } => self.lower_subscript(ptr, index),
            CExpKind::SizeOfExpr(inner) => self.lower_sizeof(inner.ty()),
            CExpKind::SizeOfType(ty) => self.lower_sizeof(ty),
            CExpKind::Dot { base, member } => self.lower_dot(base, *member),
            CExpKind::Arrow { base, member } => self.lower_arrow(base, *member),
        }
    }

    fn lower_cast(&mut self, _exp: &CExp, target: &Type, inner: &CExp) -> ExpResult {
        if target.is_void() {
            // Evaluated for effect only; the result is never read.
            let _ = self.lower_exp(inner);
            return ExpResult::PlainOperand(Value::Constant(CConst::Int(0)));
        }
        let src_val = self.lower_rvalue(inner);
        ExpResult::PlainOperand(self.convert_value(src_val, inner.ty(), target))
    }

    /// Converts `src_val` (of type `src_ty`) to `target`, picking the
    /// conversion instruction by size/signedness/float-ness. A no-op,
    /// returning `src_val` unchanged, when the types already match —
    /// shared by `lower_cast` and the compound-assignment write-back.
    fn convert_value(&mut self, src_val: Value, src_ty: &Type, target: &Type) -> Value {
        if *target == *src_ty {
            return src_val;
        }
        let dst = self.idents.fresh_var("tmp");
        let instr = match (src_ty.kind(), target.kind()) {
            (_, TypeKind::Pointer(_)) | (TypeKind::Pointer(_), _) => {
                Instruction::Copy { src: src_val, dst }
            }
            (TypeKind::Double, _) if target.is_signed() => {
                Instruction::DoubleToInt { src: src_val, dst }
            }
            (TypeKind::Double, _) => Instruction::DoubleToUInt { src: src_val, dst },
            (_, TypeKind::Double) if src_ty.is_signed() => {
                Instruction::IntToDouble { src: src_val, dst }
            }
            (_, TypeKind::Double) => Instruction::UIntToDouble { src: src_val, dst },
            _ => {
                let src_size = src_ty.scalar_size();
                let target_size = target.scalar_size();
                if target_size == src_size {
                    Instruction::Copy { src: src_val, dst }
                } else if target_size < src_size {
                    Instruction::Truncate { src: src_val, dst }
                } else if src_ty.is_signed() {
                    Instruction::SignExtend { src: src_val, dst }
                } else {
                    Instruction::ZeroExtend { src: src_val, dst }
                }
            }
        };
        self.emit(instr);
        Value::Variable(dst)
    }

    /// Strips result casts off `exp` to find the underlying expression —
    /// the compound-assignment counterpart of the analyzer's own
    /// `peel_casts`, since lowering sees the same cast-wrapped shapes.
    fn peel_casts(mut exp: &CExp) -> &CExp {
        while let CExpKind::Cast { exp: inner, .. } = &exp.kind {
            exp = inner;
        }
        exp
    }

    fn lower_unary(&mut self, exp: &CExp, op: UnaryOp, inner: &CExp) -> ExpResult {
        let src = self.lower_rvalue(inner);
        let dst = self.plain_inner_value(exp);
        self.emit(Instruction::Unary { op, src, dst });
        ExpResult::PlainOperand(Value::Variable(dst))
    }

    fn lower_binary(&mut self, exp: &CExp, op: BinaryOp, lhs: &CExp, rhs: &CExp) -> ExpResult {
        match op {
            BinaryOp::And => self.lower_and(lhs, rhs),
            BinaryOp::Or => self.lower_or(lhs, rhs),
            BinaryOp::Add => self.lower_add(exp, lhs, rhs),
            BinaryOp::Subtract => self.lower_subtract(exp, lhs, rhs),
            _ => {
                let l = self.lower_rvalue(lhs);
                let r = self.lower_rvalue(rhs);
                let dst = self.plain_inner_value(exp);
                self.emit(Instruction::Binary { op, src1: l, src2: r, dst });
                ExpResult::PlainOperand(Value::Variable(dst))
            }
        }
    }

    fn lower_add(&mut self, exp: &CExp, lhs: &CExp, rhs: &CExp) -> ExpResult {
        if lhs.ty().is_pointer() && !rhs.ty().is_pointer() {
            let scale = self.pointee_scale(lhs.ty());
            let base = self.lower_rvalue(lhs);
            let index = self.lower_rvalue(rhs);
            let dst = self.plain_inner_value(exp);
            self.emit(Instruction::AddPtr { scale, base, index, dst });
            ExpResult::PlainOperand(Value::Variable(dst))
        } else if rhs.ty().is_pointer() && !lhs.ty().is_pointer() {
            let scale = self.pointee_scale(rhs.ty());
            let index = self.lower_rvalue(lhs);
            let base = self.lower_rvalue(rhs);
            let dst = self.plain_inner_value(exp);
            self.emit(Instruction::AddPtr { scale, base, index, dst });
            ExpResult::PlainOperand(Value::Variable(dst))
        } else {
            let l = self.lower_rvalue(lhs);
            let r = self.lower_rvalue(rhs);
            let dst = self.plain_inner_value(exp);
            self.emit(Instruction::Binary { op: BinaryOp::Add, src1: l, src2: r, dst });
            ExpResult::PlainOperand(Value::Variable(dst))
        }
    }

    fn lower_subtract(&mut self, exp: &CExp, lhs: &CExp, rhs: &CExp) -> ExpResult {
        if lhs.ty().is_pointer() && rhs.ty().is_pointer() {
            let scale = self.pointee_scale(lhs.ty());
            let l = self.lower_rvalue(lhs);
            let r = self.lower_rvalue(rhs);
            let diff = self.ptr_inner_value();
            self.emit(Instruction::Binary { op: BinaryOp::Subtract, src1: l, src2: r, dst: diff });
            let dst = self.ptr_inner_value();
            self.emit(Instruction::Binary {
                op: BinaryOp::Divide,
                src1: Value::Variable(diff),
                src2: Value::Constant(CConst::Long(scale)),
                dst,
            });
            ExpResult::PlainOperand(Value::Variable(dst))
        } else if lhs.ty().is_pointer() {
            let scale = self.pointee_scale(lhs.ty());
            let base = self.lower_rvalue(lhs);
            let idx_val = self.lower_rvalue(rhs);
            let neg_idx = self.plain_inner_value(rhs);
            self.emit(Instruction::Unary { op: UnaryOp::Negate, src: idx_val, dst: neg_idx });
            let dst = self.plain_inner_value(exp);
            self.emit(Instruction::AddPtr { scale, base, index: Value::Variable(neg_idx), dst });
            ExpResult::PlainOperand(Value::Variable(dst))
        } else {
            let l = self.lower_rvalue(lhs);
            let r = self.lower_rvalue(rhs);
            let dst = self.plain_inner_value(exp);
            self.emit(Instruction::Binary { op: BinaryOp::Subtract, src1: l, src2: r, dst });
            ExpResult::PlainOperand(Value::Variable(dst))
        }
    }

    fn lower_and(&mut self, lhs: &CExp, rhs: &CExp) -> ExpResult {
        let false_label = self.fresh_label("and_false");
        let end_label = self.fresh_label("and_end");
        let l = self.lower_rvalue(lhs);
        self.emit(Instruction::JumpIfZero { cond: l, target: false_label });
        let r = self.lower_rvalue(rhs);
        self.emit(Instruction::JumpIfZero { cond: r, target: false_label });
        let dst = self.ptr_inner_value();
        self.emit(Instruction::Copy { src: Value::Constant(CConst::Int(1)), dst });
        self.emit(Instruction::Jump(end_label));
        self.emit(Instruction::Label(false_label));
        self.emit(Instruction::Copy { src: Value::Constant(CConst::Int(0)), dst });
        self.emit(Instruction::Label(end_label));
        ExpResult::PlainOperand(Value::Variable(dst))
    }

    fn lower_or(&mut self, lhs: &CExp, rhs: &CExp) -> ExpResult {
        let true_label = self.fresh_label("or_true");
        let end_label = self.fresh_label("or_end");
        let l = self.lower_rvalue(lhs);
        self.emit(Instruction::JumpIfNotZero { cond: l, target: true_label });
        let r = self.lower_rvalue(rhs);
        self.emit(Instruction::JumpIfNotZero { cond: r, target: true_label });
        let dst = self.ptr_inner_value();
        self.emit(Instruction::Copy { src: Value::Constant(CConst::Int(0)), dst });
        self.emit(Instruction::Jump(end_label));
        self.emit(Instruction::Label(true_label));
        self.emit(Instruction::Copy { src: Value::Constant(CConst::Int(1)), dst });
        self.emit(Instruction::Label(end_label));
        ExpResult::PlainOperand(Value::Variable(dst))
    }

    /// Plain `lhs = rhs` goes through `exp_left`; compound assignment and
    /// postfix `++`/`--` fold the lvalue into `exp_right` as `lhs op rhs` and
    /// leave `exp_left` empty. Either way the lvalue is lowered exactly
    /// once — its `ExpResult` is cheap to clone and reuse for both the read
    /// and the write, so no side effect it carries (e.g. `a[i++] += 1`) ever
    /// runs twice.
    fn lower_assignment(&mut self, _exp: &CExp, a: &cc_ast::Assignment) -> ExpResult {
        if let Some(lhs) = &a.exp_left {
            let lvalue = self.lower_exp(lhs);
            let rhs_val = self.lower_rvalue(&a.exp_right);
            let written = self.assign_res(lvalue, rhs_val);
            return ExpResult::PlainOperand(written);
        }

        // The analyzer wraps the binary in a result cast back down to the
        // lvalue's own width whenever that differs from the binary's joint
        // (usual-arithmetic-conversions) type — peel it off to reach the
        // `Binary`, but keep its target type as `result_ty` for the
        // write-back conversion below.
        let result_ty = a.exp_right.ty().clone();
        let binary_exp = Self::peel_casts(&a.exp_right);
        let CExpKind::Binary { op, lhs, rhs } = &binary_exp.kind else {
            unreachable!("compound/postfix assignment's exp_right is always a Binary, possibly cast-wrapped")
        };
        let joint_ty = binary_exp.ty().clone();

        // `lhs` itself carries the promotion cast up to `joint_ty`; peel
        // that too to reach the raw lvalue and lower it exactly once.
        let raw_lhs = Self::peel_casts(lhs);
        let raw_ty = raw_lhs.ty().clone();
        let lvalue = self.lower_exp(raw_lhs);
        let raw_current = self.read(lvalue.clone());
        let promoted_current = self.convert_value(raw_current.clone(), &raw_ty, &joint_ty);

        let rhs_val = self.lower_rvalue(rhs);
        let dst = self.plain_inner_value(binary_exp);
        self.emit(Instruction::Binary { op: *op, src1: promoted_current, src2: rhs_val, dst });
        let narrowed = self.convert_value(Value::Variable(dst), &joint_ty, &result_ty);
        self.assign_res(lvalue, narrowed.clone());

        match a.unop {
            AssignUnop::Postfix => ExpResult::PlainOperand(raw_current),
            AssignUnop::None => ExpResult::PlainOperand(narrowed),
        }
    }

    fn lower_conditional(&mut self, exp: &CExp, cond: &CExp, then_exp: &CExp, else_exp: &CExp) -> ExpResult {
        let cond_val = self.lower_rvalue(cond);
        let else_label = self.fresh_label("ternary_else");
        let end_label = self.fresh_label("ternary_end");

        if exp.ty().is_void() {
            self.emit(Instruction::JumpIfZero { cond: cond_val, target: else_label });
            let _ = self.lower_exp(then_exp);
            self.emit(Instruction::Jump(end_label));
            self.emit(Instruction::Label(else_label));
            let _ = self.lower_exp(else_exp);
            self.emit(Instruction::Label(end_label));
            return ExpResult::PlainOperand(Value::Constant(CConst::Int(0)));
        }

        let dst = self.plain_inner_value(exp);
        self.emit(Instruction::JumpIfZero { cond: cond_val, target: else_label });
        let then_val = self.lower_rvalue(then_exp);
        self.emit(Instruction::Copy { src: then_val, dst });
        self.emit(Instruction::Jump(end_label));
        self.emit(Instruction::Label(else_label));
        let else_val = self.lower_rvalue(else_exp);
        self.emit(Instruction::Copy { src: else_val, dst });
        self.emit(Instruction::Label(end_label));
        ExpResult::PlainOperand(Value::Variable(dst))
    }

    fn lower_call(&mut self, exp: &CExp, name: cc_ident::Ident, args: &[CExp]) -> ExpResult {
        let arg_vals: Vec<Value> = args.iter().map(|a| self.lower_rvalue(a)).collect();
        if exp.ty().is_void() {
            self.emit(Instruction::FunCall { name, args: arg_vals, dst: None });
            ExpResult::PlainOperand(Value::Constant(CConst::Int(0)))
        } else {
            let dst = self.plain_inner_value(exp);
            self.emit(Instruction::FunCall { name, args: arg_vals, dst: Some(dst) });
            ExpResult::PlainOperand(Value::Variable(dst))
        }
    }

    fn lower_addrof(&mut self, inner: &CExp) -> ExpResult {
        match self.lower_exp(inner) {
            ExpResult::PlainOperand(Value::Variable(var)) => {
                let dst = self.ptr_inner_value();
                self.emit(Instruction::GetAddress { src: var, dst });
                ExpResult::PlainOperand(Value::Variable(dst))
            }
            ExpResult::PlainOperand(Value::Constant(_)) => {
                unreachable!("address-of a non-lvalue constant is rejected before lowering")
            }
            ExpResult::DereferencedPointer(ptr_val) => ExpResult::PlainOperand(ptr_val),
            ExpResult::SubObject(base, offset) => {
                let base_addr = self.ptr_inner_value();
                self.emit(Instruction::GetAddress { src: base, dst: base_addr });
                let dst = self.ptr_inner_value();
                self.emit(Instruction::AddPtr {
                    scale: 1,
                    base: Value::Variable(base_addr),
                    index: Value::Constant(CConst::Long(offset)),
                    dst,
                });
                ExpResult::PlainOperand(Value::Variable(dst))
            }
        }
    }

    fn lower_subscript(&mut self, ptr: &CExp, index: &CExp) -> ExpResult {
        let (base_exp, index_exp, scale_ty) =
            if ptr.ty().is_pointer() { (ptr, index, ptr.ty()) } else { (index, ptr, index.ty()) };
        let scale = self.pointee_scale(scale_ty);
        let base = self.lower_rvalue(base_exp);
        let index_val = self.lower_rvalue(index_exp);
        let dst = self.ptr_inner_value();
        self.emit(Instruction::AddPtr { scale, base, index: index_val, dst });
        ExpResult::DereferencedPointer(Value::Variable(dst))
    }

    fn lower_sizeof(&mut self, ty: &Type) -> ExpResult {
        let size = self.type_size(ty);
        ExpResult::PlainOperand(Value::Constant(CConst::ULong(size as u64)))
    }

    fn member_offset(&self, base_ty: &Type, member: cc_ident::Ident) -> i64 {
        let tag = match base_ty.kind() {
            TypeKind::Structure { tag, .. } => *tag,
            TypeKind::Pointer(referent) => match referent.kind() {
                TypeKind::Structure { tag, .. } => *tag,
                other => panic!("member access through pointer to non-struct type {other:?}"),
            },
            other => panic!("member access on non-struct type {other:?}"),
        };
        let typedef = self.frontend.lookup_struct(tag).expect("struct type must be declared before use");
        typedef.member(member).expect("member must exist after semantic analysis").offset
    }

    fn lower_dot(&mut self, base: &CExp, member: cc_ident::Ident) -> ExpResult {
        let offset = self.member_offset(base.ty(), member);
        match self.lower_exp(base) {
            ExpResult::PlainOperand(Value::Variable(var)) => ExpResult::SubObject(var, offset),
            ExpResult::SubObject(base_var, base_offset) => ExpResult::SubObject(base_var, base_offset + offset),
            ExpResult::DereferencedPointer(ptr_val) => {
                if offset == 0 {
                    ExpResult::DereferencedPointer(ptr_val)
                } else {
                    let dst = self.ptr_inner_value();
                    self.emit(Instruction::AddPtr {
                        scale: 1,
                        base: ptr_val,
                        index: Value::Constant(CConst::Long(offset)),
                        dst,
                    });
                    ExpResult::DereferencedPointer(Value::Variable(dst))
                }
            }
            ExpResult::PlainOperand(Value::Constant(_)) => {
                unreachable!("`.` on a non-lvalue constant is rejected before lowering")
            }
        }
    }

    fn lower_arrow(&mut self, base: &CExp, member: cc_ident::Ident) -> ExpResult {
        let offset = self.member_offset(base.ty(), member);
        let ptr_val = self.lower_rvalue(base);
        if offset == 0 {
            ExpResult::DereferencedPointer(ptr_val)
        } else {
            let dst = self.ptr_inner_value();
            self.emit(Instruction::AddPtr {
                scale: 1,
                base: ptr_val,
                index: Value::Constant(CConst::Long(offset)),
                dst,
            });
            ExpResult::DereferencedPointer(Value::Variable(dst))
        }
    }
}
