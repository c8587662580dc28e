//! Expression type checking (spec §4.1 "Type checking"), interleaved with
//! the resolution pass in `stmt.rs` which rewrites `Var`/`FunctionCall`
//! names before this runs on the same node.

use crate::analyzer::Analyzer;
use crate::convert::{can_implicit_cast, pointer_joint_type, promote_char, usual_arithmetic_conversions};
use cc_ast::{BinaryOp, CExp, CExpKind, UnaryOp};
use cc_data::{CConst, Type, TypeKind};
use cc_diagnostics::ErrorCode;

impl<'a> Analyzer<'a> {
    /// Type-checks `e`, filling its `exp_type` slot, and applies array
    /// decay to the result. Assumes `Var`/`FunctionCall` names inside `e`
    /// have already been resolved by the companion resolution pass.
    pub(crate) fn check_exp(&mut self, e: &mut CExp) -> Type {
        let raw = self.check_exp_no_decay(e);
        if let TypeKind::Array { element, .. } = raw.kind() {
            let elem = element.clone();
            let ptr = Type::pointer(elem);
            let line = e.line;
            let inner = std::mem::replace(e, CExp::new(CExpKind::Constant(CConst::Int(0)), line));
            *e = CExp { kind: CExpKind::AddrOf(Box::new(inner)), exp_type: Some(ptr.clone()), line };
            ptr
        } else {
            raw
        }
    }

    /// Type-checks `e` without applying array decay — used for the
    /// operand of `sizeof` and `&`, where C never decays.
    pub(crate) fn check_exp_no_decay(&mut self, e: &mut CExp) -> Type {
        let line = e.line;
        let ty = match &mut e.kind {
            CExpKind::Constant(c) => c.ty(&self.interner),
            CExpKind::StringLiteral(s) => {
                let len = self.idents.resolve(*s).len() as i64;
                Type::array(len + 1, self.interner.char())
            }
            CExpKind::Var(name) => {
                match self.scopes.resolve_identifier(*name) {
                    Some(resolved) => *name = resolved,
                    None => self.error(ErrorCode::UndeclaredVar, line, "reference to undeclared identifier"),
                }
                match self.frontend.lookup_symbol(*name) {
                    Some(sym) => sym.ty.clone(),
                    None => self.interner.int(),
                }
            }
            CExpKind::Cast { target, exp } => {
                let from = self.check_exp(exp);
                if !target.is_void() && !can_implicit_cast(target, &from, exp.is_null_pointer_constant()) && target != &from {
                    self.error(ErrorCode::IllegalCast, line, "illegal explicit cast");
                }
                target.clone()
            }
            CExpKind::Unary { op, exp } => self.check_unary(*op, exp, line),
            CExpKind::Binary { op, lhs, rhs } => self.check_binary(op, lhs, rhs, line),
            CExpKind::Assignment(a) => self.check_assignment(a, line),
            CExpKind::Conditional { cond, then_exp, else_exp } => self.check_conditional(cond, then_exp, else_exp, line),
            CExpKind::FunctionCall { name, args } => self.check_call(name, args, line),
            CExpKind::Dereference(inner) => self.check_dereference(inner, line),
            CExpKind::AddrOf(inner) => self.check_addrof(inner),
            CExpKind::Subscript { ptr, index } => self.check_subscript(ptr, index, line),
            CExpKind::SizeOfExpr(inner) => {
                let t = self.check_exp_no_decay(inner);
                if !self.is_complete(&t) {
                    self.error(ErrorCode::IncompleteType, line, "sizeof of incomplete type");
                }
                self.interner.ulong()
            }
            CExpKind::SizeOfType(t) => {
                if !self.is_complete(t) {
                    self.error(ErrorCode::IncompleteType, line, "sizeof of incomplete type");
                }
                self.interner.ulong()
            }
            CExpKind::Dot { base, member } => self.check_dot(base, *member, line),
            CExpKind::Arrow { base, member } => self.check_arrow(base, *member, line),
        };
        e.exp_type = Some(ty.clone());
        ty
    }

    fn check_unary(&mut self, op: UnaryOp, exp: &mut CExp, line: u32) -> Type {
        let t = self.check_exp(exp);
        if !t.is_scalar() {
            self.error(ErrorCode::InvalidOperatorOperand, line, "unary operator requires a scalar operand");
        }
        match op {
            UnaryOp::Not => self.interner.int(),
            UnaryOp::Complement => {
                if matches!(t.kind(), TypeKind::Double) {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "`~` does not accept `double`");
                }
                self.promote_operand(exp);
                exp.ty().clone()
            }
            UnaryOp::Negate => {
                self.promote_operand(exp);
                exp.ty().clone()
            }
        }
    }

    fn check_binary(&mut self, op: &mut BinaryOp, lhs: &mut CExp, rhs: &mut CExp, line: u32) -> Type {
        let lt = self.check_exp(lhs);
        let rt = self.check_exp(rhs);
        match op {
            BinaryOp::Add => self.check_additive(true, lhs, &lt, rhs, &rt, line),
            BinaryOp::Subtract => self.check_additive(false, lhs, &lt, rhs, &rt, line),
            BinaryOp::Multiply | BinaryOp::Divide => {
                if !lt.is_arithmetic() || !rt.is_arithmetic() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "`*`/`/` require arithmetic operands");
                }
                let joint = usual_arithmetic_conversions(&self.interner, &lt, &rt);
                self.cast_assign(lhs, joint.clone());
                self.cast_assign(rhs, joint.clone());
                joint
            }
            BinaryOp::Remainder | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if !lt.is_arithmetic() || !rt.is_arithmetic() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "operator requires arithmetic operands");
                }
                let joint = usual_arithmetic_conversions(&self.interner, &lt, &rt);
                if matches!(joint.kind(), TypeKind::Double) {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "operator does not accept `double`");
                }
                self.cast_assign(lhs, joint.clone());
                self.cast_assign(rhs, joint.clone());
                joint
            }
            BinaryOp::BitShiftLeft | BinaryOp::BitShiftRight => {
                if !lt.is_arithmetic() || matches!(lt.kind(), TypeKind::Double) {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "shift requires an arithmetic, non-double LHS");
                }
                if !rt.is_integer() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "shift RHS must be an integer");
                }
                self.promote_operand(lhs);
                self.promote_operand(rhs);
                if *op == BinaryOp::BitShiftRight && lhs.ty().is_signed() {
                    *op = BinaryOp::BitShrArithmetic;
                }
                lhs.ty().clone()
            }
            BinaryOp::And | BinaryOp::Or => {
                if !lt.is_scalar() || !rt.is_scalar() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "`&&`/`||` require scalar operands");
                }
                self.interner.int()
            }
            op if op.is_relational() => self.check_relational(lhs, &lt, rhs, &rt, line),
            _ => unreachable!("exhaustive BinaryOp match"),
        }
    }

    fn check_additive(&mut self, is_add: bool, lhs: &mut CExp, lt: &Type, rhs: &mut CExp, rt: &Type, line: u32) -> Type {
        match (lt.is_pointer(), rt.is_pointer()) {
            (true, true) => {
                if is_add {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "pointer + pointer is not allowed");
                    lt.clone()
                } else if lt != rt {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "subtracting pointers of different types");
                    self.interner.long()
                } else {
                    if !self.is_complete(lt.pointer_referent().expect("checked is_pointer")) {
                        self.error(ErrorCode::IncompleteType, line, "pointer difference requires a complete referent");
                    }
                    self.interner.long()
                }
            }
            (true, false) => {
                if !rt.is_integer() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "pointer arithmetic requires an integer offset");
                }
                if !self.is_complete(lt.pointer_referent().expect("checked is_pointer")) {
                    self.error(ErrorCode::IncompleteType, line, "pointer arithmetic requires a complete referent");
                }
                lt.clone()
            }
            (false, true) if is_add => {
                if !lt.is_integer() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "pointer arithmetic requires an integer offset");
                }
                if !self.is_complete(rt.pointer_referent().expect("checked is_pointer")) {
                    self.error(ErrorCode::IncompleteType, line, "pointer arithmetic requires a complete referent");
                }
                rt.clone()
            }
            (false, true) => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "integer - pointer is not allowed");
                rt.clone()
            }
            (false, false) => {
                if !lt.is_arithmetic() || !rt.is_arithmetic() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "`+`/`-` require arithmetic or pointer operands");
                }
                let joint = usual_arithmetic_conversions(&self.interner, lt, rt);
                self.cast_assign(lhs, joint.clone());
                self.cast_assign(rhs, joint.clone());
                joint
            }
        }
    }

    fn check_relational(&mut self, lhs: &mut CExp, lt: &Type, rhs: &mut CExp, rt: &Type, line: u32) -> Type {
        if lt.is_pointer() || rt.is_pointer() {
            let lhs_null = lhs.is_null_pointer_constant();
            let rhs_null = rhs.is_null_pointer_constant();
            match pointer_joint_type(lt, lhs_null, rt, rhs_null) {
                Some(joint) => {
                    self.cast_assign(lhs, joint.clone());
                    self.cast_assign(rhs, joint);
                }
                None => self.error(ErrorCode::JointPtrMismatch, line, "incompatible pointer operands"),
            }
        } else {
            if !lt.is_arithmetic() || !rt.is_arithmetic() {
                self.error(ErrorCode::InvalidOperatorOperand, line, "relational operator requires arithmetic or pointer operands");
            }
            let joint = usual_arithmetic_conversions(&self.interner, lt, rt);
            self.cast_assign(lhs, joint.clone());
            self.cast_assign(rhs, joint);
        }
        self.interner.int()
    }

    fn check_assignment(&mut self, a: &mut cc_ast::Assignment, line: u32) -> Type {
        match &mut a.exp_left {
            Some(lhs) => {
                self.check_exp(lhs);
                self.check_exp(&mut a.exp_right);
                self.require_lvalue(lhs);
                if lhs.ty().is_void() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "cannot assign to `void`");
                }
                let target = lhs.ty().clone();
                self.cast_assign(&mut a.exp_right, target.clone());
                target
            }
            None => {
                self.check_exp(&mut a.exp_right);
                let target_ty = {
                    let target = match &mut a.exp_right.kind {
                        CExpKind::Binary { lhs, .. } => Self::peel_casts(lhs),
                        _ => unreachable!("compound/postfix assignment's exp_right must be Binary"),
                    };
                    self.require_lvalue(target);
                    target.ty().clone()
                };
                if target_ty.is_void() {
                    self.error(ErrorCode::InvalidOperatorOperand, line, "cannot assign to `void`");
                }
                self.cast_assign(&mut a.exp_right, target_ty.clone());
                target_ty
            }
        }
    }

    fn check_conditional(&mut self, cond: &mut CExp, then_exp: &mut CExp, else_exp: &mut CExp, line: u32) -> Type {
        let ct = self.check_exp(cond);
        if !ct.is_scalar() {
            self.error(ErrorCode::InvalidOperatorOperand, line, "conditional expression requires a scalar condition");
        }
        let tt = self.check_exp(then_exp);
        let et = self.check_exp(else_exp);
        if tt.is_void() && et.is_void() {
            return self.interner.void();
        }
        if tt.is_pointer() || et.is_pointer() {
            let then_null = then_exp.is_null_pointer_constant();
            let else_null = else_exp.is_null_pointer_constant();
            return match pointer_joint_type(&tt, then_null, &et, else_null) {
                Some(joint) => {
                    self.cast_assign(then_exp, joint.clone());
                    self.cast_assign(else_exp, joint.clone());
                    joint
                }
                None => {
                    self.error(ErrorCode::JointPtrMismatch, line, "incompatible ternary branch types");
                    tt
                }
            };
        }
        if tt.is_arithmetic() && et.is_arithmetic() {
            let joint = usual_arithmetic_conversions(&self.interner, &tt, &et);
            self.cast_assign(then_exp, joint.clone());
            self.cast_assign(else_exp, joint.clone());
            return joint;
        }
        if tt == et {
            return tt;
        }
        self.error(ErrorCode::JointPtrMismatch, line, "incompatible ternary branch types");
        tt
    }

    fn check_call(&mut self, name: &mut cc_ident::Ident, args: &mut [CExp], line: u32) -> Type {
        match self.scopes.resolve_identifier(*name) {
            Some(resolved) => *name = resolved,
            None => self.error(ErrorCode::UndeclaredFun, line, "call to undeclared function"),
        }
        let fun_ty = match self.frontend.lookup_symbol(*name) {
            Some(sym) => sym.ty.clone(),
            None => {
                return self.interner.int();
            }
        };
        let (param_types, return_type) = match fun_ty.kind() {
            TypeKind::FunType { param_types, return_type, .. } => (param_types.clone(), return_type.clone()),
            _ => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "called object is not a function");
                return self.interner.int();
            }
        };
        if param_types.len() != args.len() {
            self.error(ErrorCode::InvalidOperatorOperand, line, "argument count does not match function signature");
        }
        for (arg, param_ty) in args.iter_mut().zip(param_types.iter()) {
            self.check_exp(arg);
            self.cast_assign(arg, param_ty.clone());
        }
        for arg in args.iter_mut().skip(param_types.len()) {
            self.check_exp(arg);
        }
        return_type
    }

    fn check_dereference(&mut self, inner: &mut CExp, line: u32) -> Type {
        let t = self.check_exp(inner);
        match t.pointer_referent() {
            Some(r) => r.clone(),
            None => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "`*` requires a pointer operand");
                self.interner.int()
            }
        }
    }

    fn check_addrof(&mut self, inner: &mut CExp) -> Type {
        // `&*p` collapses in lowering, not here: semantic analysis just
        // needs the inner pointee type, not the decayed array form.
        let t = self.check_exp_no_decay(inner);
        if let Some(base) = Self::addrof_base(inner) {
            self.frontend.mark_addressed(base);
        }
        Type::pointer(t)
    }

    fn check_subscript(&mut self, ptr: &mut CExp, index: &mut CExp, line: u32) -> Type {
        let pt = self.check_exp(ptr);
        let it = self.check_exp(index);
        let (pointer_side, referent) = if pt.is_pointer() {
            (0u8, pt.pointer_referent().cloned())
        } else if it.is_pointer() {
            (1u8, it.pointer_referent().cloned())
        } else {
            self.error(ErrorCode::InvalidOperatorOperand, line, "subscript requires a pointer and an integer");
            (0u8, None)
        };
        let referent = referent.unwrap_or_else(|| self.interner.int());
        if !self.is_complete(&referent) {
            self.error(ErrorCode::IncompleteType, line, "subscript of an incomplete type");
        }
        let long = self.interner.long();
        if pointer_side == 0 {
            self.cast_assign(index, long);
        } else {
            self.cast_assign(ptr, long);
        }
        referent
    }

    fn check_dot(&mut self, base: &mut CExp, member: cc_ident::Ident, line: u32) -> Type {
        let bt = self.check_exp_no_decay(base);
        let tag = match bt.kind() {
            TypeKind::Structure { tag, .. } => *tag,
            _ => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "`.` requires a struct or union operand");
                return self.interner.int();
            }
        };
        match self.frontend.lookup_struct(tag).and_then(|td| td.member(member)) {
            Some(m) => m.ty.clone(),
            None => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "no such member");
                self.interner.int()
            }
        }
    }

    fn check_arrow(&mut self, base: &mut CExp, member: cc_ident::Ident, line: u32) -> Type {
        let bt = self.check_exp(base);
        let tag = match bt.pointer_referent().map(|r| r.kind().clone()) {
            Some(TypeKind::Structure { tag, .. }) => tag,
            _ => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "`->` requires a pointer-to-struct operand");
                return self.interner.int();
            }
        };
        match self.frontend.lookup_struct(tag).and_then(|td| td.member(member)) {
            Some(m) => m.ty.clone(),
            None => {
                self.error(ErrorCode::InvalidOperatorOperand, line, "no such member");
                self.interner.int()
            }
        }
    }
}
