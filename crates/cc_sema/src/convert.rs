//! Usual arithmetic conversions, pointer joint types, and the implicit-cast
//! legality check that backs `cast_assign`.

use cc_data::{Type, TypeInterner};

/// Char-kinds promote to `Int` before any other conversion rule applies.
pub fn promote_char(interner: &TypeInterner, t: &Type) -> Type {
    if t.is_char_kind() {
        interner.int()
    } else {
        t.clone()
    }
}

/// The joint type of two scalar operands under the usual arithmetic
/// conversions (spec §4.1).
pub fn usual_arithmetic_conversions(interner: &TypeInterner, a: &Type, b: &Type) -> Type {
    let a = promote_char(interner, a);
    let b = promote_char(interner, b);
    if matches!(a.kind(), cc_data::TypeKind::Double) || matches!(b.kind(), cc_data::TypeKind::Double) {
        return interner.double();
    }
    if a == b {
        return a;
    }
    let size_a = a.scalar_size();
    let size_b = b.scalar_size();
    if size_a == size_b {
        if a.is_signed() {
            a
        } else if b.is_signed() {
            b
        } else {
            a
        }
    } else if size_a > size_b {
        a
    } else {
        b
    }
}

/// The joint type for `== != ?:` between two pointer-ish operands, or
/// `None` if the pair is incompatible (`joint_ptr_mismatch`).
pub fn pointer_joint_type(lt: &Type, lhs_is_null_const: bool, rt: &Type, rhs_is_null_const: bool) -> Option<Type> {
    if lt == rt {
        return Some(lt.clone());
    }
    if lhs_is_null_const {
        return Some(rt.clone());
    }
    if rhs_is_null_const {
        return Some(lt.clone());
    }
    let is_void_ptr = |t: &Type| matches!(t.pointer_referent(), Some(r) if r.is_void());
    if is_void_ptr(lt) && rt.is_pointer() {
        return Some(rt.clone());
    }
    if is_void_ptr(rt) && lt.is_pointer() {
        return Some(lt.clone());
    }
    None
}

/// Whether an implicit conversion from `from` to `to` is legal: identity,
/// arithmetic-to-arithmetic, null-pointer-constant-to-pointer, or
/// void-pointer compatibility.
pub fn can_implicit_cast(to: &Type, from: &Type, from_is_null_ptr_const: bool) -> bool {
    if to == from {
        return true;
    }
    if to.is_arithmetic() && from.is_arithmetic() {
        return true;
    }
    if to.is_pointer() && from_is_null_ptr_const {
        return true;
    }
    if to.is_pointer() && from.is_pointer() {
        let to_void = matches!(to.pointer_referent(), Some(r) if r.is_void());
        let from_void = matches!(from.pointer_referent(), Some(r) if r.is_void());
        return to_void || from_void;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_size_conversion_prefers_the_signed_operand() {
        let interner = TypeInterner::new();
        let joint = usual_arithmetic_conversions(&interner, &interner.uint(), &interner.int());
        assert_eq!(joint, interner.int());
    }

    #[test]
    fn double_dominates_any_arithmetic_partner() {
        let interner = TypeInterner::new();
        let joint = usual_arithmetic_conversions(&interner, &interner.long(), &interner.double());
        assert_eq!(joint, interner.double());
    }

    #[test]
    fn null_pointer_constant_adopts_the_other_sides_pointer_type() {
        let interner = TypeInterner::new();
        let int_ptr = Type::pointer(interner.int());
        let joint = pointer_joint_type(&int_ptr, false, &interner.int(), true);
        assert_eq!(joint, Some(int_ptr));
    }

    #[test]
    fn mismatched_pointer_types_without_void_have_no_joint_type() {
        let interner = TypeInterner::new();
        let int_ptr = Type::pointer(interner.int());
        let double_ptr = Type::pointer(interner.double());
        assert_eq!(pointer_joint_type(&int_ptr, false, &double_ptr, false), None);
    }
}
