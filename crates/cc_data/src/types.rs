//! The `Type` sum type and its hash-consing/sharing discipline.
//!
//! Scalars and `Void` are hash-consed through [`TypeInterner`]: two
//! requests for `Int` return the same `Rc` allocation. Composite types
//! (`Pointer`, `Array`, `Structure`, `FunType`) are owned by whichever
//! declaration first builds them and shared by reference count from then
//! on — cloning a `Type` is always an `Rc` bump, never a deep copy.

use cc_ident::Ident;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Char,
    SChar,
    UChar,
    Int,
    Long,
    UInt,
    ULong,
    Double,
    Void,
    Pointer(Type),
    Array { size: i64, element: Type },
    Structure { tag: Ident, is_union: bool },
    FunType { param_types: Vec<Type>, return_type: Type, param_reg_mask: u64, ret_reg_mask: u64 },
}

#[derive(Debug, Clone, Eq)]
pub struct Type(pub(crate) Rc<TypeKind>);

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl std::hash::Hash for Type {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Type {
    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    pub fn new_uninterned(kind: TypeKind) -> Type {
        Type(Rc::new(kind))
    }

    pub fn pointer(referent: Type) -> Type {
        Type::new_uninterned(TypeKind::Pointer(referent))
    }

    pub fn array(size: i64, element: Type) -> Type {
        Type::new_uninterned(TypeKind::Array { size, element })
    }

    pub fn structure(tag: Ident, is_union: bool) -> Type {
        Type::new_uninterned(TypeKind::Structure { tag, is_union })
    }

    pub fn fun_type(
        param_types: Vec<Type>,
        return_type: Type,
        param_reg_mask: u64,
        ret_reg_mask: u64,
    ) -> Type {
        Type::new_uninterned(TypeKind::FunType { param_types, return_type, param_reg_mask, ret_reg_mask })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Char
                | TypeKind::SChar
                | TypeKind::UChar
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::UInt
                | TypeKind::ULong
                | TypeKind::Double
                | TypeKind::Pointer(_)
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Char
                | TypeKind::SChar
                | TypeKind::UChar
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::UInt
                | TypeKind::ULong
                | TypeKind::Double
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_arithmetic() && !matches!(self.kind(), TypeKind::Double)
    }

    pub fn is_char_kind(&self) -> bool {
        matches!(self.kind(), TypeKind::Char | TypeKind::SChar | TypeKind::UChar)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.kind(), TypeKind::Char | TypeKind::SChar | TypeKind::Int | TypeKind::Long)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind(), TypeKind::Pointer(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind(), TypeKind::Void)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind(), TypeKind::Array { .. })
    }

    pub fn is_struct_or_union(&self) -> bool {
        matches!(self.kind(), TypeKind::Structure { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind(), TypeKind::FunType { .. })
    }

    pub fn is_aggregate(&self) -> bool {
        self.is_array() || self.is_struct_or_union()
    }

    /// Size in bytes for scalar and pointer types. Panics for aggregate
    /// types whose size must be looked up via the struct-typedef table, and
    /// for `Void`/`FunType`.
    pub fn scalar_size(&self) -> i64 {
        match self.kind() {
            TypeKind::Char | TypeKind::SChar | TypeKind::UChar => 1,
            TypeKind::Int | TypeKind::UInt => 4,
            TypeKind::Long | TypeKind::ULong | TypeKind::Double | TypeKind::Pointer(_) => 8,
            other => panic!("scalar_size called on non-scalar type {other:?}"),
        }
    }

    pub fn pointer_referent(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Pointer(t) => Some(t),
            _ => None,
        }
    }
}

/// Hash-conses scalar and `Void` types so repeated requests share storage.
#[derive(Default)]
pub struct TypeInterner {
    cache: std::cell::RefCell<rustc_hash::FxHashMap<TypeKind, Type>>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, kind: TypeKind) -> Type {
        if let Some(t) = self.cache.borrow().get(&kind) {
            return t.clone();
        }
        let t = Type::new_uninterned(kind.clone());
        self.cache.borrow_mut().insert(kind, t.clone());
        t
    }

    pub fn char(&self) -> Type {
        self.get(TypeKind::Char)
    }
    pub fn schar(&self) -> Type {
        self.get(TypeKind::SChar)
    }
    pub fn uchar(&self) -> Type {
        self.get(TypeKind::UChar)
    }
    pub fn int(&self) -> Type {
        self.get(TypeKind::Int)
    }
    pub fn long(&self) -> Type {
        self.get(TypeKind::Long)
    }
    pub fn uint(&self) -> Type {
        self.get(TypeKind::UInt)
    }
    pub fn ulong(&self) -> Type {
        self.get(TypeKind::ULong)
    }
    pub fn double(&self) -> Type {
        self.get(TypeKind::Double)
    }
    pub fn void(&self) -> Type {
        self.get(TypeKind::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_hash_consed() {
        let interner = TypeInterner::new();
        let a = interner.int();
        let b = interner.int();
        assert!(Rc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn composite_types_are_shared_by_rc_not_consed() {
        let interner = TypeInterner::new();
        let ptr_to_int = Type::pointer(interner.int());
        let cloned = ptr_to_int.clone();
        assert!(Rc::ptr_eq(&ptr_to_int.0, &cloned.0));
        assert_eq!(ptr_to_int, cloned);
    }
}
