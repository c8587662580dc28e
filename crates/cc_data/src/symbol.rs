//! Symbol table entries, struct typedefs, and the frontend context that
//! threads through all three compilation phases.

use crate::statics::InitialValue;
use crate::types::Type;
use cc_ident::Ident;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum IdentifierAttrs {
    FunAttr { is_defined: bool, is_global: bool },
    StaticAttr { is_global: bool, init: InitialValue },
    ConstantAttr(crate::statics::StaticInit),
    LocalAttr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub ty: Type,
    pub attrs: IdentifierAttrs,
}

impl Symbol {
    pub fn new(ty: Type, attrs: IdentifierAttrs) -> Self {
        Symbol { ty, attrs }
    }

    pub fn is_global(&self) -> bool {
        match &self.attrs {
            IdentifierAttrs::FunAttr { is_global, .. } => *is_global,
            IdentifierAttrs::StaticAttr { is_global, .. } => *is_global,
            IdentifierAttrs::ConstantAttr(_) | IdentifierAttrs::LocalAttr => false,
        }
    }

    pub fn is_static_storage(&self) -> bool {
        matches!(self.attrs, IdentifierAttrs::StaticAttr { .. } | IdentifierAttrs::ConstantAttr(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub offset: i64,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct StructTypedef {
    pub alignment: i32,
    pub size: i64,
    pub member_names: Vec<Ident>,
    pub members: FxHashMap<Ident, StructMember>,
}

impl StructTypedef {
    pub fn member(&self, name: Ident) -> Option<&StructMember> {
        self.members.get(&name)
    }
}

/// Process-scoped state threaded by reference through semantic analysis,
/// TAC lowering, and the optimizer. Outlives all three phases.
#[derive(Default)]
pub struct FrontendContext {
    pub string_const_table: FxHashMap<String, Ident>,
    pub struct_typedef_table: FxHashMap<Ident, StructTypedef>,
    pub symbol_table: FxHashMap<Ident, Symbol>,
    pub addressed_set: FxHashSet<Ident>,
    /// Ambient addition (see SPEC_FULL §3): source line lookup consumed
    /// only by `cc_diagnostics`. Populated by the driver from the lexer's
    /// line table; this crate treats it as an opaque map.
    pub linebuf_map: FxHashMap<u32, String>,
}

impl FrontendContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_struct(&self, tag: Ident) -> Option<&StructTypedef> {
        self.struct_typedef_table.get(&tag)
    }

    pub fn lookup_symbol(&self, name: Ident) -> Option<&Symbol> {
        self.symbol_table.get(&name)
    }

    pub fn mark_addressed(&mut self, name: Ident) {
        self.addressed_set.insert(name);
    }

    pub fn is_addressed(&self, name: Ident) -> bool {
        self.addressed_set.contains(&name)
    }
}
