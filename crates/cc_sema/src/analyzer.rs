//! The `Analyzer`: owns everything the resolution and type-checking passes
//! thread through a translation unit, plus the small expression-tree
//! helpers (cast wrapping, lvalue peeling) shared by `expr.rs` and
//! `stmt.rs`.

use crate::scope::ScopeStack;
use cc_ast::{CExp, CExpKind};
use cc_data::{FrontendContext, Type, TypeInterner};
use cc_diagnostics::{ErrorCode, Handler, SemanticError};
use cc_ident::{Ident, IdentContext};
use rustc_hash::FxHashSet;

/// Per-function bookkeeping, reset at the start of every function body.
#[derive(Default)]
pub(crate) struct FunctionScope {
    pub goto_map: rustc_hash::FxHashMap<Ident, Ident>,
    pub label_set: FxHashSet<Ident>,
    pub break_labels: Vec<Ident>,
    pub continue_labels: Vec<Ident>,
    /// One entry per enclosing `switch`, accumulating the case constants
    /// and default-seen flag; written back into the `CStatement::Switch`
    /// node once its body finishes traversal.
    pub switch_stack: Vec<SwitchScope>,
}

pub(crate) struct SwitchScope {
    pub label: Ident,
    pub is_default: bool,
    pub case_values: Vec<cc_data::CConst>,
    pub scrutinee_type: Type,
}

pub struct Analyzer<'a> {
    pub idents: &'a mut IdentContext,
    pub frontend: &'a mut FrontendContext,
    pub handler: &'a mut Handler,
    pub interner: TypeInterner,
    pub(crate) scopes: ScopeStack,
    pub(crate) struct_def_set: FxHashSet<Ident>,
    pub(crate) union_def_set: FxHashSet<Ident>,
    pub(crate) func: FunctionScope,
    pub(crate) current_function: Option<Ident>,
    pub(crate) current_return_type: Option<Type>,
}

impl<'a> Analyzer<'a> {
    pub fn new(idents: &'a mut IdentContext, frontend: &'a mut FrontendContext, handler: &'a mut Handler) -> Self {
        Analyzer {
            idents,
            frontend,
            handler,
            interner: TypeInterner::new(),
            scopes: ScopeStack::new(),
            struct_def_set: FxHashSet::default(),
            union_def_set: FxHashSet::default(),
            func: FunctionScope::default(),
            current_function: None,
            current_return_type: None,
        }
    }

    pub(crate) fn error(&mut self, code: ErrorCode, line: u32, message: impl Into<String>) {
        self.handler.emit(SemanticError::new(code, line, message));
    }

    /// Whether `t` denotes a complete type: `Void` and incomplete struct
    /// tags are not; everything else (scalars, pointers, complete
    /// structs/arrays) is.
    pub(crate) fn is_complete(&self, t: &Type) -> bool {
        match t.kind() {
            cc_data::TypeKind::Void => false,
            cc_data::TypeKind::Structure { tag, .. } => self.frontend.struct_typedef_table.contains_key(tag),
            cc_data::TypeKind::Array { element, .. } => self.is_complete(element),
            _ => true,
        }
    }

    /// Replaces `e` in place with `Cast{target, exp: <old e>}`, mirroring
    /// the analyzer's implicit-cast insertion (spec §4.1).
    pub(crate) fn wrap_cast(e: &mut CExp, target: Type) {
        let line = e.line;
        // The zero constant is a throwaway placeholder for the `mem::replace`
        // slot; it is immediately overwritten below and never observed.
        let placeholder = CExp::new(CExpKind::Constant(cc_data::CConst::Int(0)), line);
        let inner = std::mem::replace(e, placeholder);
        *e = CExp { kind: CExpKind::Cast { target: target.clone(), exp: Box::new(inner) }, exp_type: Some(target), line };
    }

    /// Coerces `rhs` to `target`, inserting an implicit cast if needed and
    /// legal, else recording `illegal_cast`.
    pub(crate) fn cast_assign(&mut self, rhs: &mut CExp, target: Type) {
        if rhs.ty() == &target {
            return;
        }
        if crate::convert::can_implicit_cast(&target, rhs.ty(), rhs.is_null_pointer_constant()) {
            Self::wrap_cast(rhs, target);
        } else {
            self.error(ErrorCode::IllegalCast, rhs.line, format!("cannot implicitly convert to {target:?}"));
        }
    }

    /// Peels any `Cast` wrappers to find the underlying lvalue node, used
    /// by compound-assignment lvalue checking (spec §4.1).
    pub(crate) fn peel_casts(e: &mut CExp) -> &mut CExp {
        match &mut e.kind {
            CExpKind::Cast { exp, .. } => Self::peel_casts(exp),
            _ => e,
        }
    }

    pub(crate) fn is_lvalue(e: &CExp) -> bool {
        matches!(
            e.kind,
            CExpKind::Var(_) | CExpKind::Dereference(_) | CExpKind::Dot { .. } | CExpKind::Arrow { .. } | CExpKind::Subscript { .. }
        )
    }

    pub(crate) fn require_lvalue(&mut self, e: &CExp) {
        if !Self::is_lvalue(e) {
            self.error(ErrorCode::InvalidOperatorOperand, e.line, "expression is not assignable");
        }
    }

    /// If `e`'s type is char-kind, wraps it in an implicit promotion to
    /// `Int` (spec's "char operands get promoted to Int first").
    pub(crate) fn promote_operand(&mut self, e: &mut CExp) {
        if e.ty().is_char_kind() {
            let int = self.interner.int();
            Self::wrap_cast(e, int);
        }
    }

    /// Walks a member-access/subscript chain down to its root `Var`, the
    /// name that must be recorded in `addressed_set` when the whole chain
    /// is the operand of `&`.
    pub(crate) fn addrof_base(e: &CExp) -> Option<Ident> {
        match &e.kind {
            CExpKind::Var(name) => Some(*name),
            CExpKind::Dot { base, .. } => Self::addrof_base(base),
            CExpKind::Subscript { ptr, .. } => Self::addrof_base(ptr),
            _ => None,
        }
    }
}
