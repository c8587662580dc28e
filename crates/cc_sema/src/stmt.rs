//! Resolution + statement/declaration checking (spec §4.1's scope stack,
//! resolution pass, declaration handling, and static initializer
//! synthesis). Interleaved with `expr.rs`'s type checking on the same
//! recursive walk.

use crate::analyzer::{Analyzer, SwitchScope};
use cc_ast::{
    CBlockItem, CExpKind, CStatement, Declaration, ForInit, FunDecl, Initializer, Program, StorageClass, StructDecl,
    UnaryOp, VarDecl,
};
use cc_data::{CConst, IdentifierAttrs, InitialValue, StaticInit, StaticInitBuilder, StructMember, StructTypedef, Symbol, Type, TypeKind};
use cc_diagnostics::{ErrorCode, Handler, SemanticError};
use cc_ident::{Ident, IdentContext};
use rustc_hash::FxHashMap;

fn round_up(value: i64, align: i64) -> i64 {
    if align <= 1 {
        value
    } else {
        (value + align - 1) / align * align
    }
}

fn negate_const(c: CConst) -> CConst {
    match c {
        CConst::Char(v) => CConst::Char(v.wrapping_neg()),
        CConst::Int(v) => CConst::Int(v.wrapping_neg()),
        CConst::Long(v) => CConst::Long(v.wrapping_neg()),
        CConst::Double(v) => CConst::Double(-v),
        CConst::UChar(v) => CConst::UChar(v.wrapping_neg()),
        CConst::UInt(v) => CConst::UInt(v.wrapping_neg()),
        CConst::ULong(v) => CConst::ULong(v.wrapping_neg()),
    }
}

/// Converts a case-label constant to the switch scrutinee's (promoted)
/// integer type, per spec §4.1's `switch` return bullet.
fn convert_case_const(c: CConst, scrutinee: &TypeKind) -> CConst {
    let v = c.as_i64();
    match scrutinee {
        TypeKind::Int => CConst::Int(v as i32),
        TypeKind::Long => CConst::Long(v),
        TypeKind::UInt => CConst::UInt(v as u32),
        TypeKind::ULong => CConst::ULong(v as u64),
        _ => c,
    }
}

impl<'a> Analyzer<'a> {
    pub fn analyze_program(&mut self, program: &mut Program) {
        for decl in program.iter_mut() {
            self.check_toplevel_declaration(decl);
        }
    }

    fn check_toplevel_declaration(&mut self, d: &mut Declaration) {
        match d {
            Declaration::Fun(fd) => self.declare_function(fd),
            Declaration::Var(vd) => self.declare_file_var(vd),
            Declaration::Struct(sd) => self.declare_struct(sd),
        }
    }

    fn check_block_declaration(&mut self, d: &mut Declaration) {
        match d {
            Declaration::Fun(fd) => {
                if fd.body.is_some() {
                    self.error(ErrorCode::InvalidOperatorOperand, fd.line, "function definition not allowed at block scope");
                }
                if matches!(fd.storage_class, Some(StorageClass::Static)) {
                    self.error(ErrorCode::StorageClassConflict, fd.line, "static function declaration not allowed at block scope");
                }
                self.declare_function(fd);
            }
            Declaration::Var(vd) => self.declare_block_var(vd),
            Declaration::Struct(sd) => self.declare_struct(sd),
        }
    }

    // ---- Functions -------------------------------------------------

    fn declare_function(&mut self, fd: &mut FunDecl) {
        let (param_types, return_type) = match fd.fun_type.kind() {
            TypeKind::FunType { param_types, return_type, .. } => (param_types.clone(), return_type.clone()),
            _ => unreachable!("FunDecl.fun_type must be FunType"),
        };
        if return_type.is_array() {
            self.error(ErrorCode::InvalidOperatorOperand, fd.line, "function may not return an array");
        }
        if fd.body.is_some() && return_type.is_aggregate() && !self.is_complete(&return_type) {
            self.error(ErrorCode::IncompleteType, fd.line, "function returns an incomplete aggregate type");
        }

        let is_global = !matches!(fd.storage_class, Some(StorageClass::Static));
        let is_defined = fd.body.is_some();
        if let Some(prior) = self.frontend.symbol_table.get(&fd.name).cloned() {
            if prior.ty != fd.fun_type {
                self.error(ErrorCode::Redeclared, fd.line, "conflicting function types");
            }
            if let IdentifierAttrs::FunAttr { is_defined: prior_defined, is_global: prior_global } = prior.attrs {
                if prior_defined && is_defined {
                    self.error(ErrorCode::Redeclared, fd.line, "function already defined");
                }
                if prior_global && matches!(fd.storage_class, Some(StorageClass::Static)) {
                    self.error(ErrorCode::StorageClassConflict, fd.line, "static declaration follows a non-static one");
                }
                let final_global = prior_global && is_global;
                let final_defined = prior_defined || is_defined;
                self.frontend.symbol_table.insert(
                    fd.name,
                    Symbol::new(fd.fun_type.clone(), IdentifierAttrs::FunAttr { is_defined: final_defined, is_global: final_global }),
                );
            }
        } else {
            self.frontend.symbol_table.insert(
                fd.name,
                Symbol::new(fd.fun_type.clone(), IdentifierAttrs::FunAttr { is_defined, is_global }),
            );
        }

        if let Some(body) = &mut fd.body {
            self.scopes.push();
            self.current_function = Some(fd.name);
            self.current_return_type = Some(return_type);
            self.func = crate::analyzer::FunctionScope::default();

            for (param_name, param_ty) in fd.params.iter_mut().zip(param_types.iter()) {
                let decayed = match param_ty.kind() {
                    TypeKind::Array { element, .. } => Type::pointer(element.clone()),
                    _ => param_ty.clone(),
                };
                if decayed.is_void() {
                    self.error(ErrorCode::InvalidOperatorOperand, fd.line, "parameter may not have type `void`");
                }
                let prefix = self.idents.resolve(*param_name).to_string();
                let resolved = self.idents.fresh_var(&prefix);
                self.scopes.declare_identifier(*param_name, resolved);
                self.frontend.symbol_table.insert(resolved, Symbol::new(decayed, IdentifierAttrs::LocalAttr));
                *param_name = resolved;
            }

            for item in body.iter_mut() {
                self.check_block_item(item);
            }

            let missing: Vec<Ident> =
                self.func.goto_map.values().filter(|r| !self.func.label_set.contains(*r)).copied().collect();
            for _ in missing {
                self.error(ErrorCode::UndefinedGotoTarget, fd.line, "goto target is never labeled");
            }

            self.current_return_type = None;
            self.current_function = None;
            self.scopes.pop();
        }
    }

    // ---- Variables ---------------------------------------------------

    fn compute_initial_value(&mut self, vd: &mut VarDecl) -> InitialValue {
        match (&vd.storage_class, &mut vd.init) {
            (_, Some(init)) => {
                self.check_initializer(init, &vd.var_type.clone());
                InitialValue::Initial(self.synthesize_static_init(&vd.var_type.clone(), init))
            }
            (Some(StorageClass::Extern), None) => InitialValue::NoInitializer,
            _ => InitialValue::Tentative,
        }
    }

    fn declare_file_var(&mut self, vd: &mut VarDecl) {
        let initial = self.compute_initial_value(vd);
        let is_global = !matches!(vd.storage_class, Some(StorageClass::Static));

        if let Some(prior) = self.frontend.symbol_table.get(&vd.name).cloned() {
            if prior.ty != vd.var_type {
                self.error(ErrorCode::Redeclared, vd.line, "conflicting variable types");
            }
            if let IdentifierAttrs::StaticAttr { is_global: prior_global, init: prior_init } = prior.attrs {
                if prior_global && matches!(vd.storage_class, Some(StorageClass::Static)) {
                    self.error(ErrorCode::StorageClassConflict, vd.line, "static declaration follows a non-static one");
                }
                let final_global = prior_global && is_global;
                let final_init = match (prior_init, initial) {
                    (InitialValue::Initial(v), InitialValue::Initial(_)) => {
                        self.error(ErrorCode::Redeclared, vd.line, "conflicting initializers");
                        InitialValue::Initial(v)
                    }
                    (InitialValue::Initial(v), _) | (_, InitialValue::Initial(v)) => InitialValue::Initial(v),
                    (InitialValue::Tentative, _) | (_, InitialValue::Tentative) => InitialValue::Tentative,
                    _ => InitialValue::NoInitializer,
                };
                self.frontend.symbol_table.insert(
                    vd.name,
                    Symbol::new(vd.var_type.clone(), IdentifierAttrs::StaticAttr { is_global: final_global, init: final_init }),
                );
            }
        } else {
            self.frontend.symbol_table.insert(
                vd.name,
                Symbol::new(vd.var_type.clone(), IdentifierAttrs::StaticAttr { is_global, init: initial }),
            );
        }
    }

    fn declare_block_var(&mut self, vd: &mut VarDecl) {
        match vd.storage_class {
            Some(StorageClass::Extern) => {
                if vd.init.is_some() {
                    self.error(ErrorCode::StorageClassConflict, vd.line, "extern block variable cannot have an initializer");
                }
                self.scopes.record_extern(vd.name);
                if let Some(existing) = self.frontend.symbol_table.get(&vd.name) {
                    if existing.ty != vd.var_type {
                        self.error(ErrorCode::Redeclared, vd.line, "conflicting types for extern declaration");
                    }
                } else {
                    self.frontend.symbol_table.insert(
                        vd.name,
                        Symbol::new(vd.var_type.clone(), IdentifierAttrs::StaticAttr { is_global: true, init: InitialValue::NoInitializer }),
                    );
                }
                self.scopes.declare_identifier(vd.name, vd.name);
            }
            Some(StorageClass::Static) => {
                let initial = self.compute_initial_value(vd);
                let prefix = self.idents.resolve(vd.name).to_string();
                let resolved = self.idents.fresh_var(&prefix);
                self.scopes.declare_identifier(vd.name, resolved);
                self.frontend.symbol_table.insert(
                    resolved,
                    Symbol::new(vd.var_type.clone(), IdentifierAttrs::StaticAttr { is_global: false, init: initial }),
                );
                vd.name = resolved;
            }
            None => {
                if self.scopes.top_scope_has(vd.name) {
                    self.error(ErrorCode::Redeclared, vd.line, "duplicate declaration in this scope");
                }
                let prefix = self.idents.resolve(vd.name).to_string();
                let resolved = self.idents.fresh_var(&prefix);
                self.scopes.declare_identifier(vd.name, resolved);
                self.frontend.symbol_table.insert(resolved, Symbol::new(vd.var_type.clone(), IdentifierAttrs::LocalAttr));
                vd.name = resolved;
                if let Some(init) = &mut vd.init {
                    let ty = vd.var_type.clone();
                    self.check_initializer(init, &ty);
                }
            }
        }
    }

    // ---- Struct/union declarations -------------------------------------

    fn type_align_and_size(&self, t: &Type) -> (i32, i64) {
        match t.kind() {
            TypeKind::Structure { tag, .. } => self.frontend.lookup_struct(*tag).map(|td| (td.alignment, td.size)).unwrap_or((1, 0)),
            TypeKind::Array { size, element } => {
                let (align, esize) = self.type_align_and_size(element);
                (align, size * esize)
            }
            _ => (t.scalar_size() as i32, t.scalar_size()),
        }
    }

    fn declare_struct(&mut self, sd: &mut StructDecl) {
        let resolved_tag = if let Some((existing_tag, existing_is_union)) = self.scopes.top_struct_tag(sd.tag) {
            if existing_is_union != sd.is_union {
                self.error(ErrorCode::Redeclared, sd.line, "tag previously declared as the other of struct/union");
            }
            existing_tag
        } else {
            let fresh = self.idents.fresh_struct_tag();
            self.scopes.declare_struct_tag(sd.tag, fresh, sd.is_union);
            fresh
        };
        sd.tag = resolved_tag;

        let Some(members) = &sd.members else { return };
        let mut seen = rustc_hash::FxHashSet::default();
        let mut member_names = Vec::new();
        let mut member_map = FxHashMap::default();
        let mut max_align = 1i32;
        let mut offset = 0i64;
        for m in members {
            if !seen.insert(m.name) {
                self.error(ErrorCode::Redeclared, sd.line, "duplicate member name");
                continue;
            }
            if !self.is_complete(&m.member_type) {
                self.error(ErrorCode::IncompleteType, sd.line, "struct member must have a complete type");
            }
            let (align, size) = self.type_align_and_size(&m.member_type);
            max_align = max_align.max(align);
            let member_offset = if sd.is_union { 0 } else { round_up(offset, align as i64) };
            offset = if sd.is_union { offset.max(size) } else { member_offset + size };
            member_names.push(m.name);
            member_map.insert(m.name, StructMember { offset: member_offset, ty: m.member_type.clone() });
        }
        let size = round_up(offset, max_align as i64);
        self.frontend.struct_typedef_table.insert(
            resolved_tag,
            StructTypedef { alignment: max_align, size, member_names, members: member_map },
        );
        if sd.is_union {
            self.union_def_set.insert(resolved_tag);
        } else {
            self.struct_def_set.insert(resolved_tag);
        }
    }

    // ---- Initializers ---------------------------------------------------

    fn check_initializer(&mut self, init: &mut Initializer, ty: &Type) {
        if let Initializer::Single(e) = init {
            if let CExpKind::StringLiteral(s) = &e.kind {
                if let TypeKind::Array { size, element } = ty.kind() {
                    if element.is_char_kind() {
                        let len = self.idents.resolve(*s).len() as i64;
                        if len + 1 > *size {
                            self.error(ErrorCode::StringInitOverflow, e.line, "string literal too long for array");
                        }
                        e.exp_type = Some(ty.clone());
                        return;
                    }
                }
            }
        }
        match (init, ty.kind()) {
            (Initializer::Single(e), _) if ty.is_aggregate() => {
                self.error(ErrorCode::InitializerMismatch, e.line, "scalar initializer for an aggregate type");
            }
            (Initializer::Single(e), _) => {
                self.check_exp(e);
                self.cast_assign(e, ty.clone());
            }
            (Initializer::Compound(elems), TypeKind::Array { size, element }) => {
                if elems.len() as i64 > *size {
                    self.error(ErrorCode::ArrayBoundOverflow, 0, "too many initializers for array");
                }
                let element = element.clone();
                for elem in elems.iter_mut() {
                    self.check_initializer(elem, &element);
                }
            }
            (Initializer::Compound(elems), TypeKind::Structure { tag, is_union }) => {
                let tag = *tag;
                let is_union = *is_union;
                let bound = if is_union { 1 } else { self.frontend.lookup_struct(tag).map(|td| td.member_names.len()).unwrap_or(0) };
                if elems.len() > bound {
                    self.error(ErrorCode::InitializerMismatch, 0, "too many initializers for struct/union");
                }
                let member_types: Vec<Type> = self
                    .frontend
                    .lookup_struct(tag)
                    .map(|td| td.member_names.iter().map(|m| td.members[m].ty.clone()).collect())
                    .unwrap_or_default();
                for (elem, mty) in elems.iter_mut().zip(member_types.iter()) {
                    self.check_initializer(elem, mty);
                }
            }
            (Initializer::Compound(_), _) => {
                self.error(ErrorCode::InitializerMismatch, 0, "compound initializer for a scalar type");
            }
        }
    }

    fn type_size(&self, t: &Type) -> i64 {
        self.type_align_and_size(t).1
    }

    /// Mints (or reuses) the named static-constant symbol for a string
    /// literal's backing array, registering a matching `ConstantAttr` entry
    /// so static emission later turns it into an actual `TacStaticConstant`
    /// (spec §4.2's "Static emission" walks the symbol table for these).
    fn intern_string_const(&mut self, literal: Ident) -> Ident {
        let text = self.idents.resolve(literal).to_string();
        if let Some(existing) = self.frontend.string_const_table.get(&text) {
            return *existing;
        }
        let n = self.frontend.string_const_table.len();
        let label = self.idents.intern(&format!("str.{n}"));
        self.frontend.string_const_table.insert(text.clone(), label);
        let char_ty = self.interner.char();
        let array_ty = Type::array(text.len() as i64 + 1, char_ty);
        let bytes = text.into_bytes();
        let init = StaticInit::StringInit { const_name: label, null_terminated: true, bytes };
        self.frontend.symbol_table.insert(label, Symbol::new(array_ty, IdentifierAttrs::ConstantAttr(init)));
        label
    }

    fn fold_constant_cast_chain(e: &cc_ast::CExp) -> Option<CConst> {
        match &e.kind {
            CExpKind::Constant(c) => Some(*c),
            CExpKind::Cast { exp, .. } => Self::fold_constant_cast_chain(exp),
            CExpKind::Unary { op: UnaryOp::Negate, exp } => Self::fold_constant_cast_chain(exp).map(negate_const),
            _ => None,
        }
    }

    fn push_scalar_const(&mut self, ty: &Type, c: CConst, builder: &mut StaticInitBuilder) {
        if ty.is_pointer() {
            if c.is_const_null_ptr() {
                builder.push(StaticInit::ULongInit(0));
            } else {
                self.error(ErrorCode::InitializerMismatch, 0, "pointer initializer must be a null constant");
            }
            return;
        }
        match ty.kind() {
            TypeKind::Char | TypeKind::SChar => {
                builder.push(if c.is_zero() { StaticInit::ZeroInit(1) } else { StaticInit::CharInit(c.as_i64() as i8) })
            }
            TypeKind::UChar => {
                builder.push(if c.is_zero() { StaticInit::ZeroInit(1) } else { StaticInit::UCharInit(c.as_i64() as u8) })
            }
            TypeKind::Int => builder.push(if c.is_zero() { StaticInit::ZeroInit(4) } else { StaticInit::IntInit(c.as_i64() as i32) }),
            TypeKind::UInt => {
                builder.push(if c.is_zero() { StaticInit::ZeroInit(4) } else { StaticInit::UIntInit(c.as_i64() as u32) })
            }
            TypeKind::Long => builder.push(if c.is_zero() { StaticInit::ZeroInit(8) } else { StaticInit::LongInit(c.as_i64()) }),
            TypeKind::ULong => {
                builder.push(if c.is_zero() { StaticInit::ZeroInit(8) } else { StaticInit::ULongInit(c.as_i64() as u64) })
            }
            TypeKind::Double => {
                let bits_name = self.idents.intern(&format!("{:016x}", c.as_f64().to_bits()));
                builder.push(StaticInit::DoubleInit(bits_name));
            }
            _ => self.error(ErrorCode::InitializerMismatch, 0, "unsupported static initializer type"),
        }
    }

    fn synthesize_into(&mut self, ty: &Type, init: &Initializer, builder: &mut StaticInitBuilder) {
        match init {
            Initializer::Single(e) => match &e.kind {
                CExpKind::StringLiteral(s) if ty.is_array() => {
                    let bytes = self.idents.resolve(*s).as_bytes().to_vec();
                    if let TypeKind::Array { size, element } = ty.kind() {
                        if element.is_char_kind() {
                            let label = self.intern_string_const(*s);
                            let cap = *size;
                            let null_terminated = (bytes.len() as i64) < cap;
                            let written = bytes.len() as i64 + i64::from(null_terminated);
                            builder.push(StaticInit::StringInit { const_name: label, null_terminated, bytes });
                            if cap > written {
                                builder.push_zero(cap - written);
                            }
                        }
                    }
                }
                CExpKind::StringLiteral(s) => {
                    let label = self.intern_string_const(*s);
                    builder.push(StaticInit::PointerInit(label));
                }
                CExpKind::Constant(c) => self.push_scalar_const(ty, *c, builder),
                _ => match Self::fold_constant_cast_chain(e) {
                    Some(c) => self.push_scalar_const(ty, c, builder),
                    None => self.error(ErrorCode::InitializerMismatch, e.line, "static initializer must be a constant expression"),
                },
            },
            Initializer::Compound(elems) => match ty.kind() {
                TypeKind::Array { size, element } => {
                    for elem in elems {
                        self.synthesize_into(element, elem, builder);
                    }
                    let remaining = *size - elems.len() as i64;
                    if remaining > 0 {
                        builder.push_zero(remaining * self.type_size(element));
                    }
                }
                TypeKind::Structure { tag, is_union } => {
                    if let Some(td) = self.frontend.lookup_struct(*tag).cloned() {
                        let mut cursor = 0i64;
                        for (elem, member_name) in elems.iter().zip(td.member_names.iter()) {
                            let m = &td.members[member_name];
                            if m.offset > cursor {
                                builder.push_zero(m.offset - cursor);
                            }
                            self.synthesize_into(&m.ty, elem, builder);
                            cursor = m.offset + self.type_size(&m.ty);
                        }
                        if !*is_union && td.size > cursor {
                            builder.push_zero(td.size - cursor);
                        } else if *is_union && td.size > cursor {
                            builder.push_zero(td.size - cursor);
                        }
                    }
                }
                _ => {}
            },
        }
    }

    fn synthesize_static_init(&mut self, ty: &Type, init: &Initializer) -> Vec<StaticInit> {
        let mut builder = StaticInitBuilder::new();
        self.synthesize_into(ty, init, &mut builder);
        builder.finish()
    }

    // ---- Statements ------------------------------------------------------

    fn resolve_label(&mut self, source: Ident) -> Ident {
        if let Some(r) = self.func.goto_map.get(&source) {
            return *r;
        }
        let fname = self.idents.resolve(self.current_function.expect("goto/label outside a function")).to_string();
        let sname = self.idents.resolve(source).to_string();
        let resolved = self.idents.intern(&format!("{fname}.{sname}"));
        self.func.goto_map.insert(source, resolved);
        resolved
    }

    pub(crate) fn check_block_item(&mut self, item: &mut CBlockItem) {
        match item {
            CBlockItem::Statement(s) => self.check_statement(s),
            CBlockItem::Declaration(d) => self.check_block_declaration(d),
        }
    }

    fn check_statement(&mut self, s: &mut CStatement) {
        match s {
            CStatement::Return(exp_opt) => {
                let ret_ty = self.current_return_type.clone().expect("return outside a function");
                match exp_opt {
                    Some(e) => {
                        if ret_ty.is_void() {
                            self.error(ErrorCode::InvalidOperatorOperand, e.line, "`void` function must not return a value");
                        }
                        self.check_exp(e);
                        self.cast_assign(e, ret_ty);
                    }
                    None if !ret_ty.is_void() => {
                        self.error(ErrorCode::InvalidOperatorOperand, 0, "non-`void` function must return a value");
                    }
                    None => {}
                }
            }
            CStatement::Expression(e) => {
                self.check_exp(e);
            }
            CStatement::If { cond, then_branch, else_branch } => {
                let ct = self.check_exp(cond);
                if !ct.is_scalar() {
                    self.error(ErrorCode::InvalidOperatorOperand, cond.line, "`if` condition must be scalar");
                }
                self.check_statement(then_branch);
                if let Some(eb) = else_branch {
                    self.check_statement(eb);
                }
            }
            CStatement::Compound(items) => {
                self.scopes.push();
                for item in items {
                    self.check_block_item(item);
                }
                self.scopes.pop();
            }
            CStatement::While { cond, body, target } => {
                let ct = self.check_exp(cond);
                if !ct.is_scalar() {
                    self.error(ErrorCode::InvalidOperatorOperand, cond.line, "`while` condition must be scalar");
                }
                let id = self.idents.fresh_label("while");
                *target = Some(id);
                self.func.break_labels.push(id);
                self.func.continue_labels.push(id);
                self.check_statement(body);
                self.func.continue_labels.pop();
                self.func.break_labels.pop();
            }
            CStatement::DoWhile { body, cond, target } => {
                let id = self.idents.fresh_label("do_while");
                *target = Some(id);
                self.func.break_labels.push(id);
                self.func.continue_labels.push(id);
                self.check_statement(body);
                self.func.continue_labels.pop();
                self.func.break_labels.pop();
                let ct = self.check_exp(cond);
                if !ct.is_scalar() {
                    self.error(ErrorCode::InvalidOperatorOperand, cond.line, "`do`/`while` condition must be scalar");
                }
            }
            CStatement::For { init, cond, post, body, target } => {
                self.scopes.push();
                match init {
                    ForInit::Decl(vd) => self.declare_block_var(vd),
                    ForInit::Exp(Some(e)) => {
                        self.check_exp(e);
                    }
                    ForInit::Exp(None) => {}
                }
                if let Some(c) = cond {
                    let ct = self.check_exp(c);
                    if !ct.is_scalar() {
                        self.error(ErrorCode::InvalidOperatorOperand, c.line, "`for` condition must be scalar");
                    }
                }
                if let Some(p) = post {
                    self.check_exp(p);
                }
                let id = self.idents.fresh_label("for");
                *target = Some(id);
                self.func.break_labels.push(id);
                self.func.continue_labels.push(id);
                self.check_statement(body);
                self.func.continue_labels.pop();
                self.func.break_labels.pop();
                self.scopes.pop();
            }
            CStatement::Switch { scrutinee, body, target, is_default, cases } => {
                let mut st = self.check_exp(scrutinee);
                if st.is_char_kind() {
                    let int = self.interner.int();
                    Self::wrap_cast(scrutinee, int);
                    st = scrutinee.ty().clone();
                }
                if !st.is_integer() {
                    self.error(ErrorCode::InvalidOperatorOperand, scrutinee.line, "`switch` scrutinee must be an integer");
                }
                let id = self.idents.fresh_label("switch");
                *target = Some(id);
                self.func.break_labels.push(id);
                self.func.switch_stack.push(SwitchScope { label: id, is_default: false, case_values: Vec::new(), scrutinee_type: st });
                self.check_statement(body);
                let sw = self.func.switch_stack.pop().expect("pushed above");
                self.func.break_labels.pop();
                *is_default = sw.is_default;
                *cases = sw.case_values;
            }
            CStatement::Case { value, body, target } => {
                if self.func.switch_stack.is_empty() {
                    self.error(ErrorCode::CaseOutOfContext, value.line, "`case` outside a `switch`");
                    self.check_statement(body);
                    return;
                }
                self.check_exp(value);
                let c = match &value.kind {
                    CExpKind::Constant(c) => *c,
                    _ => Self::fold_constant_cast_chain(value).unwrap_or_else(|| {
                        self.error(ErrorCode::NumericParseFailure, value.line, "`case` label must be a constant expression");
                        CConst::Int(0)
                    }),
                };
                let sw = self.func.switch_stack.last_mut().expect("checked non-empty above");
                let converted = convert_case_const(c, sw.scrutinee_type.kind());
                let switch_label = sw.label;
                if sw.case_values.contains(&converted) {
                    self.error(ErrorCode::DuplicateCase, value.line, "duplicate `case` value");
                } else {
                    sw.case_values.push(converted);
                }
                let idx = sw.case_values.len().saturating_sub(1);
                let switch_text = self.idents.resolve(switch_label).to_string();
                let label = self.idents.intern(&format!("{switch_text}.case.{idx}"));
                *target = Some(label);
                self.check_statement(body);
            }
            CStatement::Default { body, target } => {
                match self.func.switch_stack.last_mut() {
                    Some(sw) => {
                        if sw.is_default {
                            self.error(ErrorCode::DuplicateDefault, 0, "duplicate `default`");
                        }
                        sw.is_default = true;
                        let switch_text = self.idents.resolve(sw.label).to_string();
                        let label = self.idents.intern(&format!("{switch_text}.default"));
                        *target = Some(label);
                    }
                    None => self.error(ErrorCode::DefaultOutOfContext, 0, "`default` outside a `switch`"),
                }
                self.check_statement(body);
            }
            CStatement::Labeled { label, body } => {
                let resolved = self.resolve_label(*label);
                if !self.func.label_set.insert(resolved) {
                    self.error(ErrorCode::DuplicateLabel, 0, "duplicate label");
                }
                *label = resolved;
                self.check_statement(body);
            }
            CStatement::Goto(label) => {
                *label = self.resolve_label(*label);
            }
            CStatement::Break(target) => match self.func.break_labels.last() {
                Some(l) => *target = Some(*l),
                None => self.error(ErrorCode::BreakOutOfContext, 0, "`break` outside a loop or `switch`"),
            },
            CStatement::Continue(target) => match self.func.continue_labels.last() {
                Some(l) => *target = Some(*l),
                None => self.error(ErrorCode::ContinueOutOfContext, 0, "`continue` outside a loop"),
            },
            CStatement::Null => {}
        }
    }
}

/// The spec's §6 first entry point: decorates `program` in place, records
/// recoverable errors into `errors`, and returns `Err` if any were found
/// (the pipeline-level gate described in spec §7 — see DESIGN.md).
pub fn analyze_semantic(
    program: &mut Program,
    errors: &mut Vec<SemanticError>,
    frontend: &mut cc_data::FrontendContext,
    identifiers: &mut IdentContext,
) -> Result<(), ()> {
    let _span = tracing::info_span!("analyze_semantic").entered();
    let mut handler = Handler::new();
    {
        let mut analyzer = Analyzer::new(identifiers, frontend, &mut handler);
        analyzer.analyze_program(program);
    }
    let had_errors = handler.has_errors();
    errors.extend(handler.into_errors());
    if had_errors {
        tracing::debug!(count = errors.len(), "semantic analysis produced errors");
        Err(())
    } else {
        Ok(())
    }
}
