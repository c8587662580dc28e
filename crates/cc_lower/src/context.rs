//! The per-function lowering state: the instruction sink, fresh-temporary
//! minting, and the read/write collapse for `ExpResult` (spec §4.2).

use cc_ast::CExp;
use cc_data::{FrontendContext, Type, TypeInterner, TypeKind};
use cc_ident::{Ident, IdentContext};
use cc_tac_ir::{ExpResult, Instruction, Value};

pub struct Lowering<'a> {
    pub idents: &'a mut IdentContext,
    pub frontend: &'a mut FrontendContext,
    pub interner: TypeInterner,
    instrs: Vec<Instruction>,
}

impl<'a> Lowering<'a> {
    pub fn new(idents: &'a mut IdentContext, frontend: &'a mut FrontendContext) -> Self {
        Lowering { idents, frontend, interner: TypeInterner::new(), instrs: Vec::new() }
    }

    /// The named static-constant symbol for a string literal's backing
    /// array, minting one (and a matching `ConstantAttr` symbol-table entry)
    /// on first use — whether the literal first appears in an initializer
    /// or as a bare expression (spec §6 "string values ... interned").
    pub fn intern_string_constant(&mut self, literal: Ident) -> Ident {
        let text = self.idents.resolve(literal).to_string();
        if let Some(existing) = self.frontend.string_const_table.get(&text) {
            return *existing;
        }
        let n = self.frontend.string_const_table.len();
        let label = self.idents.intern(&format!("str.{n}"));
        self.frontend.string_const_table.insert(text.clone(), label);
        let array_ty = Type::array(text.len() as i64 + 1, self.interner.char());
        let bytes = text.into_bytes();
        let init = cc_data::StaticInit::StringInit { const_name: label, null_terminated: true, bytes };
        self.frontend
            .symbol_table
            .insert(label, cc_data::Symbol::new(array_ty, cc_data::IdentifierAttrs::ConstantAttr(init)));
        label
    }

    pub fn emit(&mut self, instr: Instruction) {
        self.instrs.push(instr);
    }

    pub fn take_body(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.instrs)
    }

    /// A fresh variable whose type is `exp.exp_type`, `LocalAttr`-attributed
    /// (spec's `plain_inner_value`). Temps never revisit the symbol table —
    /// the optimizer and any eventual backend infer a temp's type from its
    /// single defining instruction.
    pub fn plain_inner_value(&mut self, exp: &CExp) -> Ident {
        let _ = exp.ty();
        self.idents.fresh_var("tmp")
    }

    /// A fresh `Long`-typed temporary for pointer arithmetic (spec's
    /// `ptr_inner_value`).
    pub fn ptr_inner_value(&mut self) -> Ident {
        self.idents.fresh_var("tmp")
    }

    pub fn fresh_label(&mut self, prefix: &str) -> Ident {
        self.idents.fresh_label(prefix)
    }

    /// Size in bytes, looking up aggregates in the struct-typedef table
    /// (mirrors the semantic analyzer's own size computation).
    pub fn type_size(&self, ty: &Type) -> i64 {
        match ty.kind() {
            TypeKind::Array { size, element } => size * self.type_size(element),
            TypeKind::Structure { tag, .. } => {
                self.frontend.lookup_struct(*tag).expect("struct type must be declared before use").size
            }
            _ => ty.scalar_size(),
        }
    }

    /// The scale for `AddPtr` lowering of `p +/- i`: the referent's size.
    pub fn pointee_scale(&self, pointer_ty: &Type) -> i64 {
        let referent = pointer_ty.pointer_referent().expect("scale requested on a non-pointer type");
        self.type_size(referent)
    }

    /// Collapses an `ExpResult` lvalue to an rvalue `Value`, emitting the
    /// load this requires (spec's "Reading").
    pub fn read(&mut self, result: ExpResult) -> Value {
        match result {
            ExpResult::PlainOperand(v) => v,
            ExpResult::DereferencedPointer(ptr) => {
                let dst = self.idents.fresh_var("tmp");
                self.emit(Instruction::Load { src_ptr: ptr, dst });
                Value::Variable(dst)
            }
            ExpResult::SubObject(base, offset) => {
                let dst = self.idents.fresh_var("tmp");
                self.emit(Instruction::CopyFromOffset { src_name: base, offset, dst });
                Value::Variable(dst)
            }
        }
    }

    /// Writes `src` through an `ExpResult` lvalue, returning the value
    /// written (spec's `assign_res`).
    pub fn assign_res(&mut self, result: ExpResult, src: Value) -> Value {
        match result {
            ExpResult::PlainOperand(dst_val) => {
                let dst = dst_val.as_variable().expect("assignment target must be a variable");
                self.emit(Instruction::Copy { src: src.clone(), dst });
                src
            }
            ExpResult::DereferencedPointer(ptr) => {
                self.emit(Instruction::Store { src: src.clone(), dst_ptr: ptr });
                src
            }
            ExpResult::SubObject(base, offset) => {
                self.emit(Instruction::CopyToOffset { dst_name: base, offset, src: src.clone() });
                src
            }
        }
    }
}
