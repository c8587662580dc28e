//! Statement and local-initializer lowering (spec §4.2 "Statements" and
//! "Local variable initialization").

use cc_ast::{CBlockItem, CExp, CExpKind, CStatement, Declaration, ForInit, Initializer, StorageClass};
use cc_data::{CConst, Type, TypeKind};
use cc_ident::Ident;
use cc_tac_ir::{Instruction, Value};

use crate::context::Lowering;

impl<'a> Lowering<'a> {
    pub fn lower_block_item(&mut self, item: &CBlockItem) {
        match item {
            CBlockItem::Statement(s) => self.lower_statement(s),
            CBlockItem::Declaration(d) => self.lower_local_declaration(d),
        }
    }

    fn lower_local_declaration(&mut self, decl: &Declaration) {
        match decl {
            // `static`/`extern` locals carry no code at their declaration
            // site; their storage is emitted once, globally, by static
            // emission (spec's "Static emission").
            Declaration::Var(vd) if vd.storage_class.is_some() => {
                debug_assert!(matches!(vd.storage_class, Some(StorageClass::Static) | Some(StorageClass::Extern)));
            }
            Declaration::Var(vd) => {
                if let Some(init) = &vd.init {
                    self.lower_var_decl_init(vd.name, &vd.var_type, init);
                }
            }
            Declaration::Fun(_) | Declaration::Struct(_) => {}
        }
    }

    pub fn lower_statement(&mut self, stmt: &CStatement) {
        match stmt {
            CStatement::Return(Some(e)) => {
                let v = self.lower_rvalue(e);
                self.emit(Instruction::Return(v));
            }
            CStatement::Return(None) => {
                self.emit(Instruction::Return(Value::Constant(CConst::Int(0))));
            }
            CStatement::Expression(e) => {
                let _ = self.lower_exp(e);
            }
            CStatement::If { cond, then_branch, else_branch } => self.lower_if(cond, then_branch, else_branch),
            CStatement::Compound(items) => {
                for item in items {
                    self.lower_block_item(item);
                }
            }
            CStatement::While { cond, body, target } => self.lower_while(cond, body, *target),
            CStatement::DoWhile { body, cond, target } => self.lower_do_while(body, cond, *target),
            CStatement::For { init, cond, post, body, target } => {
                self.lower_for(init, cond, post, body, *target)
            }
            CStatement::Switch { scrutinee, body, target, is_default, cases } => {
                self.lower_switch(scrutinee, body, target.expect("assigned by semantic analysis"), *is_default, cases)
            }
            CStatement::Case { value: _, body, target } => {
                self.emit(Instruction::Label(target.expect("assigned by semantic analysis")));
                self.lower_statement(body);
            }
            CStatement::Default { body, target } => {
                self.emit(Instruction::Label(target.expect("assigned by semantic analysis")));
                self.lower_statement(body);
            }
            CStatement::Labeled { label, body } => {
                self.emit(Instruction::Label(*label));
                self.lower_statement(body);
            }
            CStatement::Goto(label) => self.emit(Instruction::Jump(*label)),
            CStatement::Break(target) => {
                let identity = target.expect("assigned by semantic analysis");
                self.emit(Instruction::Jump(self.derive_label(identity, "break")));
            }
            CStatement::Continue(target) => {
                let identity = target.expect("assigned by semantic analysis");
                self.emit(Instruction::Jump(self.derive_label(identity, "continue")));
            }
            CStatement::Null => {}
        }
    }

    fn lower_if(&mut self, cond: &CExp, then_branch: &CStatement, else_branch: &Option<Box<CStatement>>) {
        let cond_val = self.lower_rvalue(cond);
        match else_branch {
            Some(else_b) => {
                let else_label = self.fresh_label("if_else");
                let end_label = self.fresh_label("if_end");
                self.emit(Instruction::JumpIfZero { cond: cond_val, target: else_label });
                self.lower_statement(then_branch);
                self.emit(Instruction::Jump(end_label));
                self.emit(Instruction::Label(else_label));
                self.lower_statement(else_b);
                self.emit(Instruction::Label(end_label));
            }
            None => {
                let end_label = self.fresh_label("if_end");
                self.emit(Instruction::JumpIfZero { cond: cond_val, target: end_label });
                self.lower_statement(then_branch);
                self.emit(Instruction::Label(end_label));
            }
        }
    }

    /// Derives the concrete `continue`/`break` (or `case.N`/`default`) label
    /// for a loop/switch from the single identity label semantic analysis
    /// minted for it, by string-suffixing — the same convention semantic
    /// analysis itself used when it set `Case`/`Default`'s own `target`
    /// fields, so both sides of the convention agree on the same `Ident`.
    fn derive_label(&mut self, identity: Ident, suffix: &str) -> Ident {
        let text = self.idents.resolve(identity).to_string();
        self.idents.intern(&format!("{text}.{suffix}"))
    }

    fn lower_while(&mut self, cond: &CExp, body: &CStatement, target: Option<Ident>) {
        let identity = target.expect("assigned by semantic analysis");
        let continue_label = self.derive_label(identity, "continue");
        let break_label = self.derive_label(identity, "break");
        self.emit(Instruction::Label(continue_label));
        let cond_val = self.lower_rvalue(cond);
        self.emit(Instruction::JumpIfZero { cond: cond_val, target: break_label });
        self.lower_statement(body);
        self.emit(Instruction::Jump(continue_label));
        self.emit(Instruction::Label(break_label));
    }

    fn lower_do_while(&mut self, body: &CStatement, cond: &CExp, target: Option<Ident>) {
        let identity = target.expect("assigned by semantic analysis");
        let start_label = self.derive_label(identity, "start");
        let continue_label = self.derive_label(identity, "continue");
        let break_label = self.derive_label(identity, "break");
        self.emit(Instruction::Label(start_label));
        self.lower_statement(body);
        self.emit(Instruction::Label(continue_label));
        let cond_val = self.lower_rvalue(cond);
        self.emit(Instruction::JumpIfNotZero { cond: cond_val, target: start_label });
        self.emit(Instruction::Label(break_label));
    }

    fn lower_for(
        &mut self,
        init: &ForInit,
        cond: &Option<CExp>,
        post: &Option<CExp>,
        body: &CStatement,
        target: Option<Ident>,
    ) {
        match init {
            ForInit::Decl(vd) => {
                if let Some(i) = &vd.init {
                    self.lower_var_decl_init(vd.name, &vd.var_type, i);
                }
            }
            ForInit::Exp(Some(e)) => {
                let _ = self.lower_exp(e);
            }
            ForInit::Exp(None) => {}
        }

        let identity = target.expect("assigned by semantic analysis");
        let start_label = self.derive_label(identity, "start");
        let continue_label = self.derive_label(identity, "continue");
        let break_label = self.derive_label(identity, "break");

        self.emit(Instruction::Label(start_label));
        if let Some(c) = cond {
            let cv = self.lower_rvalue(c);
            self.emit(Instruction::JumpIfZero { cond: cv, target: break_label });
        }
        self.lower_statement(body);
        self.emit(Instruction::Label(continue_label));
        if let Some(p) = post {
            let _ = self.lower_exp(p);
        }
        self.emit(Instruction::Jump(start_label));
        self.emit(Instruction::Label(break_label));
    }

    /// Lowers a `switch` as a series of equality compares against the
    /// scrutinee, each jumping to its case's label on a match, falling
    /// through to `default` (or past the switch) otherwise; the case
    /// bodies themselves are lowered as part of `body`, which contains the
    /// matching `Label` markers via `Case`/`Default`.
    fn lower_switch(&mut self, scrutinee: &CExp, body: &CStatement, identity: Ident, is_default: bool, cases: &[CConst]) {
        let break_label = self.derive_label(identity, "break");
        let scrutinee_val = self.lower_rvalue(scrutinee);

        for (idx, case_const) in cases.iter().enumerate() {
            let label = self.derive_label(identity, &format!("case.{idx}"));
            let cmp = self.ptr_inner_value();
            self.emit(Instruction::Binary {
                op: cc_ast::BinaryOp::Equal,
                src1: scrutinee_val.clone(),
                src2: Value::Constant(*case_const),
                dst: cmp,
            });
            self.emit(Instruction::JumpIfNotZero { cond: Value::Variable(cmp), target: label });
        }
        if is_default {
            let default_label = self.derive_label(identity, "default");
            self.emit(Instruction::Jump(default_label));
        } else {
            self.emit(Instruction::Jump(break_label));
        }

        self.lower_statement(body);
        self.emit(Instruction::Label(break_label));
    }

    fn lower_var_decl_init(&mut self, name: Ident, ty: &Type, init: &Initializer) {
        match init {
            Initializer::Single(exp) if ty.is_array() && matches!(exp.kind, CExpKind::StringLiteral(_)) => {
                self.lower_string_init(name, 0, ty, exp);
            }
            Initializer::Single(exp) => {
                let val = self.lower_rvalue(exp);
                self.emit(Instruction::Copy { src: val, dst: name });
            }
            Initializer::Compound(items) => self.lower_compound_init(name, ty, 0, items),
        }
    }

    fn lower_init_at(&mut self, name: Ident, ty: &Type, offset: i64, init: &Initializer) {
        match init {
            Initializer::Single(exp) if ty.is_array() && matches!(exp.kind, CExpKind::StringLiteral(_)) => {
                self.lower_string_init(name, offset, ty, exp);
            }
            Initializer::Single(exp) => {
                let val = self.lower_rvalue(exp);
                self.emit(Instruction::CopyToOffset { dst_name: name, offset, src: val });
            }
            Initializer::Compound(items) => self.lower_compound_init(name, ty, offset, items),
        }
    }

    fn lower_string_init(&mut self, name: Ident, offset: i64, ty: &Type, exp: &CExp) {
        let CExpKind::StringLiteral(lit) = &exp.kind else {
            unreachable!("string initializer target must hold a StringLiteral expression")
        };
        let text = self.idents.resolve(*lit).to_string();
        let bytes = text.into_bytes();
        let TypeKind::Array { size, .. } = ty.kind() else {
            panic!("string initializer target must be an array type")
        };
        let size = *size;
        for (i, &b) in bytes.iter().enumerate() {
            self.emit(Instruction::CopyToOffset {
                dst_name: name,
                offset: offset + i as i64,
                src: Value::Constant(CConst::Char(b as i8)),
            });
        }
        for i in bytes.len() as i64..size {
            self.emit(Instruction::CopyToOffset {
                dst_name: name,
                offset: offset + i,
                src: Value::Constant(CConst::Char(0)),
            });
        }
    }

    fn lower_compound_init(&mut self, name: Ident, ty: &Type, offset: i64, items: &[Initializer]) {
        match ty.kind() {
            TypeKind::Array { size, element } => {
                let elem_size = self.type_size(element);
                for (i, item) in items.iter().enumerate() {
                    self.lower_init_at(name, element, offset + i as i64 * elem_size, item);
                }
                for i in items.len() as i64..*size {
                    self.zero_fill(name, element, offset + i * elem_size);
                }
            }
            TypeKind::Structure { tag, .. } => {
                let typedef = self
                    .frontend
                    .lookup_struct(*tag)
                    .expect("struct type must be declared before use")
                    .clone();
                for (item, member_name) in items.iter().zip(typedef.member_names.iter()) {
                    let member = typedef.member(*member_name).expect("member listed in member_names").clone();
                    self.lower_init_at(name, &member.ty, offset + member.offset, item);
                }
                for member_name in typedef.member_names.iter().skip(items.len()) {
                    let member = typedef.member(*member_name).expect("member listed in member_names").clone();
                    self.zero_fill(name, &member.ty, offset + member.offset);
                }
            }
            other => unreachable!("compound initializer on non-aggregate type {other:?}"),
        }
    }

    /// Zeroes an object field-by-field/element-by-element, for the trailing
    /// portion of a partially-braced compound initializer C leaves
    /// implicitly zeroed.
    fn zero_fill(&mut self, name: Ident, ty: &Type, offset: i64) {
        match ty.kind() {
            TypeKind::Array { size, element } => {
                let elem_size = self.type_size(element);
                for i in 0..*size {
                    self.zero_fill(name, element, offset + i * elem_size);
                }
            }
            TypeKind::Structure { tag, .. } => {
                let typedef = self
                    .frontend
                    .lookup_struct(*tag)
                    .expect("struct type must be declared before use")
                    .clone();
                for member_name in typedef.member_names.iter() {
                    let member = typedef.member(*member_name).expect("member listed in member_names").clone();
                    self.zero_fill(name, &member.ty, offset + member.offset);
                }
            }
            _ => {
                let c = Self::zero_scalar(ty);
                self.emit(Instruction::CopyToOffset { dst_name: name, offset, src: Value::Constant(c) });
            }
        }
    }

    fn zero_scalar(ty: &Type) -> CConst {
        match ty.kind() {
            TypeKind::Char | TypeKind::SChar => CConst::Char(0),
            TypeKind::UChar => CConst::UChar(0),
            TypeKind::Int => CConst::Int(0),
            TypeKind::UInt => CConst::UInt(0),
            TypeKind::Long | TypeKind::Pointer(_) => CConst::Long(0),
            TypeKind::ULong => CConst::ULong(0),
            TypeKind::Double => CConst::Double(0.0),
            other => panic!("no scalar zero value for type {other:?}"),
        }
    }
}
