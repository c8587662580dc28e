//! Hand-built translation units used when no real C frontend is linked
//! (the lexer/parser are out of scope — see spec §1). Each one mirrors an
//! end-to-end scenario this core is meant to handle, so the binary proves
//! out the full `analyze_semantic` → `represent_three_address_code` →
//! `optimize_three_address_code` pipeline without needing real source.

use cc_ast::{
    BinaryOp, CBlockItem, CExp, CExpKind, CStatement, Declaration, FunDecl, Initializer, StorageClass, VarDecl,
};
use cc_data::{CConst, Type, TypeInterner};
use cc_ident::{Ident, IdentContext};

fn const_exp(c: CConst, line: u32) -> CExp {
    CExp::new(CExpKind::Constant(c), line)
}

fn var_exp(name: Ident, line: u32) -> CExp {
    CExp::new(CExpKind::Var(name), line)
}

fn main_returning(fun_type: Type, body: Vec<CBlockItem>, idents: &mut IdentContext) -> cc_ast::Program {
    let main = idents.intern("main");
    vec![Declaration::Fun(FunDecl { name: main, params: vec![], fun_type, storage_class: None, line: 1, body: Some(body) })]
}

/// `int main(void) { int x = 1; int y = 2; return x + y; }` — the literal
/// fold-then-propagate property from spec §8.
pub fn arithmetic(idents: &mut IdentContext) -> cc_ast::Program {
    let interner = TypeInterner::new();
    let x = idents.intern("x");
    let y = idents.intern("y");
    let body = vec![
        CBlockItem::Declaration(Declaration::Var(VarDecl {
            name: x,
            var_type: interner.int(),
            init: Some(Initializer::Single(const_exp(CConst::Int(1), 1))),
            storage_class: None,
            line: 1,
        })),
        CBlockItem::Declaration(Declaration::Var(VarDecl {
            name: y,
            var_type: interner.int(),
            init: Some(Initializer::Single(const_exp(CConst::Int(2), 2))),
            storage_class: None,
            line: 2,
        })),
        CBlockItem::Statement(CStatement::Return(Some(CExp::new(
            CExpKind::Binary { op: BinaryOp::Add, lhs: Box::new(var_exp(x, 3)), rhs: Box::new(var_exp(y, 3)) },
            3,
        )))),
    ];
    main_returning(Type::fun_type(vec![], interner.int(), 0, 0), body, idents)
}

/// `int main(void) { int *p = 0; return p == 0; }` — end-to-end scenario 1.
pub fn null_pointer_comparison(idents: &mut IdentContext) -> cc_ast::Program {
    let interner = TypeInterner::new();
    let p = idents.intern("p");
    let body = vec![
        CBlockItem::Declaration(Declaration::Var(VarDecl {
            name: p,
            var_type: Type::pointer(interner.int()),
            init: Some(Initializer::Single(const_exp(CConst::Int(0), 1))),
            storage_class: None,
            line: 1,
        })),
        CBlockItem::Statement(CStatement::Return(Some(CExp::new(
            CExpKind::Binary {
                op: BinaryOp::Equal,
                lhs: Box::new(var_exp(p, 2)),
                rhs: Box::new(const_exp(CConst::Int(0), 2)),
            },
            2,
        )))),
    ];
    main_returning(Type::fun_type(vec![], interner.int(), 0, 0), body, idents)
}

/// `int main(void) { return 1; return 2; }` — end-to-end scenario 2.
pub fn unreachable_tail(idents: &mut IdentContext) -> cc_ast::Program {
    let interner = TypeInterner::new();
    let body = vec![
        CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(1), 1)))),
        CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(2), 2)))),
    ];
    main_returning(Type::fun_type(vec![], interner.int(), 0, 0), body, idents)
}

pub fn by_name(name: &str, idents: &mut IdentContext) -> Option<cc_ast::Program> {
    match name {
        "arithmetic" => Some(arithmetic(idents)),
        "null-ptr" => Some(null_pointer_comparison(idents)),
        "unreachable" => Some(unreachable_tail(idents)),
        _ => None,
    }
}

pub const NAMES: &[&str] = &["arithmetic", "null-ptr", "unreachable"];
