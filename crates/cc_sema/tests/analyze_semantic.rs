//! End-to-end exercises of `analyze_semantic` against small hand-built ASTs,
//! covering resolution, type checking, and static initializer synthesis
//! together (spec §4.1, §8).

use cc_ast::{
    Assignment, AssignUnop, BinaryOp, CBlockItem, CExp, CExpKind, CStatement, Declaration, FunDecl, Initializer,
    StorageClass, VarDecl,
};
use cc_data::{CConst, FrontendContext, IdentifierAttrs, InitialValue, StaticInit, Type, TypeInterner};
use cc_diagnostics::SemanticError;
use cc_ident::IdentContext;
use cc_sema::analyze_semantic;

fn const_exp(c: CConst, line: u32) -> CExp {
    CExp::new(CExpKind::Constant(c), line)
}

#[test]
fn redeclaring_a_variable_with_a_conflicting_type_is_reported() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let x = idents.intern("x");

    let mut program = vec![
        Declaration::Var(VarDecl { name: x, var_type: interner.int(), init: None, storage_class: None, line: 1 }),
        Declaration::Var(VarDecl { name: x, var_type: interner.double(), init: None, storage_class: None, line: 2 }),
    ];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_err());
    assert!(errors.iter().any(|e| e.code == cc_diagnostics::ErrorCode::Redeclared));
}

#[test]
fn a_tentative_file_variable_becomes_initial_once_an_initializer_appears() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let x = idents.intern("x");

    let mut program = vec![
        Declaration::Var(VarDecl { name: x, var_type: interner.int(), init: None, storage_class: None, line: 1 }),
        Declaration::Var(VarDecl {
            name: x,
            var_type: interner.int(),
            init: Some(Initializer::Single(const_exp(CConst::Int(7), 2))),
            storage_class: None,
            line: 2,
        }),
    ];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_ok());
    let sym = frontend.symbol_table.get(&x).expect("declared above");
    match &sym.attrs {
        IdentifierAttrs::StaticAttr { init: InitialValue::Initial(v), is_global } => {
            assert!(*is_global);
            assert_eq!(v, &vec![StaticInit::IntInit(7)]);
        }
        other => panic!("expected an initial static attr, got {other:?}"),
    }
}

#[test]
fn reference_to_an_undeclared_variable_is_reported() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");
    let y = idents.intern("y");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![CBlockItem::Statement(CStatement::Return(Some(CExp::new(CExpKind::Var(y), 2))))]),
    })];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_err());
    assert!(errors.iter().any(|e| e.code == cc_diagnostics::ErrorCode::UndeclaredVar));
}

#[test]
fn goto_without_a_matching_label_is_reported() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");
    let nowhere = idents.intern("nowhere");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![
            CBlockItem::Statement(CStatement::Goto(nowhere)),
            CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(0), 3)))),
        ]),
    })];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_err());
    assert!(errors.iter().any(|e| e.code == cc_diagnostics::ErrorCode::UndefinedGotoTarget));
}

#[test]
fn a_labeled_goto_target_resolves_cleanly() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");
    let done = idents.intern("done");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![
            CBlockItem::Statement(CStatement::Goto(done)),
            CBlockItem::Statement(CStatement::Labeled {
                label: done,
                body: Box::new(CStatement::Return(Some(const_exp(CConst::Int(0), 3)))),
            }),
        ]),
    })];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_ok(), "unexpected errors: {errors:?}");
}

#[test]
fn break_outside_any_loop_or_switch_is_reported() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![CBlockItem::Statement(CStatement::Break(None))]),
    })];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_err());
    assert!(errors.iter().any(|e| e.code == cc_diagnostics::ErrorCode::BreakOutOfContext));
}

#[test]
fn assigning_to_a_non_lvalue_is_reported() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let assign = CExp::new(
        CExpKind::Assignment(Assignment {
            unop: AssignUnop::None,
            exp_left: Some(Box::new(const_exp(CConst::Int(1), 2))),
            exp_right: Box::new(const_exp(CConst::Int(2), 2)),
        }),
        2,
    );
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![
            CBlockItem::Statement(CStatement::Expression(assign)),
            CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(0), 3)))),
        ]),
    })];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_err());
    assert!(errors.iter().any(|e| e.code == cc_diagnostics::ErrorCode::InvalidOperatorOperand));
}

#[test]
fn local_variable_declarations_get_distinct_resolved_names_across_functions() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let f = idents.intern("f");
    let g = idents.intern("g");
    let x = idents.intern("x");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let make_body = |x: cc_ident::Ident| {
        vec![
            CBlockItem::Declaration(Declaration::Var(VarDecl {
                name: x,
                var_type: interner.int(),
                init: Some(Initializer::Single(const_exp(CConst::Int(1), 2))),
                storage_class: None,
                line: 2,
            })),
            CBlockItem::Statement(CStatement::Return(Some(CExp::new(CExpKind::Var(x), 3)))),
        ]
    };

    let mut program = vec![
        Declaration::Fun(FunDecl { name: f, params: vec![], fun_type: fun_type.clone(), storage_class: None, line: 1, body: Some(make_body(x)) }),
        Declaration::Fun(FunDecl { name: g, params: vec![], fun_type, storage_class: None, line: 4, body: Some(make_body(x)) }),
    ];

    let mut frontend = FrontendContext::new();
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = analyze_semantic(&mut program, &mut errors, &mut frontend, &mut idents);

    assert!(result.is_ok(), "unexpected errors: {errors:?}");

    let names_in = |decl: &Declaration| -> Vec<cc_ident::Ident> {
        let Declaration::Fun(fd) = decl else { unreachable!() };
        fd.body
            .as_ref()
            .unwrap()
            .iter()
            .filter_map(|item| match item {
                CBlockItem::Declaration(Declaration::Var(vd)) => Some(vd.name),
                _ => None,
            })
            .collect()
    };
    let f_local = names_in(&program[0])[0];
    let g_local = names_in(&program[1])[0];
    assert_ne!(f_local, g_local, "each function's local `x` must get its own resolved name");
}
