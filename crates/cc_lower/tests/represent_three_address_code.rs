//! End-to-end exercises of `represent_three_address_code`: each test runs
//! semantic analysis first (so names are resolved and types decorated)
//! then lowers the result and inspects the emitted instructions (spec
//! §4.2, §8).

use cc_ast::{
    Assignment, AssignUnop, BinaryOp, CBlockItem, CExp, CExpKind, CStatement, Declaration, FunDecl, Initializer,
    StorageClass, VarDecl,
};
use cc_data::{CConst, FrontendContext, Type, TypeInterner};
use cc_diagnostics::SemanticError;
use cc_ident::IdentContext;
use cc_lower::represent_three_address_code;
use cc_tac_ir::{Instruction, Value};

fn const_exp(c: CConst, line: u32) -> CExp {
    CExp::new(CExpKind::Constant(c), line)
}

fn analyze(program: &mut Vec<Declaration>, frontend: &mut FrontendContext, idents: &mut IdentContext) {
    let mut errors: Vec<SemanticError> = Vec::new();
    let result = cc_sema::analyze_semantic(program, &mut errors, frontend, idents);
    assert!(result.is_ok(), "unexpected errors: {errors:?}");
}

#[test]
fn a_function_returning_an_arithmetic_expression_lowers_the_binary_op_then_falls_off_the_end() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let sum = CExp::new(
        CExpKind::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(const_exp(CConst::Int(2), 1)),
            rhs: Box::new(const_exp(CConst::Int(2), 1)),
        },
        1,
    );
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![CBlockItem::Statement(CStatement::Return(Some(sum)))]),
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    assert_eq!(tac.functions.len(), 1);
    let body = &tac.functions[0].body;
    assert!(matches!(body[0], Instruction::Binary { op: BinaryOp::Add, .. }));
    assert!(matches!(body[1], Instruction::Return(_)));
    // Every function falls off the end with an implicit `return 0`, even
    // when an earlier explicit `return` makes it dead.
    assert!(matches!(body.last(), Some(Instruction::Return(Value::Constant(CConst::Int(0))))));
}

#[test]
fn an_if_else_lowers_to_a_conditional_jump_around_each_branch() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let cond = const_exp(CConst::Int(1), 1);
    let stmt = CStatement::If {
        cond,
        then_branch: Box::new(CStatement::Return(Some(const_exp(CConst::Int(1), 2)))),
        else_branch: Some(Box::new(CStatement::Return(Some(const_exp(CConst::Int(0), 3))))),
    };
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![CBlockItem::Statement(stmt)]),
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    let body = &tac.functions[0].body;
    let jump_if_zero_count = body.iter().filter(|i| matches!(i, Instruction::JumpIfZero { .. })).count();
    let label_count = body.iter().filter(|i| matches!(i, Instruction::Label(_))).count();
    assert_eq!(jump_if_zero_count, 1);
    assert_eq!(label_count, 2, "an else-label and an end-label");
}

#[test]
fn a_while_loop_jumps_back_to_its_own_continue_label() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let while_stmt = CStatement::While {
        cond: const_exp(CConst::Int(0), 1),
        body: Box::new(CStatement::Null),
        target: None,
    };
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![
            CBlockItem::Statement(while_stmt),
            CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(0), 2)))),
        ]),
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    let body = &tac.functions[0].body;
    let jump_targets: Vec<_> = body.iter().filter_map(|i| match i {
        Instruction::Jump(t) => Some(*t),
        _ => None,
    }).collect();
    let labels: Vec<_> = body.iter().filter_map(|i| match i {
        Instruction::Label(l) => Some(*l),
        _ => None,
    }).collect();
    assert_eq!(jump_targets.len(), 1, "the unconditional jump back to re-check the condition");
    assert!(labels.contains(&jump_targets[0]), "the jump must land on a label this function actually emits");
}

#[test]
fn pointer_addition_scales_the_index_by_the_pointees_size() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");
    let p = idents.intern("p");

    let int_ptr = Type::pointer(interner.long());
    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let add = CExp::new(
        CExpKind::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(CExp::new(CExpKind::Var(p), 2)),
            rhs: Box::new(const_exp(CConst::Int(3), 2)),
        },
        2,
    );
    let mut program = vec![Declaration::Fun(FunDecl {
        name: main,
        params: vec![],
        fun_type,
        storage_class: None,
        line: 1,
        body: Some(vec![
            CBlockItem::Declaration(Declaration::Var(VarDecl {
                name: p,
                var_type: int_ptr,
                init: None,
                storage_class: None,
                line: 1,
            })),
            CBlockItem::Statement(CStatement::Expression(add)),
            CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(0), 3)))),
        ]),
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    let body = &tac.functions[0].body;
    let add_ptr = body.iter().find_map(|i| match i {
        Instruction::AddPtr { scale, .. } => Some(*scale),
        _ => None,
    });
    assert_eq!(add_ptr, Some(8), "pointer to an 8-byte `long` scales by 8");
}

#[test]
fn a_global_with_an_initializer_is_emitted_as_a_static_variable() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let x = idents.intern("x");

    let mut program = vec![Declaration::Var(VarDecl {
        name: x,
        var_type: interner.int(),
        init: Some(Initializer::Single(const_exp(CConst::Int(7), 1))),
        storage_class: None,
        line: 1,
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    assert_eq!(tac.static_variables.len(), 1);
    assert_eq!(tac.static_variables[0].name, x);
    assert!(tac.static_variables[0].is_global);
}

#[test]
fn an_uninitialized_file_scope_static_becomes_a_tentative_zero_init() {
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let x = idents.intern("x");

    let mut program = vec![Declaration::Var(VarDecl {
        name: x,
        var_type: interner.int(),
        init: None,
        storage_class: Some(StorageClass::Static),
        line: 1,
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    assert_eq!(tac.static_variables.len(), 1);
    assert_eq!(tac.static_variables[0].inits, vec![cc_data::StaticInit::ZeroInit(4)]);
    assert!(!tac.static_variables[0].is_global, "internal linkage for an explicit `static`");
}

#[test]
fn a_narrowing_compound_assignment_promotes_then_truncates_back_to_the_lvalues_width() {
    // `char c; c += 1;` — usual arithmetic conversions promote `c` to
    // `int` for the add, so the analyzer wraps the binary in a result
    // cast back down to `char`; lowering must honor both casts instead
    // of assuming `exp_right` is a bare `Binary`.
    let mut idents = IdentContext::new();
    let interner = TypeInterner::new();
    let main = idents.intern("main");
    let c = idents.intern("c");

    let fun_type = Type::fun_type(vec![], interner.int(), 0, 0);
    let compound_add = CExp::new(
        CExpKind::Assignment(Assignment {
            unop: AssignUnop::None,
            exp_left: None,
            exp_right: Box::new(CExp::new(
                CExpKind::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(CExp::new(CExpKind::Var(c), 2)),
                    rhs: Box::new(const_exp(CConst::Int(1), 2)),
                },
                2,
            )),
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
            CBlockItem::Declaration(Declaration::Var(VarDecl {
                name: c,
                var_type: interner.char(),
                init: None,
                storage_class: None,
                line: 1,
            })),
            CBlockItem::Statement(CStatement::Expression(compound_add)),
            CBlockItem::Statement(CStatement::Return(Some(const_exp(CConst::Int(0), 3)))),
        ]),
    })];

    let mut frontend = FrontendContext::new();
    analyze(&mut program, &mut frontend, &mut idents);
    let tac = represent_three_address_code(&program, &mut frontend, &mut idents);

    let body = &tac.functions[0].body;
    assert!(
        body.iter().any(|i| matches!(i, Instruction::SignExtend { .. })),
        "`c`'s current value must be promoted to `int` before the add: {body:?}"
    );
    assert!(
        body.iter().any(|i| matches!(i, Instruction::Binary { op: BinaryOp::Add, .. })),
        "the add itself runs in the promoted type: {body:?}"
    );
    assert!(
        body.iter().any(|i| matches!(i, Instruction::Truncate { .. })),
        "the sum must be narrowed back to `char` before the write-back: {body:?}"
    );
    let wrote_back_to_c = body.iter().any(|i| matches!(i, Instruction::Copy { dst, .. } if *dst == c));
    assert!(wrote_back_to_c, "the narrowed result must be copied back into `c`: {body:?}");
}
