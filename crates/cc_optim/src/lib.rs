//! The TAC optimizer (spec §4.5): a fixed-point driver running constant
//! folding, unreachable-code elimination, copy propagation, and
//! dead-store elimination over a function-local control-flow graph.

mod copy_prop;
mod dead_store;
mod fold;
mod prune;

use cc_cfg::Cfg;
use cc_data::FrontendContext;
use cc_tac_ir::TacProgram;

/// `optim_mask` bits, per spec §6.
pub const FOLD: u8 = 1 << 0;
pub const COPY_PROPAGATION: u8 = 1 << 1;
pub const UNREACHABLE_CODE_ELIMINATION: u8 = 1 << 2;
pub const DEAD_STORE_ELIMINATION: u8 = 1 << 3;

fn optimize_function(body: &mut Vec<cc_tac_ir::Instruction>, frontend: &FrontendContext, optim_mask: u8) {
    let fold_enabled = optim_mask & FOLD != 0;
    let uce_enabled = optim_mask & UNREACHABLE_CODE_ELIMINATION != 0;
    let copy_enabled = optim_mask & COPY_PROPAGATION != 0;
    let dead_store_enabled = optim_mask & DEAD_STORE_ELIMINATION != 0;

    let mut instrs = std::mem::take(body);
    let mut iteration = 0u32;
    loop {
        iteration += 1;
        let _span = tracing::debug_span!("optimize_three_address_code", iteration).entered();

        let folded_changed = if fold_enabled { fold::fold_instructions(&mut instrs) } else { false };

        let mut cfg_changed = false;
        if optim_mask != 0 {
            let mut cfg = Cfg::build(instrs);
            if uce_enabled {
                cfg_changed |= prune::prune_unreachable(&mut cfg);
            }
            if copy_enabled {
                cfg_changed |= copy_prop::propagate_copies(&mut cfg, frontend);
            }
            if dead_store_enabled {
                cfg_changed |= dead_store::eliminate_dead_stores(&mut cfg, frontend);
            }
            cfg_changed |= !cfg.fixed_point;
            instrs = cfg.into_instructions();
        }

        tracing::debug!(folded_changed, cfg_changed, "optimizer iteration");
        if !folded_changed && !cfg_changed {
            break;
        }
    }
    *body = instrs;
}

/// Rewrites every function body in place; static data is untouched. See
/// spec §6 entry point 3.
pub fn optimize_three_address_code(program: &mut TacProgram, frontend: &FrontendContext, optim_mask: u8) {
    let _span = tracing::info_span!("optimize_three_address_code", optim_mask).entered();
    for function in &mut program.functions {
        optimize_function(&mut function.body, frontend, optim_mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::BinaryOp;
    use cc_data::CConst;
    use cc_ident::IdentContext;
    use cc_tac_ir::{Function, Instruction, Value};

    fn single_function(body: Vec<Instruction>) -> TacProgram {
        let mut idents = IdentContext::new();
        let name = idents.intern("f");
        TacProgram { static_constants: vec![], static_variables: vec![], functions: vec![Function { name, is_global: true, params: vec![], body }] }
    }

    #[test]
    fn two_local_constants_fold_and_propagate_into_a_single_return() {
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let y = idents.intern("y");
        let sum = idents.fresh_var("t");
        let body = vec![
            Instruction::Copy { src: Value::Constant(CConst::Int(1)), dst: x },
            Instruction::Copy { src: Value::Constant(CConst::Int(2)), dst: y },
            Instruction::Binary { op: BinaryOp::Add, src1: Value::Variable(x), src2: Value::Variable(y), dst: sum },
            Instruction::Return(Value::Variable(sum)),
        ];
        let mut program = single_function(body);
        let frontend = FrontendContext::new();
        optimize_three_address_code(&mut program, &frontend, FOLD | COPY_PROPAGATION | DEAD_STORE_ELIMINATION | UNREACHABLE_CODE_ELIMINATION);

        let out = &program.functions[0].body;
        assert_eq!(out.len(), 1, "x and y fold away entirely: {out:?}");
        assert_eq!(out[0], Instruction::Return(Value::Constant(CConst::Int(3))));
    }

    #[test]
    fn an_unconditional_returns_tail_is_pruned() {
        let mut idents = IdentContext::new();
        let _ = idents.intern("unused");
        let body = vec![
            Instruction::Return(Value::Constant(CConst::Int(1))),
            Instruction::Return(Value::Constant(CConst::Int(2))),
        ];
        let mut program = single_function(body);
        let frontend = FrontendContext::new();
        optimize_three_address_code(&mut program, &frontend, UNREACHABLE_CODE_ELIMINATION);

        let out = &program.functions[0].body;
        assert_eq!(out, &vec![Instruction::Return(Value::Constant(CConst::Int(1)))]);
    }

    #[test]
    fn a_zero_mask_leaves_the_function_untouched() {
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let body = vec![
            Instruction::Copy { src: Value::Constant(CConst::Int(1)), dst: x },
            Instruction::Return(Value::Variable(x)),
        ];
        let mut program = single_function(body.clone());
        let frontend = FrontendContext::new();
        optimize_three_address_code(&mut program, &frontend, 0);
        assert_eq!(program.functions[0].body, body);
    }

    #[test]
    fn null_pointer_comparison_collapses_to_a_constant_true() {
        let mut idents = IdentContext::new();
        let p = idents.intern("p");
        let cmp = idents.fresh_var("t");
        let body = vec![
            Instruction::Copy { src: Value::Constant(CConst::Long(0)), dst: p },
            Instruction::Binary {
                op: BinaryOp::Equal,
                src1: Value::Variable(p),
                src2: Value::Constant(CConst::Long(0)),
                dst: cmp,
            },
            Instruction::Return(Value::Variable(cmp)),
        ];
        let mut program = single_function(body);
        let frontend = FrontendContext::new();
        optimize_three_address_code(&mut program, &frontend, FOLD | COPY_PROPAGATION | DEAD_STORE_ELIMINATION | UNREACHABLE_CODE_ELIMINATION);

        let out = &program.functions[0].body;
        assert_eq!(out, &vec![Instruction::Return(Value::Constant(CConst::Int(1)))]);
    }
}
