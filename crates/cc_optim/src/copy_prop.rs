//! Copy propagation (spec §4.5). Tracked facts are the program's distinct
//! `Copy(src, dst)` pairs — `src` may itself be a constant, so this
//! doubles as constant propagation through a variable's single remaining
//! definition. Forward analysis, meet = intersection, grounded directly
//! on `cc_dataflow`'s `Analysis` trait.

use cc_cfg::Cfg;
use cc_data::FrontendContext;
use cc_dataflow::{Analysis, DataflowContext, Direction};
use cc_ident::Ident;
use cc_tac_ir::{Instruction, Value};

struct Candidate {
    src: Value,
    dst: Ident,
}

struct CopyPropagation<'a> {
    candidates: Vec<Candidate>,
    frontend: &'a FrontendContext,
}

impl<'a> CopyPropagation<'a> {
    fn is_aliased(&self, name: Ident) -> bool {
        self.frontend.addressed_set.contains(&name)
            || self.frontend.lookup_symbol(name).map(cc_data::Symbol::is_static_storage).unwrap_or(false)
    }

    fn kill_touching(&self, ctx: &mut DataflowContext, name: Ident) {
        let row = ctx.incoming_row();
        for (i, c) in self.candidates.iter().enumerate() {
            if c.dst == name || c.src.as_variable() == Some(name) {
                ctx.instrs_mask_sets.set(row, i, false);
            }
        }
    }

    fn kill_aliased(&self, ctx: &mut DataflowContext) {
        let row = ctx.incoming_row();
        for (i, c) in self.candidates.iter().enumerate() {
            let src_aliased = c.src.as_variable().map(|v| self.is_aliased(v)).unwrap_or(false);
            if src_aliased || self.is_aliased(c.dst) {
                ctx.instrs_mask_sets.set(row, i, false);
            }
        }
    }
}

impl<'a> Analysis for CopyPropagation<'a> {
    fn set_size(&self) -> usize {
        self.candidates.len()
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn seed(&self, _ctx: &mut DataflowContext) {}

    /// Order matters: a generic kill-by-destination runs first (spec's
    /// "any instruction with a dst variable"), then the `Copy`-specific
    /// gen — a `Copy(s, d)` is itself a `dst`-defining instruction, so its
    /// own fact would otherwise be killed by the first step right after
    /// being set.
    fn transfer(&self, instr: &Instruction, ctx: &mut DataflowContext) {
        if let Some(def) = instr.dst() {
            self.kill_touching(ctx, def);
        }
        match instr {
            Instruction::FunCall { .. } | Instruction::Store { .. } => self.kill_aliased(ctx),
            Instruction::CopyToOffset { dst_name, .. } => self.kill_touching(ctx, *dst_name),
            _ => {}
        }
        if let Instruction::Copy { src, dst } = instr {
            let row = ctx.incoming_row();
            for (i, c) in self.candidates.iter().enumerate() {
                if c.src == *src && c.dst == *dst {
                    ctx.instrs_mask_sets.set(row, i, true);
                }
            }
        }
    }
}

pub fn propagate_copies(cfg: &mut Cfg, frontend: &FrontendContext) -> bool {
    let mut candidates: Vec<Candidate> = Vec::new();
    for slot in &cfg.instrs {
        if let Some(Instruction::Copy { src, dst }) = slot {
            if !candidates.iter().any(|c| c.src == *src && c.dst == *dst) {
                candidates.push(Candidate { src: src.clone(), dst: *dst });
            }
        }
    }
    if candidates.is_empty() {
        return false;
    }

    let analysis = CopyPropagation { candidates, frontend };
    let ctx = cc_dataflow::run(cfg, &analysis);

    let mut changed = false;
    for idx in 0..cfg.instrs.len() {
        if let Some(instr) = cfg.instrs[idx].as_mut() {
            for operand in instr.uses_mut() {
                if let Value::Variable(used) = operand {
                    if let Some((i, _)) = analysis.candidates.iter().enumerate().find(|(_, c)| c.dst == *used) {
                        if ctx.instrs_mask_sets.get(idx, i) {
                            *operand = analysis.candidates[i].src.clone();
                            changed = true;
                        }
                    }
                }
            }
        }
        let is_self_copy = matches!(
            &cfg.instrs[idx],
            Some(Instruction::Copy { src: Value::Variable(s), dst }) if s == dst
        );
        if is_self_copy {
            changed = true;
            cfg.instrs[idx] = None;
            cfg.fixed_point = false;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::BinaryOp;
    use cc_data::CConst;
    use cc_ident::IdentContext;

    #[test]
    fn a_use_of_a_copys_destination_is_replaced_by_its_source() {
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let t0 = idents.fresh_var("t");
        let instrs = vec![
            Instruction::Copy { src: Value::Variable(x), dst: t0 },
            Instruction::Return(Value::Variable(t0)),
        ];
        let mut cfg = Cfg::build(instrs);
        let frontend = FrontendContext::new();
        assert!(propagate_copies(&mut cfg, &frontend));
        let out = cfg.into_instructions();
        assert_eq!(out[1], Instruction::Return(Value::Variable(x)));
    }

    #[test]
    fn a_constant_sourced_copy_propagates_the_constant_itself() {
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let instrs = vec![
            Instruction::Copy { src: Value::Constant(CConst::Int(7)), dst: x },
            Instruction::Return(Value::Variable(x)),
        ];
        let mut cfg = Cfg::build(instrs);
        let frontend = FrontendContext::new();
        assert!(propagate_copies(&mut cfg, &frontend));
        let out = cfg.into_instructions();
        assert_eq!(out[1], Instruction::Return(Value::Constant(CConst::Int(7))));
    }

    #[test]
    fn redefining_the_copy_source_kills_the_fact() {
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let t0 = idents.fresh_var("t");
        let instrs = vec![
            Instruction::Copy { src: Value::Variable(x), dst: t0 },
            Instruction::Binary {
                op: BinaryOp::Add,
                src1: Value::Variable(x),
                src2: Value::Constant(CConst::Int(1)),
                dst: x,
            },
            Instruction::Return(Value::Variable(t0)),
        ];
        let mut cfg = Cfg::build(instrs);
        let frontend = FrontendContext::new();
        propagate_copies(&mut cfg, &frontend);
        let out = cfg.into_instructions();
        assert_eq!(out[2], Instruction::Return(Value::Variable(t0)), "t0 must keep reading t0, not stale x");
    }

    #[test]
    fn a_function_call_kills_a_copy_of_an_addressed_variable() {
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let t0 = idents.fresh_var("t");
        let f = idents.intern("f");
        let instrs = vec![
            Instruction::Copy { src: Value::Variable(x), dst: t0 },
            Instruction::FunCall { name: f, args: vec![], dst: None },
            Instruction::Return(Value::Variable(t0)),
        ];
        let mut cfg = Cfg::build(instrs);
        let mut frontend = FrontendContext::new();
        frontend.mark_addressed(x);
        propagate_copies(&mut cfg, &frontend);
        let out = cfg.into_instructions();
        assert_eq!(out[2], Instruction::Return(Value::Variable(t0)), "call may have mutated *x through its address");
    }
}
