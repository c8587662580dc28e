//! Dead-store elimination (spec §4.5). Tracked facts are variable names
//! live at a program point; backward analysis, meet = union, exit's
//! contribution is the static mask (return registers and file-scope
//! statics stay live past the function's end).

use cc_cfg::Cfg;
use cc_data::FrontendContext;
use cc_dataflow::{assign_fact_indices, Analysis, DataflowContext, Direction};
use cc_ident::Ident;
use cc_tac_ir::Instruction;

fn is_dead_store_eligible(instr: &Instruction) -> bool {
    matches!(
        instr,
        Instruction::SignExtend { .. }
            | Instruction::Truncate { .. }
            | Instruction::ZeroExtend { .. }
            | Instruction::DoubleToInt { .. }
            | Instruction::DoubleToUInt { .. }
            | Instruction::IntToDouble { .. }
            | Instruction::UIntToDouble { .. }
            | Instruction::Unary { .. }
            | Instruction::Binary { .. }
            | Instruction::Copy { .. }
            | Instruction::GetAddress { .. }
            | Instruction::Load { .. }
            | Instruction::AddPtr { .. }
            | Instruction::CopyToOffset { .. }
            | Instruction::CopyFromOffset { .. }
    )
}

pub fn eliminate_dead_stores(cfg: &mut Cfg, frontend: &FrontendContext) -> bool {
    let mut names: Vec<Ident> = Vec::new();
    for slot in &cfg.instrs {
        let Some(instr) = slot else { continue };
        if let Some(d) = instr.dst() {
            names.push(d);
        }
        for u in instr.uses() {
            if let cc_tac_ir::Value::Variable(n) = u {
                names.push(*n);
            }
        }
    }
    names.extend(frontend.symbol_table.iter().filter(|(_, s)| s.is_static_storage()).map(|(n, _)| *n));
    names.extend(frontend.addressed_set.iter().copied());
    let set_size = assign_fact_indices(cfg, names);
    if set_size == 0 {
        return false;
    }

    let analysis = LivenessBound { frontend, set_size, indices: cfg.identifier_id_map.clone() };
    let ctx = cc_dataflow::run(cfg, &analysis);

    let mut instr_block: Vec<Option<cc_cfg::BlockId>> = vec![None; cfg.instrs.len()];
    for i in 0..cfg.blocks.len() {
        let b = cc_cfg::BlockId::new(i);
        if let (Some(front), Some(back)) = (cfg.blocks[b].instrs_front_idx, cfg.blocks[b].instrs_back_idx) {
            for slot in instr_block.iter_mut().take(back + 1).skip(front) {
                *slot = Some(b);
            }
        }
    }

    let mut changed = false;
    for idx in 0..cfg.instrs.len() {
        let Some(instr) = &cfg.instrs[idx] else { continue };
        if !is_dead_store_eligible(instr) {
            continue;
        }
        let Some(def) = instr.dst() else { continue };
        let Some(&bit_id) = analysis.indices.get(&def) else { continue };
        let bit = bit_id.index();
        // `row(idx)` is the OUT set for a backward analysis (live facts
        // after this instruction executes): if the defined name isn't in
        // it, nothing downstream ever reads this write.
        if !ctx.instrs_mask_sets.get(idx, bit) {
            if let Some(block) = instr_block[idx] {
                cfg.remove_instr(block, idx);
                changed = true;
            }
        }
    }
    changed
}

/// `Liveness` with its `bit_of` lookup bound to a concrete
/// `identifier_id_map` snapshot (`cc_dataflow::assign_fact_indices`
/// repurposes the CFG's own map, so capturing a clone here keeps the
/// rewrite pass's lookups stable even though the map lives on `cfg`).
struct LivenessBound<'a> {
    frontend: &'a FrontendContext,
    set_size: usize,
    indices: rustc_hash::FxHashMap<Ident, cc_cfg::BlockId>,
}

impl<'a> Analysis for LivenessBound<'a> {
    fn set_size(&self) -> usize {
        self.set_size
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn seed(&self, ctx: &mut DataflowContext) {
        let static_row = ctx.static_row();
        let addressed_row = ctx.addressed_row();
        for (name, sym) in self.frontend.symbol_table.iter() {
            if sym.is_static_storage() {
                if let Some(&bit) = self.indices.get(name) {
                    ctx.instrs_mask_sets.set(static_row, bit.index(), true);
                }
            }
        }
        for name in &self.frontend.addressed_set {
            if let Some(&bit) = self.indices.get(name) {
                ctx.instrs_mask_sets.set(addressed_row, bit.index(), true);
            }
        }
    }

    fn transfer(&self, instr: &Instruction, ctx: &mut DataflowContext) {
        let row = ctx.incoming_row();
        if let Some(def) = instr.dst() {
            if let Some(&bit) = self.indices.get(&def) {
                ctx.instrs_mask_sets.set(row, bit.index(), false);
            }
        }
        for used in instr.uses() {
            if let cc_tac_ir::Value::Variable(name) = used {
                if let Some(&bit) = self.indices.get(name) {
                    ctx.instrs_mask_sets.set(row, bit.index(), true);
                }
            }
        }
        match instr {
            Instruction::FunCall { .. } => {
                // A call may read any escaped variable through a pointer it
                // was handed, whether that variable is file-scope static or
                // merely address-taken — both sets must survive the call.
                let static_bits = ctx.instrs_mask_sets.row(ctx.static_row()).to_vec();
                ctx.instrs_mask_sets.union_row_from(row, &static_bits);
                let addressed_bits = ctx.instrs_mask_sets.row(ctx.addressed_row()).to_vec();
                ctx.instrs_mask_sets.union_row_from(row, &addressed_bits);
            }
            Instruction::Load { .. } => {
                let addressed_bits = ctx.instrs_mask_sets.row(ctx.addressed_row()).to_vec();
                ctx.instrs_mask_sets.union_row_from(row, &addressed_bits);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_data::CConst;
    use cc_ident::IdentContext;
    use cc_tac_ir::Value;

    #[test]
    fn a_store_to_an_addressed_local_survives_a_call_that_could_read_it_through_its_pointer() {
        // `int x; int *p = &x; x = 42; use(p);` — `x` is never named again
        // after the store, but `use` can read it through `p`.
        let mut idents = IdentContext::new();
        let x = idents.intern("x");
        let p = idents.intern("p");
        let use_fn = idents.intern("use");
        let instrs = vec![
            Instruction::GetAddress { src: x, dst: p },
            Instruction::Copy { src: Value::Constant(CConst::Int(42)), dst: x },
            Instruction::FunCall { name: use_fn, args: vec![Value::Variable(p)], dst: None },
            Instruction::Return(Value::Constant(CConst::Int(0))),
        ];
        let mut cfg = Cfg::build(instrs);
        let mut frontend = FrontendContext::new();
        frontend.mark_addressed(x);

        let changed = eliminate_dead_stores(&mut cfg, &frontend);
        assert!(!changed, "the store to `x` is live at the call through `p` and must not be eliminated");
        let out = cfg.into_instructions();
        assert!(
            out.iter().any(|i| matches!(i, Instruction::Copy { dst, .. } if *dst == x)),
            "store to `x` must survive: {out:?}"
        );
    }
}
