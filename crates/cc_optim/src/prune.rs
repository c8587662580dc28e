//! Unreachable code elimination (spec §4.5): blocks not reachable from the
//! entry are nulled out and their edges stripped; then, across the
//! remaining reachable blocks in their original textual order, a trailing
//! jump to the immediately following block (now a pure fallthrough) and a
//! leading label nobody still jumps to are both redundant and removed.

use cc_cfg::{BlockId, Cfg};
use cc_tac_ir::Instruction;

pub fn prune_unreachable(cfg: &mut Cfg) -> bool {
    let reachable = cfg.reachable_from_entry();
    let mut changed = false;

    for i in 0..cfg.blocks.len() {
        if reachable[i] {
            continue;
        }
        let id = BlockId::new(i);
        for idx in cfg.block_instrs(id) {
            if cfg.instrs[idx].take().is_some() {
                changed = true;
            }
        }
        let succs = cfg.blocks[id].succ_ids.clone();
        let preds = cfg.blocks[id].pred_ids.clone();
        for s in succs {
            cfg.remove_edge(id, s);
        }
        for p in preds {
            cfg.remove_edge(p, id);
        }
        // A label that started a now-deleted block must miss cleanly if
        // anything still names it (spec: "remapped to the exit-id sentinel").
        cfg.identifier_id_map.retain(|_, block| *block != id);
        cfg.blocks[id].size = 0;
        cfg.blocks[id].instrs_front_idx = None;
        cfg.blocks[id].instrs_back_idx = None;
        changed = true;
    }

    // Decide which trailing jumps and leading labels qualify from the
    // pristine, pre-mutation adjacency: removing one pair's jump can
    // collapse its block and rewrite a later block's `pred_ids`, so every
    // structural decision is made up front against the original snapshot.
    let reachable_ids: Vec<BlockId> =
        (0..cfg.blocks.len()).filter(|&i| reachable[i]).map(BlockId::new).collect();
    let mut jump_removals = Vec::new();
    let mut label_candidates = Vec::new();
    for pair in reachable_ids.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if cfg.blocks[a].succ_ids == [b] {
            if let Some(back) = cfg.blocks[a].instrs_back_idx {
                if matches!(cfg.instrs[back], Some(Instruction::Jump(_))) {
                    jump_removals.push((a, back));
                }
            }
        }
        if cfg.blocks[b].pred_ids == [a] {
            if let Some(front) = cfg.blocks[b].instrs_front_idx {
                if let Some(Instruction::Label(name)) = cfg.instrs[front] {
                    label_candidates.push((b, front, name));
                }
            }
        }
    }

    for (a, idx) in jump_removals {
        cfg.remove_instr(a, idx);
        changed = true;
    }
    for (b, idx, name) in label_candidates {
        let still_targeted = cfg.instrs.iter().flatten().any(|i| i.jump_targets().contains(&name));
        if !still_targeted && cfg.instrs[idx].is_some() {
            cfg.remove_instr(b, idx);
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_data::CConst;
    use cc_ident::IdentContext;
    use cc_tac_ir::Value;

    #[test]
    fn instructions_after_an_unconditional_return_are_nulled_out() {
        let mut idents = IdentContext::new();
        let unreachable_label = idents.fresh_label("dead");
        let instrs = vec![
            Instruction::Return(Value::Constant(CConst::Int(1))),
            Instruction::Label(unreachable_label),
            Instruction::Return(Value::Constant(CConst::Int(2))),
        ];
        let mut cfg = Cfg::build(instrs);
        assert!(prune_unreachable(&mut cfg));
        let out = cfg.into_instructions();
        assert_eq!(out, vec![Instruction::Return(Value::Constant(CConst::Int(1)))]);
    }

    #[test]
    fn a_fallthrough_only_jump_and_its_landing_label_are_both_removed() {
        let mut idents = IdentContext::new();
        let l = idents.fresh_label("L");
        let x = idents.intern("x");
        let instrs = vec![
            Instruction::Jump(l),
            Instruction::Label(l),
            Instruction::Return(Value::Variable(x)),
        ];
        let mut cfg = Cfg::build(instrs);
        assert!(prune_unreachable(&mut cfg));
        let out = cfg.into_instructions();
        assert_eq!(out, vec![Instruction::Return(Value::Variable(x))]);
    }

    #[test]
    fn a_label_still_targeted_by_a_loop_back_edge_survives() {
        let mut idents = IdentContext::new();
        let top = idents.fresh_label("top");
        let x = idents.intern("x");
        let instrs = vec![
            Instruction::Label(top),
            Instruction::JumpIfZero { cond: Value::Variable(x), target: top },
            Instruction::Return(Value::Variable(x)),
        ];
        let mut cfg = Cfg::build(instrs);
        prune_unreachable(&mut cfg);
        let out = cfg.into_instructions();
        assert!(out.iter().any(|i| matches!(i, Instruction::Label(_))), "still-targeted label must survive");
    }
}
