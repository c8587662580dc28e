//! Generic worklist dataflow engine over flat bitsets, grounded on the
//! teacher's `BitDenotation`/`DataflowAnalysis` split in
//! `librustc_mir::dataflow`: callers supply the transfer function and
//! direction, the engine owns the worklist and the mask storage.

use cc_cfg::{BlockId, Cfg};
use cc_ident::Ident;
use cc_index::MaskSet;
use cc_tac_ir::Instruction;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Owns both mask arrays for one analysis run: `instrs_mask_sets` (one row
/// per live instruction slot, plus three reserved trailing rows) and
/// `blocks_mask_sets` (one row per block, holding the converged boundary
/// fact — OUT for a forward analysis, IN for a backward one).
pub struct DataflowContext {
    pub set_size: usize,
    pub mask_size: usize,
    pub instrs_mask_sets: MaskSet,
    pub blocks_mask_sets: MaskSet,
    num_instrs: usize,
}

impl DataflowContext {
    /// Scratch row the transfer function rewrites in place while walking a
    /// block's instructions.
    pub fn incoming_row(&self) -> usize {
        self.num_instrs
    }

    /// Bits for statically-attributed names and the implicit return
    /// registers; stays live at function exit.
    pub fn static_row(&self) -> usize {
        self.num_instrs + 1
    }

    /// Bits for every name whose address has been taken.
    pub fn addressed_row(&self) -> usize {
        self.num_instrs + 2
    }
}

/// One dataflow analysis: a fixed fact universe, a direction, and a
/// transfer function applied instruction-by-instruction.
pub trait Analysis {
    fn set_size(&self) -> usize;
    fn direction(&self) -> Direction;

    /// Populates the reserved `static`/`addressed` rows before the
    /// worklist runs. Most analyses only need one of the two.
    fn seed(&self, ctx: &mut DataflowContext);

    /// Rewrites `ctx`'s incoming row in place to reflect this
    /// instruction's effect on the tracked facts.
    fn transfer(&self, instr: &Instruction, ctx: &mut DataflowContext);
}

/// Runs `analysis` to a fixed point over `cfg` and returns the converged
/// mask storage. Per-instruction facts in `instrs_mask_sets` are indexed
/// the same way as `cfg.instrs`: `ctx.instrs_mask_sets.row(idx)` is the
/// fact true entering instruction `idx` in iteration order (the IN set for
/// a forward analysis, the OUT set for a backward one — exactly what each
/// rewrite pass in §4.5 consults).
pub fn run<A: Analysis>(cfg: &Cfg, analysis: &A) -> DataflowContext {
    let set_size = analysis.set_size().max(1);
    let mask_size = (set_size + 63) / 64;
    let num_instrs = cfg.instrs.len();
    let num_blocks = cfg.blocks.len();
    let forward = analysis.direction() == Direction::Forward;

    let mut ctx = DataflowContext {
        set_size,
        mask_size,
        instrs_mask_sets: MaskSet::new(num_instrs + 3, set_size, false),
        blocks_mask_sets: MaskSet::new(num_blocks.max(1), set_size, forward),
        num_instrs,
    };
    analysis.seed(&mut ctx);

    // The entry predecessor (forward) contributes the empty set, killing
    // everything on intersection. The exit successor (backward)
    // contributes the static mask, keeping statics/return registers live.
    let boundary: Vec<u64> = if forward {
        vec![0u64; mask_size]
    } else {
        ctx.instrs_mask_sets.row(ctx.static_row()).to_vec()
    };

    let order: Vec<BlockId> = if forward { cfg.reverse_postorder() } else { cfg.postorder() };
    let mut queue: VecDeque<BlockId> = order.into_iter().collect();
    let mut queued = vec![true; num_blocks];
    let mut incoming = vec![0u64; mask_size];

    while let Some(block) = queue.pop_front() {
        queued[block.index()] = false;

        for w in incoming.iter_mut() {
            *w = if forward { !0u64 } else { 0u64 };
        }
        let neighbors: &[BlockId] = if forward { &cfg.blocks[block].pred_ids } else { &cfg.blocks[block].succ_ids };
        if neighbors.is_empty() {
            incoming.copy_from_slice(&boundary);
        }
        for &n in neighbors {
            let is_virtual_edge = if forward { n == cfg.entry_id } else { n == cfg.exit_id };
            let contribution: &[u64] =
                if is_virtual_edge { &boundary } else { ctx.blocks_mask_sets.row(n.index()) };
            if forward {
                for (d, s) in incoming.iter_mut().zip(contribution) {
                    *d &= *s;
                }
            } else {
                for (d, s) in incoming.iter_mut().zip(contribution) {
                    *d |= *s;
                }
            }
        }
        ctx.instrs_mask_sets.copy_row_from(ctx.incoming_row(), &incoming);

        let mut ids = cfg.block_instrs(block);
        if !forward {
            ids.reverse();
        }
        for idx in ids {
            let pre_state = ctx.instrs_mask_sets.row(ctx.incoming_row()).to_vec();
            ctx.instrs_mask_sets.copy_row_from(idx, &pre_state);
            if let Some(instr) = &cfg.instrs[idx] {
                analysis.transfer(instr, &mut ctx);
            }
        }
        let final_state = ctx.instrs_mask_sets.row(ctx.incoming_row()).to_vec();

        let changed = ctx.blocks_mask_sets.row(block.index()) != final_state.as_slice();
        if changed {
            ctx.blocks_mask_sets.copy_row_from(block.index(), &final_state);
            let succs: &[BlockId] = if forward { &cfg.blocks[block].succ_ids } else { &cfg.blocks[block].pred_ids };
            for &s in succs {
                if s == cfg.entry_id || s == cfg.exit_id {
                    continue;
                }
                if !queued[s.index()] {
                    queued[s.index()] = true;
                    queue.push_back(s);
                }
            }
        }
    }

    ctx
}

/// Repopulates `cfg.identifier_id_map` as a name→bit-index map for the
/// given fact universe, overwriting the label→block-id map construction
/// left behind (the teacher's dual-use index map, preserved per the
/// known-ambiguity note on rewrite order). Returns the resulting
/// `set_size`. Bit indices are stashed in a `BlockId` purely for the
/// allocation reuse; callers must go through `.index()`, never treat the
/// result as a real block.
pub fn assign_fact_indices(cfg: &mut Cfg, names: impl IntoIterator<Item = Ident>) -> usize {
    cfg.identifier_id_map.clear();
    let mut next = 0usize;
    for name in names {
        if !cfg.identifier_id_map.contains_key(&name) {
            cfg.identifier_id_map.insert(name, BlockId::new(next));
            next += 1;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::BinaryOp;
    use cc_data::CConst;
    use cc_ident::IdentContext;
    use cc_tac_ir::Value;

    /// A trivial "reaching copy" analysis with one tracked fact: whether
    /// `t1` still holds a fresh, unkilled copy of `x`.
    struct CopyOfX {
        x: Ident,
        t1: Ident,
    }

    impl Analysis for CopyOfX {
        fn set_size(&self) -> usize {
            1
        }
        fn direction(&self) -> Direction {
            Direction::Forward
        }
        fn seed(&self, _ctx: &mut DataflowContext) {}
        fn transfer(&self, instr: &Instruction, ctx: &mut DataflowContext) {
            let row = ctx.incoming_row();
            match instr {
                Instruction::Copy { src: Value::Variable(s), dst } if *s == self.x && *dst == self.t1 => {
                    ctx.instrs_mask_sets.set(row, 0, true);
                }
                Instruction::Binary { dst, .. } if *dst == self.x => {
                    ctx.instrs_mask_sets.set(row, 0, false);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn forward_fact_reaches_the_return() {
        let mut ctx = IdentContext::new();
        let x = ctx.intern("x");
        let t1 = ctx.fresh_var("t");
        let instrs = vec![
            Instruction::Copy { src: Value::Variable(x), dst: t1 },
            Instruction::Return(Value::Variable(t1)),
        ];
        let cfg = Cfg::build(instrs);
        let analysis = CopyOfX { x, t1 };
        let result = run(&cfg, &analysis);
        assert!(result.instrs_mask_sets.get(1, 0));
    }

    #[test]
    fn kill_on_redefinition_clears_the_fact() {
        let mut ctx = IdentContext::new();
        let x = ctx.intern("x");
        let t1 = ctx.fresh_var("t");
        let instrs = vec![
            Instruction::Copy { src: Value::Variable(x), dst: t1 },
            Instruction::Binary {
                op: BinaryOp::Add,
                src1: Value::Variable(x),
                src2: Value::Constant(CConst::Int(1)),
                dst: x,
            },
            Instruction::Return(Value::Variable(t1)),
        ];
        let cfg = Cfg::build(instrs);
        let analysis = CopyOfX { x, t1 };
        let result = run(&cfg, &analysis);
        assert!(!result.instrs_mask_sets.get(2, 0));
    }

    #[test]
    fn assign_fact_indices_deduplicates_names() {
        let mut ctx = IdentContext::new();
        let x = ctx.intern("x");
        let y = ctx.intern("y");
        let mut cfg = Cfg::build(vec![Instruction::Return(Value::Variable(x))]);
        let n = assign_fact_indices(&mut cfg, [x, y, x]);
        assert_eq!(n, 2);
        assert_ne!(cfg.identifier_id_map[&x], cfg.identifier_id_map[&y]);
    }
}
