//! Per-function control-flow graph construction and edge/instruction
//! mutation, grounded on the teacher's `build::CFG` / `transform::util`
//! block bookkeeping: blocks are spans into the function's flat
//! instruction vector, not an owned copy of the instructions.

use cc_ident::Ident;
use cc_index::{newtype_index, IndexVec};
use cc_tac_ir::Instruction;
use rustc_hash::FxHashMap;

newtype_index! {
    pub struct BlockId;
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub size: usize,
    pub instrs_front_idx: Option<usize>,
    pub instrs_back_idx: Option<usize>,
    pub pred_ids: Vec<BlockId>,
    pub succ_ids: Vec<BlockId>,
}

/// A function's control-flow graph. `instrs` is the flat, mutable
/// instruction vector the blocks index into; optimizer passes null out
/// slots in place rather than shrinking the vector (compaction is a
/// downstream concern).
pub struct Cfg {
    pub instrs: Vec<Option<Instruction>>,
    pub blocks: IndexVec<BlockId, BasicBlock>,
    /// Reused across two phases, in order: label name → block id during
    /// construction, then (after `cc_dataflow` repopulates it) name → bit
    /// index during analysis. See the teacher's `identifier_id_map` note.
    pub identifier_id_map: FxHashMap<Ident, BlockId>,
    pub entry_id: BlockId,
    pub exit_id: BlockId,
    pub fixed_point: bool,
    /// The synthetic entry block only ever has one successor (block 0) and
    /// no predecessors; the synthetic exit block only ever has
    /// predecessors. Neither carries instructions, so they live in these
    /// side slots rather than as placeholder rows in `blocks`.
    entry_succ: Vec<BlockId>,
    exit_pred: Vec<BlockId>,
}

impl Cfg {
    pub fn build(instrs: Vec<Instruction>) -> Cfg {
        let mut blocks: IndexVec<BlockId, BasicBlock> = IndexVec::new();
        let mut identifier_id_map = FxHashMap::default();
        let mut cur_start: Option<usize> = None;
        let mut cur_len = 0usize;

        let flush = |blocks: &mut IndexVec<BlockId, BasicBlock>, start: &mut Option<usize>, len: &mut usize| {
            if let Some(s) = *start {
                if *len > 0 {
                    blocks.push(BasicBlock {
                        size: *len,
                        instrs_front_idx: Some(s),
                        instrs_back_idx: Some(s + *len - 1),
                        pred_ids: Vec::new(),
                        succ_ids: Vec::new(),
                    });
                }
            }
            *start = None;
            *len = 0;
        };

        for (idx, instr) in instrs.iter().enumerate() {
            if let Instruction::Label(name) = instr {
                flush(&mut blocks, &mut cur_start, &mut cur_len);
                cur_start = Some(idx);
                cur_len = 1;
                identifier_id_map.insert(*name, BlockId::new(blocks.len()));
                continue;
            }
            if cur_start.is_none() {
                cur_start = Some(idx);
                cur_len = 0;
            }
            cur_len += 1;
            if instr.is_control_flow() {
                flush(&mut blocks, &mut cur_start, &mut cur_len);
            }
        }
        flush(&mut blocks, &mut cur_start, &mut cur_len);

        let num_blocks = blocks.len();
        let exit_id = BlockId::new(num_blocks);
        let entry_id = BlockId::new(num_blocks + 1);

        let mut cfg = Cfg {
            instrs: instrs.into_iter().map(Some).collect(),
            blocks,
            identifier_id_map,
            entry_id,
            exit_id,
            fixed_point: true,
            entry_succ: Vec::new(),
            exit_pred: Vec::new(),
        };
        cfg.link_edges();
        tracing::debug!(blocks = cfg.blocks.len(), "built control-flow graph");
        cfg
    }

    fn last_instr_of(&self, block: BlockId) -> Option<&Instruction> {
        let b = &self.blocks[block];
        let back = b.instrs_back_idx?;
        self.instrs[back].as_ref()
    }

    fn link_edges(&mut self) {
        let num_blocks = self.blocks.len();
        for i in 0..num_blocks {
            let block_id = BlockId::new(i);
            let fallthrough = if i + 1 < num_blocks { BlockId::new(i + 1) } else { self.exit_id };
            let succs: Vec<BlockId> = match self.last_instr_of(block_id) {
                Some(Instruction::Return(_)) => vec![self.exit_id],
                Some(Instruction::Jump(target)) => {
                    vec![*self.identifier_id_map.get(target).expect("jump target label must exist")]
                }
                Some(Instruction::JumpIfZero { target, .. })
                | Some(Instruction::JumpIfNotZero { target, .. }) => {
                    let t = *self.identifier_id_map.get(target).expect("jump target label must exist");
                    vec![t, fallthrough]
                }
                _ => vec![fallthrough],
            };
            for s in succs {
                self.add_edge(block_id, s);
            }
        }
        if num_blocks > 0 {
            self.add_edge(self.entry_id, BlockId::new(0));
        } else {
            self.add_edge(self.entry_id, self.exit_id);
        }
    }

    pub fn add_edge(&mut self, pred: BlockId, succ: BlockId) {
        if !self.block_succ(pred).contains(&succ) {
            self.block_succ_mut(pred).push(succ);
        }
        if !self.block_pred(succ).contains(&pred) {
            self.block_pred_mut(succ).push(pred);
        }
    }

    fn block_succ(&self, id: BlockId) -> &Vec<BlockId> {
        if id == self.entry_id {
            &self.entry_succ
        } else if id == self.exit_id {
            // the exit block has no successors of its own
            static EMPTY: Vec<BlockId> = Vec::new();
            &EMPTY
        } else {
            &self.blocks[id].succ_ids
        }
    }

    fn block_pred(&self, id: BlockId) -> &Vec<BlockId> {
        if id == self.exit_id {
            &self.exit_pred
        } else if id == self.entry_id {
            static EMPTY: Vec<BlockId> = Vec::new();
            &EMPTY
        } else {
            &self.blocks[id].pred_ids
        }
    }

    fn block_succ_mut(&mut self, id: BlockId) -> &mut Vec<BlockId> {
        if id == self.entry_id {
            &mut self.entry_succ
        } else if id == self.exit_id {
            unreachable!("the exit block never has outgoing edges")
        } else {
            &mut self.blocks[id].succ_ids
        }
    }

    fn block_pred_mut(&mut self, id: BlockId) -> &mut Vec<BlockId> {
        if id == self.exit_id {
            &mut self.exit_pred
        } else if id == self.entry_id {
            unreachable!("the entry block never has incoming edges")
        } else {
            &mut self.blocks[id].pred_ids
        }
    }

    /// Deduplicating edge removal via swap-pop (teacher's `remove_edge`).
    /// The succ-side removal is skipped when `succ` is already unreachable
    /// from the entry, to avoid double-removing it from that block's
    /// predecessor list during `remove_empty_block`'s own cleanup.
    pub fn remove_edge(&mut self, pred: BlockId, succ: BlockId) {
        swap_remove_value(self.block_succ_mut(pred), succ);
        swap_remove_value(self.block_pred_mut(succ), pred);
    }

    /// Bit at `block_id`'s current size: nulls instruction slot `idx`,
    /// decrementing the owning block's size; removes the block entirely
    /// once it reaches zero. Marks `fixed_point = false`.
    pub fn remove_instr(&mut self, block: BlockId, idx: usize) {
        if self.instrs[idx].take().is_some() {
            self.fixed_point = false;
            let b = &mut self.blocks[block];
            b.size -= 1;
            if b.size == 0 {
                self.remove_empty_block(block);
                return;
            }
            if b.instrs_front_idx == Some(idx) {
                b.instrs_front_idx = (idx + 1..=b.instrs_back_idx.unwrap()).find(|&i| self.instrs[i].is_some());
            } else if b.instrs_back_idx == Some(idx) {
                let front = b.instrs_front_idx.unwrap();
                b.instrs_back_idx = (front..idx).rev().find(|&i| self.instrs[i].is_some());
            }
        }
    }

    fn remove_empty_block(&mut self, block: BlockId) {
        let preds = self.blocks[block].pred_ids.clone();
        let succs = self.blocks[block].succ_ids.clone();
        let reachable = self.is_reachable(block);
        for p in &preds {
            self.remove_edge(*p, block);
        }
        for s in &succs {
            // avoid double removal for a block already unreachable from entry
            if reachable {
                self.remove_edge(block, *s);
            } else {
                swap_remove_value(self.block_pred_mut(*s), block);
            }
        }
        if reachable {
            for p in &preds {
                for s in &succs {
                    self.add_edge(*p, *s);
                }
            }
        }
        self.fixed_point = false;
    }

    fn is_reachable(&self, block: BlockId) -> bool {
        let mut seen = vec![false; self.blocks.len()];
        let mut stack = vec![BlockId::new(0)];
        while let Some(b) = stack.pop() {
            if b.index() >= seen.len() || seen[b.index()] {
                continue;
            }
            seen[b.index()] = true;
            if b == block {
                return true;
            }
            for &s in &self.blocks[b].succ_ids {
                if s != self.exit_id {
                    stack.push(s);
                }
            }
        }
        false
    }

    pub fn reachable_from_entry(&self) -> Vec<bool> {
        let mut seen = vec![false; self.blocks.len()];
        if self.blocks.is_empty() {
            return seen;
        }
        let mut stack = vec![BlockId::new(0)];
        while let Some(b) = stack.pop() {
            if b.index() >= seen.len() || seen[b.index()] {
                continue;
            }
            seen[b.index()] = true;
            for &s in &self.blocks[b].succ_ids {
                if s != self.exit_id {
                    stack.push(s);
                }
            }
        }
        seen
    }

    pub fn block_instrs(&self, block: BlockId) -> Vec<usize> {
        let b = &self.blocks[block];
        match (b.instrs_front_idx, b.instrs_back_idx) {
            (Some(f), Some(l)) => (f..=l).filter(|&i| self.instrs[i].is_some()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut post = Vec::with_capacity(self.blocks.len());
        if !self.blocks.is_empty() {
            self.dfs_postorder(BlockId::new(0), &mut visited, &mut post);
        }
        post.reverse();
        post
    }

    pub fn postorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut post = Vec::with_capacity(self.blocks.len());
        if !self.blocks.is_empty() {
            self.dfs_postorder(BlockId::new(0), &mut visited, &mut post);
        }
        post
    }

    fn dfs_postorder(&self, b: BlockId, visited: &mut Vec<bool>, post: &mut Vec<BlockId>) {
        if b.index() >= visited.len() || visited[b.index()] {
            return;
        }
        visited[b.index()] = true;
        for &s in &self.blocks[b].succ_ids {
            if s != self.exit_id {
                self.dfs_postorder(s, visited, post);
            }
        }
        post.push(b);
    }

    /// Rebuilds the flat instruction vector, compacting out `None` slots.
    /// Intended for the final handoff to the backend, not used mid-pass.
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instrs.into_iter().flatten().collect()
    }
}

fn swap_remove_value(v: &mut Vec<BlockId>, target: BlockId) {
    if let Some(pos) = v.iter().position(|&x| x == target) {
        v.swap_remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::BinaryOp;
    use cc_data::CConst;
    use cc_ident::IdentContext;
    use cc_tac_ir::Value;

    fn build_simple(ctx: &mut IdentContext) -> Cfg {
        let x = ctx.intern("x");
        let t0 = ctx.intern("t0");
        let instrs = vec![
            Instruction::Binary {
                op: BinaryOp::Add,
                src1: Value::Variable(x),
                src2: Value::Constant(CConst::Int(1)),
                dst: t0,
            },
            Instruction::Return(Value::Variable(t0)),
        ];
        Cfg::build(instrs)
    }

    #[test]
    fn single_block_function_links_to_exit() {
        let mut ctx = IdentContext::new();
        let cfg = build_simple(&mut ctx);
        assert_eq!(cfg.blocks.len(), 1);
        assert_eq!(cfg.blocks[BlockId::new(0)].succ_ids, vec![cfg.exit_id]);
    }

    #[test]
    fn label_starts_a_new_block() {
        let mut ctx = IdentContext::new();
        let l = ctx.fresh_label("L");
        let x = ctx.intern("x");
        let instrs = vec![
            Instruction::Jump(l),
            Instruction::Label(l),
            Instruction::Return(Value::Variable(x)),
        ];
        let cfg = Cfg::build(instrs);
        assert_eq!(cfg.blocks.len(), 2);
        assert_eq!(cfg.blocks[BlockId::new(0)].succ_ids, vec![BlockId::new(1)]);
    }

    #[test]
    fn conditional_jump_has_two_successors() {
        let mut ctx = IdentContext::new();
        let l = ctx.fresh_label("L");
        let x = ctx.intern("x");
        let instrs = vec![
            Instruction::JumpIfZero { cond: Value::Variable(x), target: l },
            Instruction::Return(Value::Variable(x)),
            Instruction::Label(l),
            Instruction::Return(Value::Variable(x)),
        ];
        let cfg = Cfg::build(instrs);
        assert_eq!(cfg.blocks[BlockId::new(0)].succ_ids.len(), 2);
    }
}
