use fixedbitset::FixedBitSet;
use id_arena::Arena;

use crate::block::{BasicBlock, BlockId};
use crate::inst::{
    ConstValue, DynAux, Inst, InstData, InstId, Input, Operands, User, INVALID_REG,
};
use crate::marker::InstMarker;
use crate::opcode::Opcode;
use crate::ty::Type;

/// The instruction graph of one compilation unit. Owns the arenas for
/// instructions and basic blocks; all def-use edits go through this type so
/// the paired input/user links stay consistent.
pub struct Graph {
    insts: Arena<Inst>,
    blocks: Arena<BasicBlock>,
    entry: Option<BlockId>,
    next_inst_id: u32,
    next_block_id: u32,
    dynamic_method: bool,
    #[cfg(debug_assertions)]
    acc_alloc_applied: bool,
}

impl Graph {
    pub fn new() -> Graph {
        Graph {
            insts: Arena::new(),
            blocks: Arena::new(),
            entry: None,
            next_inst_id: 0,
            next_block_id: 0,
            dynamic_method: false,
            #[cfg(debug_assertions)]
            acc_alloc_applied: false,
        }
    }

    pub fn is_dynamic_method(&self) -> bool {
        self.dynamic_method
    }

    pub fn set_dynamic_method(&mut self, value: bool) {
        self.dynamic_method = value;
    }

    /// The first created block becomes the entry unless overridden.
    pub fn entry_block(&self) -> Option<BlockId> {
        self.entry
    }

    pub fn set_entry_block(&mut self, block: BlockId) {
        self.entry = Some(block);
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;
        let block = self.blocks.alloc(BasicBlock::new(id));

        if self.entry.is_none() {
            self.entry = Some(block);
        }

        block
    }

    pub fn add_edge(&mut self, pred: BlockId, succ: BlockId) {
        self.blocks[pred].succs.push(succ);
        self.blocks[succ].preds.push(pred);
    }

    pub fn create_inst(&mut self, opcode: Opcode, ty: Type) -> InstId {
        let id = self.next_inst_id;
        self.next_inst_id += 1;
        self.insts.alloc(Inst::new(id, opcode, ty))
    }

    pub fn create_const(&mut self, ty: Type, value: ConstValue) -> InstId {
        let inst = self.create_inst(Opcode::Constant, ty);
        self.insts[inst].data = InstData::Constant(value);
        inst
    }

    pub fn inst(&self, inst: InstId) -> &Inst {
        &self.insts[inst]
    }

    pub fn inst_mut(&mut self, inst: InstId) -> &mut Inst {
        &mut self.insts[inst]
    }

    pub fn block(&self, block: BlockId) -> &BasicBlock {
        &self.blocks[block]
    }

    pub fn block_mut(&mut self, block: BlockId) -> &mut BasicBlock {
        &mut self.blocks[block]
    }

    pub fn inst_count(&self) -> usize {
        self.insts.len()
    }

    pub fn inst_ids(&self) -> Vec<InstId> {
        self.insts.iter().map(|(id, _)| id).collect()
    }

    /// Appends a non-phi instruction at the end of `block`.
    pub fn append_inst(&mut self, block: BlockId, inst: InstId) {
        assert!(!self.insts[inst].is_phi() && !self.insts[inst].is_catch_phi());
        assert!(self.insts[inst].block.is_none());

        let pos = self.blocks[block].insts.len() as u32;
        self.blocks[block].insts.push(inst);
        self.insts[inst].block = Some(block);
        self.insts[inst].pos = pos;
    }

    /// Appends a phi to the phi sub-sequence of `block`.
    pub fn append_phi(&mut self, block: BlockId, inst: InstId) {
        assert!(self.insts[inst].is_phi() || self.insts[inst].is_catch_phi());
        assert!(self.insts[inst].block.is_none());

        let pos = self.blocks[block].phis.len() as u32;
        self.blocks[block].phis.push(inst);
        self.insts[inst].block = Some(block);
        self.insts[inst].pos = pos;
    }

    /// Replaces the input slot of `consumer`. Detaches the old producer's
    /// reverse link if present; `None` leaves the slot unattached.
    pub fn set_input(&mut self, consumer: InstId, index: usize, producer: Option<InstId>) {
        if let Some(old) = self.insts[consumer].operands.get(index) {
            self.remove_user(old.inst, old.user_pos as usize);
        }

        match producer {
            Some(producer) => {
                let user_pos = self.insts[producer].users.len() as u32;
                self.insts[producer].users.push(User {
                    inst: consumer,
                    index: index as u32,
                });
                self.insts[consumer].operands.set(
                    index,
                    Some(Input {
                        inst: producer,
                        user_pos,
                    }),
                );
            }

            None => {
                self.insts[consumer].operands.set(index, None);
            }
        }
    }

    /// Removes the user entry at `pos` by swap-with-last and repairs the
    /// displaced entry's paired input back-pointer.
    fn remove_user(&mut self, producer: InstId, pos: usize) {
        self.insts[producer].users.swap_remove(pos);

        if pos < self.insts[producer].users.len() {
            let moved = self.insts[producer].users[pos];
            let slot = self.insts[moved.inst]
                .operands
                .get(moved.index as usize)
                .expect("moved user entry points at an unattached slot");
            debug_assert_eq!(slot.inst, producer);
            self.insts[moved.inst].operands.set(
                moved.index as usize,
                Some(Input {
                    inst: producer,
                    user_pos: pos as u32,
                }),
            );
        }
    }

    /// Adds a new positional slot to a dynamic-arity instruction.
    pub fn append_input(&mut self, consumer: InstId, producer: InstId) -> usize {
        let index = match &mut self.insts[consumer].operands {
            Operands::Dynamic {
                inputs,
                src_regs,
                aux,
            } => {
                inputs.push(None);
                src_regs.push(INVALID_REG);
                match aux {
                    DynAux::None => {}
                    DynAux::Vregs(vregs) => vregs.push(0),
                    DynAux::Preds(_) => panic!("phi inputs carry a predecessor block"),
                }
                inputs.len() - 1
            }

            Operands::Fixed { .. } => {
                panic!("the input count of a fixed-arity instruction never changes")
            }
        };

        self.set_input(consumer, index, Some(producer));
        index
    }

    /// Adds a phi input together with the predecessor block it flows in from.
    pub fn append_phi_input(&mut self, phi: InstId, producer: InstId, pred: BlockId) -> usize {
        let index = match &mut self.insts[phi].operands {
            Operands::Dynamic {
                inputs,
                src_regs,
                aux: DynAux::Preds(preds),
            } => {
                inputs.push(None);
                src_regs.push(INVALID_REG);
                preds.push(pred);
                inputs.len() - 1
            }

            _ => panic!("not a phi instruction"),
        };

        self.set_input(phi, index, Some(producer));
        index
    }

    /// Adds a SaveState input together with the captured virtual register.
    pub fn append_save_state_input(
        &mut self,
        inst: InstId,
        producer: InstId,
        vreg: u16,
    ) -> usize {
        assert!(self.insts[inst].is_save_state());
        let index = self.append_input(inst, producer);

        match &mut self.insts[inst].operands {
            Operands::Dynamic {
                aux: DynAux::Vregs(vregs),
                ..
            } => vregs[index] = vreg,
            _ => unreachable!(),
        }

        index
    }

    /// Detaches slot `index` of a dynamic-arity instruction in O(1): the
    /// last slot (input, source register, aux metadata) moves into the hole
    /// and the moved producer's reverse link is repaired.
    pub fn remove_input(&mut self, consumer: InstId, index: usize) {
        self.set_input(consumer, index, None);

        let last = self.insts[consumer].inputs_count() - 1;

        if index != last {
            let moved = match &mut self.insts[consumer].operands {
                Operands::Dynamic {
                    inputs,
                    src_regs,
                    aux,
                } => {
                    inputs[index] = inputs[last];
                    src_regs[index] = src_regs[last];
                    match aux {
                        DynAux::None => {}
                        DynAux::Vregs(vregs) => vregs[index] = vregs[last],
                        DynAux::Preds(preds) => preds[index] = preds[last],
                    }
                    inputs[index]
                }

                Operands::Fixed { .. } => {
                    panic!("remove_input on a fixed-arity instruction")
                }
            };

            if let Some(moved) = moved {
                self.insts[moved.inst].users[moved.user_pos as usize].index = index as u32;
            }
        }

        match &mut self.insts[consumer].operands {
            Operands::Dynamic {
                inputs,
                src_regs,
                aux,
            } => {
                inputs.pop();
                src_regs.pop();
                match aux {
                    DynAux::None => {}
                    DynAux::Vregs(vregs) => {
                        vregs.pop();
                    }
                    DynAux::Preds(preds) => {
                        preds.pop();
                    }
                }
            }

            Operands::Fixed { .. } => unreachable!(),
        }
    }

    /// Swaps the two inputs of a binary instruction, updating both
    /// producers' reverse links.
    pub fn swap_inputs(&mut self, inst: InstId) {
        assert_eq!(self.insts[inst].inputs_count(), 2);
        let input0 = self.insts[inst].input(0);
        let input1 = self.insts[inst].input(1);
        self.set_input(inst, 0, Some(input1));
        self.set_input(inst, 1, Some(input0));
    }

    /// Detaches all inputs and removes the instruction from its block.
    /// The instruction must not have remaining users.
    pub fn remove_inst(&mut self, inst: InstId) {
        assert!(
            !self.insts[inst].has_users(),
            "removing an instruction that still has users"
        );

        for index in 0..self.insts[inst].inputs_count() {
            self.set_input(inst, index, None);
        }

        if let Some(block) = self.insts[inst].block {
            let pos = self.insts[inst].pos as usize;
            let in_phi_list = self.insts[inst].is_phi() || self.insts[inst].is_catch_phi();

            let tail: Vec<InstId> = {
                let list = if in_phi_list {
                    &mut self.blocks[block].phis
                } else {
                    &mut self.blocks[block].insts
                };
                list.remove(pos);
                list[pos..].to_vec()
            };

            for id in tail {
                self.insts[id].pos -= 1;
            }

            self.insts[inst].block = None;
        }
    }

    /// Deep-copies the scalar fields of an instruction. The clone shares no
    /// operand state with the original and is not attached to a block.
    pub fn clone_inst(&mut self, inst: InstId) -> InstId {
        let (opcode, ty, flags, pc, data, dst_reg) = {
            let inst = &self.insts[inst];
            (inst.opcode, inst.ty, inst.flags, inst.pc, inst.data, inst.dst_reg)
        };

        let id = self.next_inst_id;
        self.next_inst_id += 1;

        self.insts.alloc(Inst {
            id,
            opcode,
            ty,
            flags,
            block: None,
            pos: 0,
            pc,
            dst_reg,
            data,
            operands: Operands::for_opcode(opcode),
            users: Vec::new(),
        })
    }

    /// The instruction following `inst` in block order. The last phi chains
    /// to the first non-phi instruction of the same block.
    pub fn next_inst(&self, inst: InstId) -> Option<InstId> {
        let block = self.insts[inst]
            .block
            .expect("instruction not attached to a block");
        let pos = self.insts[inst].pos as usize;
        let block = &self.blocks[block];

        if self.insts[inst].is_phi() || self.insts[inst].is_catch_phi() {
            block
                .phis
                .get(pos + 1)
                .or_else(|| block.insts.first())
                .copied()
        } else {
            block.insts.get(pos + 1).copied()
        }
    }

    /// Blocks in reverse postorder starting from the entry block.
    pub fn blocks_rpo(&self) -> Vec<BlockId> {
        let entry = match self.entry {
            Some(entry) => entry,
            None => return Vec::new(),
        };

        let mut visited = FixedBitSet::with_capacity(self.blocks.len());
        let mut postorder = Vec::with_capacity(self.blocks.len());
        let mut stack: Vec<(BlockId, usize)> = vec![(entry, 0)];
        visited.insert(entry.index());

        while let Some(frame) = stack.last_mut() {
            let (block, idx) = *frame;
            let succs = &self.blocks[block].succs;

            if idx < succs.len() {
                frame.1 += 1;
                let succ = succs[idx];
                if !visited.contains(succ.index()) {
                    visited.insert(succ.index());
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(block);
                stack.pop();
            }
        }

        postorder.reverse();
        postorder
    }

    /// Allocates a transient instruction marker sized for this graph.
    pub fn new_inst_marker(&self) -> InstMarker {
        InstMarker::new(self.insts.len())
    }

    #[cfg(debug_assertions)]
    pub fn set_acc_alloc_applied(&mut self) {
        self.acc_alloc_applied = true;
    }

    #[cfg(debug_assertions)]
    pub fn is_acc_alloc_applied(&self) -> bool {
        self.acc_alloc_applied
    }
}
