use std::collections::HashSet;

use strata_ir::{inst_flags, Graph, InstId, InstMarker, Opcode, ACC_REG, INVALID_REG};

use crate::common::{acc_read_index, MAX_NUM_NON_RANGE_ARGS};
use crate::Optimization;

/// Walks the straight-line region between `src` and `dst` and reports
/// whether any instruction in between clobbers the accumulator. Control-flow
/// divergence counts as a clobber, except that reaching the block of a phi
/// destination through a merge is fine. Constants only clobber once they
/// have been pinned to the accumulator; an accumulator read is harmless when
/// the value it reads is `src` itself or already lives in the accumulator.
pub fn is_acc_write_between(graph: &Graph, src: InstId, dst: InstId) -> bool {
    assert_ne!(src, dst);

    let mut block = graph
        .inst(src)
        .block()
        .expect("liveness query on a detached instruction");
    let mut inst = graph.next_inst(src);

    loop {
        match inst {
            None => {
                loop {
                    if graph.block(block).succs().len() > 1 {
                        return true;
                    }
                    assert_eq!(graph.block(block).succs().len(), 1);
                    block = graph.block(block).successor(0);

                    if !graph.inst(dst).is_phi() && graph.block(block).preds().len() > 1 {
                        return true;
                    }
                    if !graph.block(block).is_empty() || graph.block(block).has_phi() {
                        break;
                    }
                }
                inst = graph.block(block).first_inst();
            }

            Some(cur) if cur == dst => return false,

            Some(cur) => {
                let cur_inst = graph.inst(cur);

                if cur_inst.is_acc_write() {
                    if !cur_inst.is_const() || cur_inst.dst_reg() == ACC_REG {
                        return true;
                    }
                }

                if cur_inst.is_acc_read() {
                    let input = cur_inst.input(acc_read_index(cur_inst));
                    if input != src && graph.inst(input).dst_reg() != ACC_REG {
                        return true;
                    }
                }

                inst = graph.next_inst(cur);
            }
        }
    }
}

fn is_commutative(graph: &Graph, inst: InstId) -> bool {
    let inst = graph.inst(inst);
    if inst.opcode() == Opcode::If {
        let cc = inst
            .condition_code()
            .expect("If instruction without a condition code");
        cc.is_swappable()
    } else {
        inst.is_commutative()
    }
}

/// True when a commutative consumer reads the producer through the wrong
/// operand slot and needs its inputs swapped before the accumulator can
/// flow in.
fn user_need_swap_inputs(graph: &Graph, inst: InstId, user: InstId) -> bool {
    if !is_commutative(graph, user) {
        return false;
    }
    graph.inst(user).input(acc_read_index(graph.inst(user))) != inst
}

/// Instructions whose result may stay in a regular register when the
/// accumulator does not work out. Everything else keeps its statically
/// assigned destination.
fn maybe_reg_dst(graph: &Graph, inst: InstId) -> bool {
    let inst = graph.inst(inst);
    inst.is_const() || inst.is_binary() || inst.is_binary_imm() || inst.opcode() == Opcode::LoadObject
}

/// Accumulator register allocation.
///
/// Decides for each value-producing instruction whether its result can live
/// in the accumulator and for each consumer whether it can read the value
/// from there, so that later bytecode emission can drop redundant
/// `lda`/`sta` moves. Phis are eligible as a whole or not at all: either
/// every input arrives through the accumulator and every user reads it from
/// there, or the phi stays in a regular register.
pub struct RegAccAlloc<'a> {
    graph: &'a mut Graph,
    acc_marker: InstMarker,
}

impl<'a> RegAccAlloc<'a> {
    pub fn new(graph: &'a mut Graph) -> RegAccAlloc<'a> {
        let acc_marker = graph.new_inst_marker();
        RegAccAlloc { graph, acc_marker }
    }

    fn is_phi_optimizable(&self, phi: InstId) -> bool {
        assert_eq!(self.graph.inst(phi).opcode(), Opcode::Phi);
        self.acc_marker.is_marked(phi)
    }

    fn is_acc_read(&self, inst: InstId) -> bool {
        if self.graph.inst(inst).is_phi() {
            self.is_phi_optimizable(inst)
        } else {
            self.graph.inst(inst).is_acc_read()
        }
    }

    fn is_acc_write(&self, inst: InstId) -> bool {
        if self.graph.inst(inst).is_phi() {
            self.is_phi_optimizable(inst)
        } else {
            self.graph.inst(inst).is_acc_write()
        }
    }

    /// Decides whether `user` can take the result of `inst` from the
    /// accumulator instead of a register.
    fn can_user_read_acc(&self, inst: InstId, user: InstId) -> bool {
        if self.graph.inst(user).is_phi() {
            return self.is_phi_optimizable(user);
        }

        if !self.is_acc_read(user) || is_acc_write_between(self.graph, inst, user) {
            return false;
        }

        // A producer that occupies two operand slots of the same consumer
        // cannot arrive through the single accumulator:
        //   v2. Sub v0, v1
        //   v3. Add v2, v2
        let mut found = false;
        for input in self.graph.inst(user).inputs() {
            if input != inst {
                continue;
            }
            if found {
                return false;
            }
            found = true;
        }

        for input in self.graph.inst(user).inputs() {
            if input != user && self.graph.inst(input).dst_reg() == ACC_REG {
                return false;
            }
            // A constant that flows into the consumer from another block
            // would have to be rematerialized there, which dirties the
            // accumulator a phi result is sitting in.
            if self.graph.inst(inst).is_phi()
                && self.graph.inst(input).is_const()
                && self.graph.inst(input).block() != self.graph.inst(user).block()
            {
                return false;
            }
        }

        let user_ref = self.graph.inst(user);

        if user_ref.is_launch_call() {
            return false;
        }

        if user_ref.is_call_or_intrinsic() {
            // One extra input for the SaveState.
            return user_ref.inputs_count() <= MAX_NUM_NON_RANGE_ARGS + 1;
        }

        user_ref.input(acc_read_index(user_ref)) == inst || is_commutative(self.graph, user)
    }

    /// Checks that every input of the phi arrives through the accumulator
    /// and every user accepts it from there. Swaps the inputs of
    /// commutative users as a side effect once the phi qualifies.
    fn is_phi_acc_ready(&mut self, phi: InstId) -> bool {
        assert_eq!(self.graph.inst(phi).opcode(), Opcode::Phi);

        for idx in 0..self.graph.inst(phi).inputs_count() {
            let input = self.graph.inst(phi).input(idx);
            if !self.is_acc_write(input) || is_acc_write_between(self.graph, input, phi) {
                return false;
            }
        }

        let users: Vec<InstId> = self
            .graph
            .inst(phi)
            .users()
            .iter()
            .map(|user| user.inst())
            .collect();

        let mut users_that_required_swap: HashSet<InstId> = HashSet::new();
        for user in users {
            if !self.can_user_read_acc(phi, user) {
                return false;
            }
            if user_need_swap_inputs(self.graph, phi, user) {
                users_that_required_swap.insert(user);
            }
        }

        for user in users_that_required_swap {
            self.graph.swap_inputs(user);
        }

        true
    }

    /// Marks the designated source slot of `inst` as needing an explicit
    /// accumulator load, or as satisfied by the accumulator. No-op for
    /// phis and calls; calls take their accumulator argument implicitly.
    fn set_need_lda(&mut self, inst: InstId, need: bool) {
        if self.graph.inst(inst).is_phi() || self.graph.inst(inst).is_catch_phi() {
            return;
        }
        if !self.is_acc_read(inst) {
            return;
        }
        if self.graph.inst(inst).is_call_or_intrinsic() {
            return;
        }

        let index = acc_read_index(self.graph.inst(inst));
        let reg = if need { INVALID_REG } else { ACC_REG };
        self.graph.inst_mut(inst).set_src_reg(index, reg);
    }

    fn run_impl(&mut self) -> bool {
        // Reset all register assignments and give constants a chance to
        // ride the accumulator.
        for block in self.graph.blocks_rpo() {
            let insts: Vec<InstId> = self.graph.block(block).all_insts().collect();
            for inst in insts {
                if self.graph.inst(inst).is_save_state() || self.graph.inst(inst).is_catch_phi() {
                    continue;
                }
                if self.graph.inst(inst).is_const() {
                    self.graph.inst_mut(inst).set_flag(inst_flags::ACC_WRITE);
                }
                for idx in 0..self.graph.inst(inst).inputs_count() {
                    self.graph.inst_mut(inst).set_src_reg(idx, INVALID_REG);
                    if maybe_reg_dst(self.graph, inst) {
                        self.graph.inst_mut(inst).set_dst_reg(INVALID_REG);
                    }
                }
            }
        }

        if !self.graph.is_dynamic_method() {
            for block in self.graph.blocks_rpo() {
                for inst in self.graph.block(block).all_insts() {
                    if self.graph.inst(inst).opcode() == Opcode::Builtin {
                        log::debug!("builtin opcode present, falling back to register allocation");
                        return false;
                    }
                }
            }
        }

        // Phis first: a phi either runs fully through the accumulator or
        // not at all, and both its inputs and users consult the mark.
        for block in self.graph.blocks_rpo() {
            let phis: Vec<InstId> = self.graph.block(block).phi_insts().to_vec();
            for phi in phis {
                // Catch phis share the phi list but never ride the
                // accumulator.
                if !self.graph.inst(phi).is_phi() {
                    continue;
                }
                if self.is_phi_acc_ready(phi) {
                    self.acc_marker.mark(phi);
                }
            }
        }

        for block in self.graph.blocks_rpo() {
            // Write side: pin a producer to the accumulator when every user
            // takes the value from there, otherwise demote it to a regular
            // register where possible.
            let all: Vec<InstId> = self.graph.block(block).all_insts().collect();
            for inst in all {
                if self.graph.inst(inst).no_dest() || !self.is_acc_write(inst) {
                    continue;
                }

                let users: Vec<InstId> = self
                    .graph
                    .inst(inst)
                    .users()
                    .iter()
                    .map(|user| user.inst())
                    .collect();

                let mut use_acc_dst_reg = true;
                let mut users_that_required_swap: HashSet<InstId> = HashSet::new();

                for &user in &users {
                    if self.graph.inst(user).is_save_state() {
                        continue;
                    }
                    if self.can_user_read_acc(inst, user) {
                        if user_need_swap_inputs(self.graph, inst, user) {
                            users_that_required_swap.insert(user);
                        }
                        self.set_need_lda(user, false);
                    } else {
                        use_acc_dst_reg = false;
                    }
                }

                for user in users_that_required_swap {
                    self.graph.swap_inputs(user);
                }

                if use_acc_dst_reg {
                    self.graph.inst_mut(inst).set_dst_reg(ACC_REG);
                } else if maybe_reg_dst(self.graph, inst) {
                    self.graph.inst_mut(inst).clear_flag(inst_flags::ACC_WRITE);
                    for &user in &users {
                        if self.graph.inst(user).is_save_state() {
                            continue;
                        }
                        self.set_need_lda(user, true);
                    }
                }
            }

            // Read side: a consumer whose designated input no longer
            // survives in the accumulator needs an explicit load, and the
            // producer falls back to a register.
            let insts: Vec<InstId> = self.graph.block(block).all_insts().collect();
            for inst in insts {
                if self.graph.inst(inst).is_phi() || self.graph.inst(inst).is_catch_phi() {
                    continue;
                }
                if self.graph.inst(inst).inputs_count() == 0 {
                    continue;
                }
                if self.graph.inst(inst).is_call_or_intrinsic() {
                    continue;
                }

                let input = self.graph.inst(inst).input(acc_read_index(self.graph.inst(inst)));

                if is_acc_write_between(self.graph, input, inst) {
                    self.graph.inst_mut(input).set_dst_reg(INVALID_REG);
                    self.set_need_lda(inst, true);

                    if maybe_reg_dst(self.graph, input) {
                        self.graph.inst_mut(input).clear_flag(inst_flags::ACC_WRITE);
                        let input_users: Vec<InstId> = self
                            .graph
                            .inst(input)
                            .users()
                            .iter()
                            .map(|user| user.inst())
                            .collect();
                        for user in input_users {
                            self.set_need_lda(user, true);
                        }
                    }
                }
            }
        }

        #[cfg(debug_assertions)]
        self.graph.set_acc_alloc_applied();

        log::debug!("accumulator allocation applied");
        true
    }
}

impl Optimization for RegAccAlloc<'_> {
    fn name(&self) -> &'static str {
        "reg_acc_alloc"
    }

    fn run(&mut self) -> bool {
        self.run_impl()
    }
}
