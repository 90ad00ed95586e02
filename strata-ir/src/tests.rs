use crate::block::BlockId;
use crate::graph::Graph;
use crate::inst::{ConstValue, InstId, INVALID_REG};
use crate::opcode::Opcode;
use crate::ty::Type;

fn const_int(graph: &mut Graph, block: BlockId, value: i64) -> InstId {
    let inst = graph.create_const(Type::Int32, ConstValue::Int(value));
    graph.append_inst(block, inst);
    inst
}

fn user_pairs(graph: &Graph, inst: InstId) -> Vec<(InstId, usize)> {
    graph
        .inst(inst)
        .users()
        .iter()
        .map(|user| (user.inst(), user.index()))
        .collect()
}

#[test]
fn set_input_attaches_both_directions() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let lhs = const_int(&mut graph, block, 1);
    let rhs = const_int(&mut graph, block, 2);
    let add = graph.create_inst(Opcode::Add, Type::Int32);
    graph.append_inst(block, add);

    graph.set_input(add, 0, Some(lhs));
    graph.set_input(add, 1, Some(rhs));

    assert_eq!(graph.inst(add).input(0), lhs);
    assert_eq!(graph.inst(add).input(1), rhs);
    assert_eq!(user_pairs(&graph, lhs), vec![(add, 0)]);
    assert_eq!(user_pairs(&graph, rhs), vec![(add, 1)]);
}

#[test]
fn set_input_replaces_and_detaches_old_producer() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let old = const_int(&mut graph, block, 1);
    let new = const_int(&mut graph, block, 2);
    let neg = graph.create_inst(Opcode::Neg, Type::Int32);
    graph.append_inst(block, neg);

    graph.set_input(neg, 0, Some(old));
    graph.set_input(neg, 0, Some(new));

    assert!(!graph.inst(old).has_users());
    assert_eq!(user_pairs(&graph, new), vec![(neg, 0)]);

    graph.set_input(neg, 0, None);
    assert!(!graph.inst(new).has_users());
}

#[test]
fn same_producer_in_two_slots() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let value = const_int(&mut graph, block, 7);
    let add = graph.create_inst(Opcode::Add, Type::Int32);
    graph.append_inst(block, add);

    graph.set_input(add, 0, Some(value));
    graph.set_input(add, 1, Some(value));

    assert_eq!(user_pairs(&graph, value), vec![(add, 0), (add, 1)]);

    graph.set_input(add, 0, None);
    assert_eq!(user_pairs(&graph, value), vec![(add, 1)]);
    assert_eq!(graph.inst(add).input(1), value);
}

#[test]
fn swap_inputs_repairs_user_indices() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let lhs = const_int(&mut graph, block, 1);
    let rhs = const_int(&mut graph, block, 2);
    let sub = graph.create_inst(Opcode::Sub, Type::Int32);
    graph.append_inst(block, sub);
    graph.set_input(sub, 0, Some(lhs));
    graph.set_input(sub, 1, Some(rhs));

    graph.swap_inputs(sub);

    assert_eq!(graph.inst(sub).input(0), rhs);
    assert_eq!(graph.inst(sub).input(1), lhs);
    assert_eq!(user_pairs(&graph, lhs), vec![(sub, 1)]);
    assert_eq!(user_pairs(&graph, rhs), vec![(sub, 0)]);
}

#[test]
fn append_input_grows_dynamic_storage() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let call = graph.create_inst(Opcode::CallStatic, Type::Int32);
    graph.append_inst(block, call);

    let mut args = Vec::new();
    for value in 0..10 {
        args.push(const_int(&mut graph, block, value));
    }

    for (idx, &arg) in args.iter().enumerate() {
        assert_eq!(graph.append_input(call, arg), idx);
    }

    assert_eq!(graph.inst(call).inputs_count(), 10);
    for (idx, &arg) in args.iter().enumerate() {
        assert_eq!(graph.inst(call).input(idx), arg);
        assert_eq!(user_pairs(&graph, arg), vec![(call, idx)]);
    }
}

#[test]
fn remove_input_moves_last_slot_into_hole() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let save_state = graph.create_inst(Opcode::SaveState, Type::Void);
    graph.append_inst(block, save_state);

    let v0 = const_int(&mut graph, block, 0);
    let v1 = const_int(&mut graph, block, 1);
    let v2 = const_int(&mut graph, block, 2);
    graph.append_save_state_input(save_state, v0, 10);
    graph.append_save_state_input(save_state, v1, 11);
    graph.append_save_state_input(save_state, v2, 12);

    graph.remove_input(save_state, 0);

    assert_eq!(graph.inst(save_state).inputs_count(), 2);
    assert_eq!(graph.inst(save_state).input(0), v2);
    assert_eq!(graph.inst(save_state).input(1), v1);
    assert_eq!(graph.inst(save_state).save_state_vreg(0), 12);
    assert_eq!(graph.inst(save_state).save_state_vreg(1), 11);

    assert!(!graph.inst(v0).has_users());
    assert_eq!(user_pairs(&graph, v1), vec![(save_state, 1)]);
    assert_eq!(user_pairs(&graph, v2), vec![(save_state, 0)]);
}

#[test]
fn remove_last_input_pops_in_place() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let save_state = graph.create_inst(Opcode::SaveState, Type::Void);
    graph.append_inst(block, save_state);

    let v0 = const_int(&mut graph, block, 0);
    let v1 = const_int(&mut graph, block, 1);
    graph.append_save_state_input(save_state, v0, 4);
    graph.append_save_state_input(save_state, v1, 5);

    graph.remove_input(save_state, 1);

    assert_eq!(graph.inst(save_state).inputs_count(), 1);
    assert_eq!(graph.inst(save_state).input(0), v0);
    assert_eq!(graph.inst(save_state).save_state_vreg(0), 4);
    assert!(!graph.inst(v1).has_users());
}

#[test]
fn phi_inputs_keep_predecessor_tags_on_removal() {
    let mut graph = Graph::new();
    let entry = graph.create_block();
    let left = graph.create_block();
    let right = graph.create_block();
    let merge = graph.create_block();
    graph.add_edge(entry, left);
    graph.add_edge(entry, right);
    graph.add_edge(left, merge);
    graph.add_edge(right, merge);

    let v0 = const_int(&mut graph, left, 1);
    let v1 = const_int(&mut graph, right, 2);
    let phi = graph.create_inst(Opcode::Phi, Type::Int32);
    graph.append_phi(merge, phi);
    graph.append_phi_input(phi, v0, left);
    graph.append_phi_input(phi, v1, right);

    assert_eq!(graph.inst(phi).phi_pred_block(0), left);
    assert_eq!(graph.inst(phi).phi_pred_block(1), right);

    graph.remove_input(phi, 0);

    assert_eq!(graph.inst(phi).inputs_count(), 1);
    assert_eq!(graph.inst(phi).input(0), v1);
    assert_eq!(graph.inst(phi).phi_pred_block(0), right);
}

#[test]
fn clone_shares_no_operand_state() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let lhs = const_int(&mut graph, block, 1);
    let rhs = const_int(&mut graph, block, 2);
    let add = graph.create_inst(Opcode::Add, Type::Int32);
    graph.append_inst(block, add);
    graph.set_input(add, 0, Some(lhs));
    graph.set_input(add, 1, Some(rhs));

    let clone = graph.clone_inst(add);

    assert_eq!(graph.inst(clone).opcode(), Opcode::Add);
    assert_eq!(graph.inst(clone).ty(), Type::Int32);
    assert!(graph.inst(clone).block().is_none());
    assert!(!graph.inst(clone).has_users());
    assert_ne!(graph.inst(clone).id(), graph.inst(add).id());

    // The original keeps its operand links.
    assert_eq!(user_pairs(&graph, lhs), vec![(add, 0)]);
    assert_eq!(user_pairs(&graph, rhs), vec![(add, 1)]);
}

#[test]
fn remove_inst_detaches_inputs_and_block() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let lhs = const_int(&mut graph, block, 1);
    let rhs = const_int(&mut graph, block, 2);
    let add = graph.create_inst(Opcode::Add, Type::Int32);
    graph.append_inst(block, add);
    graph.set_input(add, 0, Some(lhs));
    graph.set_input(add, 1, Some(rhs));
    let tail = const_int(&mut graph, block, 3);

    graph.remove_inst(add);

    assert!(graph.inst(add).block().is_none());
    assert!(!graph.inst(lhs).has_users());
    assert!(!graph.inst(rhs).has_users());

    // Positions of following instructions shift down.
    assert_eq!(graph.next_inst(rhs), Some(tail));
    assert_eq!(graph.next_inst(tail), None);
}

#[test]
fn next_inst_chains_phis_before_insts() {
    let mut graph = Graph::new();
    let entry = graph.create_block();
    let body = graph.create_block();
    graph.add_edge(entry, body);

    let v0 = const_int(&mut graph, entry, 1);
    let phi = graph.create_inst(Opcode::Phi, Type::Int32);
    graph.append_phi(body, phi);
    graph.append_phi_input(phi, v0, entry);
    let ret = graph.create_inst(Opcode::Return, Type::Int32);
    graph.append_inst(body, ret);
    graph.set_input(ret, 0, Some(phi));

    assert_eq!(graph.next_inst(phi), Some(ret));
    assert_eq!(graph.next_inst(ret), None);
    assert_eq!(graph.block(body).first_inst(), Some(phi));
}

#[test]
fn rpo_visits_preds_before_succs() {
    let mut graph = Graph::new();
    let entry = graph.create_block();
    let left = graph.create_block();
    let right = graph.create_block();
    let merge = graph.create_block();
    graph.add_edge(entry, left);
    graph.add_edge(entry, right);
    graph.add_edge(left, merge);
    graph.add_edge(right, merge);

    let rpo = graph.blocks_rpo();
    assert_eq!(rpo.len(), 4);
    assert_eq!(rpo[0], entry);
    assert_eq!(rpo[3], merge);

    let pos = |id| rpo.iter().position(|&block| block == id).unwrap();
    assert!(pos(entry) < pos(left));
    assert!(pos(entry) < pos(right));
    assert!(pos(left) < pos(merge));
    assert!(pos(right) < pos(merge));
}

#[test]
fn marker_is_scoped_to_one_allocation() {
    let mut graph = Graph::new();
    let block = graph.create_block();
    let v0 = const_int(&mut graph, block, 1);
    let v1 = const_int(&mut graph, block, 2);

    let mut marker = graph.new_inst_marker();
    marker.mark(v0);
    assert!(marker.is_marked(v0));
    assert!(!marker.is_marked(v1));

    marker.unmark(v0);
    assert!(!marker.is_marked(v0));

    // A fresh marker starts out clean.
    let marker = graph.new_inst_marker();
    assert!(!marker.is_marked(v0));
    assert!(!marker.is_marked(v1));
}

#[test]
fn default_flags_follow_opcode() {
    use crate::opcode::inst_flags;

    let mut graph = Graph::new();
    let block = graph.create_block();

    let add = graph.create_inst(Opcode::Add, Type::Int32);
    graph.append_inst(block, add);
    assert!(graph.inst(add).is_acc_read());
    assert!(graph.inst(add).is_acc_write());
    assert!(graph.inst(add).is_commutative());

    let sub = graph.create_inst(Opcode::Sub, Type::Int32);
    graph.append_inst(block, sub);
    assert!(!graph.inst(sub).is_commutative());

    let save_state = graph.create_inst(Opcode::SaveState, Type::Void);
    graph.append_inst(block, save_state);
    assert!(graph.inst(save_state).is_save_state());
    assert!(graph.inst(save_state).no_dest());

    let call = graph.create_inst(Opcode::CallVirtual, Type::Int32);
    graph.append_inst(block, call);
    assert!(graph.inst(call).is_call());
    assert!(graph.inst(call).is_call_or_intrinsic());
    assert!(!graph.inst(call).is_launch_call());

    let launch = graph.create_inst(Opcode::CallLaunchStatic, Type::Int32);
    graph.append_inst(block, launch);
    assert!(graph.inst(launch).is_launch_call());

    // Demotion clears the live flag without touching the static table.
    graph.inst_mut(add).clear_flag(inst_flags::ACC_WRITE);
    assert!(!graph.inst(add).is_acc_write());
    assert!(Opcode::Add.default_flags() & inst_flags::ACC_WRITE != 0);
}

#[test]
fn opcode_converts_to_and_from_u8() {
    let raw: u8 = Opcode::Add.into();
    assert_eq!(Opcode::try_from(raw).unwrap(), Opcode::Add);

    let raw: u8 = Opcode::ReturnVoid.into();
    assert_eq!(Opcode::try_from(raw).unwrap(), Opcode::ReturnVoid);

    assert!(Opcode::try_from(200u8).is_err());
}
