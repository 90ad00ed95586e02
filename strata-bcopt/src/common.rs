use strata_ir::{Inst, Opcode};

/// Maximum number of call arguments that fit a non-range call encoding.
pub const MAX_NUM_NON_RANGE_ARGS: usize = 4;

/// The designated accumulator-read operand slot of an instruction. Most
/// instructions consume the accumulator through their first input; stores
/// and array accesses take it later because their leading inputs are the
/// object/array and index registers.
pub fn acc_read_index(inst: &Inst) -> usize {
    match inst.opcode() {
        Opcode::LoadArray | Opcode::StoreObject | Opcode::StoreStatic | Opcode::NewArray => 1,
        Opcode::StoreArray => 2,
        _ => 0,
    }
}
