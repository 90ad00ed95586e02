pub mod block;
pub mod display;
pub mod graph;
pub mod inst;
pub mod marker;
pub mod opcode;
pub mod ty;

#[cfg(test)]
mod tests;

pub use block::{BasicBlock, BlockId};
pub use display::{display_inst, dump};
pub use graph::Graph;
pub use inst::{
    ConstValue, Inst, InstData, InstId, Register, User, ACC_REG, INVALID_REG, MAX_STATIC_INPUTS,
};
pub use marker::InstMarker;
pub use opcode::{inst_flags, ConditionCode, Opcode};
pub use ty::Type;
