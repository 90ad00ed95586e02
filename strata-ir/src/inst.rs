use id_arena::Id;

use crate::block::BlockId;
use crate::opcode::{inst_flags, ConditionCode, Opcode};
use crate::ty::Type;

pub type InstId = Id<Inst>;

/// Register assignment slot. Holds either "unallocated" (`INVALID_REG`),
/// a concrete register number, or the accumulator sentinel (`ACC_REG`).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Register(pub u16);

pub const INVALID_REG: Register = Register(u16::MAX);
pub const ACC_REG: Register = Register(u16::MAX - 1);

impl Register {
    pub fn is_valid(&self) -> bool {
        *self != INVALID_REG
    }

    pub fn is_acc(&self) -> bool {
        *self == ACC_REG
    }
}

/// Maximum number of inputs stored inline for fixed-arity instructions.
pub const MAX_STATIC_INPUTS: usize = 4;

/// Def-use edge: a non-owning reference to a producer instruction plus the
/// position of the paired `User` entry in the producer's user vector. The
/// back-pointer keeps detach O(1).
#[derive(Copy, Clone, Debug)]
pub struct Input {
    pub(crate) inst: InstId,
    pub(crate) user_pos: u32,
}

impl Input {
    pub fn inst(&self) -> InstId {
        self.inst
    }
}

/// Reverse def-use link: which consumer references a producer, and in which
/// input slot.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct User {
    pub(crate) inst: InstId,
    pub(crate) index: u32,
}

impl User {
    pub fn inst(&self) -> InstId {
        self.inst
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Per-input auxiliary metadata for dynamic-arity instructions. Swapped
/// together with the input slot on swap-with-last removal.
#[derive(Clone, Debug)]
pub(crate) enum DynAux {
    None,
    /// SaveState/SafePoint: captured virtual register per input.
    Vregs(Vec<u16>),
    /// Phi/CatchPhi: predecessor block per input. Inputs are positional but
    /// predecessor blocks may be reordered, so the mapping is explicit.
    Preds(Vec<BlockId>),
}

/// Input slots plus per-slot source registers. Fixed-arity instructions use
/// an inline array sized at construction; dynamic-arity instructions grow a
/// separate heap block.
pub(crate) enum Operands {
    Fixed {
        count: u8,
        inputs: [Option<Input>; MAX_STATIC_INPUTS],
        src_regs: [Register; MAX_STATIC_INPUTS],
    },
    Dynamic {
        inputs: Vec<Option<Input>>,
        src_regs: Vec<Register>,
        aux: DynAux,
    },
}

impl Operands {
    pub(crate) fn for_opcode(opcode: Opcode) -> Operands {
        match opcode.fixed_input_count() {
            Some(count) => {
                assert!(count <= MAX_STATIC_INPUTS);
                Operands::Fixed {
                    count: count as u8,
                    inputs: [None; MAX_STATIC_INPUTS],
                    src_regs: [INVALID_REG; MAX_STATIC_INPUTS],
                }
            }

            None => {
                let aux = match opcode {
                    Opcode::Phi | Opcode::CatchPhi => DynAux::Preds(Vec::new()),
                    Opcode::SaveState | Opcode::SafePoint => DynAux::Vregs(Vec::new()),
                    _ => DynAux::None,
                };

                Operands::Dynamic {
                    inputs: Vec::new(),
                    src_regs: Vec::new(),
                    aux,
                }
            }
        }
    }

    pub(crate) fn count(&self) -> usize {
        match self {
            Operands::Fixed { count, .. } => *count as usize,
            Operands::Dynamic { inputs, .. } => inputs.len(),
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<Input> {
        match self {
            Operands::Fixed { count, inputs, .. } => {
                assert!(index < *count as usize);
                inputs[index]
            }
            Operands::Dynamic { inputs, .. } => inputs[index],
        }
    }

    pub(crate) fn set(&mut self, index: usize, input: Option<Input>) {
        match self {
            Operands::Fixed { count, inputs, .. } => {
                assert!(index < *count as usize);
                inputs[index] = input;
            }
            Operands::Dynamic { inputs, .. } => inputs[index] = input,
        }
    }

    pub(crate) fn src_reg(&self, index: usize) -> Register {
        match self {
            Operands::Fixed {
                count, src_regs, ..
            } => {
                assert!(index < *count as usize);
                src_regs[index]
            }
            Operands::Dynamic { src_regs, .. } => src_regs[index],
        }
    }

    pub(crate) fn set_src_reg(&mut self, index: usize, reg: Register) {
        match self {
            Operands::Fixed {
                count, src_regs, ..
            } => {
                assert!(index < *count as usize);
                src_regs[index] = reg;
            }
            Operands::Dynamic { src_regs, .. } => src_regs[index] = reg,
        }
    }

    pub(crate) fn is_dynamic(&self) -> bool {
        match self {
            Operands::Fixed { .. } => false,
            Operands::Dynamic { .. } => true,
        }
    }
}

/// Constant payload for `Opcode::Constant`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

/// Opcode-specific payload. Each instruction kind carries exactly the extra
/// fields it needs, selected by the opcode tag.
#[derive(Copy, Clone, Debug)]
pub enum InstData {
    None,
    Constant(ConstValue),
    /// Cmp, Compare, If.
    Cond(ConditionCode),
    /// IfImm.
    CondImm { cc: ConditionCode, imm: i64 },
    /// Binary-with-immediate arithmetic.
    Imm(i64),
    /// LoadObject/StoreObject/LoadStatic/StoreStatic field id.
    Field(u32),
    /// LoadString/LoadAndInitClass/NewObject/NewArray type id.
    TypeId(u32),
    /// Intrinsic id.
    IntrinsicId(u32),
}

/// A node of the instruction graph: opcode, result type, flag word, block
/// membership, register assignments and operand storage. Def-use edits go
/// through the owning `Graph`.
pub struct Inst {
    pub(crate) id: u32,
    pub(crate) opcode: Opcode,
    pub(crate) ty: Type,
    pub(crate) flags: u32,
    pub(crate) block: Option<BlockId>,
    pub(crate) pos: u32,
    pub(crate) pc: u32,
    pub(crate) dst_reg: Register,
    pub(crate) data: InstData,
    pub(crate) operands: Operands,
    pub(crate) users: Vec<User>,
}

impl Inst {
    pub(crate) fn new(id: u32, opcode: Opcode, ty: Type) -> Inst {
        Inst {
            id,
            opcode,
            ty,
            flags: opcode.default_flags(),
            block: None,
            pos: 0,
            pc: 0,
            dst_reg: INVALID_REG,
            data: InstData::None,
            operands: Operands::for_opcode(opcode),
            users: Vec::new(),
        }
    }

    /// Graph-unique integer id, used for debug printing and hashing.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn data(&self) -> &InstData {
        &self.data
    }

    pub fn set_data(&mut self, data: InstData) {
        self.data = data;
    }

    pub fn const_value(&self) -> Option<ConstValue> {
        match self.data {
            InstData::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn condition_code(&self) -> Option<ConditionCode> {
        match self.data {
            InstData::Cond(cc) => Some(cc),
            InstData::CondImm { cc, .. } => Some(cc),
            _ => None,
        }
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag: u32) {
        self.flags &= !flag;
    }

    pub fn is_acc_read(&self) -> bool {
        self.has_flag(inst_flags::ACC_READ)
    }

    pub fn is_acc_write(&self) -> bool {
        self.has_flag(inst_flags::ACC_WRITE)
    }

    pub fn is_commutative(&self) -> bool {
        self.has_flag(inst_flags::COMMUTATIVE)
    }

    pub fn is_call(&self) -> bool {
        self.has_flag(inst_flags::CALL)
    }

    pub fn is_launch_call(&self) -> bool {
        self.has_flag(inst_flags::LAUNCH)
    }

    pub fn is_call_or_intrinsic(&self) -> bool {
        self.is_call() || self.opcode == Opcode::Intrinsic
    }

    pub fn is_save_state(&self) -> bool {
        self.has_flag(inst_flags::SAVE_STATE)
    }

    pub fn is_check(&self) -> bool {
        self.has_flag(inst_flags::CHECK)
    }

    pub fn is_const(&self) -> bool {
        self.opcode == Opcode::Constant
    }

    pub fn is_phi(&self) -> bool {
        self.opcode == Opcode::Phi
    }

    pub fn is_catch_phi(&self) -> bool {
        self.opcode == Opcode::CatchPhi
    }

    pub fn is_binary(&self) -> bool {
        self.opcode.is_binary()
    }

    pub fn is_binary_imm(&self) -> bool {
        self.opcode.is_binary_imm()
    }

    /// True when the instruction produces no allocatable result.
    pub fn no_dest(&self) -> bool {
        self.has_flag(inst_flags::NO_DST) || self.has_flag(inst_flags::PSEUDO_DST) || self.ty.is_void()
    }

    pub fn dst_reg(&self) -> Register {
        self.dst_reg
    }

    pub fn set_dst_reg(&mut self, reg: Register) {
        self.dst_reg = reg;
    }

    pub fn src_reg(&self, index: usize) -> Register {
        self.operands.src_reg(index)
    }

    pub fn set_src_reg(&mut self, index: usize, reg: Register) {
        self.operands.set_src_reg(index, reg);
    }

    pub fn inputs_count(&self) -> usize {
        self.operands.count()
    }

    /// The i-th producer. The slot must be attached.
    pub fn input(&self, index: usize) -> InstId {
        self.operands
            .get(index)
            .expect("unattached input slot")
            .inst
    }

    /// All attached producers in slot order.
    pub fn inputs(&self) -> impl Iterator<Item = InstId> + '_ {
        (0..self.inputs_count()).map(move |idx| self.input(idx))
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn has_users(&self) -> bool {
        !self.users.is_empty()
    }

    /// SaveState only: virtual register captured by input slot `index`.
    pub fn save_state_vreg(&self, index: usize) -> u16 {
        match &self.operands {
            Operands::Dynamic {
                aux: DynAux::Vregs(vregs),
                ..
            } => vregs[index],
            _ => panic!("instruction has no vreg metadata"),
        }
    }

    /// Phi only: predecessor block that input slot `index` flows in from.
    pub fn phi_pred_block(&self, index: usize) -> BlockId {
        match &self.operands {
            Operands::Dynamic {
                aux: DynAux::Preds(preds),
                ..
            } => preds[index],
            _ => panic!("instruction has no predecessor metadata"),
        }
    }
}
