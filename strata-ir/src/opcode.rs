use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Instruction flags, derived from the opcode at construction time.
/// ACC_WRITE can be cleared selectively when an instruction is demoted
/// to a plain register destination.
pub mod inst_flags {
    pub const NONE: u32 = 0;
    pub const ACC_READ: u32 = 1 << 0;
    pub const ACC_WRITE: u32 = 1 << 1;
    pub const COMMUTATIVE: u32 = 1 << 2;
    pub const CALL: u32 = 1 << 3;
    pub const LAUNCH: u32 = 1 << 4;
    pub const SAVE_STATE: u32 = 1 << 5;
    pub const NO_DST: u32 = 1 << 6;
    pub const PSEUDO_DST: u32 = 1 << 7;
    pub const CHECK: u32 = 1 << 8;
    pub const CAN_THROW: u32 = 1 << 9;
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Constant,
    Parameter,
    Phi,
    CatchPhi,
    SaveState,
    SafePoint,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AShr,
    Neg,
    Abs,
    Not,
    Sqrt,
    Cast,
    AddI,
    SubI,
    MulI,
    AndI,
    OrI,
    XorI,
    ShlI,
    ShrI,
    Cmp,
    Compare,
    If,
    IfImm,
    LoadObject,
    StoreObject,
    LoadStatic,
    StoreStatic,
    LoadArray,
    StoreArray,
    NewObject,
    NewArray,
    LoadString,
    LoadAndInitClass,
    InitObject,
    NullCheck,
    ZeroCheck,
    BoundsCheck,
    CallStatic,
    CallVirtual,
    CallLaunchStatic,
    CallLaunchVirtual,
    Intrinsic,
    Builtin,
    Throw,
    Try,
    Return,
    ReturnVoid,
}

impl Opcode {
    /// Static flag set for this opcode. The live flag word of an
    /// instruction starts out as this value.
    pub const fn default_flags(self) -> u32 {
        use inst_flags::*;

        match self {
            Opcode::Constant => NONE,
            Opcode::Parameter => NONE,
            Opcode::Phi => NONE,
            Opcode::CatchPhi => NONE,
            Opcode::SaveState | Opcode::SafePoint => SAVE_STATE | NO_DST,

            Opcode::Add | Opcode::Mul | Opcode::Min | Opcode::Max => {
                ACC_READ | ACC_WRITE | COMMUTATIVE
            }
            Opcode::And | Opcode::Or | Opcode::Xor => ACC_READ | ACC_WRITE | COMMUTATIVE,
            Opcode::Sub | Opcode::Mod | Opcode::Shl | Opcode::Shr | Opcode::AShr => {
                ACC_READ | ACC_WRITE
            }
            Opcode::Div => ACC_READ | ACC_WRITE | CAN_THROW,

            Opcode::Neg | Opcode::Abs | Opcode::Not | Opcode::Sqrt | Opcode::Cast => {
                ACC_READ | ACC_WRITE
            }

            Opcode::AddI
            | Opcode::SubI
            | Opcode::MulI
            | Opcode::AndI
            | Opcode::OrI
            | Opcode::XorI
            | Opcode::ShlI
            | Opcode::ShrI => ACC_READ | ACC_WRITE,

            Opcode::Cmp | Opcode::Compare => ACC_READ | ACC_WRITE,
            Opcode::If | Opcode::IfImm => ACC_READ | NO_DST,

            Opcode::LoadObject | Opcode::LoadStatic => ACC_WRITE | CAN_THROW,
            Opcode::StoreObject | Opcode::StoreStatic => ACC_READ | NO_DST | CAN_THROW,
            Opcode::LoadArray => ACC_READ | ACC_WRITE | CAN_THROW,
            Opcode::StoreArray => ACC_READ | NO_DST | CAN_THROW,

            Opcode::NewObject | Opcode::NewArray => CAN_THROW,
            Opcode::LoadString => ACC_WRITE | CAN_THROW,
            Opcode::LoadAndInitClass => CAN_THROW,
            Opcode::InitObject => CALL | ACC_WRITE | CAN_THROW,

            Opcode::NullCheck | Opcode::ZeroCheck | Opcode::BoundsCheck => {
                CHECK | PSEUDO_DST | CAN_THROW
            }

            Opcode::CallStatic | Opcode::CallVirtual => CALL | ACC_READ | ACC_WRITE | CAN_THROW,
            Opcode::CallLaunchStatic | Opcode::CallLaunchVirtual => CALL | LAUNCH | CAN_THROW,
            Opcode::Intrinsic => ACC_READ | ACC_WRITE | CAN_THROW,
            Opcode::Builtin => ACC_READ | ACC_WRITE,

            Opcode::Throw => ACC_READ | NO_DST | CAN_THROW,
            Opcode::Try => NO_DST,
            Opcode::Return => ACC_READ | NO_DST,
            Opcode::ReturnVoid => NO_DST,
        }
    }

    /// Input count for fixed-arity opcodes. `None` means the instruction
    /// grows its input list at IR-construction time.
    pub const fn fixed_input_count(self) -> Option<usize> {
        match self {
            Opcode::Constant | Opcode::Parameter | Opcode::Try | Opcode::ReturnVoid => Some(0),

            Opcode::Neg
            | Opcode::Abs
            | Opcode::Not
            | Opcode::Sqrt
            | Opcode::Cast
            | Opcode::AddI
            | Opcode::SubI
            | Opcode::MulI
            | Opcode::AndI
            | Opcode::OrI
            | Opcode::XorI
            | Opcode::ShlI
            | Opcode::ShrI
            | Opcode::IfImm
            | Opcode::LoadObject
            | Opcode::LoadStatic
            | Opcode::LoadString
            | Opcode::LoadAndInitClass
            | Opcode::Return => Some(1),

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Min
            | Opcode::Max
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::AShr
            | Opcode::Cmp
            | Opcode::Compare
            | Opcode::If
            | Opcode::StoreObject
            | Opcode::StoreStatic
            | Opcode::LoadArray
            | Opcode::NewObject
            | Opcode::NullCheck
            | Opcode::ZeroCheck
            | Opcode::Throw => Some(2),

            Opcode::StoreArray | Opcode::NewArray | Opcode::BoundsCheck => Some(3),

            Opcode::Phi
            | Opcode::CatchPhi
            | Opcode::SaveState
            | Opcode::SafePoint
            | Opcode::InitObject
            | Opcode::CallStatic
            | Opcode::CallVirtual
            | Opcode::CallLaunchStatic
            | Opcode::CallLaunchVirtual
            | Opcode::Intrinsic
            | Opcode::Builtin => None,
        }
    }

    pub fn is_binary(self) -> bool {
        match self {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Min
            | Opcode::Max
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::AShr => true,
            _ => false,
        }
    }

    pub fn is_binary_imm(self) -> bool {
        match self {
            Opcode::AddI
            | Opcode::SubI
            | Opcode::MulI
            | Opcode::AndI
            | Opcode::OrI
            | Opcode::XorI
            | Opcode::ShlI
            | Opcode::ShrI => true,
            _ => false,
        }
    }
}

/// Condition code used by Cmp, Compare, If and IfImm.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ConditionCode {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    B,
    Be,
    A,
    Ae,
    TstEq,
    TstNe,
}

impl ConditionCode {
    /// Eq and Ne are insensitive to operand order.
    pub fn is_swappable(self) -> bool {
        match self {
            ConditionCode::Eq | ConditionCode::Ne => true,
            _ => false,
        }
    }
}
