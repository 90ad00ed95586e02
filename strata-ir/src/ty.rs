#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Reference,
    Pointer,
    Any,
}

impl Type {
    pub fn is_void(&self) -> bool {
        match self {
            Type::Void => true,
            _ => false,
        }
    }

    pub fn is_any_float(&self) -> bool {
        match self {
            Type::Float32 | Type::Float64 => true,
            _ => false,
        }
    }

    pub fn is_any_int(&self) -> bool {
        match self {
            Type::Int8
            | Type::Int16
            | Type::Int32
            | Type::Int64
            | Type::UInt8
            | Type::UInt16
            | Type::UInt32
            | Type::UInt64 => true,
            _ => false,
        }
    }

    pub fn is_reference(&self) -> bool {
        match self {
            Type::Reference => true,
            _ => false,
        }
    }
}
