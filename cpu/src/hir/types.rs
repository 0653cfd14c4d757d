use std::fmt;

/// Declared type of an HIR value.
///
/// Discriminants start at 1 so that 0 can mean "no component" when a type is
/// packed into opcode flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    I8 = 1,
    I16,
    I32,
    I64,
    F32,
    F64,
    V128,
    V256,
}

impl Type {
    pub const ALL: [Type; 8] = [
        Type::I8,
        Type::I16,
        Type::I32,
        Type::I64,
        Type::F32,
        Type::F64,
        Type::V128,
        Type::V256,
    ];

    pub const fn is_integer(self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub const fn is_vector(self) -> bool {
        matches!(self, Type::V128 | Type::V256)
    }

    /// Size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Type::I8 => 1,
            Type::I16 => 2,
            Type::I32 | Type::F32 => 4,
            Type::I64 | Type::F64 => 8,
            Type::V128 => 16,
            Type::V256 => 32,
        }
    }

    pub const fn bits(self) -> u32 {
        self.size() as u32 * 8
    }

    pub const fn from_raw(raw: u8) -> Option<Type> {
        match raw {
            1 => Some(Type::I8),
            2 => Some(Type::I16),
            3 => Some(Type::I32),
            4 => Some(Type::I64),
            5 => Some(Type::F32),
            6 => Some(Type::F64),
            7 => Some(Type::V128),
            8 => Some(Type::V256),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::V128 => "v128",
            Type::V256 => "v256",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
