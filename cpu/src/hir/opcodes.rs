use bitflags::bitflags;

use super::types::Type;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ArithmeticFlags: u32 {
        const UNSIGNED = 1 << 0;
        const SATURATE = 1 << 1;
    }
}

impl ArithmeticFlags {
    pub const SIGNED: ArithmeticFlags = ArithmeticFlags::empty();
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CallFlags: u32 {
        const EXTERN = 1 << 0;
    }
}

bitflags! {
    /// Relational operator of a `cmp`. Unsigned variants are the signed
    /// operator tagged with `UNSIGNED`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CompareFlags: u32 {
        const EQ = 1 << 0;
        const NE = 1 << 1;
        const SLT = 1 << 2;
        const SLE = 1 << 3;
        const SGE = 1 << 4;
        const SGT = 1 << 5;
        const UNSIGNED = 1 << 6;
        const ULT = Self::SLT.bits() | Self::UNSIGNED.bits();
        const ULE = Self::SLE.bits() | Self::UNSIGNED.bits();
        const UGE = Self::SGE.bits() | Self::UNSIGNED.bits();
        const UGT = Self::SGT.bits() | Self::UNSIGNED.bits();
    }
}

impl CompareFlags {
    const MNEMONICS: [(CompareFlags, &'static str); 10] = [
        (CompareFlags::EQ, "eq"),
        (CompareFlags::NE, "ne"),
        (CompareFlags::SLT, "slt"),
        (CompareFlags::SLE, "sle"),
        (CompareFlags::SGE, "sge"),
        (CompareFlags::SGT, "sgt"),
        (CompareFlags::ULT, "ult"),
        (CompareFlags::ULE, "ule"),
        (CompareFlags::UGE, "uge"),
        (CompareFlags::UGT, "ugt"),
    ];

    pub fn mnemonic(self) -> &'static str {
        Self::MNEMONICS
            .iter()
            .find(|(flags, _)| *flags == self)
            .map_or("?", |(_, name)| name)
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct MemoryFlags: u32 {
        const ENDIAN_BIG = 1 << 0;
        const ENDIAN_LITTLE = 1 << 1;
    }
}

const COMPONENT_SHIFT: u32 = 16;
const COMPONENT_MASK: u32 = 0xFF;

/// Packs the element type of a vector operation into instruction flags.
pub const fn component_flags(ty: Type) -> u32 {
    (ty as u32) << COMPONENT_SHIFT
}

pub const fn component_type(flags: u32) -> Option<Type> {
    Type::from_raw(((flags >> COMPONENT_SHIFT) & COMPONENT_MASK) as u8)
}

bitflags! {
    /// Which instruction-flag family an opcode interprets, plus static properties.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct OpcodeInfoFlags: u32 {
        const ARITHMETIC = 1 << 0;
        const CALL = 1 << 1;
        const COMPARE = 1 << 2;
        const MEMORY = 1 << 3;
        const COMPONENT = 1 << 4;
        /// Has effects beyond its result value and must not be removed.
        const VOLATILE = 1 << 5;
        const TERMINATOR = 1 << 6;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum OpcodeSignatureType {
    Void = 0,
    Immediate = 1,
    Maybe = 2,
    Value = 3,
    Block = 4,
    Function = 5,
}

impl OpcodeSignatureType {
    const fn from_bits(bits: u32) -> OpcodeSignatureType {
        match bits {
            0 => OpcodeSignatureType::Void,
            1 => OpcodeSignatureType::Immediate,
            2 => OpcodeSignatureType::Maybe,
            3 => OpcodeSignatureType::Value,
            4 => OpcodeSignatureType::Block,
            5 => OpcodeSignatureType::Function,
            _ => panic!("corrupt opcode signature slot"),
        }
    }
}

/// Four 3-bit operand slots: dest, src1, src2, src3.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpcodeSignature(u32);

impl OpcodeSignature {
    const fn pack(slots: [OpcodeSignatureType; 4]) -> OpcodeSignature {
        OpcodeSignature(
            (slots[0] as u32)
                | ((slots[1] as u32) << 3)
                | ((slots[2] as u32) << 6)
                | ((slots[3] as u32) << 9),
        )
    }

    pub const X: Self = Self::pack([T::Void, T::Void, T::Void, T::Void]);
    pub const M: Self = Self::pack([T::Maybe, T::Void, T::Void, T::Void]);
    pub const V: Self = Self::pack([T::Value, T::Void, T::Void, T::Void]);
    pub const X_V: Self = Self::pack([T::Void, T::Value, T::Void, T::Void]);
    pub const X_M: Self = Self::pack([T::Void, T::Maybe, T::Void, T::Void]);
    pub const X_B: Self = Self::pack([T::Void, T::Block, T::Void, T::Void]);
    pub const X_F: Self = Self::pack([T::Void, T::Function, T::Void, T::Void]);
    pub const V_I: Self = Self::pack([T::Value, T::Immediate, T::Void, T::Void]);
    pub const V_V: Self = Self::pack([T::Value, T::Value, T::Void, T::Void]);
    pub const M_F: Self = Self::pack([T::Maybe, T::Function, T::Void, T::Void]);
    pub const X_I_V: Self = Self::pack([T::Void, T::Immediate, T::Value, T::Void]);
    pub const X_V_V: Self = Self::pack([T::Void, T::Value, T::Value, T::Void]);
    pub const X_V_B: Self = Self::pack([T::Void, T::Value, T::Block, T::Void]);
    pub const M_V_F: Self = Self::pack([T::Maybe, T::Value, T::Function, T::Void]);
    pub const V_I_V: Self = Self::pack([T::Value, T::Immediate, T::Value, T::Void]);
    pub const V_V_V: Self = Self::pack([T::Value, T::Value, T::Value, T::Void]);
    pub const X_V_V_V: Self = Self::pack([T::Void, T::Value, T::Value, T::Value]);
    pub const V_V_V_V: Self = Self::pack([T::Value, T::Value, T::Value, T::Value]);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn dest(self) -> OpcodeSignatureType {
        OpcodeSignatureType::from_bits(self.0 & 0b111)
    }

    pub const fn src1(self) -> OpcodeSignatureType {
        OpcodeSignatureType::from_bits((self.0 >> 3) & 0b111)
    }

    pub const fn src2(self) -> OpcodeSignatureType {
        OpcodeSignatureType::from_bits((self.0 >> 6) & 0b111)
    }

    pub const fn src3(self) -> OpcodeSignatureType {
        OpcodeSignatureType::from_bits((self.0 >> 9) & 0b111)
    }

    pub const fn sources(self) -> [OpcodeSignatureType; 3] {
        [self.src1(), self.src2(), self.src3()]
    }
}

use OpcodeSignatureType as T;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Call,
    CallCond,
    Br,
    CondBr,
    Ret,
    CtxLoad,
    CtxStore,
    Load,
    Store,
    MemFence,
    ZExt,
    SExt,
    Trunc,
    Cast,
    Convert,
    Add,
    Sub,
    Mul,
    MulH,
    Div,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrA,
    Ctlz,
    Cmp,
    Select,
    Extract,
    Insert,
    Splat,
    VAdd,
    VSub,
}

pub const OPCODE_COUNT: usize = Opcode::ALL.len();

impl Opcode {
    /// Every opcode in discriminant order.
    pub const ALL: [Opcode; 37] = [
        Opcode::Nop,
        Opcode::Call,
        Opcode::CallCond,
        Opcode::Br,
        Opcode::CondBr,
        Opcode::Ret,
        Opcode::CtxLoad,
        Opcode::CtxStore,
        Opcode::Load,
        Opcode::Store,
        Opcode::MemFence,
        Opcode::ZExt,
        Opcode::SExt,
        Opcode::Trunc,
        Opcode::Cast,
        Opcode::Convert,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::MulH,
        Opcode::Div,
        Opcode::Neg,
        Opcode::Not,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::ShrA,
        Opcode::Ctlz,
        Opcode::Cmp,
        Opcode::Select,
        Opcode::Extract,
        Opcode::Insert,
        Opcode::Splat,
        Opcode::VAdd,
        Opcode::VSub,
    ];

    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODE_INFO[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    // Exhaustive on purpose: adding an opcode without metadata fails to compile.
    const fn describe(self) -> OpcodeInfo {
        use OpcodeInfoFlags as F;
        type S = OpcodeSignature;

        const NONE: F = F::empty();
        const ARITH: F = F::ARITHMETIC;
        const BRANCH: F = F::TERMINATOR.union(F::VOLATILE);

        let (name, flags, signature) = match self {
            Opcode::Nop => ("nop", NONE, S::X),
            Opcode::Call => ("call", F::CALL.union(F::VOLATILE), S::M_F),
            Opcode::CallCond => ("call_cond", F::CALL.union(F::VOLATILE), S::M_V_F),
            Opcode::Br => ("br", BRANCH, S::X_B),
            Opcode::CondBr => ("cond_br", BRANCH, S::X_V_B),
            Opcode::Ret => ("ret", BRANCH, S::X_M),
            Opcode::CtxLoad => ("ctx_load", NONE, S::V_I),
            Opcode::CtxStore => ("ctx_store", F::VOLATILE, S::X_I_V),
            Opcode::Load => ("load", F::MEMORY, S::V_V),
            Opcode::Store => ("store", F::MEMORY.union(F::VOLATILE), S::X_V_V),
            Opcode::MemFence => ("mem_fence", F::VOLATILE, S::X),
            Opcode::ZExt => ("zext", NONE, S::V_V),
            Opcode::SExt => ("sext", NONE, S::V_V),
            Opcode::Trunc => ("trunc", NONE, S::V_V),
            Opcode::Cast => ("cast", NONE, S::V_V),
            Opcode::Convert => ("convert", NONE, S::V_V),
            Opcode::Add => ("add", ARITH, S::V_V_V),
            Opcode::Sub => ("sub", ARITH, S::V_V_V),
            Opcode::Mul => ("mul", ARITH, S::V_V_V),
            Opcode::MulH => ("mulh", ARITH, S::V_V_V),
            Opcode::Div => ("div", ARITH, S::V_V_V),
            Opcode::Neg => ("neg", NONE, S::V_V),
            Opcode::Not => ("not", NONE, S::V_V),
            Opcode::And => ("and", NONE, S::V_V_V),
            Opcode::Or => ("or", NONE, S::V_V_V),
            Opcode::Xor => ("xor", NONE, S::V_V_V),
            Opcode::Shl => ("shl", NONE, S::V_V_V),
            Opcode::Shr => ("shr", NONE, S::V_V_V),
            Opcode::ShrA => ("shra", NONE, S::V_V_V),
            Opcode::Ctlz => ("ctlz", NONE, S::V_V),
            Opcode::Cmp => ("cmp", F::COMPARE, S::V_V_V),
            Opcode::Select => ("select", NONE, S::V_V_V_V),
            Opcode::Extract => ("extract", F::COMPONENT, S::V_V_V),
            Opcode::Insert => ("insert", F::COMPONENT, S::V_V_V_V),
            Opcode::Splat => ("splat", F::COMPONENT, S::V_V),
            Opcode::VAdd => ("vadd", F::COMPONENT.union(ARITH), S::V_V_V),
            Opcode::VSub => ("vsub", F::COMPONENT.union(ARITH), S::V_V_V),
        };
        OpcodeInfo { name, flags, signature }
    }
}

const _: () = {
    let mut i = 0;
    while i < OPCODE_COUNT {
        assert!(Opcode::ALL[i] as usize == i);
        i += 1;
    }
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub flags: OpcodeInfoFlags,
    pub signature: OpcodeSignature,
}

impl OpcodeInfo {
    /// Marker stored in the slot past the last opcode.
    pub const INVALID: OpcodeInfo = OpcodeInfo {
        name: "invalid",
        flags: OpcodeInfoFlags::empty(),
        signature: OpcodeSignature::X,
    };

    /// Looks up metadata by raw opcode index, returning [`OpcodeInfo::INVALID`] for anything out of range.
    pub fn lookup(index: usize) -> &'static OpcodeInfo {
        OPCODE_INFO.get(index).unwrap_or(&OPCODE_INFO[OPCODE_COUNT])
    }

    pub fn is_invalid(&self) -> bool {
        self.name == OpcodeInfo::INVALID.name
    }
}

static OPCODE_INFO: [OpcodeInfo; OPCODE_COUNT + 1] = build_opcode_table();

const fn build_opcode_table() -> [OpcodeInfo; OPCODE_COUNT + 1] {
    let mut table = [OpcodeInfo::INVALID; OPCODE_COUNT + 1];
    let mut i = 0;
    while i < OPCODE_COUNT {
        table[i] = Opcode::ALL[i].describe();
        i += 1;
    }
    table
}
