mod builder;
mod function;
mod opcodes;
mod types;
mod value;

pub use builder::Builder;
pub use function::{Block, BlockRef, Function, FunctionRef, InstrRef, Instruction, Operand, ValueRef};
pub use opcodes::{
    component_flags, component_type, ArithmeticFlags, CallFlags, CompareFlags, MemoryFlags, Opcode,
    OpcodeInfo, OpcodeInfoFlags, OpcodeSignature, OpcodeSignatureType, OPCODE_COUNT,
};
pub use types::Type;
pub use value::{Constant, Value, ValueFlags, ValueParent};
