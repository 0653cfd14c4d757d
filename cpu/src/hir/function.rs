use std::cell::Cell;
use std::fmt;

use super::opcodes::{
    component_type, ArithmeticFlags, CompareFlags, MemoryFlags, Opcode, OpcodeInfoFlags,
};
use super::types::Type;
use super::value::{Value, ValueParent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ValueRef(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InstrRef(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockRef(pub(crate) u32);

/// Callee handle. Resolved by whoever links translated functions together.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FunctionRef(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    Immediate(u64),
    Value(ValueRef),
    Block(BlockRef),
    Function(FunctionRef),
}

impl Operand {
    pub fn value(self) -> Option<ValueRef> {
        match self {
            Operand::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub flags: u32,
    pub dest: Option<ValueRef>,
    pub src: [Operand; 3],
    pub block: BlockRef,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub instructions: Vec<InstrRef>,
}

/// Arena owning every value, instruction and block of one translated function.
pub struct Function {
    name: String,
    values: Vec<Value>,
    instructions: Vec<Instruction>,
    blocks: Vec<Block>,
    arguments: Vec<ValueRef>,
    return_type: Option<Type>,
    value_id_counter: Cell<u32>,
}

impl Function {
    pub fn new(name: impl Into<String>, arguments: &[Type], return_type: Option<Type>) -> Function {
        let mut function = Function {
            name: name.into(),
            values: Vec::new(),
            instructions: Vec::new(),
            blocks: Vec::new(),
            arguments: Vec::new(),
            return_type,
            value_id_counter: Cell::new(0),
        };
        for (i, &ty) in arguments.iter().enumerate() {
            let arg = function.push_value(Value::new(ty, ValueParent::Argument(i as u32)));
            function.arguments.push(arg);
        }
        function
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> Option<Type> {
        self.return_type
    }

    pub fn arguments(&self) -> &[ValueRef] {
        &self.arguments
    }

    pub fn value(&self, v: ValueRef) -> &Value {
        &self.values[v.0 as usize]
    }

    pub fn instruction(&self, i: InstrRef) -> &Instruction {
        &self.instructions[i.0 as usize]
    }

    pub fn block(&self, b: BlockRef) -> &Block {
        &self.blocks[b.0 as usize]
    }

    pub fn block_refs(&self) -> impl Iterator<Item = BlockRef> + '_ {
        (0..self.blocks.len() as u32).map(BlockRef)
    }

    /// All instructions in block order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.blocks
            .iter()
            .flat_map(move |b| b.instructions.iter().map(move |&i| self.instruction(i)))
    }

    pub fn value_id(&self, v: ValueRef) -> u32 {
        self.value(v).get_id(&self.value_id_counter)
    }

    pub(crate) fn push_value(&mut self, value: Value) -> ValueRef {
        self.values.push(value);
        ValueRef(self.values.len() as u32 - 1)
    }

    pub(crate) fn next_instruction(&self) -> InstrRef {
        InstrRef(self.instructions.len() as u32)
    }

    pub(crate) fn push_block(&mut self) -> BlockRef {
        self.blocks.push(Block::default());
        BlockRef(self.blocks.len() as u32 - 1)
    }

    pub(crate) fn push_instruction(&mut self, instruction: Instruction) -> InstrRef {
        let block = instruction.block;
        self.instructions.push(instruction);
        let r = InstrRef(self.instructions.len() as u32 - 1);
        self.blocks[block.0 as usize].instructions.push(r);
        r
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, operand: Operand) -> fmt::Result {
        match operand {
            Operand::None => Ok(()),
            Operand::Immediate(imm) => write!(f, "{:#x}", imm),
            Operand::Block(b) => write!(f, "block{}", b.0),
            Operand::Function(func) => write!(f, "@{}", func.0),
            Operand::Value(v) => {
                let value = self.value(v);
                if value.is_constant() {
                    match value.ty {
                        Type::F32 => write!(f, "{} {}", value.ty, value.constant.f32()),
                        Type::F64 => write!(f, "{} {}", value.ty, value.constant.f64()),
                        Type::V128 => write!(f, "{} {:032x}", value.ty, value.constant.v128().0),
                        Type::V256 => write!(f, "{} {:?}", value.ty, value.constant.v256()),
                        _ => write!(f, "{} {:#x}", value.ty, value.constant.i64()),
                    }
                } else {
                    write!(f, "v{}", self.value_id(v))
                }
            }
        }
    }

    fn fmt_flags(f: &mut fmt::Formatter<'_>, instr: &Instruction) -> fmt::Result {
        let info = instr.opcode.info();
        if info.flags.contains(OpcodeInfoFlags::COMPARE) {
            write!(f, ".{}", CompareFlags::from_bits_truncate(instr.flags).mnemonic())?;
        }
        if info.flags.contains(OpcodeInfoFlags::ARITHMETIC)
            && ArithmeticFlags::from_bits_truncate(instr.flags).contains(ArithmeticFlags::UNSIGNED)
        {
            f.write_str(".u")?;
        }
        if info.flags.contains(OpcodeInfoFlags::COMPONENT) {
            if let Some(ty) = component_type(instr.flags) {
                write!(f, ".{}", ty)?;
            }
        }
        if info.flags.contains(OpcodeInfoFlags::MEMORY) {
            let flags = MemoryFlags::from_bits_truncate(instr.flags);
            if flags.contains(MemoryFlags::ENDIAN_BIG) {
                f.write_str(".be")?;
            } else if flags.contains(MemoryFlags::ENDIAN_LITTLE) {
                f.write_str(".le")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        for (i, &arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "v{}: {}", self.value_id(arg), self.value(arg).ty)?;
        }
        f.write_str(")")?;
        if let Some(ty) = self.return_type {
            write!(f, " -> {}", ty)?;
        }
        f.write_str(" {\n")?;

        for block in self.block_refs() {
            writeln!(f, "block{}:", block.0)?;
            for &i in &self.block(block).instructions {
                let instr = self.instruction(i);
                f.write_str("    ")?;
                if let Some(dest) = instr.dest {
                    write!(f, "v{} = ", self.value_id(dest))?;
                }
                f.write_str(instr.opcode.name())?;
                Self::fmt_flags(f, instr)?;
                if let Some(dest) = instr.dest {
                    write!(f, ".{}", self.value(dest).ty)?;
                }
                let mut first = true;
                for &operand in instr.src.iter().filter(|o| **o != Operand::None) {
                    f.write_str(if first { " " } else { ", " })?;
                    first = false;
                    self.fmt_operand(f, operand)?;
                }
                f.write_str("\n")?;
            }
        }
        f.write_str("}\n")
    }
}
