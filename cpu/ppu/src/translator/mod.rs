//! Lowers PPU instructions to HIR.
//!
//! Guest registers live in a per-translation cache. The first read of a
//! register loads it from the thread state; writes stay in the cache and are
//! stored back when the function is finished.

use std::collections::BTreeMap;
use std::sync::Arc;

use ::memory::Memory;
use cpu::hir::{Builder, Function, MemoryFlags, Type, ValueRef};
use tracing::{error, trace};

use crate::error::{TranslateError, Unimplemented};
use crate::instruction::Instruction;
use crate::state::Reg;
use crate::tables::{get_entry, Entry};

mod integer;
mod memory;

pub(crate) type HandlerResult = Result<(), Unimplemented>;

#[derive(Debug, Copy, Clone)]
struct Cached {
    value: ValueRef,
    dirty: bool,
}

pub struct Translator {
    builder: Builder,
    memory: Arc<Memory>,
    registers: BTreeMap<Reg, Cached>,
    address: u32,
}

impl Translator {
    pub fn new(name: impl Into<String>, memory: Arc<Memory>) -> Translator {
        let function = Function::new(name, &[], None);
        Translator {
            builder: Builder::new(function),
            memory,
            registers: BTreeMap::new(),
            address: 0,
        }
    }

    pub fn builder(&mut self) -> &mut Builder {
        &mut self.builder
    }

    pub fn function(&self) -> &Function {
        self.builder.function()
    }

    /// Guest address of the instruction being translated.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn translate(&mut self, address: u32, word: u32) -> Result<(), TranslateError> {
        let code = Instruction(word);
        self.address = address;

        match get_entry(code) {
            Entry::Instruction(name, handler) => {
                trace!("{address:#010x}: {name} ({word:08x})");
                handler(self, code).map_err(|Unimplemented(feature)| {
                    error!("{address:#010x}: {name} needs unimplemented {feature}");
                    TranslateError::Unimplemented { name, address, feature }
                })
            }
            _ => Err(TranslateError::InvalidInstruction { address, word }),
        }
    }

    /// Translates consecutive words starting at `address`, stopping at the first error.
    pub fn translate_block(&mut self, address: u32, words: &[u32]) -> Result<(), TranslateError> {
        for (i, &word) in words.iter().enumerate() {
            self.translate(address.wrapping_add(4 * i as u32), word)?;
        }
        Ok(())
    }

    /// Writes back modified registers and closes the function.
    pub fn finish(mut self) -> Function {
        for (reg, cached) in self.registers.iter_mut() {
            if cached.dirty {
                self.builder.create_ctx_store(reg.offset(), cached.value);
                cached.dirty = false;
            }
        }
        self.builder.create_ret(None);
        self.builder.finish()
    }

    fn read_reg(&mut self, reg: Reg) -> ValueRef {
        if let Some(cached) = self.registers.get(&reg) {
            return cached.value;
        }
        let value = self.builder.create_ctx_load(reg.offset(), reg.ty());
        self.registers.insert(reg, Cached { value, dirty: false });
        value
    }

    fn write_reg(&mut self, reg: Reg, value: ValueRef) {
        let ty = self.builder.ty(value);
        if ty != reg.ty() {
            panic!("{:?} holds {}, got {}", reg, reg.ty(), ty);
        }
        self.registers.insert(reg, Cached { value, dirty: true });
    }

    pub fn get_gpr(&mut self, index: usize) -> ValueRef {
        self.read_reg(Reg::Gpr(index as u8))
    }

    /// Low bits of a GPR as `ty`.
    pub fn get_gpr_as(&mut self, index: usize, ty: Type) -> ValueRef {
        let value = self.get_gpr(index);
        self.builder.create_trunc(value, ty)
    }

    /// Narrower integers are zero-extended to 64 bits.
    pub fn set_gpr(&mut self, index: usize, value: ValueRef) {
        let value = match self.builder.ty(value) {
            Type::I64 => value,
            Type::I8 | Type::I16 | Type::I32 => self.builder.create_zext(value, Type::I64),
            ty => panic!("gpr write of {}", ty),
        };
        self.write_reg(Reg::Gpr(index as u8), value);
    }

    pub fn get_fpr(&mut self, index: usize) -> ValueRef {
        self.read_reg(Reg::Fpr(index as u8))
    }

    /// Single precision values are widened to double.
    pub fn set_fpr(&mut self, index: usize, value: ValueRef) {
        let value = match self.builder.ty(value) {
            Type::F64 => value,
            Type::F32 => self.builder.create_convert(value, Type::F64),
            ty => panic!("fpr write of {}", ty),
        };
        self.write_reg(Reg::Fpr(index as u8), value);
    }

    pub fn get_xer_ca(&mut self) -> ValueRef {
        self.read_reg(Reg::XerCa)
    }

    pub fn set_xer_ca(&mut self, value: ValueRef) {
        self.write_reg(Reg::XerCa, value);
    }

    pub fn get_xer_so(&mut self) -> ValueRef {
        self.read_reg(Reg::XerSo)
    }

    pub fn set_xer_so(&mut self, value: ValueRef) {
        self.write_reg(Reg::XerSo, value);
    }

    pub fn get_cr_field(&mut self, index: usize) -> ValueRef {
        self.read_reg(Reg::Cr(index as u8))
    }

    pub fn set_cr_field(&mut self, index: usize, value: ValueRef) {
        self.write_reg(Reg::Cr(index as u8), value);
    }

    /// Sets CR `field` to `lt:gt:eq:so` from comparing `lhs` with `rhs`.
    pub fn update_cr(&mut self, field: usize, lhs: ValueRef, rhs: ValueRef, logical: bool) {
        let so = self.get_xer_so();
        let b = &mut self.builder;
        let (lt, gt) = if logical {
            (b.create_cmp_ult(lhs, rhs), b.create_cmp_ugt(lhs, rhs))
        } else {
            (b.create_cmp_slt(lhs, rhs), b.create_cmp_sgt(lhs, rhs))
        };
        let eq = b.create_cmp_eq(lhs, rhs);

        let lt = b.create_shl_imm(lt, 3);
        let gt = b.create_shl_imm(gt, 2);
        let eq = b.create_shl_imm(eq, 1);
        let high = b.create_or(lt, gt);
        let low = b.create_or(eq, so);
        let cr = b.create_or(high, low);
        self.set_cr_field(field, cr);
    }

    /// Signed comparison of a result against zero, into CR0.
    pub fn update_cr0(&mut self, value: ValueRef) {
        let ty = self.builder.ty(value);
        let zero = self.builder.get_constant_int(ty, 0);
        self.update_cr(0, value, zero, false);
    }

    // Guest addresses wrap at 32 bits inside the reserved window.
    fn host_address(&mut self, addr: ValueRef) -> ValueRef {
        let b = &mut self.builder;
        let addr = b.create_trunc(addr, Type::I32);
        let addr = b.create_zext(addr, Type::I64);
        let base = b.get_constant_i64(self.memory.base() as u64);
        b.create_add(base, addr)
    }

    /// Big-endian load of `ty` from guest address `addr`.
    pub fn read_memory(&mut self, addr: ValueRef, ty: Type) -> ValueRef {
        let host = self.host_address(addr);
        self.builder.create_load(host, ty, MemoryFlags::ENDIAN_BIG)
    }

    pub fn write_memory(&mut self, addr: ValueRef, value: ValueRef) {
        let host = self.host_address(addr);
        self.builder.create_store(host, value, MemoryFlags::ENDIAN_BIG);
    }

    /// Handler for encodings that decode but have no lowering.
    pub(crate) fn unsupported(&mut self, _code: Instruction) -> HandlerResult {
        Err(Unimplemented("lowering for this instruction"))
    }
}
