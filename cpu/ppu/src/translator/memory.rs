use cpu::hir::{Type, ValueRef};

use super::{HandlerResult, Translator};
use crate::error::Unimplemented;
use crate::instruction::Instruction;

const BYTE_REVERSED: Unimplemented = Unimplemented("byte-reversed access");
const MULTIPLE: Unimplemented = Unimplemented("load/store multiple");
const STRING: Unimplemented = Unimplemented("string access");

/// Effective address forms. `Update` variants write the address back to ra.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    D,
    DUpdate,
    Ds,
    DsUpdate,
    X,
    XUpdate,
}

impl Mode {
    fn update(self) -> bool {
        matches!(self, Mode::DUpdate | Mode::DsUpdate | Mode::XUpdate)
    }
}

#[derive(Debug, Copy, Clone)]
enum Extend {
    Zero,
    Sign,
}

impl Translator {
    fn effective_address(&mut self, code: Instruction, mode: Mode) -> ValueRef {
        let offset = match mode {
            Mode::D | Mode::DUpdate => self.builder.get_constant_i64(code.d() as u64),
            Mode::Ds | Mode::DsUpdate => self.builder.get_constant_i64((code.ds() << 2) as u64),
            Mode::X | Mode::XUpdate => self.get_gpr(code.rb()),
        };
        // ra == 0 means a literal zero unless the form updates ra.
        if code.ra() == 0 && !mode.update() {
            return offset;
        }
        let ra = self.get_gpr(code.ra());
        self.builder.create_add(ra, offset)
    }

    fn write_back(&mut self, code: Instruction, mode: Mode, addr: ValueRef) {
        if mode.update() {
            self.set_gpr(code.ra(), addr);
        }
    }

    fn load_int(&mut self, code: Instruction, mode: Mode, ty: Type, extend: Extend) -> HandlerResult {
        let addr = self.effective_address(code, mode);
        let value = self.read_memory(addr, ty);
        let value = match extend {
            Extend::Zero => self.builder.create_zext(value, Type::I64),
            Extend::Sign => self.builder.create_sext(value, Type::I64),
        };
        self.set_gpr(code.rd(), value);
        self.write_back(code, mode, addr);
        Ok(())
    }

    fn store_int(&mut self, code: Instruction, mode: Mode, ty: Type) -> HandlerResult {
        let addr = self.effective_address(code, mode);
        let value = self.get_gpr_as(code.rs(), ty);
        self.write_memory(addr, value);
        self.write_back(code, mode, addr);
        Ok(())
    }

    fn load_float(&mut self, code: Instruction, mode: Mode, ty: Type) -> HandlerResult {
        let addr = self.effective_address(code, mode);
        let value = self.read_memory(addr, ty);
        self.set_fpr(code.frd(), value);
        self.write_back(code, mode, addr);
        Ok(())
    }

    fn store_float(&mut self, code: Instruction, mode: Mode, ty: Type) -> HandlerResult {
        let addr = self.effective_address(code, mode);
        let frs = self.get_fpr(code.frs());
        let value = self.builder.create_convert(frs, ty);
        self.write_memory(addr, value);
        self.write_back(code, mode, addr);
        Ok(())
    }

    // Store conditional always succeeds: CR0 reports EQ.
    fn store_conditional(&mut self, code: Instruction, ty: Type) -> HandlerResult {
        let success = self.builder.get_constant_i8(0b0010);
        self.set_cr_field(0, success);
        self.store_int(code, Mode::X, ty)
    }

    pub(crate) fn lbz(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::D, Type::I8, Extend::Zero)
    }

    pub(crate) fn lbzu(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::DUpdate, Type::I8, Extend::Zero)
    }

    pub(crate) fn lbzux(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::XUpdate, Type::I8, Extend::Zero)
    }

    pub(crate) fn lbzx(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I8, Extend::Zero)
    }

    pub(crate) fn lhz(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::D, Type::I16, Extend::Zero)
    }

    pub(crate) fn lhzu(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::DUpdate, Type::I16, Extend::Zero)
    }

    pub(crate) fn lhzux(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::XUpdate, Type::I16, Extend::Zero)
    }

    pub(crate) fn lhzx(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I16, Extend::Zero)
    }

    pub(crate) fn lha(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::D, Type::I16, Extend::Sign)
    }

    pub(crate) fn lhau(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::DUpdate, Type::I16, Extend::Sign)
    }

    pub(crate) fn lhaux(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::XUpdate, Type::I16, Extend::Sign)
    }

    pub(crate) fn lhax(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I16, Extend::Sign)
    }

    pub(crate) fn lwz(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::D, Type::I32, Extend::Zero)
    }

    pub(crate) fn lwzu(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::DUpdate, Type::I32, Extend::Zero)
    }

    pub(crate) fn lwzux(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::XUpdate, Type::I32, Extend::Zero)
    }

    pub(crate) fn lwzx(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I32, Extend::Zero)
    }

    pub(crate) fn lwa(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::Ds, Type::I32, Extend::Sign)
    }

    pub(crate) fn lwaux(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::XUpdate, Type::I32, Extend::Sign)
    }

    pub(crate) fn lwax(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I32, Extend::Sign)
    }

    pub(crate) fn ld(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::Ds, Type::I64, Extend::Zero)
    }

    pub(crate) fn ldu(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::DsUpdate, Type::I64, Extend::Zero)
    }

    pub(crate) fn ldux(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::XUpdate, Type::I64, Extend::Zero)
    }

    pub(crate) fn ldx(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I64, Extend::Zero)
    }

    // Reservations are not tracked; the reserving loads are plain loads.

    pub(crate) fn lwarx(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I32, Extend::Zero)
    }

    pub(crate) fn ldarx(&mut self, code: Instruction) -> HandlerResult {
        self.load_int(code, Mode::X, Type::I64, Extend::Zero)
    }

    pub(crate) fn stwcx_(&mut self, code: Instruction) -> HandlerResult {
        self.store_conditional(code, Type::I32)
    }

    pub(crate) fn stdcx_(&mut self, code: Instruction) -> HandlerResult {
        self.store_conditional(code, Type::I64)
    }

    pub(crate) fn lfs(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::D, Type::F32)
    }

    pub(crate) fn lfsu(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::DUpdate, Type::F32)
    }

    pub(crate) fn lfsux(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::XUpdate, Type::F32)
    }

    pub(crate) fn lfsx(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::X, Type::F32)
    }

    pub(crate) fn lfd(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::D, Type::F64)
    }

    pub(crate) fn lfdu(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::DUpdate, Type::F64)
    }

    pub(crate) fn lfdux(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::XUpdate, Type::F64)
    }

    pub(crate) fn lfdx(&mut self, code: Instruction) -> HandlerResult {
        self.load_float(code, Mode::X, Type::F64)
    }

    pub(crate) fn stb(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::D, Type::I8)
    }

    pub(crate) fn stbu(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::DUpdate, Type::I8)
    }

    pub(crate) fn stbux(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::XUpdate, Type::I8)
    }

    pub(crate) fn stbx(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::X, Type::I8)
    }

    pub(crate) fn sth(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::D, Type::I16)
    }

    pub(crate) fn sthu(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::DUpdate, Type::I16)
    }

    pub(crate) fn sthux(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::XUpdate, Type::I16)
    }

    pub(crate) fn sthx(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::X, Type::I16)
    }

    pub(crate) fn stw(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::D, Type::I32)
    }

    pub(crate) fn stwu(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::DUpdate, Type::I32)
    }

    pub(crate) fn stwux(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::XUpdate, Type::I32)
    }

    pub(crate) fn stwx(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::X, Type::I32)
    }

    pub(crate) fn std(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::Ds, Type::I64)
    }

    pub(crate) fn stdu(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::DsUpdate, Type::I64)
    }

    pub(crate) fn stdux(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::XUpdate, Type::I64)
    }

    pub(crate) fn stdx(&mut self, code: Instruction) -> HandlerResult {
        self.store_int(code, Mode::X, Type::I64)
    }

    pub(crate) fn stfs(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::D, Type::F32)
    }

    pub(crate) fn stfsu(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::DUpdate, Type::F32)
    }

    pub(crate) fn stfsux(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::XUpdate, Type::F32)
    }

    pub(crate) fn stfsx(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::X, Type::F32)
    }

    pub(crate) fn stfd(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::D, Type::F64)
    }

    pub(crate) fn stfdu(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::DUpdate, Type::F64)
    }

    pub(crate) fn stfdux(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::XUpdate, Type::F64)
    }

    pub(crate) fn stfdx(&mut self, code: Instruction) -> HandlerResult {
        self.store_float(code, Mode::X, Type::F64)
    }

    /// Stores the low word of the FPR bit pattern.
    pub(crate) fn stfiwx(&mut self, code: Instruction) -> HandlerResult {
        let addr = self.effective_address(code, Mode::X);
        let frs = self.get_fpr(code.frs());
        let bits = self.builder.create_cast(frs, Type::I64);
        let word = self.builder.create_trunc(bits, Type::I32);
        self.write_memory(addr, word);
        Ok(())
    }

    pub(crate) fn eieio(&mut self, _code: Instruction) -> HandlerResult {
        self.builder.create_mem_fence();
        Ok(())
    }

    pub(crate) fn sync(&mut self, _code: Instruction) -> HandlerResult {
        self.builder.create_mem_fence();
        Ok(())
    }

    /// Instruction fetch is not modelled, so there is nothing to discard.
    pub(crate) fn isync(&mut self, _code: Instruction) -> HandlerResult {
        Ok(())
    }

    pub(crate) fn ldbrx(&mut self, _code: Instruction) -> HandlerResult {
        Err(BYTE_REVERSED)
    }

    pub(crate) fn lhbrx(&mut self, _code: Instruction) -> HandlerResult {
        Err(BYTE_REVERSED)
    }

    pub(crate) fn lwbrx(&mut self, _code: Instruction) -> HandlerResult {
        Err(BYTE_REVERSED)
    }

    pub(crate) fn stdbrx(&mut self, _code: Instruction) -> HandlerResult {
        Err(BYTE_REVERSED)
    }

    pub(crate) fn sthbrx(&mut self, _code: Instruction) -> HandlerResult {
        Err(BYTE_REVERSED)
    }

    pub(crate) fn stwbrx(&mut self, _code: Instruction) -> HandlerResult {
        Err(BYTE_REVERSED)
    }

    pub(crate) fn lmw(&mut self, _code: Instruction) -> HandlerResult {
        Err(MULTIPLE)
    }

    pub(crate) fn stmw(&mut self, _code: Instruction) -> HandlerResult {
        Err(MULTIPLE)
    }

    pub(crate) fn lswi(&mut self, _code: Instruction) -> HandlerResult {
        Err(STRING)
    }

    pub(crate) fn lswx(&mut self, _code: Instruction) -> HandlerResult {
        Err(STRING)
    }

    pub(crate) fn stswi(&mut self, _code: Instruction) -> HandlerResult {
        Err(STRING)
    }

    pub(crate) fn stswx(&mut self, _code: Instruction) -> HandlerResult {
        Err(STRING)
    }
}
