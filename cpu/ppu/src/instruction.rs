use std::fmt;

use common::util::sign_extend;
use modular_bitfield::{bitfield, specifiers::*};

use crate::tables::{get_entry, Entry};

// Field views over one instruction word. Fields are listed from the least
// significant bit, so PowerPC bit 31 comes first.

#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct DForm {
    pub d: B16,
    pub ra: B5,
    pub rd: B5,
    #[skip]
    opcode: B6,
}

#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct DsForm {
    pub xo: B2,
    pub ds: B14,
    pub ra: B5,
    pub rd: B5,
    #[skip]
    opcode: B6,
}

#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct XForm {
    pub rc: bool,
    pub xo: B10,
    pub rb: B5,
    pub ra: B5,
    pub rs: B5,
    #[skip]
    opcode: B6,
}

#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct XoForm {
    pub rc: bool,
    pub xo: B9,
    pub oe: bool,
    pub rb: B5,
    pub ra: B5,
    pub rd: B5,
    #[skip]
    opcode: B6,
}

#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct MForm {
    pub rc: bool,
    pub me: B5,
    pub mb: B5,
    pub sh: B5,
    pub ra: B5,
    pub rs: B5,
    #[skip]
    opcode: B6,
}

/// 64-bit rotate form. Shift and mask fields keep their sixth bit apart from the rest.
#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct MdForm {
    pub rc: bool,
    pub sh_hi: bool,
    pub xo: B3,
    pub mb_hi: bool,
    pub mb: B5,
    pub sh: B5,
    pub ra: B5,
    pub rs: B5,
    #[skip]
    opcode: B6,
}

#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct CmpForm {
    #[skip]
    xo: B11,
    pub rb: B5,
    pub ra: B5,
    pub l10: bool,
    #[skip]
    reserved: B1,
    pub crfd: B3,
    #[skip]
    opcode: B6,
}

/// One decoded PPU instruction word.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
    #[inline(always)]
    fn bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn d_form(self) -> DForm {
        DForm::from_bytes(self.bytes())
    }

    pub fn ds_form(self) -> DsForm {
        DsForm::from_bytes(self.bytes())
    }

    pub fn x_form(self) -> XForm {
        XForm::from_bytes(self.bytes())
    }

    pub fn xo_form(self) -> XoForm {
        XoForm::from_bytes(self.bytes())
    }

    pub fn m_form(self) -> MForm {
        MForm::from_bytes(self.bytes())
    }

    pub fn md_form(self) -> MdForm {
        MdForm::from_bytes(self.bytes())
    }

    pub fn cmp_form(self) -> CmpForm {
        CmpForm::from_bytes(self.bytes())
    }

    pub fn opcode(self) -> u32 {
        self.0 >> 26
    }

    pub fn rd(self) -> usize {
        self.d_form().rd() as usize
    }

    pub fn rs(self) -> usize {
        self.rd()
    }

    pub fn frd(self) -> usize {
        self.rd()
    }

    pub fn frs(self) -> usize {
        self.rd()
    }

    pub fn ra(self) -> usize {
        self.d_form().ra() as usize
    }

    pub fn rb(self) -> usize {
        self.x_form().rb() as usize
    }

    /// Sign-extended 16-bit immediate.
    pub fn simm(self) -> i64 {
        self.d_form().d() as i16 as i64
    }

    pub fn uimm(self) -> u64 {
        self.d_form().d() as u64
    }

    /// Load/store displacement.
    pub fn d(self) -> i64 {
        self.simm()
    }

    /// DS-form displacement in words (not yet shifted by 2).
    pub fn ds(self) -> i64 {
        sign_extend(self.ds_form().ds() as u64, 14) as i64
    }

    pub fn ds_xo(self) -> usize {
        self.ds_form().xo() as usize
    }

    /// 10-bit extended opcode. For XO-forms this includes the OE bit at 0x200.
    pub fn xo(self) -> usize {
        self.x_form().xo() as usize
    }

    pub fn md_xo(self) -> usize {
        self.md_form().xo() as usize
    }

    pub fn oe(self) -> bool {
        self.xo_form().oe()
    }

    pub fn rc(self) -> bool {
        self.x_form().rc()
    }

    pub fn l10(self) -> bool {
        self.cmp_form().l10()
    }

    pub fn crfd(self) -> usize {
        self.cmp_form().crfd() as usize
    }

    pub fn sh(self) -> u32 {
        self.m_form().sh() as u32
    }

    pub fn mb(self) -> u32 {
        self.m_form().mb() as u32
    }

    pub fn me(self) -> u32 {
        self.m_form().me() as u32
    }

    pub fn sh64(self) -> u32 {
        let md = self.md_form();
        md.sh() as u32 | (md.sh_hi() as u32) << 5
    }

    pub fn mb64(self) -> u32 {
        let md = self.md_form();
        md.mb() as u32 | (md.mb_hi() as u32) << 5
    }

    /// Mask end of `rldicr`; shares its encoding with `mb64`.
    pub fn me64(self) -> u32 {
        self.mb64()
    }

    /// Mnemonic from the dispatch tables, or "invalid".
    pub fn name(self) -> &'static str {
        match get_entry(self) {
            Entry::Instruction(name, _) => name,
            _ => "invalid",
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:08x})", self.name(), self.0)
    }
}
