use std::mem::offset_of;

use cpu::hir::Type;

/// Guest thread state as laid out in memory. Translated code addresses it
/// through `CtxLoad`/`CtxStore` byte offsets.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct PpuState {
    pub gpr: [u64; 32],
    pub fpr: [f64; 32],
    /// One condition field per byte, low nibble `lt:gt:eq:so`.
    pub cr: [u8; 8],
    pub xer_so: u8,
    pub xer_ca: u8,
}

/// A guest register that the translator caches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reg {
    Gpr(u8),
    Fpr(u8),
    Cr(u8),
    XerSo,
    XerCa,
}

impl Reg {
    pub fn offset(self) -> usize {
        match self {
            Reg::Gpr(i) => offset_of!(PpuState, gpr) + 8 * i as usize,
            Reg::Fpr(i) => offset_of!(PpuState, fpr) + 8 * i as usize,
            Reg::Cr(i) => offset_of!(PpuState, cr) + i as usize,
            Reg::XerSo => offset_of!(PpuState, xer_so),
            Reg::XerCa => offset_of!(PpuState, xer_ca),
        }
    }

    pub fn ty(self) -> Type {
        match self {
            Reg::Gpr(_) => Type::I64,
            Reg::Fpr(_) => Type::F64,
            Reg::Cr(_) | Reg::XerSo | Reg::XerCa => Type::I8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets() {
        assert_eq!(Reg::Gpr(0).offset(), 0);
        assert_eq!(Reg::Gpr(31).offset(), 31 * 8);
        assert_eq!(Reg::Fpr(0).offset(), 32 * 8);
        assert_eq!(Reg::Cr(0).offset(), 64 * 8);
        assert_eq!(Reg::Cr(7).offset(), 64 * 8 + 7);
        assert_eq!(Reg::XerSo.offset(), 64 * 8 + 8);
        assert_eq!(Reg::XerCa.offset(), 64 * 8 + 9);
    }

    fn read<T: Copy>(state: &PpuState, reg: Reg) -> T {
        assert_eq!(std::mem::size_of::<T>(), reg.ty().size());
        let base = state as *const PpuState as *const u8;
        unsafe { std::ptr::read_unaligned(base.add(reg.offset()) as *const T) }
    }

    #[test]
    fn offsets_address_the_struct_fields() {
        let mut state = PpuState::default();
        state.gpr[3] = 0x0102_0304_0506_0708;
        state.fpr[1] = 1.5;
        state.cr[2] = 0b0100;
        state.xer_so = 1;
        state.xer_ca = 2;

        assert_eq!(read::<u64>(&state, Reg::Gpr(3)), 0x0102_0304_0506_0708);
        assert_eq!(read::<f64>(&state, Reg::Fpr(1)), 1.5);
        assert_eq!(read::<u8>(&state, Reg::Cr(2)), 0b0100);
        assert_eq!(read::<u8>(&state, Reg::XerSo), 1);
        assert_eq!(read::<u8>(&state, Reg::XerCa), 2);
        assert!(Reg::XerCa.offset() < std::mem::size_of::<PpuState>());
    }
}
