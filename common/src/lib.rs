use core::fmt;

pub mod cli;
pub mod util;

/// 128-bit vector register payload.
///
/// Lanes are numbered from the least significant end, so `u32(0)` is bits 0..32.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct V128(pub u128);

impl V128 {
    pub const ZERO: V128 = V128(0);

    pub fn from_u32(lanes: [u32; 4]) -> Self {
        let mut value = 0u128;
        for (i, lane) in lanes.iter().enumerate() {
            value |= (*lane as u128) << (i * 32);
        }
        V128(value)
    }

    pub fn from_u64(lanes: [u64; 2]) -> Self {
        V128((lanes[0] as u128) | ((lanes[1] as u128) << 64))
    }

    #[inline(always)]
    pub fn u8(&self, lane: usize) -> u8 {
        (self.0 >> (lane * 8)) as u8
    }

    #[inline(always)]
    pub fn u16(&self, lane: usize) -> u16 {
        (self.0 >> (lane * 16)) as u16
    }

    #[inline(always)]
    pub fn u32(&self, lane: usize) -> u32 {
        (self.0 >> (lane * 32)) as u32
    }

    #[inline(always)]
    pub fn u64(&self, lane: usize) -> u64 {
        (self.0 >> (lane * 64)) as u64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for V128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V128({:032x})", self.0)
    }
}

/// 256-bit vector payload, low half first.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct V256(pub [u128; 2]);

impl V256 {
    pub const ZERO: V256 = V256([0, 0]);

    pub fn lo(&self) -> V128 {
        V128(self.0[0])
    }

    pub fn hi(&self) -> V128 {
        V128(self.0[1])
    }
}

impl fmt::Debug for V256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V256({:032x}{:032x})", self.0[1], self.0[0])
    }
}
