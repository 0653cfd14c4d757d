/// Host page granularity used for committing guest memory.
pub const PAGE_SIZE: u32 = 0x1000;

#[inline(always)]
pub const fn is_power_of_two(value: u32) -> bool {
    value != 0 && (value & (value - 1)) == 0
}

/// Rounds `value` up to a multiple of `align`, which must be a power of two.
/// Returns `None` if the result does not fit.
#[inline(always)]
pub const fn align_up(value: u64, align: u64) -> Option<u64> {
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

#[inline(always)]
pub const fn align_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}

/// Sign extends the low `bits` bits of `value` to 64 bits.
#[inline(always)]
pub const fn sign_extend(value: u64, bits: u32) -> u64 {
    let shift = 64 - bits;
    (((value << shift) as i64) >> shift) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment() {
        assert_eq!(align_up(0x1001, 0x1000), Some(0x2000));
        assert_eq!(align_up(0x1000, 0x1000), Some(0x1000));
        assert_eq!(align_up(u64::MAX, 0x1000), None);
        assert_eq!(align_down(0x1fff, 0x1000), 0x1000);
        assert!(is_power_of_two(0x1000));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(0x1800));
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0xffff, 16), u64::MAX);
        assert_eq!(sign_extend(0x7fff, 16), 0x7fff);
        assert_eq!(sign_extend(0x2000, 14), 0xffff_ffff_ffff_e000);
    }
}
