/// `ROTATE_MASK[mb][me]` has bits `mb..=me` set, counting from the most
/// significant bit. When `mb > me` the run wraps around.
pub static ROTATE_MASK: [[u64; 64]; 64] = build_rotate_mask();

const fn build_rotate_mask() -> [[u64; 64]; 64] {
    let mut table = [[0u64; 64]; 64];
    let mut mb = 0;
    while mb < 64 {
        let mut me = 0;
        while me < 64 {
            let tail = if me >= 63 { 0 } else { !0u64 >> (me + 1) };
            let mask = (!0u64 >> mb) ^ tail;
            table[mb][me] = if mb > me { !mask } else { mask };
            me += 1;
        }
        mb += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_masks() {
        assert_eq!(ROTATE_MASK[0][63], u64::MAX);
        assert_eq!(ROTATE_MASK[32][63], 0xffff_ffff);
        assert_eq!(ROTATE_MASK[0][31], 0xffff_ffff_0000_0000);
        assert_eq!(ROTATE_MASK[63][63], 1);
        assert_eq!(ROTATE_MASK[0][0], 1 << 63);
    }

    #[test]
    fn wrapped_masks() {
        assert_eq!(ROTATE_MASK[63][0], (1 << 63) | 1);
        assert_eq!(ROTATE_MASK[1][0], u64::MAX);
        assert_eq!(ROTATE_MASK[60][3], 0xf000_0000_0000_000f);
    }

    #[test]
    fn mask_width() {
        for mb in 0..64u32 {
            for me in 0..64u32 {
                let expected = if mb <= me { me - mb + 1 } else { 64 - (mb - me - 1) };
                assert_eq!(
                    ROTATE_MASK[mb as usize][me as usize].count_ones(),
                    expected,
                    "mb={mb} me={me}"
                );
            }
        }
    }
}
