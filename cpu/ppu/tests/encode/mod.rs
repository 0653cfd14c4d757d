//! Assembles the few instruction shapes the tests need.
#![allow(dead_code)]

pub const RC: u32 = 1;

pub fn d(opcode: u32, rd: u32, ra: u32, imm: i16) -> u32 {
    opcode << 26 | rd << 21 | ra << 16 | imm as u16 as u32
}

pub fn x(xo: u32, rs: u32, ra: u32, rb: u32) -> u32 {
    31 << 26 | rs << 21 | ra << 16 | rb << 11 | xo << 1
}

pub fn xo(xo: u32, rd: u32, ra: u32, rb: u32, oe: bool) -> u32 {
    31 << 26 | rd << 21 | ra << 16 | rb << 11 | (oe as u32) << 10 | xo << 1
}

pub fn m(opcode: u32, rs: u32, ra: u32, sh: u32, mb: u32, me: u32) -> u32 {
    opcode << 26 | rs << 21 | ra << 16 | sh << 11 | mb << 6 | me << 1
}

/// `crfd` and the L bit share the rd field of compare forms.
pub fn cmp_d(opcode: u32, crfd: u32, l: bool, ra: u32, imm: i16) -> u32 {
    d(opcode, crfd << 2 | l as u32, ra, imm)
}

/// MD form. The sixth bits of `sh` and `mb` sit apart from their low five.
pub fn md(xo: u32, rs: u32, ra: u32, sh: u32, mb: u32) -> u32 {
    30 << 26 | rs << 21 | ra << 16 | (sh & 31) << 11 | (mb & 31) << 6 | (mb >> 5) << 5 | xo << 2 | (sh >> 5) << 1
}

/// XS form (`sradi`), with the same split shift field as MD.
pub fn xs(xo: u32, rs: u32, ra: u32, sh: u32) -> u32 {
    31 << 26 | rs << 21 | ra << 16 | (sh & 31) << 11 | xo << 2 | (sh >> 5) << 1
}
