use cpu::hir::{ArithmeticFlags, Type, ValueRef};

use super::{HandlerResult, Translator};
use crate::error::Unimplemented;
use crate::instruction::Instruction;
use crate::utils::ROTATE_MASK;

const OVERFLOW_ENABLE: Unimplemented = Unimplemented("overflow-enable (OE) form");

fn check_oe(code: Instruction) -> HandlerResult {
    if code.oe() {
        Err(OVERFLOW_ENABLE)
    } else {
        Ok(())
    }
}

impl Translator {
    /// Carry out of `lhs + x` given the wrapped sum `add`.
    pub(crate) fn add_did_carry(&mut self, add: ValueRef, lhs: ValueRef) -> ValueRef {
        self.builder.create_cmp_ult(add, lhs)
    }

    /// Carry out of `lhs - rhs`, i.e. no borrow.
    pub(crate) fn sub_did_carry(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        let b = &mut self.builder;
        let neg = b.create_neg(rhs);
        let rhs_minus_one = b.create_not(neg);
        let above = b.create_cmp_ugt(lhs, rhs_minus_one);
        let zero = b.get_constant_i64(0);
        let rhs_zero = b.create_cmp_eq(rhs, zero);
        b.create_or(above, rhs_zero)
    }

    /// Carry out of `lhs + rhs + carry`, given `partial = lhs + rhs` and
    /// `sum = partial + carry` as already emitted.
    pub(crate) fn add_with_carry_did_carry(
        &mut self,
        lhs: ValueRef,
        partial: ValueRef,
        sum: ValueRef,
        carry: ValueRef,
    ) -> ValueRef {
        let b = &mut self.builder;
        let second = b.create_cmp_ult(sum, carry);
        let first = b.create_cmp_ult(partial, lhs);
        b.create_or(second, first)
    }

    fn const_i64(&mut self, value: u64) -> ValueRef {
        self.builder.get_constant_i64(value)
    }

    fn carry_in(&mut self) -> ValueRef {
        let ca = self.get_xer_ca();
        self.builder.create_zext(ca, Type::I64)
    }

    fn record(&mut self, code: Instruction, result: ValueRef) {
        if code.rc() {
            self.update_cr0(result);
        }
    }

    // `lhs + rhs + CA` into rd, with the carry out into CA.
    fn add_extended(&mut self, code: Instruction, lhs: ValueRef, rhs: ValueRef) -> HandlerResult {
        let carry = self.carry_in();
        let partial = self.builder.create_add(lhs, rhs);
        let rd = self.builder.create_add(partial, carry);
        let ca = self.add_with_carry_did_carry(lhs, partial, rd, carry);
        self.set_gpr(code.rd(), rd);
        self.set_xer_ca(ca);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn addx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        let rd = self.builder.create_add(ra, rb);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn addcx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        let rd = self.builder.create_add(ra, rb);
        let ca = self.add_did_carry(rd, ra);
        self.set_gpr(code.rd(), rd);
        self.set_xer_ca(ca);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn addex(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        self.add_extended(code, ra, rb)
    }

    pub(crate) fn addi(&mut self, code: Instruction) -> HandlerResult {
        let simm = self.const_i64(code.simm() as u64);
        let rd = if code.ra() == 0 {
            simm
        } else {
            let ra = self.get_gpr(code.ra());
            self.builder.create_add(ra, simm)
        };
        self.set_gpr(code.rd(), rd);
        Ok(())
    }

    pub(crate) fn addic(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.get_gpr(code.ra());
        let simm = self.const_i64(code.simm() as u64);
        let rd = self.builder.create_add(ra, simm);
        let ca = self.add_did_carry(rd, ra);
        self.set_gpr(code.rd(), rd);
        self.set_xer_ca(ca);
        Ok(())
    }

    pub(crate) fn addic_(&mut self, code: Instruction) -> HandlerResult {
        self.addic(code)?;
        let rd = self.get_gpr(code.rd());
        self.update_cr0(rd);
        Ok(())
    }

    pub(crate) fn addis(&mut self, code: Instruction) -> HandlerResult {
        let simm = self.const_i64((code.simm() << 16) as u64);
        let rd = if code.ra() == 0 {
            simm
        } else {
            let ra = self.get_gpr(code.ra());
            self.builder.create_add(ra, simm)
        };
        self.set_gpr(code.rd(), rd);
        Ok(())
    }

    pub(crate) fn addmex(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let minus_one = self.const_i64(u64::MAX);
        self.add_extended(code, ra, minus_one)
    }

    pub(crate) fn addzex(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let zero = self.const_i64(0);
        self.add_extended(code, ra, zero)
    }

    // Logical operations write ra from rs.

    fn logical(&mut self, code: Instruction, f: impl FnOnce(&mut Translator, ValueRef, ValueRef) -> ValueRef) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let rb = self.get_gpr(code.rb());
        let ra = f(self, rs, rb);
        self.set_gpr(code.ra(), ra);
        self.record(code, ra);
        Ok(())
    }

    fn logical_imm(&mut self, code: Instruction, imm: u64, record: bool, f: impl FnOnce(&mut Translator, ValueRef, ValueRef) -> ValueRef) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let imm = self.const_i64(imm);
        let ra = f(self, rs, imm);
        self.set_gpr(code.ra(), ra);
        if record {
            self.update_cr0(ra);
        }
        Ok(())
    }

    pub(crate) fn andx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| t.builder.create_and(rs, rb))
    }

    pub(crate) fn andcx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| {
            let rb = t.builder.create_not(rb);
            t.builder.create_and(rs, rb)
        })
    }

    pub(crate) fn andi_(&mut self, code: Instruction) -> HandlerResult {
        self.logical_imm(code, code.uimm(), true, |t, rs, imm| t.builder.create_and(rs, imm))
    }

    pub(crate) fn andis_(&mut self, code: Instruction) -> HandlerResult {
        self.logical_imm(code, code.uimm() << 16, true, |t, rs, imm| t.builder.create_and(rs, imm))
    }

    pub(crate) fn eqvx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| {
            let x = t.builder.create_xor(rs, rb);
            t.builder.create_not(x)
        })
    }

    pub(crate) fn nandx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| {
            let x = t.builder.create_and(rs, rb);
            t.builder.create_not(x)
        })
    }

    pub(crate) fn norx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| {
            let x = t.builder.create_or(rs, rb);
            t.builder.create_not(x)
        })
    }

    pub(crate) fn orx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| t.builder.create_or(rs, rb))
    }

    pub(crate) fn orcx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| {
            let rb = t.builder.create_not(rb);
            t.builder.create_or(rs, rb)
        })
    }

    pub(crate) fn ori(&mut self, code: Instruction) -> HandlerResult {
        self.logical_imm(code, code.uimm(), false, |t, rs, imm| t.builder.create_or(rs, imm))
    }

    pub(crate) fn oris(&mut self, code: Instruction) -> HandlerResult {
        self.logical_imm(code, code.uimm() << 16, false, |t, rs, imm| t.builder.create_or(rs, imm))
    }

    pub(crate) fn xorx(&mut self, code: Instruction) -> HandlerResult {
        self.logical(code, |t, rs, rb| t.builder.create_xor(rs, rb))
    }

    pub(crate) fn xori(&mut self, code: Instruction) -> HandlerResult {
        self.logical_imm(code, code.uimm(), false, |t, rs, imm| t.builder.create_xor(rs, imm))
    }

    pub(crate) fn xoris(&mut self, code: Instruction) -> HandlerResult {
        self.logical_imm(code, code.uimm() << 16, false, |t, rs, imm| t.builder.create_xor(rs, imm))
    }

    // Compares work on doublewords when L is set, words otherwise.

    fn compare_operand(&mut self, code: Instruction, index: usize) -> ValueRef {
        if code.l10() {
            self.get_gpr(index)
        } else {
            self.get_gpr_as(index, Type::I32)
        }
    }

    fn compare_imm(&mut self, code: Instruction, imm: u64) -> ValueRef {
        let ty = if code.l10() { Type::I64 } else { Type::I32 };
        self.builder.get_constant_int(ty, imm)
    }

    pub(crate) fn cmp(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.compare_operand(code, code.ra());
        let rb = self.compare_operand(code, code.rb());
        self.update_cr(code.crfd(), ra, rb, false);
        Ok(())
    }

    pub(crate) fn cmpi(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.compare_operand(code, code.ra());
        let simm = self.compare_imm(code, code.simm() as u64);
        self.update_cr(code.crfd(), ra, simm, false);
        Ok(())
    }

    pub(crate) fn cmpl(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.compare_operand(code, code.ra());
        let rb = self.compare_operand(code, code.rb());
        self.update_cr(code.crfd(), ra, rb, true);
        Ok(())
    }

    pub(crate) fn cmpli(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.compare_operand(code, code.ra());
        let uimm = self.compare_imm(code, code.uimm());
        self.update_cr(code.crfd(), ra, uimm, true);
        Ok(())
    }

    pub(crate) fn cntlzdx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let ra = self.builder.create_ctlz(rs);
        self.set_gpr(code.ra(), ra);
        self.record(code, ra);
        Ok(())
    }

    pub(crate) fn cntlzwx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr_as(code.rs(), Type::I32);
        let count = self.builder.create_ctlz(rs);
        let ra = self.builder.create_zext(count, Type::I64);
        self.set_gpr(code.ra(), ra);
        self.record(code, ra);
        Ok(())
    }

    fn divide(&mut self, code: Instruction, ty: Type, flags: ArithmeticFlags) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr_as(code.ra(), ty);
        let rb = self.get_gpr_as(code.rb(), ty);
        let quotient = self.builder.create_div(ra, rb, flags);
        let rd = self.builder.create_zext(quotient, Type::I64);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn divdx(&mut self, code: Instruction) -> HandlerResult {
        self.divide(code, Type::I64, ArithmeticFlags::SIGNED)
    }

    pub(crate) fn divdux(&mut self, code: Instruction) -> HandlerResult {
        self.divide(code, Type::I64, ArithmeticFlags::UNSIGNED)
    }

    pub(crate) fn divwx(&mut self, code: Instruction) -> HandlerResult {
        self.divide(code, Type::I32, ArithmeticFlags::SIGNED)
    }

    pub(crate) fn divwux(&mut self, code: Instruction) -> HandlerResult {
        self.divide(code, Type::I32, ArithmeticFlags::UNSIGNED)
    }

    fn extend_sign(&mut self, code: Instruction, ty: Type) -> HandlerResult {
        let rs = self.get_gpr_as(code.rs(), ty);
        let ra = self.builder.create_sext(rs, Type::I64);
        self.set_gpr(code.ra(), ra);
        self.record(code, ra);
        Ok(())
    }

    pub(crate) fn extsbx(&mut self, code: Instruction) -> HandlerResult {
        self.extend_sign(code, Type::I8)
    }

    pub(crate) fn extshx(&mut self, code: Instruction) -> HandlerResult {
        self.extend_sign(code, Type::I16)
    }

    pub(crate) fn extswx(&mut self, code: Instruction) -> HandlerResult {
        self.extend_sign(code, Type::I32)
    }

    fn multiply_high(&mut self, code: Instruction, ty: Type, flags: ArithmeticFlags) -> HandlerResult {
        let ra = self.get_gpr_as(code.ra(), ty);
        let rb = self.get_gpr_as(code.rb(), ty);
        let high = self.builder.create_mulh(ra, rb, flags);
        let rd = self.builder.create_zext(high, Type::I64);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn mulhdx(&mut self, code: Instruction) -> HandlerResult {
        self.multiply_high(code, Type::I64, ArithmeticFlags::SIGNED)
    }

    pub(crate) fn mulhdux(&mut self, code: Instruction) -> HandlerResult {
        self.multiply_high(code, Type::I64, ArithmeticFlags::UNSIGNED)
    }

    pub(crate) fn mulhwx(&mut self, code: Instruction) -> HandlerResult {
        self.multiply_high(code, Type::I32, ArithmeticFlags::SIGNED)
    }

    pub(crate) fn mulhwux(&mut self, code: Instruction) -> HandlerResult {
        self.multiply_high(code, Type::I32, ArithmeticFlags::UNSIGNED)
    }

    pub(crate) fn mulldx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        let rd = self.builder.create_mul(ra, rb, ArithmeticFlags::SIGNED);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn mulli(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.get_gpr(code.ra());
        let simm = self.const_i64(code.simm() as u64);
        let rd = self.builder.create_mul(ra, simm, ArithmeticFlags::SIGNED);
        self.set_gpr(code.rd(), rd);
        Ok(())
    }

    pub(crate) fn mullwx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr_as(code.ra(), Type::I32);
        let rb = self.get_gpr_as(code.rb(), Type::I32);
        let ra = self.builder.create_sext(ra, Type::I64);
        let rb = self.builder.create_sext(rb, Type::I64);
        let rd = self.builder.create_mul(ra, rb, ArithmeticFlags::SIGNED);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn negx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rd = self.builder.create_neg(ra);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    // Rotates.

    fn rotate_left(&mut self, value: ValueRef, sh: u32) -> ValueRef {
        if sh == 0 {
            return value;
        }
        let b = &mut self.builder;
        let high = b.create_shl_imm(value, sh as u8);
        let low = b.create_shr_imm(value, (64 - sh) as u8);
        b.create_or(high, low)
    }

    fn mask(&mut self, value: ValueRef, mask: u64) -> ValueRef {
        let mask = self.const_i64(mask);
        self.builder.create_and(value, mask)
    }

    /// `(rotated & mask) | (ra & !mask)`.
    fn insert_masked(&mut self, code: Instruction, rotated: ValueRef, mask: u64) -> ValueRef {
        let ra = self.get_gpr(code.ra());
        let inserted = self.mask(rotated, mask);
        let kept = self.mask(ra, !mask);
        self.builder.create_or(inserted, kept)
    }

    /// Low word of rs copied into both halves, so 64-bit rotates act as 32-bit ones.
    fn replicated_word(&mut self, index: usize) -> ValueRef {
        let word = self.get_gpr_as(index, Type::I32);
        let b = &mut self.builder;
        let low = b.create_zext(word, Type::I64);
        let high = b.create_shl_imm(low, 32);
        b.create_or(low, high)
    }

    fn write_ra(&mut self, code: Instruction, ra: ValueRef) -> HandlerResult {
        self.set_gpr(code.ra(), ra);
        self.record(code, ra);
        Ok(())
    }

    pub(crate) fn rldc_lr(&mut self, _code: Instruction) -> HandlerResult {
        Err(Unimplemented("rldcl/rldcr"))
    }

    pub(crate) fn rldicx(&mut self, code: Instruction) -> HandlerResult {
        let (sh, mb) = (code.sh64(), code.mb64() as usize);
        let rs = self.get_gpr(code.rs());
        let rotated = self.rotate_left(rs, sh);
        let ra = self.mask(rotated, ROTATE_MASK[mb][63 - sh as usize]);
        self.write_ra(code, ra)
    }

    pub(crate) fn rldiclx(&mut self, code: Instruction) -> HandlerResult {
        let (sh, mb) = (code.sh64(), code.mb64() as usize);
        let rs = self.get_gpr(code.rs());
        let rotated = self.rotate_left(rs, sh);
        let ra = self.mask(rotated, ROTATE_MASK[mb][63]);
        self.write_ra(code, ra)
    }

    pub(crate) fn rldicrx(&mut self, code: Instruction) -> HandlerResult {
        let (sh, me) = (code.sh64(), code.me64() as usize);
        let rs = self.get_gpr(code.rs());
        let rotated = self.rotate_left(rs, sh);
        let ra = self.mask(rotated, ROTATE_MASK[0][me]);
        self.write_ra(code, ra)
    }

    pub(crate) fn rldimix(&mut self, code: Instruction) -> HandlerResult {
        let (sh, mb) = (code.sh64(), code.mb64() as usize);
        let rs = self.get_gpr(code.rs());
        let rotated = self.rotate_left(rs, sh);
        let ra = self.insert_masked(code, rotated, ROTATE_MASK[mb][63 - sh as usize]);
        self.write_ra(code, ra)
    }

    pub(crate) fn rlwimix(&mut self, code: Instruction) -> HandlerResult {
        let mask = ROTATE_MASK[32 + code.mb() as usize][32 + code.me() as usize];
        let rs = self.replicated_word(code.rs());
        let rotated = self.rotate_left(rs, code.sh());
        let ra = self.insert_masked(code, rotated, mask);
        self.write_ra(code, ra)
    }

    pub(crate) fn rlwinmx(&mut self, code: Instruction) -> HandlerResult {
        let mask = ROTATE_MASK[32 + code.mb() as usize][32 + code.me() as usize];
        let rs = self.replicated_word(code.rs());
        let rotated = self.rotate_left(rs, code.sh());
        let ra = self.mask(rotated, mask);
        self.write_ra(code, ra)
    }

    pub(crate) fn rlwnmx(&mut self, code: Instruction) -> HandlerResult {
        let mask = ROTATE_MASK[32 + code.mb() as usize][32 + code.me() as usize];
        let rs = self.replicated_word(code.rs());
        let rb = self.get_gpr(code.rb());
        let low_five = self.const_i64(0x1f);
        let thirty_two = self.const_i64(32);

        let b = &mut self.builder;
        let left = b.create_and(rb, low_five);
        let right = b.create_sub(thirty_two, left);
        let high = b.create_shl(rs, left);
        let low = b.create_shr(rs, right);
        let rotated = b.create_or(high, low);

        let ra = self.mask(rotated, mask);
        self.write_ra(code, ra)
    }

    // Shifts. Amounts come from the low bits of rb, and amounts past the
    // operand width clear (or sign-fill) the result.

    fn shift_amount(&mut self, code: Instruction, mask: u8) -> ValueRef {
        let rb = self.get_gpr_as(code.rb(), Type::I8);
        let mask = self.builder.get_constant_i8(mask);
        self.builder.create_and(rb, mask)
    }

    pub(crate) fn sldx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let amount = self.shift_amount(code, 0x7f);
        let zero = self.const_i64(0);

        let b = &mut self.builder;
        let wide = b.create_shr_imm(amount, 6);
        let shifted = b.create_shl(rs, amount);
        let ra = b.create_select(wide, zero, shifted);
        self.write_ra(code, ra)
    }

    pub(crate) fn slwx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr_as(code.rs(), Type::I32);
        let amount = self.shift_amount(code, 0x3f);

        let b = &mut self.builder;
        let rs = b.create_zext(rs, Type::I64);
        let shifted = b.create_shl(rs, amount);
        let word = b.create_trunc(shifted, Type::I32);
        let ra = b.create_zext(word, Type::I64);
        self.write_ra(code, ra)
    }

    pub(crate) fn srdx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let amount = self.shift_amount(code, 0x7f);
        let zero = self.const_i64(0);
        let bit6 = self.builder.get_constant_i8(0x40);

        let b = &mut self.builder;
        let wide = b.create_and(amount, bit6);
        let shifted = b.create_shr(rs, amount);
        let ra = b.create_select(wide, zero, shifted);
        self.write_ra(code, ra)
    }

    pub(crate) fn srwx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr_as(code.rs(), Type::I32);
        let amount = self.shift_amount(code, 0x3f);

        let b = &mut self.builder;
        let rs = b.create_zext(rs, Type::I64);
        let ra = b.create_shr(rs, amount);
        self.write_ra(code, ra)
    }

    pub(crate) fn sradx(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let amount = self.shift_amount(code, 0x7f);
        let bit6 = self.builder.get_constant_i8(0x40);

        let b = &mut self.builder;
        let wide = b.create_and(amount, bit6);
        let fill = b.create_shra_imm(rs, 63);
        let shifted = b.create_shra(rs, amount);
        let ra = b.create_select(wide, fill, shifted);

        // TODO: set CA when a negative rs shifts out one bits.
        let ca = b.get_constant_i8(0);
        self.set_xer_ca(ca);
        self.write_ra(code, ra)
    }

    pub(crate) fn sradix(&mut self, code: Instruction) -> HandlerResult {
        let rs = self.get_gpr(code.rs());
        let sh = code.sh64();
        let ra = if sh == 0 { rs } else { self.builder.create_shra_imm(rs, sh as u8) };

        // TODO: set CA when a negative rs shifts out one bits.
        let ca = self.builder.get_constant_i8(0);
        self.set_xer_ca(ca);
        self.write_ra(code, ra)
    }

    // The word sits in the upper half so the bits shifted out land in the
    // lower half, where CA can see them.
    fn shift_right_algebraic_word(&mut self, code: Instruction, amount: ValueRef) -> HandlerResult {
        let rs = self.get_gpr_as(code.rs(), Type::I32);
        let zero = self.builder.get_constant_i32(0);

        let b = &mut self.builder;
        let rs = b.create_zext(rs, Type::I64);
        let rs = b.create_shl_imm(rs, 32);
        let shifted = b.create_shra(rs, amount);

        let sign = b.create_shr_imm(rs, 63);
        let negative = b.create_trunc(sign, Type::I8);
        let lost = b.create_trunc(shifted, Type::I32);
        let lost = b.create_cmp_ne(lost, zero);
        let ca = b.create_and(negative, lost);
        let ra = b.create_shra_imm(shifted, 32);

        self.set_xer_ca(ca);
        self.write_ra(code, ra)
    }

    pub(crate) fn srawx(&mut self, code: Instruction) -> HandlerResult {
        let amount = self.shift_amount(code, 0x3f);
        self.shift_right_algebraic_word(code, amount)
    }

    pub(crate) fn srawix(&mut self, code: Instruction) -> HandlerResult {
        if code.sh() == 0 {
            let rs = self.get_gpr_as(code.rs(), Type::I32);
            let ra = self.builder.create_sext(rs, Type::I64);
            let ca = self.builder.get_constant_i8(0);
            self.set_xer_ca(ca);
            return self.write_ra(code, ra);
        }
        let amount = self.builder.get_constant_i8(code.sh() as u8);
        self.shift_right_algebraic_word(code, amount)
    }

    // Subtract family: rd = rb - ra, computed as !ra + rb + 1 where carries matter.

    pub(crate) fn subfx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        let rd = self.builder.create_sub(rb, ra);
        self.set_gpr(code.rd(), rd);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn subfcx(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        let rd = self.builder.create_sub(rb, ra);
        let ca = self.sub_did_carry(rb, ra);
        self.set_gpr(code.rd(), rd);
        self.set_xer_ca(ca);
        self.record(code, rd);
        Ok(())
    }

    pub(crate) fn subfex(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let rb = self.get_gpr(code.rb());
        let not_ra = self.builder.create_not(ra);
        self.add_extended(code, not_ra, rb)
    }

    pub(crate) fn subfic(&mut self, code: Instruction) -> HandlerResult {
        let ra = self.get_gpr(code.ra());
        let simm = self.const_i64(code.simm() as u64);
        let rd = self.builder.create_sub(simm, ra);
        let ca = self.sub_did_carry(simm, ra);
        self.set_gpr(code.rd(), rd);
        self.set_xer_ca(ca);
        Ok(())
    }

    pub(crate) fn subfmex(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let not_ra = self.builder.create_not(ra);
        let minus_one = self.const_i64(u64::MAX);
        self.add_extended(code, not_ra, minus_one)
    }

    pub(crate) fn subfzex(&mut self, code: Instruction) -> HandlerResult {
        check_oe(code)?;
        let ra = self.get_gpr(code.ra());
        let not_ra = self.builder.create_not(ra);
        let zero = self.const_i64(0);
        self.add_extended(code, not_ra, zero)
    }
}
