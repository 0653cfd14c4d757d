use std::sync::Arc;

use cpu::hir::{Function, MemoryFlags, Opcode, Operand, Type};
use memory::Memory;
use ppu::state::Reg;
use ppu::{TranslateError, Translator};

mod encode;

use encode::{cmp_d, d, m, x, xo, RC};

fn memory() -> Arc<Memory> {
    Arc::new(Memory::new().expect("reserve guest memory"))
}

fn translator() -> Translator {
    Translator::new("test", memory())
}

fn seed(t: &mut Translator, index: usize, value: u64) {
    let v = t.builder().get_constant_i64(value);
    t.set_gpr(index, v);
}

fn gpr(t: &mut Translator, index: usize) -> Option<u64> {
    let v = t.get_gpr(index);
    t.builder().value(v).int_value()
}

fn ca(t: &mut Translator) -> Option<u64> {
    let v = t.get_xer_ca();
    t.builder().value(v).int_value()
}

fn cr(t: &mut Translator, field: usize) -> Option<u64> {
    let v = t.get_cr_field(field);
    t.builder().value(v).int_value()
}

fn count(function: &Function, opcode: Opcode) -> usize {
    function.instructions().filter(|i| i.opcode == opcode).count()
}

#[test]
fn addic_carries_into_upper_word() {
    let mut t = translator();
    seed(&mut t, 4, 0xffff_ffff);
    t.translate(0, d(12, 3, 4, 1)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x1_0000_0000));
    assert_eq!(ca(&mut t), Some(0));

    seed(&mut t, 4, u64::MAX);
    t.translate(4, d(12, 3, 4, 1)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0));
    assert_eq!(ca(&mut t), Some(1));
}

#[test]
fn addic_record_sets_cr0() {
    let mut t = translator();
    let so = t.builder().get_constant_i8(0);
    t.set_xer_so(so);
    seed(&mut t, 4, 1);
    t.translate(0, d(13, 3, 4, -2)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(u64::MAX));
    assert_eq!(cr(&mut t, 0), Some(0b1000));
}

#[test]
fn immediates_with_r0_are_literal() {
    let mut t = translator();
    t.translate(0, d(14, 3, 0, -2)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(-2i64 as u64));

    t.translate(4, d(15, 3, 0, 0x1234)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x1234_0000));

    t.translate(8, d(15, 3, 0, i16::MIN)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0xffff_ffff_8000_0000));
    assert_eq!(count(t.function(), Opcode::CtxLoad), 0);
}

#[test]
fn rlwinm_rotates_low_word() {
    let mut t = translator();
    seed(&mut t, 4, 0xdead_beef_1234_5678);

    t.translate(0, m(21, 4, 3, 8, 0, 31)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x3456_7812));

    // slwi r3, r4, 4
    t.translate(4, m(21, 4, 3, 4, 0, 27)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x2345_6780));

    // clrlwi r3, r4, 24
    t.translate(8, m(21, 4, 3, 0, 24, 31)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x78));
}

#[test]
fn rlwimi_keeps_unmasked_bits() {
    let mut t = translator();
    seed(&mut t, 4, 0x0000_00ab);
    seed(&mut t, 3, 0x1122_3344);
    // rlwimi r3, r4, 8, 16, 23
    t.translate(0, m(20, 4, 3, 8, 16, 23)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x1122_ab44));
}

#[test]
fn srawi_sets_carry_for_inexact_negative() {
    let mut t = translator();
    seed(&mut t, 4, 0x8000_0001);
    t.translate(0, x(824, 4, 3, 1)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0xffff_ffff_c000_0000));
    assert_eq!(ca(&mut t), Some(1));

    seed(&mut t, 4, 0x7fff_ffff);
    t.translate(4, x(824, 4, 3, 1)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(0x3fff_ffff));
    assert_eq!(ca(&mut t), Some(0));
}

#[test]
fn word_and_doubleword_compares() {
    let mut t = translator();
    let so = t.builder().get_constant_i8(0);
    t.set_xer_so(so);
    seed(&mut t, 4, 0x1_ffff_ffff);

    // cmpwi cr1, r4, 1: low word is -1
    t.translate(0, cmp_d(11, 1, false, 4, 1)).unwrap();
    assert_eq!(cr(&mut t, 1), Some(0b1000));

    // cmplwi cr2, r4, 1
    t.translate(4, cmp_d(10, 2, false, 4, 1)).unwrap();
    assert_eq!(cr(&mut t, 2), Some(0b0100));

    // cmpdi cr3, r4, 1
    t.translate(8, cmp_d(11, 3, true, 4, 1)).unwrap();
    assert_eq!(cr(&mut t, 3), Some(0b0100));

    // cmpd cr4, r4, r4
    t.translate(12, x(0, 4 << 2 | 1, 4, 4)).unwrap();
    assert_eq!(cr(&mut t, 4), Some(0b0010));
}

#[test]
fn subfic_reports_borrow_as_carry() {
    let mut t = translator();
    seed(&mut t, 4, 5);
    t.translate(0, d(8, 3, 4, 3)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(-2i64 as u64));
    assert_eq!(ca(&mut t), Some(0));

    t.translate(4, d(8, 3, 4, 7)).unwrap();
    assert_eq!(gpr(&mut t, 3), Some(2));
    assert_eq!(ca(&mut t), Some(1));
}

#[test]
fn unknown_word_is_invalid() {
    let mut t = translator();
    assert_eq!(
        t.translate(0x100, 0),
        Err(TranslateError::InvalidInstruction { address: 0x100, word: 0 })
    );
}

#[test]
fn overflow_enable_is_unimplemented() {
    let mut t = translator();
    let err = t.translate(0x40, xo(266, 3, 4, 5, true)).unwrap_err();
    assert!(matches!(err, TranslateError::Unimplemented { name: "addx", address: 0x40, .. }));

    let err = t.translate(0x44, xo(491, 3, 4, 5, true) | RC).unwrap_err();
    assert!(matches!(err, TranslateError::Unimplemented { name: "divwx", .. }));
}

#[test]
fn unsupported_forms_name_the_feature() {
    let mut t = translator();
    assert_eq!(
        t.translate(0, x(534, 3, 4, 5)),
        Err(TranslateError::Unimplemented { name: "lwbrx", address: 0, feature: "byte-reversed access" })
    );
    assert_eq!(
        t.translate(4, d(46, 3, 1, 0)),
        Err(TranslateError::Unimplemented { name: "lmw", address: 4, feature: "load/store multiple" })
    );
    assert!(matches!(
        t.translate(8, 30 << 26 | 4 << 21 | 3 << 16 | 5 << 11 | 8 << 1),
        Err(TranslateError::Unimplemented { name: "rldc_lr", .. })
    ));
}

#[test]
fn block_stops_at_first_error() {
    let mut t = translator();
    let words = [d(14, 3, 0, 1), d(14, 4, 0, 2), 0, d(14, 5, 0, 3)];
    assert_eq!(
        t.translate_block(0x1000, &words),
        Err(TranslateError::InvalidInstruction { address: 0x1008, word: 0 })
    );
    assert_eq!(gpr(&mut t, 4), Some(2));
    assert_eq!(t.address(), 0x1008);
}

#[test]
fn store_conditional_reports_success() {
    let mut t = translator();
    seed(&mut t, 4, 0x1000);
    seed(&mut t, 5, 0x20);
    t.translate(0, x(150, 3, 4, 5) | RC).unwrap();
    assert_eq!(cr(&mut t, 0), Some(0b0010));

    let f = t.finish();
    let store = f.instructions().find(|i| i.opcode == Opcode::Store).unwrap();
    assert_eq!(store.flags, MemoryFlags::ENDIAN_BIG.bits());
    let value = store.src[1].value().unwrap();
    assert_eq!(f.value(value).ty, Type::I32);
}

#[test]
fn barriers() {
    let mut t = translator();
    t.translate(0, x(598, 0, 0, 0)).unwrap();
    t.translate(4, x(854, 0, 0, 0)).unwrap();
    t.translate(8, 19 << 26 | 150 << 1).unwrap();
    assert_eq!(count(t.function(), Opcode::MemFence), 2);
    assert_eq!(t.function().instructions().count(), 2);
}

#[test]
fn loads_are_big_endian_and_extended() {
    let memory = memory();
    let mut t = Translator::new("lha", memory.clone());
    seed(&mut t, 4, 0x1_0000_0010);
    t.translate(0, d(42, 3, 4, 0)).unwrap();

    let f = t.finish();
    let load = f.instructions().find(|i| i.opcode == Opcode::Load).unwrap();
    assert_eq!(load.flags, MemoryFlags::ENDIAN_BIG.bits());
    assert_eq!(f.value(load.dest.unwrap()).ty, Type::I16);

    // Guest addresses wrap at 32 bits before the host base is added.
    let Operand::Value(addr) = load.src[0] else { panic!("address operand") };
    assert_eq!(f.value(addr).int_value(), Some(memory.base() as u64 + 0x10));
    assert_eq!(count(&f, Opcode::SExt), 1);
}

#[test]
fn update_forms_write_back_address() {
    let mut t = translator();
    seed(&mut t, 4, 0x1000);
    t.translate(0, d(33, 3, 4, 8)).unwrap();
    assert_eq!(gpr(&mut t, 4), Some(0x1008));

    // stdu r1, -16(r1)
    seed(&mut t, 1, 0x2000);
    t.translate(4, 62 << 26 | 1 << 21 | 1 << 16 | (0xfff0 | 1)).unwrap();
    assert_eq!(gpr(&mut t, 1), Some(0x1ff0));
}

#[test]
fn single_loads_widen_to_double() {
    let mut t = translator();
    t.translate(0, d(48, 1, 0, 0x100)).unwrap();
    let f1 = t.get_fpr(1);
    assert_eq!(t.builder().ty(f1), Type::F64);

    let f = t.finish();
    assert_eq!(count(&f, Opcode::Convert), 1);
}

#[test]
fn finish_stores_modified_registers() {
    let mut t = translator();
    t.translate(0, d(14, 3, 0, 5)).unwrap();
    let f = t.finish();

    let stores: Vec<_> = f.instructions().filter(|i| i.opcode == Opcode::CtxStore).collect();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].src[0], Operand::Immediate(Reg::Gpr(3).offset() as u64));
    assert_eq!(f.instructions().last().map(|i| i.opcode), Some(Opcode::Ret));
}

#[test]
fn division_by_constant_zero_is_emitted() {
    let mut t = translator();
    seed(&mut t, 4, 10);
    seed(&mut t, 5, 0);
    t.translate(0, xo(459, 3, 4, 5, false)).unwrap();
    assert_eq!(count(t.function(), Opcode::Div), 1);
}

#[test]
fn extended_add_emits_each_sum_once() {
    let mut t = translator();
    t.translate(0, xo(138, 3, 4, 5, false)).unwrap();
    let f = t.function();
    assert_eq!(count(f, Opcode::Add), 2);
    assert_eq!(count(f, Opcode::Cmp), 2);
    assert_eq!(count(f, Opcode::Or), 1);

    t.translate(4, xo(136, 6, 7, 8, false)).unwrap();
    assert_eq!(count(t.function(), Opcode::Add), 4);
}
