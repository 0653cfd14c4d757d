use std::cell::Cell;

use bitflags::bitflags;
use common::util::sign_extend;
use common::{V128, V256};

use super::function::InstrRef;
use super::opcodes::{ArithmeticFlags, CompareFlags};
use super::types::Type;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ValueFlags: u32 {
        const IS_CONSTANT = 1 << 0;
        const IS_ARGUMENT = 1 << 1;
    }
}

/// Literal payload of a constant value.
///
/// Stored as raw little-endian words; which view is meaningful depends on the
/// owning value's declared type. Scalars live in the first word.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Constant {
    raw: [u64; 4],
}

impl Constant {
    pub fn i8(&self) -> u8 {
        self.raw[0] as u8
    }
    pub fn i16(&self) -> u16 {
        self.raw[0] as u16
    }
    pub fn i32(&self) -> u32 {
        self.raw[0] as u32
    }
    pub fn i64(&self) -> u64 {
        self.raw[0]
    }
    pub fn f32(&self) -> f32 {
        f32::from_bits(self.raw[0] as u32)
    }
    pub fn f64(&self) -> f64 {
        f64::from_bits(self.raw[0])
    }
    pub fn v128(&self) -> V128 {
        V128((self.raw[0] as u128) | ((self.raw[1] as u128) << 64))
    }
    pub fn v256(&self) -> V256 {
        let hi = (self.raw[2] as u128) | ((self.raw[3] as u128) << 64);
        V256([self.v128().0, hi])
    }

    fn set_scalar(&mut self, bits: u64) {
        self.raw = [bits, 0, 0, 0];
    }
    pub fn set_i8(&mut self, c: u8) {
        self.set_scalar(c as u64)
    }
    pub fn set_i16(&mut self, c: u16) {
        self.set_scalar(c as u64)
    }
    pub fn set_i32(&mut self, c: u32) {
        self.set_scalar(c as u64)
    }
    pub fn set_i64(&mut self, c: u64) {
        self.set_scalar(c)
    }
    pub fn set_f32(&mut self, c: f32) {
        self.set_scalar(c.to_bits() as u64)
    }
    pub fn set_f64(&mut self, c: f64) {
        self.set_scalar(c.to_bits())
    }
    pub fn set_v128(&mut self, c: V128) {
        self.raw = [c.0 as u64, (c.0 >> 64) as u64, 0, 0];
    }
    pub fn set_v256(&mut self, c: V256) {
        let [lo, hi] = c.0;
        self.raw = [lo as u64, (lo >> 64) as u64, hi as u64, (hi >> 64) as u64];
    }
}

/// Where a value comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueParent {
    Argument(u32),
    Instruction(InstrRef),
    Constant,
}

/// A node of the HIR: either the result of an instruction, a function
/// argument, or a folded constant.
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: Type,
    pub flags: ValueFlags,
    pub constant: Constant,
    pub parent: ValueParent,
    id: Cell<Option<u32>>,
}

#[inline(always)]
const fn width_mask(bits: u32) -> u64 {
    if bits >= 64 { !0 } else { (1u64 << bits) - 1 }
}

enum Numeric {
    Int(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn new(ty: Type, parent: ValueParent) -> Value {
        let flags = match parent {
            ValueParent::Argument(_) => ValueFlags::IS_ARGUMENT,
            _ => ValueFlags::empty(),
        };
        Value {
            ty,
            flags,
            constant: Constant::default(),
            parent,
            id: Cell::new(None),
        }
    }

    /// Copy of this value's type and literal, detached from any producer.
    pub fn detached(&self) -> Value {
        Value {
            ty: self.ty,
            flags: self.flags & ValueFlags::IS_CONSTANT,
            constant: self.constant,
            parent: ValueParent::Constant,
            id: Cell::new(None),
        }
    }

    /// Function-unique id, assigned from `counter` the first time it is asked for.
    pub fn get_id(&self, counter: &Cell<u32>) -> u32 {
        if let Some(id) = self.id.get() {
            return id;
        }
        let id = counter.get();
        counter.set(id + 1);
        self.id.set(Some(id));
        id
    }

    pub fn is_type_integer(&self) -> bool {
        self.ty.is_integer()
    }

    pub fn is_type_float(&self) -> bool {
        self.ty.is_float()
    }

    pub fn is_type_vector(&self) -> bool {
        self.ty.is_vector()
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(ValueFlags::IS_CONSTANT)
    }

    pub fn is_constant_false(&self) -> bool {
        if !self.is_constant() {
            return false;
        }
        match self.ty {
            Type::I8 | Type::I16 | Type::I32 | Type::I64 => self.uint("is_constant_false") == 0,
            Type::F32 => self.constant.f32() == 0.0,
            Type::F64 => self.constant.f64() == 0.0,
            Type::V128 | Type::V256 => unimplemented!("Value::is_constant_false for {}", self.ty),
        }
    }

    pub fn is_constant_true(&self) -> bool {
        if !self.is_constant() {
            return false;
        }
        match self.ty {
            Type::I8 | Type::I16 | Type::I32 | Type::I64 => self.uint("is_constant_true") != 0,
            Type::F32 => self.constant.f32() != 0.0,
            Type::F64 => self.constant.f64() != 0.0,
            Type::V128 | Type::V256 => unimplemented!("Value::is_constant_true for {}", self.ty),
        }
    }

    pub fn is_constant_zero(&self) -> bool {
        if !self.is_constant() {
            return false;
        }
        match self.ty {
            Type::I8 | Type::I16 | Type::I32 | Type::I64 => self.uint("is_constant_zero") == 0,
            Type::F32 => self.constant.f32() == 0.0,
            Type::F64 => self.constant.f64() == 0.0,
            Type::V128 => self.constant.v128().is_zero(),
            Type::V256 => unimplemented!("Value::is_constant_zero for v256"),
        }
    }

    /// Zero-extended literal of an integer constant.
    pub fn int_value(&self) -> Option<u64> {
        (self.is_constant() && self.ty.is_integer()).then(|| self.uint("int_value"))
    }

    pub fn set_constant_i8(&mut self, c: u8) {
        self.constant.set_i8(c);
        self.ty = Type::I8;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_i16(&mut self, c: u16) {
        self.constant.set_i16(c);
        self.ty = Type::I16;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_i32(&mut self, c: u32) {
        self.constant.set_i32(c);
        self.ty = Type::I32;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_i64(&mut self, c: u64) {
        self.constant.set_i64(c);
        self.ty = Type::I64;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_f32(&mut self, c: f32) {
        self.constant.set_f32(c);
        self.ty = Type::F32;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_f64(&mut self, c: f64) {
        self.constant.set_f64(c);
        self.ty = Type::F64;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_v128(&mut self, c: V128) {
        self.constant.set_v128(c);
        self.ty = Type::V128;
        self.flags |= ValueFlags::IS_CONSTANT;
    }
    pub fn set_constant_v256(&mut self, c: V256) {
        self.constant.set_v256(c);
        self.ty = Type::V256;
        self.flags |= ValueFlags::IS_CONSTANT;
    }

    fn int_bits(&self, op: &str) -> u32 {
        if !self.ty.is_integer() {
            unimplemented!("Value::{} for {}", op, self.ty);
        }
        self.ty.bits()
    }

    fn uint(&self, op: &str) -> u64 {
        self.constant.i64() & width_mask(self.int_bits(op))
    }

    fn sint(&self, op: &str) -> i64 {
        sign_extend(self.uint(op), self.int_bits(op)) as i64
    }

    fn store_uint(&mut self, value: u64) {
        let bits = self.ty.bits();
        self.constant.set_i64(value & width_mask(bits));
    }

    fn fold_int(&mut self, rhs: &Value, op: &str, f: impl FnOnce(u64, u64, u32) -> u64) {
        let bits = self.int_bits(op);
        let (a, b) = (self.uint(op), rhs.constant.i64() & width_mask(bits));
        self.store_uint(f(a, b, bits));
    }

    pub fn do_add(&mut self, rhs: &Value) {
        self.fold_int(rhs, "do_add", |a, b, _| a.wrapping_add(b));
    }

    pub fn do_sub(&mut self, rhs: &Value) {
        self.fold_int(rhs, "do_sub", |a, b, _| a.wrapping_sub(b));
    }

    /// The low half of a product does not depend on signedness.
    pub fn do_mul(&mut self, rhs: &Value, _flags: ArithmeticFlags) {
        self.fold_int(rhs, "do_mul", |a, b, _| a.wrapping_mul(b));
    }

    pub fn do_mulh(&mut self, rhs: &Value, flags: ArithmeticFlags) {
        self.fold_int(rhs, "do_mulh", |a, b, bits| {
            if flags.contains(ArithmeticFlags::UNSIGNED) {
                ((a as u128 * b as u128) >> bits) as u64
            } else {
                let a = sign_extend(a, bits) as i64 as i128;
                let b = sign_extend(b, bits) as i64 as i128;
                ((a * b) >> bits) as u64
            }
        });
    }

    /// Panics on a zero divisor; the builder never folds those.
    pub fn do_div(&mut self, rhs: &Value, flags: ArithmeticFlags) {
        self.fold_int(rhs, "do_div", |a, b, bits| {
            if b == 0 {
                panic!("Value::do_div by constant zero");
            }
            if flags.contains(ArithmeticFlags::UNSIGNED) {
                a / b
            } else {
                let a = sign_extend(a, bits) as i64;
                let b = sign_extend(b, bits) as i64;
                a.wrapping_div(b) as u64
            }
        });
    }

    pub fn do_neg(&mut self) {
        self.fold_unary("do_neg", |a, _| a.wrapping_neg());
    }

    fn fold_bitwise(&mut self, rhs: &Value, op: &str, f: fn(u128, u128) -> u128) {
        match self.ty {
            Type::V128 => {
                let v = f(self.constant.v128().0, rhs.constant.v128().0);
                self.constant.set_v128(V128(v));
            }
            _ => self.fold_int(rhs, op, |a, b, _| f(a as u128, b as u128) as u64),
        }
    }

    pub fn do_and(&mut self, rhs: &Value) {
        self.fold_bitwise(rhs, "do_and", |a, b| a & b);
    }

    pub fn do_or(&mut self, rhs: &Value) {
        self.fold_bitwise(rhs, "do_or", |a, b| a | b);
    }

    pub fn do_xor(&mut self, rhs: &Value) {
        self.fold_bitwise(rhs, "do_xor", |a, b| a ^ b);
    }

    pub fn do_not(&mut self) {
        match self.ty {
            Type::V128 => {
                let v = !self.constant.v128().0;
                self.constant.set_v128(V128(v));
            }
            _ => {
                let a = self.uint("do_not");
                self.store_uint(!a);
            }
        }
    }

    fn fold_unary(&mut self, op: &str, f: impl FnOnce(u64, u32) -> u64) {
        let bits = self.int_bits(op);
        let a = self.uint(op);
        self.store_uint(f(a, bits));
    }

    /// Shift amounts are always read as 8 bits. Amounts past the width clear the value.
    pub fn do_shl(&mut self, amount: &Value) {
        let amount = amount.constant.i8() as u32;
        self.fold_unary("do_shl", |a, bits| if amount >= bits { 0 } else { a << amount });
    }

    pub fn do_shr(&mut self, amount: &Value) {
        let amount = amount.constant.i8() as u32;
        self.fold_unary("do_shr", |a, bits| if amount >= bits { 0 } else { a >> amount });
    }

    /// Amounts past the width leave only copies of the sign bit.
    pub fn do_shra(&mut self, amount: &Value) {
        let amount = amount.constant.i8() as u32;
        self.fold_unary("do_shra", |a, bits| {
            (sign_extend(a, bits) as i64 >> amount.min(bits - 1)) as u64
        });
    }

    pub fn do_ctlz(&mut self) {
        self.fold_unary("do_ctlz", |a, bits| (a.leading_zeros() - (64 - bits)) as u64);
    }

    pub fn do_zext(&mut self, target: Type) {
        if !self.ty.is_integer() || !target.is_integer() || target.size() <= self.ty.size() {
            unimplemented!("Value::do_zext from {} to {}", self.ty, target);
        }
        let a = self.uint("do_zext");
        self.ty = target;
        self.store_uint(a);
    }

    pub fn do_sext(&mut self, target: Type) {
        if !self.ty.is_integer() || !target.is_integer() || target.size() <= self.ty.size() {
            unimplemented!("Value::do_sext from {} to {}", self.ty, target);
        }
        let a = self.sint("do_sext");
        self.ty = target;
        self.store_uint(a as u64);
    }

    pub fn do_trunc(&mut self, target: Type) {
        if !self.ty.is_integer() || !target.is_integer() || target.size() >= self.ty.size() {
            unimplemented!("Value::do_trunc from {} to {}", self.ty, target);
        }
        let a = self.uint("do_trunc");
        self.ty = target;
        self.store_uint(a);
    }

    /// Reinterprets the bit pattern; only the declared type changes.
    pub fn do_cast(&mut self, target: Type) {
        if self.ty.size() != target.size() {
            unimplemented!("Value::do_cast from {} to {}", self.ty, target);
        }
        self.ty = target;
    }

    fn numeric(&self) -> Numeric {
        match self.ty {
            Type::I8 | Type::I16 | Type::I32 | Type::I64 => Numeric::Int(self.sint("do_convert")),
            Type::F32 => Numeric::F32(self.constant.f32()),
            Type::F64 => Numeric::F64(self.constant.f64()),
            Type::V128 | Type::V256 => unimplemented!("Value::do_convert from {}", self.ty),
        }
    }

    /// Numeric conversion. Integers are treated as signed; float to integer saturates.
    pub fn do_convert(&mut self, target: Type) {
        let value = self.numeric();
        match target {
            Type::I8 => self.constant.set_i8(match value {
                Numeric::Int(v) => v as u8,
                Numeric::F32(f) => f as i8 as u8,
                Numeric::F64(f) => f as i8 as u8,
            }),
            Type::I16 => self.constant.set_i16(match value {
                Numeric::Int(v) => v as u16,
                Numeric::F32(f) => f as i16 as u16,
                Numeric::F64(f) => f as i16 as u16,
            }),
            Type::I32 => self.constant.set_i32(match value {
                Numeric::Int(v) => v as u32,
                Numeric::F32(f) => f as i32 as u32,
                Numeric::F64(f) => f as i32 as u32,
            }),
            Type::I64 => self.constant.set_i64(match value {
                Numeric::Int(v) => v as u64,
                Numeric::F32(f) => f as i64 as u64,
                Numeric::F64(f) => f as i64 as u64,
            }),
            Type::F32 => self.constant.set_f32(match value {
                Numeric::Int(v) => v as f32,
                Numeric::F32(f) => f,
                Numeric::F64(f) => f as f32,
            }),
            Type::F64 => self.constant.set_f64(match value {
                Numeric::Int(v) => v as f64,
                Numeric::F32(f) => f as f64,
                Numeric::F64(f) => f,
            }),
            Type::V128 | Type::V256 => unimplemented!("Value::do_convert from {} to {}", self.ty, target),
        }
        self.ty = target;
    }

    /// Evaluates `self <op> rhs` and narrows `self` to an `I8` holding 0 or 1.
    pub fn do_compare(&mut self, rhs: &Value, flags: CompareFlags) {
        let bits = self.int_bits("do_compare");
        let (ua, ub) = (self.uint("do_compare"), rhs.constant.i64() & width_mask(bits));
        let (sa, sb) = (sign_extend(ua, bits) as i64, sign_extend(ub, bits) as i64);

        let result = match flags {
            f if f == CompareFlags::EQ => ua == ub,
            f if f == CompareFlags::NE => ua != ub,
            f if f == CompareFlags::SLT => sa < sb,
            f if f == CompareFlags::SLE => sa <= sb,
            f if f == CompareFlags::SGE => sa >= sb,
            f if f == CompareFlags::SGT => sa > sb,
            f if f == CompareFlags::ULT => ua < ub,
            f if f == CompareFlags::ULE => ua <= ub,
            f if f == CompareFlags::UGE => ua >= ub,
            f if f == CompareFlags::UGT => ua > ub,
            f => panic!("Value::do_compare with invalid operator {:?}", f),
        };
        self.ty = Type::I8;
        self.constant.set_i8(result as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_i64(v: u64) -> Value {
        let mut value = Value::new(Type::I64, ValueParent::Constant);
        value.set_constant_i64(v);
        value
    }

    fn constant_i8(v: u8) -> Value {
        let mut value = Value::new(Type::I8, ValueParent::Constant);
        value.set_constant_i8(v);
        value
    }

    #[test]
    fn ids_are_lazy_and_stable() {
        let counter = Cell::new(0);
        let a = constant_i64(1);
        let b = constant_i64(2);
        assert_eq!(b.get_id(&counter), 0);
        assert_eq!(a.get_id(&counter), 1);
        assert_eq!(b.get_id(&counter), 0);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn extension_round_trip() {
        let mut v = constant_i8(0xff);
        v.do_sext(Type::I64);
        assert_eq!(v.ty, Type::I64);
        assert_eq!(v.constant.i64(), u64::MAX);

        let mut v = constant_i8(0xff);
        v.do_zext(Type::I64);
        assert_eq!(v.constant.i64(), 0xff);

        let mut v = constant_i64(0x1234_5678_9abc_def0);
        v.do_trunc(Type::I16);
        assert_eq!(v.ty, Type::I16);
        assert_eq!(v.constant.i16(), 0xdef0);
    }

    #[test]
    fn arithmetic_wraps_at_declared_width() {
        let mut v = constant_i8(0xff);
        v.do_add(&constant_i8(2));
        assert_eq!(v.constant.i8(), 1);

        let mut v = constant_i64(0);
        v.do_sub(&constant_i64(1));
        assert_eq!(v.constant.i64(), u64::MAX);

        let mut v = constant_i64(5);
        v.do_neg();
        assert_eq!(v.constant.i64() as i64, -5);
    }

    #[test]
    fn division_honours_signedness() {
        let mut v = constant_i64(-7i64 as u64);
        v.do_div(&constant_i64(2), ArithmeticFlags::SIGNED);
        assert_eq!(v.constant.i64() as i64, -3);

        let mut v = constant_i64(-7i64 as u64);
        v.do_div(&constant_i64(2), ArithmeticFlags::UNSIGNED);
        assert_eq!(v.constant.i64(), (-7i64 as u64) / 2);

        let mut v = constant_i8(0x80);
        v.do_div(&constant_i8(0xff), ArithmeticFlags::SIGNED);
        assert_eq!(v.constant.i8(), 0x80);
    }

    #[test]
    fn high_multiply() {
        let mut v = constant_i64(u64::MAX);
        v.do_mulh(&constant_i64(u64::MAX), ArithmeticFlags::UNSIGNED);
        assert_eq!(v.constant.i64(), u64::MAX - 1);

        let mut v = constant_i64(u64::MAX);
        v.do_mulh(&constant_i64(u64::MAX), ArithmeticFlags::SIGNED);
        assert_eq!(v.constant.i64(), 0);
    }

    #[test]
    fn overwide_shifts() {
        let mut v = constant_i64(0x8000_0000_0000_0000);
        v.do_shra(&constant_i8(200));
        assert_eq!(v.constant.i64(), u64::MAX);

        let mut v = constant_i64(u64::MAX);
        v.do_shl(&constant_i8(64));
        assert_eq!(v.constant.i64(), 0);

        let mut v = Value::new(Type::I32, ValueParent::Constant);
        v.set_constant_i32(0xffff_ffff);
        v.do_shr(&constant_i8(32));
        assert_eq!(v.constant.i32(), 0);
    }

    #[test]
    fn compare_narrows_to_i8() {
        let mut v = constant_i64(-1i64 as u64);
        v.do_compare(&constant_i64(1), CompareFlags::SLT);
        assert_eq!(v.ty, Type::I8);
        assert!(v.is_constant_true());

        let mut v = constant_i64(-1i64 as u64);
        v.do_compare(&constant_i64(1), CompareFlags::ULT);
        assert!(v.is_constant_false());

        let mut v = constant_i8(3);
        v.do_compare(&constant_i8(3), CompareFlags::UGE);
        assert_eq!(v.constant.i8(), 1);
    }

    #[test]
    fn convert_covers_same_type_and_floats() {
        let mut v = constant_i64(-3i64 as u64);
        v.do_convert(Type::F64);
        assert_eq!(v.constant.f64(), -3.0);
        v.do_convert(Type::F64);
        assert_eq!(v.constant.f64(), -3.0);
        v.do_convert(Type::F32);
        assert_eq!(v.constant.f32(), -3.0);
        v.do_convert(Type::I32);
        assert_eq!(v.constant.i32() as i32, -3);
        v.do_convert(Type::I8);
        assert_eq!(v.constant.i8(), 0xfd);
    }

    #[test]
    fn cast_keeps_bits() {
        let mut v = Value::new(Type::F64, ValueParent::Constant);
        v.set_constant_f64(1.0);
        v.do_cast(Type::I64);
        assert_eq!(v.constant.i64(), 0x3ff0_0000_0000_0000);
    }

    #[test]
    fn count_leading_zeros() {
        let mut v = Value::new(Type::I32, ValueParent::Constant);
        v.set_constant_i32(1);
        v.do_ctlz();
        assert_eq!(v.constant.i32(), 31);
    }

    #[test]
    fn vector_constants() {
        let mut v = Value::new(Type::V128, ValueParent::Constant);
        v.set_constant_v128(V128(0));
        assert!(v.is_constant_zero());
        v.do_not();
        assert_eq!(v.constant.v128(), V128(u128::MAX));
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn v256_zero_test_is_unimplemented() {
        let mut v = Value::new(Type::V256, ValueParent::Constant);
        v.set_constant_v256(V256::ZERO);
        v.is_constant_zero();
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn float_add_is_unimplemented() {
        let mut v = Value::new(Type::F32, ValueParent::Constant);
        v.set_constant_f32(1.0);
        let rhs = v.clone();
        v.do_add(&rhs);
    }
}
