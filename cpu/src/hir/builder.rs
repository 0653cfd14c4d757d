use common::{V128, V256};
use tracing::trace;

use super::function::{BlockRef, Function, FunctionRef, Instruction, Operand, ValueRef};
use super::opcodes::{
    component_flags, ArithmeticFlags, CallFlags, CompareFlags, MemoryFlags, Opcode,
    OpcodeSignatureType,
};
use super::types::Type;
use super::value::{Value, ValueParent};

use Operand::Value as V;

/// Appends HIR to a function, folding integer constants on the way.
///
/// Every `create_*` appends at most one instruction and returns its result.
/// Operand shapes are checked against the opcode signature; a mismatch is a
/// bug in the caller and panics.
pub struct Builder {
    function: Function,
    block: BlockRef,
}

impl Builder {
    /// Takes ownership of `function` and starts a fresh block to insert into.
    pub fn new(mut function: Function) -> Builder {
        let block = function.push_block();
        Builder { function, block }
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn finish(self) -> Function {
        self.function
    }

    pub fn create_block(&mut self) -> BlockRef {
        self.function.push_block()
    }

    pub fn set_insert_point(&mut self, block: BlockRef) {
        self.block = block;
    }

    pub fn insert_point(&self) -> BlockRef {
        self.block
    }

    pub fn value(&self, v: ValueRef) -> &Value {
        self.function.value(v)
    }

    pub fn ty(&self, v: ValueRef) -> Type {
        self.value(v).ty
    }

    pub fn argument(&self, index: usize) -> ValueRef {
        self.function.arguments()[index]
    }

    fn verify(&self, opcode: Opcode, has_dest: bool, src: &[Operand; 3]) {
        let signature = opcode.info().signature;
        let dest_ok = match signature.dest() {
            OpcodeSignatureType::Void => !has_dest,
            OpcodeSignatureType::Value => has_dest,
            OpcodeSignatureType::Maybe => true,
            other => panic!("{}: invalid destination slot {:?}", opcode.name(), other),
        };
        if !dest_ok {
            panic!("{}: destination does not match signature", opcode.name());
        }

        for (i, (slot, operand)) in signature.sources().iter().zip(src).enumerate() {
            let ok = match (slot, operand) {
                (OpcodeSignatureType::Void, Operand::None) => true,
                (OpcodeSignatureType::Immediate, Operand::Immediate(_)) => true,
                (OpcodeSignatureType::Value, Operand::Value(_)) => true,
                (OpcodeSignatureType::Maybe, Operand::None | Operand::Value(_)) => true,
                (OpcodeSignatureType::Block, Operand::Block(_)) => true,
                (OpcodeSignatureType::Function, Operand::Function(_)) => true,
                _ => false,
            };
            if !ok {
                panic!("{}: operand {} is {:?}, signature expects {:?}", opcode.name(), i + 1, operand, slot);
            }
        }
    }

    fn push(&mut self, opcode: Opcode, flags: u32, dest: Option<ValueRef>, src: [Operand; 3]) {
        trace!("emit {} flags={:#x}", opcode.name(), flags);
        self.function.push_instruction(Instruction {
            opcode,
            flags,
            dest,
            src,
            block: self.block,
        });
    }

    fn emit_value(&mut self, opcode: Opcode, flags: u32, ty: Type, src: [Operand; 3]) -> ValueRef {
        self.verify(opcode, true, &src);
        let parent = ValueParent::Instruction(self.function.next_instruction());
        let dest = self.function.push_value(Value::new(ty, parent));
        self.push(opcode, flags, Some(dest), src);
        dest
    }

    fn emit_void(&mut self, opcode: Opcode, flags: u32, src: [Operand; 3]) {
        self.verify(opcode, false, &src);
        self.push(opcode, flags, None, src);
    }

    fn push_constant(&mut self, set: impl FnOnce(&mut Value)) -> ValueRef {
        let mut value = Value::new(Type::I8, ValueParent::Constant);
        set(&mut value);
        self.function.push_value(value)
    }

    pub fn get_constant_i8(&mut self, c: u8) -> ValueRef {
        self.push_constant(|v| v.set_constant_i8(c))
    }

    pub fn get_constant_i16(&mut self, c: u16) -> ValueRef {
        self.push_constant(|v| v.set_constant_i16(c))
    }

    pub fn get_constant_i32(&mut self, c: u32) -> ValueRef {
        self.push_constant(|v| v.set_constant_i32(c))
    }

    pub fn get_constant_i64(&mut self, c: u64) -> ValueRef {
        self.push_constant(|v| v.set_constant_i64(c))
    }

    pub fn get_constant_f32(&mut self, c: f32) -> ValueRef {
        self.push_constant(|v| v.set_constant_f32(c))
    }

    pub fn get_constant_f64(&mut self, c: f64) -> ValueRef {
        self.push_constant(|v| v.set_constant_f64(c))
    }

    pub fn get_constant_v128(&mut self, c: V128) -> ValueRef {
        self.push_constant(|v| v.set_constant_v128(c))
    }

    pub fn get_constant_v256(&mut self, c: V256) -> ValueRef {
        self.push_constant(|v| v.set_constant_v256(c))
    }

    /// Integer constant of type `ty`, truncated to its width.
    pub fn get_constant_int(&mut self, ty: Type, c: u64) -> ValueRef {
        match ty {
            Type::I8 => self.get_constant_i8(c as u8),
            Type::I16 => self.get_constant_i16(c as u16),
            Type::I32 => self.get_constant_i32(c as u32),
            Type::I64 => self.get_constant_i64(c),
            _ => panic!("get_constant_int for {}", ty),
        }
    }

    fn fold(&mut self, operands: &[ValueRef], f: impl FnOnce(&mut Value, &[&Value])) -> Option<ValueRef> {
        let values: Vec<&Value> = operands.iter().map(|&v| self.function.value(v)).collect();
        if !values.iter().all(|v| v.is_constant() && v.ty.is_integer()) {
            return None;
        }
        let mut folded = values[0].detached();
        f(&mut folded, &values[1..]);
        Some(self.function.push_value(folded))
    }

    fn same_type(&self, opcode: Opcode, lhs: ValueRef, rhs: ValueRef) -> Type {
        let (a, b) = (self.ty(lhs), self.ty(rhs));
        if a != b {
            panic!("{}: operand types differ ({} vs {})", opcode.name(), a, b);
        }
        a
    }

    fn binary(
        &mut self,
        opcode: Opcode,
        flags: u32,
        lhs: ValueRef,
        rhs: ValueRef,
        f: impl FnOnce(&mut Value, &Value),
    ) -> ValueRef {
        let ty = self.same_type(opcode, lhs, rhs);
        if let Some(folded) = self.fold(&[lhs, rhs], |a, rest| f(a, rest[0])) {
            return folded;
        }
        self.emit_value(opcode, flags, ty, [V(lhs), V(rhs), Operand::None])
    }

    fn unary(&mut self, opcode: Opcode, value: ValueRef, f: impl FnOnce(&mut Value)) -> ValueRef {
        if let Some(folded) = self.fold(&[value], |a, _| f(a)) {
            return folded;
        }
        let ty = self.ty(value);
        self.emit_value(opcode, 0, ty, [V(value), Operand::None, Operand::None])
    }

    pub fn create_add(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.binary(Opcode::Add, 0, lhs, rhs, Value::do_add)
    }

    pub fn create_sub(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.binary(Opcode::Sub, 0, lhs, rhs, Value::do_sub)
    }

    pub fn create_mul(&mut self, lhs: ValueRef, rhs: ValueRef, flags: ArithmeticFlags) -> ValueRef {
        self.binary(Opcode::Mul, flags.bits(), lhs, rhs, |a, b| a.do_mul(b, flags))
    }

    pub fn create_mulh(&mut self, lhs: ValueRef, rhs: ValueRef, flags: ArithmeticFlags) -> ValueRef {
        self.binary(Opcode::MulH, flags.bits(), lhs, rhs, |a, b| a.do_mulh(b, flags))
    }

    pub fn create_div(&mut self, lhs: ValueRef, rhs: ValueRef, flags: ArithmeticFlags) -> ValueRef {
        if self.value(rhs).is_constant_zero() {
            let ty = self.same_type(Opcode::Div, lhs, rhs);
            return self.emit_value(Opcode::Div, flags.bits(), ty, [V(lhs), V(rhs), Operand::None]);
        }
        self.binary(Opcode::Div, flags.bits(), lhs, rhs, |a, b| a.do_div(b, flags))
    }

    pub fn create_neg(&mut self, value: ValueRef) -> ValueRef {
        self.unary(Opcode::Neg, value, Value::do_neg)
    }

    pub fn create_not(&mut self, value: ValueRef) -> ValueRef {
        self.unary(Opcode::Not, value, Value::do_not)
    }

    pub fn create_ctlz(&mut self, value: ValueRef) -> ValueRef {
        self.unary(Opcode::Ctlz, value, Value::do_ctlz)
    }

    pub fn create_and(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.binary(Opcode::And, 0, lhs, rhs, Value::do_and)
    }

    pub fn create_or(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.binary(Opcode::Or, 0, lhs, rhs, Value::do_or)
    }

    pub fn create_xor(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.binary(Opcode::Xor, 0, lhs, rhs, Value::do_xor)
    }

    // Shift amounts may be any integer type; folding reads their low 8 bits.
    fn shift(&mut self, opcode: Opcode, value: ValueRef, amount: ValueRef, f: impl FnOnce(&mut Value, &Value)) -> ValueRef {
        if !self.ty(amount).is_integer() {
            panic!("{}: shift amount must be an integer", opcode.name());
        }
        if let Some(folded) = self.fold(&[value, amount], |a, rest| f(a, rest[0])) {
            return folded;
        }
        let ty = self.ty(value);
        self.emit_value(opcode, 0, ty, [V(value), V(amount), Operand::None])
    }

    pub fn create_shl(&mut self, value: ValueRef, amount: ValueRef) -> ValueRef {
        self.shift(Opcode::Shl, value, amount, Value::do_shl)
    }

    pub fn create_shr(&mut self, value: ValueRef, amount: ValueRef) -> ValueRef {
        self.shift(Opcode::Shr, value, amount, Value::do_shr)
    }

    pub fn create_shra(&mut self, value: ValueRef, amount: ValueRef) -> ValueRef {
        self.shift(Opcode::ShrA, value, amount, Value::do_shra)
    }

    pub fn create_shl_imm(&mut self, value: ValueRef, amount: u8) -> ValueRef {
        let amount = self.get_constant_i8(amount);
        self.create_shl(value, amount)
    }

    pub fn create_shr_imm(&mut self, value: ValueRef, amount: u8) -> ValueRef {
        let amount = self.get_constant_i8(amount);
        self.create_shr(value, amount)
    }

    pub fn create_shra_imm(&mut self, value: ValueRef, amount: u8) -> ValueRef {
        let amount = self.get_constant_i8(amount);
        self.create_shra(value, amount)
    }

    /// Result is an `I8` holding 0 or 1.
    pub fn create_cmp(&mut self, lhs: ValueRef, rhs: ValueRef, flags: CompareFlags) -> ValueRef {
        self.same_type(Opcode::Cmp, lhs, rhs);
        if let Some(folded) = self.fold(&[lhs, rhs], |a, rest| a.do_compare(rest[0], flags)) {
            return folded;
        }
        self.emit_value(Opcode::Cmp, flags.bits(), Type::I8, [V(lhs), V(rhs), Operand::None])
    }

    pub fn create_cmp_eq(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::EQ)
    }

    pub fn create_cmp_ne(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::NE)
    }

    pub fn create_cmp_slt(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::SLT)
    }

    pub fn create_cmp_sle(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::SLE)
    }

    pub fn create_cmp_sge(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::SGE)
    }

    pub fn create_cmp_sgt(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::SGT)
    }

    pub fn create_cmp_ult(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::ULT)
    }

    pub fn create_cmp_ule(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::ULE)
    }

    pub fn create_cmp_uge(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::UGE)
    }

    pub fn create_cmp_ugt(&mut self, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        self.create_cmp(lhs, rhs, CompareFlags::UGT)
    }

    /// Picks `if_true` when `cond` is non-zero.
    pub fn create_select(&mut self, cond: ValueRef, if_true: ValueRef, if_false: ValueRef) -> ValueRef {
        let ty = self.same_type(Opcode::Select, if_true, if_false);
        let condition = self.value(cond);
        if condition.is_constant() {
            return if condition.is_constant_true() { if_true } else { if_false };
        }
        self.emit_value(Opcode::Select, 0, ty, [V(cond), V(if_true), V(if_false)])
    }

    fn convert(&mut self, opcode: Opcode, value: ValueRef, ty: Type, f: impl FnOnce(&mut Value)) -> ValueRef {
        if self.ty(value) == ty {
            return value;
        }
        let folded = {
            let v = self.value(value);
            (v.is_constant() && !v.ty.is_vector()).then(|| {
                let mut folded = v.detached();
                f(&mut folded);
                folded
            })
        };
        if let Some(folded) = folded {
            return self.function.push_value(folded);
        }
        self.emit_value(opcode, 0, ty, [V(value), Operand::None, Operand::None])
    }

    pub fn create_zext(&mut self, value: ValueRef, ty: Type) -> ValueRef {
        self.convert(Opcode::ZExt, value, ty, |v| v.do_zext(ty))
    }

    pub fn create_sext(&mut self, value: ValueRef, ty: Type) -> ValueRef {
        self.convert(Opcode::SExt, value, ty, |v| v.do_sext(ty))
    }

    pub fn create_trunc(&mut self, value: ValueRef, ty: Type) -> ValueRef {
        self.convert(Opcode::Trunc, value, ty, |v| v.do_trunc(ty))
    }

    pub fn create_cast(&mut self, value: ValueRef, ty: Type) -> ValueRef {
        self.convert(Opcode::Cast, value, ty, |v| v.do_cast(ty))
    }

    pub fn create_convert(&mut self, value: ValueRef, ty: Type) -> ValueRef {
        self.convert(Opcode::Convert, value, ty, |v| v.do_convert(ty))
    }

    /// Loads a `ty` from the host address `addr`.
    pub fn create_load(&mut self, addr: ValueRef, ty: Type, flags: MemoryFlags) -> ValueRef {
        if self.ty(addr) != Type::I64 {
            panic!("load: address must be i64, got {}", self.ty(addr));
        }
        self.emit_value(Opcode::Load, flags.bits(), ty, [V(addr), Operand::None, Operand::None])
    }

    pub fn create_store(&mut self, addr: ValueRef, value: ValueRef, flags: MemoryFlags) {
        if self.ty(addr) != Type::I64 {
            panic!("store: address must be i64, got {}", self.ty(addr));
        }
        self.emit_void(Opcode::Store, flags.bits(), [V(addr), V(value), Operand::None]);
    }

    pub fn create_mem_fence(&mut self) {
        self.emit_void(Opcode::MemFence, 0, [Operand::None; 3]);
    }

    /// Reads `ty` at byte `offset` of the guest thread state.
    pub fn create_ctx_load(&mut self, offset: usize, ty: Type) -> ValueRef {
        self.emit_value(Opcode::CtxLoad, 0, ty, [Operand::Immediate(offset as u64), Operand::None, Operand::None])
    }

    pub fn create_ctx_store(&mut self, offset: usize, value: ValueRef) {
        self.emit_void(Opcode::CtxStore, 0, [Operand::Immediate(offset as u64), V(value), Operand::None]);
    }

    pub fn create_br(&mut self, block: BlockRef) {
        self.emit_void(Opcode::Br, 0, [Operand::Block(block), Operand::None, Operand::None]);
    }

    pub fn create_cond_br(&mut self, cond: ValueRef, block: BlockRef) {
        self.emit_void(Opcode::CondBr, 0, [V(cond), Operand::Block(block), Operand::None]);
    }

    pub fn create_ret(&mut self, value: Option<ValueRef>) {
        let src = value.map_or(Operand::None, V);
        self.emit_void(Opcode::Ret, 0, [src, Operand::None, Operand::None]);
    }

    pub fn create_call(&mut self, callee: FunctionRef, ret: Option<Type>, flags: CallFlags) -> Option<ValueRef> {
        let src = [Operand::Function(callee), Operand::None, Operand::None];
        match ret {
            Some(ty) => Some(self.emit_value(Opcode::Call, flags.bits(), ty, src)),
            None => {
                self.emit_void(Opcode::Call, flags.bits(), src);
                None
            }
        }
    }

    pub fn create_call_cond(&mut self, cond: ValueRef, callee: FunctionRef, flags: CallFlags) {
        self.emit_void(Opcode::CallCond, flags.bits(), [V(cond), Operand::Function(callee), Operand::None]);
    }

    pub fn create_extract(&mut self, vector: ValueRef, index: ValueRef, component: Type) -> ValueRef {
        self.emit_value(Opcode::Extract, component_flags(component), component, [V(vector), V(index), Operand::None])
    }

    pub fn create_insert(&mut self, vector: ValueRef, index: ValueRef, value: ValueRef, component: Type) -> ValueRef {
        let ty = self.ty(vector);
        self.emit_value(Opcode::Insert, component_flags(component), ty, [V(vector), V(index), V(value)])
    }

    pub fn create_splat(&mut self, value: ValueRef, ty: Type) -> ValueRef {
        let component = self.ty(value);
        self.emit_value(Opcode::Splat, component_flags(component), ty, [V(value), Operand::None, Operand::None])
    }

    pub fn create_vadd(&mut self, lhs: ValueRef, rhs: ValueRef, component: Type, flags: ArithmeticFlags) -> ValueRef {
        let ty = self.same_type(Opcode::VAdd, lhs, rhs);
        let flags = component_flags(component) | flags.bits();
        self.emit_value(Opcode::VAdd, flags, ty, [V(lhs), V(rhs), Operand::None])
    }

    pub fn create_vsub(&mut self, lhs: ValueRef, rhs: ValueRef, component: Type, flags: ArithmeticFlags) -> ValueRef {
        let ty = self.same_type(Opcode::VSub, lhs, rhs);
        let flags = component_flags(component) | flags.bits();
        self.emit_value(Opcode::VSub, flags, ty, [V(lhs), V(rhs), Operand::None])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::opcodes::component_type;

    fn builder() -> Builder {
        Builder::new(Function::new("test", &[Type::I64], None))
    }

    #[test]
    fn constants_fold_without_emitting() {
        let mut b = builder();
        let x = b.get_constant_i64(40);
        let y = b.get_constant_i64(2);
        let sum = b.create_add(x, y);
        assert_eq!(b.value(sum).int_value(), Some(42));
        let shifted = b.create_shl_imm(sum, 1);
        assert_eq!(b.value(shifted).int_value(), Some(84));
        assert_eq!(b.function().instructions().count(), 0);
    }

    #[test]
    fn runtime_values_emit() {
        let mut b = builder();
        let arg = b.argument(0);
        let one = b.get_constant_i64(1);
        let sum = b.create_add(arg, one);
        assert!(!b.value(sum).is_constant());
        let instr: Vec<_> = b.function().instructions().collect();
        assert_eq!(instr.len(), 1);
        assert_eq!(instr[0].opcode, Opcode::Add);
        assert_eq!(instr[0].dest, Some(sum));
    }

    #[test]
    fn identity_conversions_return_the_operand() {
        let mut b = builder();
        let arg = b.argument(0);
        assert_eq!(b.create_zext(arg, Type::I64), arg);
        assert_eq!(b.create_trunc(arg, Type::I64), arg);
        let narrow = b.create_trunc(arg, Type::I32);
        assert_eq!(b.ty(narrow), Type::I32);
    }

    #[test]
    fn division_by_constant_zero_is_not_folded() {
        let mut b = builder();
        let x = b.get_constant_i64(1);
        let zero = b.get_constant_i64(0);
        let q = b.create_div(x, zero, ArithmeticFlags::UNSIGNED);
        assert!(!b.value(q).is_constant());
    }

    #[test]
    fn compare_and_select_fold() {
        let mut b = builder();
        let x = b.get_constant_i64(u64::MAX);
        let y = b.get_constant_i64(1);
        let lt = b.create_cmp_slt(x, y);
        assert_eq!(b.ty(lt), Type::I8);
        assert!(b.value(lt).is_constant_true());
        let picked = b.create_select(lt, x, y);
        assert_eq!(picked, x);
    }

    #[test]
    fn display_lists_instructions() {
        let mut b = builder();
        let arg = b.argument(0);
        let v = b.create_load(arg, Type::I32, MemoryFlags::ENDIAN_BIG);
        b.create_mem_fence();
        b.create_ret(Some(v));
        let text = b.finish().to_string();
        assert!(text.contains("load.be.i32 v0"), "{}", text);
        assert!(text.contains("mem_fence"), "{}", text);
        assert!(text.contains("ret v1"), "{}", text);
    }

    #[test]
    #[should_panic(expected = "signature expects")]
    fn signature_mismatch_panics() {
        let mut b = builder();
        b.emit_void(Opcode::Br, 0, [Operand::None; 3]);
    }

    #[test]
    #[should_panic(expected = "operand types differ")]
    fn mixed_types_panic() {
        let mut b = builder();
        let x = b.get_constant_i64(1);
        let y = b.get_constant_i32(1);
        b.create_add(x, y);
    }

    fn opcodes(f: &Function, block: BlockRef) -> Vec<Opcode> {
        f.block(block).instructions.iter().map(|&i| f.instruction(i).opcode).collect()
    }

    #[test]
    fn branches_land_in_the_insert_block() {
        let mut b = builder();
        let entry = b.insert_point();
        let exit = b.create_block();
        assert_ne!(entry, exit);

        let arg = b.argument(0);
        let zero = b.get_constant_i64(0);
        let cond = b.create_cmp_eq(arg, zero);
        b.create_cond_br(cond, exit);
        b.create_br(exit);

        b.set_insert_point(exit);
        assert_eq!(b.insert_point(), exit);
        b.create_ret(None);

        let f = b.finish();
        assert_eq!(opcodes(&f, entry), [Opcode::Cmp, Opcode::CondBr, Opcode::Br]);
        assert_eq!(opcodes(&f, exit), [Opcode::Ret]);
        assert!(f.instructions().filter(|i| i.opcode == Opcode::Ret).all(|i| i.block == exit));

        let text = f.to_string();
        assert!(text.contains("block0:\n"), "{}", text);
        assert!(text.contains("block1:\n    ret\n"), "{}", text);
        assert!(text.contains("cond_br v1, block1"), "{}", text);
        assert!(text.contains("    br block1\n"), "{}", text);
    }

    #[test]
    fn calls_carry_callee_and_flags() {
        let mut b = builder();
        let result = b.create_call(FunctionRef(7), Some(Type::I64), CallFlags::empty()).unwrap();
        assert_eq!(b.ty(result), Type::I64);
        assert_eq!(b.create_call(FunctionRef(8), None, CallFlags::EXTERN), None);

        let arg = b.argument(0);
        let cond = b.create_cmp_ne(arg, result);
        b.create_call_cond(cond, FunctionRef(9), CallFlags::EXTERN);

        let f = b.finish();
        let calls: Vec<_> = f
            .instructions()
            .filter(|i| matches!(i.opcode, Opcode::Call | Opcode::CallCond))
            .collect();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].dest, Some(result));
        assert_eq!(calls[1].dest, None);
        assert_eq!(calls[1].flags, CallFlags::EXTERN.bits());
        assert_eq!(calls[2].src[0], Operand::Value(cond));
        assert_eq!(calls[2].src[1], Operand::Function(FunctionRef(9)));

        let text = f.to_string();
        assert!(text.contains("call.i64 @7"), "{}", text);
        assert!(text.contains("    call @8\n"), "{}", text);
        assert!(text.contains("call_cond v"), "{}", text);
        assert!(text.contains(", @9"), "{}", text);
    }

    #[test]
    fn vector_ops_record_their_component() {
        let mut b = builder();
        let arg = b.argument(0);
        let word = b.create_trunc(arg, Type::I32);
        let splat = b.create_splat(word, Type::V128);
        assert_eq!(b.ty(splat), Type::V128);

        let one = b.get_constant_v128(V128(1));
        let sum = b.create_vadd(splat, one, Type::I32, ArithmeticFlags::UNSIGNED);
        let diff = b.create_vsub(sum, one, Type::I32, ArithmeticFlags::empty());
        assert_eq!(b.ty(diff), Type::V128);

        let index = b.get_constant_i8(2);
        let lane = b.create_extract(diff, index, Type::I32);
        assert_eq!(b.ty(lane), Type::I32);
        let updated = b.create_insert(diff, index, lane, Type::I32);
        assert_eq!(b.ty(updated), Type::V128);

        let f = b.finish();
        let ops: Vec<_> = f
            .instructions()
            .filter(|i| i.opcode != Opcode::Trunc)
            .map(|i| (i.opcode, component_type(i.flags)))
            .collect();
        assert_eq!(
            ops,
            [
                (Opcode::Splat, Some(Type::I32)),
                (Opcode::VAdd, Some(Type::I32)),
                (Opcode::VSub, Some(Type::I32)),
                (Opcode::Extract, Some(Type::I32)),
                (Opcode::Insert, Some(Type::I32)),
            ]
        );

        let text = f.to_string();
        assert!(text.contains("splat.i32.v128"), "{}", text);
        assert!(text.contains("vadd.u.i32.v128"), "{}", text);
        assert!(text.contains("vsub.i32.v128"), "{}", text);
        assert!(text.contains("extract.i32.i32"), "{}", text);
        assert!(text.contains("insert.i32.v128"), "{}", text);
    }

    #[test]
    fn v256_constants_keep_both_halves() {
        let mut b = builder();
        let c = b.get_constant_v256(V256([1, 2]));
        assert_eq!(b.ty(c), Type::V256);
        assert!(b.value(c).is_constant());
        assert_eq!(b.value(c).constant.v256(), V256([1, 2]));

        let byte = b.get_constant_i8(0x7f);
        let splat = b.create_splat(byte, Type::V256);
        let sum = b.create_vadd(splat, c, Type::I8, ArithmeticFlags::empty());
        assert_eq!(b.ty(sum), Type::V256);
        assert_eq!(b.function().instructions().count(), 2);
    }

    #[test]
    #[should_panic(expected = "operand types differ")]
    fn vector_width_mismatch_panics() {
        let mut b = builder();
        let narrow = b.get_constant_v128(V128(0));
        let wide = b.get_constant_v256(V256::ZERO);
        b.create_vadd(narrow, wide, Type::I32, ArithmeticFlags::empty());
    }

    #[test]
    #[should_panic(expected = "signature expects")]
    fn cond_br_operands_are_checked() {
        let mut b = builder();
        let exit = b.create_block();
        let cond = b.get_constant_i8(1);
        b.emit_void(Opcode::CondBr, 0, [Operand::Block(exit), Operand::Value(cond), Operand::None]);
    }

    #[test]
    #[should_panic(expected = "destination does not match signature")]
    fn br_has_no_destination() {
        let mut b = builder();
        let exit = b.create_block();
        b.emit_value(Opcode::Br, 0, Type::I64, [Operand::Block(exit), Operand::None, Operand::None]);
    }
}
