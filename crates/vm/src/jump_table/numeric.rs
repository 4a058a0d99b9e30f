//! Arithmetic and comparison instructions.

use crate::stack_item::check_integer;
use crate::{ExecutionEngine, Instruction, OpCode, StackItem, VmError, VmResult};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Maximum shift distance in bits.
const MAX_SHIFT: u32 = 256;

impl ExecutionEngine {
    pub(crate) fn exec_numeric(&mut self, ix: &Instruction) -> VmResult<()> {
        use OpCode::*;
        match ix.opcode {
            Sign => {
                let value = self.pop_int()?;
                self.push(StackItem::from_int(match value.sign() {
                    num_bigint::Sign::Minus => -1i64,
                    num_bigint::Sign::NoSign => 0,
                    num_bigint::Sign::Plus => 1,
                }))
            }
            Abs => self.unary(|value| Ok(value.abs())),
            Negate => self.unary(|value| Ok(-value)),
            Inc => self.unary(|value| Ok(value + 1)),
            Dec => self.unary(|value| Ok(value - 1)),
            Add => self.binary(|a, b| Ok(a + b)),
            Sub => self.binary(|a, b| Ok(a - b)),
            Mul => self.binary(|a, b| Ok(a * b)),
            Div => self.binary(|a, b| {
                if b.is_zero() {
                    Err(VmError::InvalidOperation("division by zero".to_string()))
                } else {
                    Ok(a / b)
                }
            }),
            Mod => self.binary(|a, b| {
                if b.is_zero() {
                    Err(VmError::InvalidOperation("modulo by zero".to_string()))
                } else {
                    Ok(a % b)
                }
            }),
            Pow => self.binary(|a, b| {
                let exponent = b
                    .to_u32()
                    .ok_or_else(|| VmError::InvalidOperation("invalid exponent".to_string()))?;
                Ok(a.pow(exponent))
            }),
            Sqrt => self.unary(|value| {
                if value.is_negative() {
                    Err(VmError::InvalidOperation(
                        "square root of a negative".to_string(),
                    ))
                } else {
                    Ok(value.sqrt())
                }
            }),
            Shl => self.binary(|a, b| {
                let shift = valid_shift(&b)?;
                if shift == 0 {
                    Ok(a)
                } else {
                    Ok(a << shift)
                }
            }),
            Shr => self.binary(|a, b| {
                let shift = valid_shift(&b)?;
                if shift == 0 {
                    Ok(a)
                } else {
                    Ok(a >> shift)
                }
            }),
            Not => {
                let value = self.pop_bool()?;
                self.push(StackItem::Boolean(!value))
            }
            BoolAnd => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(StackItem::Boolean(a && b))
            }
            BoolOr => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(StackItem::Boolean(a || b))
            }
            Nz => {
                let value = self.pop_int()?;
                self.push(StackItem::Boolean(!value.is_zero()))
            }
            NumEqual | NumNotEqual | Lt | Le | Gt | Ge => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let result = match ix.opcode {
                    NumEqual => a == b,
                    NumNotEqual => a != b,
                    Lt => a < b,
                    Le => a <= b,
                    Gt => a > b,
                    _ => a >= b,
                };
                self.push(StackItem::Boolean(result))
            }
            Min => self.binary(|a, b| Ok(a.min(b))),
            Max => self.binary(|a, b| Ok(a.max(b))),
            Within => {
                let upper = self.pop_int()?;
                let lower = self.pop_int()?;
                let value = self.pop_int()?;
                self.push(StackItem::Boolean(lower <= value && value < upper))
            }
            _ => unreachable!("numeric dispatch covers all variants"),
        }
    }

    fn unary(&mut self, f: impl FnOnce(BigInt) -> VmResult<BigInt>) -> VmResult<()> {
        let value = self.pop_int()?;
        let result = f(value)?;
        check_integer(&result)?;
        self.push(StackItem::Integer(result))
    }

    fn binary(&mut self, f: impl FnOnce(BigInt, BigInt) -> VmResult<BigInt>) -> VmResult<()> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        let result = f(a, b)?;
        check_integer(&result)?;
        self.push(StackItem::Integer(result))
    }
}

fn valid_shift(value: &BigInt) -> VmResult<u32> {
    let shift = value
        .to_u32()
        .filter(|&s| s <= MAX_SHIFT)
        .ok_or_else(|| VmError::InvalidOperation(format!("invalid shift {value}")))?;
    Ok(shift)
}
