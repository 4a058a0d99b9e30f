//! The instruction set.

use crate::{VmError, VmResult};

/// Operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSize {
    /// No operand.
    None,
    /// A fixed number of operand bytes.
    Fixed(usize),
    /// A length prefix of the given width followed by that many bytes.
    Prefix(usize),
}

macro_rules! op_codes {
    ($(($name:ident, $value:expr, $operand:expr, $price:expr)),+ $(,)?) => {
        /// A NeoVM opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $($name = $value),+
        }

        impl OpCode {
            /// Decodes an opcode byte.
            pub fn from_byte(value: u8) -> VmResult<Self> {
                match value {
                    $($value => Ok(OpCode::$name),)+
                    other => Err(VmError::InvalidScript(format!(
                        "unknown opcode {other:#04x}"
                    ))),
                }
            }

            /// Gets the operand layout.
            pub fn operand_size(&self) -> OperandSize {
                match self {
                    $(OpCode::$name => $operand),+
                }
            }

            /// Gets the base gas price, before the execution fee factor.
            pub fn price(&self) -> i64 {
                match self {
                    $(OpCode::$name => $price),+
                }
            }
        }
    };
}

use OperandSize::{Fixed, None as NoOperand, Prefix};

op_codes! {
    // Constants
    (PushInt8, 0x00, Fixed(1), 1),
    (PushInt16, 0x01, Fixed(2), 1),
    (PushInt32, 0x02, Fixed(4), 1),
    (PushInt64, 0x03, Fixed(8), 1),
    (PushInt128, 0x04, Fixed(16), 1 << 2),
    (PushInt256, 0x05, Fixed(32), 1 << 2),
    (PushT, 0x08, NoOperand, 1),
    (PushF, 0x09, NoOperand, 1),
    (PushA, 0x0A, Fixed(4), 1 << 2),
    (PushNull, 0x0B, NoOperand, 1),
    (PushData1, 0x0C, Prefix(1), 1 << 3),
    (PushData2, 0x0D, Prefix(2), 1 << 9),
    (PushData4, 0x0E, Prefix(4), 1 << 12),
    (PushM1, 0x0F, NoOperand, 1),
    (Push0, 0x10, NoOperand, 1),
    (Push1, 0x11, NoOperand, 1),
    (Push2, 0x12, NoOperand, 1),
    (Push3, 0x13, NoOperand, 1),
    (Push4, 0x14, NoOperand, 1),
    (Push5, 0x15, NoOperand, 1),
    (Push6, 0x16, NoOperand, 1),
    (Push7, 0x17, NoOperand, 1),
    (Push8, 0x18, NoOperand, 1),
    (Push9, 0x19, NoOperand, 1),
    (Push10, 0x1A, NoOperand, 1),
    (Push11, 0x1B, NoOperand, 1),
    (Push12, 0x1C, NoOperand, 1),
    (Push13, 0x1D, NoOperand, 1),
    (Push14, 0x1E, NoOperand, 1),
    (Push15, 0x1F, NoOperand, 1),
    (Push16, 0x20, NoOperand, 1),

    // Flow control
    (Nop, 0x21, NoOperand, 1),
    (Jmp, 0x22, Fixed(1), 1 << 1),
    (JmpL, 0x23, Fixed(4), 1 << 1),
    (JmpIf, 0x24, Fixed(1), 1 << 1),
    (JmpIfL, 0x25, Fixed(4), 1 << 1),
    (JmpIfNot, 0x26, Fixed(1), 1 << 1),
    (JmpIfNotL, 0x27, Fixed(4), 1 << 1),
    (JmpEq, 0x28, Fixed(1), 1 << 1),
    (JmpEqL, 0x29, Fixed(4), 1 << 1),
    (JmpNe, 0x2A, Fixed(1), 1 << 1),
    (JmpNeL, 0x2B, Fixed(4), 1 << 1),
    (JmpGt, 0x2C, Fixed(1), 1 << 1),
    (JmpGtL, 0x2D, Fixed(4), 1 << 1),
    (JmpGe, 0x2E, Fixed(1), 1 << 1),
    (JmpGeL, 0x2F, Fixed(4), 1 << 1),
    (JmpLt, 0x30, Fixed(1), 1 << 1),
    (JmpLtL, 0x31, Fixed(4), 1 << 1),
    (JmpLe, 0x32, Fixed(1), 1 << 1),
    (JmpLeL, 0x33, Fixed(4), 1 << 1),
    (Call, 0x34, Fixed(1), 1 << 9),
    (CallL, 0x35, Fixed(4), 1 << 9),
    (CallA, 0x36, NoOperand, 1 << 9),
    (Abort, 0x38, NoOperand, 0),
    (Assert, 0x39, NoOperand, 1),
    (Throw, 0x3A, NoOperand, 1 << 9),
    (Try, 0x3B, Fixed(2), 1 << 2),
    (TryL, 0x3C, Fixed(8), 1 << 2),
    (EndTry, 0x3D, Fixed(1), 1 << 2),
    (EndTryL, 0x3E, Fixed(4), 1 << 2),
    (EndFinally, 0x3F, NoOperand, 1 << 2),
    (Ret, 0x40, NoOperand, 0),
    (Syscall, 0x41, Fixed(4), 0),

    // Stack
    (Depth, 0x43, NoOperand, 1 << 1),
    (Drop, 0x45, NoOperand, 1 << 1),
    (Nip, 0x46, NoOperand, 1 << 1),
    (XDrop, 0x48, NoOperand, 1 << 4),
    (Clear, 0x49, NoOperand, 1 << 4),
    (Dup, 0x4A, NoOperand, 1 << 1),
    (Over, 0x4B, NoOperand, 1 << 1),
    (Pick, 0x4D, NoOperand, 1 << 1),
    (Tuck, 0x4E, NoOperand, 1 << 1),
    (Swap, 0x50, NoOperand, 1 << 1),
    (Rot, 0x51, NoOperand, 1 << 1),
    (Roll, 0x52, NoOperand, 1 << 4),
    (Reverse3, 0x53, NoOperand, 1 << 1),
    (Reverse4, 0x54, NoOperand, 1 << 1),
    (ReverseN, 0x55, NoOperand, 1 << 4),

    // Slots
    (InitSSlot, 0x56, Fixed(1), 1 << 4),
    (InitSlot, 0x57, Fixed(2), 1 << 6),
    (LdSFld0, 0x58, NoOperand, 1 << 1),
    (LdSFld1, 0x59, NoOperand, 1 << 1),
    (LdSFld2, 0x5A, NoOperand, 1 << 1),
    (LdSFld3, 0x5B, NoOperand, 1 << 1),
    (LdSFld4, 0x5C, NoOperand, 1 << 1),
    (LdSFld5, 0x5D, NoOperand, 1 << 1),
    (LdSFld6, 0x5E, NoOperand, 1 << 1),
    (LdSFld, 0x5F, Fixed(1), 1 << 1),
    (StSFld0, 0x60, NoOperand, 1 << 1),
    (StSFld1, 0x61, NoOperand, 1 << 1),
    (StSFld2, 0x62, NoOperand, 1 << 1),
    (StSFld3, 0x63, NoOperand, 1 << 1),
    (StSFld4, 0x64, NoOperand, 1 << 1),
    (StSFld5, 0x65, NoOperand, 1 << 1),
    (StSFld6, 0x66, NoOperand, 1 << 1),
    (StSFld, 0x67, Fixed(1), 1 << 1),
    (LdLoc0, 0x68, NoOperand, 1 << 1),
    (LdLoc1, 0x69, NoOperand, 1 << 1),
    (LdLoc2, 0x6A, NoOperand, 1 << 1),
    (LdLoc3, 0x6B, NoOperand, 1 << 1),
    (LdLoc4, 0x6C, NoOperand, 1 << 1),
    (LdLoc5, 0x6D, NoOperand, 1 << 1),
    (LdLoc6, 0x6E, NoOperand, 1 << 1),
    (LdLoc, 0x6F, Fixed(1), 1 << 1),
    (StLoc0, 0x70, NoOperand, 1 << 1),
    (StLoc1, 0x71, NoOperand, 1 << 1),
    (StLoc2, 0x72, NoOperand, 1 << 1),
    (StLoc3, 0x73, NoOperand, 1 << 1),
    (StLoc4, 0x74, NoOperand, 1 << 1),
    (StLoc5, 0x75, NoOperand, 1 << 1),
    (StLoc6, 0x76, NoOperand, 1 << 1),
    (StLoc, 0x77, Fixed(1), 1 << 1),
    (LdArg0, 0x78, NoOperand, 1 << 1),
    (LdArg1, 0x79, NoOperand, 1 << 1),
    (LdArg2, 0x7A, NoOperand, 1 << 1),
    (LdArg3, 0x7B, NoOperand, 1 << 1),
    (LdArg4, 0x7C, NoOperand, 1 << 1),
    (LdArg5, 0x7D, NoOperand, 1 << 1),
    (LdArg6, 0x7E, NoOperand, 1 << 1),
    (LdArg, 0x7F, Fixed(1), 1 << 1),
    (StArg0, 0x80, NoOperand, 1 << 1),
    (StArg1, 0x81, NoOperand, 1 << 1),
    (StArg2, 0x82, NoOperand, 1 << 1),
    (StArg3, 0x83, NoOperand, 1 << 1),
    (StArg4, 0x84, NoOperand, 1 << 1),
    (StArg5, 0x85, NoOperand, 1 << 1),
    (StArg6, 0x86, NoOperand, 1 << 1),
    (StArg, 0x87, Fixed(1), 1 << 1),

    // Splice
    (NewBuffer, 0x88, NoOperand, 1 << 8),
    (Cat, 0x8B, NoOperand, 1 << 11),
    (SubStr, 0x8C, NoOperand, 1 << 11),
    (Left, 0x8D, NoOperand, 1 << 11),
    (Right, 0x8E, NoOperand, 1 << 11),

    // Bitwise and equality
    (Invert, 0x90, NoOperand, 1 << 2),
    (And, 0x91, NoOperand, 1 << 3),
    (Or, 0x92, NoOperand, 1 << 3),
    (Xor, 0x93, NoOperand, 1 << 3),
    (Equal, 0x97, NoOperand, 1 << 5),
    (NotEqual, 0x98, NoOperand, 1 << 5),

    // Numeric
    (Sign, 0x99, NoOperand, 1 << 2),
    (Abs, 0x9A, NoOperand, 1 << 2),
    (Negate, 0x9B, NoOperand, 1 << 2),
    (Inc, 0x9C, NoOperand, 1 << 2),
    (Dec, 0x9D, NoOperand, 1 << 2),
    (Add, 0x9E, NoOperand, 1 << 3),
    (Sub, 0x9F, NoOperand, 1 << 3),
    (Mul, 0xA0, NoOperand, 1 << 3),
    (Div, 0xA1, NoOperand, 1 << 3),
    (Mod, 0xA2, NoOperand, 1 << 3),
    (Pow, 0xA3, NoOperand, 1 << 6),
    (Sqrt, 0xA4, NoOperand, 1 << 6),
    (Shl, 0xA8, NoOperand, 1 << 3),
    (Shr, 0xA9, NoOperand, 1 << 3),
    (Not, 0xAA, NoOperand, 1 << 2),
    (BoolAnd, 0xAB, NoOperand, 1 << 3),
    (BoolOr, 0xAC, NoOperand, 1 << 3),
    (Nz, 0xB1, NoOperand, 1 << 2),
    (NumEqual, 0xB3, NoOperand, 1 << 3),
    (NumNotEqual, 0xB4, NoOperand, 1 << 3),
    (Lt, 0xB5, NoOperand, 1 << 3),
    (Le, 0xB6, NoOperand, 1 << 3),
    (Gt, 0xB7, NoOperand, 1 << 3),
    (Ge, 0xB8, NoOperand, 1 << 3),
    (Min, 0xB9, NoOperand, 1 << 3),
    (Max, 0xBA, NoOperand, 1 << 3),
    (Within, 0xBB, NoOperand, 1 << 3),

    // Compound types
    (Pack, 0xC0, NoOperand, 1 << 11),
    (Unpack, 0xC1, NoOperand, 1 << 11),
    (NewArray0, 0xC2, NoOperand, 1 << 4),
    (NewArray, 0xC3, NoOperand, 1 << 9),
    (NewStruct0, 0xC5, NoOperand, 1 << 4),
    (NewStruct, 0xC6, NoOperand, 1 << 9),
    (NewMap, 0xC8, NoOperand, 1 << 3),
    (Size, 0xCA, NoOperand, 1 << 2),
    (HasKey, 0xCB, NoOperand, 1 << 6),
    (Keys, 0xCC, NoOperand, 1 << 4),
    (Values, 0xCD, NoOperand, 1 << 13),
    (PickItem, 0xCE, NoOperand, 1 << 6),
    (Append, 0xCF, NoOperand, 1 << 13),
    (SetItem, 0xD0, NoOperand, 1 << 13),
    (ReverseItems, 0xD1, NoOperand, 1 << 13),
    (Remove, 0xD2, NoOperand, 1 << 4),
    (ClearItems, 0xD3, NoOperand, 1 << 4),
    (PopItem, 0xD4, NoOperand, 1 << 4),

    // Types
    (IsNull, 0xD8, NoOperand, 1 << 1),
    (IsType, 0xD9, Fixed(1), 1 << 1),
    (Convert, 0xDB, Fixed(1), 1 << 13),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_and_unknown() {
        assert_eq!(OpCode::from_byte(0x40).unwrap(), OpCode::Ret);
        assert_eq!(OpCode::from_byte(0x41).unwrap(), OpCode::Syscall);
        assert!(OpCode::from_byte(0xFE).is_err());
    }

    #[test]
    fn operand_layouts() {
        assert_eq!(OpCode::PushData1.operand_size(), OperandSize::Prefix(1));
        assert_eq!(OpCode::JmpL.operand_size(), OperandSize::Fixed(4));
        assert_eq!(OpCode::Dup.operand_size(), OperandSize::None);
        assert_eq!(OpCode::TryL.operand_size(), OperandSize::Fixed(8));
    }

    #[test]
    fn prices_are_positive_except_terminators() {
        assert_eq!(OpCode::Ret.price(), 0);
        assert_eq!(OpCode::Abort.price(), 0);
        assert!(OpCode::Add.price() > 0);
    }
}
