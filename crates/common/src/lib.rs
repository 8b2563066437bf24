//! Shared contract of the phpi toolchain.
//!
//! Everything the compiler, optimizer and virtual machine must agree on
//! lives here:
//!
//! - [`Opcode`] and the operand-width table
//! - [`Instruction`] and [`Operand`]: decoded view with encode/decode
//! - [`Function`], [`FunctionTable`] and [`Program`]
//! - [`Variant`] and its coercions, tagged by [`VariantType`]
//! - the [`ast`] types produced by the frontend
//! - [`DecodeError`] and [`NativeError`]

pub mod ast;
pub mod error;
pub mod function;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod variant;
pub mod variant_type;

pub use error::{DecodeError, NativeError};
pub use function::{Function, MAIN_NAME};
pub use instruction::{Instruction, Operand};
pub use opcode::{Opcode, OperandKind};
pub use program::{FunctionEntry, FunctionId, FunctionKind, FunctionTable, NativeFn, Program};
pub use variant::Variant;
pub use variant_type::VariantType;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(&opcode::ALL_OPCODES[..])
    }

    fn arb_operand(kind: OperandKind) -> BoxedStrategy<Operand> {
        match kind {
            OperandKind::None => Just(Operand::None).boxed(),
            OperandKind::Str => any::<u16>().prop_map(Operand::Str).boxed(),
            OperandKind::Long => any::<i64>().prop_map(Operand::Long).boxed(),
            OperandKind::Addr => any::<u32>().prop_map(Operand::Addr).boxed(),
            OperandKind::Argc => any::<u8>().prop_map(Operand::Argc).boxed(),
            OperandKind::Type => prop::sample::select(&variant_type::ALL_VARIANT_TYPES[..])
                .prop_map(Operand::Type)
                .boxed(),
            OperandKind::Line => any::<u32>().prop_map(Operand::Line).boxed(),
        }
    }

    fn arb_instruction() -> impl Strategy<Value = Instruction> {
        arb_opcode().prop_flat_map(|op| {
            arb_operand(op.operand_kind()).prop_map(move |operand| Instruction::new(op, operand))
        })
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(instr in arb_instruction()) {
            let bytes = instr.encode();
            prop_assert_eq!(bytes.len(), instr.width());
            prop_assert_eq!(Instruction::decode(&bytes, 0), Ok(instr));
        }

        /// Arbitrary bytes either decode to something that re-encodes to the
        /// same prefix, or fail with a decode error.
        #[test]
        fn random_bytes_decode(bytes in prop::collection::vec(any::<u8>(), 1..16)) {
            if let Ok(instr) = Instruction::decode(&bytes, 0) {
                prop_assert_eq!(&instr.encode()[..], &bytes[..instr.width()]);
            }
        }

        /// A stream of encoded instructions walks back into the same sequence.
        #[test]
        fn stream_walk(instrs in prop::collection::vec(arb_instruction(), 0..40)) {
            let mut f = Function::new("f", 1);
            for instr in &instrs {
                f.emit(*instr, 1);
            }
            let decoded: Vec<Instruction> = f
                .instructions()
                .map(|r| r.map(|(_, i)| i))
                .collect::<Result<_, _>>()
                .unwrap();
            prop_assert_eq!(decoded, instrs);
        }

        #[test]
        fn loose_eq_reflexive_for_scalars(n in any::<i64>(), s in ".{0,8}") {
            prop_assert!(Variant::Long(n).loose_eq(&Variant::Long(n)));
            prop_assert!(Variant::String(s.clone()).loose_eq(&Variant::String(s)));
        }
    }
}
