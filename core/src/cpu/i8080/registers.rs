//! Register and pair selector codes shared by several instruction families
//! (SPEC_FULL.md §4.1's "Operand selector codes").

/// 3-bit operand selector: 000=B 001=C 010=D 011=E 100=H 101=L 110=M 111=A.
pub const SEL_B: u8 = 0;
pub const SEL_C: u8 = 1;
pub const SEL_D: u8 = 2;
pub const SEL_E: u8 = 3;
pub const SEL_H: u8 = 4;
pub const SEL_L: u8 = 5;
pub const SEL_M: u8 = 6;
pub const SEL_A: u8 = 7;

/// 2-bit pair selector used by INX/DCX/DAD/LXI: 00=BC 01=DE 10=HL 11=SP.
/// LDAX/STAX and PUSH/POP reinterpret the same field (see DESIGN.md).
pub const RP_BC: u8 = 0;
pub const RP_DE: u8 = 1;
pub const RP_HL: u8 = 2;
pub const RP_SP: u8 = 3;
