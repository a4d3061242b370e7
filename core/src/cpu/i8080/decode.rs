//! Pure opcode decoder: bytes in, an [`Instruction`] value out.
//!
//! No execution happens here; [`super::exec`] dispatches on [`Kind`]
//! separately, so decoding never allocates and never touches the bus.

use std::fmt;

/// The opcodes that match no defined instruction pattern.
pub const INVALID_OPCODES: [u8; 12] = [
    0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0xCB, 0xD9, 0xDD, 0xED, 0xFD,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub opcode: u8,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown instruction 0x{:02X}", self.opcode)
    }
}

impl std::error::Error for DecodeError {}

/// The eight ALU operations selected by bits 5-3 of both the register-form
/// (0x80-0xBF) and immediate-form (0xC6-0xFE) arithmetic/logic opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbb,
    Ana,
    Xra,
    Ora,
    Cmp,
}

impl AluOp {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbb,
            4 => AluOp::Ana,
            5 => AluOp::Xra,
            6 => AluOp::Ora,
            7 => AluOp::Cmp,
            _ => unreachable!("alu op selector is 3 bits"),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "ADD",
            AluOp::Adc => "ADC",
            AluOp::Sub => "SUB",
            AluOp::Sbb => "SBB",
            AluOp::Ana => "ANA",
            AluOp::Xra => "XRA",
            AluOp::Ora => "ORA",
            AluOp::Cmp => "CMP",
        }
    }

    fn immediate_mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "ADI",
            AluOp::Adc => "ACI",
            AluOp::Sub => "SUI",
            AluOp::Sbb => "SBI",
            AluOp::Ana => "ANI",
            AluOp::Xra => "XRI",
            AluOp::Ora => "ORI",
            AluOp::Cmp => "CPI",
        }
    }
}

/// One of the eight condition predicates on the flag register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Nz,
    Z,
    Nc,
    C,
    Po,
    Pe,
    P,
    M,
}

impl Cond {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Cond::Nz,
            1 => Cond::Z,
            2 => Cond::Nc,
            3 => Cond::C,
            4 => Cond::Po,
            5 => Cond::Pe,
            6 => Cond::P,
            7 => Cond::M,
            _ => unreachable!("condition selector is 3 bits"),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Cond::Nz => "NZ",
            Cond::Z => "Z",
            Cond::Nc => "NC",
            Cond::C => "C",
            Cond::Po => "P0",
            Cond::Pe => "P1",
            Cond::P => "+",
            Cond::M => "-",
        }
    }
}

/// The operand-carrying part of a decoded instruction. Register/pair
/// operands are kept as the raw 3-bit/2-bit selector from the opcode
/// (see [`super::registers`]) rather than resolved eagerly, since
/// resolving `M` requires bus access the decoder doesn't have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Nop,
    AluReg { op: AluOp, src: u8 },
    AluImm { op: AluOp, data: u8 },
    Mov { dst: u8, src: u8 },
    MviImm { dst: u8, data: u8 },
    IncDecReg { sel: u8, inc: bool },
    IncDecPair { rp: u8, inc: bool },
    Dad { rp: u8 },
    Lxi { rp: u8, data: u16 },
    Ldax { rp: u8 },
    Stax { rp: u8 },
    Push { rp: u8 },
    Pop { rp: u8 },
    Rst { n: u8 },
    Jmp { addr: u16 },
    Jcc { cond: Cond, addr: u16 },
    Call { addr: u16 },
    Ccc { cond: Cond, addr: u16 },
    Ret,
    Rcc { cond: Cond },
    Lda { addr: u16 },
    Sta { addr: u16 },
    Lhld { addr: u16 },
    Shld { addr: u16 },
    Xchg,
    Xthl,
    Sphl,
    Pchl,
    Rlc,
    Rrc,
    Ral,
    Rar,
    Daa,
    Cma,
    Stc,
    Cmc,
    Di,
    Ei,
    Hlt,
    In { port: u8 },
    Out { port: u8 },
}

/// A decoded instruction: its mnemonic, encoded size in bytes, and the
/// operand payload the executor dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub name: &'static str,
    pub size: u8,
    pub kind: Kind,
}

fn le16(b1: u8, b2: u8) -> u16 {
    (b2 as u16) << 8 | b1 as u16
}

/// Decode one instruction starting at `bytes[0]`. `bytes` must contain at
/// least as many bytes as the instruction needs (1-3); a short slice for an
/// otherwise-valid opcode is a caller bug (the CPU always has 65536 bytes of
/// memory available) and panics rather than returning a confusing decode
/// error.
pub fn decode(bytes: &[u8]) -> Result<Instruction, DecodeError> {
    let op = bytes[0];

    if INVALID_OPCODES.contains(&op) {
        return Err(DecodeError { opcode: op });
    }

    // Literal single-byte opcodes.
    match op {
        0x00 => return Ok(Instruction { name: "NOP", size: 1, kind: Kind::Nop }),
        0x07 => return Ok(Instruction { name: "RLC", size: 1, kind: Kind::Rlc }),
        0x0F => return Ok(Instruction { name: "RRC", size: 1, kind: Kind::Rrc }),
        0x17 => return Ok(Instruction { name: "RAL", size: 1, kind: Kind::Ral }),
        0x1F => return Ok(Instruction { name: "RAR", size: 1, kind: Kind::Rar }),
        0x27 => return Ok(Instruction { name: "DAA", size: 1, kind: Kind::Daa }),
        0x2F => return Ok(Instruction { name: "CMA", size: 1, kind: Kind::Cma }),
        0x37 => return Ok(Instruction { name: "STC", size: 1, kind: Kind::Stc }),
        0x3F => return Ok(Instruction { name: "CMC", size: 1, kind: Kind::Cmc }),
        0x76 => return Ok(Instruction { name: "HLT", size: 1, kind: Kind::Hlt }),
        0xC9 => return Ok(Instruction { name: "RET", size: 1, kind: Kind::Ret }),
        0xEB => return Ok(Instruction { name: "XCHG", size: 1, kind: Kind::Xchg }),
        0xE3 => return Ok(Instruction { name: "XTHL", size: 1, kind: Kind::Xthl }),
        0xF9 => return Ok(Instruction { name: "SPHL", size: 1, kind: Kind::Sphl }),
        0xE9 => return Ok(Instruction { name: "PCHL", size: 1, kind: Kind::Pchl }),
        0xF3 => return Ok(Instruction { name: "DI", size: 1, kind: Kind::Di }),
        0xFB => return Ok(Instruction { name: "EI", size: 1, kind: Kind::Ei }),
        _ => {}
    }

    // Literal opcode + d8.
    match op {
        0xDB => return Ok(Instruction { name: "IN", size: 2, kind: Kind::In { port: bytes[1] } }),
        0xD3 => return Ok(Instruction { name: "OUT", size: 2, kind: Kind::Out { port: bytes[1] } }),
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xF6 | 0xEE | 0xFE => {
            let alu_op = AluOp::from_bits((op >> 3) & 0x07);
            return Ok(Instruction {
                name: alu_op.immediate_mnemonic(),
                size: 2,
                kind: Kind::AluImm { op: alu_op, data: bytes[1] },
            });
        }
        _ => {}
    }

    // Literal opcode + a16.
    match op {
        0xCD => return Ok(Instruction { name: "CALL", size: 3, kind: Kind::Call { addr: le16(bytes[1], bytes[2]) } }),
        0xC3 => return Ok(Instruction { name: "JMP", size: 3, kind: Kind::Jmp { addr: le16(bytes[1], bytes[2]) } }),
        0x3A => return Ok(Instruction { name: "LDA", size: 3, kind: Kind::Lda { addr: le16(bytes[1], bytes[2]) } }),
        0x32 => return Ok(Instruction { name: "STA", size: 3, kind: Kind::Sta { addr: le16(bytes[1], bytes[2]) } }),
        0x2A => return Ok(Instruction { name: "LHLD", size: 3, kind: Kind::Lhld { addr: le16(bytes[1], bytes[2]) } }),
        0x22 => return Ok(Instruction { name: "SHLD", size: 3, kind: Kind::Shld { addr: le16(bytes[1], bytes[2]) } }),
        _ => {}
    }

    let r = op & 0x07;
    let rp = (op >> 4) & 0x03;

    // ADD/ADC/SUB/SBB/ANA/XRA/ORA/CMP r : 10xxxrrr
    if (op & 0xC0) == 0x80 {
        let alu_op = AluOp::from_bits((op >> 3) & 0x07);
        return Ok(Instruction {
            name: alu_op.mnemonic(),
            size: 1,
            kind: Kind::AluReg { op: alu_op, src: r },
        });
    }

    // MOV d,s : 01dddsss (0x76 already handled as HLT above)
    if (op & 0xC0) == 0x40 {
        let d = (op >> 3) & 0x07;
        return Ok(Instruction { name: "MOV", size: 1, kind: Kind::Mov { dst: d, src: r } });
    }

    // 00xxxxxx family: MVI, INR, DCR, INX, DCX, DAD, LXI, LDAX, STAX
    if (op & 0xC0) == 0x00 {
        if (op & 0x07) == 0x06 {
            let d = (op >> 3) & 0x07;
            return Ok(Instruction { name: "MVI", size: 2, kind: Kind::MviImm { dst: d, data: bytes[1] } });
        }
        if (op & 0x07) == 0x04 {
            let sel = (op >> 3) & 0x07;
            return Ok(Instruction { name: "INR", size: 1, kind: Kind::IncDecReg { sel, inc: true } });
        }
        if (op & 0x07) == 0x05 {
            let sel = (op >> 3) & 0x07;
            return Ok(Instruction { name: "DCR", size: 1, kind: Kind::IncDecReg { sel, inc: false } });
        }
        if (op & 0x0F) == 0x03 {
            return Ok(Instruction { name: "INX", size: 1, kind: Kind::IncDecPair { rp, inc: true } });
        }
        if (op & 0x0F) == 0x0B {
            return Ok(Instruction { name: "DCX", size: 1, kind: Kind::IncDecPair { rp, inc: false } });
        }
        if (op & 0x0F) == 0x09 {
            return Ok(Instruction { name: "DAD", size: 1, kind: Kind::Dad { rp } });
        }
        if (op & 0x0F) == 0x01 {
            return Ok(Instruction {
                name: "LXI",
                size: 3,
                kind: Kind::Lxi { rp, data: le16(bytes[1], bytes[2]) },
            });
        }
        if (op & 0x07) == 0x02 && rp <= 1 {
            let rp_bit = (op >> 4) & 0x01;
            return if (op & 0x08) == 0 {
                Ok(Instruction { name: "STAX", size: 1, kind: Kind::Stax { rp: rp_bit } })
            } else {
                Ok(Instruction { name: "LDAX", size: 1, kind: Kind::Ldax { rp: rp_bit } })
            };
        }
    }

    // 11xxxxxx family: PUSH, POP, RST, Jcc, Ccc, Rcc
    if (op & 0xC0) == 0xC0 {
        if (op & 0x07) == 0x05 && (op & 0x08) == 0 {
            return Ok(Instruction { name: "PUSH", size: 1, kind: Kind::Push { rp } });
        }
        if (op & 0x07) == 0x01 && (op & 0x08) == 0 {
            return Ok(Instruction { name: "POP", size: 1, kind: Kind::Pop { rp } });
        }
        if (op & 0x07) == 0x07 {
            let n = (op >> 3) & 0x07;
            return Ok(Instruction { name: "RST", size: 1, kind: Kind::Rst { n } });
        }
        if (op & 0x07) == 0x02 {
            let cond = Cond::from_bits((op >> 3) & 0x07);
            return Ok(Instruction {
                name: "Jcc",
                size: 3,
                kind: Kind::Jcc { cond, addr: le16(bytes[1], bytes[2]) },
            });
        }
        if (op & 0x07) == 0x04 {
            let cond = Cond::from_bits((op >> 3) & 0x07);
            return Ok(Instruction {
                name: "Ccc",
                size: 3,
                kind: Kind::Ccc { cond, addr: le16(bytes[1], bytes[2]) },
            });
        }
        if (op & 0x07) == 0x00 {
            let cond = Cond::from_bits((op >> 3) & 0x07);
            return Ok(Instruction { name: "Rcc", size: 1, kind: Kind::Rcc { cond } });
        }
    }

    Err(DecodeError { opcode: op })
}

/// Re-encode a decoded instruction back into bytes. Every [`Kind`] this
/// decoder produces round-trips (property 6 in SPEC_FULL.md §8 holds
/// unconditionally here).
pub fn encode(instr: &Instruction, out: &mut Vec<u8>) {
    let addr_bytes = |addr: u16| [(addr & 0xFF) as u8, (addr >> 8) as u8];
    match instr.kind {
        Kind::Nop => out.push(0x00),
        Kind::Rlc => out.push(0x07),
        Kind::Rrc => out.push(0x0F),
        Kind::Ral => out.push(0x17),
        Kind::Rar => out.push(0x1F),
        Kind::Daa => out.push(0x27),
        Kind::Cma => out.push(0x2F),
        Kind::Stc => out.push(0x37),
        Kind::Cmc => out.push(0x3F),
        Kind::Hlt => out.push(0x76),
        Kind::Ret => out.push(0xC9),
        Kind::Xchg => out.push(0xEB),
        Kind::Xthl => out.push(0xE3),
        Kind::Sphl => out.push(0xF9),
        Kind::Pchl => out.push(0xE9),
        Kind::Di => out.push(0xF3),
        Kind::Ei => out.push(0xFB),
        Kind::In { port } => out.extend_from_slice(&[0xDB, port]),
        Kind::Out { port } => out.extend_from_slice(&[0xD3, port]),
        Kind::AluImm { op, data } => {
            let base = match op {
                AluOp::Add => 0xC6,
                AluOp::Adc => 0xCE,
                AluOp::Sub => 0xD6,
                AluOp::Sbb => 0xDE,
                AluOp::Ana => 0xE6,
                AluOp::Xra => 0xEE,
                AluOp::Ora => 0xF6,
                AluOp::Cmp => 0xFE,
            };
            out.extend_from_slice(&[base, data]);
        }
        Kind::Call { addr } => {
            out.push(0xCD);
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Jmp { addr } => {
            out.push(0xC3);
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Lda { addr } => {
            out.push(0x3A);
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Sta { addr } => {
            out.push(0x32);
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Lhld { addr } => {
            out.push(0x2A);
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Shld { addr } => {
            out.push(0x22);
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::AluReg { op, src } => {
            let base = match op {
                AluOp::Add => 0x80,
                AluOp::Adc => 0x88,
                AluOp::Sub => 0x90,
                AluOp::Sbb => 0x98,
                AluOp::Ana => 0xA0,
                AluOp::Xra => 0xA8,
                AluOp::Ora => 0xB0,
                AluOp::Cmp => 0xB8,
            };
            out.push(base | src);
        }
        Kind::Mov { dst, src } => out.push(0x40 | (dst << 3) | src),
        Kind::MviImm { dst, data } => out.extend_from_slice(&[0x00 | (dst << 3) | 0x06, data]),
        Kind::IncDecReg { sel, inc } => out.push((sel << 3) | if inc { 0x04 } else { 0x05 }),
        Kind::IncDecPair { rp, inc } => out.push((rp << 4) | if inc { 0x03 } else { 0x0B }),
        Kind::Dad { rp } => out.push((rp << 4) | 0x09),
        Kind::Lxi { rp, data } => {
            out.push((rp << 4) | 0x01);
            out.extend_from_slice(&addr_bytes(data));
        }
        Kind::Ldax { rp } => out.push((rp << 4) | 0x0A),
        Kind::Stax { rp } => out.push((rp << 4) | 0x02),
        Kind::Push { rp } => out.push(0xC5 | (rp << 4)),
        Kind::Pop { rp } => out.push(0xC1 | (rp << 4)),
        Kind::Rst { n } => out.push(0xC7 | (n << 3)),
        Kind::Jcc { cond, addr } => {
            out.push(0xC2 | (cond_bits(cond) << 3));
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Ccc { cond, addr } => {
            out.push(0xC4 | (cond_bits(cond) << 3));
            out.extend_from_slice(&addr_bytes(addr));
        }
        Kind::Rcc { cond } => out.push(0xC0 | (cond_bits(cond) << 3)),
    }
}

fn cond_bits(cond: Cond) -> u8 {
    match cond {
        Cond::Nz => 0,
        Cond::Z => 1,
        Cond::Nc => 2,
        Cond::C => 3,
        Cond::Po => 4,
        Cond::Pe => 5,
        Cond::P => 6,
        Cond::M => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_opcodes_fail() {
        for &op in &INVALID_OPCODES {
            assert!(decode(&[op, 0, 0]).is_err(), "0x{op:02X} should be invalid");
        }
    }

    #[test]
    fn every_other_byte_decodes() {
        for op in 0u16..=255 {
            let op = op as u8;
            if INVALID_OPCODES.contains(&op) {
                continue;
            }
            let bytes = [op, 0, 0];
            let instr = decode(&bytes).unwrap_or_else(|e| panic!("0x{op:02X} failed: {e}"));
            assert!((1..=3).contains(&instr.size));
        }
    }

    #[test]
    fn mov_m_m_is_hlt() {
        let instr = decode(&[0x76, 0, 0]).unwrap();
        assert_eq!(instr.kind, Kind::Hlt);
    }

    #[test]
    fn add_b_decodes() {
        let instr = decode(&[0x80]).unwrap();
        assert_eq!(instr.kind, Kind::AluReg { op: AluOp::Add, src: 0 });
        assert_eq!(instr.size, 1);
    }

    #[test]
    fn call_decodes_little_endian_address() {
        let instr = decode(&[0xCD, 0x50, 0x20]).unwrap();
        assert_eq!(instr.kind, Kind::Call { addr: 0x2050 });
    }

    #[test]
    fn conditional_jump_pattern() {
        // JNZ a16 = 0xC2 = 11 000 010
        let instr = decode(&[0xC2, 0x00, 0x10]).unwrap();
        assert_eq!(instr.kind, Kind::Jcc { cond: Cond::Nz, addr: 0x1000 });
    }

    #[test]
    fn encode_round_trip_all_valid_opcodes() {
        for op in 0u16..=255 {
            let op = op as u8;
            if INVALID_OPCODES.contains(&op) {
                continue;
            }
            let bytes = [op, 0x34, 0x12];
            let instr = decode(&bytes).unwrap();
            let mut out = Vec::new();
            encode(&instr, &mut out);
            assert_eq!(out.len(), instr.size as usize, "0x{op:02X} size mismatch");
            let re = decode(&out).unwrap();
            assert_eq!(re.kind, instr.kind, "0x{op:02X} did not round-trip");
        }
    }
}
