//! The КР580ВМ80А (Intel 8080-compatible) CPU core.
//!
//! Decoding ([`decode`]) and execution ([`exec`]) are deliberately split:
//! `decode` turns bytes into a [`decode::Kind`] value with no side effects,
//! and [`I8080::step`] is the only place that mutates state.

mod alu;
mod cycles;
pub mod decode;
mod exec;
pub mod flags;
mod registers;

use std::fmt;

use crate::core::bus::{Bus, BusMaster};
use crate::core::component::{BusMasterComponent, Component};
use crate::cpu::state::Intel8080State;
use decode::DecodeError;
use flags::{Flags, PswError};
use registers::{RP_BC, RP_DE, RP_HL, RP_SP, SEL_A, SEL_B, SEL_C, SEL_D, SEL_E, SEL_H, SEL_L, SEL_M};

/// Every way a [`I8080::step`] can fail. Decode failures are ordinary
/// guest-controlled input (a stray data byte reached PC); `InvalidPswPop`
/// is also guest-reachable (POP PSW off a stack an ALU instruction wrote
/// over) and is treated as fatal per SPEC_FULL.md §7, not retried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    Decode(DecodeError),
    InvalidPswPop(PswError),
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::Decode(e) => write!(f, "{e}"),
            CpuError::InvalidPswPop(e) => write!(f, "POP PSW: {e}"),
        }
    }
}

impl std::error::Error for CpuError {}

impl From<DecodeError> for CpuError {
    fn from(e: DecodeError) -> Self {
        CpuError::Decode(e)
    }
}

impl From<PswError> for CpuError {
    fn from(e: PswError) -> Self {
        CpuError::InvalidPswPop(e)
    }
}

/// The CPU's full register file plus its two 256-byte port-facing arrays.
///
/// `ports_in`/`ports_out` are read/written directly by IN/OUT (SPEC_FULL.md
/// §3: "IN/OUT never touch the bus"); the port controller is the only other
/// writer of `ports_in` and reader of `ports_out`, via `Computer::step`.
pub struct I8080 {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    pub flags: Flags,
    pub interrupts_enabled: bool,
    pub ports_in: [u8; 256],
    pub ports_out: [u8; 256],
    /// Set by [`BusMasterComponent::tick_with_bus`] when [`I8080::step`]
    /// fails, since that trait method has no `Result` to return it
    /// through. Cleared on the next successful step.
    pub last_error: Option<CpuError>,
}

impl Default for I8080 {
    fn default() -> Self {
        Self::new()
    }
}

impl I8080 {
    pub fn new() -> Self {
        I8080 {
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            sp: 0,
            pc: 0,
            flags: Flags::default(),
            interrupts_enabled: false,
            ports_in: [0; 256],
            ports_out: [0; 256],
            last_error: None,
        }
    }

    /// Zero the whole visible state. The integrator sets PC to the ROM
    /// base afterward (SPEC_FULL.md §3's lifecycle note).
    pub fn reset(&mut self) {
        *self = I8080::new();
    }

    pub fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    pub fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    pub fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    fn get_pair(&self, rp: u8) -> u16 {
        match rp {
            RP_BC => self.bc(),
            RP_DE => self.de(),
            RP_HL => self.hl(),
            RP_SP => self.sp,
            _ => unreachable!("pair selector is 2 bits"),
        }
    }

    fn set_pair(&mut self, rp: u8, value: u16) {
        match rp {
            RP_BC => self.set_bc(value),
            RP_DE => self.set_de(value),
            RP_HL => self.set_hl(value),
            RP_SP => self.sp = value,
            _ => unreachable!("pair selector is 2 bits"),
        }
    }

    fn read_operand<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &self,
        sel: u8,
        bus: &mut B,
        master: BusMaster,
    ) -> u8 {
        match sel {
            SEL_B => self.b,
            SEL_C => self.c,
            SEL_D => self.d,
            SEL_E => self.e,
            SEL_H => self.h,
            SEL_L => self.l,
            SEL_M => bus.read(master, self.hl()),
            SEL_A => self.a,
            _ => unreachable!("register selector is 3 bits"),
        }
    }

    fn write_operand<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        sel: u8,
        value: u8,
        bus: &mut B,
        master: BusMaster,
    ) {
        match sel {
            SEL_B => self.b = value,
            SEL_C => self.c = value,
            SEL_D => self.d = value,
            SEL_E => self.e = value,
            SEL_H => self.h = value,
            SEL_L => self.l = value,
            SEL_M => bus.write(master, self.hl(), value),
            SEL_A => self.a = value,
            _ => unreachable!("register selector is 3 bits"),
        }
    }

    /// Decode the instruction at PC and execute it. Returns the decoded
    /// instruction and an approximate cycle cost for pacing (§4.9).
    pub fn step<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<(decode::Instruction, u32), CpuError> {
        let b0 = bus.read(master, self.pc);
        let b1 = bus.read(master, self.pc.wrapping_add(1));
        let b2 = bus.read(master, self.pc.wrapping_add(2));
        let instr = decode::decode(&[b0, b1, b2])?;
        let taken = self.execute(&instr, bus, master)?;
        Ok((instr, cycles::cycles(&instr.kind, taken)))
    }

    pub fn snapshot(&self) -> Intel8080State {
        Intel8080State {
            a: self.a,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            sp: self.sp,
            pc: self.pc,
            psw: self.flags.pack(),
            interrupts_enabled: self.interrupts_enabled,
        }
    }
}

impl Component for I8080 {
    /// Stepping requires bus access; this CPU is never ticked without one.
    fn tick(&mut self) -> bool {
        false
    }
}

impl BusMasterComponent for I8080 {
    type Bus = dyn Bus<Address = u16, Data = u8>;

    /// One call steps exactly one instruction. A failed step (decode
    /// failure or invalid PSW pop, §7) is fatal and not an instruction
    /// boundary: the error is latched in [`I8080::last_error`] rather
    /// than discarded, since this trait method has no `Result` to
    /// surface it through.
    fn tick_with_bus(&mut self, bus: &mut Self::Bus, master: BusMaster) -> bool {
        match self.step(bus, master) {
            Ok(_) => {
                self.last_error = None;
                true
            }
            Err(e) => {
                self.last_error = Some(e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatBus {
        mem: [u8; 0x10000],
    }

    impl FlatBus {
        fn new() -> Self {
            FlatBus { mem: [0; 0x10000] }
        }
    }

    impl Bus for FlatBus {
        type Address = u16;
        type Data = u8;

        fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
            self.mem[addr as usize]
        }

        fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
            self.mem[addr as usize] = data;
        }
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut cpu = I8080::new();
        cpu.a = 0x42;
        cpu.pc = 0x1234;
        cpu.reset();
        assert_eq!(cpu.a, 0);
        assert_eq!(cpu.pc, 0);
    }

    #[test]
    fn mvi_a_then_add_b_s4() {
        // SPEC_FULL.md §8 scenario S4: MVI A,5 ; MVI B,3 ; ADD B -> A=8, PC advanced by 6.
        let mut bus = FlatBus::new();
        bus.mem[0..6].copy_from_slice(&[0x3E, 0x05, 0x06, 0x03, 0x80, 0x00]);
        let mut cpu = I8080::new();
        let master = BusMaster::Cpu(0);

        cpu.step(&mut bus, master).unwrap();
        cpu.step(&mut bus, master).unwrap();
        cpu.step(&mut bus, master).unwrap();

        assert_eq!(cpu.a, 8);
        assert_eq!(cpu.pc, 6);
    }

    #[test]
    fn call_then_ret_round_trips_pc_and_sp() {
        let mut bus = FlatBus::new();
        bus.mem[0..3].copy_from_slice(&[0xCD, 0x00, 0x10]); // CALL 0x1000
        bus.mem[0x1000] = 0xC9; // RET
        let mut cpu = I8080::new();
        cpu.sp = 0x2000;
        let master = BusMaster::Cpu(0);

        cpu.step(&mut bus, master).unwrap();
        assert_eq!(cpu.pc, 0x1000);
        assert_eq!(cpu.sp, 0x1FFE);

        cpu.step(&mut bus, master).unwrap();
        assert_eq!(cpu.pc, 3);
        assert_eq!(cpu.sp, 0x2000);
    }

    #[test]
    fn push_pop_psw_round_trips_flags() {
        let mut bus = FlatBus::new();
        bus.mem[0] = 0xF5; // PUSH PSW
        bus.mem[1] = 0xF1; // POP PSW
        let mut cpu = I8080::new();
        cpu.sp = 0x2000;
        cpu.a = 0x99;
        cpu.flags = Flags { z: true, s: false, p: true, c: true, a: false };
        let master = BusMaster::Cpu(0);

        cpu.step(&mut bus, master).unwrap();
        cpu.a = 0;
        cpu.flags = Flags::default();
        cpu.step(&mut bus, master).unwrap();

        assert_eq!(cpu.a, 0x99);
        assert!(cpu.flags.z);
        assert!(cpu.flags.c);
        assert!(!cpu.flags.s);
    }

    #[test]
    fn pop_psw_rejects_corrupt_stack_byte() {
        let mut bus = FlatBus::new();
        bus.mem[0] = 0xF1; // POP PSW
        bus.mem[0x2000] = 0x00; // bit 1 clear: not a valid PSW
        bus.mem[0x2001] = 0x12;
        let mut cpu = I8080::new();
        cpu.sp = 0x2000;
        let master = BusMaster::Cpu(0);

        let err = cpu.step(&mut bus, master).unwrap_err();
        assert!(matches!(err, CpuError::InvalidPswPop(_)));
    }

    #[test]
    fn tick_with_bus_latches_a_decode_error_instead_of_discarding_it() {
        let mut bus = FlatBus::new();
        bus.mem[0] = 0x08; // one of INVALID_OPCODES
        let mut cpu = I8080::new();
        let master = BusMaster::Cpu(0);

        let boundary = cpu.tick_with_bus(&mut bus, master);
        assert!(!boundary);
        assert!(matches!(cpu.last_error, Some(CpuError::Decode(_))));
        assert_eq!(cpu.pc, 0); // the failed decode didn't advance PC

        bus.mem[0] = 0x00; // NOP
        let boundary = cpu.tick_with_bus(&mut bus, master);
        assert!(boundary);
        assert!(cpu.last_error.is_none());
    }

    #[test]
    fn hlt_resets_pc_to_zero() {
        let mut bus = FlatBus::new();
        bus.mem[0x10] = 0x76; // HLT
        let mut cpu = I8080::new();
        cpu.pc = 0x10;
        let master = BusMaster::Cpu(0);

        cpu.step(&mut bus, master).unwrap();
        assert_eq!(cpu.pc, 0);
    }

    #[test]
    fn jnz_not_taken_advances_past_instruction_s5() {
        // SPEC_FULL.md §8 scenario S5: false condition still advances PC.
        let mut bus = FlatBus::new();
        bus.mem[0..3].copy_from_slice(&[0xC2, 0x00, 0x20]); // JNZ 0x2000
        let mut cpu = I8080::new();
        cpu.flags.z = true;
        let master = BusMaster::Cpu(0);

        cpu.step(&mut bus, master).unwrap();
        assert_eq!(cpu.pc, 3);
    }
}
