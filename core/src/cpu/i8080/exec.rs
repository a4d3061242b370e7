//! Central dispatch: turns a decoded [`super::decode::Instruction`] into
//! register/memory/flag mutations. Kept separate from [`super::decode`] so
//! decoding never allocates or touches the bus (SPEC_FULL.md §9(a)).

use crate::core::bus::{Bus, BusMaster};

use super::alu;
use super::decode::{AluOp, Cond, Instruction, Kind};
use super::flags::Flags;
use super::{CpuError, I8080};

impl I8080 {
    /// Execute `instr`, which must have been decoded at the current PC.
    /// Returns whether the instruction "took its branch" (used only for
    /// the conditional call/return/jump families' cycle cost).
    pub(super) fn execute<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        instr: &Instruction,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<bool, CpuError> {
        let next_pc = self.pc.wrapping_add(instr.size as u16);
        self.pc = next_pc;
        let mut taken = false;

        match instr.kind {
            Kind::Nop => {}

            Kind::AluReg { op, src } => {
                let operand = self.read_operand(src, bus, master);
                self.apply_alu(op, operand);
            }
            Kind::AluImm { op, data } => self.apply_alu(op, data),

            Kind::Mov { dst, src } => {
                let v = self.read_operand(src, bus, master);
                self.write_operand(dst, v, bus, master);
            }
            Kind::MviImm { dst, data } => self.write_operand(dst, data, bus, master),

            Kind::IncDecReg { sel, inc } => {
                let v = self.read_operand(sel, bus, master);
                let r = if inc {
                    alu::inr(&mut self.flags, v)
                } else {
                    alu::dcr(&mut self.flags, v)
                };
                self.write_operand(sel, r, bus, master);
            }
            Kind::IncDecPair { rp, inc } => {
                let v = self.get_pair(rp);
                self.set_pair(rp, if inc { v.wrapping_add(1) } else { v.wrapping_sub(1) });
            }
            Kind::Dad { rp } => {
                let sum = self.hl() as u32 + self.get_pair(rp) as u32;
                self.set_hl((sum & 0xFFFF) as u16);
                self.flags.c = sum > 0xFFFF;
            }
            Kind::Lxi { rp, data } => self.set_pair(rp, data),

            Kind::Ldax { rp } => {
                let addr = if rp == 0 { self.bc() } else { self.de() };
                self.a = bus.read(master, addr);
            }
            Kind::Stax { rp } => {
                let addr = if rp == 0 { self.bc() } else { self.de() };
                bus.write(master, addr, self.a);
            }

            Kind::Push { rp } => {
                let value = if rp == 3 {
                    (self.a as u16) << 8 | self.flags.pack() as u16
                } else {
                    self.get_pair(rp)
                };
                self.push_word(value, bus, master);
            }
            Kind::Pop { rp } => {
                let value = self.pop_word(bus, master);
                if rp == 3 {
                    self.flags = Flags::unpack((value & 0xFF) as u8)?;
                    self.a = (value >> 8) as u8;
                } else {
                    self.set_pair(rp, value);
                }
            }

            Kind::Rst { n } => {
                self.push_word(next_pc, bus, master);
                self.pc = (n as u16) << 3;
                taken = true;
            }
            Kind::Jmp { addr } => self.pc = addr,
            Kind::Jcc { cond, addr } => {
                if self.test_cond(cond) {
                    self.pc = addr;
                    taken = true;
                }
            }
            Kind::Call { addr } => {
                self.push_word(next_pc, bus, master);
                self.pc = addr;
                taken = true;
            }
            Kind::Ccc { cond, addr } => {
                if self.test_cond(cond) {
                    self.push_word(next_pc, bus, master);
                    self.pc = addr;
                    taken = true;
                }
            }
            Kind::Ret => self.pc = self.pop_word(bus, master),
            Kind::Rcc { cond } => {
                if self.test_cond(cond) {
                    self.pc = self.pop_word(bus, master);
                    taken = true;
                }
            }

            Kind::Lda { addr } => self.a = bus.read(master, addr),
            Kind::Sta { addr } => bus.write(master, addr, self.a),
            Kind::Lhld { addr } => {
                self.l = bus.read(master, addr);
                self.h = bus.read(master, addr.wrapping_add(1));
            }
            Kind::Shld { addr } => {
                bus.write(master, addr, self.l);
                bus.write(master, addr.wrapping_add(1), self.h);
            }

            Kind::Xchg => {
                let (hl, de) = (self.hl(), self.de());
                self.set_hl(de);
                self.set_de(hl);
            }
            Kind::Xthl => {
                let lo = bus.read(master, self.sp);
                let hi = bus.read(master, self.sp.wrapping_add(1));
                bus.write(master, self.sp, self.l);
                bus.write(master, self.sp.wrapping_add(1), self.h);
                self.l = lo;
                self.h = hi;
            }
            Kind::Sphl => self.sp = self.hl(),
            Kind::Pchl => self.pc = self.hl(),

            Kind::Rlc => self.a = alu::rlc(&mut self.flags, self.a),
            Kind::Rrc => self.a = alu::rrc(&mut self.flags, self.a),
            Kind::Ral => self.a = alu::ral(&mut self.flags, self.a),
            Kind::Rar => self.a = alu::rar(&mut self.flags, self.a),
            Kind::Daa => self.a = alu::daa(&mut self.flags, self.a),
            Kind::Cma => self.a = !self.a,
            Kind::Stc => self.flags.c = true,
            Kind::Cmc => self.flags.c = !self.flags.c,

            Kind::Di => self.interrupts_enabled = false,
            Kind::Ei => self.interrupts_enabled = true,
            Kind::Hlt => self.pc = 0,

            Kind::In { port } => self.a = self.ports_in[port as usize],
            Kind::Out { port } => self.ports_out[port as usize] = self.a,
        }

        Ok(taken)
    }

    fn apply_alu(&mut self, op: AluOp, operand: u8) {
        let a = self.a;
        self.a = match op {
            AluOp::Add => alu::add(&mut self.flags, a, operand, false),
            AluOp::Adc => alu::add(&mut self.flags, a, operand, self.flags.c),
            AluOp::Sub => alu::sub(&mut self.flags, a, operand, false),
            AluOp::Sbb => alu::sub(&mut self.flags, a, operand, self.flags.c),
            AluOp::Ana => alu::logic(&mut self.flags, a & operand),
            AluOp::Xra => alu::logic(&mut self.flags, a ^ operand),
            AluOp::Ora => alu::logic(&mut self.flags, a | operand),
            AluOp::Cmp => {
                alu::sub(&mut self.flags, a, operand, false);
                a
            }
        };
    }

    fn test_cond(&self, cond: Cond) -> bool {
        match cond {
            Cond::Nz => !self.flags.z,
            Cond::Z => self.flags.z,
            Cond::Nc => !self.flags.c,
            Cond::C => self.flags.c,
            Cond::Po => !self.flags.p,
            Cond::Pe => self.flags.p,
            Cond::P => !self.flags.s,
            Cond::M => self.flags.s,
        }
    }

    fn push_word<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        value: u16,
        bus: &mut B,
        master: BusMaster,
    ) {
        self.sp = self.sp.wrapping_sub(2);
        bus.write(master, self.sp, (value & 0xFF) as u8);
        bus.write(master, self.sp.wrapping_add(1), (value >> 8) as u8);
    }

    fn pop_word<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, master: BusMaster) -> u16 {
        let lo = bus.read(master, self.sp) as u16;
        let hi = bus.read(master, self.sp.wrapping_add(1)) as u16;
        self.sp = self.sp.wrapping_add(2);
        (hi << 8) | lo
    }
}
