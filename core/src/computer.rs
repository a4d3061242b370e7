//! The integrator (SPEC_FULL.md §4.8): owns the CPU, memory, the port
//! controller, the port-B composer, the keyboard, and exposes the
//! display decoder and real-time pacing (§4.9) the headless runner
//! drives in its main loop.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::bus::BusMaster;
use crate::cpu::i8080::decode::Instruction;
use crate::cpu::i8080::{CpuError, I8080};
use crate::device::display::{Display, Image};
use crate::device::keyboard::{KeyCode, KeyState, Keyboard, KeyboardPorts};
use crate::device::port_composer::PortComposer;
use crate::device::port_controller::{PortController, PortOutbound, UnimplementedControllerMode};
use crate::memory::{MemSection, Memory};
use crate::rks::RksImage;

const MASTER: BusMaster = BusMaster::Cpu(0);
const FREQUENCY_HZ: f64 = 2_000_000.0;
const MIN_SLEEP_GRANULARITY: Duration = Duration::from_millis(10);
/// The keyboard isn't wired to the low two bits of port B (§4.8).
const KEYBOARD_PORT_B_MASK: u8 = 0xFC;

#[derive(Debug)]
pub enum StepError {
    Cpu(CpuError),
    Controller(UnimplementedControllerMode),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Cpu(e) => write!(f, "{e}"),
            StepError::Controller(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StepError {}

impl From<CpuError> for StepError {
    fn from(e: CpuError) -> Self {
        StepError::Cpu(e)
    }
}

impl From<UnimplementedControllerMode> for StepError {
    fn from(e: UnimplementedControllerMode) -> Self {
        StepError::Controller(e)
    }
}

pub struct Computer {
    pub cpu: I8080,
    pub memory: Memory,
    /// Receivers for bytes the CPU writes when it puts a half-port in
    /// output mode; this machine doesn't model a consumer for them, but
    /// a host embedding this core can poll them.
    pub port_outbound: PortOutbound,
    port_controller: Arc<PortController>,
    port_b_composer: PortComposer,
    keyboard: Keyboard,
    cycles_since_sleep: u64,
    last_sleep: Instant,
}

impl Computer {
    /// `rom` (2 KiB bootloader) and `rom_extra` (12 KiB monitor) are
    /// copied into their fixed regions; PC starts at the ROM base.
    pub fn new(rom: &[u8], rom_extra: &[u8]) -> Computer {
        let mut memory = Memory::new();
        memory.load_region(MemSection::Rom2K, rom);
        memory.load_region(MemSection::RomExtra12K, rom_extra);

        let mut cpu = I8080::new();
        cpu.pc = MemSection::Rom2K.start();

        let (controller, port_outbound) = PortController::new(MemSection::Registers2K.start());
        let port_controller = Arc::new(controller);

        let composer_ctl = Arc::clone(&port_controller);
        let port_b_composer = PortComposer::new(move |v| composer_ctl.send_b(v));
        let keyboard_send_b = port_b_composer.masked_send(KEYBOARD_PORT_B_MASK);

        let send_a_ctl = Arc::clone(&port_controller);
        let send_c_low_ctl = Arc::clone(&port_controller);
        let keyboard = Keyboard::new(KeyboardPorts {
            send_a: Box::new(move |v| send_a_ctl.send_a(v)),
            send_b: Box::new(move |v| keyboard_send_b.send(v)),
            send_c_low: Box::new(move |v| send_c_low_ctl.send_c_low(v)),
        });

        Computer {
            cpu,
            memory,
            port_outbound,
            port_controller,
            port_b_composer,
            keyboard,
            cycles_since_sleep: 0,
            last_sleep: Instant::now(),
        }
    }

    /// Copy a parsed RKS image's content into its target address range.
    pub fn load_program(&mut self, image: &RksImage) {
        let mut addr = image.start_address;
        for &byte in &image.content {
            self.memory.write(addr, byte);
            addr = addr.wrapping_add(1);
        }
    }

    pub fn key_event(&self, code: KeyCode, state: KeyState) {
        self.keyboard.event(code, state);
    }

    pub fn run_key_sequence(&self, seq: &[KeyCode]) {
        self.keyboard.run_sequence(seq);
    }

    pub fn image(&self) -> Image {
        Display::image(&self.memory)
    }

    /// One decode-execute-sync cycle (§4.8): run the CPU, let the port
    /// controller react to whatever it wrote, and accumulate cycles for
    /// [`Computer::sim_sleep`].
    pub fn step(&mut self) -> Result<(Instruction, u32), StepError> {
        let (instr, cycles) = self.cpu.step(&mut self.memory, MASTER)?;
        self.port_controller.sync(&mut self.memory)?;
        self.cycles_since_sleep += cycles as u64;
        Ok((instr, cycles))
    }

    /// Pace execution against the 2 MHz virtual clock (§4.9). Sleeps
    /// only once the virtual/wall-time gap exceeds the minimum
    /// granularity, and only resets the cycle accumulator when it
    /// actually sleeps — if wall time has outrun virtual time the
    /// baseline is reset instead, never "catching up" by running faster.
    pub fn sim_sleep(&mut self) {
        let sim_duration = Duration::from_secs_f64(self.cycles_since_sleep as f64 / FREQUENCY_HZ);
        let passed = self.last_sleep.elapsed();

        if sim_duration < MIN_SLEEP_GRANULARITY {
            return;
        }

        if passed >= sim_duration {
            self.last_sleep = Instant::now();
            return;
        }

        std::thread::sleep(sim_duration - passed);
        self.cycles_since_sleep = 0;
        self.last_sleep = Instant::now();
    }

    /// Stop the keyboard and port-composer background workers.
    pub fn shutdown(&mut self) {
        self.keyboard.shutdown();
        self.port_b_composer.close();
    }
}
