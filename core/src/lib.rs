pub mod core;
pub mod cpu;
pub mod device;
pub mod memory;
pub mod computer;
pub mod rks;

pub mod prelude {
    pub use crate::computer::{Computer, StepError};
    pub use crate::core::{Bus, BusMaster, BusMasterComponent, Component};
    pub use crate::cpu::i8080::{CpuError, I8080};
    pub use crate::device::{Display, KeyCode, Keyboard, KeyState};
    pub use crate::memory::{MemSection, Memory};
    pub use crate::rks::{read_rks, RksError, RksImage};
}
