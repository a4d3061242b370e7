use super::bus::BusMaster;

/// Anything that advances by discrete time units (here: the CPU).
pub trait Component {
    /// Advance one clock cycle. Returns true on a "significant event"
    /// (here: instruction boundary).
    fn tick(&mut self) -> bool;

    /// Master clock cycles consumed per tick.
    fn clock_divider(&self) -> u64 {
        1
    }
}

/// Extension for components that act as bus masters.
pub trait BusMasterComponent: Component {
    type Bus: super::bus::Bus + ?Sized;

    /// Execute one cycle with bus access. Returns true at instruction boundary.
    fn tick_with_bus(&mut self, bus: &mut Self::Bus, master_id: BusMaster) -> bool;
}
