/// Identifies who is accessing the bus.
///
/// The reference architecture this is modeled on arbitrates between several
/// CPUs and DMA controllers; this system has exactly one bus master (the
/// single КР580ВМ80А), so only that variant survives here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusMaster {
    Cpu(usize),
}

/// Byte-addressed bus the CPU reads and writes memory through.
pub trait Bus {
    type Address: Copy + Into<u64>;
    type Data;

    fn read(&mut self, master: BusMaster, addr: Self::Address) -> Self::Data;
    fn write(&mut self, master: BusMaster, addr: Self::Address, data: Self::Data);
}
