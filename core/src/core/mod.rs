pub mod bus;
pub mod component;

pub use bus::{Bus, BusMaster};
pub use component::{BusMasterComponent, Component};
