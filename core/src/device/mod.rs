pub mod display;
pub mod keyboard;
pub mod port_composer;
pub mod port_controller;

pub use display::Display;
pub use keyboard::{KeyCode, Keyboard, KeyState};
pub use port_composer::PortComposer;
pub use port_controller::PortController;
