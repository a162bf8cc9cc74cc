//! Board pin assignments, kept as `const` descriptions and configured on demand.
use hal::gpio::{Pin, PinMode, Port};

pub mod resolver;

/// Port, number and mode of one GPIO pin.
pub struct PinDef {
    port: Port,
    pin: u8,
    mode: PinMode,
}

impl PinDef {
    /// Pin routed to an ADC input.
    pub const fn analog(port: Port, pin: u8) -> PinDef {
        PinDef {
            port,
            pin,
            mode: PinMode::Analog,
        }
    }

    /// Applies the mode to the pin and returns its handle.
    /// # Example
    /// ```no_run
    /// // Hand PA6 to ADC2 before the sequence is started
    /// resolver_drivers::pinout::resolver::SIN.init();
    /// ```
    pub fn init(&self) -> Pin {
        Pin::new(self.port, self.pin, self.mode)
    }
}
