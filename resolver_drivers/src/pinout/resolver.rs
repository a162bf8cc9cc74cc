//! Resolver demodulator inputs, wired to ADC2.
use super::PinDef;
use super::Port;

/// Sine output of the resolver front end
pub const SIN: PinDef = PinDef::analog(Port::A, 6);

/// Cosine output of the resolver front end
pub const COS: PinDef = PinDef::analog(Port::A, 7);

/// ADC2 input channel of `SIN` (PA6)
pub const SIN_CHANNEL: u8 = 3;

/// ADC2 input channel of `COS` (PA7)
pub const COS_CHANNEL: u8 = 4;
