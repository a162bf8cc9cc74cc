//! Runtime configuration of the resolver pipeline.
//!
//! Nothing here survives a reset: the defaults below are restored at every boot
//! and the external calibration tool adjusts them while the firmware runs.

use crate::analog::calibration::CalibrationParams;

/// Mid-scale of a 12-bit converter, the expected zero of each resolver channel.
pub const DEFAULT_OFFSET: f32 = 2048.0;

/// Scales a half-range 12-bit swing to an amplitude of 1.
pub const DEFAULT_GAIN: f32 = 1.0 / 2048.0;

/// Emulated encoder resolution.
pub const DEFAULT_COUNTS_PER_REV: u16 = 500;

/// Start-up configuration of a `ResolverBridge`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    pub calibration: CalibrationParams,
    pub counts_per_rev: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationParams::default(),
            counts_per_rev: DEFAULT_COUNTS_PER_REV,
        }
    }
}
