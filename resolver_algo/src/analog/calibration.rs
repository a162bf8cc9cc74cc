// Implements the resolver channel calibration: removes the ADC offset of each
// channel and scales it to a nominal [-1, 1] amplitude.

// Key Features:
// - Independent offset and gain per channel
// - Gain sanitization so a zero gain written by an external tool never
//   collapses an axis to exactly zero
// - Parameters exchanged as one Copy record, never field by field

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::config::{DEFAULT_GAIN, DEFAULT_OFFSET};
use crate::sample_sync::RawSample;

/// Smallest gain magnitude applied to a channel.
pub const MIN_GAIN: f32 = 1.0e-6;

/// Offset and gain of both resolver channels.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationParams {
    pub offset_sin: f32,
    pub offset_cos: f32,
    pub gain_sin: f32,
    pub gain_cos: f32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            offset_sin: DEFAULT_OFFSET,
            offset_cos: DEFAULT_OFFSET,
            gain_sin: DEFAULT_GAIN,
            gain_cos: DEFAULT_GAIN,
        }
    }
}

/// Normalized sine/cosine amplitudes.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibratedSample {
    pub sin_cal: f32,
    pub cos_cal: f32,
}

/// Limits the gain magnitude to at least `MIN_GAIN`, keeping its sign (zero counts as positive).
#[inline(always)]
pub fn sanitize_gain(gain: f32) -> f32 {
    if gain > MIN_GAIN || gain < -MIN_GAIN {
        return gain;
    }
    if gain >= 0.0 {
        MIN_GAIN
    } else {
        -MIN_GAIN
    }
}

/// Calibrates a single channel: `(raw - offset) * sanitize_gain(gain)`.
#[inline(always)]
pub fn calibrate_axis(raw: u16, offset: f32, gain: f32) -> f32 {
    (raw as f32 - offset) * sanitize_gain(gain)
}

impl CalibrationParams {
    /// Applies the calibration to both channels of a raw sample.
    pub fn apply(&self, raw: RawSample) -> CalibratedSample {
        CalibratedSample {
            sin_cal: calibrate_axis(raw.sin_raw, self.offset_sin, self.gain_sin),
            cos_cal: calibrate_axis(raw.cos_raw, self.offset_cos, self.gain_cos),
        }
    }
}
