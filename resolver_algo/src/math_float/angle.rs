// Implements the angle estimation for a resolver: a four-quadrant arctangent of the
// calibrated sine/cosine pair, plus the wrap into one positive revolution.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::f32::consts::TAU;

use crate::analog::calibration::CalibratedSample;

/// Mechanical angle in radians, range (-pi, pi].
///
/// A zero vector (both amplitudes 0) yields 0 rather than an error.
///
/// ### Notes
/// * A negative gain calibrates a reading equal to its offset to `-0.0`. The sine is
///   normalized to `+0.0` first, otherwise `atan2f(-0.0, x < 0)` would return `-pi`.
#[inline(always)]
pub fn estimate_angle(sample: CalibratedSample) -> f32 {
    // -0.0 + 0.0 == +0.0, any other value is unchanged
    let sin_cal = sample.sin_cal + 0.0;
    libm::atan2f(sin_cal, sample.cos_cal)
}

/// Maps an angle into [0, 2*pi) with a single correction.
///
/// ### Notes
/// * Inputs more than one revolution outside the range are not folded back.
/// * A negative input smaller in magnitude than half an ulp of 2*pi rounds to exactly 2*pi;
///   the quadrature index clamp absorbs that case.
#[inline(always)]
pub fn wrap_positive(angle: f32) -> f32 {
    if angle >= TAU {
        angle - TAU
    } else if angle < 0.0 {
        angle + TAU
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::isclose;
    use core::f32::consts::{FRAC_PI_2, PI};

    fn angle(sin_cal: f32, cos_cal: f32) -> f32 {
        estimate_angle(CalibratedSample { sin_cal, cos_cal })
    }

    #[test]
    fn quadrants() {
        assert_eq!(angle(0.0, 1.0), 0.0);
        assert_eq!(angle(0.5, 0.0), FRAC_PI_2);
        assert_eq!(angle(0.0, -1.0), PI);
        assert_eq!(angle(-1.0, 0.0), -FRAC_PI_2);
        assert!(isclose(angle(-1.0, -1.0), -3.0 * PI / 4.0, 1e-6, 0.0));
    }

    #[test]
    fn zero_vector_is_zero() {
        assert_eq!(angle(0.0, 0.0), 0.0);
    }

    #[test]
    fn negative_zero_sine_is_half_turn() {
        assert_eq!(angle(-0.0, -1.0), PI);
        assert_eq!(angle(-0.0, 1.0).to_bits(), 0.0f32.to_bits());
    }

    #[test]
    fn inverted_sine_gain_at_offset_stays_in_range() {
        use crate::analog::calibration::CalibrationParams;
        use crate::sample_sync::RawSample;

        let cal = CalibrationParams {
            gain_sin: -1.0 / 2048.0,
            ..Default::default()
        };
        let sample = cal.apply(RawSample::new(2048, 1000));
        assert_eq!(sample.sin_cal.to_bits(), (-0.0f32).to_bits());
        assert_eq!(estimate_angle(sample), PI);
    }

    #[test]
    fn amplitude_does_not_matter() {
        assert_eq!(angle(0.3, 0.4), angle(0.6, 0.8));
        assert_eq!(angle(-0.25, 0.5), angle(-1.0, 2.0));
    }

    #[test]
    fn wrap_examples() {
        assert!(isclose(wrap_positive(-0.1), TAU - 0.1, 1e-6, 0.0));
        assert!(isclose(wrap_positive(TAU + 0.1), 0.1, 1e-5, 0.0));
        assert_eq!(wrap_positive(0.0), 0.0);
        assert_eq!(wrap_positive(TAU), 0.0);
        assert_eq!(wrap_positive(1.0), 1.0);
    }

    #[test]
    fn wrap_stays_in_one_revolution() {
        // Sweep (-2pi, 4pi) avoiding the last ulps below zero
        let mut a = -TAU + 1e-3;
        while a < 2.0 * TAU {
            if !(-1e-5..0.0).contains(&a) {
                let w = wrap_positive(a);
                assert!((0.0..TAU).contains(&w), "{} -> {}", a, w);
            }
            a += 0.01;
        }
    }

    #[test]
    fn atan2_output_wraps_into_range() {
        for i in 0..360 {
            let t = (i as f32).to_radians();
            let w = wrap_positive(angle(libm::sinf(t), libm::cosf(t)));
            assert!((0.0..TAU).contains(&w) || w == TAU, "{}", w);
        }
    }
}
