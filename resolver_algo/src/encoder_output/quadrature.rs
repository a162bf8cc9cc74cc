// Implements the Angle2Quadrature module, converting an absolute mechanical angle into
// the state of an emulated incremental encoder (A, B, Z channels and count).

// Key Features:
// - Stateless: the output depends only on the angle and the configured resolution
// - Four quadrature states per count, traversed as 00 -> 10 -> 11 -> 01 (A, B)
// - Index pulse (Z) asserted over the whole first count of each revolution
// - Index clamped into the valid range when rounding reaches a full revolution

// Detailed Operation:
// The angle is first wrapped into one positive revolution, then scaled to the number
// of quadrature states (four per count) and truncated to an index. The two low bits
// of the index select the A/B state and the remaining bits give the count inside the
// revolution. Because of f32 rounding, angles just below a full turn can scale to
// exactly `total_states`; that index is held at the last state instead of wrapping
// to zero.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::f32::consts::TAU;

use crate::math_float::angle::wrap_positive;

/// Quadrature states per encoder count.
pub const STATES_PER_COUNT: u32 = 4;

/// Emulated incremental encoder outputs.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuadratureState {
    /// Channel A level
    pub a: bool,
    /// Channel B level, lagging A by a quarter count
    pub b: bool,
    /// Index pulse, high during the first count of the revolution
    pub z: bool,
    /// Count within the current revolution (0..counts_per_rev)
    pub count: u32,
}

impl QuadratureState {
    /// Decodes a quadrature state index into channel levels and count.
    pub const fn from_index(idx: u32) -> Self {
        let quad_state = idx & (STATES_PER_COUNT - 1);
        let count = idx >> 2;
        Self {
            a: quad_state == 1 || quad_state == 2,
            b: quad_state >= 2,
            z: count == 0,
            count,
        }
    }
}

/// Replaces a zero resolution with one count per revolution.
#[inline(always)]
pub const fn sanitize_counts_per_rev(counts_per_rev: u16) -> u16 {
    if counts_per_rev == 0 {
        1
    } else {
        counts_per_rev
    }
}

/// Quadrature state index of `angle`, in `0..counts_per_rev * 4`.
pub fn quadrature_index(angle: f32, counts_per_rev: u16) -> u32 {
    let angle_pos = wrap_positive(angle);
    let total_states = sanitize_counts_per_rev(counts_per_rev) as u32 * STATES_PER_COUNT;

    // Truncation equals floor here since angle_pos is never negative
    let idx = ((angle_pos / TAU) * total_states as f32) as u32;
    if idx >= total_states {
        total_states - 1
    } else {
        idx
    }
}

/// Maps an angle in radians onto the emulated encoder outputs.
#[inline(always)]
pub fn angle2quadrature(angle: f32, counts_per_rev: u16) -> QuadratureState {
    QuadratureState::from_index(quadrature_index(angle, counts_per_rev))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Angle at the middle of quadrature state `idx` out of `total` states.
    fn bucket_center(idx: u32, total: u32) -> f32 {
        TAU * (idx as f32 + 0.5) / total as f32
    }

    #[test]
    fn zero_angle_is_index_pulse() {
        let q = angle2quadrature(0.0, 4);
        assert_eq!(
            q,
            QuadratureState {
                a: false,
                b: false,
                z: true,
                count: 0
            }
        );
    }

    #[test]
    fn last_state_of_small_encoder() {
        let angle = bucket_center(15, 16);
        assert_eq!(quadrature_index(angle, 4), 15);
        assert_eq!(
            angle2quadrature(angle, 4),
            QuadratureState {
                a: false,
                b: true,
                z: false,
                count: 3
            }
        );
    }

    #[test]
    fn fifteen_sixteenths_of_a_turn() {
        let angle = TAU * 15.0 / 16.0;
        assert_eq!(quadrature_index(angle, 4), 15);
        assert_eq!(
            angle2quadrature(angle, 4),
            QuadratureState {
                a: false,
                b: true,
                z: false,
                count: 3
            }
        );
    }

    #[test]
    fn state_cycle_order() {
        let expected = [(false, false), (true, false), (true, true), (false, true)];
        for idx in 0..16 {
            let q = angle2quadrature(bucket_center(idx, 16), 4);
            assert_eq!((q.a, q.b), expected[(idx % 4) as usize], "idx {}", idx);
            assert_eq!(q.count, idx / 4);
            assert_eq!(q.z, idx < 4);
        }
    }

    #[test]
    fn one_channel_changes_per_step() {
        let mut prev = QuadratureState::from_index(0);
        for idx in 1..2000 {
            let q = QuadratureState::from_index(idx);
            assert_eq!((q.a != prev.a) as u8 + (q.b != prev.b) as u8, 1);
            prev = q;
        }
    }

    #[test]
    fn quarter_turn_at_default_resolution() {
        let q = angle2quadrature(core::f32::consts::FRAC_PI_2, 500);
        assert_eq!(quadrature_index(core::f32::consts::FRAC_PI_2, 500), 500);
        assert_eq!(
            q,
            QuadratureState {
                a: false,
                b: false,
                z: false,
                count: 125
            }
        );
    }

    #[test]
    fn negative_angles_wrap() {
        // -pi/2 is three quarters of a turn
        assert_eq!(quadrature_index(-core::f32::consts::FRAC_PI_2, 500), 1500);
    }

    #[test]
    fn full_turn_rounding_is_clamped() {
        // A tiny negative angle wraps to exactly 2*pi in f32
        assert_eq!(wrap_positive(-1.0e-9), TAU);
        assert_eq!(quadrature_index(-1.0e-9, 4), 15);
        let q = angle2quadrature(-1.0e-9, 4);
        assert_eq!(q.count, 3);
        assert!(!q.z);
    }

    #[test]
    fn index_never_exceeds_range() {
        for cpr in [1u16, 3, 500, 1024, u16::MAX] {
            let total = cpr as u32 * 4;
            let mut a = -TAU;
            while a < 2.0 * TAU {
                assert!(quadrature_index(a, cpr) < total);
                a += 0.013;
            }
        }
    }

    #[test]
    fn zero_resolution_acts_as_one() {
        assert_eq!(sanitize_counts_per_rev(0), 1);
        assert_eq!(sanitize_counts_per_rev(7), 7);
        let q = angle2quadrature(core::f32::consts::PI, 0);
        assert_eq!(q, angle2quadrature(core::f32::consts::PI, 1));
        assert!(q.a && q.b && q.z);
    }
}
