#![cfg_attr(not(test), no_std)]

pub mod analog;
pub mod config;
pub mod encoder_output;
pub mod math_float;
pub mod peripherals;
pub mod sample_sync;
pub mod telemetry;
pub mod timing;

#[cfg(test)]
pub mod testing;

use analog::calibration::{CalibratedSample, CalibrationParams};
use config::BridgeConfig;
use encoder_output::{angle2quadrature, QuadratureState};
use math_float::angle::estimate_angle;
use peripherals::TickCounter;
use sample_sync::RawSample;
use timing::StageTimer;

/// Duration of the timed pipeline stages of the last cycle.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StageTiming {
    /// Angle estimation, in microseconds
    pub angle_us: f32,
    /// Quadrature mapping, in microseconds
    pub quadrature_us: f32,
}

/// Resolver to encoder bridge, holding all the state of the signal pipeline.
///
/// Owned by the main loop and handed by reference to the stages and to the telemetry
/// exporter. Every output is recomputed from scratch on each `tick`.
pub struct ResolverBridge {
    raw: RawSample,                  // Last consumed sample pair
    calibration: CalibrationParams,  // Active offsets and gains
    calibrated: CalibratedSample,    // Normalized amplitudes of `raw`
    angle: f32,                      // Mechanical angle in radians, (-pi, pi]
    counts_per_rev: u16,             // Emulated encoder resolution
    quadrature: QuadratureState,     // Emulated A/B/Z outputs
    timing: StageTiming,             // Stage durations of the last cycle
    stage_timer: StageTimer,         // Tick to microsecond conversion
}

impl ResolverBridge {
    /// Creates a bridge with the given start-up configuration.
    ///
    /// # Arguments
    /// * `config` - Initial calibration and encoder resolution
    /// * `stage_timer` - Scale of the counter used to time the stages
    pub fn new(config: BridgeConfig, stage_timer: StageTimer) -> Self {
        Self {
            raw: RawSample::default(),
            calibration: config.calibration,
            calibrated: CalibratedSample::default(),
            angle: 0.0,
            counts_per_rev: config.counts_per_rev,
            quadrature: QuadratureState::default(),
            timing: StageTiming::default(),
            stage_timer,
        }
    }

    /// Runs one pipeline cycle on a synchronized sample pair.
    ///
    /// Calibration uses a snapshot of the parameters taken at the start of the cycle,
    /// so an update is applied either entirely or not at all.
    pub fn tick(&mut self, raw: RawSample, counter: &impl TickCounter) -> QuadratureState {
        let calibration = self.calibration;
        self.raw = raw;
        self.calibrated = calibration.apply(raw);

        let calibrated = self.calibrated;
        let (angle, angle_us) = self
            .stage_timer
            .measure(counter, || estimate_angle(calibrated));
        self.angle = angle;

        let counts_per_rev = self.checked_counts_per_rev();
        let (quadrature, quadrature_us) = self
            .stage_timer
            .measure(counter, || angle2quadrature(angle, counts_per_rev));
        self.quadrature = quadrature;

        self.timing = StageTiming {
            angle_us,
            quadrature_us,
        };
        quadrature
    }

    /// Returns the resolution, first replacing a zero value with 1.
    fn checked_counts_per_rev(&mut self) -> u16 {
        if self.counts_per_rev == 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("ENCODER: counts per revolution was 0, forced to 1");
            self.counts_per_rev = 1;
        }
        self.counts_per_rev
    }

    /// Active calibration record.
    #[inline(always)]
    pub fn calibration(&self) -> CalibrationParams {
        self.calibration
    }

    /// Replaces the whole calibration record; takes effect on the next `tick`.
    #[inline(always)]
    pub fn set_calibration(&mut self, calibration: CalibrationParams) {
        self.calibration = calibration;
    }

    #[inline(always)]
    pub fn counts_per_rev(&self) -> u16 {
        self.counts_per_rev
    }

    /// Sets the encoder resolution. Zero is accepted and coerced on the next `tick`.
    #[inline(always)]
    pub fn set_counts_per_rev(&mut self, counts_per_rev: u16) {
        self.counts_per_rev = counts_per_rev;
    }

    pub fn raw(&self) -> RawSample {
        self.raw
    }

    pub fn calibrated(&self) -> CalibratedSample {
        self.calibrated
    }

    /// Mechanical angle of the last cycle in radians.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn quadrature(&self) -> QuadratureState {
        self.quadrature
    }

    pub fn timing(&self) -> StageTiming {
        self.timing
    }

    pub fn stage_timer(&self) -> StageTimer {
        self.stage_timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::f32::consts::FRAC_PI_2;

    /// Counter advancing by a fixed step on every read.
    struct SteppingCounter {
        now: Cell<u32>,
        step: u32,
    }

    impl TickCounter for SteppingCounter {
        fn now(&self) -> u32 {
            let t = self.now.get();
            self.now.set((t + self.step) % 1000);
            t
        }
    }

    fn bridge() -> ResolverBridge {
        ResolverBridge::new(BridgeConfig::default(), StageTimer::from_parts(999, 1_000_000.0))
    }

    fn counter() -> SteppingCounter {
        SteppingCounter {
            now: Cell::new(0),
            step: 3,
        }
    }

    #[test]
    fn quarter_turn_end_to_end() {
        let mut bridge = bridge();
        let q = bridge.tick(RawSample::new(3072, 2048), &counter());

        assert_eq!(bridge.calibrated().sin_cal, 0.5);
        assert_eq!(bridge.calibrated().cos_cal, 0.0);
        assert_eq!(bridge.angle(), FRAC_PI_2);
        assert_eq!(q.count, 125);
        assert!(!q.a && !q.b && !q.z);
        assert_eq!(bridge.quadrature(), q);
    }

    #[test]
    fn stages_are_timed() {
        let mut bridge = bridge();
        bridge.tick(RawSample::new(2048, 4095), &counter());
        // Each stage sees two reads 3 ticks apart at 1 us per tick
        assert_eq!(bridge.timing().angle_us, 3.0);
        assert_eq!(bridge.timing().quadrature_us, 3.0);
    }

    #[test]
    fn zero_resolution_is_persisted_as_one() {
        let mut bridge = bridge();
        bridge.set_counts_per_rev(0);
        bridge.tick(RawSample::new(2048, 4095), &counter());
        assert_eq!(bridge.counts_per_rev(), 1);
    }

    #[test]
    fn calibration_swap_applies_on_next_tick() {
        let mut bridge = bridge();
        bridge.tick(RawSample::new(3072, 2048), &counter());
        bridge.set_calibration(CalibrationParams {
            offset_sin: 3072.0,
            offset_cos: 1024.0,
            ..Default::default()
        });
        bridge.tick(RawSample::new(3072, 2048), &counter());
        assert_eq!(bridge.calibrated().sin_cal, 0.0);
        assert_eq!(bridge.calibrated().cos_cal, 0.5);
        assert_eq!(bridge.angle(), 0.0);
        assert!(bridge.quadrature().z);
    }

    #[test]
    fn repeated_ticks_are_bit_identical() {
        let mut bridge = bridge();
        let raw = RawSample::new(1234, 3210);
        let first = bridge.tick(raw, &counter());
        let (cal, angle) = (bridge.calibrated(), bridge.angle());
        for _ in 0..10 {
            assert_eq!(bridge.tick(raw, &counter()), first);
            assert_eq!(bridge.calibrated(), cal);
            assert_eq!(bridge.angle().to_bits(), angle.to_bits());
        }
    }
}
