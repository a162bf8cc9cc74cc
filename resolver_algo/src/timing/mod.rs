// Implements the StageTimer module, measuring how long a pipeline stage takes
// by sampling a free-running timer counter before and after it.

// Key Features:
// - Elapsed tick computation tolerant to a single counter rollover
// - Tick to microsecond scaling computed once at startup
// - Fallback scale when the reported clock frequency is unusable

// Detailed Operation:
// The counter backing the measurement is the sampling ticker itself, so it
// counts from 0 up to its reload value and restarts. A stage that straddles
// the reload point sees `end < start`; the elapsed count is then the distance
// to the end of the period plus the ticks after the restart. Stages longer
// than one full period are not representable and alias.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::peripherals::{Clock, TickCounter};

/// Microseconds per tick used when the clock reports a non-positive frequency.
pub const FALLBACK_TICK_US: f32 = 0.01;

/// Ticks elapsed between `start` and `end` on a counter wrapping every `period` ticks.
#[inline(always)]
pub const fn tick_delta(start: u32, end: u32, period: u32) -> u32 {
    if end >= start {
        end - start
    } else {
        period.wrapping_sub(start).wrapping_add(end)
    }
}

/// Converts counter ticks around a stage into a duration in microseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StageTimer {
    period: u32,      // Counter ticks per timer period (reload + 1)
    tick_us: f32,     // Duration of a single tick in microseconds
}

impl StageTimer {
    /// Reads the timer reload and counting frequency from the clock.
    pub fn new(clock: &impl Clock) -> Self {
        Self::from_parts(clock.timer_reload(), clock.instruction_frequency_hz())
    }

    /// Builds the timer scale from a reload value and a counting frequency.
    pub fn from_parts(reload: u32, frequency_hz: f32) -> Self {
        let mut period = reload.wrapping_add(1);
        if period == 0 {
            period = 1;
        }

        let tick_us = if frequency_hz > 0.0 {
            1_000_000.0 / frequency_hz
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "TIMING: invalid clock frequency, using {} us per tick",
                FALLBACK_TICK_US
            );
            FALLBACK_TICK_US
        };

        Self { period, tick_us }
    }

    /// Counter ticks per period.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Microseconds per counter tick.
    pub fn tick_us(&self) -> f32 {
        self.tick_us
    }

    /// Elapsed ticks between two counter readings.
    #[inline(always)]
    pub fn tick_delta(&self, start: u32, end: u32) -> u32 {
        tick_delta(start, end, self.period)
    }

    #[inline(always)]
    pub fn ticks_to_us(&self, ticks: u32) -> f32 {
        ticks as f32 * self.tick_us
    }

    /// Runs `stage`, returning its result together with its duration in microseconds.
    #[inline(always)]
    pub fn measure<R>(&self, counter: &impl TickCounter, stage: impl FnOnce() -> R) -> (R, f32) {
        let start = counter.now();
        let result = stage();
        let end = counter.now();
        (result, self.ticks_to_us(self.tick_delta(start, end)))
    }
}
