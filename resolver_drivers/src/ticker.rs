// Implements the periodic sampling tick on TIM3 and exposes its counter for stage timing.

// Key Features:
// - Update interrupt at the sampling rate starts every sine/cosine conversion pair
// - The running TIM3 counter doubles as the tick source of the stage timer
// - Counter rate derived from the reload value and the update rate

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    clocks::Clocks,
    pac::TIM3,
    timer::{Timer, TimerInterrupt},
};

use resolver_algo::peripherals::{Clock, PeriodicTicker, TickCounter};

pub struct SampleTicker {
    tim: Timer<TIM3>,
    freq: u32,
}

impl SampleTicker {
    pub fn new(tim3: TIM3, clock_cfg: &Clocks, freq: u32) -> Self {
        let mut timer = Timer::new_tim3(tim3, freq as f32, Default::default(), clock_cfg);
        // Enable update interrupt for the timer
        timer.enable_interrupt(TimerInterrupt::Update);

        SampleTicker { tim: timer, freq }
    }

    /// Starts ticking.
    pub fn begin(&mut self) {
        self.tim.enable();
    }

    /// Scale of the TIM3 counter, read after the timer is configured.
    pub fn clock(&self) -> TimerClock {
        TimerClock {
            reload: self.tim.get_max_duty(),
            update_hz: self.freq,
        }
    }
}

impl PeriodicTicker for SampleTicker {
    fn acknowledge(&mut self) -> bool {
        let regs = unsafe { &*TIM3::ptr() };
        let pending = regs.sr.read().uif().bit_is_set();
        self.tim.clear_interrupt(TimerInterrupt::Update);
        pending
    }
}

/// Read-only view of the TIM3 counter, usable while the ticker is owned by its interrupt.
#[derive(Clone, Copy)]
pub struct TimerCounter;

impl TickCounter for TimerCounter {
    #[inline(always)]
    fn now(&self) -> u32 {
        let regs = unsafe { &*TIM3::ptr() };
        regs.cnt.read().bits() & 0xFFFF
    }
}

/// TIM3 reload value and update rate.
#[derive(Clone, Copy)]
pub struct TimerClock {
    reload: u32,
    update_hz: u32,
}

impl Clock for TimerClock {
    /// Ticks per period times periods per second.
    fn instruction_frequency_hz(&self) -> f32 {
        (self.reload as f32 + 1.0) * self.update_hz as f32
    }

    fn timer_reload(&self) -> u32 {
        self.reload
    }
}
