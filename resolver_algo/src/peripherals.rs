// Collaborator interfaces consumed by the resolver pipeline.
//
// The pipeline never touches registers. The board crate implements these traits
// on top of its ADC and timer peripherals, and unit tests implement them with
// plain structs.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::ResolverBridge;

/// Analog front end producing one raw conversion per resolver channel.
pub trait AnalogSampler {
    /// Starts a new sine/cosine conversion pair.
    fn trigger(&mut self);

    /// Returns a finished conversion as `(channel_id, raw_value)`, if one is pending.
    ///
    /// Called from the conversion interrupt and, as a failsafe, from the main loop
    /// in case the interrupt is masked.
    fn poll(&mut self) -> Option<(u8, u16)>;
}

/// Free-running hardware counter used to time pipeline stages.
pub trait TickCounter {
    fn now(&self) -> u32;
}

/// Hardware timer firing the periodic sampling tick.
pub trait PeriodicTicker {
    /// Clears the pending tick. Returns `false` if the interrupt was spurious.
    fn acknowledge(&mut self) -> bool;
}

/// Clock information read once at startup to scale counter ticks.
pub trait Clock {
    /// Rate the tick counter advances at, in Hz.
    fn instruction_frequency_hz(&self) -> f32;

    /// Reload value of the timer backing the tick counter.
    fn timer_reload(&self) -> u32;
}

/// Exposes the pipeline's variables to an external visualization tool.
pub trait TelemetryExporter {
    /// Processes pending external reads and writes. Called once per main-loop iteration.
    fn service(&mut self, bridge: &mut ResolverBridge, sample_counter: u32);
}
