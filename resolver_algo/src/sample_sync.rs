// Implements the sample synchronizer, pairing the sine and cosine conversions that
// arrive from two independently interrupting ADC channels into one coherent sample.

// Key Features:
// - Per-channel completion flags kept as a bitmask, cleared as conversions arrive.
// - Completed pairs published as one packed word, so a reader never sees a torn pair.
// - Generation counter telling the main loop a new pair exists (single producer, single consumer).
// - No locks: the interrupt side never blocks and the main loop never waits.

// Detailed Operation:
// Each conversion result is stored in the latch of its channel and clears that
// channel's bit in the pending mask. When the mask reaches zero, both latched
// values are packed into the ready slot, the mask is re-armed and the generation
// counter advances. The main loop compares the generation with the last one it
// consumed; `take()` re-reads the generation after copying the slot and retries
// if a newer pair landed in between.
//
// Limitations kept on purpose:
// - A second conversion for the same channel before the other channel reports
//   replaces the first value without completing a pair.
// - A pair completing while the previous one is still unconsumed overwrites it.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::peripherals::AnalogSampler;

/// One synchronized sine/cosine reading straight from the ADC.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Sine channel conversion result.
    pub sin_raw: u16,

    /// Cosine channel conversion result.
    pub cos_raw: u16,
}

impl RawSample {
    pub const fn new(sin_raw: u16, cos_raw: u16) -> Self {
        Self { sin_raw, cos_raw }
    }

    #[inline(always)]
    const fn pack(self) -> u32 {
        ((self.cos_raw as u32) << 16) | self.sin_raw as u32
    }

    #[inline(always)]
    const fn unpack(word: u32) -> Self {
        Self {
            sin_raw: word as u16,
            cos_raw: (word >> 16) as u16,
        }
    }
}

/// Bit masks for each resolver channel in the pending mask.
#[repr(u8)]
enum ChannelBit {
    SIN = 1 << 0,
    COS = 1 << 1,
}

/// Pending mask of a pair with no channel converted yet.
const MANDATORY: u8 = ChannelBit::SIN as u8 | ChannelBit::COS as u8;

/// Lock-free handshake between the conversion interrupt and the main loop.
pub struct SampleSync {
    /// ADC channel id carrying the sine signal.
    sin_channel: u8,

    /// ADC channel id carrying the cosine signal.
    cos_channel: u8,

    /// Channels still missing from the pair being collected.
    pending: AtomicU8,

    /// Latest value per channel: [sine, cosine].
    latch: [AtomicU16; 2],

    /// Last completed pair, packed as `cos << 16 | sin`.
    ready: AtomicU32,

    /// Number of completed pairs.
    iter: AtomicU32,

    /// Value of `iter` at the last consumption.
    prev_iter: AtomicU32,

    /// Number of periodic sampling ticks.
    sample_counter: AtomicU32,
}

impl SampleSync {
    /// Creates a synchronizer waiting for both channels.
    pub const fn new(sin_channel: u8, cos_channel: u8) -> Self {
        Self {
            sin_channel,
            cos_channel,
            pending: AtomicU8::new(MANDATORY),
            latch: [AtomicU16::new(0), AtomicU16::new(0)],
            ready: AtomicU32::new(0),
            iter: AtomicU32::new(0),
            prev_iter: AtomicU32::new(0),
            sample_counter: AtomicU32::new(0),
        }
    }

    /// Records a finished conversion. Events for unknown channels are dropped.
    pub fn on_conversion(&self, channel: u8, value: u16) {
        let bit = if channel == self.sin_channel {
            self.latch[0].store(value, Ordering::Relaxed);
            ChannelBit::SIN
        } else if channel == self.cos_channel {
            self.latch[1].store(value, Ordering::Relaxed);
            ChannelBit::COS
        } else {
            return;
        };

        let bit = bit as u8;
        let prev = self.pending.fetch_and(!bit, Ordering::AcqRel);
        if prev & !bit == 0 {
            // Both channels present: publish and re-arm for the next pair
            let pair = RawSample::new(
                self.latch[0].load(Ordering::Relaxed),
                self.latch[1].load(Ordering::Relaxed),
            );
            self.ready.store(pair.pack(), Ordering::Relaxed);
            self.pending.store(MANDATORY, Ordering::Relaxed);
            self.iter.fetch_add(1, Ordering::Release);
        }
    }

    /// True if a completed pair has not been consumed yet.
    #[inline(always)]
    pub fn is_ready(&self) -> bool {
        self.iter.load(Ordering::Acquire) != self.prev_iter.load(Ordering::Relaxed)
    }

    /// Consumes the latest completed pair, if any.
    pub fn take(&self) -> Option<RawSample> {
        let consumed = self.prev_iter.load(Ordering::Relaxed);
        loop {
            let iter = self.iter.load(Ordering::Acquire);
            if iter == consumed {
                return None;
            }
            let word = self.ready.load(Ordering::Acquire);
            if self.iter.load(Ordering::Relaxed) == iter {
                self.prev_iter.store(iter, Ordering::Relaxed);
                return Some(RawSample::unpack(word));
            }
        }
    }

    /// Periodic ticker body: counts the tick and starts a new conversion pair.
    pub fn on_tick(&self, sampler: &mut impl AnalogSampler) {
        self.sample_counter.fetch_add(1, Ordering::Relaxed);
        sampler.trigger();
    }

    /// Feeds every conversion the sampler has finished into the synchronizer.
    pub fn drain(&self, sampler: &mut impl AnalogSampler) {
        while let Some((channel, value)) = sampler.poll() {
            self.on_conversion(channel, value);
        }
    }

    /// Number of periodic sampling ticks seen so far (wrapping).
    pub fn sample_counter(&self) -> u32 {
        self.sample_counter.load(Ordering::Relaxed)
    }

    /// Number of completed pairs so far (wrapping).
    pub fn generation(&self) -> u32 {
        self.iter.load(Ordering::Acquire)
    }
}
