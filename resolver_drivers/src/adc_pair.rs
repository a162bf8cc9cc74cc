// Implements the resolver ADC front end on ADC2: one triggered sequence converts the
// sine channel, then the cosine channel, raising an end-of-conversion interrupt for each.

// Detailed Operation:
// `trigger` starts the regular sequence unless one is still in flight or a result is
// still unread. Every end-of-conversion event reports the next channel of the sequence,
// so the driver keeps the position of the conversion it expects and tags each result
// with the channel id before handing it on.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    adc::{Adc, AdcDevice, AdcInterrupt, Align, InputType, SampleTime},
    clocks::Clocks,
    pac::ADC2,
};

use resolver_algo::peripherals::AnalogSampler;

use super::pinout;

/// Conversion order of the regular sequence.
pub const SEQUENCE: [u8; 2] = [pinout::resolver::SIN_CHANNEL, pinout::resolver::COS_CHANNEL];

pub struct ResolverAdc {
    adc: Adc<ADC2>,
    slot: usize, // Position in SEQUENCE of the next result
}

impl ResolverAdc {
    pub fn new(adc2: ADC2, clock_cfg: &Clocks) -> Self {
        pinout::resolver::SIN.init();
        pinout::resolver::COS.init();

        let mut adc = Adc::new_adc2(adc2, AdcDevice::Two, Default::default(), clock_cfg.systick());

        for (i, &channel) in SEQUENCE.iter().enumerate() {
            adc.set_sequence(channel, i as u8 + 1);
            adc.set_input_type(channel, InputType::SingleEnded);
            adc.set_sample_time(channel, SampleTime::T47);
        }
        adc.set_sequence_len(SEQUENCE.len() as u8);

        // 12-bit results in the low bits, 0..=4095
        adc.set_align(Align::Right);
        adc.enable_interrupt(AdcInterrupt::EndOfConversion);

        ResolverAdc { adc, slot: 0 }
    }

    fn conversion_done(&self) -> bool {
        self.adc.regs.isr.read().eoc().bit_is_set()
    }

    fn sequence_running(&self) -> bool {
        self.adc.regs.cr.read().adstart().bit_is_set()
    }
}

impl AnalogSampler for ResolverAdc {
    fn trigger(&mut self) {
        if self.sequence_running() || self.conversion_done() {
            return;
        }
        self.slot = 0;
        self.adc.start_conversion(&SEQUENCE);
    }

    fn poll(&mut self) -> Option<(u8, u16)> {
        if !self.conversion_done() {
            return None;
        }
        // Reading the data register clears EOC
        let value = self.adc.read_result();
        let channel = SEQUENCE[self.slot];
        self.slot = (self.slot + 1) % SEQUENCE.len();
        Some((channel, value))
    }
}
