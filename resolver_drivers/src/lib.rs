#![no_std]

pub mod adc_pair;
pub mod pinout;
pub mod ticker;
