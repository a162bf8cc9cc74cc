// Implements the telemetry table shared with the external visualization and
// calibration tool, which reads and writes target memory through the debug probe.

// Key Features:
// - One #[repr(C)] block holding every externally visible variable
// - Name -> (offset, kind, access) table so a host can locate each variable
// - Host writes picked up once per main-loop iteration and applied as a whole record
// - Volatile access only, the probe may touch the block at any time

// Detailed Operation:
// The firmware places a single `TelemetryBlock` in a static with a stable symbol.
// On every main-loop iteration `ScopeTable::service` reads the block, compares the
// writable variables against the values it last published and, if the host changed
// any, commits them to the bridge as one calibration record. It then publishes the
// bridge outputs. Writable variables are only written back when the firmware itself
// changed them (e.g. a zero resolution coerced to one), so a host write landing
// during publication is not overwritten.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::mem::offset_of;
use core::ptr::addr_of;

use crate::analog::calibration::CalibrationParams;
use crate::config::{DEFAULT_COUNTS_PER_REV, DEFAULT_GAIN, DEFAULT_OFFSET};
use crate::peripherals::TelemetryExporter;
use crate::ResolverBridge;

/// Storage type of a telemetry variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueKind {
    U8,
    U16,
    U32,
    F32,
}

/// Value of a telemetry variable.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::F32(_) => ValueKind::F32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryError {
    #[error("no telemetry variable with this name")]
    UnknownVariable,
    #[error("telemetry variable is read-only")]
    ReadOnly,
    #[error("value kind does not match the variable")]
    KindMismatch,
}

/// Location and access of one telemetry variable inside `TelemetryBlock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarEntry {
    pub name: &'static str,
    /// Byte offset from the start of the block
    pub offset: usize,
    pub kind: ValueKind,
    pub writable: bool,
}

/// Field types a telemetry variable may have.
pub trait Scalar {
    const KIND: ValueKind;
}

impl Scalar for u8 {
    const KIND: ValueKind = ValueKind::U8;
}

impl Scalar for u16 {
    const KIND: ValueKind = ValueKind::U16;
}

impl Scalar for u32 {
    const KIND: ValueKind = ValueKind::U32;
}

impl Scalar for f32 {
    const KIND: ValueKind = ValueKind::F32;
}

/// Every variable visible to the external tool, as laid out in target memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryBlock {
    pub sin_raw: u16,
    pub cos_raw: u16,
    pub offset_sin: f32,
    pub offset_cos: f32,
    pub gain_sin: f32,
    pub gain_cos: f32,
    pub sin_cal: f32,
    pub cos_cal: f32,
    pub angle: f32,
    pub angle_time_us: f32,
    pub quadrature_time_us: f32,
    pub encoder_a: u8,
    pub encoder_b: u8,
    pub encoder_z: u8,
    pub counts_per_rev: u16,
    pub encoder_count: u32,
    pub sample_counter: u32,
}

// The field accessor only compiles if `$ty` is the declared type of `$field`,
// so an entry's kind always matches the storage at its offset.
macro_rules! var {
    ($field:ident: $ty:ty, $writable:expr) => {{
        const _: fn(&TelemetryBlock) -> &$ty = |block| &block.$field;
        VarEntry {
            name: stringify!($field),
            offset: offset_of!(TelemetryBlock, $field),
            kind: <$ty as Scalar>::KIND,
            writable: $writable,
        }
    }};
}

/// Name to storage mapping of the telemetry block.
pub const VARIABLES: [VarEntry; 17] = [
    var!(sin_raw: u16, false),
    var!(cos_raw: u16, false),
    var!(offset_sin: f32, true),
    var!(offset_cos: f32, true),
    var!(gain_sin: f32, true),
    var!(gain_cos: f32, true),
    var!(sin_cal: f32, false),
    var!(cos_cal: f32, false),
    var!(angle: f32, false),
    var!(angle_time_us: f32, false),
    var!(quadrature_time_us: f32, false),
    var!(encoder_a: u8, false),
    var!(encoder_b: u8, false),
    var!(encoder_z: u8, false),
    var!(counts_per_rev: u16, true),
    var!(encoder_count: u32, false),
    var!(sample_counter: u32, false),
];

/// Looks up a variable by name.
pub fn lookup(name: &str) -> Option<&'static VarEntry> {
    VARIABLES.iter().find(|entry| entry.name == name)
}

impl VarEntry {
    /// Volatile read of this variable from the block at `block`.
    ///
    /// # Safety
    /// `block` must point to a valid `TelemetryBlock`.
    unsafe fn load(&self, block: *const TelemetryBlock) -> Value {
        let field = (block as *const u8).add(self.offset);
        match self.kind {
            ValueKind::U8 => Value::U8(field.read_volatile()),
            ValueKind::U16 => Value::U16((field as *const u16).read_volatile()),
            ValueKind::U32 => Value::U32((field as *const u32).read_volatile()),
            ValueKind::F32 => Value::F32((field as *const f32).read_volatile()),
        }
    }

    /// Volatile write of this variable into the block at `block`.
    ///
    /// # Safety
    /// `block` must point to a valid `TelemetryBlock`.
    unsafe fn store(&self, block: *mut TelemetryBlock, value: Value) -> Result<(), TelemetryError> {
        let field = (block as *mut u8).add(self.offset);
        match (self.kind, value) {
            (ValueKind::U8, Value::U8(v)) => field.write_volatile(v),
            (ValueKind::U16, Value::U16(v)) => (field as *mut u16).write_volatile(v),
            (ValueKind::U32, Value::U32(v)) => (field as *mut u32).write_volatile(v),
            (ValueKind::F32, Value::F32(v)) => (field as *mut f32).write_volatile(v),
            _ => return Err(TelemetryError::KindMismatch),
        }
        Ok(())
    }
}

impl Default for TelemetryBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryBlock {
    /// Block holding the power-on defaults, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            sin_raw: 0,
            cos_raw: 0,
            offset_sin: DEFAULT_OFFSET,
            offset_cos: DEFAULT_OFFSET,
            gain_sin: DEFAULT_GAIN,
            gain_cos: DEFAULT_GAIN,
            sin_cal: 0.0,
            cos_cal: 0.0,
            angle: 0.0,
            angle_time_us: 0.0,
            quadrature_time_us: 0.0,
            encoder_a: 0,
            encoder_b: 0,
            encoder_z: 0,
            counts_per_rev: DEFAULT_COUNTS_PER_REV,
            encoder_count: 0,
            sample_counter: 0,
        }
    }

    /// Snapshot of the bridge state as seen by the external tool.
    pub fn from_bridge(bridge: &ResolverBridge, sample_counter: u32) -> Self {
        let cal = bridge.calibration();
        let raw = bridge.raw();
        let calibrated = bridge.calibrated();
        let quadrature = bridge.quadrature();
        let timing = bridge.timing();
        Self {
            sin_raw: raw.sin_raw,
            cos_raw: raw.cos_raw,
            offset_sin: cal.offset_sin,
            offset_cos: cal.offset_cos,
            gain_sin: cal.gain_sin,
            gain_cos: cal.gain_cos,
            sin_cal: calibrated.sin_cal,
            cos_cal: calibrated.cos_cal,
            angle: bridge.angle(),
            angle_time_us: timing.angle_us,
            quadrature_time_us: timing.quadrature_us,
            encoder_a: quadrature.a as u8,
            encoder_b: quadrature.b as u8,
            encoder_z: quadrature.z as u8,
            counts_per_rev: bridge.counts_per_rev(),
            encoder_count: quadrature.count,
            sample_counter,
        }
    }

    /// Calibration record described by the writable offset/gain variables.
    pub fn calibration(&self) -> CalibrationParams {
        CalibrationParams {
            offset_sin: self.offset_sin,
            offset_cos: self.offset_cos,
            gain_sin: self.gain_sin,
            gain_cos: self.gain_cos,
        }
    }

    /// Reads a variable by name.
    pub fn read(&self, name: &str) -> Result<Value, TelemetryError> {
        let entry = lookup(name).ok_or(TelemetryError::UnknownVariable)?;
        // Note(unsafe): the pointer comes from a reference
        Ok(unsafe { entry.load(self) })
    }

    /// Writes a writable variable by name.
    pub fn write(&mut self, name: &str, value: Value) -> Result<(), TelemetryError> {
        let result = self.store(name, value);
        #[cfg(feature = "defmt")]
        if let Err(err) = result {
            defmt::warn!("SCOPE: write to {} rejected: {}", name, err);
        }
        result
    }

    fn store(&mut self, name: &str, value: Value) -> Result<(), TelemetryError> {
        let entry = lookup(name).ok_or(TelemetryError::UnknownVariable)?;
        if !entry.writable {
            return Err(TelemetryError::ReadOnly);
        }
        // Note(unsafe): the pointer comes from a reference
        unsafe { entry.store(self, value) }
    }
}

/// Writable variables of the block, compared to detect host writes.
#[derive(Clone, Copy, Debug)]
struct HostInputs {
    calibration: CalibrationParams,
    counts_per_rev: u16,
}

/// Bit patterns of a calibration record, so NaN compares equal to itself.
fn calibration_bits(cal: &CalibrationParams) -> [u32; 4] {
    [
        cal.offset_sin.to_bits(),
        cal.offset_cos.to_bits(),
        cal.gain_sin.to_bits(),
        cal.gain_cos.to_bits(),
    ]
}

impl PartialEq for HostInputs {
    fn eq(&self, other: &Self) -> bool {
        self.counts_per_rev == other.counts_per_rev
            && calibration_bits(&self.calibration) == calibration_bits(&other.calibration)
    }
}

impl HostInputs {
    fn of_bridge(bridge: &ResolverBridge) -> Self {
        Self {
            calibration: bridge.calibration(),
            counts_per_rev: bridge.counts_per_rev(),
        }
    }

    fn of_block(block: &TelemetryBlock) -> Self {
        Self {
            calibration: block.calibration(),
            counts_per_rev: block.counts_per_rev,
        }
    }
}

/// Telemetry exporter backed by a `TelemetryBlock` in target memory.
pub struct ScopeTable {
    block: *mut TelemetryBlock,
    committed: HostInputs,
}

impl ScopeTable {
    /// Takes over `block` and publishes the initial bridge state into it.
    ///
    /// # Safety
    /// `block` must stay valid for as long as the table is used and must not be accessed
    /// by firmware code other than this table. The debug probe may access it at any time.
    pub unsafe fn new(block: *mut TelemetryBlock, bridge: &ResolverBridge) -> Self {
        block.write_volatile(TelemetryBlock::from_bridge(bridge, 0));
        Self {
            block,
            committed: HostInputs::of_bridge(bridge),
        }
    }

    /// Volatile copy of the whole block.
    pub fn snapshot(&self) -> TelemetryBlock {
        // Note(unsafe): see `ScopeTable::new`
        unsafe { addr_of!(*self.block).read_volatile() }
    }

    /// Reads one variable straight from target memory.
    pub fn read(&self, name: &str) -> Result<Value, TelemetryError> {
        let entry = lookup(name).ok_or(TelemetryError::UnknownVariable)?;
        // Note(unsafe): see `ScopeTable::new`
        Ok(unsafe { entry.load(self.block) })
    }

    /// Commits host writes to the bridge. Returns true if anything changed.
    fn collect(&mut self, bridge: &mut ResolverBridge) -> bool {
        let host = HostInputs::of_block(&self.snapshot());
        if host == self.committed {
            return false;
        }
        #[cfg(feature = "defmt")]
        defmt::info!(
            "SCOPE: calibration {}, counts per revolution {}",
            host.calibration,
            host.counts_per_rev
        );
        bridge.set_calibration(host.calibration);
        bridge.set_counts_per_rev(host.counts_per_rev);
        self.committed = host;
        true
    }

    fn publish(&mut self, bridge: &ResolverBridge, sample_counter: u32) {
        let out = TelemetryBlock::from_bridge(bridge, sample_counter);
        let current = HostInputs::of_bridge(bridge);
        let resolution_changed = current.counts_per_rev != self.committed.counts_per_rev;
        let calibration_changed =
            calibration_bits(&current.calibration) != calibration_bits(&self.committed.calibration);

        for entry in VARIABLES.iter() {
            // Writable variables go back only if the firmware changed them
            if entry.writable {
                let changed = if entry.name == "counts_per_rev" {
                    resolution_changed
                } else {
                    calibration_changed
                };
                if !changed {
                    continue;
                }
            }
            // Note(unsafe): `out` is a local block, `self.block` is valid (see `ScopeTable::new`)
            // and both sides use the entry's own kind, so the store cannot fail.
            unsafe {
                let value = entry.load(&out);
                let _ = entry.store(self.block, value);
            }
        }
        self.committed = current;
    }
}

impl TelemetryExporter for ScopeTable {
    fn service(&mut self, bridge: &mut ResolverBridge, sample_counter: u32) {
        self.collect(bridge);
        self.publish(bridge, sample_counter);
    }
}
