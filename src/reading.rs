//! Per-sensor field decoding.
//!
//! Decoding is an exhaustive dispatch over [`FrameLayout`]; it is only ever
//! applied to frames that passed [`crate::framing::validate`], so it cannot
//! fail. All multi-byte fields are little-endian.

use serde::Serialize;
use time::OffsetDateTime;

use crate::framing::RawFrame;
use crate::registry::{FrameLayout, SensorDescriptor, SensorId};

/// Low 24 bits of the combined eCO₂/status field.
const ECO2_MASK: u32 = 0xFF_FFFF;
/// Barometric pressure arrives in hundredths of hPa.
const PRESSURE_DIVISOR: f32 = 100.0;
/// Compensated air-quality fields arrive in hundredths.
const HUNDREDTHS: f32 = 0.01;

/// Scaled field values of one frame.
///
/// One variant per [`FrameLayout`] kind; which sensor produced the values is
/// recorded on the enclosing [`DecodedReading`].
#[derive(Serialize, Debug, Clone, PartialEq)]
pub enum Reading {
    /// Three scaled axes, e.g. g for the accelerometer or degrees per second
    /// for the gyroscope.
    Vector3 { x: f32, y: f32, z: f32 },
    /// One scaled value, e.g. °C, %RH, or hPa.
    Scalar(f32),
    AirQuality {
        iaq: u16,
        iaq_static: u16,
        bvoc_eq_ppm: f32,
        eco2_ppm: u32,
        status: u8,
        temperature_c: f32,
        humidity_pct: f32,
        gas_ohm: u16,
    },
    AirQualityCompact {
        iaq: u16,
        bvoc_eq_ppm: f32,
        eco2_ppm: u32,
        status: u8,
        temperature_c: f32,
    },
}

impl Reading {
    /// Number of fields carried, matching
    /// [`FrameLayout::field_count`](crate::registry::FrameLayout::field_count)
    /// of the layout that produced this reading.
    #[must_use]
    pub fn field_count(&self) -> usize {
        match self {
            Reading::Vector3 { .. } => 3,
            Reading::Scalar(_) => 1,
            Reading::AirQuality { .. } => 8,
            Reading::AirQualityCompact { .. } => 5,
        }
    }
}

/// One typed sensor reading as yielded by the session.
///
/// Identified by `(sensor_id, seq)` where `seq` is the per-sensor counter of
/// the owning channel. The decoder keeps no reference after emitting.
#[derive(Debug, Clone)]
pub struct DecodedReading {
    pub sensor_id: SensorId,
    /// Monotonically increasing per-sensor sequence counter.
    pub seq: u64,
    /// Assigned at decode time.
    pub captured_at: OffsetDateTime,
    pub reading: Reading,
}

impl DecodedReading {
    #[must_use]
    pub fn new(frame: &RawFrame, desc: &SensorDescriptor, seq: u64) -> Self {
        DecodedReading {
            sensor_id: desc.id,
            seq,
            captured_at: OffsetDateTime::now_utc(),
            reading: decode(frame, desc),
        }
    }
}

/// Decode a validated frame's payload per the descriptor layout.
pub fn decode(frame: &RawFrame, desc: &SensorDescriptor) -> Reading {
    let p = frame.payload();
    match desc.layout {
        FrameLayout::Vector3I16 => Reading::Vector3 {
            x: f32::from(i16_at(p, 0)) * desc.scale,
            y: f32::from(i16_at(p, 2)) * desc.scale,
            z: f32::from(i16_at(p, 4)) * desc.scale,
        },
        FrameLayout::ScalarI16 => Reading::Scalar(f32::from(i16_at(p, 0)) * desc.scale),
        FrameLayout::ScalarU8 => Reading::Scalar(f32::from(p[0]) * desc.scale),
        FrameLayout::ScalarU24 => Reading::Scalar(u24_at(p, 0) as f32 / PRESSURE_DIVISOR),
        FrameLayout::AirQuality => {
            let combined = u32_at(p, 8);
            Reading::AirQuality {
                iaq: u16_at(p, 0),
                iaq_static: u16_at(p, 2),
                bvoc_eq_ppm: f32_at(p, 4),
                eco2_ppm: combined & ECO2_MASK,
                status: (combined >> 24) as u8,
                temperature_c: f32::from(i16_at(p, 12)) * HUNDREDTHS,
                humidity_pct: f32::from(u16_at(p, 14)) * HUNDREDTHS,
                gas_ohm: u16_at(p, 16),
            }
        }
        FrameLayout::AirQualityCompact => {
            let combined = u32_at(p, 4);
            Reading::AirQualityCompact {
                iaq: u16_at(p, 0),
                bvoc_eq_ppm: f32::from(u16_at(p, 2)) * HUNDREDTHS,
                eco2_ppm: combined & ECO2_MASK,
                status: (combined >> 24) as u8,
                temperature_c: f32::from(i16_at(p, 8)) * HUNDREDTHS,
            }
        }
    }
}

fn i16_at(p: &[u8], off: usize) -> i16 {
    i16::from_le_bytes([p[off], p[off + 1]])
}

fn u16_at(p: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([p[off], p[off + 1]])
}

fn u32_at(p: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]])
}

/// Three bytes zero-padded to four before unsigned interpretation. The pad
/// byte is always zero, whatever follows the field in the buffer.
fn u24_at(p: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([p[off], p[off + 1], p[off + 2], 0])
}

fn f32_at(p: &[u8], off: usize) -> f32 {
    f32::from_le_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]])
}
