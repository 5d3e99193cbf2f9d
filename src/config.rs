//! Sensor configuration commands.
//!
//! One fixed 9-byte command per sensor, sent individually on the standard
//! channel's write side: `[id: u8][sample rate: f32 LE][latency: u32 LE]`.

use serde::{Deserialize, Serialize};

use crate::registry::SensorId;

/// On-wire length of a configuration command.
pub const CONFIG_FRAME_LEN: usize = 9;

/// Desired sampling behavior for one sensor.
///
/// A sample rate of `0.0` is the device's convention for "stop emitting
/// frames for this sensor"; it is encoded like any other rate.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct ConfigEntry {
    pub sensor_id: SensorId,
    /// Desired sample rate in Hz.
    pub sample_rate_hz: f32,
    /// How long the device may buffer readings before transmitting, in
    /// milliseconds.
    pub latency_ms: u32,
}

impl ConfigEntry {
    #[must_use]
    pub fn new(sensor_id: SensorId, sample_rate_hz: f32, latency_ms: u32) -> Self {
        ConfigEntry {
            sensor_id,
            sample_rate_hz,
            latency_ms,
        }
    }

    /// Entry that turns the sensor off.
    #[must_use]
    pub fn disable(sensor_id: SensorId) -> Self {
        ConfigEntry::new(sensor_id, 0.0, 0)
    }

    #[must_use]
    pub fn encode(&self) -> [u8; CONFIG_FRAME_LEN] {
        let mut dat = [0u8; CONFIG_FRAME_LEN];
        dat[0] = self.sensor_id;
        dat[1..5].copy_from_slice(&self.sample_rate_hz.to_le_bytes());
        dat[5..9].copy_from_slice(&self.latency_ms.to_le_bytes());
        dat
    }

    /// Parse a command frame, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < CONFIG_FRAME_LEN {
            return None;
        }
        Some(ConfigEntry {
            sensor_id: dat[0],
            sample_rate_hz: f32::from_le_bytes([dat[1], dat[2], dat[3], dat[4]]),
            latency_ms: u32::from_le_bytes([dat[5], dat[6], dat[7], dat[8]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn encode_layout() {
        let dat = ConfigEntry::new(4, 1.0, 0x0102_0304).encode();
        // id, then 1.0f32 and the latency little-endian
        assert_eq!(hex::encode(dat), "040000803f04030201");
    }

    #[test_case(0.0, 0; "disabled")]
    #[test_case(0.0, u32::MAX; "max latency")]
    #[test_case(f32::MIN_POSITIVE, 1; "smallest normal rate")]
    #[test_case(f32::from_bits(1), 1; "subnormal rate")]
    #[test_case(400.0, 500; "typical imu rate")]
    fn round_trip(rate: f32, latency: u32) {
        let entry = ConfigEntry::new(171, rate, latency);
        let back = ConfigEntry::decode(&entry.encode()).unwrap();
        assert_eq!(back.sensor_id, 171);
        assert_eq!(back.sample_rate_hz.to_bits(), rate.to_bits());
        assert_eq!(back.latency_ms, latency);
    }

    #[test]
    fn decode_short_is_none() {
        assert!(ConfigEntry::decode(&[1, 2, 3]).is_none());
    }

    #[test]
    fn disable_encodes_zero_rate() {
        let dat = ConfigEntry::disable(13).encode();
        assert_eq!(dat, [13, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
