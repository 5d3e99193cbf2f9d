use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type SensorId = u8;

pub const ACCELEROMETER: SensorId = 4;
pub const GYROSCOPE: SensorId = 13;
pub const AIR_QUALITY: SensorId = 115;
pub const TEMPERATURE: SensorId = 128;
pub const BAROMETER: SensorId = 129;
pub const HUMIDITY: SensorId = 130;
/// Emitted by older firmware in place of [`AIR_QUALITY`].
pub const AIR_QUALITY_LEGACY: SensorId = 171;

/// Accelerometer raw counts to g.
pub const ACCEL_SCALE: f32 = 16.0 / 65536.0;
/// Gyroscope raw counts to degrees per second.
pub const GYRO_SCALE: f32 = 4000.0 / 65536.0;

/// Physical channel a sensor's frames arrive on.
///
/// The two channels are distinguished at the transport layer, not by any
/// in-band tag, and use different cell sizes. See [`crate::channel`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Small frames at high rates.
    Standard,
    /// Large composite frames at low rates.
    Extended,
}

/// Frame payload layout. All multi-byte fields are little-endian.
///
/// Layouts are not self-describing beyond total size, so the decoder is an
/// exhaustive match over this enum rather than a generic field walker.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayout {
    /// Three signed 16-bit fields, each multiplied by the descriptor scale.
    Vector3I16,
    /// One signed 16-bit field multiplied by the descriptor scale.
    ScalarI16,
    /// One unsigned byte multiplied by the descriptor scale.
    ScalarU8,
    /// Three raw bytes zero-padded to an unsigned 32-bit value, then divided
    /// by 100 (hundredths on the wire; the descriptor scale is not applied).
    ScalarU24,
    /// 18-byte air quality composite. Contains a combined field packing a
    /// 24-bit eCO₂ value and an 8-bit status in the upper byte.
    AirQuality,
    /// 10-byte air quality composite emitted by older firmware.
    AirQualityCompact,
}

impl FrameLayout {
    /// Number of decoded fields this layout produces.
    #[must_use]
    pub fn field_count(&self) -> usize {
        match self {
            FrameLayout::Vector3I16 => 3,
            FrameLayout::ScalarI16 | FrameLayout::ScalarU8 | FrameLayout::ScalarU24 => 1,
            FrameLayout::AirQuality => 8,
            FrameLayout::AirQualityCompact => 5,
        }
    }
}

/// Frame shape and decode rules for one sensor.
///
/// `frame_size` is the payload size in bytes, excluding the 2-byte header of
/// id and declared size. It must equal the size the device actually declares
/// for this id; a disagreement on the wire is the primary corruption signal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensorDescriptor {
    pub id: SensorId,
    pub name: String,
    pub frame_size: u8,
    pub scale: f32,
    pub layout: FrameLayout,
    pub channel: ChannelKind,
}

/// Table of known sensor frame shapes.
///
/// The default table matches the standard multi-sensor firmware. Frame sizes
/// vary across device revisions, so the active table is device-specific
/// configuration: load a revision's own table with [`Registry::with_file`] or
/// build one with [`Registry::from_descriptors`].
///
/// # Example
/// ```
/// use telemux::registry::{Registry, ACCELEROMETER};
///
/// let registry = Registry::default();
/// let desc = registry.lookup(ACCELEROMETER).unwrap();
/// assert_eq!(desc.frame_size, 7);
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    table: BTreeMap<SensorId, SensorDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::from_descriptors(builtin_table()).expect("built-in descriptor table is not valid")
    }
}

impl Registry {
    /// Build a registry from descriptors, rejecting duplicate sensor ids.
    ///
    /// # Errors
    /// [`Error::Registry`] if two descriptors share an id.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = SensorDescriptor>,
    {
        let mut table = BTreeMap::new();
        for desc in descriptors {
            let id = desc.id;
            if table.insert(id, desc).is_some() {
                return Err(Error::Registry(format!("duplicate sensor id {id}")));
            }
        }
        Ok(Registry { table })
    }

    /// Load a device-specific descriptor table from a JSON file, replacing
    /// the compiled-in one.
    ///
    /// # Errors
    /// [`Error::Io`] opening the file, [`Error::Registry`] if it does not
    /// contain a valid descriptor array.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let descriptors: Vec<SensorDescriptor> = serde_json::from_reader(File::open(path)?)
            .map_err(|err| Error::Registry(err.to_string()))?;
        Registry::from_descriptors(descriptors)
    }

    #[must_use]
    pub fn lookup(&self, id: SensorId) -> Option<&SensorDescriptor> {
        self.table.get(&id)
    }

    /// Descriptors in registry order, i.e. ascending sensor id.
    pub fn descriptors(&self) -> impl Iterator<Item = &SensorDescriptor> {
        self.table.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn builtin_table() -> Vec<SensorDescriptor> {
    vec![
        SensorDescriptor {
            id: ACCELEROMETER,
            name: "accelerometer corrected".into(),
            frame_size: 7,
            scale: ACCEL_SCALE,
            layout: FrameLayout::Vector3I16,
            channel: ChannelKind::Standard,
        },
        SensorDescriptor {
            id: GYROSCOPE,
            name: "gyroscope corrected".into(),
            frame_size: 7,
            scale: GYRO_SCALE,
            layout: FrameLayout::Vector3I16,
            channel: ChannelKind::Standard,
        },
        SensorDescriptor {
            id: AIR_QUALITY,
            name: "air quality".into(),
            frame_size: 18,
            scale: 1.0,
            layout: FrameLayout::AirQuality,
            channel: ChannelKind::Extended,
        },
        SensorDescriptor {
            id: TEMPERATURE,
            name: "temperature".into(),
            frame_size: 5,
            scale: 0.01,
            layout: FrameLayout::ScalarI16,
            channel: ChannelKind::Standard,
        },
        SensorDescriptor {
            id: BAROMETER,
            name: "barometric pressure".into(),
            frame_size: 4,
            scale: 1.0,
            layout: FrameLayout::ScalarU24,
            channel: ChannelKind::Standard,
        },
        SensorDescriptor {
            id: HUMIDITY,
            name: "relative humidity".into(),
            frame_size: 2,
            scale: 1.0,
            layout: FrameLayout::ScalarU8,
            channel: ChannelKind::Standard,
        },
        SensorDescriptor {
            id: AIR_QUALITY_LEGACY,
            name: "air quality (legacy)".into(),
            frame_size: 10,
            scale: 1.0,
            layout: FrameLayout::AirQualityCompact,
            channel: ChannelKind::Standard,
        },
    ]
}
