//! Frame validation and batch slicing.
//!
//! A frame on the wire is `[sensor id][declared size][payload…]`, padded out
//! to the owning channel's fixed cell size. There is no sync marker and no
//! checksum; the only structural check available is that the declared size
//! agrees with the registry. That check carries a two-tier policy:
//!
//! * an unknown sensor id is forward-compatible noise, skip exactly that
//!   frame and keep scanning the batch;
//! * a size disagreement means the size byte itself cannot be trusted, and
//!   with it every subsequent frame boundary in the batch, so scanning must
//!   stop (abandon-rest).

use crate::registry::{Registry, SensorDescriptor, SensorId};

/// Byte length of the id + declared-size header carried by every frame.
pub const HEADER_LEN: usize = 2;

/// Borrowed view of one frame-sized cell as delivered by a channel.
///
/// Constructed per decode cycle and consumed immediately; never retained.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// Construct from the provided bytes, or `None` if there are not enough
    /// bytes for the header.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }
        Some(RawFrame { data })
    }

    #[must_use]
    pub fn sensor_id(&self) -> SensorId {
        self.data[0]
    }

    /// Payload size declared by the device in byte 1.
    #[must_use]
    pub fn declared_size(&self) -> u8 {
        self.data[1]
    }

    /// Everything after the header, including any cell padding.
    ///
    /// How many of these bytes are meaningful is decided by the descriptor,
    /// not by this view.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[HEADER_LEN..]
    }
}

/// Frame-level decode outcome. Not a [`crate::Error`]: both variants are
/// recoverable and consumed by the batch loop, never propagated.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Skip this frame and continue scanning the batch.
    #[error("unknown or unrequested sensor {id}")]
    UnknownSensor { id: SensorId },
    /// Abandon the rest of the batch.
    #[error("sensor {id} declared {declared} payload bytes, expected {expected}")]
    SizeMismatch {
        id: SensorId,
        declared: u8,
        expected: u8,
    },
}

impl FrameError {
    /// True when the remaining frames of the batch are untrustworthy.
    #[must_use]
    pub fn abandons_batch(&self) -> bool {
        matches!(self, FrameError::SizeMismatch { .. })
    }
}

/// Check one cell against the registry.
///
/// On success returns the frame view plus the descriptor to decode it with.
///
/// # Panics
/// If `dat` is shorter than [`HEADER_LEN`]. [`slice_frames`] never produces
/// such a slice.
pub fn validate<'a, 'r>(
    dat: &'a [u8],
    registry: &'r Registry,
) -> Result<(RawFrame<'a>, &'r SensorDescriptor), FrameError> {
    let frame = RawFrame::new(dat).expect("cell shorter than frame header");
    let id = frame.sensor_id();
    let Some(desc) = registry.lookup(id) else {
        return Err(FrameError::UnknownSensor { id });
    };
    if frame.declared_size() != desc.frame_size
        || frame.payload().len() < desc.frame_size as usize
    {
        return Err(FrameError::SizeMismatch {
            id,
            declared: frame.declared_size(),
            expected: desc.frame_size,
        });
    }
    Ok((frame, desc))
}

/// Cut a batch into frame-sized cells.
///
/// Yields exactly `batch.len() / cell_size` slices; trailing bytes that do
/// not fill a cell are dropped. The transport never splits a frame across
/// cell boundaries, so a following read realigns on its own.
///
/// # Panics
/// If `cell_size` is shorter than [`HEADER_LEN`].
pub fn slice_frames(batch: &[u8], cell_size: usize) -> impl Iterator<Item = &[u8]> {
    assert!(cell_size >= HEADER_LEN, "cell too small for frame header");
    batch.chunks_exact(cell_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ACCELEROMETER, TEMPERATURE};
    use test_case::test_case;

    fn cell(id: u8, declared: u8, payload: &[u8]) -> Vec<u8> {
        let mut dat = vec![id, declared];
        dat.extend_from_slice(payload);
        dat.resize(12, 0);
        dat
    }

    #[test]
    fn raw_frame_accessors() {
        let dat = cell(ACCELEROMETER, 7, &[1, 2, 3, 4, 5, 6]);
        let frame = RawFrame::new(&dat).unwrap();
        assert_eq!(frame.sensor_id(), ACCELEROMETER);
        assert_eq!(frame.declared_size(), 7);
        assert_eq!(frame.payload().len(), 10);
    }

    #[test]
    fn raw_frame_is_none_when_too_short() {
        assert!(RawFrame::new(&[4]).is_none());
        assert!(RawFrame::new(&[]).is_none());
    }

    #[test]
    fn validate_known_frame() {
        let registry = Registry::default();
        let dat = cell(TEMPERATURE, 5, &[0x10, 0x27, 0, 0, 0]);
        let (frame, desc) = validate(&dat, &registry).unwrap();
        assert_eq!(desc.id, TEMPERATURE);
        assert_eq!(frame.declared_size(), desc.frame_size);
    }

    #[test]
    fn validate_unknown_sensor_skips_one() {
        let registry = Registry::default();
        let dat = cell(99, 7, &[0; 7]);
        let err = validate(&dat, &registry).unwrap_err();
        assert_eq!(err, FrameError::UnknownSensor { id: 99 });
        assert!(!err.abandons_batch());
    }

    #[test]
    fn validate_size_mismatch_abandons() {
        let registry = Registry::default();
        let dat = cell(TEMPERATURE, 4, &[0; 5]);
        let err = validate(&dat, &registry).unwrap_err();
        assert_eq!(
            err,
            FrameError::SizeMismatch {
                id: TEMPERATURE,
                declared: 4,
                expected: 5
            }
        );
        assert!(err.abandons_batch());
    }

    #[test]
    fn validate_rejects_cell_too_small_for_payload() {
        // An extended-channel descriptor arriving on a 12-byte cell cannot
        // hold its 18 payload bytes even when the declared size agrees.
        let registry = Registry::default();
        let dat = cell(crate::registry::AIR_QUALITY, 18, &[0; 10]);
        let err = validate(&dat, &registry).unwrap_err();
        assert!(err.abandons_batch());
    }

    #[test_case(0, 0; "empty batch")]
    #[test_case(11, 0; "less than one cell")]
    #[test_case(12, 1; "exactly one cell")]
    #[test_case(37, 3; "residue dropped")]
    #[test_case(48, 4; "exact multiple")]
    fn slicer_counts(len: usize, expected: usize) {
        let batch = vec![0u8; len];
        assert_eq!(slice_frames(&batch, 12).count(), expected);
    }

    #[test]
    fn slicer_preserves_cell_contents() {
        let mut batch = Vec::new();
        for i in 0u8..3 {
            batch.extend_from_slice(&cell(i, 0, &[i; 10]));
        }
        batch.extend_from_slice(&[0xee; 5]);
        let cells: Vec<&[u8]> = slice_frames(&batch, 12).collect();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[1][0], 1);
        assert_eq!(cells[2][2], 2);
    }
}
