//! Byte-stream channel abstraction.
//!
//! The core consumes two of these, one per physical channel; it never
//! implements the transport itself. Implementations wrap whatever link the
//! platform provides, honoring the timeout guidance below.

use std::io;
use std::time::Duration;

/// On-wire cell size of the standard channel. Every frame on this channel
/// occupies exactly one cell, padded past the declared payload if needed.
pub const STANDARD_CELL_LEN: usize = 12;

/// On-wire cell size of the extended channel.
pub const EXTENDED_CELL_LEN: usize = 20;

/// Input buffer sizing hint for transport implementations, in cells. The
/// device can burst at high sample rates between polls.
pub const INPUT_BUFFER_CELLS: usize = 400;

/// Recommended read timeout for the standard channel.
pub const STANDARD_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Recommended read timeout for the extended channel.
///
/// Must stay short: the transport buffers this channel in a circular buffer
/// that silently overwrites unread bytes, so time spent blocked here loses
/// data rather than merely adding latency.
pub const EXTENDED_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// One byte-oriented channel endpoint.
///
/// All operations are best-effort against an unreliable link; only genuine
/// transport failures should surface as `Err`, and any such error drives the
/// owning session to [Disconnected](crate::session::LinkState::Disconnected).
pub trait ByteChannel {
    /// Read up to `max` buffered bytes, blocking at most the channel's
    /// internal timeout. Returns fewer bytes than requested if the timeout
    /// elapses first, and `None` when no data arrived this cycle; neither is
    /// an error.
    fn read(&mut self, max: usize) -> io::Result<Option<Vec<u8>>>;

    /// Best-effort count of buffered-but-unread bytes.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Fire-and-forget write; no acknowledgment.
    fn write(&mut self, dat: &[u8]) -> io::Result<()>;

    /// Discard currently buffered unread bytes.
    fn reset_input_buffer(&mut self) -> io::Result<()>;
}
