//! Dual-channel demultiplexing session.
//!
//! A single thread polls both channels in turn, slicing each delivery into
//! cells and running them through validation and decode. Within one channel,
//! readings come out in arrival order; across channels no ordering is
//! guaranteed, cycles simply interleave.

use std::collections::{HashMap, HashSet};

use tracing::{debug, span, trace, warn, Level};

use crate::channel::{ByteChannel, EXTENDED_CELL_LEN, STANDARD_CELL_LEN};
use crate::config::ConfigEntry;
use crate::framing::{slice_frames, validate, FrameError};
use crate::reading::DecodedReading;
use crate::registry::{ChannelKind, Registry, SensorId};
use crate::{Error, Result};

/// Connection lifecycle of a [`Session`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// No configuration has been sent yet.
    Unconfigured,
    /// Configuration sent and input buffers cleared; no poll cycle has run.
    Configured,
    /// Polling at the caller's cadence; the standard channel is keeping up.
    Polling,
    /// The last cycle consumed a backlog; poll again without sleeping.
    Draining,
    /// A transport failure occurred. The caller must re-establish the link
    /// and call [`Session::configure`] again.
    Disconnected,
}

/// Decode-side state of one physical channel.
#[derive(Debug, Clone)]
pub struct ChannelState {
    kind: ChannelKind,
    cell_len: usize,
    /// Sensors the active configuration asks this channel to carry.
    expected: HashSet<SensorId>,
    total_decoded: u64,
    seq: HashMap<SensorId, u64>,
}

impl ChannelState {
    fn new(kind: ChannelKind, cell_len: usize) -> Self {
        ChannelState {
            kind,
            cell_len,
            expected: HashSet::new(),
            total_decoded: 0,
            seq: HashMap::new(),
        }
    }

    /// Total frames decoded on this channel. Survives disconnects.
    #[must_use]
    pub fn total_decoded(&self) -> u64 {
        self.total_decoded
    }

    /// Frames decoded for one sensor. Survives disconnects.
    #[must_use]
    pub fn decoded_count(&self, id: SensorId) -> u64 {
        self.seq.get(&id).copied().unwrap_or(0)
    }

    /// Whether the active configuration requested this sensor here.
    #[must_use]
    pub fn expects(&self, id: SensorId) -> bool {
        self.expected.contains(&id)
    }

    fn next_seq(&mut self, id: SensorId) -> u64 {
        let counter = self.seq.entry(id).or_insert(0);
        let seq = *counter;
        *counter += 1;
        seq
    }
}

/// Demultiplexes the two sensor channels into one stream of readings.
///
/// # Example
/// ```no_run
/// use telemux::channel::ByteChannel;
/// use telemux::config::ConfigEntry;
/// use telemux::registry::{Registry, ACCELEROMETER};
/// use telemux::session::Session;
///
/// fn run<S: ByteChannel, X: ByteChannel>(standard: S, extended: X) -> telemux::Result<()> {
///     let config = vec![ConfigEntry::new(ACCELEROMETER, 10.0, 0)];
///     let mut session = Session::new(standard, extended, Registry::default(), config);
///     session.configure()?;
///     loop {
///         for reading in session.poll()? {
///             println!("{}: {:?}", reading.sensor_id, reading.reading);
///         }
///     }
/// }
/// ```
pub struct Session<S, X> {
    standard: S,
    extended: X,
    registry: Registry,
    config: Vec<ConfigEntry>,
    state: LinkState,
    standard_state: ChannelState,
    extended_state: ChannelState,
}

impl<S, X> Session<S, X>
where
    S: ByteChannel,
    X: ByteChannel,
{
    #[must_use]
    pub fn new(standard: S, extended: X, registry: Registry, config: Vec<ConfigEntry>) -> Self {
        Session {
            standard,
            extended,
            registry,
            config,
            state: LinkState::Unconfigured,
            standard_state: ChannelState::new(ChannelKind::Standard, STANDARD_CELL_LEN),
            extended_state: ChannelState::new(ChannelKind::Extended, EXTENDED_CELL_LEN),
        }
    }

    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    #[must_use]
    pub fn standard_state(&self) -> &ChannelState {
        &self.standard_state
    }

    #[must_use]
    pub fn extended_state(&self) -> &ChannelState {
        &self.extended_state
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Give the channel endpoints back, e.g. to tear down the transport.
    #[must_use]
    pub fn into_channels(self) -> (S, X) {
        (self.standard, self.extended)
    }

    /// Direct access to the standard channel endpoint, e.g. to adjust
    /// transport settings between cycles.
    pub fn standard_channel_mut(&mut self) -> &mut S {
        &mut self.standard
    }

    /// Direct access to the extended channel endpoint.
    pub fn extended_channel_mut(&mut self) -> &mut X {
        &mut self.extended
    }

    /// Send the configuration command for every tracked sensor, one command
    /// per sensor in registry order, then discard any bytes buffered before
    /// the configuration took effect.
    ///
    /// Callable from any state; after a disconnect this is the re-entry
    /// point once the caller has re-established the link. Per-sensor
    /// counters are never reset.
    ///
    /// # Errors
    /// [`Error::Io`] on transport failure, leaving the session
    /// [`LinkState::Disconnected`].
    pub fn configure(&mut self) -> Result<()> {
        match self.try_configure() {
            Ok(()) => {
                self.state = LinkState::Configured;
                debug!("session configured");
                Ok(())
            }
            Err(err) => {
                self.state = LinkState::Disconnected;
                Err(err)
            }
        }
    }

    fn try_configure(&mut self) -> Result<()> {
        for entry in &self.config {
            if self.registry.lookup(entry.sensor_id).is_none() {
                warn!(
                    sensor_id = entry.sensor_id,
                    "configuration names a sensor the registry does not know, skipping"
                );
            }
        }

        self.standard_state.expected.clear();
        self.extended_state.expected.clear();

        for desc in self.registry.descriptors() {
            let Some(entry) = self.config.iter().find(|e| e.sensor_id == desc.id) else {
                continue;
            };
            self.standard.write(&entry.encode())?;
            debug!(
                sensor_id = desc.id,
                rate_hz = entry.sample_rate_hz,
                latency_ms = entry.latency_ms,
                "sent sensor configuration"
            );
            if entry.sample_rate_hz > 0.0 {
                match desc.channel {
                    ChannelKind::Standard => self.standard_state.expected.insert(desc.id),
                    ChannelKind::Extended => self.extended_state.expected.insert(desc.id),
                };
            }
        }

        self.standard.reset_input_buffer()?;
        self.extended.reset_input_buffer()?;
        Ok(())
    }

    /// Run one poll cycle over both channels and return the readings it
    /// produced, possibly none.
    ///
    /// The standard channel is read in whole-cell batches sized to what is
    /// already buffered; the extended channel is read one cell at a time.
    /// After the cycle, [`Session::state`] reports [`LinkState::Draining`]
    /// when a backlog was consumed and another immediate poll is worthwhile.
    ///
    /// # Errors
    /// [`Error::NotConfigured`] unless [`Session::configure`] has completed
    /// since the last disconnect; [`Error::Io`] on transport failure, leaving
    /// the session [`LinkState::Disconnected`] with counters intact.
    pub fn poll(&mut self) -> Result<Vec<DecodedReading>> {
        match self.state {
            LinkState::Unconfigured | LinkState::Disconnected => {
                return Err(Error::NotConfigured)
            }
            LinkState::Configured | LinkState::Polling | LinkState::Draining => {}
        }
        match self.try_poll() {
            Ok(readings) => Ok(readings),
            Err(err) => {
                warn!("transport failure, disconnecting");
                self.state = LinkState::Disconnected;
                Err(err)
            }
        }
    }

    fn try_poll(&mut self) -> Result<Vec<DecodedReading>> {
        let mut readings = Vec::new();

        let standard_cells = {
            let span = span!(Level::TRACE, "poll", channel = "standard");
            let _guard = span.enter();

            let avail = self.standard.bytes_available()?;
            // Read whole cells only; a partial cell left in the buffer would
            // desynchronize the next cycle.
            let take = avail - avail % self.standard_state.cell_len;
            let mut cells = 0;
            if take > 0 {
                if let Some(batch) = self.standard.read(take)? {
                    cells = batch.len() / self.standard_state.cell_len;
                    trace!(bytes = batch.len(), cells, "standard batch");
                    decode_batch(
                        &self.registry,
                        &mut self.standard_state,
                        &batch,
                        &mut readings,
                    );
                }
            }
            cells
        };

        {
            let span = span!(Level::TRACE, "poll", channel = "extended");
            let _guard = span.enter();

            // Extended frames are infrequent; one cell per cycle is enough
            // and keeps the blocking window short.
            if let Some(batch) = self.extended.read(EXTENDED_CELL_LEN)? {
                trace!(bytes = batch.len(), "extended batch");
                decode_batch(
                    &self.registry,
                    &mut self.extended_state,
                    &batch,
                    &mut readings,
                );
            }
        }

        let state = if standard_cells >= 2 {
            LinkState::Draining
        } else {
            LinkState::Polling
        };
        if state != self.state {
            trace!(?state, "link state");
        }
        self.state = state;

        Ok(readings)
    }
}

/// Validator→decoder loop over one delivery. The abandon-rest policy on size
/// mismatch is the early exit here, driven by the outcome variant rather
/// than error propagation.
fn decode_batch(
    registry: &Registry,
    state: &mut ChannelState,
    batch: &[u8],
    out: &mut Vec<DecodedReading>,
) {
    for cell in slice_frames(batch, state.cell_len) {
        match validate(cell, registry) {
            Ok((frame, desc)) => {
                if !state.expects(desc.id) {
                    trace!(
                        sensor_id = desc.id,
                        channel = ?state.kind,
                        "frame for a sensor the active configuration did not request"
                    );
                }
                let seq = state.next_seq(desc.id);
                state.total_decoded += 1;
                out.push(DecodedReading::new(&frame, desc, seq));
            }
            Err(FrameError::UnknownSensor { id }) => {
                debug!(sensor_id = id, "unknown sensor, skipping frame");
            }
            Err(err @ FrameError::SizeMismatch { .. }) => {
                warn!(%err, channel = ?state.kind, "abandoning rest of batch");
                break;
            }
        }
    }
}
