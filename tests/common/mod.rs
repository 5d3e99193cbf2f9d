use std::collections::VecDeque;
use std::io;

use telemux::channel::{ByteChannel, EXTENDED_CELL_LEN, STANDARD_CELL_LEN};
use telemux::registry::{SensorId, ACCELEROMETER, AIR_QUALITY, TEMPERATURE};

/// In-memory channel endpoint scripted per test. Each queued `Vec` models
/// one transport delivery; a read never crosses delivery boundaries, the
/// same way the link hands over whatever one notification carried.
#[derive(Default)]
pub struct FakeChannel {
    pub deliveries: VecDeque<Vec<u8>>,
    pub written: Vec<Vec<u8>>,
    pub resets: usize,
    pub broken: bool,
}

impl FakeChannel {
    pub fn new() -> Self {
        FakeChannel::default()
    }

    pub fn deliver(&mut self, dat: Vec<u8>) {
        self.deliveries.push_back(dat);
    }
}

impl ByteChannel for FakeChannel {
    fn read(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        if self.broken {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        match self.deliveries.pop_front() {
            Some(mut batch) => {
                if batch.len() > max {
                    let rest = batch.split_off(max);
                    self.deliveries.push_front(rest);
                }
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        if self.broken {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        Ok(self.deliveries.front().map_or(0, Vec::len))
    }

    fn write(&mut self, dat: &[u8]) -> io::Result<()> {
        if self.broken {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.written.push(dat.to_vec());
        Ok(())
    }

    fn reset_input_buffer(&mut self) -> io::Result<()> {
        self.deliveries.clear();
        self.resets += 1;
        Ok(())
    }
}

/// Build one cell: header, payload, padding up to `cell_len`.
pub fn cell(id: SensorId, declared: u8, payload: &[u8], cell_len: usize) -> Vec<u8> {
    let mut dat = vec![id, declared];
    dat.extend_from_slice(payload);
    assert!(dat.len() <= cell_len, "payload does not fit the cell");
    dat.resize(cell_len, 0);
    dat
}

pub fn accel_cell(x: i16, y: i16, z: i16) -> Vec<u8> {
    let mut payload = Vec::new();
    for v in [x, y, z] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    cell(ACCELEROMETER, 7, &payload, STANDARD_CELL_LEN)
}

pub fn temp_cell(centi_deg: i16) -> Vec<u8> {
    cell(
        TEMPERATURE,
        5,
        &centi_deg.to_le_bytes(),
        STANDARD_CELL_LEN,
    )
}

pub fn air_quality_cell(eco2_and_status: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&10u16.to_le_bytes()); // iaq
    payload.extend_from_slice(&20u16.to_le_bytes()); // iaq_static
    payload.extend_from_slice(&1.5f32.to_le_bytes()); // bvoc
    payload.extend_from_slice(&eco2_and_status.to_le_bytes());
    payload.extend_from_slice(&2100i16.to_le_bytes()); // comp temperature
    payload.extend_from_slice(&5000u16.to_le_bytes()); // comp humidity
    payload.extend_from_slice(&777u16.to_le_bytes()); // gas resistance
    cell(AIR_QUALITY, 18, &payload, EXTENDED_CELL_LEN)
}
