use crate::raw_data::RawFrame;
use crate::register_map::{RegisterMap, DIR_READ};
use crate::sink::SINK_MAX_SAMPLES;

/// Device FIFO size in bytes
pub const FIFO_SIZE: usize = 1008;

pub const FRAME_SIZE: usize = RawFrame::SIZE;

const fn min(a: usize, b: usize) -> usize {
    if a < b {
        a
    } else {
        b
    }
}

/// Largest number of frames pulled in one burst transfer
pub const MAX_SAMPLES: usize = min(FIFO_SIZE / FRAME_SIZE + 1, SINK_MAX_SAMPLES);

pub const TRANSFER_SIZE: usize = 1 + MAX_SAMPLES * FRAME_SIZE;

/// Command byte followed by raw frames, laid out exactly like the bus sees it.
pub struct TransferBuffer {
    bytes: [u8; TRANSFER_SIZE],
}

const _: () = assert!(core::mem::size_of::<TransferBuffer>() == 1 + MAX_SAMPLES * FRAME_SIZE);

impl TransferBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; TRANSFER_SIZE],
        }
    }

    /// Prepare a FIFO read of `samples` frames and return the slice to hand to
    /// the transport.
    pub fn prepare(&mut self, samples: usize) -> &mut [u8] {
        let len = 1 + min(samples, MAX_SAMPLES) * FRAME_SIZE;
        let transfer = &mut self.bytes[..len];

        transfer.fill(0);
        transfer[0] = RegisterMap::FifoRW as u8 | DIR_READ;

        transfer
    }

    /// First `samples` frames of the last transfer
    pub fn frames(&self, samples: usize) -> impl Iterator<Item = RawFrame> + '_ {
        let end = 1 + min(samples, MAX_SAMPLES) * FRAME_SIZE;

        self.bytes[1..end]
            .chunks_exact(FRAME_SIZE)
            .filter_map(RawFrame::parse)
    }

    /// Decode the first `samples` frames into `frames`, returning how many
    /// were written
    pub fn decode(&self, samples: usize, frames: &mut [RawFrame]) -> usize {
        frames
            .iter_mut()
            .zip(self.frames(samples))
            .map(|(slot, frame)| *slot = frame)
            .count()
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// What a FIFO byte count means for the next transfer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoCount {
    /// Not a single complete frame, the read fired too early
    Empty,
    /// More data than one burst can hold, the read cadence fell behind
    Overflow,
    Samples(usize),
}

impl FifoCount {
    pub fn classify(bytes: u16) -> Self {
        let bytes = bytes as usize;
        let samples = bytes / FRAME_SIZE;

        if bytes >= FIFO_SIZE || samples > MAX_SAMPLES {
            Self::Overflow
        } else if samples == 0 {
            Self::Empty
        } else {
            Self::Samples(samples)
        }
    }
}

/// Result of one FIFO read cycle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoRead {
    Empty,
    Overflow,
    Read { samples: usize, accel_valid: bool },
}
