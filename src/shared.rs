//! State shared between the scheduled run step and other contexts.
//!
//! The data-ready interrupt and whoever requests a stop only ever touch a
//! [`SharedState`]. Everything else belongs to the driver and is only used
//! from [`Icm20602::run`](crate::Icm20602::run).

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use critical_section::Mutex;

use crate::state::State;

/// Edge seen on the data-ready line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataReady {
    pub timestamp_us: u64,
    /// Time since the edge before, if there was one
    pub interval_us: Option<u64>,
}

#[derive(Copy, Clone)]
struct Edges {
    last: Option<u64>,
    previous: Option<u64>,
}

pub struct SharedState {
    state: AtomicU8,
    pending: AtomicBool,
    edges: Mutex<Cell<Edges>>,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(State::Reset as u8),
            pending: AtomicBool::new(false),
            edges: Mutex::new(Cell::new(Edges {
                last: None,
                previous: None,
            })),
        }
    }

    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ask the driver to stop. Takes effect on its next run, never blocks.
    pub fn request_stop(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                match State::from_u8(value) {
                    State::Stopped | State::RequestStop => None,
                    _ => Some(State::RequestStop as u8),
                }
            });
    }

    /// Interrupt entry point. Records the edge and returns `true` when the
    /// driver should be run as soon as possible.
    pub fn data_ready(&self, timestamp_us: u64) -> bool {
        if self.state() != State::FifoRead {
            return false;
        }

        critical_section::with(|cs| {
            let cell = self.edges.borrow(cs);
            let edges = cell.get();

            cell.set(Edges {
                last: Some(timestamp_us),
                previous: edges.last,
            });
        });

        self.pending.store(true, Ordering::Release);

        true
    }

    /// Consume the pending data-ready edge, if any
    pub(crate) fn take_data_ready(&self) -> Option<DataReady> {
        if !self.pending.swap(false, Ordering::AcqRel) {
            return None;
        }

        critical_section::with(|cs| {
            let edges = self.edges.borrow(cs).get();

            edges.last.map(|timestamp_us| DataReady {
                timestamp_us,
                interval_us: edges.previous.map(|p| timestamp_us.saturating_sub(p)),
            })
        })
    }

    pub(crate) fn clear_data_ready(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Move from `from` to `to` unless another context changed the state in
    /// the meantime (a stop request wins).
    pub(crate) fn advance(&self, from: State, to: State) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
