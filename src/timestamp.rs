//! Per-sample capture times.
//!
//! The bus delivers a burst with a single completion time and nothing per
//! frame. Assuming a stable output rate, the `n` samples of a burst are spread
//! backwards from the arrival time at the nominal period, so the newest sample
//! lands exactly on the arrival.

/// Timestamp of sample `index` (oldest first) out of `count`
pub fn back_fill(arrival_us: u64, period_us: u32, count: usize, index: usize) -> u64 {
    let age = count.saturating_sub(index + 1) as u64;

    arrival_us.saturating_sub(age * period_us as u64)
}

/// Evenly spaced timestamps of one burst, oldest first
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeline {
    arrival_us: u64,
    period_us: u32,
    count: usize,
    index: usize,
}

impl Timeline {
    pub fn new(arrival_us: u64, period_us: u32, count: usize) -> Self {
        Self {
            arrival_us,
            period_us,
            count,
            index: 0,
        }
    }
}

impl Iterator for Timeline {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.index >= self.count {
            return None;
        }

        let timestamp = back_fill(self.arrival_us, self.period_us, self.count, self.index);
        self.index += 1;

        Some(timestamp)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;

        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Timeline {}
