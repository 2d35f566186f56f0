/// Event counters kept by the driver. Nothing in the driver reads them back.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    pub bad_register: u32,
    pub bad_transfer: u32,
    pub fifo_empty: u32,
    pub fifo_overflow: u32,
    pub fifo_reset: u32,
    /// Spacing of the last two data-ready edges
    pub drdy_interval_us: Option<u64>,
}
