#![no_std]

pub mod config;
pub mod diagnostics;
pub mod fifo;
pub mod process;
pub mod raw_data;
pub mod register_map;
pub mod shared;
pub mod sink;
pub mod state;
pub mod timestamp;
pub mod transport;

use config::Config;
use diagnostics::Diagnostics;
use fifo::{FifoCount, FifoRead, TransferBuffer, MAX_SAMPLES};
use process::Processor;
use raw_data::RawFrame;
use register_map::{bits, register_table, RegisterConfig, RegisterMap, RegisterTable};
use shared::SharedState;
use sink::Sink;
use state::{transition, Effect, Event, State, Transition};
use transport::Transport;

pub use config::FifoTiming;
pub use register_map::{AccelFullScaleRate, GyroFullScaleRate, WHO_AM_I};
pub use sink::{Rotation, Sample, SampleBatch, SensorKind};
pub use transport::{I2cTransport, SpiTransport};

/// Time the device needs after a reset before registers can be read
const RESET_SETTLE_US: u64 = 1_000;
/// Give up waiting for reset values after this long and reset again
const RESET_TIMEOUT_US: u64 = 100_000;
const RESET_POLL_US: u32 = 10_000;
const RESET_RETRY_US: u32 = 100_000;
/// Accel and gyro start-up time from sleep
const STARTUP_US: u32 = 35_000;
const CONFIGURE_RETRY_US: u32 = 10_000;
/// Backup run while waiting for data-ready edges
const WATCHDOG_US: u32 = 100_000;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Device never answered with the expected `WHO_AM_I` (last value read)
    InvalidDevice(u8),
    /// Device kept failing to reset or configure
    ResetRetriesExhausted,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}

/// When the scheduler should invoke [`Icm20602::run`] next. Each value
/// replaces whatever was registered before, except `Unchanged`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Schedule {
    Now,
    /// Once, after the given number of microseconds
    Delayed(u32),
    /// Periodically, every given number of microseconds
    Interval(u32),
    /// Keep the current registration
    Unchanged,
    /// Deregister, the driver is stopped
    Stop,
}

/// Host side of the device's interrupt pin.
///
/// When armed, the interrupt handler calls [`SharedState::data_ready`] and,
/// if that returns `true`, asks the scheduler to run the driver.
pub trait DataReadyLine {
    /// Arm edge delivery, `false` if no line is wired
    fn enable(&mut self) -> bool;

    fn disable(&mut self);
}

/// Timer-only operation
pub struct NoDataReadyLine;

impl DataReadyLine for NoDataReadyLine {
    fn enable(&mut self) -> bool {
        false
    }

    fn disable(&mut self) {}
}

pub struct Icm20602<'a, T, S, L = NoDataReadyLine> {
    transport: T,
    sink: S,
    line: L,
    shared: &'a SharedState,
    config: Config,
    registers: RegisterTable,
    buffer: TransferBuffer,
    processor: Processor,
    diagnostics: Diagnostics,
    checked_register: usize,
    reset_timestamp_us: u64,
    reset_attempts: u8,
    transfer_failures: u8,
    who_am_i_mismatch: Option<u8>,
    data_ready_enabled: bool,
}

impl<'a, T, S> Icm20602<'a, T, S>
where
    T: Transport,
    S: Sink,
{
    pub fn new(transport: T, sink: S, shared: &'a SharedState, config: Config) -> Self {
        let processor = Processor::new(&config);
        let registers = register_table(
            config.accel_scale,
            config.gyro_scale,
            processor.timing().watermark(),
            T::DISABLE_I2C,
        );

        Self {
            transport,
            sink,
            line: NoDataReadyLine,
            shared,
            config,
            registers,
            buffer: TransferBuffer::new(),
            processor,
            diagnostics: Diagnostics::default(),
            checked_register: 0,
            reset_timestamp_us: 0,
            reset_attempts: 0,
            transfer_failures: 0,
            who_am_i_mismatch: None,
            data_ready_enabled: false,
        }
    }
}

impl<'a, T, S, L> Icm20602<'a, T, S, L>
where
    T: Transport,
    S: Sink,
    L: DataReadyLine,
{
    /// Drive FIFO reads from the device interrupt instead of a fixed interval
    pub fn with_data_ready_line<L2: DataReadyLine>(self, line: L2) -> Icm20602<'a, T, S, L2> {
        Icm20602 {
            transport: self.transport,
            sink: self.sink,
            line,
            shared: self.shared,
            config: self.config,
            registers: self.registers,
            buffer: self.buffer,
            processor: self.processor,
            diagnostics: self.diagnostics,
            checked_register: self.checked_register,
            reset_timestamp_us: self.reset_timestamp_us,
            reset_attempts: self.reset_attempts,
            transfer_failures: self.transfer_failures,
            who_am_i_mismatch: self.who_am_i_mismatch,
            data_ready_enabled: self.data_ready_enabled,
        }
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fifo_timing(&self) -> &FifoTiming {
        self.processor.timing()
    }

    pub fn register_table(&self) -> &RegisterTable {
        &self.registers
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn release(self) -> (T, S, L) {
        (self.transport, self.sink, self.line)
    }

    /// Begin a fresh reset cycle. Returns how to schedule the first run.
    pub fn start(&mut self) -> Schedule {
        let state = self.shared.state();

        match state {
            State::Stopped => Schedule::Stop,
            State::RequestStop => Schedule::Now,
            _ => {
                self.reset_attempts = 0;
                self.transfer_failures = 0;
                self.disable_data_ready();

                if state != State::Reset {
                    self.shared.advance(state, State::Reset);
                }

                Schedule::Now
            }
        }
    }

    /// Request a stop. The next run disengages the data-ready line and
    /// returns [`Schedule::Stop`].
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// One scheduled step. Recoverable faults are handled internally; only
    /// running out of reset retries is returned as an error, after which the
    /// driver is stopped.
    pub async fn run(&mut self, now_us: u64) -> Result<Schedule, Error<T::Error>> {
        match self.shared.state() {
            State::Reset => self.run_reset(now_us).await,
            State::WaitForReset => Ok(self.run_wait_for_reset(now_us).await),
            State::Configure => Ok(self.run_configure().await),
            State::FifoRead => Ok(self.run_fifo_read(now_us).await),
            State::RequestStop => {
                self.disable_data_ready();
                self.apply(State::RequestStop, Event::Halted).await;

                #[cfg(feature = "defmt")]
                defmt::debug!("ICM20602 stopped");

                Ok(Schedule::Stop)
            }
            State::Stopped => Ok(Schedule::Stop),
        }
    }

    async fn run_reset(&mut self, now_us: u64) -> Result<Schedule, Error<T::Error>> {
        if self.reset_attempts >= self.config.max_reset_attempts {
            return Err(self.fail(State::Reset).await);
        }

        self.reset_attempts += 1;

        match self
            .register_write(RegisterMap::PwrMgmt1, bits::PWR_MGMT_1_DEVICE_RESET)
            .await
        {
            Ok(()) => {
                self.reset_timestamp_us = now_us;
                self.apply(State::Reset, Event::ResetIssued).await;

                Ok(Schedule::Delayed(RESET_SETTLE_US as u32))
            }
            Err(_) => {
                self.diagnostics.bad_transfer += 1;

                Ok(Schedule::Delayed(RESET_RETRY_US))
            }
        }
    }

    async fn run_wait_for_reset(&mut self, now_us: u64) -> Schedule {
        let elapsed = now_us.saturating_sub(self.reset_timestamp_us);

        if elapsed < RESET_SETTLE_US {
            return Schedule::Delayed((RESET_SETTLE_US - elapsed) as u32);
        }

        if let Ok(true) = self.probe_and_wake().await {
            self.apply(State::WaitForReset, Event::ResetComplete).await;

            return Schedule::Delayed(STARTUP_US);
        }

        if elapsed > RESET_TIMEOUT_US {
            #[cfg(feature = "defmt")]
            defmt::debug!("Reset failed, retrying");

            self.apply(State::WaitForReset, Event::ResetTimeout).await;

            Schedule::Delayed(RESET_RETRY_US)
        } else {
            Schedule::Delayed(RESET_POLL_US)
        }
    }

    async fn run_configure(&mut self) -> Schedule {
        if let Ok(true) = self.configure().await {
            match self.apply(State::Configure, Event::Configured).await {
                State::FifoRead if self.data_ready_enabled => Schedule::Delayed(WATCHDOG_US),
                State::FifoRead => Schedule::Interval(self.fifo_timing().interval_us),
                // FIFO could not be started or a stop was requested
                _ => Schedule::Now,
            }
        } else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Configure failed, resetting");

            self.apply(State::Configure, Event::ConfigureFailed).await;

            Schedule::Delayed(CONFIGURE_RETRY_US)
        }
    }

    async fn run_fifo_read(&mut self, now_us: u64) -> Schedule {
        let mut timestamp_us = now_us;

        if self.data_ready_enabled {
            if let Some(edge) = self.shared.take_data_ready() {
                if edge.interval_us.is_some() {
                    self.diagnostics.drdy_interval_us = edge.interval_us;
                }

                // an edge older than half a transfer belongs to a previous burst
                let max_age = self.fifo_timing().interval_us as u64 / 2;
                if edge.timestamp_us <= now_us && now_us - edge.timestamp_us <= max_age {
                    timestamp_us = edge.timestamp_us;
                }
            }
        }

        let entry = self.registers[self.checked_register];

        match self.register_check(&entry, true).await {
            Ok(true) => {
                self.checked_register = (self.checked_register + 1) % self.registers.len();
            }
            Ok(false) => {
                self.apply(State::FifoRead, Event::RegisterMismatch).await;

                return Schedule::Now;
            }
            Err(_) => return self.transfer_failed().await,
        }

        match self.fifo_read(timestamp_us).await {
            Ok(FifoRead::Read { accel_valid, .. }) => {
                self.transfer_failures = 0;

                if !accel_valid {
                    self.diagnostics.bad_transfer += 1;
                }
            }
            Ok(FifoRead::Empty) | Ok(FifoRead::Overflow) => {}
            Err(_) => return self.transfer_failed().await,
        }

        self.steady_schedule()
    }

    async fn transfer_failed(&mut self) -> Schedule {
        self.diagnostics.bad_transfer += 1;
        self.transfer_failures = self.transfer_failures.saturating_add(1);

        if self.transfer_failures >= self.config.max_transfer_failures {
            #[cfg(feature = "defmt")]
            defmt::warn!("{} consecutive transfer failures, resetting", self.transfer_failures);

            self.apply(State::FifoRead, Event::TransferFaults).await;

            return Schedule::Now;
        }

        self.steady_schedule()
    }

    fn steady_schedule(&self) -> Schedule {
        if self.data_ready_enabled {
            // push the watchdog back
            Schedule::Delayed(self.fifo_timing().interval_us * 2)
        } else {
            Schedule::Unchanged
        }
    }

    async fn fail(&mut self, state: State) -> Error<T::Error> {
        self.apply(state, Event::Fatal).await;

        #[cfg(feature = "defmt")]
        defmt::error!("ICM20602 gave up after {} resets", self.reset_attempts);

        match self.who_am_i_mismatch {
            Some(who_am_i) => Error::InvalidDevice(who_am_i),
            None => Error::ResetRetriesExhausted,
        }
    }

    /// Run the pure transition and carry out its effect. Returns the state the
    /// driver is in afterwards; a concurrent stop request takes precedence.
    async fn apply(&mut self, state: State, event: Event) -> State {
        let Some(Transition { next, effect }) = self.enter(state, event) else {
            return self.shared.state();
        };

        match effect {
            Effect::None => {}
            Effect::DisableDataReady => self.disable_data_ready(),
            Effect::StartFifo => {
                if self.start_fifo().await.is_err() {
                    self.diagnostics.bad_transfer += 1;

                    // FIFO may be left disabled, start over
                    if self.enter(next, Event::TransferFaults).is_some() {
                        self.disable_data_ready();
                    }

                    return self.shared.state();
                }
            }
        }

        next
    }

    /// Move the shared state along `transition`, `None` if another context
    /// changed it first.
    fn enter(&self, state: State, event: Event) -> Option<Transition> {
        let t = transition(state, event);

        if t.next != state && !self.shared.advance(state, t.next) {
            return None;
        }

        #[cfg(feature = "defmt")]
        if t.next != state {
            defmt::debug!("{} -> {} on {}", state, t.next, event);
        }

        Some(t)
    }

    async fn start_fifo(&mut self) -> Result<(), Error<T::Error>> {
        self.transfer_failures = 0;
        self.checked_register = 0;

        self.fifo_reset().await?;

        self.reset_attempts = 0;
        self.data_ready_enabled = self.line.enable();

        Ok(())
    }

    fn disable_data_ready(&mut self) {
        if self.data_ready_enabled {
            self.line.disable();
            self.data_ready_enabled = false;
        }

        self.shared.clear_data_ready();
    }

    /// Check the device answers with its reset values, then wake it up.
    async fn probe_and_wake(&mut self) -> Result<bool, Error<T::Error>> {
        let who_am_i = self.register_read(RegisterMap::WhoAmI).await?;

        if who_am_i != WHO_AM_I {
            #[cfg(feature = "defmt")]
            defmt::debug!("unexpected WHO_AM_I {=u8:#x}", who_am_i);

            self.who_am_i_mismatch = Some(who_am_i);

            return Ok(false);
        }

        self.who_am_i_mismatch = None;

        let reset_done = self.register_read(RegisterMap::PwrMgmt1).await?
            == bits::PWR_MGMT_1_RESET_VALUE
            && self.register_read(RegisterMap::Config).await? == bits::CONFIG_RESET_VALUE;

        if reset_done {
            self.register_write(RegisterMap::PwrMgmt1, bits::PWR_MGMT_1_CLKSEL_0)
                .await?;
        }

        Ok(reset_done)
    }

    pub async fn register_read(&mut self, register: RegisterMap) -> Result<u8, Error<T::Error>> {
        Ok(self.transport.read_register(register).await?)
    }

    pub async fn register_write(
        &mut self,
        register: RegisterMap,
        value: u8,
    ) -> Result<(), Error<T::Error>> {
        Ok(self.transport.write_register(register, value).await?)
    }

    /// Read-modify-write: clear, then set, written back only if it changed
    pub async fn register_set_and_clear_bits(
        &mut self,
        register: RegisterMap,
        set_bits: u8,
        clear_bits: u8,
    ) -> Result<(), Error<T::Error>> {
        let original = self.register_read(register).await?;
        let value = RegisterConfig::new(register, set_bits, clear_bits).apply(original);

        if value != original {
            self.register_write(register, value).await?;
        }

        Ok(())
    }

    /// Compare one register against its expected bits. With `notify` a
    /// mismatch is counted as a bad register event.
    pub async fn register_check(
        &mut self,
        entry: &RegisterConfig,
        notify: bool,
    ) -> Result<bool, Error<T::Error>> {
        let value = self.register_read(entry.register).await?;

        if entry.matches(value) {
            return Ok(true);
        }

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "{}: {=u8:#x} (set {=u8:#x}, clear {=u8:#x})",
            entry.register,
            value,
            entry.set_bits,
            entry.clear_bits
        );

        if notify {
            self.diagnostics.bad_register += 1;
        }

        Ok(false)
    }

    /// Apply every table entry in order, then verify all of them
    pub async fn configure(&mut self) -> Result<bool, Error<T::Error>> {
        let registers = self.registers;

        for entry in registers.iter() {
            self.register_set_and_clear_bits(entry.register, entry.set_bits, entry.clear_bits)
                .await?;
        }

        let mut success = true;

        for entry in registers.iter() {
            if !self.register_check(entry, false).await? {
                success = false;
            }
        }

        let accel = AccelFullScaleRate::from_register(
            self.register_read(RegisterMap::AccelConfig).await?,
        );
        let gyro =
            GyroFullScaleRate::from_register(self.register_read(RegisterMap::GyroConfig).await?);

        self.processor.set_scales(accel, gyro);

        Ok(success)
    }

    /// Bytes currently buffered in the device FIFO
    pub async fn fifo_read_count(&mut self) -> Result<u16, Error<T::Error>> {
        let high = self.register_read(RegisterMap::FifoCountH).await?;
        let low = self.register_read(RegisterMap::FifoCountL).await?;

        Ok(u16::from_be_bytes([high, low]))
    }

    /// Drain the FIFO with one burst transfer and publish the samples, the
    /// newest stamped `timestamp_us`.
    pub async fn fifo_read(&mut self, timestamp_us: u64) -> Result<FifoRead, Error<T::Error>> {
        let count = self.fifo_read_count().await?;

        let samples = match FifoCount::classify(count) {
            FifoCount::Empty => {
                self.diagnostics.fifo_empty += 1;

                return Ok(FifoRead::Empty);
            }
            FifoCount::Overflow => {
                #[cfg(feature = "defmt")]
                defmt::debug!("FIFO overflow, {} bytes", count);

                self.diagnostics.fifo_overflow += 1;
                self.fifo_reset().await?;

                return Ok(FifoRead::Overflow);
            }
            FifoCount::Samples(samples) => samples,
        };

        let transfer = self.buffer.prepare(samples);
        self.transport.transfer(transfer).await?;

        let mut frames = [RawFrame::default(); MAX_SAMPLES];
        let samples = self.buffer.decode(samples, &mut frames);
        let frames = &frames[..samples];

        let processor = &mut self.processor;
        let sink = &mut self.sink;

        processor.process_gyro(sink, timestamp_us, frames);
        let accel_valid = processor.process_accel(sink, timestamp_us, frames);

        if !processor.process_temperature(sink, timestamp_us, frames) {
            self.diagnostics.bad_transfer += 1;
        }

        Ok(FifoRead::Read {
            samples,
            accel_valid,
        })
    }

    /// Flush the device FIFO and forget any pending data-ready edge
    pub async fn fifo_reset(&mut self) -> Result<(), Error<T::Error>> {
        self.diagnostics.fifo_reset += 1;

        self.register_write(RegisterMap::FifoEn, 0).await?;
        self.register_set_and_clear_bits(
            RegisterMap::UserCtrl,
            bits::USER_CTRL_FIFO_RST,
            bits::USER_CTRL_FIFO_EN,
        )
        .await?;

        self.shared.clear_data_ready();

        let registers = self.registers;

        for entry in registers
            .iter()
            .filter(|r| matches!(r.register, RegisterMap::FifoEn | RegisterMap::UserCtrl))
        {
            self.register_set_and_clear_bits(entry.register, entry.set_bits, entry.clear_bits)
                .await?;
        }

        Ok(())
    }
}
