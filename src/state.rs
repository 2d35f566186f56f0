//! Driver lifecycle.
//!
//! [`transition`] is pure: the driver feeds it what just happened and performs
//! the returned [`Effect`] itself, so every path can be tested without a bus.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    Reset = 0,
    WaitForReset = 1,
    Configure = 2,
    FifoRead = 3,
    RequestStop = 4,
    Stopped = 5,
}

impl State {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Reset,
            1 => Self::WaitForReset,
            2 => Self::Configure,
            3 => Self::FifoRead,
            4 => Self::RequestStop,
            _ => Self::Stopped,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Device reset command written
    ResetIssued,
    /// Settle delay elapsed and the device answered with its reset values
    ResetComplete,
    /// Settle window ran out without a valid identity
    ResetTimeout,
    Configured,
    ConfigureFailed,
    /// Round robin check found a reverted register
    RegisterMismatch,
    /// Too many consecutive bus failures in steady state
    TransferFaults,
    StopRequested,
    /// Data-ready delivery has been disengaged
    Halted,
    /// Retry ceiling reached
    Fatal,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    None,
    /// Reset the FIFO and arm data-ready delivery
    StartFifo,
    DisableDataReady,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub next: State,
    pub effect: Effect,
}

impl Transition {
    const fn to(next: State) -> Self {
        Self {
            next,
            effect: Effect::None,
        }
    }

    const fn with(next: State, effect: Effect) -> Self {
        Self { next, effect }
    }
}

pub fn transition(state: State, event: Event) -> Transition {
    use Event::*;
    use State::*;

    match (state, event) {
        (Stopped, _) => Transition::to(Stopped),

        (_, Fatal) => Transition::with(Stopped, Effect::DisableDataReady),
        (RequestStop, Halted) => Transition::to(Stopped),
        (RequestStop, _) => Transition::to(RequestStop),
        (_, StopRequested) => Transition::to(RequestStop),

        (Reset, ResetIssued) => Transition::to(WaitForReset),
        (WaitForReset, ResetComplete) => Transition::to(Configure),
        (WaitForReset, ResetTimeout) => Transition::to(Reset),
        (Configure, Configured) => Transition::with(FifoRead, Effect::StartFifo),
        (Configure, ConfigureFailed) => Transition::to(Reset),
        (FifoRead, RegisterMismatch) | (FifoRead, TransferFaults) => {
            Transition::with(Reset, Effect::DisableDataReady)
        }

        (state, _) => Transition::to(state),
    }
}
