//! Common test utilities and mock implementations

#![allow(dead_code)]


pub use mock_device::{MockDevice, MockError, MockI2cBus, MockLine, RecordingSink};
pub use test_utils::{bring_up, create_driver, step, TestDriver, INTERVAL_US};
