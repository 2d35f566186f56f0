//! Bring-up and FIFO reads over the I2C transport

use embassy_futures::block_on;
use embedded_hal_async::i2c::I2c;
use icm20602_async::config::Config;
use icm20602_async::register_map::RegisterMap;
use icm20602_async::shared::SharedState;
use icm20602_async::state::State;
use icm20602_async::{I2cTransport, Icm20602, Schedule};

use crate::common::{bring_up, step, MockDevice, MockI2cBus, RecordingSink, INTERVAL_US};

#[test]
fn bring_up_keeps_i2c_interface_enabled() {
    let device = MockDevice::new();
    let sink = RecordingSink::new();
    let shared = SharedState::new();
    let transport = I2cTransport::new(MockI2cBus::new(device.clone()));
    let mut driver = Icm20602::new(transport, sink.clone(), &shared, Config::default());
    let mut clock = 0;

    assert_eq!(
        bring_up(&mut driver, &mut clock),
        Schedule::Interval(INTERVAL_US as u32)
    );
    assert_eq!(device.register(RegisterMap::I2cIf) & 0x40, 0);

    for _ in 0..12 {
        clock += INTERVAL_US;
        device.produce(8);

        assert_eq!(step(&mut driver, clock).unwrap(), Schedule::Unchanged);
    }

    assert_eq!(driver.state(), State::FifoRead);
    assert_eq!(sink.last_gyro().len(), 8);
    assert_eq!(device.burst_lengths().last(), Some(&(1 + 8 * 14)));
    assert_eq!(driver.diagnostics().bad_register, 0);
}

#[test]
fn disabled_i2c_interface_stops_acknowledging() {
    let device = MockDevice::new();
    let mut bus = MockI2cBus::new(device.clone());

    device.corrupt(RegisterMap::I2cIf, 0x40);

    // device reset
    assert!(block_on(bus.write(0x68, &[0x6B, 0x80])).is_err());
    assert_eq!(device.resets(), 0);
}
