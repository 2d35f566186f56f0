//! Published samples: timestamps, decimation, scaling and temperature

use icm20602_async::config::Config;
use icm20602_async::raw_data::{RawData, RawFrame};
use icm20602_async::shared::SharedState;
use icm20602_async::state::State;
use icm20602_async::{Icm20602, Rotation, Schedule};

use crate::common::{bring_up, create_driver, step, MockDevice, RecordingSink, INTERVAL_US};

const ONE_G: f32 = 9.80665;

/// Frames with a 2:1 gyro to accel pattern and the given temperature field
fn frames(count: usize, temperature: impl Fn(usize) -> i16) -> Vec<RawFrame> {
    (0..count)
        .map(|i| RawFrame {
            accel: RawData::new((i / 2) as i16, 0, 0),
            temperature: temperature(i),
            gyro: RawData::new(i as i16, 0, 0),
        })
        .collect()
}

#[test]
fn burst_is_back_filled_from_arrival() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    clock += INTERVAL_US;
    device.produce(8);

    assert_eq!(step(&mut driver, clock).unwrap(), Schedule::Unchanged);

    let gyro = sink.last_gyro();
    assert_eq!(gyro.len(), 8);
    for (i, sample) in gyro.iter().enumerate() {
        assert_eq!(sample.timestamp_us, clock - (7 - i as u64) * 125);
    }

    let accel = sink.last_accel();
    assert_eq!(accel.len(), 4);
    for (i, sample) in accel.iter().enumerate() {
        assert_eq!(sample.timestamp_us, clock - (3 - i as u64) * 250);
    }

    assert_eq!(sink.log().gyro_dt_us, Some(125));
    assert_eq!(sink.log().accel_dt_us, Some(250));
}

#[test]
fn accel_takes_one_value_per_repeat() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    clock += INTERVAL_US;
    device.produce(8);
    step(&mut driver, clock).unwrap();

    let accel = sink.last_accel();
    let per_lsb = ONE_G / 2048.0;

    for (i, sample) in accel.iter().enumerate() {
        assert_eq!(sample.x, (i as f32 * 10.0) * per_lsb);
        assert_eq!(sample.z, -2048.0 * per_lsb);
    }

    assert_eq!(driver.diagnostics().bad_transfer, 0);
}

#[test]
fn consecutive_bursts_stay_ordered() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    for _ in 0..3 {
        clock += INTERVAL_US;
        device.produce(8);
        step(&mut driver, clock).unwrap();
    }

    let log = sink.log();
    let timestamps: Vec<u64> = log.gyro.iter().flatten().map(|s| s.timestamp_us).collect();

    assert_eq!(timestamps.len(), 24);
    assert!(timestamps.windows(2).all(|pair| pair[1] - pair[0] == 125));
    assert_eq!(*timestamps.last().unwrap(), clock);
}

#[test]
fn samples_are_in_body_frame_and_rotation_is_metadata() {
    let device = MockDevice::new();
    let sink = RecordingSink::new();
    let shared = SharedState::new();
    let config = Config::default().with_rotation(Rotation::Yaw90);
    let mut driver = Icm20602::new(device.clone(), sink.clone(), &shared, config);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    device.push_frames(&[RawFrame {
        accel: RawData::new(0, 0, 2048),
        temperature: 0,
        gyro: RawData::new(164, 164, 164),
    }]);

    clock += INTERVAL_US;
    step(&mut driver, clock).unwrap();

    let gyro = sink.last_gyro();
    assert_eq!(gyro.len(), 1);
    assert!(gyro[0].x > 0.0);
    assert!(gyro[0].y < 0.0);
    assert!(gyro[0].z < 0.0);
    assert_eq!(gyro[0].x, -gyro[0].y);

    assert!(sink.log().rotations.iter().all(|r| *r == Rotation::Yaw90));
}

#[test]
fn broken_accel_pattern_is_reported() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    let mut burst = frames(8, |_| 0);
    for (i, frame) in burst.iter_mut().enumerate() {
        frame.accel = RawData::new(i as i16, 0, 0);
    }
    device.push_frames(&burst);

    clock += INTERVAL_US;
    step(&mut driver, clock).unwrap();

    assert_eq!(driver.diagnostics().bad_transfer, 1);
    assert_eq!(sink.last_gyro().len(), 8);
    assert_eq!(driver.state(), State::FifoRead);
}

#[test]
fn temperature_is_averaged_and_rate_limited() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    for _ in 0..5 {
        clock += INTERVAL_US;
        device.produce(8);
        step(&mut driver, clock).unwrap();
    }

    assert_eq!(sink.log().temperatures, vec![25.0]);

    clock += 1_000_000;
    device.push_frames(&frames(8, |i| if i % 2 == 0 { 500 } else { -500 }));
    step(&mut driver, clock).unwrap();

    assert_eq!(sink.log().temperatures, vec![25.0, 25.0]);
}

#[test]
fn corrupted_temperature_is_dropped() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    device.push_frames(&frames(8, |i| if i == 7 { 5000 } else { 0 }));

    clock += INTERVAL_US;
    step(&mut driver, clock).unwrap();

    assert!(sink.log().temperatures.is_empty());
    assert_eq!(driver.diagnostics().bad_transfer, 1);
    assert_eq!(sink.last_gyro().len(), 8);
}

#[test]
fn missing_temperature_is_dropped() {
    let shared = SharedState::new();
    let (mut driver, device, sink) = create_driver(&shared);
    let mut clock = 0;
    bring_up(&mut driver, &mut clock);

    device.push_frames(&frames(4, |_| i16::MIN));

    clock += INTERVAL_US;
    step(&mut driver, clock).unwrap();

    assert!(sink.log().temperatures.is_empty());
    assert_eq!(driver.diagnostics().bad_transfer, 1);
}
