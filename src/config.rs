use crate::fifo::{FRAME_SIZE, MAX_SAMPLES};
use crate::register_map::{AccelFullScaleRate, GyroFullScaleRate};
use crate::sink::Rotation;

/// Gyro output rate with the DLPF bypassed, fixed by the register table
const GYRO_RATE_HZ: u32 = 8000;
/// Accelerometer output rate with the DLPF bypassed
const ACCEL_RATE_HZ: u32 = 4000;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub rotation: Rotation,
    /// Rate at which the FIFO is drained, limited to 250..=2000 Hz
    pub sample_rate_hz: u32,
    pub accel_scale: AccelFullScaleRate,
    pub gyro_scale: GyroFullScaleRate,
    /// Minimum spacing of temperature updates
    pub temperature_interval_us: u64,
    /// Consecutive failed FIFO cycles tolerated before a full reset
    pub max_transfer_failures: u8,
    /// Resets tolerated without reaching steady state before giving up
    pub max_reset_attempts: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rotation: Rotation::None,
            sample_rate_hz: 1000,
            accel_scale: AccelFullScaleRate::G16,
            gyro_scale: GyroFullScaleRate::Dps2000,
            temperature_interval_us: 1_000_000,
            max_transfer_failures: 3,
            max_reset_attempts: 5,
        }
    }
}

impl Config {
    pub fn with_rotation(self, rotation: Rotation) -> Self {
        Self { rotation, ..self }
    }

    pub fn with_sample_rate(self, sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            ..self
        }
    }

    /// Transfer interval rounded down to a multiple of 250 µs, then snapped to
    /// a whole number of gyro samples.
    pub fn fifo_timing(&self) -> FifoTiming {
        let sample_rate = match self.sample_rate_hz {
            0 => 1000,
            rate => rate.clamp(250, 2000),
        };

        let interval_us = ((1_000_000 / sample_rate) / 250 * 250).max(250);
        let gyro_period = period_us(GYRO_RATE_HZ);
        let gyro_samples = (interval_us / gyro_period).clamp(1, MAX_SAMPLES as u32);

        FifoTiming::new(GYRO_RATE_HZ, ACCEL_RATE_HZ, gyro_samples * gyro_period)
    }
}

fn period_us(rate_hz: u32) -> u32 {
    (1_000_000 / rate_hz.max(1)).max(1)
}

/// Derived per-transfer sample counts and periods
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FifoTiming {
    pub interval_us: u32,
    pub gyro_period_us: u32,
    pub accel_period_us: u32,
    pub gyro_samples: u8,
    pub accel_samples: u8,
}

impl FifoTiming {
    pub fn new(gyro_rate_hz: u32, accel_rate_hz: u32, interval_us: u32) -> Self {
        let gyro_period_us = period_us(gyro_rate_hz);
        let accel_period_us = period_us(accel_rate_hz);

        Self {
            interval_us,
            gyro_period_us,
            accel_period_us,
            gyro_samples: (interval_us / gyro_period_us).min(MAX_SAMPLES as u32) as u8,
            accel_samples: (interval_us / accel_period_us).min(MAX_SAMPLES as u32) as u8,
        }
    }

    /// Gyro frames per fresh accelerometer value
    pub fn decimation(&self) -> usize {
        (self.accel_period_us / self.gyro_period_us).max(1) as usize
    }

    /// FIFO watermark in bytes
    pub fn watermark(&self) -> u16 {
        self.gyro_samples as u16 * FRAME_SIZE as u16
    }
}
