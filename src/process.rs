//! Turning decoded FIFO frames into published samples.

use crate::config::{Config, FifoTiming};
use crate::fifo::MAX_SAMPLES;
use crate::raw_data::{RawData, RawFrame};
use crate::register_map::{AccelFullScaleRate, GyroFullScaleRate};
use crate::sink::{Rotation, Sample, SampleBatch, SensorKind, Sink};
use crate::timestamp::Timeline;

const ONE_G: f32 = 9.80665;
const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

const TEMPERATURE_SENSITIVITY: f32 = 326.8; // LSB/°C
const TEMPERATURE_OFFSET: f32 = 25.0; // °C
/// Raw temperature spread that can only come from a corrupted transfer
const TEMPERATURE_MAX_DEVIATION: f32 = 1000.0;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Scale {
    per_lsb: f32,
    range: f32,
}

impl Scale {
    fn accel(scale: AccelFullScaleRate) -> Self {
        Self {
            per_lsb: ONE_G / scale.sensitivity(),
            range: scale.range_g() * ONE_G,
        }
    }

    fn gyro(scale: GyroFullScaleRate) -> Self {
        Self {
            per_lsb: DEG_TO_RAD / scale.sensitivity(),
            range: scale.range_dps() * DEG_TO_RAD,
        }
    }

    fn sample(&self, timestamp_us: u64, raw: RawData) -> Sample {
        let raw = raw.to_body_frame();

        Sample {
            timestamp_us,
            x: raw.x() as f32 * self.per_lsb,
            y: raw.y() as f32 * self.per_lsb,
            z: raw.z() as f32 * self.per_lsb,
        }
    }
}

pub struct Processor {
    timing: FifoTiming,
    rotation: Rotation,
    accel: Scale,
    gyro: Scale,
    temperature_interval_us: u64,
    last_temperature_us: Option<u64>,
}

impl Processor {
    pub fn new(config: &Config) -> Self {
        Self {
            timing: config.fifo_timing(),
            rotation: config.rotation,
            accel: Scale::accel(config.accel_scale),
            gyro: Scale::gyro(config.gyro_scale),
            temperature_interval_us: config.temperature_interval_us,
            last_temperature_us: None,
        }
    }

    pub fn timing(&self) -> &FifoTiming {
        &self.timing
    }

    /// Use the full scale ranges the device actually reports
    pub fn set_scales(&mut self, accel: AccelFullScaleRate, gyro: GyroFullScaleRate) {
        self.accel = Scale::accel(accel);
        self.gyro = Scale::gyro(gyro);
    }

    /// Publish every frame's gyro reading, the newest stamped at `arrival_us`.
    pub fn process_gyro(&self, sink: &mut impl Sink, arrival_us: u64, frames: &[RawFrame]) {
        let frames = &frames[..frames.len().min(MAX_SAMPLES)];
        let mut samples = [Sample::default(); MAX_SAMPLES];

        let timeline = Timeline::new(arrival_us, self.timing.gyro_period_us, frames.len());

        for ((sample, frame), timestamp) in samples.iter_mut().zip(frames).zip(timeline) {
            *sample = self.gyro.sample(timestamp, frame.gyro);
        }

        sink.publish(&SampleBatch {
            kind: SensorKind::Gyroscope,
            rotation: self.rotation,
            dt_us: self.timing.gyro_period_us,
            range: self.gyro.range,
            samples: &samples[..frames.len()],
        });
    }

    /// Publish the accelerometer readings of frames that carry a fresh value.
    ///
    /// The accelerometer runs slower than the gyro, so the FIFO repeats each
    /// accel value over `decimation` frames. Returns `false` when the repeat
    /// pattern could not be located or the burst holds no fresh value.
    pub fn process_accel(
        &self,
        sink: &mut impl Sink,
        arrival_us: u64,
        frames: &[RawFrame],
    ) -> bool {
        let frames = &frames[..frames.len().min(MAX_SAMPLES)];
        let ratio = self.timing.decimation();
        let phase = accel_phase(frames, ratio);

        #[cfg(feature = "defmt")]
        if phase.is_none() {
            defmt::debug!("accel repeat pattern not found in {} frames", frames.len());
        }

        let first = phase.unwrap_or(ratio - 1);
        let count = frames.len().saturating_sub(first).div_ceil(ratio);

        let mut samples = [Sample::default(); MAX_SAMPLES];
        let timeline = Timeline::new(arrival_us, self.timing.accel_period_us, count);

        for ((sample, frame), timestamp) in samples
            .iter_mut()
            .zip(frames.iter().skip(first).step_by(ratio))
            .zip(timeline)
        {
            *sample = self.accel.sample(timestamp, frame.accel);
        }

        if count > 0 {
            sink.publish(&SampleBatch {
                kind: SensorKind::Accelerometer,
                rotation: self.rotation,
                dt_us: self.timing.accel_period_us,
                range: self.accel.range,
                samples: &samples[..count],
            });
        }

        phase.is_some() && count > 0
    }

    /// Publish the average die temperature, at most once per configured
    /// interval. Returns `false` only for a corrupted temperature field.
    pub fn process_temperature(
        &mut self,
        sink: &mut impl Sink,
        now_us: u64,
        frames: &[RawFrame],
    ) -> bool {
        if let Some(last) = self.last_temperature_us {
            if now_us.saturating_sub(last) < self.temperature_interval_us {
                return true;
            }
        }

        self.last_temperature_us = Some(now_us);

        let (sum, valid) = frames
            .iter()
            .filter(|frame| frame.temperature != i16::MIN)
            .fold((0.0f32, 0u32), |(sum, valid), frame| {
                (sum + frame.temperature as f32, valid + 1)
            });

        if valid == 0 {
            return false;
        }

        let average = sum / valid as f32;

        let corrupted = frames
            .iter()
            .filter(|frame| frame.temperature != i16::MIN)
            .any(|frame| {
                let deviation = frame.temperature as f32 - average;

                deviation > TEMPERATURE_MAX_DEVIATION || deviation < -TEMPERATURE_MAX_DEVIATION
            });

        let celsius = average / TEMPERATURE_SENSITIVITY + TEMPERATURE_OFFSET;

        if corrupted || !celsius.is_finite() {
            #[cfg(feature = "defmt")]
            defmt::debug!("temperature field corrupted");

            return false;
        }

        sink.temperature(celsius);

        true
    }
}

/// Index of the first frame holding a fresh accel value.
///
/// A fresh value is the last frame of a run of `ratio` equal readings. With
/// fewer than two full runs the pattern can't be checked and the default phase
/// is assumed.
fn accel_phase(frames: &[RawFrame], ratio: usize) -> Option<usize> {
    if ratio <= 1 {
        return Some(0);
    }

    if frames.len() < 2 * ratio {
        return Some(ratio - 1);
    }

    (0..ratio).rev().find(|&first| {
        (first..frames.len()).step_by(ratio).all(|fresh| {
            let start = fresh.saturating_sub(ratio - 1);

            frames[start..=fresh]
                .windows(2)
                .all(|pair| pair[0].accel == pair[1].accel)
        })
    })
}
