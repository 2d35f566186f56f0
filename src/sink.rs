//! Output side of the driver: processed samples and the trait that receives
//! them.

/// Most samples a sink accepts in one batch
pub const SINK_MAX_SAMPLES: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

/// A single measurement in m/s² (accelerometer) or rad/s (gyroscope), body
/// frame with x forward, y right, z down.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub timestamp_us: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleBatch<'a> {
    pub kind: SensorKind,
    /// Mounting orientation of the board, applied by the consumer
    pub rotation: Rotation,
    /// Nominal spacing between samples
    pub dt_us: u32,
    /// Full-scale range in the same units as the samples
    pub range: f32,
    pub samples: &'a [Sample],
}

pub trait Sink {
    fn publish(&mut self, batch: &SampleBatch<'_>);

    fn temperature(&mut self, celsius: f32);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn publish(&mut self, batch: &SampleBatch<'_>) {
        (**self).publish(batch)
    }

    fn temperature(&mut self, celsius: f32) {
        (**self).temperature(celsius)
    }
}

/// Sensor mounting orientation relative to the vehicle body
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    None,
    Yaw45,
    Yaw90,
    Yaw135,
    Yaw180,
    Yaw225,
    Yaw270,
    Yaw315,
    Roll180,
    Roll180Yaw90,
    Roll180Yaw270,
    Pitch180,
}

impl Rotation {
    pub fn apply(self, x: f32, y: f32, z: f32) -> (f32, f32, f32) {
        const H: f32 = core::f32::consts::FRAC_1_SQRT_2;

        match self {
            Self::None => (x, y, z),
            Self::Yaw45 => (H * (x - y), H * (x + y), z),
            Self::Yaw90 => (-y, x, z),
            Self::Yaw135 => (-H * (x + y), H * (x - y), z),
            Self::Yaw180 => (-x, -y, z),
            Self::Yaw225 => (H * (y - x), -H * (x + y), z),
            Self::Yaw270 => (y, -x, z),
            Self::Yaw315 => (H * (x + y), H * (y - x), z),
            Self::Roll180 => (x, -y, -z),
            Self::Roll180Yaw90 => (y, x, -z),
            Self::Roll180Yaw270 => (-y, -x, -z),
            Self::Pitch180 => (-x, y, -z),
        }
    }
}
