#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawData {
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) z: i16,
}

impl RawData {
    pub const SIZE: usize = 6;

    pub fn x(&self) -> i16 {
        self.x
    }

    pub fn y(&self) -> i16 {
        self.y
    }

    pub fn z(&self) -> i16 {
        self.z
    }

    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Sensor frame is +x forward, +y left, +z up. Flip y and z to get a right
    /// handed frame with z down.
    pub fn to_body_frame(self) -> Self {
        Self {
            x: self.x,
            y: negate(self.y),
            z: negate(self.z),
        }
    }
}

fn negate(value: i16) -> i16 {
    if value == i16::MIN {
        i16::MAX
    } else {
        -value
    }
}

impl From<[u8; Self::SIZE]> for RawData {
    fn from(value: [u8; Self::SIZE]) -> Self {
        Self {
            x: i16::from_be_bytes([value[0], value[1]]),
            y: i16::from_be_bytes([value[2], value[3]]),
            z: i16::from_be_bytes([value[4], value[5]]),
        }
    }
}

/// One FIFO record: accel, temperature and gyro, big endian.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    pub accel: RawData,
    pub temperature: i16,
    pub gyro: RawData,
}

impl RawFrame {
    pub const SIZE: usize = 14;

    /// Decode a frame from the front of `bytes`, which must hold at least
    /// [`RawFrame::SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; Self::SIZE] = bytes.get(..Self::SIZE)?.try_into().ok()?;

        let mut accel = [0; RawData::SIZE];
        let mut gyro = [0; RawData::SIZE];

        accel.copy_from_slice(&bytes[0..6]);
        gyro.copy_from_slice(&bytes[8..14]);

        Some(Self {
            accel: accel.into(),
            temperature: i16::from_be_bytes([bytes[6], bytes[7]]),
            gyro: gyro.into(),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];

        for (chunk, value) in bytes.chunks_exact_mut(2).zip([
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.temperature,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
        ]) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }

        bytes
    }
}
