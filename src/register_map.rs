#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterMap {
    Config = 0x1A,
    GyroConfig = 0x1B,
    AccelConfig = 0x1C,
    AccelConfig2 = 0x1D,
    FifoEn = 0x23,
    IntEnable = 0x38,
    FifoWmTh1 = 0x60,
    FifoWmTh2 = 0x61,
    UserCtrl = 0x6A,
    PwrMgmt1 = 0x6B,
    I2cIf = 0x70,
    FifoCountH = 0x72,
    FifoCountL = 0x73,
    FifoRW = 0x74,
    WhoAmI = 0x75,
}

pub const WHO_AM_I: u8 = 0x12;

/// Read flag for the SPI command byte
pub const DIR_READ: u8 = 0x80;

pub mod bits {
    pub const CONFIG_FIFO_MODE: u8 = 1 << 6;
    /// DLPF_CFG[2:0] = 7, gyro 8 kHz with DLPF bypassed
    pub const CONFIG_DLPF_CFG_BYPASS_DLPF_8KHZ: u8 = 0b111;

    pub const GYRO_CONFIG_FS_SEL: u8 = 0b11 << 3;
    pub const GYRO_CONFIG_FCHOICE_B_8KHZ_BYPASS_DLPF: u8 = 0b11;

    pub const ACCEL_CONFIG_FS_SEL: u8 = 0b11 << 3;
    pub const ACCEL_CONFIG2_FCHOICE_B_BYPASS_DLPF: u8 = 1 << 3;

    pub const FIFO_EN_GYRO: u8 = 1 << 4;
    pub const FIFO_EN_ACCEL: u8 = 1 << 3;

    pub const INT_ENABLE_DATA_RDY: u8 = 1;

    pub const USER_CTRL_FIFO_EN: u8 = 1 << 6;
    pub const USER_CTRL_FIFO_RST: u8 = 1 << 2;

    pub const PWR_MGMT_1_DEVICE_RESET: u8 = 1 << 7;
    pub const PWR_MGMT_1_SLEEP: u8 = 1 << 6;
    pub const PWR_MGMT_1_CLKSEL_0: u8 = 1;

    pub const I2C_IF_DIS: u8 = 1 << 6;

    /// Register contents right after a device reset
    pub const PWR_MGMT_1_RESET_VALUE: u8 = 0x41;
    pub const CONFIG_RESET_VALUE: u8 = 0x80;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroFullScaleRate {
    Dps250 = 0b00,
    Dps500 = 0b01,
    Dps1000 = 0b10,
    Dps2000 = 0b11,
}

impl GyroFullScaleRate {
    pub(crate) fn bits(self) -> u8 {
        (self as u8) << 3
    }

    pub(crate) fn from_register(value: u8) -> Self {
        match (value & bits::GYRO_CONFIG_FS_SEL) >> 3 {
            0b00 => Self::Dps250,
            0b01 => Self::Dps500,
            0b10 => Self::Dps1000,
            _ => Self::Dps2000,
        }
    }

    /// Sensitivity in LSB per degree per second
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::Dps250 => 131.0,
            Self::Dps500 => 65.5,
            Self::Dps1000 => 32.8,
            Self::Dps2000 => 16.4,
        }
    }

    pub fn range_dps(self) -> f32 {
        match self {
            Self::Dps250 => 250.0,
            Self::Dps500 => 500.0,
            Self::Dps1000 => 1000.0,
            Self::Dps2000 => 2000.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelFullScaleRate {
    G2 = 0b00,
    G4 = 0b01,
    G8 = 0b10,
    G16 = 0b11,
}

impl AccelFullScaleRate {
    pub(crate) fn bits(self) -> u8 {
        (self as u8) << 3
    }

    pub(crate) fn from_register(value: u8) -> Self {
        match (value & bits::ACCEL_CONFIG_FS_SEL) >> 3 {
            0b00 => Self::G2,
            0b01 => Self::G4,
            0b10 => Self::G8,
            _ => Self::G16,
        }
    }

    /// Sensitivity in LSB per g
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::G2 => 16384.0,
            Self::G4 => 8192.0,
            Self::G8 => 4096.0,
            Self::G16 => 2048.0,
        }
    }

    pub fn range_g(self) -> f32 {
        match self {
            Self::G2 => 2.0,
            Self::G4 => 4.0,
            Self::G8 => 8.0,
            Self::G16 => 16.0,
        }
    }
}

/// One entry of the configuration table: bits that must be set and bits that
/// must be clear in `register`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterConfig {
    pub register: RegisterMap,
    pub set_bits: u8,
    pub clear_bits: u8,
}

impl RegisterConfig {
    pub const fn new(register: RegisterMap, set_bits: u8, clear_bits: u8) -> Self {
        Self {
            register,
            set_bits,
            clear_bits,
        }
    }

    /// `true` if `value` has every set bit and none of the clear bits
    pub fn matches(&self, value: u8) -> bool {
        (value & self.set_bits) == self.set_bits && (value & self.clear_bits) == 0
    }

    /// Clear first, then set, so set bits take priority
    pub fn apply(&self, value: u8) -> u8 {
        (value & !self.clear_bits) | self.set_bits
    }
}

pub const REGISTER_TABLE_SIZE: usize = 11;

pub type RegisterTable = [RegisterConfig; REGISTER_TABLE_SIZE];

/// Build the ordered configuration table.
///
/// `fifo_watermark` is the FIFO watermark threshold in bytes, split over
/// FIFO_WM_TH1 (bits 9:8) and FIFO_WM_TH2 (bits 7:0). `disable_i2c` puts the
/// device in SPI-only mode; it must be `false` when talking over I2C.
pub fn register_table(
    accel_scale: AccelFullScaleRate,
    gyro_scale: GyroFullScaleRate,
    fifo_watermark: u16,
    disable_i2c: bool,
) -> RegisterTable {
    use bits::*;

    let i2c_if = if disable_i2c {
        RegisterConfig::new(RegisterMap::I2cIf, I2C_IF_DIS, 0)
    } else {
        RegisterConfig::new(RegisterMap::I2cIf, 0, I2C_IF_DIS)
    };

    [
        RegisterConfig::new(
            RegisterMap::PwrMgmt1,
            PWR_MGMT_1_CLKSEL_0,
            PWR_MGMT_1_DEVICE_RESET | PWR_MGMT_1_SLEEP,
        ),
        i2c_if,
        RegisterConfig::new(
            RegisterMap::AccelConfig,
            accel_scale.bits(),
            ACCEL_CONFIG_FS_SEL & !accel_scale.bits(),
        ),
        RegisterConfig::new(
            RegisterMap::AccelConfig2,
            ACCEL_CONFIG2_FCHOICE_B_BYPASS_DLPF,
            0,
        ),
        RegisterConfig::new(
            RegisterMap::GyroConfig,
            gyro_scale.bits(),
            (GYRO_CONFIG_FS_SEL & !gyro_scale.bits()) | GYRO_CONFIG_FCHOICE_B_8KHZ_BYPASS_DLPF,
        ),
        RegisterConfig::new(
            RegisterMap::Config,
            CONFIG_DLPF_CFG_BYPASS_DLPF_8KHZ,
            (1 << 7) | CONFIG_FIFO_MODE,
        ),
        RegisterConfig::new(
            RegisterMap::FifoWmTh1,
            ((fifo_watermark >> 8) & 0b11) as u8,
            0,
        ),
        RegisterConfig::new(RegisterMap::FifoWmTh2, (fifo_watermark & 0xFF) as u8, 0),
        RegisterConfig::new(RegisterMap::UserCtrl, USER_CTRL_FIFO_EN, 0),
        RegisterConfig::new(RegisterMap::FifoEn, FIFO_EN_GYRO | FIFO_EN_ACCEL, 0),
        RegisterConfig::new(RegisterMap::IntEnable, 0, INT_ENABLE_DATA_RDY),
    ]
}
