//! Bus access for the driver.
//!
//! The driver only needs three primitives: single register read, single
//! register write and one in-place burst transfer whose first byte is the
//! command. [`SpiTransport`] and [`I2cTransport`] provide them on top of
//! `embedded-hal-async`, tests provide a simulated device.

use embedded_hal_async::i2c::{I2c, SevenBitAddress};
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::register_map::{RegisterMap, DIR_READ};

const I2C_ADDR_AD0_LOW: SevenBitAddress = 0b1101000;
const I2C_ADDR_AD0_HIGH: SevenBitAddress = 0b1101001;

#[allow(async_fn_in_trait)]
pub trait Transport {
    type Error;

    /// Whether configuration may switch the device to SPI-only mode. Must stay
    /// `false` for any bus that reaches the device over I2C.
    const DISABLE_I2C: bool = false;

    async fn read_register(&mut self, register: RegisterMap) -> Result<u8, Self::Error>;

    async fn write_register(&mut self, register: RegisterMap, value: u8)
        -> Result<(), Self::Error>;

    /// Burst transfer in place. `buffer[0]` holds the command byte, the rest
    /// is overwritten with data clocked out of the device.
    async fn transfer(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

pub struct SpiTransport<SPI> {
    spi: SPI,
}

impl<SPI> SpiTransport<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Transport for SpiTransport<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    const DISABLE_I2C: bool = true;

    async fn read_register(&mut self, register: RegisterMap) -> Result<u8, Self::Error> {
        let mut buf = [register as u8 | DIR_READ, 0];

        self.spi.transfer_in_place(&mut buf).await?;

        Ok(buf[1])
    }

    async fn write_register(
        &mut self,
        register: RegisterMap,
        value: u8,
    ) -> Result<(), Self::Error> {
        self.spi.write(&[register as u8 & !DIR_READ, value]).await
    }

    async fn transfer(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.spi
            .transaction(&mut [Operation::TransferInPlace(buffer)])
            .await
    }
}

pub struct I2cTransport<I2C> {
    i2c: I2C,
    address: SevenBitAddress,
}

impl<I2C> I2cTransport<I2C> {
    /// Use driver with default I2C address (AD0 line low)
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: I2C_ADDR_AD0_LOW,
        }
    }

    /// AD0 line is high, adjust device I2C address accordingly
    pub fn with_ad0_line_high(self) -> Self {
        Self {
            i2c: self.i2c,
            address: I2C_ADDR_AD0_HIGH,
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Transport for I2cTransport<I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    async fn read_register(&mut self, register: RegisterMap) -> Result<u8, Self::Error> {
        let mut buf = [0; 1];

        self.i2c
            .write_read(self.address, &[register as u8], &mut buf)
            .await?;

        Ok(buf[0])
    }

    async fn write_register(
        &mut self,
        register: RegisterMap,
        value: u8,
    ) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[register as u8, value]).await
    }

    async fn transfer(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let Some((command, data)) = buffer.split_first_mut() else {
            return Ok(());
        };

        self.i2c
            .write_read(self.address, &[*command & !DIR_READ], data)
            .await
    }
}
