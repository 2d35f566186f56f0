//! Bus framing of the SPI and I2C transports

use core::convert::Infallible;

use embassy_futures::block_on;
use embedded_hal_async::i2c::{self, I2c};
use embedded_hal_async::spi::{self, SpiDevice};
use icm20602_async::register_map::RegisterMap;
use icm20602_async::transport::Transport;
use icm20602_async::{I2cTransport, SpiTransport};

/// Records every byte clocked out and answers with `response`
#[derive(Default)]
struct MockSpi {
    sent: Vec<Vec<u8>>,
    response: u8,
}

impl spi::ErrorType for MockSpi {
    type Error = Infallible;
}

impl SpiDevice for MockSpi {
    async fn transaction(
        &mut self,
        operations: &mut [spi::Operation<'_, u8>],
    ) -> Result<(), Infallible> {
        for operation in operations.iter_mut() {
            match operation {
                spi::Operation::Write(bytes) => self.sent.push(bytes.to_vec()),
                spi::Operation::TransferInPlace(bytes) => {
                    self.sent.push(bytes.to_vec());
                    bytes[1..].fill(self.response);
                }
                _ => panic!("unexpected SPI operation"),
            }
        }

        Ok(())
    }
}

#[derive(Default)]
struct MockI2c {
    writes: Vec<(u8, Vec<u8>)>,
    reads: Vec<(u8, usize)>,
}

impl i2c::ErrorType for MockI2c {
    type Error = Infallible;
}

impl I2c for MockI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Infallible> {
        for operation in operations.iter_mut() {
            match operation {
                i2c::Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                i2c::Operation::Read(bytes) => {
                    self.reads.push((address, bytes.len()));
                    bytes.fill(0x5A);
                }
            }
        }

        Ok(())
    }
}

#[test]
fn spi_read_sets_read_flag() {
    let mut transport = SpiTransport::new(MockSpi {
        response: 0x12,
        ..Default::default()
    });

    assert_eq!(
        block_on(transport.read_register(RegisterMap::WhoAmI)).unwrap(),
        0x12
    );

    let spi = transport.release();
    assert_eq!(spi.sent, vec![vec![0x75 | 0x80, 0x00]]);
}

#[test]
fn spi_write_clears_read_flag() {
    let mut transport = SpiTransport::new(MockSpi::default());

    block_on(transport.write_register(RegisterMap::PwrMgmt1, 0x80)).unwrap();

    let spi = transport.release();
    assert_eq!(spi.sent, vec![vec![0x6B, 0x80]]);
}

#[test]
fn spi_burst_is_one_transaction() {
    let mut transport = SpiTransport::new(MockSpi {
        response: 0xAA,
        ..Default::default()
    });

    let mut buffer = [0u8; 1 + 2 * 14];
    buffer[0] = 0x74 | 0x80;

    block_on(transport.transfer(&mut buffer)).unwrap();

    assert_eq!(buffer[0], 0xF4);
    assert!(buffer[1..].iter().all(|b| *b == 0xAA));

    let spi = transport.release();
    assert_eq!(spi.sent.len(), 1);
    assert_eq!(spi.sent[0].len(), buffer.len());
}

#[test]
fn i2c_uses_ad0_address() {
    let mut low = I2cTransport::new(MockI2c::default());
    let mut high = I2cTransport::new(MockI2c::default()).with_ad0_line_high();

    block_on(low.write_register(RegisterMap::UserCtrl, 0x40)).unwrap();
    block_on(high.write_register(RegisterMap::UserCtrl, 0x40)).unwrap();

    assert_eq!(low.release().writes, vec![(0x68, vec![0x6A, 0x40])]);
    assert_eq!(high.release().writes, vec![(0x69, vec![0x6A, 0x40])]);
}

#[test]
fn i2c_burst_reads_after_plain_register_address() {
    let mut transport = I2cTransport::new(MockI2c::default());

    let mut buffer = [0u8; 1 + 14];
    buffer[0] = 0x74 | 0x80;

    block_on(transport.transfer(&mut buffer)).unwrap();

    assert_eq!(buffer[0], 0xF4);
    assert!(buffer[1..].iter().all(|b| *b == 0x5A));

    let i2c = transport.release();
    assert_eq!(i2c.writes, vec![(0x68, vec![0x74])]);
    assert_eq!(i2c.reads, vec![(0x68, 14)]);
}

#[test]
fn i2c_read_register() {
    let mut transport = I2cTransport::new(MockI2c::default());

    assert_eq!(
        block_on(transport.read_register(RegisterMap::FifoCountH)).unwrap(),
        0x5A
    );

    let i2c = transport.release();
    assert_eq!(i2c.writes, vec![(0x68, vec![0x72])]);
    assert_eq!(i2c.reads, vec![(0x68, 1)]);
}
