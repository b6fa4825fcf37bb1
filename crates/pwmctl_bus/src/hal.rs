use std::{thread, time::Duration};

use embedded_hal::{delay::DelayNs, i2c};

use crate::{
    error::BusError,
    transport::{check_address, BusTransport},
};

///Binds any `embedded-hal` I2C bus to one slave address.
///
/// `embedded-hal` reports failed transfers as errors rather than byte counts, so a successful call
/// always counts as a complete transfer.
pub struct HalBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> HalBus<I2C>
where
    I2C: i2c::I2c,
{
    pub fn new(i2c: I2C, address: u8) -> Result<Self, BusError> {
        let address = check_address(address)?;
        Ok(Self { i2c, address })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn into_inner(self) -> I2C {
        self.i2c
    }
}

impl<I2C> BusTransport for HalBus<I2C>
where
    I2C: i2c::I2c,
{
    fn write_raw(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        self.i2c
            .write(self.address, bytes)
            .map(|_| bytes.len())
            .map_err(BusError::io)
    }

    fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        self.i2c
            .read(self.address, buffer)
            .map(|_| buffer.len())
            .map_err(BusError::io)
    }

    //a single repeated-start transaction; the bus either completes both phases or errors
    fn write_then_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusError> {
        let mut scratch = vec![0u8; buffer.len()];
        self.i2c
            .write_read(self.address, bytes, &mut scratch)
            .map_err(BusError::io)?;
        buffer.copy_from_slice(&scratch);
        Ok(())
    }
}

///`DelayNs` that parks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingDelay;

impl DelayNs for BlockingDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
