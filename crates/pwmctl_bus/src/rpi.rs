use rppal::i2c::I2c;
use tracing::debug;

use crate::{
    error::BusError,
    transport::{check_address, BusTransport},
};

///Bus used when none is configured, `/dev/i2c-1` on a Raspberry Pi or a Jetson Nano.
pub const DEFAULT_BUS: u8 = 1;

///Path of the character device for `bus`.
pub fn device_path(bus: u8) -> String {
    format!("/dev/i2c-{}", bus)
}

///Opens the i2c character device for `bus`.
pub fn open(bus: u8) -> Result<I2c, BusError> {
    I2c::with_bus(bus).map_err(|err| BusError::Connect {
        path: device_path(bus),
        reason: err.to_string(),
    })
}

///Binds all following transfers on `i2c` to `address`.
pub fn select_device(i2c: &mut I2c, address: u8) -> Result<(), BusError> {
    let address = check_address(address)?;
    i2c.set_slave_address(address as u16)
        .map_err(|err| BusError::AddressBind {
            address: address as u16,
            reason: err.to_string(),
        })
}

///An open, address-selected i2c session. Dropping it closes the bus.
pub struct RppalBus {
    path: String,
    address: u8,
    i2c: I2c,
}

impl RppalBus {
    ///Opens `bus` and selects `address` on it.
    pub fn connect(bus: u8, address: u8) -> Result<Self, BusError> {
        let mut i2c = open(bus)?;
        select_device(&mut i2c, address)?;
        debug!("opened {} for slave 0x{:02x}", device_path(bus), address);
        Ok(Self {
            path: device_path(bus),
            address,
            i2c,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}

impl BusTransport for RppalBus {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        self.i2c.write(bytes).map_err(BusError::io)
    }

    fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        self.i2c.read(buffer).map_err(BusError::io)
    }

    fn prepare(&mut self) -> Result<(), BusError> {
        select_device(&mut self.i2c, self.address)
    }
}
