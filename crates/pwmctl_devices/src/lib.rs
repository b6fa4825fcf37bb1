//!Drivers for i2c chips, written against the `pwmctl_bus` transport.

pub mod devices;

//internal error type for device drivers
pub mod error;
