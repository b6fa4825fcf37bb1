use std::fmt::{Debug, Display, Formatter};

use pwmctl_bus::BusError;

///Errors reported by the device drivers.
pub enum DeviceError {
    ///The transport failed or transferred fewer bytes than requested.
    Bus(BusError),
    ///Channel index outside of the chip's outputs.
    InvalidChannel(u8),
}

impl DeviceError {
    pub fn is_transfer(&self) -> bool {
        matches!(self, DeviceError::Bus(err) if err.is_transfer())
    }
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bus(err) => Display::fmt(err, f),
            Self::InvalidChannel(index) => {
                write!(f, "invalid channel {}, expected 0 to 15", index)
            }
        }
    }
}

impl Debug for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("DeviceError: {}", self))
    }
}

impl std::error::Error for DeviceError {}

impl From<BusError> for DeviceError {
    fn from(err: BusError) -> Self {
        DeviceError::Bus(err)
    }
}
