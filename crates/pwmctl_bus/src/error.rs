use std::fmt::{Debug, Display, Formatter};

///Failures reported by a [`crate::BusTransport`].
pub enum BusError {
    ///The bus device could not be opened.
    Connect { path: String, reason: String },
    ///The bus refused to bind transfers to the slave address.
    AddressBind { address: u16, reason: String },
    ///Fewer bytes were transferred than requested.
    Transfer {
        requested: usize,
        transferred: usize,
    },
    ///Any other error from the underlying bus implementation.
    Io(String),
}

impl BusError {
    pub fn io<E: Debug>(err: E) -> Self {
        BusError::Io(format!("{:?}", err))
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, BusError::Transfer { .. })
    }
}

impl Display for BusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { path, reason } => {
                write!(f, "failed to open i2c bus {}: {}", path, reason)
            }
            Self::AddressBind { address, reason } => write!(
                f,
                "failed to acquire bus access to slave 0x{:02x}: {}",
                address, reason
            ),
            Self::Transfer {
                requested,
                transferred,
            } => write!(
                f,
                "short transfer on i2c bus: {} of {} bytes",
                transferred, requested
            ),
            Self::Io(message) => write!(f, "i2c bus error: {}", message),
        }
    }
}

impl Debug for BusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("BusError: {}", self))
    }
}

impl std::error::Error for BusError {}
