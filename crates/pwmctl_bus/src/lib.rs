//!Blocking, byte-level access to a single addressed device on an I2C bus.
//!
//! Drivers in `pwmctl_devices` are generic over [`BusTransport`], so they run unchanged on a
//! Raspberry Pi bus (`RppalBus`), on any `embedded-hal` I2C implementation (`HalBus`), or against
//! an in-memory fake.

//internal error type for bus transfers
pub mod error;

//the transport seam and the short-transfer rule
pub mod transport;

//adapters for embedded-hal buses and delays
pub mod hal;

//linux i2c character devices via rppal
#[cfg(feature = "rpi")]
pub mod rpi;

pub use error::BusError;
pub use hal::{BlockingDelay, HalBus};
pub use transport::BusTransport;

#[cfg(feature = "rpi")]
pub use rpi::RppalBus;
