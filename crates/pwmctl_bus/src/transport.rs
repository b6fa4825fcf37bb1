use crate::error::BusError;

///Highest valid 7-bit slave address.
pub const MAX_ADDRESS: u8 = 0x7F;

///Checks that `address` fits in 7 bits.
pub fn check_address(address: u8) -> Result<u8, BusError> {
    if address > MAX_ADDRESS {
        Err(BusError::AddressBind {
            address: address as u16,
            reason: "address does not fit in 7 bits".to_string(),
        })
    } else {
        Ok(address)
    }
}

///A blocking session with exactly one device on the bus.
///
/// Implementors provide the two raw primitives, which report how many bytes actually went over the
/// wire. The provided `write` and `write_then_read` turn any short transfer into
/// [`BusError::Transfer`]; nothing is retried at this layer.
pub trait BusTransport {
    ///Writes `bytes` to the bound device and returns the number of bytes transferred.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<usize, BusError>;

    ///Reads into `buffer` from the bound device and returns the number of bytes transferred.
    fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError>;

    ///Makes sure the session is usable before a driver starts configuring the device.
    fn prepare(&mut self) -> Result<(), BusError> {
        Ok(())
    }

    ///Writes all of `bytes` or fails.
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let transferred = self.write_raw(bytes)?;
        expect_transferred(bytes.len(), transferred)
    }

    ///Writes `bytes`, then fills `buffer`. The read phase only runs if the write phase was
    /// complete, and `buffer` is left untouched unless both phases were.
    fn write_then_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusError> {
        self.write(bytes)?;
        let mut scratch = vec![0u8; buffer.len()];
        let transferred = self.read_raw(&mut scratch)?;
        expect_transferred(buffer.len(), transferred)?;
        buffer.copy_from_slice(&scratch);
        Ok(())
    }
}

fn expect_transferred(requested: usize, transferred: usize) -> Result<(), BusError> {
    if requested == transferred {
        Ok(())
    } else {
        Err(BusError::Transfer {
            requested,
            transferred,
        })
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        (**self).write_raw(bytes)
    }

    fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        (**self).read_raw(buffer)
    }

    fn prepare(&mut self) -> Result<(), BusError> {
        (**self).prepare()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(bytes)
    }

    fn write_then_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusError> {
        (**self).write_then_read(bytes, buffer)
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        (**self).write_raw(bytes)
    }

    fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        (**self).read_raw(buffer)
    }

    fn prepare(&mut self) -> Result<(), BusError> {
        (**self).prepare()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(bytes)
    }

    fn write_then_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusError> {
        (**self).write_then_read(bytes, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //answers every raw call with a fixed byte count
    struct CountingBus {
        write_count: usize,
        read_count: usize,
        reads: usize,
    }

    impl BusTransport for CountingBus {
        fn write_raw(&mut self, _bytes: &[u8]) -> Result<usize, BusError> {
            Ok(self.write_count)
        }

        fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
            self.reads += 1;
            for b in buffer.iter_mut().take(self.read_count) {
                *b = 0xAB;
            }
            Ok(self.read_count)
        }
    }

    #[test]
    fn test_short_write_is_a_transfer_error() {
        let mut bus = CountingBus {
            write_count: 1,
            read_count: 0,
            reads: 0,
        };
        let err = bus.write(&[0x06, 0x00]).unwrap_err();
        assert!(err.is_transfer());
        match err {
            BusError::Transfer {
                requested,
                transferred,
            } => {
                assert_eq!(requested, 2);
                assert_eq!(transferred, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_short_write_phase_skips_read_phase() {
        let mut bus = CountingBus {
            write_count: 0,
            read_count: 2,
            reads: 0,
        };
        let mut buffer = [0u8; 2];
        assert!(bus.write_then_read(&[0x06], &mut buffer).is_err());
        assert_eq!(bus.reads, 0);
        assert_eq!(buffer, [0, 0]);
    }

    #[test]
    fn test_short_read_phase_leaves_buffer_untouched() {
        let mut bus = CountingBus {
            write_count: 1,
            read_count: 1,
            reads: 0,
        };
        let mut buffer = [0u8; 2];
        assert!(bus.write_then_read(&[0x06], &mut buffer).is_err());
        assert_eq!(bus.reads, 1);
        assert_eq!(buffer, [0, 0]);
    }

    #[test]
    fn test_complete_transfer() {
        let mut bus = CountingBus {
            write_count: 1,
            read_count: 2,
            reads: 0,
        };
        let mut buffer = [0u8; 2];
        bus.write_then_read(&[0x06], &mut buffer).unwrap();
        assert_eq!(buffer, [0xAB, 0xAB]);
    }

    #[test]
    fn test_check_address() {
        assert_eq!(check_address(0x40).unwrap(), 0x40);
        assert_eq!(check_address(0x7F).unwrap(), 0x7F);
        assert!(matches!(
            check_address(0x80),
            Err(BusError::AddressBind { address: 0x80, .. })
        ));
    }
}
