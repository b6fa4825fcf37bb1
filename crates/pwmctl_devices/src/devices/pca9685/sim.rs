//!An in-memory PCA9685 that speaks the register protocol, for tests and dry runs.
//!
//! `SimBus` keeps a 256 byte register file with the chip's power-on contents and follows the
//! parts of the datasheet that the driver relies on: the first byte of a write selects the
//! register pointer, the pointer only advances while MODE1 auto-increment is set, and PRESCALE
//! ignores writes unless the oscillator is asleep. Every transfer and every delay is appended to a
//! shared [`EventLog`], so tests can assert on ordering.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use embedded_hal::delay::DelayNs;
use pwmctl_bus::{BusError, BusTransport};
use tracing::debug;

use super::registers::*;

///One thing that happened on the simulated bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    ///Bytes the chip accepted, register pointer first.
    Write(Vec<u8>),
    ///A read starting at `register`.
    Read { register: u8, len: usize },
    ///A blocking wait requested from a [`RecordingDelay`].
    Delay(Duration),
}

///Shared, append-only log of [`BusEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<BusEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BusEvent>> {
        match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn push(&self, event: BusEvent) {
        self.lock().push(event);
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.lock().clone()
    }

    ///Every register write, in order, as `(register, value)` pairs.
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        let mut writes = Vec::new();
        for event in self.lock().iter() {
            if let BusEvent::Write(bytes) = event {
                if let Some((register, data)) = bytes.split_first() {
                    for (i, value) in data.iter().enumerate() {
                        writes.push((register.wrapping_add(i as u8), *value));
                    }
                }
            }
        }
        writes
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

///Simulated chip behind a [`BusTransport`].
pub struct SimBus {
    registers: [u8; 256],
    pointer: u8,
    log: EventLog,
    next_write_limit: Option<usize>,
    next_read_limit: Option<usize>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    ///A chip in its power-on state, logging to a fresh [`EventLog`].
    pub fn new() -> Self {
        Self::with_log(EventLog::new())
    }

    ///A chip in its power-on state, logging to `log`.
    pub fn with_log(log: EventLog) -> Self {
        let mut registers = [0u8; 256];
        registers[MODE1 as usize] = MODE1_POWER_ON;
        registers[MODE2 as usize] = MODE2_POWER_ON;
        registers[SUBADR1 as usize] = SUBADR1_POWER_ON;
        registers[SUBADR2 as usize] = SUBADR2_POWER_ON;
        registers[SUBADR3 as usize] = SUBADR3_POWER_ON;
        registers[ALLCALLADR as usize] = ALLCALLADR_POWER_ON;
        registers[PRESCALE as usize] = PRESCALE_POWER_ON;
        //every output starts full off
        for channel in 0..16u8 {
            registers[(LED0_OFF_H + LED_STRIDE * channel) as usize] = FULL_FLAG_H;
        }
        Self {
            registers,
            pointer: MODE1,
            log,
            next_write_limit: None,
            next_read_limit: None,
        }
    }

    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    ///Little-endian 16 bit value stored at `register` and `register + 1`.
    pub fn register_u16(&self, register: u8) -> u16 {
        u16::from_le_bytes([
            self.registers[register as usize],
            self.registers[register.wrapping_add(1) as usize],
        ])
    }

    ///Sets a register directly, bypassing the bus and the write rules.
    pub fn poke(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }

    ///Makes the next write stop after `transferred` bytes.
    pub fn short_next_write(&mut self, transferred: usize) {
        self.next_write_limit = Some(transferred);
    }

    ///Makes the next read stop after `transferred` bytes.
    pub fn short_next_read(&mut self, transferred: usize) {
        self.next_read_limit = Some(transferred);
    }

    fn auto_increment(&self) -> bool {
        self.registers[MODE1 as usize] & MODE1_AUTO_INCREMENT != 0
    }

    fn advance(&mut self) {
        if self.auto_increment() {
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    fn store(&mut self, value: u8) {
        if self.pointer == PRESCALE && self.registers[MODE1 as usize] & MODE1_SLEEP == 0 {
            debug!("sim pca9685: PRESCALE write ignored while the oscillator runs");
        } else {
            self.registers[self.pointer as usize] = value;
        }
    }
}

impl BusTransport for SimBus {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        let transferred = match self.next_write_limit.take() {
            Some(limit) => limit.min(bytes.len()),
            None => bytes.len(),
        };
        let accepted = &bytes[..transferred];
        if let Some((register, data)) = accepted.split_first() {
            self.pointer = *register;
            for value in data {
                self.store(*value);
                self.advance();
            }
        }
        self.log.push(BusEvent::Write(accepted.to_vec()));
        Ok(transferred)
    }

    fn read_raw(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        let transferred = match self.next_read_limit.take() {
            Some(limit) => limit.min(buffer.len()),
            None => buffer.len(),
        };
        self.log.push(BusEvent::Read {
            register: self.pointer,
            len: transferred,
        });
        for slot in buffer.iter_mut().take(transferred) {
            *slot = self.registers[self.pointer as usize];
            self.advance();
        }
        Ok(transferred)
    }
}

///`DelayNs` that returns immediately and records the requested wait.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    log: EventLog,
}

impl RecordingDelay {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(BusEvent::Delay(Duration::from_nanos(ns as u64)));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.push(BusEvent::Delay(Duration::from_micros(us as u64)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(BusEvent::Delay(Duration::from_millis(ms as u64)));
    }
}
