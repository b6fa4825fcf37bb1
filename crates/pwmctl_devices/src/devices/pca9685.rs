use std::{fmt, time::Duration};

use embedded_hal::delay::DelayNs;
use pwmctl_bus::{BusError, BusTransport};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::DeviceError;

pub mod registers;
pub mod sim;

use registers::*;

///Wait after setting MODE1 RESTART for the chip's restart sequence to finish.
pub const RESTART_SETTLE: Duration = Duration::from_secs(1);

///Wait after a SLEEP transition for the oscillator to stop or stabilize.
pub const OSCILLATOR_SETTLE: Duration = Duration::from_millis(5);

///Output frequency `begin` configures when running from the internal oscillator.
pub const DEFAULT_PWM_FREQUENCY: f32 = 1000.0;

pub const MIN_PWM_FREQUENCY: f32 = 1.0;
//the datasheet limit is 1526 Hz at 25 MHz, but faster external clocks allow more
pub const MAX_PWM_FREQUENCY: f32 = 3500.0;

///Counter steps per PWM period.
pub const TICKS_PER_PERIOD: u16 = 4096;

///On or off value that switches a channel fully on or fully off.
pub const FULL: u16 = 4096;

///Largest duty value accepted by `set_pin`, and the largest ordinary tick count.
pub const MAX_DUTY: u16 = 4095;

const ALL_LED_INDEX: u8 = (ALL_LED_ON_L - LED0_ON_L) / LED_STRIDE;

///One of the 16 outputs, or the broadcast block that drives all of them at once.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const COUNT: u8 = 16;

    ///Writes here land on every output, reads always return zero.
    pub const ALL: Channel = Channel(ALL_LED_INDEX);

    pub fn new(index: u8) -> Result<Self, DeviceError> {
        if index < Self::COUNT {
            Ok(Channel(index))
        } else {
            Err(DeviceError::InvalidChannel(index))
        }
    }

    ///All 16 outputs in order.
    pub fn outputs() -> impl Iterator<Item = Channel> {
        (0..Self::COUNT).map(Channel)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    ///Address of the channel's ON_L register. OFF_L follows two bytes later.
    pub fn base_register(self) -> u8 {
        LED0_ON_L + LED_STRIDE * self.0
    }
}

impl TryFrom<u8> for Channel {
    type Error = DeviceError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Channel::new(index)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Channel::ALL {
            f.write_str("ALL_LED")
        } else {
            write!(f, "LED{}", self.0)
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

///Where the PWM counter takes its clock from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Internal,
    External,
}

///Power and clock state of the chip, as encoded in MODE1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    ///Restarted and not yet configured (auto-increment still off).
    Reset,
    ///Oscillator stopped, outputs off.
    Sleeping,
    Running(ClockSource),
}

impl PowerMode {
    pub fn from_mode1(mode1: u8) -> Self {
        if mode1 & MODE1_SLEEP != 0 {
            PowerMode::Sleeping
        } else if mode1 & MODE1_AUTO_INCREMENT == 0 {
            PowerMode::Reset
        } else if mode1 & MODE1_EXTCLK != 0 {
            PowerMode::Running(ClockSource::External)
        } else {
            PowerMode::Running(ClockSource::Internal)
        }
    }
}

fn clamp_frequency(freq_hz: f32) -> f32 {
    //written so that NaN ends up at the minimum
    if freq_hz >= MIN_PWM_FREQUENCY {
        freq_hz.min(MAX_PWM_FREQUENCY)
    } else {
        MIN_PWM_FREQUENCY
    }
}

///PRESCALE value that makes the chip run at `freq_hz`, datasheet equation 1.
///
/// `freq_hz` is clamped to 1..=3500 Hz first, the result to 3..=255.
pub fn prescale_for_frequency(oscillator_hz: u32, freq_hz: f32) -> u8 {
    let freq_hz = clamp_frequency(freq_hz) as f64;
    let exact = oscillator_hz as f64 / (freq_hz * TICKS_PER_PERIOD as f64);
    let prescale = (exact + 0.5).floor() - 1.0;
    prescale.clamp(PRESCALE_MIN as f64, PRESCALE_MAX as f64) as u8
}

///Length of one counter tick in microseconds.
pub fn pulse_length_us(oscillator_hz: u32, prescale: u8) -> f64 {
    1_000_000.0 * (prescale as f64 + 1.0) / oscillator_hz as f64
}

///Nearest tick count for a pulse of `microseconds`, at most [`MAX_DUTY`].
pub fn microseconds_to_ticks(microseconds: u16, pulse_length_us: f64) -> u16 {
    let ticks = (microseconds as f64 / pulse_length_us).round();
    ticks.min(MAX_DUTY as f64) as u16
}

///`(on, off)` pair for a linear duty `value` in 0..=4095.
pub fn pin_ticks(value: u16, invert: bool) -> (u16, u16) {
    let value = value.min(MAX_DUTY);
    match (invert, value) {
        (false, MAX_DUTY) | (true, 0) => (FULL, 0),
        (false, 0) | (true, MAX_DUTY) => (0, FULL),
        (false, value) => (0, value),
        (true, value) => (0, MAX_DUTY - value),
    }
}

fn default_bus() -> u8 {
    1
}

fn default_address() -> u8 {
    DEFAULT_ADDRESS
}

fn default_oscillator_hz() -> u32 {
    FREQUENCY_OSCILLATOR
}

fn default_pwm_frequency_hz() -> f32 {
    50.0
}

fn default_totem_pole() -> bool {
    true
}

//system level config -- corresponds to 1 pwm chip instance
#[derive(Debug, Clone, Deserialize)]
pub struct Pca9685Config {
    ///i2c bus number, `/dev/i2c-<bus>`
    #[serde(default = "default_bus")]
    pub bus: u8,
    #[serde(default = "default_address")]
    pub i2c_address: u8,
    ///Internal oscillator as calibrated, or the rate of the clock on EXTCLK.
    #[serde(default = "default_oscillator_hz")]
    pub oscillator_hz: u32,
    ///Nonzero switches the chip to the external clock with this prescale.
    #[serde(default)]
    pub external_prescale: u8,
    #[serde(default = "default_pwm_frequency_hz")]
    pub pwm_frequency_hz: f32,
    #[serde(default = "default_totem_pole")]
    pub totem_pole: bool,
}

impl Default for Pca9685Config {
    fn default() -> Self {
        Self {
            bus: default_bus(),
            i2c_address: default_address(),
            oscillator_hz: default_oscillator_hz(),
            external_prescale: 0,
            pwm_frequency_hz: default_pwm_frequency_hz(),
            totem_pole: default_totem_pole(),
        }
    }
}

///Driver for one PCA9685 behind transport `T`, using `D` for the settle waits.
///
/// Register contents are never cached, every operation that needs them reads the chip again.
/// Only the oscillator frequency used for the pulse arithmetic lives in the driver.
pub struct Pca9685<T, D> {
    bus: T,
    delay: D,
    address: u8,
    oscillator_hz: u32,
}

#[cfg(feature = "rpi")]
impl Pca9685<pwmctl_bus::RppalBus, pwmctl_bus::BlockingDelay> {
    ///Opens the configured Linux i2c bus and binds it to the chip address.
    pub fn open(config: &Pca9685Config) -> Result<Self, DeviceError> {
        let bus = pwmctl_bus::RppalBus::connect(config.bus, config.i2c_address)?;
        Ok(Self::new(bus, pwmctl_bus::BlockingDelay, config.i2c_address))
    }
}

impl<T, D> Pca9685<T, D>
where
    T: BusTransport,
    D: DelayNs,
{
    pub fn new(bus: T, delay: D, address: u8) -> Self {
        Self {
            bus,
            delay,
            address,
            oscillator_hz: FREQUENCY_OSCILLATOR,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    ///Gives back the transport, ending the driver.
    pub fn release(self) -> T {
        self.bus
    }

    ///Restarts the chip and starts PWM output.
    ///
    /// A nonzero `prescale_override` selects the external clock with that prescale. The
    /// oscillator frequency is reset to the internal 25 MHz either way, callers running from an
    /// external clock set the real rate afterwards.
    pub fn begin(&mut self, prescale_override: u8) -> Result<(), DeviceError> {
        self.bus.prepare()?;
        self.reset();
        self.set_oscillator_frequency(FREQUENCY_OSCILLATOR);
        if prescale_override != 0 {
            self.set_ext_clk(prescale_override);
        } else {
            self.set_pwm_freq(DEFAULT_PWM_FREQUENCY);
        }
        info!("pca9685 0x{:02x} started", self.address);
        Ok(())
    }

    ///Applies a full device configuration, starting with `begin`.
    pub fn configure(&mut self, config: &Pca9685Config) -> Result<(), DeviceError> {
        self.begin(config.external_prescale)?;
        self.set_oscillator_frequency(config.oscillator_hz);
        if config.external_prescale == 0 {
            self.set_pwm_freq(config.pwm_frequency_hz);
        }
        self.set_output_mode(config.totem_pole)
    }

    pub fn reset(&mut self) {
        self.write_in_sequence(MODE1, MODE1_RESTART);
        self.wait_restart_settle();
        debug!("pca9685 0x{:02x} reset", self.address);
    }

    pub fn sleep(&mut self) {
        let awake = self.read_in_sequence(MODE1);
        self.write_in_sequence(MODE1, awake | MODE1_SLEEP);
        self.wait_oscillator_settle();
        debug!("pca9685 0x{:02x} sleeping", self.address);
    }

    pub fn wakeup(&mut self) {
        let sleeping = self.read_in_sequence(MODE1);
        self.write_in_sequence(MODE1, sleeping & !MODE1_SLEEP);
        debug!("pca9685 0x{:02x} awake", self.address);
    }

    ///Switches the PWM counter to the clock on the EXTCLK pin.
    ///
    /// The switch only happens while the internal oscillator sleeps, and the chip only leaves
    /// external clock mode on power cycle or software reset.
    pub fn set_ext_clk(&mut self, prescale: u8) {
        let old_mode = self.read_in_sequence(MODE1);
        let sleep_mode = (old_mode & !MODE1_RESTART) | MODE1_SLEEP;
        self.write_in_sequence(MODE1, sleep_mode);
        let ext_mode = sleep_mode | MODE1_EXTCLK;
        self.write_in_sequence(MODE1, ext_mode);
        self.write_in_sequence(PRESCALE, prescale);
        self.wait_oscillator_settle();
        self.write_in_sequence(
            MODE1,
            (ext_mode & !MODE1_SLEEP) | MODE1_RESTART | MODE1_AUTO_INCREMENT,
        );
        debug!(
            "pca9685 0x{:02x} on external clock, prescale {}",
            self.address, prescale
        );
    }

    ///Sets the output frequency, clamped to 1..=3500 Hz.
    pub fn set_pwm_freq(&mut self, freq_hz: f32) {
        let prescale = prescale_for_frequency(self.oscillator_hz, freq_hz);
        let old_mode = self.read_in_sequence(MODE1);
        let sleep_mode = (old_mode & !MODE1_RESTART) | MODE1_SLEEP;
        //PRESCALE only takes writes while the oscillator is off
        self.write_in_sequence(MODE1, sleep_mode);
        self.write_in_sequence(PRESCALE, prescale);
        self.write_in_sequence(MODE1, old_mode);
        self.wait_oscillator_settle();
        self.write_in_sequence(MODE1, old_mode | MODE1_RESTART | MODE1_AUTO_INCREMENT);
        debug!(
            "pca9685 0x{:02x} at {} Hz, prescale {}",
            self.address,
            clamp_frequency(freq_hz),
            prescale
        );
    }

    ///Selects totem pole (`true`) or open drain (`false`) outputs.
    pub fn set_output_mode(&mut self, totem_pole: bool) -> Result<(), DeviceError> {
        let old_mode = self.read_register(MODE2)?;
        let new_mode = if totem_pole {
            old_mode | MODE2_OUTPUT_TOTEM_POLE
        } else {
            old_mode & !MODE2_OUTPUT_TOTEM_POLE
        };
        self.write_register(MODE2, new_mode)?;
        Ok(())
    }

    pub fn read_prescale(&mut self) -> Result<u8, DeviceError> {
        Ok(self.read_register(PRESCALE)?)
    }

    ///Reads the ON (`off == false`) or OFF count of `channel`.
    ///
    /// Each call is one two byte transaction, so reading both counts takes two calls.
    pub fn get_pwm(&mut self, channel: Channel, off: bool) -> Result<u16, DeviceError> {
        let mut register = channel.base_register();
        if off {
            register += 2;
        }
        let mut buffer = [0u8; 2];
        self.bus.write_then_read(&[register], &mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    ///Sets the counter values at which `channel` turns on and off. 4096 is the full on/off flag.
    pub fn set_pwm(&mut self, channel: Channel, on: u16, off: u16) -> Result<(), DeviceError> {
        let [on_l, on_h] = on.min(FULL).to_le_bytes();
        let [off_l, off_h] = off.min(FULL).to_le_bytes();
        self.bus.write(&[channel.base_register(), on_l, on_h, off_l, off_h])?;
        Ok(())
    }

    ///Sets `channel` to a duty `value` out of 4095, optionally inverted.
    pub fn set_pin(
        &mut self,
        channel: Channel,
        value: u16,
        invert: bool,
    ) -> Result<(), DeviceError> {
        let (on, off) = pin_ticks(value, invert);
        self.set_pwm(channel, on, off)
    }

    ///Sets `channel` to high pulses of `microseconds`, using the prescale the chip runs with.
    pub fn write_microseconds(
        &mut self,
        channel: Channel,
        microseconds: u16,
    ) -> Result<(), DeviceError> {
        let prescale = self.read_prescale()?;
        let pulse_length = pulse_length_us(self.oscillator_hz, prescale);
        let ticks = microseconds_to_ticks(microseconds, pulse_length);
        self.set_pwm(channel, 0, ticks)
    }

    ///Frequency used for all pulse arithmetic.
    pub fn oscillator_frequency(&self) -> u32 {
        self.oscillator_hz
    }

    ///Tells the driver what clock the chip runs from. Zero is taken as 1 Hz.
    pub fn set_oscillator_frequency(&mut self, oscillator_hz: u32) {
        self.oscillator_hz = oscillator_hz.max(1);
    }

    ///Reads MODE1 and reports the power state it encodes.
    pub fn power_mode(&mut self) -> Result<PowerMode, DeviceError> {
        Ok(PowerMode::from_mode1(self.read_register(MODE1)?))
    }

    ///Blocks for [`RESTART_SETTLE`].
    pub fn wait_restart_settle(&mut self) {
        self.delay.delay_us(RESTART_SETTLE.as_micros() as u32);
    }

    ///Blocks for [`OSCILLATOR_SETTLE`].
    pub fn wait_oscillator_settle(&mut self) {
        self.delay.delay_us(OSCILLATOR_SETTLE.as_micros() as u32);
    }

    fn read_register(&mut self, register: u8) -> Result<u8, BusError> {
        let mut buffer = [0u8; 1];
        self.bus.write_then_read(&[register], &mut buffer)?;
        Ok(buffer[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.bus.write(&[register, value])
    }

    //mode sequences keep going after a failed transfer, the chip is then in an unknown mode
    fn read_in_sequence(&mut self, register: u8) -> u8 {
        self.read_register(register).unwrap_or_else(|err| {
            warn!(
                "pca9685 0x{:02x}: reading register 0x{:02x} failed, using 0x00. {:?}",
                self.address, register, err
            );
            0
        })
    }

    fn write_in_sequence(&mut self, register: u8, value: u8) {
        if let Err(err) = self.write_register(register, value) {
            warn!(
                "pca9685 0x{:02x}: writing 0x{:02x} to register 0x{:02x} failed. {:?}",
                self.address, value, register, err
            );
        }
    }
}
