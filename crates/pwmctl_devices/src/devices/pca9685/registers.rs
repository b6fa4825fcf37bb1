//!Register map and bit masks of the PCA9685, from the NXP datasheet (rev. 4, section 7.3).

pub const MODE1: u8 = 0x00;
pub const MODE2: u8 = 0x01;
pub const SUBADR1: u8 = 0x02;
pub const SUBADR2: u8 = 0x03;
pub const SUBADR3: u8 = 0x04;
pub const ALLCALLADR: u8 = 0x05;
pub const LED0_ON_L: u8 = 0x06;
pub const LED0_ON_H: u8 = 0x07;
pub const LED0_OFF_L: u8 = 0x08;
pub const LED0_OFF_H: u8 = 0x09;
pub const ALL_LED_ON_L: u8 = 0xFA;
pub const ALL_LED_ON_H: u8 = 0xFB;
pub const ALL_LED_OFF_L: u8 = 0xFC;
pub const ALL_LED_OFF_H: u8 = 0xFD;
pub const PRESCALE: u8 = 0xFE;
pub const TESTMODE: u8 = 0xFF;

///Registers per output: ON_L, ON_H, OFF_L, OFF_H.
pub const LED_STRIDE: u8 = 4;

//MODE1 bits
pub const MODE1_ALLCALL: u8 = 0x01;
pub const MODE1_SUB3: u8 = 0x02;
pub const MODE1_SUB2: u8 = 0x04;
pub const MODE1_SUB1: u8 = 0x08;
pub const MODE1_SLEEP: u8 = 0x10;
pub const MODE1_AUTO_INCREMENT: u8 = 0x20;
pub const MODE1_EXTCLK: u8 = 0x40;
pub const MODE1_RESTART: u8 = 0x80;

//MODE2 bits
pub const MODE2_OUTNE_0: u8 = 0x01;
pub const MODE2_OUTNE_1: u8 = 0x02;
pub const MODE2_OUTPUT_TOTEM_POLE: u8 = 0x04;
pub const MODE2_OCH: u8 = 0x08;
pub const MODE2_INVRT: u8 = 0x10;

///Full on/off flag, bit 4 of the `_H` register of a channel's ON or OFF count.
pub const FULL_FLAG_H: u8 = 0x10;

///Chip address with all address pins tied low.
pub const DEFAULT_ADDRESS: u8 = 0x40;

///Nominal frequency of the internal oscillator.
pub const FREQUENCY_OSCILLATOR: u32 = 25_000_000;

pub const PRESCALE_MIN: u8 = 3;
pub const PRESCALE_MAX: u8 = 255;

//power-on register contents
pub const MODE1_POWER_ON: u8 = MODE1_SLEEP | MODE1_ALLCALL;
pub const MODE2_POWER_ON: u8 = MODE2_OUTPUT_TOTEM_POLE;
pub const PRESCALE_POWER_ON: u8 = 0x1E;
pub const SUBADR1_POWER_ON: u8 = 0xE2;
pub const SUBADR2_POWER_ON: u8 = 0xE4;
pub const SUBADR3_POWER_ON: u8 = 0xE8;
pub const ALLCALLADR_POWER_ON: u8 = 0xE0;
