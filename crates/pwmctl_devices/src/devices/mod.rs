
///The PCA9685 is an i2c device from NXP with 16 pwm output channels with 12 bit resolution.
///
/// It is the chip on most 16-channel servo driver boards.
#[cfg(feature = "pca9685")]
pub mod pca9685;
