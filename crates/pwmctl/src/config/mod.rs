use config_rs::{Config, File, FileFormat};
use pwmctl_devices::devices::pca9685::Pca9685Config;
use serde::Deserialize;

use crate::{error::PwmctlError, program::ProgramConfig};

#[derive(Deserialize, Debug, Default)]
pub struct Metadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

///Everything `pwmctl` reads from its config file.
#[derive(Deserialize, Debug)]
pub struct PwmctlConfig {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub device: Pca9685Config,
    ///Run against the in-memory chip instead of the i2c bus.
    #[serde(default)]
    pub dry_run: bool,
    ///Put the chip to sleep after the program finishes, turning every output off.
    #[serde(default)]
    pub sleep_when_done: bool,
    pub program: ProgramConfig,
}

impl PwmctlConfig {
    ///Loads a config file, the format follows the extension.
    pub fn load(name: &str) -> Result<Self, PwmctlError> {
        let config = Config::builder()
            .add_source(File::with_name(name))
            .build()
            .and_then(|config| config.try_deserialize::<PwmctlConfig>())?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PwmctlError> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .and_then(|config| config.try_deserialize::<PwmctlConfig>())?;
        Ok(config)
    }
}
