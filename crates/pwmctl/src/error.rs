//!A mod for the error types
use std::fmt::Debug;

use pwmctl_bus::BusError;
use pwmctl_devices::error::DeviceError;

///Error type for everything that can stop `pwmctl`.
pub enum PwmctlError {
    Message(String),
    Messages(Vec<String>),
}

impl PwmctlError {
    pub fn from_string(msg: String) -> Self {
        PwmctlError::Message(msg)
    }
    pub fn from_errs(errs: Vec<PwmctlError>) -> Self {
        let mut messages = Vec::with_capacity(errs.len());
        for err in errs {
            match err {
                Self::Message(msg) => messages.push(msg),
                Self::Messages(mut msgs) => messages.append(&mut msgs),
            }
        }
        Self::Messages(messages)
    }
}

impl Debug for PwmctlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => f.write_fmt(format_args!("PwmctlError: {}", message)),
            Self::Messages(messages) => f.write_fmt(format_args!(
                "PwmctlError (multiple): \n{}",
                messages.join("\n")
            )),
        }
    }
}

impl From<DeviceError> for PwmctlError {
    fn from(err: DeviceError) -> Self {
        PwmctlError::from_string(err.to_string())
    }
}

impl From<BusError> for PwmctlError {
    fn from(err: BusError) -> Self {
        PwmctlError::from_string(err.to_string())
    }
}

impl From<config_rs::ConfigError> for PwmctlError {
    fn from(err: config_rs::ConfigError) -> Self {
        PwmctlError::from_string(format!("failed to parse config: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errs_flattens() {
        let err = PwmctlError::from_errs(vec![
            PwmctlError::from_string("a".to_string()),
            PwmctlError::Messages(vec!["b".to_string(), "c".to_string()]),
        ]);
        match err {
            PwmctlError::Messages(msgs) => assert_eq!(msgs, vec!["a", "b", "c"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_device_error_message() {
        let err: PwmctlError = DeviceError::InvalidChannel(16).into();
        assert_eq!(format!("{:?}", err), "PwmctlError: invalid channel 16, expected 0 to 15");
    }
}
