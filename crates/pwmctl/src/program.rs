use embedded_hal::delay::DelayNs;
use pwmctl_bus::BusTransport;
use pwmctl_devices::devices::pca9685::{Channel, Pca9685, Pca9685Config};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PwmctlError;

fn default_center_us() -> u16 {
    1500
}

///Channels that move together in one sweep.
#[derive(Deserialize, Debug, Clone)]
pub struct SweepGroupConfig {
    pub steps: u16,
    #[serde(default)]
    pub decreasing: Vec<u8>,
    #[serde(default)]
    pub increasing: Vec<u8>,
}

///What to do with the servos once the chip is configured.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ProgramConfig {
    //hold every listed channel at one pulse width
    Center {
        channels: Vec<u8>,
        #[serde(default = "default_center_us")]
        pulse_us: u16,
    },
    //move groups of channels away from center, one microsecond per step
    Sweep {
        #[serde(default = "default_center_us")]
        center_us: u16,
        step_delay_ms: u32,
        groups: Vec<SweepGroupConfig>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepGroup {
    pub steps: u16,
    pub decreasing: Vec<Channel>,
    pub increasing: Vec<Channel>,
}

///A [`ProgramConfig`] with every channel checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Program {
    Center {
        channels: Vec<Channel>,
        pulse_us: u16,
    },
    Sweep {
        center_us: u16,
        step_delay_ms: u32,
        groups: Vec<SweepGroup>,
    },
}

fn channels(indices: &[u8], errs: &mut Vec<PwmctlError>) -> Vec<Channel> {
    let mut channels = Vec::with_capacity(indices.len());
    for index in indices {
        match Channel::new(*index) {
            Ok(channel) => channels.push(channel),
            Err(err) => errs.push(err.into()),
        }
    }
    channels
}

impl TryFrom<&ProgramConfig> for Program {
    type Error = PwmctlError;

    fn try_from(cfg: &ProgramConfig) -> Result<Self, Self::Error> {
        let mut errs = Vec::new();
        let program = match cfg {
            ProgramConfig::Center {
                channels: indices,
                pulse_us,
            } => Program::Center {
                channels: channels(indices, &mut errs),
                pulse_us: *pulse_us,
            },
            ProgramConfig::Sweep {
                center_us,
                step_delay_ms,
                groups,
            } => Program::Sweep {
                center_us: *center_us,
                step_delay_ms: *step_delay_ms,
                groups: groups
                    .iter()
                    .map(|group| SweepGroup {
                        steps: group.steps,
                        decreasing: channels(&group.decreasing, &mut errs),
                        increasing: channels(&group.increasing, &mut errs),
                    })
                    .collect(),
            },
        };
        if errs.is_empty() {
            Ok(program)
        } else {
            Err(PwmctlError::from_errs(errs))
        }
    }
}

///Configures the chip and runs `program`.
///
/// `pacer` provides the waits between sweep steps. The program stops early once `cancel_token` is
/// cancelled, which also puts the chip to sleep. A finished program leaves the outputs running so
/// the servos hold their positions, unless `sleep_when_done` is set.
pub fn run<T, D, W>(
    pwm: &mut Pca9685<T, D>,
    device: &Pca9685Config,
    program: &Program,
    pacer: &mut W,
    cancel_token: &CancellationToken,
    sleep_when_done: bool,
) -> Result<(), PwmctlError>
where
    T: BusTransport,
    D: DelayNs,
    W: DelayNs,
{
    pwm.configure(device)?;
    let result = run_program(pwm, program, pacer, cancel_token);
    if sleep_when_done || cancel_token.is_cancelled() {
        pwm.sleep();
        info!("pca9685 0x{:02x} put to sleep", pwm.address());
    }
    result
}

fn run_program<T, D, W>(
    pwm: &mut Pca9685<T, D>,
    program: &Program,
    pacer: &mut W,
    cancel_token: &CancellationToken,
) -> Result<(), PwmctlError>
where
    T: BusTransport,
    D: DelayNs,
    W: DelayNs,
{
    match program {
        Program::Center { channels, pulse_us } => {
            for channel in channels {
                if cancel_token.is_cancelled() {
                    warn!("center program cancelled");
                    return Ok(());
                }
                pwm.write_microseconds(*channel, *pulse_us)?;
                info!("pwm set to {} microseconds on channel {}", pulse_us, channel);
            }
        }
        Program::Sweep {
            center_us,
            step_delay_ms,
            groups,
        } => {
            for group in groups {
                debug!(
                    "sweeping {:?} down and {:?} up over {} steps",
                    group.decreasing, group.increasing, group.steps
                );
                for step in 0..group.steps {
                    if cancel_token.is_cancelled() {
                        warn!("sweep program cancelled");
                        return Ok(());
                    }
                    for channel in &group.decreasing {
                        pwm.write_microseconds(*channel, center_us.saturating_sub(step))?;
                    }
                    for channel in &group.increasing {
                        pwm.write_microseconds(*channel, center_us.saturating_add(step))?;
                    }
                    pacer.delay_ms(*step_delay_ms);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pwmctl_devices::devices::pca9685::{
        registers::{DEFAULT_ADDRESS, MODE1, MODE1_SLEEP},
        sim::{BusEvent, EventLog, RecordingDelay, SimBus},
        ClockSource, PowerMode,
    };

    use super::*;

    fn ch(index: u8) -> Channel {
        Channel::new(index).unwrap()
    }

    fn off_ticks(sim: &SimBus, channel: u8) -> u16 {
        sim.register_u16(ch(channel).base_register() + 2)
    }

    fn run_on_sim(
        program: &Program,
        cancel_token: &CancellationToken,
        sleep_when_done: bool,
    ) -> (SimBus, EventLog) {
        let log = EventLog::new();
        let mut sim = SimBus::with_log(log.clone());
        let mut pacer = RecordingDelay::new(log.clone());
        {
            let mut pwm = Pca9685::new(&mut sim, RecordingDelay::new(log.clone()), DEFAULT_ADDRESS);
            run(
                &mut pwm,
                &Pca9685Config::default(),
                program,
                &mut pacer,
                cancel_token,
                sleep_when_done,
            )
            .unwrap();
        }
        (sim, log)
    }

    #[test]
    fn test_invalid_channels_are_collected() {
        let cfg = ProgramConfig::Sweep {
            center_us: 1500,
            step_delay_ms: 10,
            groups: vec![SweepGroupConfig {
                steps: 1,
                decreasing: vec![2, 16],
                increasing: vec![61],
            }],
        };
        match Program::try_from(&cfg) {
            Err(PwmctlError::Messages(msgs)) => assert_eq!(msgs.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_center_program() {
        let program = Program::try_from(&ProgramConfig::Center {
            channels: vec![2, 3, 15],
            pulse_us: 1500,
        })
        .unwrap();
        let (mut sim, _log) = run_on_sim(&program, &CancellationToken::new(), false);
        for channel in [2, 3, 15] {
            assert_eq!(off_ticks(&sim, channel), 307);
        }
        //untouched channels keep their power-on full off flag
        assert_eq!(off_ticks(&sim, 4), 4096);
        //outputs keep running so the servos hold the pulse
        let mut pwm = Pca9685::new(&mut sim, RecordingDelay::default(), DEFAULT_ADDRESS);
        assert_eq!(pwm.power_mode().unwrap(), PowerMode::Running(ClockSource::Internal));
    }

    #[test]
    fn test_center_program_sleeps_when_asked() {
        let program = Program::Center {
            channels: vec![ch(2)],
            pulse_us: 1500,
        };
        let (mut sim, _log) = run_on_sim(&program, &CancellationToken::new(), true);
        assert_eq!(off_ticks(&sim, 2), 307);
        let mut pwm = Pca9685::new(&mut sim, RecordingDelay::default(), DEFAULT_ADDRESS);
        assert_eq!(pwm.power_mode().unwrap(), PowerMode::Sleeping);
    }

    #[test]
    fn test_sweep_program() {
        let program = Program::Sweep {
            center_us: 1500,
            step_delay_ms: 10,
            groups: vec![SweepGroup {
                steps: 300,
                decreasing: vec![ch(4)],
                increasing: vec![ch(8)],
            }],
        };
        let (sim, log) = run_on_sim(&program, &CancellationToken::new(), false);
        //last step is 299 microseconds off center, at 4.88 us per tick
        assert_eq!(off_ticks(&sim, 4), 246);
        assert_eq!(off_ticks(&sim, 8), 369);
        let pauses = log
            .events()
            .into_iter()
            .filter(|e| *e == BusEvent::Delay(Duration::from_millis(10)))
            .count();
        assert_eq!(pauses, 300);
    }

    #[test]
    fn test_cancelled_program_sleeps() {
        let program = Program::Center {
            channels: vec![ch(0)],
            pulse_us: 1500,
        };
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let (sim, _log) = run_on_sim(&program, &cancel_token, false);
        assert_eq!(off_ticks(&sim, 0), 4096);
        assert_ne!(sim.register(MODE1) & MODE1_SLEEP, 0);
    }
}
