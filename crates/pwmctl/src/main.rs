pub mod config;
pub mod error;
pub mod program;

use config::PwmctlConfig;
use error::PwmctlError;
use program::Program;
use pwmctl_bus::BlockingDelay;
use pwmctl_devices::devices::pca9685::{sim::SimBus, Pca9685, Pca9685Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pwmctl=debug,pwmctl_devices=info,pwmctl_bus=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        warn!("only one parameter, the config file, is expected.");
        warn!("got {}", args.join(","));
    } else if let Some(cfg_name) = args.get(1).map(|o| o.as_str()) {
        match PwmctlConfig::load(cfg_name) {
            Ok(config) => {
                info!("pwmctl starting up!");
                if let Some(ref name) = config.metadata.name {
                    info!("name: {name}")
                }
                if let Some(ref descrip) = config.metadata.description {
                    info!("description: {descrip}")
                }
                match start(config).await {
                    Ok(_) => info!("pwmctl done!"),
                    Err(err) => error!("pwmctl exited with an error: {:?}", err),
                }
            }
            Err(err) => {
                error!("Error starting pwmctl. {:?}", err);
            }
        }
    }
}

//runs the blocking driver on a worker thread while this task listens for ctrl-c
async fn start(config: PwmctlConfig) -> Result<(), PwmctlError> {
    let program = Program::try_from(&config.program)?;
    let cancel_token = CancellationToken::new();

    let signal_token = cancel_token.clone();
    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping the program");
            signal_token.cancel();
        }
    });

    let device = config.device;
    let dry_run = config.dry_run;
    let sleep_when_done = config.sleep_when_done;
    let result = tokio::task::spawn_blocking(move || {
        if dry_run {
            info!("dry run, no bus traffic");
            let mut pwm = Pca9685::new(SimBus::new(), BlockingDelay, device.i2c_address);
            program::run(
                &mut pwm,
                &device,
                &program,
                &mut BlockingDelay,
                &cancel_token,
                sleep_when_done,
            )
        } else {
            let mut pwm = open_device(&device)?;
            program::run(
                &mut pwm,
                &device,
                &program,
                &mut BlockingDelay,
                &cancel_token,
                sleep_when_done,
            )
        }
    })
    .await
    .map_err(|err| PwmctlError::from_string(format!("program task failed: {}", err)))?;

    signal_handle.abort();
    result
}

#[cfg(feature = "rpi")]
fn open_device(
    device: &Pca9685Config,
) -> Result<Pca9685<pwmctl_bus::RppalBus, BlockingDelay>, PwmctlError> {
    info!(
        "opening {} for pca9685 0x{:02x}",
        pwmctl_bus::rpi::device_path(device.bus),
        device.i2c_address
    );
    Ok(Pca9685::open(device)?)
}

#[cfg(not(feature = "rpi"))]
fn open_device(device: &Pca9685Config) -> Result<Pca9685<SimBus, BlockingDelay>, PwmctlError> {
    Err(PwmctlError::from_string(format!(
        "pwmctl was built without i2c support, set dry_run to use pca9685 0x{:02x} in memory",
        device.i2c_address
    )))
}
