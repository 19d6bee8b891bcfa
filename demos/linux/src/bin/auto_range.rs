//! Auto-ranging example
//!
//! This example demonstrates how to:
//! - Load the sensor configuration from a JSON file, repairing it if needed
//! - Let the controller pick gain and integration time for the scene
//! - Save the settings the controller settled on

use std::path::PathBuf;

use clap::Parser;
use embedded_hal::delay::DelayNs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veml7700_autorange::{FileConfigStore, LightSensor, RangeOutcome, SensorConfig, Veml7700, CHANNELS};

// This example uses linux-embedded-hal for demonstration
use linux_embedded_hal::{Delay, I2cdev};

#[derive(Parser)]
#[command(about = "Auto-ranging VEML7700 readout", long_about = None)]
struct Args {
    /// I2C bus the sensor is attached to
    #[arg(short, long, default_value = "/dev/i2c-1")]
    bus: String,

    /// Directory holding the configuration file
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Milliseconds between measurements
    #[arg(short, long, default_value_t = 1000)]
    interval: u32,

    /// Store the settled range back into the configuration file
    #[arg(long, default_value_t = false)]
    save: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veml7700_autorange=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let i2c = I2cdev::new(&args.bus)?;
    let mut store = FileConfigStore::in_dir(&args.config_dir);
    let mut pause = Delay;

    let mut sensor = LightSensor::new(Veml7700::new(i2c), Delay, SensorConfig::default());

    println!("Initializing VEML7700 from {}...", store.path().display());
    let (document, origin) = sensor.begin_with_store(&mut store)?;

    let config = sensor.config();
    println!("Sensor \"{}\" ready ({:?} configuration)", document.name, origin);
    println!("- Auto adjust: {}", config.auto_adjust);
    println!("- Gain: {}", config.gain);
    println!("- Integration: {}", config.integration);
    println!("- Persistence: {}", config.persistence);
    println!("- Lux compensation: {}", config.lux_compensation);
    println!("Press Ctrl+C to exit\n");

    let mut reading_count: u32 = 0;

    loop {
        let sample = sensor.measure()?;
        reading_count += 1;

        let config = sensor.config();
        let outcome = sensor.last_adjustment().map(|a| a.outcome);
        let marker = match outcome {
            Some(RangeOutcome::Settled) => " (re-ranged)",
            Some(RangeOutcome::Maxed) => " (at limit)",
            Some(RangeOutcome::Overshot) => " (overshot)",
            _ => "",
        };

        println!(
            "Reading #{:3}: {}: {:5} | {}: {:5} | {}: {:10.2} | {}/{}{}",
            reading_count,
            CHANNELS[0].name,
            sample.ambient,
            CHANNELS[1].name,
            sample.white,
            CHANNELS[2].name,
            sample.lux,
            config.gain,
            config.integration,
            marker
        );

        if args.save && outcome == Some(RangeOutcome::Settled) {
            if let Err(e) = sensor.save_config(&mut store, &document.name) {
                log::warn!("saving configuration failed: {}", e);
            }
        }

        pause.delay_ms(args.interval);
    }
}
