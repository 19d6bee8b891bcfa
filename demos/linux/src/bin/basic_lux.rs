//! Basic lux reading example
//!
//! This example demonstrates how to:
//! - Initialize the VEML7700 and verify its device ID
//! - Configure gain and integration time by hand
//! - Read the ambient and white channels and calculate lux

use embedded_hal::delay::DelayNs;
use veml7700_autorange::{compensate_lux, GainLevel, IntegrationLevel, Veml7700};

// This example uses linux-embedded-hal for demonstration
// Replace with your platform's I2C implementation
use linux_embedded_hal::{Delay, I2cdev};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let i2c = I2cdev::new("/dev/i2c-1")?;
    let mut delay = Delay;

    let mut sensor = Veml7700::new(i2c);

    println!("Initializing VEML7700 sensor...");
    sensor.init()?;

    let (id, option) = sensor.get_device_id()?;
    println!("Device ID: 0x{:02X}, address option: 0x{:02X}", id, option);

    let gain = GainLevel::Gain1_4x;
    let integration = IntegrationLevel::Ms100;
    sensor.set_gain(gain)?;
    sensor.set_integration(integration)?;

    println!("Sensor configured with {} gain, {} integration", gain, integration);
    println!("Press Ctrl+C to exit\n");

    loop {
        delay.delay_ms(integration.settle_ms());

        let ambient = sensor.read_ambient()?;
        let white = sensor.read_white()?;
        let lux = sensor.read_lux()?;

        println!(
            "ALS: {:5} | White: {:5} | Lux: {:8.2} (compensated {:8.2})",
            ambient,
            white,
            lux,
            compensate_lux(lux, gain)
        );
    }
}
