//! # VEML7700 Auto-Ranging Ambient Light Sensor
//!
//! This is a platform-agnostic Rust driver for the VEML7700 ambient light sensor,
//! built using the [`embedded-hal`] traits for I2C communication and delays, with a
//! closed-loop controller that keeps the raw reading in a usable band.
//!
//! The VEML7700 provides:
//! - A 16-bit ambient light (ALS) channel and a white channel
//! - Programmable gain (1/8x to 2x)
//! - Programmable integration time (25ms to 800ms)
//! - Interrupt persistence protection
//! - I2C interface (address 0x10)
//!
//! ## Features
//!
//! - **Auto-ranging**: searches the 24 gain/integration combinations with
//!   monotonic single steps until the ambient count lies in 100..=10000
//! - **Lux compensation** for the sensor's non-linearity at high lux and low gain
//! - **JSON configuration** with a pluggable load/save store (`config` feature)
//! - **File-backed configuration store** (`std` feature)
//! - **Device port abstraction** so the ranging logic runs against simulated hardware
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use veml7700_autorange::{LightSensor, SensorConfig, Veml7700};
//!
//! # struct NoDelay;
//! # impl embedded_hal::delay::DelayNs for NoDelay {
//! #     fn delay_ns(&mut self, _ns: u32) {}
//! # }
//! # fn main() {
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = NoDelay;
//! let device = Veml7700::new(i2c);
//! let config = SensorConfig {
//!     auto_adjust: true,
//!     ..SensorConfig::default()
//! };
//! let mut sensor = LightSensor::new(device, delay, config);
//!
//! // Probe the device and apply gain, integration time and persistence
//! sensor.begin().unwrap();
//!
//! // Re-range if needed, then read
//! let sample = sensor.measure().unwrap();
//! // println!("{} counts, {:.2} lux", sample.ambient, sample.lux);
//! # let _ = sample;
//! # }
//! ```
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![no_std]
#![deny(missing_docs)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(feature = "config")]
extern crate alloc;

use core::fmt;

use embedded_hal::i2c::I2c;

#[cfg(feature = "config")]
pub mod config;
pub mod ll;
pub mod measurement;
pub mod port;
pub mod ranging;
pub mod settings;

#[cfg(feature = "config")]
pub use config::{ConfigDocument, ConfigError, ConfigOrigin, ConfigStore, MemoryConfigStore};
#[cfg(feature = "std")]
pub use config::FileConfigStore;
pub use ll::I2C_ADDRESS;
pub use measurement::{compensate_lux, Channel, LightSensor, RawSample, CHANNELS, SENSOR_TYPE};
pub use port::DevicePort;
pub use ranging::{Adjustment, RangeController, RangeOutcome, RangingPolicy};
pub use settings::{
    GainLevel, IntegrationLevel, PersistenceLevel, RangeState, SensorConfig, UnknownLabel,
};

use ll::DeviceInterface;

/// All possible errors of the I2C driver
#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// Invalid device ID detected
    InvalidDeviceId {
        /// Expected device ID
        expected: u8,
        /// Found device ID
        found: u8,
    },
    /// A register held a value the driver cannot interpret
    InvalidConfig(&'static str),
}

impl<E> From<ll::DeviceInterfaceError<E>> for Error<E> {
    fn from(error: ll::DeviceInterfaceError<E>) -> Self {
        match error {
            ll::DeviceInterfaceError::I2c(e) => Error::I2c(e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::InvalidDeviceId { expected, found } => write!(
                f,
                "unexpected device ID 0x{:02X}, expected 0x{:02X}",
                found, expected
            ),
            Error::InvalidConfig(what) => write!(f, "invalid register value: {}", what),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

/// Errors surfaced by the ranging controller and the measurement pipeline
///
/// `E` is the error type of the [`DevicePort`] in use.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SensorError<E> {
    /// The device failed to initialize; fatal to startup, never retried
    Init(E),
    /// A power or settings write failed; the current adjustment pass was abandoned
    Apply(E),
    /// Reading a channel failed
    Read(E),
}

impl<E> SensorError<E> {
    /// The underlying device port error
    pub fn device_error(&self) -> &E {
        match self {
            SensorError::Init(e) | SensorError::Apply(e) | SensorError::Read(e) => e,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Init(e) => write!(f, "sensor initialization failed: {:?}", e),
            SensorError::Apply(e) => write!(f, "applying sensor settings failed: {:?}", e),
            SensorError::Read(e) => write!(f, "reading sensor failed: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for SensorError<E> {}

/// High-level VEML7700 driver
pub struct Veml7700<I2C> {
    iface: DeviceInterface<I2C>,
    // Device state tracking
    current_gain: Option<GainLevel>,
    current_integration: Option<IntegrationLevel>,
}

impl<I2C, E> Veml7700<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a new VEML7700 driver instance
    pub fn new(i2c: I2C) -> Self {
        Self {
            iface: DeviceInterface { i2c },
            current_gain: None,
            current_integration: None,
        }
    }

    /// Verify the device ID and bring the sensor out of shutdown
    pub fn init(&mut self) -> Result<(), Error<E>> {
        let (id, _) = self.get_device_id()?;
        if id != ll::DEVICE_ID {
            return Err(Error::InvalidDeviceId {
                expected: ll::DEVICE_ID,
                found: id,
            });
        }
        self.enable(true)
    }

    /// Leave or enter shutdown
    pub fn enable(&mut self, enable: bool) -> Result<(), Error<E>> {
        let bits = if enable { 0 } else { ll::SHUTDOWN };
        self.update_conf(ll::SHUTDOWN, bits)
    }

    /// Set the analog gain
    pub fn set_gain(&mut self, gain: GainLevel) -> Result<(), Error<E>> {
        let result = self.update_conf(ll::GAIN_MASK, ll::gain_bits(gain));
        if result.is_ok() {
            self.current_gain = Some(gain);
        }
        result
    }

    /// Set the integration time
    pub fn set_integration(&mut self, integration: IntegrationLevel) -> Result<(), Error<E>> {
        let result = self.update_conf(ll::IT_MASK, ll::integration_bits(integration));
        if result.is_ok() {
            self.current_integration = Some(integration);
        }
        result
    }

    /// Set the interrupt persistence protection
    pub fn set_persistence(&mut self, persistence: PersistenceLevel) -> Result<(), Error<E>> {
        self.update_conf(ll::PERS_MASK, ll::persistence_bits(persistence))
    }

    /// Read the gain from the device
    pub fn get_gain(&mut self) -> Result<GainLevel, Error<E>> {
        let conf = self.iface.read_register(ll::ALS_CONF)?;
        let gain = ll::gain_from_bits(conf);
        self.current_gain = Some(gain);
        Ok(gain)
    }

    /// Read the integration time from the device
    pub fn get_integration(&mut self) -> Result<IntegrationLevel, Error<E>> {
        let conf = self.iface.read_register(ll::ALS_CONF)?;
        let integration = ll::integration_from_bits(conf)
            .ok_or(Error::InvalidConfig("undefined integration time code"))?;
        self.current_integration = Some(integration);
        Ok(integration)
    }

    /// Raw ambient light count
    pub fn read_ambient(&mut self) -> Result<u16, Error<E>> {
        Ok(self.iface.read_register(ll::ALS)?)
    }

    /// Raw white channel count
    pub fn read_white(&mut self) -> Result<u16, Error<E>> {
        Ok(self.iface.read_register(ll::WHITE)?)
    }

    /// Read the ambient count and convert it to lux for the current setting
    pub fn read_lux(&mut self) -> Result<f64, Error<E>> {
        // Use cached gain and integration if available, otherwise read from device
        let gain = match self.current_gain {
            Some(gain) => gain,
            None => self.get_gain()?,
        };
        let integration = match self.current_integration {
            Some(integration) => integration,
            None => self.get_integration()?,
        };

        let ambient = self.read_ambient()?;
        Ok(ambient as f64 * RangeState::new(gain, integration).resolution())
    }

    /// Get the device ID and the address option code
    pub fn get_device_id(&mut self) -> Result<(u8, u8), Error<E>> {
        let [id, option] = self.iface.read_register(ll::ID)?.to_le_bytes();
        Ok((id, option))
    }

    /// Destroy the driver and return the I2C interface
    pub fn destroy(self) -> I2C {
        self.iface.i2c
    }

    fn update_conf(&mut self, mask: u16, bits: u16) -> Result<(), Error<E>> {
        let conf = self.iface.read_register(ll::ALS_CONF)?;
        self.iface
            .write_register(ll::ALS_CONF, (conf & !mask) | (bits & mask))?;
        Ok(())
    }
}

impl<I2C, E> DevicePort for Veml7700<I2C>
where
    I2C: I2c<Error = E>,
{
    type Error = Error<E>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.init()
    }

    fn power_on(&mut self) -> Result<(), Self::Error> {
        self.enable(true)
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.enable(false)
    }

    fn ambient_light(&mut self) -> Result<u16, Self::Error> {
        self.read_ambient()
    }

    fn white_level(&mut self) -> Result<u16, Self::Error> {
        self.read_white()
    }

    fn lux(&mut self) -> Result<f64, Self::Error> {
        self.read_lux()
    }

    fn set_gain(&mut self, gain: GainLevel) -> Result<(), Self::Error> {
        Veml7700::set_gain(self, gain)
    }

    fn set_integration(&mut self, integration: IntegrationLevel) -> Result<(), Self::Error> {
        Veml7700::set_integration(self, integration)
    }

    fn set_persistence(&mut self, persistence: PersistenceLevel) -> Result<(), Self::Error> {
        Veml7700::set_persistence(self, persistence)
    }

    fn integration(&mut self) -> Result<IntegrationLevel, Self::Error> {
        self.get_integration()
    }

    fn gain(&mut self) -> Result<GainLevel, Self::Error> {
        self.get_gain()
    }
}
