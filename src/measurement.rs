//! Measurement pipeline
//!
//! One call to [`LightSensor::measure`] re-ranges if enabled, reads the raw
//! channels and corrects the device lux for the sensor's non-linearity.

use embedded_hal::delay::DelayNs;

use crate::port::DevicePort;
use crate::ranging::{Adjustment, RangeController, RangingPolicy};
use crate::settings::{GainLevel, SensorConfig};
use crate::SensorError;

/// Kind of sensor, as reported to consumers of the channels
pub const SENSOR_TYPE: &str = "Ambient Light Sensor";

/// A named output value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Channel {
    /// Channel name
    pub name: &'static str,
    /// Unit of the value
    pub unit: &'static str,
}

/// Output channels, in the order of [`RawSample::values`]
pub const CHANNELS: [Channel; 3] = [
    Channel {
        name: "Ambient Light",
        unit: "raw",
    },
    Channel {
        name: "White Level",
        unit: "raw",
    },
    Channel {
        name: "Ambient Lux",
        unit: "lx",
    },
];

/// Lux above which the response curve always needs correcting
pub const COMPENSATION_THRESHOLD_LUX: f64 = 1000.0;

/// One measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RawSample {
    /// Raw ambient light count
    pub ambient: u16,
    /// Raw white channel count
    pub white: u16,
    /// Illuminance in lux, compensated if enabled
    pub lux: f64,
}

impl RawSample {
    /// Values in [`CHANNELS`] order
    pub fn values(&self) -> [f64; 3] {
        [self.ambient as f64, self.white as f64, self.lux]
    }
}

/// Whether the device lux needs the correction curve
pub fn needs_compensation(lux: f64, gain: GainLevel) -> bool {
    lux > COMPENSATION_THRESHOLD_LUX || matches!(gain, GainLevel::Gain1_8x | GainLevel::Gain1_4x)
}

/// Correct `lux` for the non-linearity at high illuminance and low gain
///
/// Readings at 1x or 2x gain up to 1000 lux are returned unchanged.
pub fn compensate_lux(lux: f64, gain: GainLevel) -> f64 {
    if needs_compensation(lux, gain) {
        correction_curve(lux)
    } else {
        lux
    }
}

/// Quartic fit from the Vishay application note
pub fn correction_curve(lux: f64) -> f64 {
    (((6.0135e-13 * lux - 9.3924e-9) * lux + 8.1488e-5) * lux + 1.0023) * lux
}

/// Ambient light sensor with optional auto-ranging and lux compensation
///
/// All access goes through `&mut self`, so measurements and reconfiguration
/// can never interleave with a ranging pass.
pub struct LightSensor<D, Delay> {
    controller: RangeController<D, Delay>,
    last_sample: Option<RawSample>,
    last_adjustment: Option<Adjustment>,
}

impl<D, Delay> LightSensor<D, Delay>
where
    D: DevicePort,
    Delay: DelayNs,
{
    /// Create a sensor with the default target band
    pub fn new(device: D, delay: Delay, config: SensorConfig) -> Self {
        Self::from_controller(RangeController::new(device, delay, config))
    }

    /// Create a sensor with a custom target band
    pub fn with_policy(device: D, delay: Delay, config: SensorConfig, policy: RangingPolicy) -> Self {
        Self::from_controller(RangeController::with_policy(device, delay, config, policy))
    }

    /// Wrap an existing controller
    pub fn from_controller(controller: RangeController<D, Delay>) -> Self {
        Self {
            controller,
            last_sample: None,
            last_adjustment: None,
        }
    }

    /// Initialize the device and apply the configuration
    pub fn begin(&mut self) -> Result<(), SensorError<D::Error>> {
        self.controller.begin()
    }

    /// Replace the configuration and write it to the device
    pub fn apply_config(&mut self, config: SensorConfig) -> Result<(), SensorError<D::Error>> {
        self.controller.apply_config(config)
    }

    /// Current configuration
    pub fn config(&self) -> &SensorConfig {
        self.controller.config()
    }

    #[cfg(feature = "config")]
    pub(crate) fn replace_config(&mut self, config: SensorConfig) {
        self.controller.replace_config(config);
    }

    /// The ranging controller
    pub fn controller(&self) -> &RangeController<D, Delay> {
        &self.controller
    }

    /// Take one measurement
    ///
    /// With auto-adjust enabled this first re-ranges on a fresh ambient
    /// reading, which may block while the hardware is power-cycled. The
    /// returned values are always read after any adjustment.
    pub fn measure(&mut self) -> Result<RawSample, SensorError<D::Error>> {
        if self.controller.config().auto_adjust {
            let ambient = self
                .controller
                .device_mut()
                .ambient_light()
                .map_err(SensorError::Read)?;
            self.last_adjustment = Some(self.controller.rerange(ambient)?);
        }

        let device = self.controller.device_mut();
        let ambient = device.ambient_light().map_err(SensorError::Read)?;
        let white = device.white_level().map_err(SensorError::Read)?;
        let mut lux = device.lux().map_err(SensorError::Read)?;

        let config = self.controller.config();
        if config.lux_compensation {
            lux = compensate_lux(lux, config.gain);
        }

        let sample = RawSample {
            ambient,
            white,
            lux,
        };
        self.last_sample = Some(sample);
        Ok(sample)
    }

    /// Most recent sample
    pub fn last_sample(&self) -> Option<RawSample> {
        self.last_sample
    }

    /// Most recent values in [`CHANNELS`] order, zero before the first measurement
    pub fn values(&self) -> [f64; 3] {
        self.last_sample
            .map(|sample| sample.values())
            .unwrap_or([0.0; 3])
    }

    /// Result of the most recent ranging pass
    pub fn last_adjustment(&self) -> Option<Adjustment> {
        self.last_adjustment
    }

    /// Give back the device and the delay
    pub fn release(self) -> (D, Delay) {
        self.controller.release()
    }
}
