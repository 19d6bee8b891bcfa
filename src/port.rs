//! Device port - the hardware seen by the ranging controller
//!
//! The controller never talks to the bus directly. Anything that implements
//! [`DevicePort`] can be ranged: the [`Veml7700`](crate::Veml7700) I2C driver
//! on real hardware, or a simulated sensor in tests.

use crate::settings::{GainLevel, IntegrationLevel, PersistenceLevel};

/// Port for an ambient light sensor with switchable gain and integration time
///
/// Every operation reports failure explicitly; callers never assume a write
/// went through.
pub trait DevicePort {
    /// Error returned by the underlying transport
    type Error;

    /// Probe and initialize the device
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Leave shutdown and start converting
    fn power_on(&mut self) -> Result<(), Self::Error>;

    /// Stop converting; settings may only be changed while shut down
    fn shutdown(&mut self) -> Result<(), Self::Error>;

    /// Raw ambient light count
    fn ambient_light(&mut self) -> Result<u16, Self::Error>;

    /// Raw white channel count
    fn white_level(&mut self) -> Result<u16, Self::Error>;

    /// Illuminance computed by the device for the current setting
    fn lux(&mut self) -> Result<f64, Self::Error>;

    /// Apply an analog gain
    fn set_gain(&mut self, gain: GainLevel) -> Result<(), Self::Error>;

    /// Apply an integration time
    fn set_integration(&mut self, integration: IntegrationLevel) -> Result<(), Self::Error>;

    /// Apply an interrupt persistence
    fn set_persistence(&mut self, persistence: PersistenceLevel) -> Result<(), Self::Error>;

    /// Integration time the device reports
    fn integration(&mut self) -> Result<IntegrationLevel, Self::Error>;

    /// Gain the device reports
    fn gain(&mut self) -> Result<GainLevel, Self::Error>;
}

impl<T: DevicePort + ?Sized> DevicePort for &mut T {
    type Error = T::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        T::begin(self)
    }

    fn power_on(&mut self) -> Result<(), Self::Error> {
        T::power_on(self)
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        T::shutdown(self)
    }

    fn ambient_light(&mut self) -> Result<u16, Self::Error> {
        T::ambient_light(self)
    }

    fn white_level(&mut self) -> Result<u16, Self::Error> {
        T::white_level(self)
    }

    fn lux(&mut self) -> Result<f64, Self::Error> {
        T::lux(self)
    }

    fn set_gain(&mut self, gain: GainLevel) -> Result<(), Self::Error> {
        T::set_gain(self, gain)
    }

    fn set_integration(&mut self, integration: IntegrationLevel) -> Result<(), Self::Error> {
        T::set_integration(self, integration)
    }

    fn set_persistence(&mut self, persistence: PersistenceLevel) -> Result<(), Self::Error> {
        T::set_persistence(self, persistence)
    }

    fn integration(&mut self) -> Result<IntegrationLevel, Self::Error> {
        T::integration(self)
    }

    fn gain(&mut self) -> Result<GainLevel, Self::Error> {
        T::gain(self)
    }
}
