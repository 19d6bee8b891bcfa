//! Low-level register and interface definitions for the VEML7700

use embedded_hal::i2c::I2c;

use crate::settings::{GainLevel, IntegrationLevel, PersistenceLevel};

/// I2C address of the VEML7700
pub const I2C_ADDRESS: u8 = 0x10;

/// Expected low byte of the ID register
pub const DEVICE_ID: u8 = 0x81;

// Command codes
pub(crate) const ALS_CONF: u8 = 0x00;
pub(crate) const ALS: u8 = 0x04;
pub(crate) const WHITE: u8 = 0x05;
pub(crate) const ID: u8 = 0x07;

// ALS_CONF fields
pub(crate) const SHUTDOWN: u16 = 0x0001;
pub(crate) const PERS_SHIFT: u16 = 4;
pub(crate) const PERS_MASK: u16 = 0b11 << PERS_SHIFT;
pub(crate) const IT_SHIFT: u16 = 6;
pub(crate) const IT_MASK: u16 = 0b1111 << IT_SHIFT;
pub(crate) const GAIN_SHIFT: u16 = 11;
pub(crate) const GAIN_MASK: u16 = 0b11 << GAIN_SHIFT;

/// Device interface error types
#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DeviceInterfaceError<I2cError> {
    /// I2C communication error
    I2c(I2cError),
}

/// Register access over I2C
///
/// Every VEML7700 register is a 16-bit little-endian word.
#[derive(Debug)]
pub struct DeviceInterface<I2c> {
    /// The I2C interface
    pub i2c: I2c,
}

impl<I2cTrait: I2c> DeviceInterface<I2cTrait> {
    /// Read one register
    pub fn read_register(
        &mut self,
        address: u8,
    ) -> Result<u16, DeviceInterfaceError<I2cTrait::Error>> {
        let mut data = [0u8; 2];
        self.i2c
            .write_read(I2C_ADDRESS, &[address], &mut data)
            .map_err(DeviceInterfaceError::I2c)?;
        Ok(u16::from_le_bytes(data))
    }

    /// Write one register
    pub fn write_register(
        &mut self,
        address: u8,
        value: u16,
    ) -> Result<(), DeviceInterfaceError<I2cTrait::Error>> {
        let [lsb, msb] = value.to_le_bytes();
        self.i2c
            .write(I2C_ADDRESS, &[address, lsb, msb])
            .map_err(DeviceInterfaceError::I2c)
    }
}

/// ALS_GAIN field value for a gain level
pub(crate) const fn gain_bits(gain: GainLevel) -> u16 {
    let code = match gain {
        GainLevel::Gain1x => 0b00,
        GainLevel::Gain2x => 0b01,
        GainLevel::Gain1_8x => 0b10,
        GainLevel::Gain1_4x => 0b11,
    };
    code << GAIN_SHIFT
}

pub(crate) const fn gain_from_bits(conf: u16) -> GainLevel {
    match (conf & GAIN_MASK) >> GAIN_SHIFT {
        0b00 => GainLevel::Gain1x,
        0b01 => GainLevel::Gain2x,
        0b10 => GainLevel::Gain1_8x,
        _ => GainLevel::Gain1_4x,
    }
}

/// ALS_IT field value for an integration level
pub(crate) const fn integration_bits(integration: IntegrationLevel) -> u16 {
    let code = match integration {
        IntegrationLevel::Ms25 => 0b1100,
        IntegrationLevel::Ms50 => 0b1000,
        IntegrationLevel::Ms100 => 0b0000,
        IntegrationLevel::Ms200 => 0b0001,
        IntegrationLevel::Ms400 => 0b0010,
        IntegrationLevel::Ms800 => 0b0011,
    };
    code << IT_SHIFT
}

/// Decode ALS_IT; the datasheet leaves the remaining codes undefined
pub(crate) const fn integration_from_bits(conf: u16) -> Option<IntegrationLevel> {
    match (conf & IT_MASK) >> IT_SHIFT {
        0b1100 => Some(IntegrationLevel::Ms25),
        0b1000 => Some(IntegrationLevel::Ms50),
        0b0000 => Some(IntegrationLevel::Ms100),
        0b0001 => Some(IntegrationLevel::Ms200),
        0b0010 => Some(IntegrationLevel::Ms400),
        0b0011 => Some(IntegrationLevel::Ms800),
        _ => None,
    }
}

/// ALS_PERS field value for a persistence level
pub(crate) const fn persistence_bits(persistence: PersistenceLevel) -> u16 {
    (persistence.index() as u16) << PERS_SHIFT
}
