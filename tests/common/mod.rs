//! Simulated VEML7700 for driving the controller without hardware

#![allow(dead_code)]

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use veml7700_autorange::{DevicePort, GainLevel, IntegrationLevel, PersistenceLevel, RangeState};

/// Anything the simulated device was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Begin,
    PowerOn,
    Shutdown,
    SetGain(GainLevel),
    SetIntegration(IntegrationLevel),
    SetPersistence(PersistenceLevel),
}

impl Op {
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Op::SetGain(_) | Op::SetIntegration(_) | Op::SetPersistence(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    NotDetected,
    Nack,
}

/// A sensor looking at a scene of fixed illuminance
///
/// Counts follow the datasheet resolution for the applied setting and clip at
/// the 16-bit maximum. Scripted readings, when queued, are served first.
pub struct SimDevice {
    pub state: RangeState,
    pub persistence: PersistenceLevel,
    pub powered: bool,
    pub present: bool,
    pub scene_lux: f64,
    pub scripted: VecDeque<u16>,
    pub ops: Vec<Op>,
    /// Setting in effect at every power-on
    pub applied: Vec<RangeState>,
    pub fail_set_gain: bool,
    pub fail_set_integration: bool,
}

impl SimDevice {
    pub fn new(state: RangeState, scene_lux: f64) -> Self {
        Self {
            state,
            persistence: PersistenceLevel::Samples1,
            powered: true,
            present: true,
            scene_lux,
            scripted: VecDeque::new(),
            ops: Vec::new(),
            applied: Vec::new(),
            fail_set_gain: false,
            fail_set_integration: false,
        }
    }

    /// Counts the scene produces at the current setting
    pub fn modelled_counts(&self) -> u16 {
        counts_for(self.scene_lux, self.state)
    }

    pub fn writes(&self) -> Vec<Op> {
        self.ops.iter().copied().filter(|op| op.is_write()).collect()
    }
}

pub fn counts_for(scene_lux: f64, state: RangeState) -> u16 {
    (scene_lux / state.resolution()).round().min(u16::MAX as f64) as u16
}

impl DevicePort for SimDevice {
    type Error = SimError;

    fn begin(&mut self) -> Result<(), SimError> {
        self.ops.push(Op::Begin);
        if !self.present {
            return Err(SimError::NotDetected);
        }
        self.powered = true;
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), SimError> {
        self.ops.push(Op::PowerOn);
        self.powered = true;
        self.applied.push(self.state);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SimError> {
        self.ops.push(Op::Shutdown);
        self.powered = false;
        Ok(())
    }

    fn ambient_light(&mut self) -> Result<u16, SimError> {
        Ok(self
            .scripted
            .pop_front()
            .unwrap_or_else(|| self.modelled_counts()))
    }

    fn white_level(&mut self) -> Result<u16, SimError> {
        let white = self.modelled_counts() as u32 * 6 / 5;
        Ok(white.min(u16::MAX as u32) as u16)
    }

    fn lux(&mut self) -> Result<f64, SimError> {
        Ok(self.modelled_counts() as f64 * self.state.resolution())
    }

    fn set_gain(&mut self, gain: GainLevel) -> Result<(), SimError> {
        if self.fail_set_gain {
            return Err(SimError::Nack);
        }
        self.ops.push(Op::SetGain(gain));
        self.state.gain = gain;
        Ok(())
    }

    fn set_integration(&mut self, integration: IntegrationLevel) -> Result<(), SimError> {
        if self.fail_set_integration {
            return Err(SimError::Nack);
        }
        self.ops.push(Op::SetIntegration(integration));
        self.state.integration = integration;
        Ok(())
    }

    fn set_persistence(&mut self, persistence: PersistenceLevel) -> Result<(), SimError> {
        self.ops.push(Op::SetPersistence(persistence));
        self.persistence = persistence;
        Ok(())
    }

    fn integration(&mut self) -> Result<IntegrationLevel, SimError> {
        Ok(self.state.integration)
    }

    fn gain(&mut self) -> Result<GainLevel, SimError> {
        Ok(self.state.gain)
    }
}

/// Records every requested delay in milliseconds instead of sleeping
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}
