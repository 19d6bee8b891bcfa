//! Auto-ranging controller
//!
//! Keeps the raw ambient count inside a usable band by stepping gain and
//! integration time. Every trial setting needs a power cycle and a settle
//! delay proportional to the integration time, so the search prefers gain
//! changes and only ever moves in one direction once it has started.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::port::DevicePort;
use crate::settings::{GainLevel, IntegrationLevel, RangeState, SensorConfig};
use crate::SensorError;

/// Integration time used for the reset trial
const PROBE_INTEGRATION: IntegrationLevel = IntegrationLevel::Ms100;

/// Target band and search tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RangingPolicy {
    /// Readings at or below this count are too dark
    pub min: u16,
    /// Readings above this count are too bright
    pub max: u16,
    /// Shift gain by two steps before the reset trial
    pub coarse_jump: bool,
}

impl Default for RangingPolicy {
    fn default() -> Self {
        Self {
            min: 100,
            max: 10_000,
            coarse_jump: true,
        }
    }
}

impl RangingPolicy {
    /// Which way the sensitivity has to move for `ambient`, if at all
    pub fn classify(&self, ambient: u16) -> Option<Exposure> {
        if ambient <= self.min {
            Some(Exposure::TooDark)
        } else if ambient > self.max {
            Some(Exposure::TooBright)
        } else {
            None
        }
    }
}

/// An out-of-band reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Exposure {
    /// Needs more sensitivity
    TooDark,
    /// Needs less sensitivity
    TooBright,
}

impl Exposure {
    /// Whether `state` already is the extreme this exposure pushes towards
    pub fn is_exhausted(self, state: RangeState) -> bool {
        match self {
            Exposure::TooDark => state == RangeState::MOST_SENSITIVE,
            Exposure::TooBright => state == RangeState::LEAST_SENSITIVE,
        }
    }

    fn step(self, state: RangeState) -> Option<RangeState> {
        match self {
            Exposure::TooDark => state.more_sensitive(),
            Exposure::TooBright => state.less_sensitive(),
        }
    }
}

/// How a re-ranging pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum RangeOutcome {
    /// The reading was already in band; nothing was touched
    InRange,
    /// The reading was brought into band
    Settled,
    /// A hardware extreme was reached without reaching the band
    Maxed,
    /// A single step carried the reading across the whole band
    Overshot,
}

/// Result of [`RangeController::rerange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Adjustment {
    /// Setting applied to the hardware when the pass ended
    pub state: RangeState,
    /// Why the pass ended
    pub outcome: RangeOutcome,
    /// Last ambient count seen
    pub ambient: u16,
    /// Number of power-cycled trial settings
    pub trials: u8,
}

/// Owns the device and searches gain/integration combinations for it
pub struct RangeController<D, Delay> {
    device: D,
    delay: Delay,
    config: SensorConfig,
    policy: RangingPolicy,
}

impl<D, Delay> RangeController<D, Delay>
where
    D: DevicePort,
    Delay: DelayNs,
{
    /// Create a controller with the default target band
    pub fn new(device: D, delay: Delay, config: SensorConfig) -> Self {
        Self::with_policy(device, delay, config, RangingPolicy::default())
    }

    /// Create a controller with a custom target band
    pub fn with_policy(device: D, delay: Delay, config: SensorConfig, policy: RangingPolicy) -> Self {
        Self {
            device,
            delay,
            config,
            policy,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Setting currently applied to the hardware
    pub fn state(&self) -> RangeState {
        self.config.range_state()
    }

    /// Target band and tuning
    pub fn policy(&self) -> &RangingPolicy {
        &self.policy
    }

    /// Mutable access to the device, for reads outside a ranging pass
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Give back the device and the delay
    pub fn release(self) -> (D, Delay) {
        (self.device, self.delay)
    }

    /// Initialize the device and apply the whole configuration to it
    pub fn begin(&mut self) -> Result<(), SensorError<D::Error>> {
        self.device.begin().map_err(SensorError::Init)?;
        self.write_config(self.config)?;

        // Adopt what the hardware reports so the state mirrors it
        let gain = self.device.gain().map_err(SensorError::Init)?;
        let integration = self.device.integration().map_err(SensorError::Init)?;
        if gain != self.config.gain || integration != self.config.integration {
            warn!(
                "device reports {}/{} after applying {}/{}",
                gain,
                integration,
                self.config.gain,
                self.config.integration
            );
            self.config.set_range_state(RangeState::new(gain, integration));
        }
        Ok(())
    }

    /// Replace the configuration and write it to the device
    ///
    /// On failure the previous configuration is kept.
    pub fn apply_config(&mut self, config: SensorConfig) -> Result<(), SensorError<D::Error>> {
        self.write_config(config)?;
        self.config = config;
        Ok(())
    }

    /// Swap the configuration without touching the hardware; `begin` applies it
    #[cfg(feature = "config")]
    pub(crate) fn replace_config(&mut self, config: SensorConfig) {
        self.config = config;
    }

    fn write_config(&mut self, config: SensorConfig) -> Result<(), SensorError<D::Error>> {
        self.device
            .set_persistence(config.persistence)
            .map_err(SensorError::Apply)?;
        self.device
            .set_gain(config.gain)
            .map_err(SensorError::Apply)?;
        self.device
            .set_integration(config.integration)
            .map_err(SensorError::Apply)
    }

    /// Bring `ambient` into the target band
    ///
    /// In-band readings return immediately without touching the hardware.
    /// Otherwise the gain is shifted by two steps, integration is reset to
    /// 100ms, and single steps follow in the direction the reading demands,
    /// gain first, until the reading is in band or a hardware extreme is hit.
    /// May block for several seconds when crossing the whole range.
    ///
    /// Once a direction is chosen the pass never reverses. A single step that
    /// carries the reading across the whole band ends the pass as
    /// [`RangeOutcome::Overshot`] with an out-of-band reading even though the
    /// hardware is not at an extreme; the next pass starts from there.
    ///
    /// A failed write abandons the pass with the sensor powered back on; the
    /// configuration then holds exactly what reached the hardware.
    pub fn rerange(&mut self, ambient: u16) -> Result<Adjustment, SensorError<D::Error>> {
        let start = self.state();
        let Some(exposure) = self.policy.classify(ambient) else {
            return Ok(Adjustment {
                state: start,
                outcome: RangeOutcome::InRange,
                ambient,
                trials: 0,
            });
        };

        if exposure.is_exhausted(start) {
            info!("{:?} at {}/{}, nothing left to adjust", exposure, start.gain, start.integration);
            return Ok(Adjustment {
                state: start,
                outcome: RangeOutcome::Maxed,
                ambient,
                trials: 0,
            });
        }

        let jumped = if self.policy.coarse_jump {
            RangeState {
                gain: coarse_gain(start.gain),
                ..start
            }
        } else {
            start
        };

        // Landing on the extreme leaves nothing to search
        if exposure.is_exhausted(jumped) {
            let ambient = self.trial(jumped)?;
            let outcome = match self.policy.classify(ambient) {
                None => RangeOutcome::Settled,
                Some(_) => {
                    info!("{:?}, coarse jump landed on {}/{}", exposure, jumped.gain, jumped.integration);
                    RangeOutcome::Maxed
                }
            };
            return Ok(Adjustment {
                state: jumped,
                outcome,
                ambient,
                trials: 1,
            });
        }

        let mut state = RangeState {
            integration: PROBE_INTEGRATION,
            ..jumped
        };
        let mut ambient = self.trial(state)?;
        let mut trials = 1;

        let Some(direction) = self.policy.classify(ambient) else {
            return Ok(Adjustment {
                state,
                outcome: RangeOutcome::Settled,
                ambient,
                trials,
            });
        };

        let outcome = loop {
            match self.policy.classify(ambient) {
                None => break RangeOutcome::Settled,
                Some(exposure) if exposure != direction => {
                    info!("stepping {:?} overshot to {}", direction, ambient);
                    break RangeOutcome::Overshot;
                }
                Some(_) => {}
            }
            let Some(next) = direction.step(state) else {
                info!("{:?} at {}/{}, range exhausted", direction, state.gain, state.integration);
                break RangeOutcome::Maxed;
            };
            ambient = self.trial(next)?;
            state = next;
            trials += 1;
        };

        Ok(Adjustment {
            state,
            outcome,
            ambient,
            trials,
        })
    }

    /// Power-cycle into `next` and return the first settled ambient count
    ///
    /// A failed write still powers the sensor back on, and whatever part of
    /// `next` did reach the device is committed.
    fn trial(&mut self, next: RangeState) -> Result<u16, SensorError<D::Error>> {
        let current = self.state();

        self.device.shutdown().map_err(SensorError::Apply)?;
        // Let the pending conversion finish
        self.delay.delay_ms(current.integration.period_ms());
        if let Err(e) = self.write_range(current, next) {
            if self.device.power_on().is_err() {
                warn!("sensor left in shutdown after a failed settings write");
            }
            return Err(SensorError::Apply(e));
        }
        self.device.power_on().map_err(SensorError::Apply)?;

        self.delay.delay_ms(next.integration.settle_ms());
        let ambient = self.device.ambient_light().map_err(SensorError::Read)?;
        debug!("trial {}/{} -> {}", next.gain, next.integration, ambient);
        Ok(ambient)
    }

    /// Write the axes that differ, committing each one as soon as it is applied
    fn write_range(&mut self, current: RangeState, next: RangeState) -> Result<(), D::Error> {
        if next.gain != current.gain {
            self.device.set_gain(next.gain)?;
            self.config.gain = next.gain;
        }
        if next.integration != current.integration {
            self.device.set_integration(next.integration)?;
            self.config.integration = next.integration;
        }
        Ok(())
    }
}

/// Two gain steps up from the bottom half, two down from the top half
fn coarse_gain(gain: GainLevel) -> GainLevel {
    let index = gain.index();
    let jumped = if index < 2 { index + 2 } else { index - 2 };
    GainLevel::from_index(jumped).unwrap_or(gain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_bounds() {
        let policy = RangingPolicy::default();
        assert_eq!(policy.classify(0), Some(Exposure::TooDark));
        assert_eq!(policy.classify(100), Some(Exposure::TooDark));
        assert_eq!(policy.classify(101), None);
        assert_eq!(policy.classify(10_000), None);
        assert_eq!(policy.classify(10_001), Some(Exposure::TooBright));
        assert_eq!(policy.classify(u16::MAX), Some(Exposure::TooBright));
    }

    #[test]
    fn test_coarse_gain_flips_half() {
        assert_eq!(coarse_gain(GainLevel::Gain1_8x), GainLevel::Gain1x);
        assert_eq!(coarse_gain(GainLevel::Gain1_4x), GainLevel::Gain2x);
        assert_eq!(coarse_gain(GainLevel::Gain1x), GainLevel::Gain1_8x);
        assert_eq!(coarse_gain(GainLevel::Gain2x), GainLevel::Gain1_4x);
    }

    #[test]
    fn test_exhausted_only_at_matching_extreme() {
        assert!(Exposure::TooDark.is_exhausted(RangeState::MOST_SENSITIVE));
        assert!(!Exposure::TooDark.is_exhausted(RangeState::LEAST_SENSITIVE));
        assert!(Exposure::TooBright.is_exhausted(RangeState::LEAST_SENSITIVE));
        assert!(!Exposure::TooBright.is_exhausted(RangeState::new(
            GainLevel::Gain1_8x,
            IntegrationLevel::Ms50
        )));
    }
}
