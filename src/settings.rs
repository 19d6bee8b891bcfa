//! Gain, integration time and persistence settings
//!
//! Each axis is an ordered enumeration with a fixed index, so the ranging
//! search can step through it without touching the human-readable labels.
//! Labels are only used at the configuration boundary.

use core::fmt;
use core::str::FromStr;

/// Lux per count at 2x gain and 800ms integration (datasheet rev. 1.7)
pub const MAX_RESOLUTION: f64 = 0.0036;

/// A label that does not name any known setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct UnknownLabel;

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown setting label")
    }
}

/// Analog gain, ordered from least to most sensitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum GainLevel {
    /// 1/8x gain
    #[cfg_attr(feature = "config", serde(rename = "1/8x"))]
    Gain1_8x = 0,
    /// 1/4x gain
    #[cfg_attr(feature = "config", serde(rename = "1/4x"))]
    Gain1_4x = 1,
    /// 1x gain
    #[cfg_attr(feature = "config", serde(rename = "1x"))]
    Gain1x = 2,
    /// 2x gain
    #[cfg_attr(feature = "config", serde(rename = "2x"))]
    Gain2x = 3,
}

impl GainLevel {
    /// Every gain level in index order
    pub const ALL: [GainLevel; 4] = [
        GainLevel::Gain1_8x,
        GainLevel::Gain1_4x,
        GainLevel::Gain1x,
        GainLevel::Gain2x,
    ];

    /// Position of this level in [`GainLevel::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Level at `index`, if there is one
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Configuration label, e.g. `"1/8x"`
    pub const fn label(self) -> &'static str {
        match self {
            GainLevel::Gain1_8x => "1/8x",
            GainLevel::Gain1_4x => "1/4x",
            GainLevel::Gain1x => "1x",
            GainLevel::Gain2x => "2x",
        }
    }

    /// Sensitivity multiplier of the analog front end
    pub const fn multiplier(self) -> f64 {
        match self {
            GainLevel::Gain1_8x => 0.125,
            GainLevel::Gain1_4x => 0.25,
            GainLevel::Gain1x => 1.0,
            GainLevel::Gain2x => 2.0,
        }
    }

    /// Next more sensitive level
    pub fn up(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Next less sensitive level
    pub fn down(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl FromStr for GainLevel {
    type Err = UnknownLabel;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.label() == label)
            .ok_or(UnknownLabel)
    }
}

impl fmt::Display for GainLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Integration time, ordered from shortest to longest
///
/// The period doubles with every step from the 25ms baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegrationLevel {
    /// 25ms integration time
    #[cfg_attr(feature = "config", serde(rename = "25ms"))]
    Ms25 = 0,
    /// 50ms integration time
    #[cfg_attr(feature = "config", serde(rename = "50ms"))]
    Ms50 = 1,
    /// 100ms integration time
    #[cfg_attr(feature = "config", serde(rename = "100ms"))]
    Ms100 = 2,
    /// 200ms integration time
    #[cfg_attr(feature = "config", serde(rename = "200ms"))]
    Ms200 = 3,
    /// 400ms integration time
    #[cfg_attr(feature = "config", serde(rename = "400ms"))]
    Ms400 = 4,
    /// 800ms integration time
    #[cfg_attr(feature = "config", serde(rename = "800ms"))]
    Ms800 = 5,
}

impl IntegrationLevel {
    /// Every integration level in index order
    pub const ALL: [IntegrationLevel; 6] = [
        IntegrationLevel::Ms25,
        IntegrationLevel::Ms50,
        IntegrationLevel::Ms100,
        IntegrationLevel::Ms200,
        IntegrationLevel::Ms400,
        IntegrationLevel::Ms800,
    ];

    /// Position of this level in [`IntegrationLevel::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Level at `index`, if there is one
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Configuration label, e.g. `"25ms"`
    pub const fn label(self) -> &'static str {
        match self {
            IntegrationLevel::Ms25 => "25ms",
            IntegrationLevel::Ms50 => "50ms",
            IntegrationLevel::Ms100 => "100ms",
            IntegrationLevel::Ms200 => "200ms",
            IntegrationLevel::Ms400 => "400ms",
            IntegrationLevel::Ms800 => "800ms",
        }
    }

    /// One integration period in milliseconds: 25ms x 2^index
    pub const fn period_ms(self) -> u32 {
        25 << self.index()
    }

    /// Time for a fresh conversion to land after power-on: two periods
    pub const fn settle_ms(self) -> u32 {
        25 << (self.index() + 1)
    }

    /// Next longer integration time
    pub fn up(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Next shorter integration time
    pub fn down(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl FromStr for IntegrationLevel {
    type Err = UnknownLabel;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.label() == label)
            .ok_or(UnknownLabel)
    }
}

impl fmt::Display for IntegrationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of consecutive out-of-threshold samples before the interrupt latches
///
/// Passed through to the device; the ranging search never touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum PersistenceLevel {
    /// Every sample
    #[cfg_attr(feature = "config", serde(rename = "1"))]
    Samples1 = 0,
    /// 2 consecutive samples
    #[cfg_attr(feature = "config", serde(rename = "2"))]
    Samples2 = 1,
    /// 4 consecutive samples
    #[cfg_attr(feature = "config", serde(rename = "4"))]
    Samples4 = 2,
    /// 8 consecutive samples
    #[cfg_attr(feature = "config", serde(rename = "8"))]
    Samples8 = 3,
}

impl PersistenceLevel {
    /// Every persistence level in index order
    pub const ALL: [PersistenceLevel; 4] = [
        PersistenceLevel::Samples1,
        PersistenceLevel::Samples2,
        PersistenceLevel::Samples4,
        PersistenceLevel::Samples8,
    ];

    /// Position of this level in [`PersistenceLevel::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Level at `index`, if there is one
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Configuration label, e.g. `"4"`
    pub const fn label(self) -> &'static str {
        match self {
            PersistenceLevel::Samples1 => "1",
            PersistenceLevel::Samples2 => "2",
            PersistenceLevel::Samples4 => "4",
            PersistenceLevel::Samples8 => "8",
        }
    }

    /// Number of samples
    pub const fn samples(self) -> u8 {
        1 << self.index()
    }
}

impl FromStr for PersistenceLevel {
    type Err = UnknownLabel;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.label() == label)
            .ok_or(UnknownLabel)
    }
}

impl fmt::Display for PersistenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gain and integration time currently applied to the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RangeState {
    /// Analog gain
    pub gain: GainLevel,
    /// Integration time
    pub integration: IntegrationLevel,
}

impl RangeState {
    /// 2x gain, 800ms: nothing picks up more light
    pub const MOST_SENSITIVE: Self = Self::new(GainLevel::Gain2x, IntegrationLevel::Ms800);

    /// 1/8x gain, 25ms: nothing picks up less light
    pub const LEAST_SENSITIVE: Self = Self::new(GainLevel::Gain1_8x, IntegrationLevel::Ms25);

    /// Number of valid (gain, integration) combinations
    pub const LATTICE_SIZE: usize = GainLevel::ALL.len() * IntegrationLevel::ALL.len();

    /// Create a new range state
    pub const fn new(gain: GainLevel, integration: IntegrationLevel) -> Self {
        Self { gain, integration }
    }

    /// One step more sensitive, raising gain before integration time
    pub fn more_sensitive(self) -> Option<Self> {
        if let Some(gain) = self.gain.up() {
            Some(Self { gain, ..self })
        } else {
            self.integration
                .up()
                .map(|integration| Self { integration, ..self })
        }
    }

    /// One step less sensitive, lowering gain before integration time
    pub fn less_sensitive(self) -> Option<Self> {
        if let Some(gain) = self.gain.down() {
            Some(Self { gain, ..self })
        } else {
            self.integration
                .down()
                .map(|integration| Self { integration, ..self })
        }
    }

    /// Lux represented by one ambient count at this setting
    pub fn resolution(self) -> f64 {
        let integration_factor = IntegrationLevel::Ms800.period_ms() / self.integration.period_ms();
        let gain_factor = GainLevel::Gain2x.multiplier() / self.gain.multiplier();
        MAX_RESOLUTION * integration_factor as f64 * gain_factor
    }
}

/// Sensor configuration
///
/// Created at startup from a stored document or defaults and mutated in
/// place. With `auto_adjust` set, the ranging search overwrites `gain` and
/// `integration` with every setting it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SensorConfig {
    /// Re-range before every measurement
    pub auto_adjust: bool,
    /// Analog gain
    pub gain: GainLevel,
    /// Integration time
    pub integration: IntegrationLevel,
    /// Interrupt persistence protection
    pub persistence: PersistenceLevel,
    /// Correct lux for the non-linearity at high lux and low gain
    pub lux_compensation: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            auto_adjust: false,
            gain: GainLevel::Gain1_4x,
            integration: IntegrationLevel::Ms100,
            persistence: PersistenceLevel::Samples1,
            lux_compensation: true,
        }
    }
}

impl SensorConfig {
    /// Gain and integration time as one value
    pub const fn range_state(&self) -> RangeState {
        RangeState::new(self.gain, self.integration)
    }

    /// Overwrite gain and integration time
    pub fn set_range_state(&mut self, state: RangeState) {
        self.gain = state.gain;
        self.integration = state.integration;
    }
}
