//! Configuration documents and stores
//!
//! The configuration is kept as a small JSON document. Every setting is stored
//! with its current label and the list of labels it can take:
//!
//! ```json
//! {
//!   "Name": "Light",
//!   "autoAdjust": true,
//!   "Gain": { "current": "1/4x", "options": ["1/8x", "1/4x", "1x", "2x"] },
//!   "Integration": { "current": "100ms", "options": ["25ms", "50ms", "100ms", "200ms", "400ms", "800ms"] },
//!   "Persistence": { "current": "1", "options": ["1", "2", "4", "8"] },
//!   "luxCompensation": true
//! }
//! ```
//!
//! Missing keys fall back to [`SensorConfig::default`]; the option lists are
//! ignored on input.

use alloc::string::String;
use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::measurement::LightSensor;
use crate::port::DevicePort;
use crate::settings::{GainLevel, IntegrationLevel, PersistenceLevel, SensorConfig};
use crate::SensorError;

/// Name used when nothing else has been configured
pub const DEFAULT_NAME: &str = "VEML7700";

/// Storage for one serialized configuration document
///
/// This is only a load/save hook; where the document lives is up to the
/// implementation.
pub trait ConfigStore {
    /// Error returned by the backing storage
    type Error: fmt::Debug;

    /// Read the stored document, `None` if nothing has been stored yet
    fn read(&mut self) -> Result<Option<String>, Self::Error>;

    /// Replace the stored document
    fn write(&mut self, contents: &str) -> Result<(), Self::Error>;
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError<S> {
    /// The document is not valid JSON or names an unknown setting
    Parse(serde_json::Error),
    /// The store failed
    Store(S),
}

impl<S: fmt::Debug> fmt::Display for ConfigError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "malformed configuration: {}", e),
            ConfigError::Store(e) => write!(f, "configuration store failed: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<S: fmt::Debug> std::error::Error for ConfigError<S> {}

impl<S> From<serde_json::Error> for ConfigError<S> {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse(error)
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from the store
    Stored,
    /// Nothing usable was stored; defaults are in use
    Defaulted,
    /// The stored document was malformed and has been replaced by defaults
    Repaired,
}

/// A named sensor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    /// Display name of the sensor
    pub name: String,
    /// The settings
    pub config: SensorConfig,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, SensorConfig::default())
    }
}

impl ConfigDocument {
    /// Create a new document
    pub fn new(name: impl Into<String>, config: SensorConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let wire = WireDocument {
            name: &self.name,
            auto_adjust: self.config.auto_adjust,
            gain: Choice {
                current: self.config.gain,
                options: &GainLevel::ALL,
            },
            integration: Choice {
                current: self.config.integration,
                options: &IntegrationLevel::ALL,
            },
            persistence: Choice {
                current: self.config.persistence,
                options: &PersistenceLevel::ALL,
            },
            lux_compensation: self.config.lux_compensation,
        };
        serde_json::to_string(&wire)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let wire: IncomingDocument = serde_json::from_str(json)?;
        let defaults = SensorConfig::default();
        Ok(Self {
            name: wire.name.unwrap_or_else(|| String::from(DEFAULT_NAME)),
            config: SensorConfig {
                auto_adjust: wire.auto_adjust.unwrap_or(defaults.auto_adjust),
                gain: wire.gain.map_or(defaults.gain, |c| c.current),
                integration: wire.integration.map_or(defaults.integration, |c| c.current),
                persistence: wire.persistence.map_or(defaults.persistence, |c| c.current),
                lux_compensation: wire.lux_compensation.unwrap_or(defaults.lux_compensation),
            },
        })
    }

    /// Read a document from `store`, falling back to defaults
    ///
    /// A missing document is replaced by the defaults. A malformed one is
    /// logged and overwritten with the defaults as a repair. Failing to write
    /// the defaults is logged and otherwise ignored. A store that cannot be
    /// read is left untouched.
    pub fn load<S: ConfigStore>(store: &mut S) -> (Self, ConfigOrigin) {
        let fallback = Self::default();
        let origin = match store.read() {
            Ok(Some(contents)) => match Self::from_json(&contents) {
                Ok(document) => return (document, ConfigOrigin::Stored),
                Err(e) => {
                    warn!("stored configuration is malformed, using defaults: {}", e);
                    ConfigOrigin::Repaired
                }
            },
            Ok(None) => {
                info!("no stored configuration, writing defaults");
                ConfigOrigin::Defaulted
            }
            Err(e) => {
                warn!("reading configuration failed, using defaults: {:?}", e);
                return (fallback, ConfigOrigin::Defaulted);
            }
        };

        if let Err(e) = fallback.save(store) {
            warn!("could not store default configuration: {}", e);
        }
        (fallback, origin)
    }

    /// Serialize and write to `store`
    pub fn save<S: ConfigStore>(&self, store: &mut S) -> Result<(), ConfigError<S::Error>> {
        let json = self.to_json()?;
        store.write(&json).map_err(ConfigError::Store)
    }
}

#[derive(Serialize)]
struct Choice<T: 'static> {
    current: T,
    options: &'static [T],
}

#[derive(Serialize)]
struct WireDocument<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "autoAdjust")]
    auto_adjust: bool,
    #[serde(rename = "Gain")]
    gain: Choice<GainLevel>,
    #[serde(rename = "Integration")]
    integration: Choice<IntegrationLevel>,
    #[serde(rename = "Persistence")]
    persistence: Choice<PersistenceLevel>,
    #[serde(rename = "luxCompensation")]
    lux_compensation: bool,
}

#[derive(Deserialize)]
struct Current<T> {
    current: T,
}

#[derive(Deserialize)]
struct IncomingDocument {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "autoAdjust")]
    auto_adjust: Option<bool>,
    #[serde(rename = "Gain")]
    gain: Option<Current<GainLevel>>,
    #[serde(rename = "Integration")]
    integration: Option<Current<IntegrationLevel>>,
    #[serde(rename = "Persistence")]
    persistence: Option<Current<PersistenceLevel>>,
    #[serde(rename = "luxCompensation")]
    lux_compensation: Option<bool>,
}

/// Keeps the document in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryConfigStore {
    contents: Option<String>,
}

impl MemoryConfigStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `contents`
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    /// The stored document
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl ConfigStore for MemoryConfigStore {
    type Error = core::convert::Infallible;

    fn read(&mut self) -> Result<Option<String>, Self::Error> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), Self::Error> {
        self.contents = Some(String::from(contents));
        Ok(())
    }
}

#[cfg(feature = "std")]
mod file {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::string::String;

    use super::ConfigStore;

    /// File name used by the firmware this format comes from
    pub const DEFAULT_FILE_NAME: &str = "VEML7700LightSensor.json";

    /// Keeps the document in a file
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FileConfigStore {
        path: PathBuf,
    }

    impl FileConfigStore {
        /// Store at `path`
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// Store named [`DEFAULT_FILE_NAME`] inside `dir`
        pub fn in_dir(dir: impl AsRef<Path>) -> Self {
            Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
        }

        /// Path of the backing file
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl ConfigStore for FileConfigStore {
        type Error = io::Error;

        fn read(&mut self) -> Result<Option<String>, Self::Error> {
            match std::fs::read_to_string(&self.path) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            }
        }

        fn write(&mut self, contents: &str) -> Result<(), Self::Error> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, contents)
        }
    }
}

#[cfg(feature = "std")]
pub use file::{FileConfigStore, DEFAULT_FILE_NAME};

impl<D, Delay> LightSensor<D, Delay>
where
    D: DevicePort,
    Delay: DelayNs,
{
    /// Load the configuration from `store`, then initialize the device with it
    ///
    /// Configuration problems never fail startup (see
    /// [`ConfigDocument::load`]); only the device can.
    pub fn begin_with_store<S: ConfigStore>(
        &mut self,
        store: &mut S,
    ) -> Result<(ConfigDocument, ConfigOrigin), SensorError<D::Error>> {
        let (document, origin) = ConfigDocument::load(store);
        self.replace_config(document.config);
        self.begin()?;
        Ok((document, origin))
    }

    /// Write the current configuration to `store` under `name`
    pub fn save_config<S: ConfigStore>(
        &self,
        store: &mut S,
        name: &str,
    ) -> Result<(), ConfigError<S::Error>> {
        ConfigDocument::new(name, *self.config()).save(store)
    }
}
