//! Persistent key/value settings.
//!
//! The bridge keeps a handful of named fields that must survive power loss:
//! the fallback PIN, the audio gains learned from the module, and the PTT
//! hang time and timeout. [`SettingsStore`] is the seam; [`MemorySettings`]
//! backs tests and throwaway runs, [`JsonFileSettings`] persists to disk.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named bridge setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Fallback PIN for devices without SSP.
    PinCode,
    /// ADC gain reported by the module.
    AdcGain,
    /// DAC gain reported by the module.
    DacGain,
    /// Delay between PTT release and unkey, in milliseconds.
    PttHangTimeMs,
    /// Transmit timeout in minutes; 0 disables it.
    PttTimeoutMin,
    /// Whether the PTT button toggles instead of being held (0/1).
    PttToggleEnabled,
}

impl Setting {
    /// All settings, in display order.
    pub const ALL: [Setting; 6] = [
        Setting::PinCode,
        Setting::AdcGain,
        Setting::DacGain,
        Setting::PttHangTimeMs,
        Setting::PttTimeoutMin,
        Setting::PttToggleEnabled,
    ];

    /// Storage key of this setting.
    pub fn key(&self) -> &'static str {
        match self {
            Setting::PinCode => "pin_code",
            Setting::AdcGain => "adc_gain",
            Setting::DacGain => "dac_gain",
            Setting::PttHangTimeMs => "ptt_hang_time_ms",
            Setting::PttTimeoutMin => "ptt_timeout_min",
            Setting::PttToggleEnabled => "ptt_toggle_enabled",
        }
    }

    /// Whether the setting is stored as an integer.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Setting::PttHangTimeMs | Setting::PttTimeoutMin | Setting::PttToggleEnabled
        )
    }

    /// Value used when the store has nothing for this setting.
    pub fn default_value(&self) -> &'static str {
        match self {
            Setting::PinCode => "0000",
            Setting::AdcGain | Setting::DacGain => "0",
            Setting::PttHangTimeMs => "300",
            Setting::PttTimeoutMin => "3",
            Setting::PttToggleEnabled => "0",
        }
    }

    /// [`default_value`](Self::default_value) of a numeric setting.
    pub fn default_u32(&self) -> u32 {
        self.default_value().parse().unwrap_or(0)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Setting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Setting::ALL
            .iter()
            .copied()
            .find(|setting| setting.key() == s)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown setting {s:?}")))
    }
}

/// Simple get/put store of named string and integer fields.
pub trait SettingsStore: Send {
    /// Read a string field.
    fn get_string(&self, key: &str) -> Option<String>;

    /// Write a string field.
    fn put_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Read an integer field.
    fn get_u32(&self, key: &str) -> Option<u32>;

    /// Write an integer field.
    fn put_u32(&mut self, key: &str, value: u32) -> Result<()>;

    /// Current PIN code, falling back to the default.
    fn pin_code(&self) -> String {
        self.get_string(Setting::PinCode.key())
            .unwrap_or_else(|| Setting::PinCode.default_value().to_string())
    }

    /// PTT hang time, falling back to the default.
    fn ptt_hang_time(&self) -> Duration {
        let ms = self
            .get_u32(Setting::PttHangTimeMs.key())
            .unwrap_or_else(|| Setting::PttHangTimeMs.default_u32());
        Duration::from_millis(u64::from(ms))
    }

    /// PTT timeout in minutes, falling back to the default.
    fn ptt_timeout_min(&self) -> u32 {
        self.get_u32(Setting::PttTimeoutMin.key())
            .unwrap_or_else(|| Setting::PttTimeoutMin.default_u32())
    }

    /// Whether PTT toggle mode is enabled.
    fn ptt_toggle_enabled(&self) -> bool {
        self.get_u32(Setting::PttToggleEnabled.key())
            .unwrap_or_else(|| Setting::PttToggleEnabled.default_u32())
            != 0
    }
}

/// One stored field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Number(u32),
    Text(String),
}

impl StoredValue {
    fn as_string(&self) -> String {
        match self {
            StoredValue::Number(n) => n.to_string(),
            StoredValue::Text(s) => s.clone(),
        }
    }

    fn as_u32(&self) -> Option<u32> {
        match self {
            StoredValue::Number(n) => Some(*n),
            StoredValue::Text(s) => s.parse().ok(),
        }
    }
}

/// In-memory settings; lost on drop.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: BTreeMap<String, StoredValue>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(StoredValue::as_string)
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.values
            .insert(key.to_string(), StoredValue::Text(value.to_string()));
        Ok(())
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.values.get(key).and_then(StoredValue::as_u32)
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<()> {
        self.values.insert(key.to_string(), StoredValue::Number(value));
        Ok(())
    }
}

/// Settings persisted as a flat JSON object.
///
/// The whole file is rewritten on every put through a temporary sibling and
/// a rename, so a power cut leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: BTreeMap<String, StoredValue>,
}

impl JsonFileSettings {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                Error::Settings(format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "settings file missing, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(JsonFileSettings { path, values })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| Error::Settings(format!("failed to encode settings: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::trace!(path = %self.path.display(), "settings written");
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(StoredValue::as_string)
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.values
            .insert(key.to_string(), StoredValue::Text(value.to_string()));
        self.flush()
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.values.get(key).and_then(StoredValue::as_u32)
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<()> {
        self.values.insert(key.to_string(), StoredValue::Number(value));
        self.flush()
    }
}
