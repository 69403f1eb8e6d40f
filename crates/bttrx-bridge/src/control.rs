//! Validated access to the bridge settings.

use tracing::info;

use bttrx_core::{Error, Result, Setting, SettingsStore};

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn parse_number(setting: Setting, value: &str) -> Result<u32> {
    value.parse().map_err(|_| {
        Error::InvalidParameter(format!("{setting} expects a number, got {value:?}"))
    })
}

/// Validate `value` for `setting` and store it.
pub fn apply_setting(store: &mut dyn SettingsStore, setting: Setting, value: &str) -> Result<()> {
    match setting {
        Setting::PinCode => {
            if value.len() != 4 || !all_digits(value) {
                return Err(Error::InvalidParameter(format!(
                    "PIN must be 4 digits, got {value:?}"
                )));
            }
            store.put_string(setting.key(), value)?;
        }
        Setting::AdcGain | Setting::DacGain => {
            if !all_digits(value) {
                return Err(Error::InvalidParameter(format!(
                    "{setting} expects a gain step, got {value:?}"
                )));
            }
            store.put_string(setting.key(), value)?;
        }
        Setting::PttHangTimeMs | Setting::PttTimeoutMin => {
            let n = parse_number(setting, value)?;
            store.put_u32(setting.key(), n)?;
        }
        Setting::PttToggleEnabled => {
            let n = parse_number(setting, value)?;
            if n > 1 {
                return Err(Error::InvalidParameter(format!(
                    "{setting} expects 0 or 1, got {value:?}"
                )));
            }
            store.put_u32(setting.key(), n)?;
        }
    }
    info!(setting = %setting, value, "setting stored");
    Ok(())
}

/// Effective value of `setting`, falling back to its default.
pub fn read_setting(store: &dyn SettingsStore, setting: Setting) -> String {
    let stored = if setting.is_numeric() {
        store.get_u32(setting.key()).map(|n| n.to_string())
    } else {
        store.get_string(setting.key())
    };
    stored.unwrap_or_else(|| setting.default_value().to_string())
}
