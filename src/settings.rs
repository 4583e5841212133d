//! User preferences stored in a JSON file.
//!
//! Preferences are independent of the ledger. Every change is written to
//! disk before it is published to subscribers.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::Error;

/// User preferences for presentation and sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Use the dark colour scheme.
    pub dark_mode: bool,
    /// Derive colours from the device wallpaper where supported.
    pub dynamic_colors: bool,
    /// The symbol shown in front of amounts.
    pub currency_symbol: String,
    /// Require biometric unlock when the app opens.
    pub biometric_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            dynamic_colors: true,
            currency_symbol: "$".to_owned(),
            biometric_enabled: false,
        }
    }
}

/// A JSON file of [Settings] with change notifications.
///
/// Methods do blocking file I/O.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: watch::Sender<Settings>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// Open the settings file at `path`.
    ///
    /// A missing file yields the default settings, the file is created on the
    /// first change. Keys missing from the file take their default values.
    ///
    /// # Errors
    /// Returns an [Error::SettingsIo] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();

        let settings = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|error| Error::SettingsIo(format!("could not parse {path:?}: {error}")))?,
            Err(error) if error.kind() == ErrorKind::NotFound => Settings::default(),
            Err(error) => {
                return Err(Error::SettingsIo(format!(
                    "could not read {path:?}: {error}"
                )));
            }
        };

        Ok(Self {
            path,
            current: watch::Sender::new(settings),
            write_lock: Mutex::new(()),
        })
    }

    /// The path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current settings.
    pub fn current(&self) -> Settings {
        self.current.borrow().clone()
    }

    /// Watch the settings, starting from the current value.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.current.subscribe()
    }

    /// Turn the dark colour scheme on or off.
    pub fn set_dark_mode(&self, dark_mode: bool) -> Result<(), Error> {
        self.update(|settings| settings.dark_mode = dark_mode)
    }

    /// Turn wallpaper derived colours on or off.
    pub fn set_dynamic_colors(&self, dynamic_colors: bool) -> Result<(), Error> {
        self.update(|settings| settings.dynamic_colors = dynamic_colors)
    }

    /// Change the currency symbol.
    pub fn set_currency_symbol(&self, currency_symbol: &str) -> Result<(), Error> {
        self.update(|settings| settings.currency_symbol = currency_symbol.to_owned())
    }

    /// Turn biometric unlock on or off.
    pub fn set_biometric_enabled(&self, biometric_enabled: bool) -> Result<(), Error> {
        self.update(|settings| settings.biometric_enabled = biometric_enabled)
    }

    /// Apply `change`, save the result and notify subscribers if anything changed.
    ///
    /// # Errors
    /// Returns an [Error::SettingsIo] if the file cannot be written. The
    /// in-memory settings are left unchanged in that case.
    fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<(), Error> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut settings = self.current();
        change(&mut settings);
        if settings == *self.current.borrow() {
            return Ok(());
        }

        self.save(&settings)?;
        self.current.send_replace(settings);
        tracing::debug!("saved settings to {:?}", self.path);

        Ok(())
    }

    fn save(&self, settings: &Settings) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|error| Error::SettingsIo(error.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .and_then(|()| fs::rename(&temp_path, &self.path))
            .map_err(|error| Error::SettingsIo(format!("could not write {:?}: {error}", self.path)))
    }
}
