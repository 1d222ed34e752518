use std::convert::Infallible;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tabcap_core::{Settings, SettingsError, SettingsProvider};
use thiserror::Error;

const ENV_SETTINGS_PATH: &str = "TABCAP_SETTINGS";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),
    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(#[from] SettingsError),
    #[error("no configuration directory available")]
    NoConfigDir,
}

/// Settings record kept as a JSON file.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    revision: u64,
}

impl FileSettingsStore {
    pub fn open_default() -> Result<Self, StoreError> {
        let path = match env::var_os(ENV_SETTINGS_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_settings_path()?,
        };
        Ok(Self::open_path(path))
    }

    pub fn open_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            revision: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bumped by every successful write; readers holding a snapshot taken
    /// at an older revision should reload.
    #[cfg(test)]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Stored values layered over the defaults. A missing file yields the
    /// defaults; so does one that no longer parses or holds out-of-range
    /// values.
    pub fn read(&self) -> Result<Settings, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Settings::default());
            }
            Err(error) => return Err(error.into()),
        };
        let settings = match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    path = %self.path().display(),
                    %error,
                    "stored settings unreadable, using defaults"
                );
                return Ok(Settings::default());
            }
        };
        if let Err(error) = settings.validate() {
            tracing::warn!(
                path = %self.path().display(),
                %error,
                "stored settings invalid, using defaults"
            );
            return Ok(Settings::default());
        }
        Ok(settings.normalized())
    }

    /// First-run setup: fills in every missing field and writes the
    /// complete record back.
    pub fn install(&mut self) -> Result<Settings, StoreError> {
        let merged = self.read()?;
        self.write(&merged)?;
        tracing::info!(path = %self.path().display(), "settings installed");
        Ok(merged)
    }

    /// Validates and writes `settings`, returning the new revision. Nothing
    /// is written when validation fails.
    pub fn save(&mut self, settings: Settings) -> Result<u64, StoreError> {
        settings.validate()?;
        let settings = settings.normalized();
        self.write(&settings)?;
        tracing::debug!(revision = self.revision, "settings saved");
        Ok(self.revision)
    }

    pub fn reset(&mut self) -> Result<Settings, StoreError> {
        let defaults = Settings::default();
        self.save(defaults.clone())?;
        Ok(defaults)
    }

    fn write(&mut self, settings: &Settings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        self.revision += 1;
        Ok(())
    }
}

impl SettingsProvider for FileSettingsStore {
    type Error = StoreError;

    fn load(&mut self) -> Result<Settings, Self::Error> {
        self.read()
    }
}

/// Settings that live only as long as the process, for trace replays that
/// must leave the user's file alone.
#[derive(Debug, Clone, Default)]
pub struct ScratchSettings {
    settings: Settings,
}

impl ScratchSettings {
    pub fn new(settings: Settings) -> Result<Self, SettingsError> {
        let mut scratch = Self::default();
        scratch.set(settings)?;
        Ok(scratch)
    }

    pub fn set(&mut self, settings: Settings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.settings = settings.normalized();
        Ok(())
    }
}

impl SettingsProvider for ScratchSettings {
    type Error = Infallible;

    fn load(&mut self) -> Result<Settings, Self::Error> {
        Ok(self.settings.clone())
    }
}

fn default_settings_path() -> Result<PathBuf, StoreError> {
    let base = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
    Ok(base.join("tabcap").join(SETTINGS_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use tabcap_core::{ExceedBehavior, GroupStrategy};

    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FileSettingsStore {
        FileSettingsStore::open_path(dir.path().join("nested").join(SETTINGS_FILE_NAME))
    }

    #[test]
    fn missing_file_reads_as_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = store_in(&dir);

        assert_eq!(store.read().expect("read"), Settings::default());
    }

    #[test]
    fn install_merges_stored_fields_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = store_in(&dir);
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(store.path(), r#"{"maxTabs": 7, "futureField": true}"#).expect("seed file");

        let merged = store.install().expect("install");

        assert_eq!(merged.max_tabs, 7);
        assert_eq!(merged.exceed_behavior, ExceedBehavior::Group);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).expect("read back"))
                .expect("valid json");
        assert_eq!(written["maxTabs"], 7);
        assert_eq!(written["groupName"], "Others Group");
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn save_round_trips_and_bumps_revision() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = store_in(&dir);
        let settings = Settings {
            max_tabs: 4,
            group_strategy: GroupStrategy::CreationDesc,
            group_name: "  Later  ".to_owned(),
            ..Settings::default()
        };

        let revision = store.save(settings).expect("save");
        let loaded = store.load().expect("load");

        assert_eq!(revision, 1);
        assert_eq!(loaded.max_tabs, 4);
        assert_eq!(loaded.group_strategy, GroupStrategy::CreationDesc);
        assert_eq!(loaded.group_name, "Later");
    }

    #[test]
    fn invalid_settings_are_rejected_without_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = store_in(&dir);

        let result = store.save(Settings {
            max_tabs: 51,
            ..Settings::default()
        });

        assert!(matches!(
            result,
            Err(StoreError::Invalid(SettingsError::MaxTabsOutOfRange(51)))
        ));
        assert!(!store.path().exists());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn corrupt_file_reads_as_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = store_in(&dir);
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(store.path(), "{not json").expect("seed file");

        assert_eq!(store.load().expect("load"), Settings::default());
    }

    #[test]
    fn out_of_range_record_reads_as_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = store_in(&dir);
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(store.path(), r#"{"maxTabs": 0, "exceedBehavior": "prevent"}"#)
            .expect("seed file");

        assert_eq!(store.load().expect("load"), Settings::default());

        let installed = store.install().expect("install");
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).expect("read back"))
                .expect("valid json");
        assert_eq!(installed, Settings::default());
        assert_eq!(written["maxTabs"], 10);
        assert_eq!(written["exceedBehavior"], "group");
    }

    #[test]
    fn reset_restores_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = store_in(&dir);
        store
            .save(Settings {
                max_tabs: 2,
                ..Settings::default()
            })
            .expect("save");

        store.reset().expect("reset");

        assert_eq!(store.read().expect("read"), Settings::default());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn scratch_settings_validate_on_set() {
        let mut scratch = ScratchSettings::default();

        assert!(scratch
            .set(Settings {
                max_tabs: 0,
                ..Settings::default()
            })
            .is_err());
        scratch
            .set(Settings {
                max_tabs: 3,
                ..Settings::default()
            })
            .expect("valid settings");

        assert_eq!(scratch.load().map(|settings| settings.max_tabs), Ok(3));
    }

    #[test]
    fn scratch_settings_reject_invalid_initial_record() {
        let result = ScratchSettings::new(Settings {
            max_tabs: 51,
            ..Settings::default()
        });

        assert!(matches!(result, Err(SettingsError::MaxTabsOutOfRange(51))));
    }
}
