use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_MAX_TABS: u32 = 1;
pub const MAX_MAX_TABS: u32 = 50;
pub const MAX_GROUP_NAME_CHARS: usize = 50;
pub const DEFAULT_GROUP_NAME: &str = "Others Group";

/// What happens to the tabs above the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExceedBehavior {
    Prevent,
    #[default]
    Group,
}

/// Which end of the timeline is evicted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum GroupStrategy {
    CreationAsc,
    CreationDesc,
    #[default]
    RecentAsc,
    RecentDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Creation,
    Recent,
}

impl GroupStrategy {
    pub fn sort_key(self) -> SortKey {
        match self {
            Self::CreationAsc | Self::CreationDesc => SortKey::Creation,
            Self::RecentAsc | Self::RecentDesc => SortKey::Recent,
        }
    }

    pub fn ascending(self) -> bool {
        matches!(self, Self::CreationAsc | Self::RecentAsc)
    }
}

impl From<String> for GroupStrategy {
    fn from(value: String) -> Self {
        match value.as_str() {
            "creation-asc" => Self::CreationAsc,
            "creation-desc" => Self::CreationDesc,
            "recent-desc" => Self::RecentDesc,
            _ => Self::RecentAsc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreStrategy {
    None,
    #[default]
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub max_tabs: u32,
    pub exceed_behavior: ExceedBehavior,
    pub group_strategy: GroupStrategy,
    pub restore_strategy: RestoreStrategy,
    pub group_name: String,
    pub keep_single_url: bool,
    pub keep_url_hash: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tabs: 10,
            exceed_behavior: ExceedBehavior::Group,
            group_strategy: GroupStrategy::RecentAsc,
            restore_strategy: RestoreStrategy::Restore,
            group_name: DEFAULT_GROUP_NAME.to_owned(),
            keep_single_url: false,
            keep_url_hash: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("tab count must be between 1-50, got {0}")]
    MaxTabsOutOfRange(u32),
    #[error("group name must be at most 50 characters, got {0}")]
    GroupNameTooLong(usize),
}

impl Settings {
    /// Trims the group name and falls back to the default when it is blank.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.group_name.trim();
        self.group_name = if trimmed.is_empty() {
            DEFAULT_GROUP_NAME.to_owned()
        } else {
            trimmed.to_owned()
        };
        self
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_MAX_TABS..=MAX_MAX_TABS).contains(&self.max_tabs) {
            return Err(SettingsError::MaxTabsOutOfRange(self.max_tabs));
        }
        let name_chars = self.group_name.chars().count();
        if name_chars > MAX_GROUP_NAME_CHARS {
            return Err(SettingsError::GroupNameTooLong(name_chars));
        }
        Ok(())
    }

    /// The group name the engine should look for. Never blank.
    pub fn effective_group_name(&self) -> &str {
        let trimmed = self.group_name.trim();
        if trimmed.is_empty() {
            DEFAULT_GROUP_NAME
        } else {
            trimmed
        }
    }
}

pub trait SettingsProvider {
    type Error;

    fn load(&mut self) -> Result<Settings, Self::Error>;
}

/// Holds the last loaded settings until told the backing store changed.
#[derive(Debug)]
pub struct CachedSettings<P: SettingsProvider> {
    provider: P,
    cached: Option<Settings>,
}

impl<P: SettingsProvider> CachedSettings<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cached: None,
        }
    }

    pub fn current(&mut self) -> Result<Settings, P::Error> {
        if let Some(settings) = &self.cached {
            return Ok(settings.clone());
        }
        let settings = self.provider.load()?;
        self.cached = Some(settings.clone());
        Ok(settings)
    }

    pub fn invalidate(&mut self) {
        tracing::debug!("settings changed, dropping cached snapshot");
        self.cached = None;
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}
