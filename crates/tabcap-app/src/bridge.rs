use serde::{Deserialize, Serialize};
use tabcap_core::{MemoryHostError, MemoryTabHost, Settings, TabId, WindowId};
use thiserror::Error;

/// One line of a replay trace: something a user does to the browser, or a
/// settings change made from the options page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum UserCommand {
    OpenWindow,
    Open {
        window: u64,
        url: String,
        #[serde(default = "default_active")]
        active: bool,
    },
    Close {
        tab: u64,
    },
    Activate {
        tab: u64,
    },
    Navigate {
        tab: u64,
        url: String,
    },
    CloseWindow {
        window: u64,
    },
    Settings {
        settings: Settings,
    },
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

impl UserCommand {
    /// Performs a browser command on `host`. A settings command is handed
    /// back for the caller to store.
    pub fn apply(self, host: &mut MemoryTabHost) -> Result<Option<Settings>, MemoryHostError> {
        match self {
            Self::OpenWindow => {
                host.open_window();
            }
            Self::Open {
                window,
                url,
                active,
            } => {
                host.open_tab(WindowId(window), &url, active)?;
            }
            Self::Close { tab } => host.close_tab(TabId(tab))?,
            Self::Activate { tab } => host.select_tab(TabId(tab))?,
            Self::Navigate { tab, url } => host.navigate(TabId(tab), &url)?,
            Self::CloseWindow { window } => host.close_window(WindowId(window))?,
            Self::Settings { settings } => return Ok(Some(settings)),
        }
        Ok(None)
    }
}

/// Parses a JSON-lines trace. Blank lines and `#` comments are skipped.
pub fn parse_trace(source: &str) -> Result<Vec<UserCommand>, TraceError> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| TraceError::Parse {
                line: index + 1,
                source,
            })
        })
        .collect()
}
