use crate::host::Tab;
use crate::ids::{TabId, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Created {
        tab: Tab,
    },
    Removed {
        tab_id: TabId,
        window_id: WindowId,
        is_window_closing: bool,
    },
    Activated {
        tab_id: TabId,
        window_id: WindowId,
    },
    UrlChanged {
        tab: Tab,
    },
}

impl TabEvent {
    pub fn window_id(&self) -> WindowId {
        match self {
            Self::Created { tab } | Self::UrlChanged { tab } => tab.window_id,
            Self::Removed { window_id, .. } | Self::Activated { window_id, .. } => *window_id,
        }
    }
}
