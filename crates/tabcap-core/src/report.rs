use crate::ids::{GroupId, TabId, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Closed {
        tab_ids: Vec<TabId>,
    },
    GroupCreated {
        group_id: GroupId,
        seed: TabId,
    },
    Grouped {
        group_id: GroupId,
        tab_ids: Vec<TabId>,
    },
    Restored {
        group_id: GroupId,
        tab_ids: Vec<TabId>,
    },
    DuplicatesClosed {
        kept: TabId,
        closed: Vec<TabId>,
    },
    Focused {
        tab_id: TabId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub window_id: WindowId,
    pub actions: Vec<Action>,
}

impl Report {
    pub fn new(window_id: WindowId) -> Self {
        Self {
            window_id,
            actions: Vec::new(),
        }
    }

    /// True when handling the event made no host mutation.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
