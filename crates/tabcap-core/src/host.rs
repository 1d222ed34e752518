use serde::{Deserialize, Serialize};

use crate::event::TabEvent;
use crate::ids::{GroupId, TabId, WindowId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    /// Missing while the browser is still creating or already tearing down the tab.
    pub id: Option<TabId>,
    pub window_id: WindowId,
    pub group_id: Option<GroupId>,
    pub url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabGroup {
    pub id: GroupId,
    pub window_id: WindowId,
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub color: Option<GroupColor>,
    pub collapsed: Option<bool>,
}

pub trait TabHost {
    type Error;

    /// Tabs of one window in strip order. An unknown window has no tabs.
    fn list_tabs(&mut self, window_id: WindowId) -> Result<Vec<Tab>, Self::Error>;

    fn remove_tabs(&mut self, tab_ids: &[TabId]) -> Result<(), Self::Error>;

    fn group_tabs(
        &mut self,
        tab_ids: &[TabId],
        group_id: Option<GroupId>,
    ) -> Result<GroupId, Self::Error>;

    fn ungroup_tabs(&mut self, tab_ids: &[TabId]) -> Result<(), Self::Error>;

    fn update_group(&mut self, group_id: GroupId, update: GroupUpdate) -> Result<(), Self::Error>;

    fn query_groups(
        &mut self,
        window_id: WindowId,
        title: Option<&str>,
    ) -> Result<Vec<TabGroup>, Self::Error>;

    fn create_tab(&mut self, window_id: WindowId, url: &str, active: bool)
        -> Result<Tab, Self::Error>;

    fn activate_tab(&mut self, tab_id: TabId) -> Result<(), Self::Error>;
}

pub trait TabEventSource {
    fn next_event(&mut self) -> Option<TabEvent>;
}
