use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thiserror::Error;

use crate::event::TabEvent;
use crate::host::{GroupColor, GroupUpdate, Tab, TabEventSource, TabGroup, TabHost};
use crate::ids::{GroupId, TabId, WindowId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryHostError {
    #[error("tab not found: {0}")]
    TabNotFound(TabId),
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),
    #[error("window not found: {0}")]
    WindowNotFound(WindowId),
    #[error("no tabs given to group")]
    EmptyGroup,
    #[error("{tab_id} is not in {window_id}")]
    CrossWindowGroup { tab_id: TabId, window_id: WindowId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    RemoveTabs(Vec<TabId>),
    GroupTabs {
        tab_ids: Vec<TabId>,
        group_id: Option<GroupId>,
    },
    UngroupTabs(Vec<TabId>),
    UpdateGroup {
        group_id: GroupId,
        update: GroupUpdate,
    },
    CreateTab {
        window_id: WindowId,
        url: String,
        active: bool,
    },
    ActivateTab(TabId),
}

#[derive(Debug, Default)]
pub struct MemoryTabHost {
    windows: BTreeMap<WindowId, Vec<TabId>>,
    tabs: BTreeMap<TabId, Tab>,
    groups: BTreeMap<GroupId, TabGroup>,
    next_window_id: u64,
    next_tab_id: u64,
    next_group_id: u64,
    calls: Vec<HostCall>,
    pending: VecDeque<TabEvent>,
    unlisted: BTreeSet<TabId>,
}

impl MemoryTabHost {
    pub fn open_window(&mut self) -> WindowId {
        self.next_window_id += 1;
        let window_id = WindowId(self.next_window_id);
        self.windows.insert(window_id, Vec::new());
        window_id
    }

    pub fn open_tab(
        &mut self,
        window_id: WindowId,
        url: &str,
        active: bool,
    ) -> Result<TabId, MemoryHostError> {
        self.insert_tab(window_id, url, active)
    }

    pub fn close_tab(&mut self, tab_id: TabId) -> Result<(), MemoryHostError> {
        self.remove(&[tab_id], false)
    }

    pub fn select_tab(&mut self, tab_id: TabId) -> Result<(), MemoryHostError> {
        self.set_active(tab_id)
    }

    pub fn navigate(&mut self, tab_id: TabId, url: &str) -> Result<(), MemoryHostError> {
        let tab = self
            .tabs
            .get_mut(&tab_id)
            .ok_or(MemoryHostError::TabNotFound(tab_id))?;
        if tab.url.as_deref() == Some(url) {
            return Ok(());
        }
        tab.url = Some(url.to_owned());
        let tab = tab.clone();
        self.pending.push_back(TabEvent::UrlChanged { tab });
        Ok(())
    }

    pub fn close_window(&mut self, window_id: WindowId) -> Result<(), MemoryHostError> {
        let tab_ids = self
            .windows
            .get(&window_id)
            .cloned()
            .ok_or(MemoryHostError::WindowNotFound(window_id))?;
        self.remove(&tab_ids, true)?;
        self.windows.remove(&window_id);
        Ok(())
    }

    /// Keeps `tab_id` out of `list_tabs` results, mimicking an enumeration
    /// that has not caught up with a just-created tab.
    pub fn hide_from_listing(&mut self, tab_id: TabId) {
        self.unlisted.insert(tab_id);
    }

    pub fn reveal_in_listing(&mut self, tab_id: TabId) {
        self.unlisted.remove(&tab_id);
    }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys().copied()
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&Tab> {
        self.tabs.get(&tab_id)
    }

    pub fn tabs_in(&self, window_id: WindowId) -> Vec<&Tab> {
        self.windows
            .get(&window_id)
            .map(|order| order.iter().filter_map(|id| self.tabs.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn ungrouped_in(&self, window_id: WindowId) -> Vec<TabId> {
        self.tabs_in(window_id)
            .into_iter()
            .filter(|tab| tab.group_id.is_none())
            .filter_map(|tab| tab.id)
            .collect()
    }

    pub fn group(&self, group_id: GroupId) -> Option<&TabGroup> {
        self.groups.get(&group_id)
    }

    pub fn groups_in(&self, window_id: WindowId) -> Vec<&TabGroup> {
        self.groups
            .values()
            .filter(|group| group.window_id == window_id)
            .collect()
    }

    pub fn members_of(&self, group_id: GroupId) -> Vec<TabId> {
        let Some(group) = self.groups.get(&group_id) else {
            return Vec::new();
        };
        self.tabs_in(group.window_id)
            .into_iter()
            .filter(|tab| tab.group_id == Some(group_id))
            .filter_map(|tab| tab.id)
            .collect()
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    fn insert_tab(
        &mut self,
        window_id: WindowId,
        url: &str,
        active: bool,
    ) -> Result<TabId, MemoryHostError> {
        if !self.windows.contains_key(&window_id) {
            return Err(MemoryHostError::WindowNotFound(window_id));
        }
        self.next_tab_id += 1;
        let tab_id = TabId(self.next_tab_id);
        let activate = active || !self.tabs_in(window_id).iter().any(|tab| tab.active);
        if activate {
            self.mark_active(window_id, tab_id);
        }
        let tab = Tab {
            id: Some(tab_id),
            window_id,
            group_id: None,
            url: Some(url.to_owned()),
            active: activate,
        };
        self.tabs.insert(tab_id, tab.clone());
        if let Some(order) = self.windows.get_mut(&window_id) {
            order.push(tab_id);
        }
        self.pending.push_back(TabEvent::Created { tab });
        if activate {
            self.pending.push_back(TabEvent::Activated { tab_id, window_id });
        }
        Ok(tab_id)
    }

    fn set_active(&mut self, tab_id: TabId) -> Result<(), MemoryHostError> {
        let tab = self
            .tabs
            .get(&tab_id)
            .ok_or(MemoryHostError::TabNotFound(tab_id))?;
        if tab.active {
            return Ok(());
        }
        let window_id = tab.window_id;
        self.mark_active(window_id, tab_id);
        self.pending.push_back(TabEvent::Activated { tab_id, window_id });
        Ok(())
    }

    fn mark_active(&mut self, window_id: WindowId, tab_id: TabId) {
        for tab in self.tabs.values_mut() {
            if tab.window_id == window_id {
                tab.active = tab.id == Some(tab_id);
            }
        }
    }

    fn remove(
        &mut self,
        tab_ids: &[TabId],
        is_window_closing: bool,
    ) -> Result<(), MemoryHostError> {
        for tab_id in tab_ids {
            self.require_tab(*tab_id)?;
        }

        let mut reactivate: BTreeMap<WindowId, usize> = BTreeMap::new();
        for tab_id in tab_ids {
            let Some(tab) = self.tabs.remove(tab_id) else {
                continue;
            };
            self.unlisted.remove(tab_id);
            if let Some(order) = self.windows.get_mut(&tab.window_id) {
                if let Some(position) = order.iter().position(|id| id == tab_id) {
                    order.remove(position);
                    if tab.active {
                        reactivate.insert(tab.window_id, position);
                    }
                }
            }
            self.pending.push_back(TabEvent::Removed {
                tab_id: *tab_id,
                window_id: tab.window_id,
                is_window_closing,
            });
        }
        self.prune_groups();

        if is_window_closing {
            return Ok(());
        }
        for (window_id, position) in reactivate {
            let next = self.windows.get(&window_id).and_then(|order| {
                let index = position.min(order.len().checked_sub(1)?);
                order.get(index).copied()
            });
            let still_active = self.tabs_in(window_id).iter().any(|tab| tab.active);
            if let (Some(next), false) = (next, still_active) {
                self.set_active(next)?;
            }
        }
        Ok(())
    }

    fn prune_groups(&mut self) {
        let occupied: BTreeSet<GroupId> =
            self.tabs.values().filter_map(|tab| tab.group_id).collect();
        self.groups.retain(|group_id, _| occupied.contains(group_id));
    }

    fn require_tab(&self, tab_id: TabId) -> Result<(), MemoryHostError> {
        if self.tabs.contains_key(&tab_id) {
            Ok(())
        } else {
            Err(MemoryHostError::TabNotFound(tab_id))
        }
    }
}

impl TabHost for MemoryTabHost {
    type Error = MemoryHostError;

    fn list_tabs(&mut self, window_id: WindowId) -> Result<Vec<Tab>, Self::Error> {
        Ok(self
            .tabs_in(window_id)
            .into_iter()
            .filter(|tab| tab.id.map_or(true, |id| !self.unlisted.contains(&id)))
            .cloned()
            .collect())
    }

    fn remove_tabs(&mut self, tab_ids: &[TabId]) -> Result<(), Self::Error> {
        self.calls.push(HostCall::RemoveTabs(tab_ids.to_vec()));
        self.remove(tab_ids, false)
    }

    fn group_tabs(
        &mut self,
        tab_ids: &[TabId],
        group_id: Option<GroupId>,
    ) -> Result<GroupId, Self::Error> {
        self.calls.push(HostCall::GroupTabs {
            tab_ids: tab_ids.to_vec(),
            group_id,
        });
        let first = *tab_ids.first().ok_or(MemoryHostError::EmptyGroup)?;
        let window_id = match group_id {
            Some(group_id) => {
                self.groups
                    .get(&group_id)
                    .ok_or(MemoryHostError::GroupNotFound(group_id))?
                    .window_id
            }
            None => {
                self.tabs
                    .get(&first)
                    .ok_or(MemoryHostError::TabNotFound(first))?
                    .window_id
            }
        };
        for tab_id in tab_ids {
            let tab = self
                .tabs
                .get(tab_id)
                .ok_or(MemoryHostError::TabNotFound(*tab_id))?;
            if tab.window_id != window_id {
                return Err(MemoryHostError::CrossWindowGroup {
                    tab_id: *tab_id,
                    window_id,
                });
            }
        }

        let group_id = match group_id {
            Some(group_id) => group_id,
            None => {
                self.next_group_id += 1;
                let group_id = GroupId(self.next_group_id);
                self.groups.insert(
                    group_id,
                    TabGroup {
                        id: group_id,
                        window_id,
                        title: String::new(),
                        color: GroupColor::default(),
                        collapsed: false,
                    },
                );
                group_id
            }
        };
        for tab_id in tab_ids {
            if let Some(tab) = self.tabs.get_mut(tab_id) {
                tab.group_id = Some(group_id);
            }
        }
        self.prune_groups();
        Ok(group_id)
    }

    fn ungroup_tabs(&mut self, tab_ids: &[TabId]) -> Result<(), Self::Error> {
        self.calls.push(HostCall::UngroupTabs(tab_ids.to_vec()));
        for tab_id in tab_ids {
            self.require_tab(*tab_id)?;
        }
        for tab_id in tab_ids {
            if let Some(tab) = self.tabs.get_mut(tab_id) {
                tab.group_id = None;
            }
        }
        self.prune_groups();
        Ok(())
    }

    fn update_group(&mut self, group_id: GroupId, update: GroupUpdate) -> Result<(), Self::Error> {
        self.calls.push(HostCall::UpdateGroup {
            group_id,
            update: update.clone(),
        });
        let group = self
            .groups
            .get_mut(&group_id)
            .ok_or(MemoryHostError::GroupNotFound(group_id))?;
        if let Some(title) = update.title {
            group.title = title;
        }
        if let Some(color) = update.color {
            group.color = color;
        }
        if let Some(collapsed) = update.collapsed {
            group.collapsed = collapsed;
        }
        Ok(())
    }

    fn query_groups(
        &mut self,
        window_id: WindowId,
        title: Option<&str>,
    ) -> Result<Vec<TabGroup>, Self::Error> {
        Ok(self
            .groups
            .values()
            .filter(|group| group.window_id == window_id)
            .filter(|group| title.map_or(true, |title| group.title == title))
            .cloned()
            .collect())
    }

    fn create_tab(
        &mut self,
        window_id: WindowId,
        url: &str,
        active: bool,
    ) -> Result<Tab, Self::Error> {
        self.calls.push(HostCall::CreateTab {
            window_id,
            url: url.to_owned(),
            active,
        });
        let tab_id = self.insert_tab(window_id, url, active)?;
        self.tabs
            .get(&tab_id)
            .cloned()
            .ok_or(MemoryHostError::TabNotFound(tab_id))
    }

    fn activate_tab(&mut self, tab_id: TabId) -> Result<(), Self::Error> {
        self.calls.push(HostCall::ActivateTab(tab_id));
        self.set_active(tab_id)
    }
}

impl TabEventSource for MemoryTabHost {
    fn next_event(&mut self) -> Option<TabEvent> {
        self.pending.pop_front()
    }
}
