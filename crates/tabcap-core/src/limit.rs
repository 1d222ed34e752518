use crate::group::{find_group, locate_or_create_group};
use crate::host::{GroupUpdate, Tab, TabHost};
use crate::ids::{TabId, WindowId};
use crate::ordering::order_tabs;
use crate::report::Action;
use crate::settings::{ExceedBehavior, RestoreStrategy, Settings, SortKey};
use crate::timestamps::TimestampStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub ungrouped: Vec<Tab>,
    pub grouped: Vec<Tab>,
}

impl WindowSnapshot {
    /// Partitions `tabs`, adding `ensure_present` when the enumeration
    /// missed it and leaving out the extension's settings page.
    pub fn capture(
        mut tabs: Vec<Tab>,
        ensure_present: Option<&Tab>,
        settings_page_url: &str,
    ) -> Self {
        if let Some(new_tab) = ensure_present {
            if !tabs.iter().any(|tab| tab.id == new_tab.id) {
                tabs.push(new_tab.clone());
            }
        }

        let (grouped, ungrouped): (Vec<Tab>, Vec<Tab>) = tabs
            .into_iter()
            .filter(|tab| !is_settings_page(tab, settings_page_url))
            .partition(|tab| tab.group_id.is_some());
        Self { ungrouped, grouped }
    }
}

fn is_settings_page(tab: &Tab, settings_page_url: &str) -> bool {
    !settings_page_url.is_empty()
        && tab
            .url
            .as_deref()
            .is_some_and(|url| url.starts_with(settings_page_url))
}

fn tab_ids(tabs: &[&Tab]) -> Vec<TabId> {
    tabs.iter().filter_map(|tab| tab.id).collect()
}

pub(crate) struct LimitPass<'a, S: TimestampStore + ?Sized> {
    pub store: &'a S,
    pub settings: &'a Settings,
    pub settings_page_url: &'a str,
}

impl<S: TimestampStore + ?Sized> LimitPass<'_, S> {
    pub fn enforce<H: TabHost>(
        &self,
        host: &mut H,
        window_id: WindowId,
        ensure_present: Option<&Tab>,
        actions: &mut Vec<Action>,
    ) -> Result<(), H::Error> {
        let tabs = host.list_tabs(window_id)?;
        let snapshot = WindowSnapshot::capture(tabs, ensure_present, self.settings_page_url);
        let ungrouped = snapshot.ungrouped.len();
        let max_tabs = self.settings.max_tabs as usize;
        tracing::trace!(
            %window_id,
            ungrouped,
            grouped = snapshot.grouped.len(),
            max_tabs,
            "evaluating tab limit"
        );

        if ungrouped > max_tabs {
            let excess = ungrouped - max_tabs;
            match self.settings.exceed_behavior {
                ExceedBehavior::Prevent => self.close_newest(host, &snapshot, excess, actions),
                ExceedBehavior::Group => {
                    self.group_excess(host, window_id, &snapshot, excess, actions)
                }
            }
        } else if ungrouped < max_tabs
            && self.settings.restore_strategy == RestoreStrategy::Restore
        {
            self.restore(host, window_id, &snapshot, max_tabs - ungrouped, actions)
        } else {
            Ok(())
        }
    }

    fn close_newest<H: TabHost>(
        &self,
        host: &mut H,
        snapshot: &WindowSnapshot,
        excess: usize,
        actions: &mut Vec<Action>,
    ) -> Result<(), H::Error> {
        if excess == 0 {
            return Ok(());
        }
        let ordered = order_tabs(&snapshot.ungrouped, SortKey::Creation, false, self.store);
        let victims = tab_ids(&ordered[..excess.min(ordered.len())]);
        if victims.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = victims.len(), "closing newest tabs over the limit");
        host.remove_tabs(&victims)?;
        actions.push(Action::Closed { tab_ids: victims });
        Ok(())
    }

    fn group_excess<H: TabHost>(
        &self,
        host: &mut H,
        window_id: WindowId,
        snapshot: &WindowSnapshot,
        excess: usize,
        actions: &mut Vec<Action>,
    ) -> Result<(), H::Error> {
        if excess == 0 {
            return Ok(());
        }
        let strategy = self.settings.group_strategy;
        let ordered = order_tabs(
            &snapshot.ungrouped,
            strategy.sort_key(),
            strategy.ascending(),
            self.store,
        );
        let victims = &ordered[..excess.min(ordered.len())];
        let victim_ids = tab_ids(victims);
        if victim_ids.is_empty() {
            return Ok(());
        }

        let title = self.settings.effective_group_name();
        let Some(located) = locate_or_create_group(host, window_id, title, victims)? else {
            return Ok(());
        };
        if let Some(seed) = located.seeded_with {
            actions.push(Action::GroupCreated {
                group_id: located.group_id,
                seed,
            });
        }

        let remaining: Vec<TabId> = victim_ids
            .iter()
            .copied()
            .filter(|id| Some(*id) != located.seeded_with)
            .collect();
        if !remaining.is_empty() {
            host.group_tabs(&remaining, Some(located.group_id))?;
        }
        host.update_group(
            located.group_id,
            GroupUpdate {
                collapsed: Some(true),
                ..GroupUpdate::default()
            },
        )?;

        tracing::debug!(
            %window_id,
            group_id = %located.group_id,
            count = victim_ids.len(),
            ?strategy,
            "grouped tabs over the limit"
        );
        actions.push(Action::Grouped {
            group_id: located.group_id,
            tab_ids: victim_ids,
        });
        Ok(())
    }

    fn restore<H: TabHost>(
        &self,
        host: &mut H,
        window_id: WindowId,
        snapshot: &WindowSnapshot,
        slots: usize,
        actions: &mut Vec<Action>,
    ) -> Result<(), H::Error> {
        if slots == 0 {
            return Ok(());
        }
        let title = self.settings.effective_group_name();
        let Some(group) = find_group(host, window_id, title)? else {
            return Ok(());
        };
        let members: Vec<Tab> = snapshot
            .grouped
            .iter()
            .filter(|tab| tab.group_id == Some(group.id))
            .cloned()
            .collect();
        if members.is_empty() {
            return Ok(());
        }

        // Restore runs the grouping order backwards: the last tab pushed in
        // is the first one let out.
        let strategy = self.settings.group_strategy;
        let ordered = order_tabs(
            &members,
            strategy.sort_key(),
            !strategy.ascending(),
            self.store,
        );
        let beneficiaries = tab_ids(&ordered[..slots.min(ordered.len())]);
        if beneficiaries.is_empty() {
            return Ok(());
        }

        host.ungroup_tabs(&beneficiaries)?;
        tracing::debug!(
            %window_id,
            group_id = %group.id,
            count = beneficiaries.len(),
            "restored tabs from overflow group"
        );
        actions.push(Action::Restored {
            group_id: group.id,
            tab_ids: beneficiaries,
        });
        Ok(())
    }
}
