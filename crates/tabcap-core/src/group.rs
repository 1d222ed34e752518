use crate::host::{GroupColor, GroupUpdate, Tab, TabGroup, TabHost};
use crate::ids::{GroupId, TabId, WindowId};

/// Page loaded into the throwaway tab that seeds a group when no victim can.
pub const SEED_TAB_URL: &str = "about:blank";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedGroup {
    pub group_id: GroupId,
    /// Set when the group was created by this call, naming the tab it was
    /// created from. That tab is already a member.
    pub seeded_with: Option<TabId>,
}

pub fn find_group<H: TabHost>(
    host: &mut H,
    window_id: WindowId,
    title: &str,
) -> Result<Option<TabGroup>, H::Error> {
    Ok(host
        .query_groups(window_id, Some(title))?
        .into_iter()
        .find(|group| group.title == title))
}

/// Reuses the first group titled `title`, or creates one seeded from the
/// first inactive tab of `candidates`, falling back to a fresh blank tab.
pub fn locate_or_create_group<H: TabHost>(
    host: &mut H,
    window_id: WindowId,
    title: &str,
    candidates: &[&Tab],
) -> Result<Option<LocatedGroup>, H::Error> {
    if let Some(group) = find_group(host, window_id, title)? {
        return Ok(Some(LocatedGroup {
            group_id: group.id,
            seeded_with: None,
        }));
    }

    let seed = match candidates
        .iter()
        .filter(|tab| !tab.active)
        .find_map(|tab| tab.id)
    {
        Some(seed) => seed,
        None => match host.create_tab(window_id, SEED_TAB_URL, false)?.id {
            Some(seed) => seed,
            None => {
                tracing::warn!(%window_id, "seed tab has no id, overflow group not created");
                return Ok(None);
            }
        },
    };

    let group_id = host.group_tabs(&[seed], None)?;
    host.update_group(
        group_id,
        GroupUpdate {
            title: Some(title.to_owned()),
            color: Some(GroupColor::Grey),
            collapsed: Some(true),
        },
    )?;
    tracing::debug!(%window_id, %group_id, %seed, title, "created overflow group");

    Ok(Some(LocatedGroup {
        group_id,
        seeded_with: Some(seed),
    }))
}

#[cfg(test)]
mod tests {
    use crate::memory::{HostCall, MemoryTabHost};

    use super::*;

    #[test]
    fn existing_group_is_reused_without_mutation() {
        let mut host = MemoryTabHost::default();
        let window_id = host.open_window();
        let tab_id = host
            .open_tab(window_id, "https://one.example", true)
            .expect("tab should open");
        let group_id = host.group_tabs(&[tab_id], None).expect("group");
        host.update_group(
            group_id,
            GroupUpdate {
                title: Some("Later".to_owned()),
                ..GroupUpdate::default()
            },
        )
        .expect("title");
        let calls_before = host.calls().len();

        let located = locate_or_create_group(&mut host, window_id, "Later", &[])
            .expect("locate should succeed")
            .expect("group should be found");

        assert_eq!(located.group_id, group_id);
        assert_eq!(located.seeded_with, None);
        assert_eq!(host.calls().len(), calls_before);
    }

    #[test]
    fn creates_collapsed_grey_group_from_inactive_candidate() {
        let mut host = MemoryTabHost::default();
        let window_id = host.open_window();
        let first = host
            .open_tab(window_id, "https://one.example", false)
            .expect("tab should open");
        let second = host
            .open_tab(window_id, "https://two.example", true)
            .expect("tab should open");
        let tabs = host.list_tabs(window_id).expect("listing");
        let candidates: Vec<&Tab> = tabs.iter().rev().collect();

        let located = locate_or_create_group(&mut host, window_id, "Later", &candidates)
            .expect("create should succeed")
            .expect("group should be created");

        assert_eq!(located.seeded_with, Some(first));
        let group = host.group(located.group_id).expect("group exists");
        assert_eq!(group.title, "Later");
        assert_eq!(group.color, GroupColor::Grey);
        assert!(group.collapsed);
        assert_eq!(host.members_of(located.group_id), vec![first]);
        assert_eq!(host.tab(second).and_then(|tab| tab.group_id), None);
    }

    #[test]
    fn seeds_with_blank_tab_when_every_candidate_is_active() {
        let mut host = MemoryTabHost::default();
        let window_id = host.open_window();
        host.open_tab(window_id, "https://one.example", true)
            .expect("tab should open");
        let tabs = host.list_tabs(window_id).expect("listing");
        let candidates: Vec<&Tab> = tabs.iter().collect();

        let located = locate_or_create_group(&mut host, window_id, "Later", &candidates)
            .expect("create should succeed")
            .expect("group should be created");

        assert!(matches!(
            host.calls().first(),
            Some(HostCall::CreateTab { url, active: false, .. }) if url == SEED_TAB_URL
        ));
        let seed = located.seeded_with.expect("seeded");
        assert_eq!(
            host.tab(seed).and_then(|tab| tab.url.as_deref()),
            Some(SEED_TAB_URL)
        );
    }

    #[test]
    fn find_group_ignores_other_titles_and_windows() {
        let mut host = MemoryTabHost::default();
        let window_id = host.open_window();
        let other_window = host.open_window();
        let tab_id = host
            .open_tab(other_window, "https://one.example", true)
            .expect("tab should open");
        let group_id = host.group_tabs(&[tab_id], None).expect("group");
        host.update_group(
            group_id,
            GroupUpdate {
                title: Some("Later".to_owned()),
                ..GroupUpdate::default()
            },
        )
        .expect("title");

        assert_eq!(find_group(&mut host, window_id, "Later").expect("query"), None);
        assert_eq!(find_group(&mut host, other_window, "Soon").expect("query"), None);
        assert!(find_group(&mut host, other_window, "Later")
            .expect("query")
            .is_some());
    }
}
