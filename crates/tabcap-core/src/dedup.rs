use url::Url;

use crate::host::{Tab, TabHost};
use crate::ids::TabId;
use crate::ordering::creation_key;
use crate::report::Action;
use crate::timestamps::TimestampStore;

const INTERNAL_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-extension",
    "edge",
    "brave",
    "moz-extension",
    "devtools",
    "view-source",
];

pub fn normalize_url(raw: &str, keep_hash: bool) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if keep_hash {
        return Some(url.as_str().to_owned());
    }
    let mut normalized = url.origin().ascii_serialization();
    normalized.push_str(url.path());
    if let Some(query) = url.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    Some(normalized)
}

/// Browser and extension pages, placeholders, and anything unparsable.
pub fn is_internal_url(raw: &str, settings_page_url: &str) -> bool {
    if !settings_page_url.is_empty() && raw.starts_with(settings_page_url) {
        return true;
    }
    match Url::parse(raw) {
        Ok(url) => INTERNAL_SCHEMES.contains(&url.scheme()),
        Err(_) => true,
    }
}

/// Keeps the oldest tab showing `changed`'s page and closes the rest.
pub(crate) fn resolve_duplicates<H, S>(
    host: &mut H,
    store: &S,
    keep_hash: bool,
    settings_page_url: &str,
    changed: &Tab,
    actions: &mut Vec<Action>,
) -> Result<Vec<TabId>, H::Error>
where
    H: TabHost,
    S: TimestampStore + ?Sized,
{
    let (Some(changed_id), Some(changed_url)) = (changed.id, changed.url.as_deref()) else {
        return Ok(Vec::new());
    };
    if is_internal_url(changed_url, settings_page_url) {
        return Ok(Vec::new());
    }
    let Some(identity) = normalize_url(changed_url, keep_hash) else {
        return Ok(Vec::new());
    };

    let tabs = host.list_tabs(changed.window_id)?;
    let duplicates: Vec<&Tab> = tabs
        .iter()
        .filter(|tab| tab.id.is_some() && tab.id != Some(changed_id))
        .filter(|tab| {
            tab.url
                .as_deref()
                .filter(|url| !is_internal_url(url, settings_page_url))
                .and_then(|url| normalize_url(url, keep_hash))
                .is_some_and(|other| other == identity)
        })
        .collect();
    if duplicates.is_empty() {
        return Ok(Vec::new());
    }

    let mut members: Vec<(u64, TabId)> = Vec::with_capacity(duplicates.len() + 1);
    members.push((creation_key(store, changed), changed_id));
    members.extend(
        duplicates
            .iter()
            .filter_map(|tab| tab.id.map(|id| (creation_key(store, tab), id))),
    );
    let Some(&(_, kept)) = members.iter().min() else {
        return Ok(Vec::new());
    };
    let closed: Vec<TabId> = members
        .iter()
        .map(|(_, id)| *id)
        .filter(|id| *id != kept)
        .collect();

    tracing::debug!(
        window_id = %changed.window_id,
        %kept,
        closing = closed.len(),
        "closing duplicate tabs"
    );
    host.remove_tabs(&closed)?;
    actions.push(Action::DuplicatesClosed {
        kept,
        closed: closed.clone(),
    });

    if closed.contains(&changed_id) {
        host.activate_tab(kept)?;
        actions.push(Action::Focused { tab_id: kept });
    }
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use crate::memory::{HostCall, MemoryTabHost};
    use crate::timestamps::{MemoryTimestamps, TimestampKind};

    use super::*;

    const SETTINGS_PAGE: &str = "chrome-extension://tabcap/options.html";

    #[test]
    fn normalization_drops_fragment_only_when_asked() {
        assert_eq!(
            normalize_url("https://x.example/a?q=1#h", false).as_deref(),
            Some("https://x.example/a?q=1")
        );
        assert_eq!(
            normalize_url("https://x.example/a?q=1#h", true).as_deref(),
            Some("https://x.example/a?q=1#h")
        );
        assert_eq!(normalize_url("not a url", true), None);
    }

    #[test]
    fn internal_pages_are_recognized() {
        assert!(is_internal_url("about:blank", SETTINGS_PAGE));
        assert!(is_internal_url("chrome://newtab/", SETTINGS_PAGE));
        assert!(is_internal_url(
            "chrome-extension://other/page.html",
            SETTINGS_PAGE
        ));
        assert!(is_internal_url(
            "chrome-extension://tabcap/options.html#advanced",
            SETTINGS_PAGE
        ));
        assert!(!is_internal_url("https://x.example/a", SETTINGS_PAGE));
    }

    fn stamp(store: &mut MemoryTimestamps, tab_id: TabId, created: u64) {
        store.set(tab_id, TimestampKind::Created, created);
    }

    #[test]
    fn newer_duplicate_is_closed_and_older_tab_focused() {
        let mut host = MemoryTabHost::default();
        let mut store = MemoryTimestamps::default();
        let window_id = host.open_window();
        let a = host
            .open_tab(window_id, "https://x.example/a#h", false)
            .expect("tab a");
        let b = host
            .open_tab(window_id, "https://x.example/a#h", true)
            .expect("tab b");
        stamp(&mut store, a, 1);
        stamp(&mut store, b, 2);
        let changed = host.tab(b).cloned().expect("tab b exists");
        let mut actions = Vec::new();

        let closed = resolve_duplicates(
            &mut host,
            &store,
            true,
            SETTINGS_PAGE,
            &changed,
            &mut actions,
        )
        .expect("resolve should succeed");

        assert_eq!(closed, vec![b]);
        assert!(host.tab(b).is_none());
        assert!(host.tab(a).expect("a survives").active);
        assert_eq!(
            actions,
            vec![
                Action::DuplicatesClosed {
                    kept: a,
                    closed: vec![b]
                },
                Action::Focused { tab_id: a },
            ]
        );
    }

    #[test]
    fn fragment_is_ignored_without_keep_hash() {
        let mut host = MemoryTabHost::default();
        let mut store = MemoryTimestamps::default();
        let window_id = host.open_window();
        let a = host
            .open_tab(window_id, "https://x.example/a#h", true)
            .expect("tab a");
        let b = host
            .open_tab(window_id, "https://x.example/a#other", false)
            .expect("tab b");
        stamp(&mut store, a, 1);
        stamp(&mut store, b, 2);
        let changed = host.tab(b).cloned().expect("tab b exists");
        let mut actions = Vec::new();

        let closed =
            resolve_duplicates(&mut host, &store, true, SETTINGS_PAGE, &changed, &mut actions)
                .expect("resolve should succeed");
        assert!(closed.is_empty(), "fragments differ, so no duplicate");

        let closed =
            resolve_duplicates(&mut host, &store, false, SETTINGS_PAGE, &changed, &mut actions)
                .expect("resolve should succeed");
        assert_eq!(closed, vec![b]);
        assert!(host.tab(a).is_some());
    }

    #[test]
    fn older_changed_tab_survives_without_refocus() {
        let mut host = MemoryTabHost::default();
        let mut store = MemoryTimestamps::default();
        let window_id = host.open_window();
        let a = host
            .open_tab(window_id, "https://x.example/a", true)
            .expect("tab a");
        let b = host
            .open_tab(window_id, "https://x.example/a", false)
            .expect("tab b");
        let c = host
            .open_tab(window_id, "https://x.example/a", false)
            .expect("tab c");
        stamp(&mut store, a, 1);
        stamp(&mut store, b, 2);
        stamp(&mut store, c, 3);
        let changed = host.tab(a).cloned().expect("tab a exists");
        let mut actions = Vec::new();

        let closed = resolve_duplicates(
            &mut host,
            &store,
            true,
            SETTINGS_PAGE,
            &changed,
            &mut actions,
        )
        .expect("resolve should succeed");

        assert_eq!(closed, vec![b, c]);
        assert_eq!(host.calls(), &[HostCall::RemoveTabs(vec![b, c])]);
        assert!(!actions
            .iter()
            .any(|action| matches!(action, Action::Focused { .. })));
    }

    #[test]
    fn internal_urls_are_never_deduplicated() {
        let mut host = MemoryTabHost::default();
        let store = MemoryTimestamps::default();
        let window_id = host.open_window();
        host.open_tab(window_id, "about:blank", true)
            .expect("tab a");
        let b = host
            .open_tab(window_id, "about:blank", false)
            .expect("tab b");
        let changed = host.tab(b).cloned().expect("tab b exists");
        let mut actions = Vec::new();

        let closed = resolve_duplicates(
            &mut host,
            &store,
            true,
            SETTINGS_PAGE,
            &changed,
            &mut actions,
        )
        .expect("resolve should succeed");

        assert!(closed.is_empty());
        assert!(host.calls().is_empty());
    }
}
