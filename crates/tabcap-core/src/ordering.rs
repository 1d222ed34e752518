use crate::host::Tab;
use crate::settings::SortKey;
use crate::timestamps::{TimestampKind, TimestampStore};

/// Creation instant, or the tab id for tabs opened before tracking began.
pub fn creation_key<S: TimestampStore + ?Sized>(store: &S, tab: &Tab) -> u64 {
    match tab.id {
        Some(tab_id) => store
            .get(tab_id, TimestampKind::Created)
            .unwrap_or(tab_id.0),
        None => 0,
    }
}

pub fn recency_key<S: TimestampStore + ?Sized>(store: &S, tab: &Tab) -> u64 {
    tab.id
        .and_then(|tab_id| store.get(tab_id, TimestampKind::LastUsed))
        .unwrap_or(0)
}

/// Stable sort: equal keys keep their enumeration order in both directions.
pub fn order_tabs<'a, S: TimestampStore + ?Sized>(
    tabs: &'a [Tab],
    key: SortKey,
    ascending: bool,
    store: &S,
) -> Vec<&'a Tab> {
    let mut keyed: Vec<(u64, &Tab)> = tabs
        .iter()
        .map(|tab| {
            let value = match key {
                SortKey::Creation => creation_key(store, tab),
                SortKey::Recent => recency_key(store, tab),
            };
            (value, tab)
        })
        .collect();
    if ascending {
        keyed.sort_by(|(left, _), (right, _)| left.cmp(right));
    } else {
        keyed.sort_by(|(left, _), (right, _)| right.cmp(left));
    }
    keyed.into_iter().map(|(_, tab)| tab).collect()
}
