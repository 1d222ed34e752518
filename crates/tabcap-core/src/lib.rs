pub mod dedup;
pub mod engine;
pub mod event;
pub mod group;
pub mod host;
pub mod ids;
pub mod limit;
pub mod memory;
pub mod ordering;
pub mod report;
pub mod settings;
pub mod timestamps;

pub use dedup::{is_internal_url, normalize_url};
pub use engine::{Engine, EngineError};
pub use event::TabEvent;
pub use group::{find_group, locate_or_create_group, LocatedGroup, SEED_TAB_URL};
pub use host::{GroupColor, GroupUpdate, Tab, TabEventSource, TabGroup, TabHost};
pub use ids::{GroupId, TabId, WindowId};
pub use limit::WindowSnapshot;
pub use memory::{HostCall, MemoryHostError, MemoryTabHost};
pub use ordering::{creation_key, order_tabs, recency_key};
pub use report::{Action, Report};
pub use settings::{
    CachedSettings, ExceedBehavior, GroupStrategy, RestoreStrategy, Settings, SettingsError,
    SettingsProvider, SortKey,
};
pub use timestamps::{Clock, MemoryTimestamps, SystemClock, TimestampKind, TimestampStore};
