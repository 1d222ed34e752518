use thiserror::Error;

use crate::dedup::resolve_duplicates;
use crate::event::TabEvent;
use crate::host::TabHost;
use crate::ids::WindowId;
use crate::limit::LimitPass;
use crate::report::Report;
use crate::settings::Settings;
use crate::timestamps::{Clock, TimestampKind, TimestampStore};

#[derive(Debug, Error)]
pub enum EngineError<E> {
    #[error("host operation failed: {0}")]
    Host(E),
}

pub struct Engine<S: TimestampStore, C: Clock> {
    timestamps: S,
    clock: C,
    settings_page_url: String,
}

impl<S: TimestampStore, C: Clock> Engine<S, C> {
    pub fn new(timestamps: S, clock: C) -> Self {
        Self {
            timestamps,
            clock,
            settings_page_url: String::new(),
        }
    }

    /// The extension's own settings page. Tabs showing it never count
    /// toward the limit and are never grouped or closed.
    pub fn with_settings_page(mut self, url: impl Into<String>) -> Self {
        self.settings_page_url = url.into();
        self
    }

    pub fn timestamps(&self) -> &S {
        &self.timestamps
    }

    pub fn dispatch<H: TabHost>(
        &mut self,
        host: &mut H,
        settings: &Settings,
        event: TabEvent,
    ) -> Result<Report, EngineError<H::Error>> {
        let mut report = Report::new(event.window_id());

        match event {
            TabEvent::Created { tab } => {
                if let Some(tab_id) = tab.id {
                    let now = self.clock.now_ms();
                    self.timestamps.set(tab_id, TimestampKind::Created, now);
                    self.timestamps.set(tab_id, TimestampKind::LastUsed, now);
                }

                let mut closed = Vec::new();
                if settings.keep_single_url && tab.url.is_some() {
                    closed = resolve_duplicates(
                        host,
                        &self.timestamps,
                        settings.keep_url_hash,
                        &self.settings_page_url,
                        &tab,
                        &mut report.actions,
                    )
                    .map_err(EngineError::Host)?;
                }

                // A tab closed as a duplicate must not be put back into the count.
                let ensure_present = match tab.id {
                    Some(tab_id) if closed.contains(&tab_id) => None,
                    _ => Some(&tab),
                };
                self.limit_pass(settings)
                    .enforce(host, tab.window_id, ensure_present, &mut report.actions)
                    .map_err(EngineError::Host)?;
            }
            TabEvent::Removed {
                tab_id,
                window_id,
                is_window_closing,
            } => {
                self.timestamps.remove(tab_id);
                if !is_window_closing {
                    self.limit_pass(settings)
                        .enforce(host, window_id, None, &mut report.actions)
                        .map_err(EngineError::Host)?;
                }
            }
            TabEvent::Activated { tab_id, .. } => {
                let now = self.clock.now_ms();
                self.timestamps.set(tab_id, TimestampKind::LastUsed, now);
            }
            TabEvent::UrlChanged { tab } => {
                if settings.keep_single_url {
                    resolve_duplicates(
                        host,
                        &self.timestamps,
                        settings.keep_url_hash,
                        &self.settings_page_url,
                        &tab,
                        &mut report.actions,
                    )
                    .map_err(EngineError::Host)?;
                }
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                window_id = %report.window_id,
                actions = report.actions.len(),
                "tab policy applied"
            );
        }
        Ok(report)
    }

    /// Runs the limit decision for a window without a triggering event.
    pub fn evaluate<H: TabHost>(
        &mut self,
        host: &mut H,
        settings: &Settings,
        window_id: WindowId,
    ) -> Result<Report, EngineError<H::Error>> {
        let mut report = Report::new(window_id);
        self.limit_pass(settings)
            .enforce(host, window_id, None, &mut report.actions)
            .map_err(EngineError::Host)?;
        Ok(report)
    }

    fn limit_pass<'a>(&'a self, settings: &'a Settings) -> LimitPass<'a, S> {
        LimitPass {
            store: &self.timestamps,
            settings,
            settings_page_url: &self.settings_page_url,
        }
    }
}
