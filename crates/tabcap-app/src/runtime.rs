use std::fmt::Display;

use tabcap_core::{
    CachedSettings, Clock, Engine, MemoryTimestamps, Report, SettingsProvider, TabEventSource,
    TabHost,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError<SError> {
    #[error("settings unavailable: {0}")]
    Settings(SError),
}

/// Feeds browser lifecycle events to the engine, one at a time, with the
/// settings in force when each event is handled.
pub struct AppRuntime<H, P: SettingsProvider, C: Clock> {
    host: H,
    engine: Engine<MemoryTimestamps, C>,
    settings: CachedSettings<P>,
}

impl<H, P, C> AppRuntime<H, P, C>
where
    H: TabHost + TabEventSource,
    H::Error: Display,
    P: SettingsProvider,
    C: Clock,
{
    pub fn new(host: H, provider: P, clock: C, settings_page_url: &str) -> Self {
        Self {
            host,
            engine: Engine::new(MemoryTimestamps::default(), clock)
                .with_settings_page(settings_page_url),
            settings: CachedSettings::new(provider),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[cfg(test)]
    pub fn engine(&self) -> &Engine<MemoryTimestamps, C> {
        &self.engine
    }

    pub fn provider_mut(&mut self) -> &mut P {
        self.settings.provider_mut()
    }

    /// The stored settings changed; the next event reloads them.
    pub fn settings_changed(&mut self) {
        self.settings.invalidate();
    }

    /// Handles queued events until the host has none left. A failed event
    /// is logged and skipped; the browser state it left behind is picked up
    /// by the next decision. Settings are loaded before an event is taken,
    /// so an unreadable store leaves the queue untouched.
    pub fn pump(&mut self) -> Result<Vec<Report>, RuntimeError<P::Error>> {
        let mut reports = Vec::new();
        loop {
            let settings = self.settings.current().map_err(RuntimeError::Settings)?;
            let Some(event) = self.host.next_event() else {
                break;
            };
            tracing::trace!(?event, "tab event");
            match self.engine.dispatch(&mut self.host, &settings, event) {
                Ok(report) if report.is_empty() => {}
                Ok(report) => reports.push(report),
                Err(error) => tracing::warn!(%error, "tab event handling failed"),
            }
        }
        Ok(reports)
    }
}
