//! Browser host built on `web-sys`: `localStorage` for persistence,
//! `navigator.language` as the locale hint and `location.reload()` to
//! re-render after a locale change.

use crate::host::{Host, LocaleHint, PreferenceStore, Reloader, Scheduler, StoreError, Task};
use std::sync::Arc;
use std::time::Duration;

fn window() -> Option<web_sys::Window> {
    web_sys::window()
}

fn local_storage() -> Result<web_sys::Storage, StoreError> {
    window()
        .ok_or_else(|| StoreError::Unavailable("no window".to_string()))?
        .local_storage()
        .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?
        .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".to_string()))
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl PreferenceStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        local_storage().ok()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        local_storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }
}

/// `window.navigator.language`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NavigatorHint;

impl LocaleHint for NavigatorHint {
    fn locale(&self) -> Option<String> {
        window()?.navigator().language()
    }
}

/// `window.location.reload()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PageReloader;

impl Reloader for PageReloader {
    fn reload(&self) {
        let Some(window) = window() else {
            return;
        };
        if let Err(e) = window.location().reload() {
            tracing::error!("Failed to reload page: {:?}", e);
        }
    }
}

/// `setTimeout` through `gloo-timers`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        gloo_timers::callback::Timeout::new(millis, task).forget();
    }
}

impl Host {
    /// An interactive host backed by the browser window.
    pub fn browser() -> Self {
        Self::client(Arc::new(BrowserStorage), Some(Arc::new(NavigatorHint)))
            .with_reloader(Arc::new(PageReloader))
            .with_scheduler(Arc::new(TimeoutScheduler))
    }
}
