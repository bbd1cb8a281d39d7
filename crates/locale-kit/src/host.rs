//! Host environment seams: preference persistence, the user-agent locale
//! hint, application reload and deferred task scheduling.

use fs_err as fs;
use locale_kit_core::{ExecutionContext, normalize_locale_tag};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access preference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode preferences: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Preference storage is unavailable: {0}")]
    Unavailable(String),
}

/// A key/value store that survives across sessions.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory preferences, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.values.write().insert(key.into(), value.into());
        store
    }

    /// Every successful `set`, in call order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().clone()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.write().insert(key.to_string(), value.to_string());
        self.writes.lock().push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// Preferences kept in a JSON object file.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock();
        match self.read_all() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable preference file '{}': {}",
                    self.path.display(),
                    e
                );
                None
            },
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut values = self.read_all().unwrap_or_else(|e| {
            tracing::warn!(
                "Overwriting unreadable preference file '{}': {}",
                self.path.display(),
                e
            );
            BTreeMap::new()
        });
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        Ok(())
    }
}

/// Source of the user-agent locale hint.
pub trait LocaleHint: Send + Sync {
    fn locale(&self) -> Option<String>;
}

/// A fixed hint, for hosts that learn the locale out of band.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedLocaleHint(pub Option<String>);

impl FixedLocaleHint {
    pub fn new(locale: impl Into<String>) -> Self {
        Self(Some(locale.into()))
    }
}

impl LocaleHint for FixedLocaleHint {
    fn locale(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The operating system locale, normalized to a BCP 47 tag.
#[cfg(feature = "system-locale")]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLocaleHint;

#[cfg(feature = "system-locale")]
impl LocaleHint for SystemLocaleHint {
    fn locale(&self) -> Option<String> {
        sys_locale::get_locale().and_then(|raw| normalize_locale_tag(&raw))
    }
}

/// Normalizes whatever `inner` reports.
#[derive(Clone, Debug, Default)]
pub struct NormalizedHint<H>(pub H);

impl<H: LocaleHint> LocaleHint for NormalizedHint<H> {
    fn locale(&self) -> Option<String> {
        self.0.locale().and_then(|raw| normalize_locale_tag(&raw))
    }
}

/// Restarts the application so every view re-renders with the new catalog.
pub trait Reloader: Send + Sync {
    fn reload(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReloader;

impl Reloader for NoopReloader {
    fn reload(&self) {
        tracing::debug!("Reload requested but the host does not support reloading");
    }
}

impl<F> Reloader for F
where
    F: Fn() + Send + Sync,
{
    fn reload(&self) {
        self()
    }
}

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after the current synchronous turn. Scheduled tasks cannot be
/// cancelled.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Runs every task on its own thread after sleeping for `delay`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        std::thread::spawn(move || {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            task();
        });
    }
}

/// Runs tasks inline, ignoring the delay.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, _delay: Duration, task: Task) {
        task();
    }
}

/// Queues tasks until the host event loop calls [`ManualScheduler::run_pending`].
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(Duration, Task)>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Delays of the queued tasks, in scheduling order.
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.queue.lock().iter().map(|(delay, _)| *delay).collect()
    }

    /// Runs queued tasks in order of their delay and returns how many ran.
    ///
    /// Tasks scheduled while draining are left for the next call.
    pub fn run_pending(&self) -> usize {
        let mut tasks = std::mem::take(&mut *self.queue.lock());
        tasks.sort_by_key(|(delay, _)| *delay);
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        self.queue.lock().push((delay, task));
    }
}

/// Everything the locale controller needs from its surroundings.
#[derive(Clone)]
pub struct Host {
    context: ExecutionContext,
    preferences: Option<Arc<dyn PreferenceStore>>,
    hint: Option<Arc<dyn LocaleHint>>,
    reloader: Arc<dyn Reloader>,
    scheduler: Arc<dyn Scheduler>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("context", &self.context)
            .field("preferences", &self.preferences.is_some())
            .field("hint", &self.hint.is_some())
            .finish_non_exhaustive()
    }
}

impl Host {
    /// A non-interactive host: no storage, no hint, no reload.
    pub fn server() -> Self {
        Self {
            context: ExecutionContext::NonInteractive,
            preferences: None,
            hint: None,
            reloader: Arc::new(NoopReloader),
            scheduler: Arc::new(ImmediateScheduler),
        }
    }

    /// An interactive host with the given storage and hint.
    pub fn client(
        preferences: Arc<dyn PreferenceStore>,
        hint: Option<Arc<dyn LocaleHint>>,
    ) -> Self {
        Self {
            context: ExecutionContext::Interactive,
            preferences: Some(preferences),
            hint,
            reloader: Arc::new(NoopReloader),
            scheduler: Arc::new(ThreadScheduler),
        }
    }

    /// An interactive desktop host persisting to `path` and using the
    /// operating system locale as the hint.
    #[cfg(feature = "system-locale")]
    pub fn desktop(path: impl Into<PathBuf>) -> Self {
        Self::client(
            Arc::new(JsonFilePreferences::new(path)),
            Some(Arc::new(SystemLocaleHint)),
        )
    }

    pub fn with_reloader(mut self, reloader: Arc<dyn Reloader>) -> Self {
        self.reloader = reloader;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_hint(mut self, hint: Arc<dyn LocaleHint>) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn is_interactive(&self) -> bool {
        self.context.is_interactive()
    }

    pub fn preferences(&self) -> Option<&Arc<dyn PreferenceStore>> {
        self.preferences.as_ref()
    }

    /// Reads a persisted value; always `None` outside an interactive context.
    pub fn persisted(&self, key: &str) -> Option<String> {
        if !self.is_interactive() {
            return None;
        }
        self.preferences.as_ref().and_then(|store| store.get(key))
    }

    pub fn user_agent_locale(&self) -> Option<String> {
        if !self.is_interactive() {
            return None;
        }
        self.hint.as_ref().and_then(|hint| hint.locale())
    }

    pub fn reloader(&self) -> Arc<dyn Reloader> {
        self.reloader.clone()
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn json_file_preferences_round_trip_through_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/prefs.json");
        let store = JsonFilePreferences::new(&path);

        assert_eq!(store.get("preferred-locale"), None);
        store.set("preferred-locale", "ja").unwrap();
        store.set("theme", "dark").unwrap();

        let reopened = JsonFilePreferences::new(&path);
        assert_eq!(reopened.get("preferred-locale").as_deref(), Some("ja"));
        assert_eq!(reopened.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_preference_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFilePreferences::new(&path);
        assert_eq!(store.get("preferred-locale"), None);
        store.set("preferred-locale", "ko").unwrap();
        assert_eq!(store.get("preferred-locale").as_deref(), Some("ko"));
    }

    #[test]
    fn manual_scheduler_runs_in_delay_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (delay, label) in [(100, "reload"), (0, "activate")] {
            let order = order.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || order.lock().push(label)),
            );
        }

        assert_eq!(scheduler.pending(), 2);
        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(*order.lock(), vec!["activate", "reload"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn server_host_hides_environment() {
        let host = Host::server();

        assert!(!host.is_interactive());
        assert_eq!(host.persisted("preferred-locale"), None);
        assert_eq!(host.user_agent_locale(), None);
    }

    #[test]
    fn client_host_reads_storage_and_hint() {
        let host = Host::client(
            Arc::new(MemoryPreferences::with_value("preferred-locale", "ko")),
            Some(Arc::new(NormalizedHint(FixedLocaleHint::new("ja_JP.UTF-8")))),
        );

        assert_eq!(host.persisted("preferred-locale").as_deref(), Some("ko"));
        assert_eq!(host.user_agent_locale().as_deref(), Some("ja-JP"));
    }

    #[test]
    fn closures_act_as_reloaders() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let reloader: Arc<dyn Reloader> = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        reloader.reload();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
