use crate::host::Host;
use locale_kit_core::{
    DEFAULT_LOCALE, EngineInit, FluentValue, I18nConfig, I18nOptions, LocaleEnvironment,
    LocalizationError, TranslationEngine, resolve_initial_locale,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with the new locale after every activation.
pub type LocaleListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Delays used for the controller's deferred work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerTimings {
    /// Delay before the resolved locale is activated on client setup.
    pub activation_delay: Duration,
    /// Delay between persisting a new locale and reloading the application.
    pub reload_delay: Duration,
}

impl ControllerTimings {
    pub const DEFAULT_ACTIVATION_DELAY: Duration = Duration::ZERO;
    pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(100);
}

impl Default for ControllerTimings {
    fn default() -> Self {
        Self {
            activation_delay: Self::DEFAULT_ACTIVATION_DELAY,
            reload_delay: Self::DEFAULT_RELOAD_DELAY,
        }
    }
}

/// Outcome of [`LocaleController::change_locale`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocaleChange {
    /// The locale is not configured; nothing changed.
    Rejected,
    /// The locale is active.
    Applied,
    /// The locale is active, persisted, and an application reload is scheduled.
    AppliedWithReload,
}

/// Drives locale setup and switching for one application (client) or one
/// request (server).
pub struct LocaleController {
    config: I18nConfig,
    initialized: bool,
    engine: Arc<dyn TranslationEngine>,
    host: Host,
    timings: ControllerTimings,
    listeners: Arc<RwLock<Vec<LocaleListener>>>,
}

impl std::fmt::Debug for LocaleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleController")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .field("host", &self.host)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl LocaleController {
    pub fn new(engine: Arc<dyn TranslationEngine>, host: Host) -> Self {
        Self {
            config: I18nConfig::default(),
            initialized: false,
            engine,
            host,
            timings: ControllerTimings::default(),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_config(mut self, config: I18nConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn with_timings(mut self, timings: ControllerTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Replaces the whole configuration with `options`, applying defaults.
    pub fn initialize(&mut self, options: I18nOptions) {
        self.set_config(I18nConfig::from_options(options));
    }

    /// Replaces the whole configuration.
    ///
    /// Membership problems are logged but never rejected.
    pub fn set_config(&mut self, config: I18nConfig) {
        for issue in config.issues() {
            tracing::warn!("i18n configuration: {}", issue);
        }
        self.config = config;
    }

    pub fn config(&self) -> &I18nConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn TranslationEngine> {
        &self.engine
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn timings(&self) -> ControllerTimings {
        self.timings
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Clears the setup flag; the active locale and catalogs are untouched.
    pub fn reset_initialization(&mut self) {
        self.initialized = false;
    }

    /// Runs the setup matching the host's execution context.
    pub fn setup(&mut self) {
        if self.host.is_interactive() {
            self.setup_client();
        } else {
            self.setup_server();
        }
    }

    /// One-time client setup: loads catalogs, resolves the initial locale from
    /// the environment and activates it on the next scheduler turn.
    pub fn setup_client(&mut self) {
        if self.initialized {
            tracing::debug!("i18n already initialized, skipping");
            return;
        }

        self.load_catalogs();

        let initial_locale = self.resolve_initial_locale();
        tracing::debug!("Setting up i18n with initial locale: {}", initial_locale);

        self.engine.init(EngineInit {
            fallback_locale: self.config.fallback_locale().to_string(),
            initial_locale: initial_locale.clone(),
        });

        if self.host.is_interactive() {
            let engine = self.engine.clone();
            let listeners = self.listeners.clone();
            self.host.scheduler().schedule(
                self.timings.activation_delay,
                Box::new(move || {
                    activate(engine.as_ref(), &listeners, &initial_locale);
                    tracing::debug!("Locale set to: {}", initial_locale);
                }),
            );
        }

        self.initialized = true;
    }

    /// One-time server setup: loads catalogs and starts on the default locale.
    pub fn setup_server(&mut self) {
        if self.initialized {
            return;
        }

        self.load_catalogs();
        self.engine.init(EngineInit {
            fallback_locale: self.config.fallback_locale().to_string(),
            initial_locale: self.config.default_locale().to_string(),
        });

        self.initialized = true;
    }

    /// The locale client setup would activate in the current environment.
    pub fn resolve_initial_locale(&self) -> String {
        let persisted = self.host.persisted(self.config.persistence_key());
        let user_agent = self.host.user_agent_locale();
        let env = LocaleEnvironment {
            context: self.host.context(),
            persisted: persisted.as_deref(),
            user_agent: user_agent.as_deref(),
        };
        resolve_initial_locale(&self.config, &env)
    }

    /// Switches to `locale`.
    ///
    /// On an interactive host the choice is also persisted and, unless
    /// disabled, an application reload is scheduled.
    pub fn change_locale(&mut self, locale: &str) -> LocaleChange {
        if !self.config.contains(locale) {
            tracing::error!("Locale {} is not available", locale);
            return LocaleChange::Rejected;
        }

        tracing::debug!("Changing locale to {}", locale);

        if !self.host.is_interactive() {
            activate(self.engine.as_ref(), &self.listeners, locale);
            return LocaleChange::Applied;
        }

        self.reset_initialization();
        self.load_catalogs();
        activate(self.engine.as_ref(), &self.listeners, locale);
        self.persist(locale);

        if !self.config.reload_on_change() {
            return LocaleChange::Applied;
        }

        tracing::debug!(
            "Locale changed to {}, reloading in {:?}",
            locale,
            self.timings.reload_delay
        );
        let reloader = self.host.reloader();
        self.host
            .scheduler()
            .schedule(self.timings.reload_delay, Box::new(move || reloader.reload()));

        LocaleChange::AppliedWithReload
    }

    fn persist(&self, locale: &str) {
        let Some(store) = self.host.preferences() else {
            return;
        };
        if let Err(e) = store.set(self.config.persistence_key(), locale) {
            tracing::warn!("Failed to persist locale '{}': {}", locale, e);
        }
    }

    fn load_catalogs(&self) {
        for (locale, catalog) in self.config.translations() {
            self.engine.load(locale, catalog);
        }
    }

    /// Registers a listener called after every locale activation.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// The active locale, or `"en"` while none is set.
    pub fn current_locale(&self) -> String {
        self.engine
            .locale()
            .filter(|locale| !locale.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    }

    /// Country code of the active locale, then of the default locale, else empty.
    pub fn current_country(&self) -> String {
        let active = self.engine.locale().filter(|locale| !locale.is_empty());
        self.config.country_for(active.as_deref()).to_string()
    }

    pub fn has_translation(&self, key: &str, locale: &str) -> bool {
        self.engine.has_message(locale, key)
    }

    /// Translates `key`, returning `fallback` when no real translation exists.
    pub fn translate<'a>(
        &self,
        key: &str,
        fallback: &str,
        args: Option<&HashMap<&str, FluentValue<'a>>>,
    ) -> String {
        match self.engine.format(key, args) {
            Ok(translated) if !translated.is_empty() && translated != key => translated,
            Ok(_) => fallback.to_string(),
            Err(LocalizationError::MessageNotFound(_)) => {
                tracing::debug!("No translation for '{}', using fallback", key);
                fallback.to_string()
            },
            Err(e) => {
                tracing::error!("Translation error for key {}: {}", key, e);
                fallback.to_string()
            },
        }
    }
}

fn activate(engine: &dyn TranslationEngine, listeners: &RwLock<Vec<LocaleListener>>, locale: &str) {
    engine.set_locale(locale);
    let listeners = listeners.read().clone();
    for listener in listeners {
        listener(locale);
    }
}
