#![doc = include_str!("../README.md")]

pub mod controller;
pub mod format;
pub mod host;
pub mod server;
#[cfg(feature = "web")]
pub mod web;

pub use controller::{ControllerTimings, LocaleChange, LocaleController, LocaleListener};
pub use format::{
    SPECIAL_PLURAL_LOCALE, date_locale_tag, display_name, namespaced_key, pluralize,
};
pub use host::{
    FixedLocaleHint, Host, ImmediateScheduler, JsonFilePreferences, LocaleHint, ManualScheduler,
    MemoryPreferences, NoopReloader, NormalizedHint, PreferenceStore, Reloader, Scheduler,
    StoreError, ThreadScheduler,
};
#[cfg(feature = "system-locale")]
pub use host::SystemLocaleHint;
pub use server::{HandleFn, Handle, HandleOutcome, I18nHandle, RequestScope, Resolver};

pub use locale_kit_core::{
    Catalog, ConfigError, ExecutionContext, FluentEngine, FluentValue, I18nConfig, I18nOptions,
    LocaleEnvironment, LocalizationError, TranslationEngine, resolve_initial_locale,
};

#[cfg(feature = "toml")]
pub use locale_kit_toml as toml;

use std::sync::Arc;

/// Builds a controller over a fresh [`FluentEngine`] and applies `options`.
pub fn controller(options: I18nOptions, host: Host) -> LocaleController {
    let mut controller = LocaleController::new(Arc::new(FluentEngine::new()), host);
    controller.initialize(options);
    controller
}
