//! Core functionality for locale-kit.
//!
//! This crate holds the pieces that do not depend on a host environment:
//! the normalized [`I18nConfig`], per-locale [`Catalog`]s, the
//! [`TranslationEngine`] seam with its Fluent-backed implementation, and the
//! pure initial-locale resolver.

pub mod catalog;
pub mod config;
pub mod localization;
pub mod resolver;

pub use catalog::Catalog;
pub use config::{
    ConfigError, DEFAULT_LOCALE, DEFAULT_PERSISTENCE_KEY, I18nConfig, I18nOptions,
};
pub use localization::{EngineInit, FluentEngine, LocalizationError, TranslationEngine};
pub use resolver::{
    ExecutionContext, LocaleEnvironment, normalize_locale_tag, primary_subtag,
    resolve_initial_locale,
};

#[doc(hidden)]
pub use fluent_bundle::FluentValue;
