use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Locale used when neither the options nor the locale list name one.
pub const DEFAULT_LOCALE: &str = "en";

/// Key under which the chosen locale is persisted when none is configured.
pub const DEFAULT_PERSISTENCE_KEY: &str = "preferred-locale";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// No locales were configured.
    #[error("At least one locale must be configured")]
    EmptyLocales,
    /// A locale appears more than once in `locales`.
    #[error("Locale '{0}' is listed more than once")]
    DuplicateLocale(String),
    /// The default locale is not one of the configured locales.
    #[error("Default locale '{0}' is not one of the configured locales")]
    UnknownDefaultLocale(String),
    /// The fallback locale is not one of the configured locales.
    #[error("Fallback locale '{0}' is not one of the configured locales")]
    UnknownFallbackLocale(String),
    /// The options document could not be parsed.
    #[error("Failed to parse i18n options: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// The i18n options as supplied by the embedding application.
///
/// This is the externally facing shape; every optional field is defaulted by
/// [`I18nConfig::from_options`].
///
/// ```json
/// {
///   "locales": ["en", "ja"],
///   "defaultLocale": "en",
///   "localeNames": { "en": "English", "ja": "日本語" },
///   "translations": { "en": { "app": { "title": "Demo" } } },
///   "reloadOnLocaleChange": false
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct I18nOptions {
    /// Available locale codes, in preference order.
    pub locales: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_names: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_countries: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub translations: BTreeMap<String, Catalog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_storage_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_on_locale_change: Option<bool>,
}

impl I18nOptions {
    pub fn new<I, S>(locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locales: locales.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    pub fn with_fallback_locale(mut self, locale: impl Into<String>) -> Self {
        self.fallback_locale = Some(locale.into());
        self
    }

    pub fn with_locale_name(mut self, locale: impl Into<String>, name: impl Into<String>) -> Self {
        self.locale_names
            .get_or_insert_with(BTreeMap::new)
            .insert(locale.into(), name.into());
        self
    }

    pub fn with_locale_country(
        mut self,
        locale: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.locale_countries
            .get_or_insert_with(BTreeMap::new)
            .insert(locale.into(), country.into());
        self
    }

    pub fn with_translations(mut self, locale: impl Into<String>, catalog: Catalog) -> Self {
        self.translations.insert(locale.into(), catalog);
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.local_storage_key = Some(key.into());
        self
    }

    pub fn with_reload_on_change(mut self, reload: bool) -> Self {
        self.reload_on_locale_change = Some(reload);
        self
    }
}

/// The normalized i18n configuration.
///
/// Built wholesale from [`I18nOptions`]; there is no way to patch a single
/// field after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct I18nConfig {
    locales: Vec<String>,
    default_locale: String,
    fallback_locale: String,
    locale_names: BTreeMap<String, String>,
    locale_countries: BTreeMap<String, String>,
    translations: BTreeMap<String, Catalog>,
    persistence_key: String,
    reload_on_change: bool,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self::from_options(I18nOptions::default())
    }
}

impl I18nConfig {
    /// Applies the documented defaults to `options`.
    ///
    /// Malformed input is never rejected here; see [`I18nConfig::validate`].
    pub fn from_options(options: I18nOptions) -> Self {
        let I18nOptions {
            locales,
            default_locale,
            fallback_locale,
            locale_names,
            locale_countries,
            translations,
            local_storage_key,
            reload_on_locale_change,
        } = options;

        let default_locale = default_locale
            .filter(|code| !code.is_empty())
            .or_else(|| locales.first().cloned())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let fallback_locale = fallback_locale
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| default_locale.clone());

        Self {
            locales,
            default_locale,
            fallback_locale,
            locale_names: locale_names.unwrap_or_default(),
            locale_countries: locale_countries.unwrap_or_default(),
            translations,
            persistence_key: local_storage_key
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| DEFAULT_PERSISTENCE_KEY.to_string()),
            reload_on_change: reload_on_locale_change != Some(false),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        I18nOptions::from_json_str(source).map(Self::from_options)
    }

    /// Checks the membership invariants the rest of the system relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.issues().into_iter().next().map_or(Ok(()), Err)
    }

    /// Returns every invariant violation, in a stable order.
    pub fn issues(&self) -> Vec<ConfigError> {
        let mut issues = Vec::new();
        if self.locales.is_empty() {
            issues.push(ConfigError::EmptyLocales);
        }

        let mut seen = HashSet::new();
        for code in &self.locales {
            if !seen.insert(code.as_str()) {
                issues.push(ConfigError::DuplicateLocale(code.clone()));
            }
        }

        if !self.locales.is_empty() {
            if !self.contains(&self.default_locale) {
                issues.push(ConfigError::UnknownDefaultLocale(
                    self.default_locale.clone(),
                ));
            }
            if !self.contains(&self.fallback_locale) {
                issues.push(ConfigError::UnknownFallbackLocale(
                    self.fallback_locale.clone(),
                ));
            }
        }
        issues
    }

    pub fn contains(&self, code: &str) -> bool {
        self.locales.iter().any(|locale| locale == code)
    }

    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn fallback_locale(&self) -> &str {
        &self.fallback_locale
    }

    pub fn locale_names(&self) -> &BTreeMap<String, String> {
        &self.locale_names
    }

    pub fn locale_countries(&self) -> &BTreeMap<String, String> {
        &self.locale_countries
    }

    pub fn translations(&self) -> &BTreeMap<String, Catalog> {
        &self.translations
    }

    pub fn persistence_key(&self) -> &str {
        &self.persistence_key
    }

    pub fn reload_on_change(&self) -> bool {
        self.reload_on_change
    }

    /// Display name for `code`, or the code itself.
    pub fn locale_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.locale_names
            .get(code)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(code)
    }

    /// Country code for `code`, falling back to the default locale's country.
    pub fn country_for(&self, code: Option<&str>) -> &str {
        code.and_then(|code| self.non_empty_country(code))
            .or_else(|| self.non_empty_country(&self.default_locale))
            .unwrap_or_default()
    }

    fn non_empty_country(&self, code: &str) -> Option<&str> {
        self.locale_countries
            .get(code)
            .map(String::as_str)
            .filter(|country| !country.is_empty())
    }
}

impl From<I18nOptions> for I18nConfig {
    fn from(options: I18nOptions) -> Self {
        Self::from_options(options)
    }
}
