//! Reads locale-kit options from an `i18n.toml` file.
//!
//! ```toml
//! locales = ["en", "ja", "zh-TW", "ko"]
//! default_locale = "en"
//! assets_dir = "i18n"
//!
//! [names]
//! ja = "日本語"
//!
//! [countries]
//! ja = "JP"
//! ```
//!
//! Catalogs are read from `{assets_dir}/{locale}.json`.

use fs_err as fs;
use locale_kit_core::{Catalog, I18nOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in a manifest directory.
pub const CONFIG_FILE_NAME: &str = "i18n.toml";

#[derive(Debug, Error)]
pub enum I18nTomlError {
    /// Configuration file not found.
    #[error("i18n.toml configuration file not found")]
    NotFound,
    /// Failed to read configuration or catalog file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A catalog file is not valid JSON.
    #[error("Failed to parse catalog for locale '{locale}'")]
    CatalogError {
        locale: String,
        #[source]
        source: serde_json::Error,
    },
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("i18n")
}

/// The contents of `i18n.toml`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct I18nToml {
    /// Available locale codes, in preference order.
    pub locales: Vec<String>,
    #[serde(default)]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub fallback_locale: Option<String>,
    /// Key under which the chosen locale is persisted.
    #[serde(default)]
    pub storage_key: Option<String>,
    #[serde(default)]
    pub reload_on_change: Option<bool>,
    /// Directory holding one `{locale}.json` catalog per locale.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    #[serde(default)]
    pub countries: BTreeMap<String, String>,
}

impl I18nToml {
    pub fn from_toml_str(source: &str) -> Result<Self, I18nTomlError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads the configuration from a path.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, I18nTomlError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(I18nTomlError::NotFound);
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reads `i18n.toml` from `CARGO_MANIFEST_DIR`.
    pub fn read_from_manifest_dir() -> Result<Self, I18nTomlError> {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").map_err(|_| I18nTomlError::NotFound)?;
        Self::from_manifest_dir(Path::new(&manifest_dir))
    }

    pub fn from_manifest_dir(manifest_dir: &Path) -> Result<Self, I18nTomlError> {
        Self::read_from_path(manifest_dir.join(CONFIG_FILE_NAME))
    }

    /// Returns the assets directory resolved against `base_dir`.
    pub fn assets_dir_from_base(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.assets_dir)
    }

    /// Reads the catalog of every configured locale.
    ///
    /// A locale without a catalog file gets an empty catalog.
    pub fn load_catalogs(
        &self,
        base_dir: &Path,
    ) -> Result<BTreeMap<String, Catalog>, I18nTomlError> {
        let assets = self.assets_dir_from_base(base_dir);
        let mut catalogs = BTreeMap::new();

        for locale in &self.locales {
            let path = assets.join(format!("{}.json", locale));
            if !path.is_file() {
                tracing::warn!(
                    "No catalog for locale '{}' at '{}'",
                    locale,
                    path.display()
                );
                catalogs.insert(locale.clone(), Catalog::new());
                continue;
            }

            let content = fs::read_to_string(&path)?;
            let catalog =
                Catalog::from_json_str(&content).map_err(|source| I18nTomlError::CatalogError {
                    locale: locale.clone(),
                    source,
                })?;
            tracing::debug!("Read {} messages for '{}'", catalog.len(), locale);
            catalogs.insert(locale.clone(), catalog);
        }

        Ok(catalogs)
    }

    /// Converts the file into the options accepted by the locale controller,
    /// reading catalogs relative to `base_dir`.
    pub fn into_options(self, base_dir: &Path) -> Result<I18nOptions, I18nTomlError> {
        let translations = self.load_catalogs(base_dir)?;

        Ok(I18nOptions {
            locales: self.locales,
            default_locale: self.default_locale,
            fallback_locale: self.fallback_locale,
            locale_names: Some(self.names),
            locale_countries: Some(self.countries),
            translations,
            local_storage_key: self.storage_key,
            reload_on_locale_change: self.reload_on_change,
        })
    }
}

/// Reads `i18n.toml` and its catalogs from `manifest_dir`.
pub fn options_from_manifest_dir(manifest_dir: &Path) -> Result<I18nOptions, I18nTomlError> {
    I18nToml::from_manifest_dir(manifest_dir)?.into_options(manifest_dir)
}
