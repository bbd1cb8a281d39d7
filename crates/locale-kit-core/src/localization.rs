use crate::catalog::Catalog;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use unic_langid::LanguageIdentifier;

#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("The translation engine has not been initialized")]
    NotInitialized,
    #[error("No message found for key '{0}'")]
    MessageNotFound(String),
    #[error("Failed to format message '{key}': {message}")]
    Format { key: String, message: String },
    #[error("An underlying localization backend error occurred: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Startup parameters handed to [`TranslationEngine::init`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineInit {
    pub fallback_locale: String,
    pub initial_locale: String,
}

/// The translation backend the locale controller drives.
///
/// Implementations use interior mutability so they can be shared between the
/// controller and tasks it schedules for later.
pub trait TranslationEngine: Send + Sync {
    /// Adds `catalog` to the messages of `locale`; existing keys are replaced.
    fn load(&self, locale: &str, catalog: &Catalog);

    fn init(&self, init: EngineInit);

    /// Sets the active locale.
    fn set_locale(&self, locale: &str);

    /// The active locale, if one has been set.
    fn locale(&self) -> Option<String>;

    fn has_message(&self, locale: &str, key: &str) -> bool;

    fn format<'a>(
        &self,
        key: &str,
        args: Option<&HashMap<&str, FluentValue<'a>>>,
    ) -> Result<String, LocalizationError>;
}

/// Prefix of the Fluent message ids generated for catalog keys.
///
/// Catalog keys contain `.`, which Fluent identifiers do not allow, so every
/// key is mapped to a positional id when its catalog is compiled.
const MESSAGE_ID_PREFIX: &str = "m";

/// Characters Fluent refuses at the start of an indented pattern line.
const BLOCK_SPECIAL_CHARS: [char; 3] = ['.', '[', '*'];

/// A locale's messages together with the Fluent bundle compiled from them.
struct CompiledCatalog {
    catalog: Catalog,
    ids: HashMap<String, String>,
    bundle: FluentBundle<FluentResource>,
}

impl std::fmt::Debug for CompiledCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCatalog")
            .field("catalog", &self.catalog)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl CompiledCatalog {
    fn compile(locale: &str, catalog: Catalog) -> Self {
        let lang = locale.parse::<LanguageIdentifier>().unwrap_or_else(|_| {
            tracing::warn!("Locale '{}' is not a valid language identifier", locale);
            LanguageIdentifier::default()
        });

        let mut ids = HashMap::with_capacity(catalog.len());
        let mut source = String::new();
        for (index, (key, pattern)) in catalog.iter().enumerate() {
            if pattern.trim().is_empty() {
                continue;
            }
            let id = format!("{}{}", MESSAGE_ID_PREFIX, index);
            push_message(&mut source, &id, pattern);
            ids.insert(key.to_string(), id);
        }

        let resource = FluentResource::try_new(source).unwrap_or_else(|(resource, errs)| {
            tracing::warn!("Invalid messages in catalog for '{}': {:?}", locale, errs);
            resource
        });

        let mut bundle = FluentBundle::new_concurrent(vec![lang]);
        bundle.set_use_isolating(false);
        if let Err(errs) = bundle.add_resource(resource) {
            tracing::warn!("Failed to add catalog for '{}': {:?}", locale, errs);
        }

        Self {
            catalog,
            ids,
            bundle,
        }
    }

    fn format<'a>(
        &self,
        key: &str,
        args: Option<&HashMap<&str, FluentValue<'a>>>,
    ) -> Result<String, LocalizationError> {
        let Some(id) = self.ids.get(key) else {
            // Blank patterns are not compiled.
            return Ok(self.catalog.get(key).unwrap_or_default().to_string());
        };

        let message = self
            .bundle
            .get_message(id)
            .and_then(|message| message.value())
            .ok_or_else(|| {
                tracing::error!("Message '{}' is not a valid Fluent pattern", key);
                LocalizationError::Format {
                    key: key.to_string(),
                    message: "invalid Fluent pattern".to_string(),
                }
            })?;

        let fluent_args = args.map(|args| {
            let mut fa = FluentArgs::new();
            for (name, value) in args {
                fa.set(*name, value.clone());
            }
            fa
        });

        let mut errors = Vec::new();
        let value = self
            .bundle
            .format_pattern(message, fluent_args.as_ref(), &mut errors);

        if !errors.is_empty() {
            tracing::error!("Fluent formatting errors for id '{}': {:?}", key, errors);
            return Err(LocalizationError::Format {
                key: key.to_string(),
                message: format!("{:?}", errors),
            });
        }

        Ok(value.into_owned())
    }
}

/// Appends `pattern` to `source` as the Fluent message `id`.
///
/// The first line goes inline after `=`; the rest become indented block
/// lines, with a leading `.`, `[` or `*` escaped as a string literal.
fn push_message(source: &mut String, id: &str, pattern: &str) {
    let mut lines = pattern.lines();
    source.push_str(id);
    source.push_str(" = ");
    source.push_str(lines.next().unwrap_or_default());

    for line in lines {
        source.push_str("\n    ");
        let content = line.trim_start();
        match content.chars().next() {
            Some(first) if BLOCK_SPECIAL_CHARS.contains(&first) => {
                source.push_str(&line[..line.len() - content.len()]);
                source.push_str("{\"");
                source.push(first);
                source.push_str("\"}");
                source.push_str(&content[first.len_utf8()..]);
            },
            _ => source.push_str(line),
        }
    }
    source.push('\n');
}

#[derive(Debug, Default)]
struct EngineState {
    fallback_locale: Option<String>,
    active_locale: Option<String>,
    initialized: bool,
}

/// A [`TranslationEngine`] backed by `fluent-bundle`.
///
/// Each locale's catalog is compiled into one bundle when it is loaded.
/// Lookups try the active locale first and then the fallback locale.
#[derive(Debug, Default)]
pub struct FluentEngine {
    catalogs: RwLock<HashMap<String, CompiledCatalog>>,
    state: RwLock<EngineState>,
    loads: AtomicUsize,
    inits: AtomicUsize,
}

impl FluentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of catalog loads performed so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of times the engine has been initialized.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn fallback_locale(&self) -> Option<String> {
        self.state.read().fallback_locale.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    /// Locales to consult for a lookup, without duplicates.
    fn lookup_chain(&self) -> Vec<String> {
        let state = self.state.read();
        let mut chain = Vec::with_capacity(2);
        for locale in [&state.active_locale, &state.fallback_locale]
            .into_iter()
            .flatten()
        {
            if !chain.contains(locale) {
                chain.push(locale.clone());
            }
        }
        chain
    }
}

impl TranslationEngine for FluentEngine {
    fn load(&self, locale: &str, catalog: &Catalog) {
        let mut catalogs = self.catalogs.write();
        let mut merged = catalogs
            .remove(locale)
            .map(|compiled| compiled.catalog)
            .unwrap_or_default();
        merged.merge(catalog);
        catalogs.insert(locale.to_string(), CompiledCatalog::compile(locale, merged));
        self.loads.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Loaded {} messages for '{}'", catalog.len(), locale);
    }

    fn init(&self, init: EngineInit) {
        let mut state = self.state.write();
        state.fallback_locale = Some(init.fallback_locale);
        state.active_locale = Some(init.initial_locale);
        state.initialized = true;
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn set_locale(&self, locale: &str) {
        self.state.write().active_locale = Some(locale.to_string());
    }

    fn locale(&self) -> Option<String> {
        self.state.read().active_locale.clone()
    }

    fn has_message(&self, locale: &str, key: &str) -> bool {
        self.catalogs
            .read()
            .get(locale)
            .is_some_and(|compiled| compiled.catalog.contains(key))
    }

    fn format<'a>(
        &self,
        key: &str,
        args: Option<&HashMap<&str, FluentValue<'a>>>,
    ) -> Result<String, LocalizationError> {
        let chain = self.lookup_chain();
        if chain.is_empty() {
            return Err(LocalizationError::NotInitialized);
        }

        let catalogs = self.catalogs.read();
        for locale in &chain {
            if let Some(compiled) = catalogs.get(locale)
                && compiled.catalog.contains(key)
            {
                return compiled.format(key, args);
            }
        }

        Err(LocalizationError::MessageNotFound(key.to_string()))
    }
}
