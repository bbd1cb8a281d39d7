//! Initial locale resolution.

use crate::config::I18nConfig;
use unic_langid::LanguageIdentifier;

/// Separator between the primary language subtag and the rest of a locale code.
pub const SUBTAG_SEPARATOR: char = '-';

/// Whether the code runs with a user in front of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A client with access to persisted preferences and a user-agent hint.
    #[default]
    Interactive,
    /// Server-side request handling; environment signals are ignored.
    NonInteractive,
}

impl ExecutionContext {
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// Snapshot of the signals the resolver may consult.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocaleEnvironment<'a> {
    pub context: ExecutionContext,
    /// Locale previously persisted by the user, if any.
    pub persisted: Option<&'a str>,
    /// Locale reported by the user agent, if any.
    pub user_agent: Option<&'a str>,
}

impl<'a> LocaleEnvironment<'a> {
    pub fn interactive(persisted: Option<&'a str>, user_agent: Option<&'a str>) -> Self {
        Self {
            context: ExecutionContext::Interactive,
            persisted,
            user_agent,
        }
    }

    pub fn non_interactive() -> Self {
        Self {
            context: ExecutionContext::NonInteractive,
            persisted: None,
            user_agent: None,
        }
    }
}

/// Computes the locale to activate on startup.
///
/// First match wins: a persisted preference that is a configured locale, an
/// exact user-agent match, the first configured locale sharing the
/// user-agent's primary subtag, and finally the default locale. Outside an
/// interactive context the default locale is always returned.
pub fn resolve_initial_locale(config: &I18nConfig, env: &LocaleEnvironment<'_>) -> String {
    if !env.context.is_interactive() {
        return config.default_locale().to_string();
    }

    if let Some(saved) = env.persisted
        && config.contains(saved)
    {
        return saved.to_string();
    }

    if let Some(hint) = env.user_agent.filter(|hint| !hint.is_empty()) {
        if config.contains(hint) {
            return hint.to_string();
        }

        let language = primary_subtag(hint);
        if let Some(matched) = config
            .locales()
            .iter()
            .find(|locale| locale.starts_with(language))
        {
            return matched.clone();
        }
    }

    config.default_locale().to_string()
}

/// Returns the portion of `code` before the first region separator.
pub fn primary_subtag(code: &str) -> &str {
    code.split(SUBTAG_SEPARATOR).next().unwrap_or(code)
}

/// Normalizes a raw platform locale string into a BCP 47 tag.
///
/// Strips encoding suffixes (`.UTF-8`) and modifiers (`@euro`), replaces
/// underscores with hyphens and validates the result.
pub fn normalize_locale_tag(raw: &str) -> Option<String> {
    let stripped = raw.trim().split(['.', '@']).next().unwrap_or_default().trim();
    if stripped.is_empty() {
        return None;
    }

    stripped
        .replace('_', "-")
        .parse::<LanguageIdentifier>()
        .ok()
        .filter(|lang| lang.language.as_str() != "und")
        .map(|lang| lang.to_string())
}
