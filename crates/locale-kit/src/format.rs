//! Small formatting helpers keyed on locale codes.

use crate::controller::LocaleController;
use locale_kit_core::{I18nConfig, catalog::KEY_SEPARATOR};

/// The language whose counters do not inflect, so one text serves every count.
pub const SPECIAL_PLURAL_LOCALE: &str = "ja";

/// Maps a locale code to the tag used for date formatting.
pub fn date_locale_tag(code: &str) -> &str {
    match code {
        "ja" => "ja-JP",
        "en" => "en-US",
        "zh-TW" => "zh-TW",
        "ko" => "ko-KR",
        other => other,
    }
}

/// Display name of `code`, or the code itself when none is configured.
pub fn display_name<'a>(config: &'a I18nConfig, code: &'a str) -> &'a str {
    config.locale_name(code)
}

/// Picks the singular or plural text for `count`.
///
/// When `current_locale` is the special-cased language and `special` is given,
/// it is returned regardless of the count.
pub fn pluralize<'a>(
    current_locale: &str,
    count: i64,
    singular: &'a str,
    plural: &'a str,
    special: Option<&'a str>,
) -> &'a str {
    if current_locale == SPECIAL_PLURAL_LOCALE
        && let Some(text) = special
    {
        return text;
    }

    if count == 1 { singular } else { plural }
}

/// Builds `"{namespace}.{key}"`.
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}{}{}", namespace, KEY_SEPARATOR, key)
}

impl LocaleController {
    /// Date formatting tag for the active locale.
    pub fn date_locale(&self) -> String {
        let current = self
            .engine()
            .locale()
            .filter(|locale| !locale.is_empty())
            .unwrap_or_else(|| self.config().default_locale().to_string());
        date_locale_tag(&current).to_string()
    }

    pub fn locale_name(&self, code: &str) -> String {
        display_name(self.config(), code).to_string()
    }

    /// [`pluralize`] against the active locale.
    pub fn pluralize(
        &self,
        count: i64,
        singular: &str,
        plural: &str,
        special: Option<&str>,
    ) -> String {
        pluralize(&self.current_locale(), count, singular, plural, special).to_string()
    }
}
