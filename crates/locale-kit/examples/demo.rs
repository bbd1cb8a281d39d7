use locale_kit::{
    Catalog, FixedLocaleHint, FluentValue, Host, I18nOptions, LocaleChange, ManualScheduler,
    MemoryPreferences,
};
use std::collections::HashMap;
use std::sync::Arc;

fn options() -> I18nOptions {
    I18nOptions::new(["en", "ja", "zh-TW", "ko"])
        .with_default_locale("en")
        .with_locale_name("en", "English")
        .with_locale_name("ja", "日本語")
        .with_locale_name("zh-TW", "繁體中文")
        .with_locale_name("ko", "한국어")
        .with_locale_country("en", "US")
        .with_locale_country("ja", "JP")
        .with_locale_country("zh-TW", "TW")
        .with_locale_country("ko", "KR")
        .with_translations(
            "en",
            Catalog::from_pairs([
                ("app.title", "Demo"),
                ("cart.items", "{ $count } items in your cart"),
            ]),
        )
        .with_translations(
            "ja",
            Catalog::from_pairs([
                ("app.title", "デモ"),
                ("cart.items", "カートに{ $count }個の商品"),
            ]),
        )
        .with_translations("zh-TW", Catalog::from_pairs([("app.title", "示範")]))
        .with_translations("ko", Catalog::from_pairs([("app.title", "데모")]))
}

fn print_state(i18n: &locale_kit::LocaleController) {
    let mut args = HashMap::new();
    args.insert("count", FluentValue::from(3));

    println!(
        "{} ({}, {}): {} / {} / {}",
        i18n.locale_name(&i18n.current_locale()),
        i18n.current_country(),
        i18n.date_locale(),
        i18n.translate("app.title", "Demo", None),
        i18n.translate("cart.items", "3 items", Some(&args)),
        i18n.pluralize(3, "item", "items", Some("個")),
    );
}

fn main() {
    let scheduler = Arc::new(ManualScheduler::new());
    let preferences = Arc::new(MemoryPreferences::new());
    let host = Host::client(
        preferences.clone(),
        Some(Arc::new(FixedLocaleHint::new("ja-JP"))),
    )
    .with_scheduler(scheduler.clone())
    .with_reloader(Arc::new(|| println!("reloading application")));

    let mut i18n = locale_kit::controller(options(), host);
    i18n.subscribe(|locale| println!("locale activated: {}", locale));

    i18n.setup_client();
    scheduler.run_pending();
    print_state(&i18n);

    for locale in ["zh-TW", "fr"] {
        match i18n.change_locale(locale) {
            LocaleChange::Rejected => println!("{} is not available", locale),
            LocaleChange::Applied | LocaleChange::AppliedWithReload => {
                scheduler.run_pending();
                print_state(&i18n);
            },
        }
    }

    println!("persisted: {:?}", preferences.writes());
}
