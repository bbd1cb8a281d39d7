use locale_kit::{
    Catalog, ControllerTimings, FixedLocaleHint, FluentEngine, FluentValue, Host, I18nOptions,
    LocaleChange, LocaleController, LocalizationError, ManualScheduler, MemoryPreferences,
    PreferenceStore, StoreError, TranslationEngine,
};
use locale_kit_core::EngineInit;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Engine double that records calls and can be told how to answer lookups.
#[derive(Default)]
struct RecordingEngine {
    loads: AtomicUsize,
    inits: AtomicUsize,
    locale: Mutex<Option<String>>,
    answer: Mutex<Option<Answer>>,
}

#[derive(Clone)]
enum Answer {
    EchoKey,
    Fail,
    Text(String),
}

impl RecordingEngine {
    fn answering(answer: Answer) -> Self {
        let engine = Self::default();
        *engine.answer.lock() = Some(answer);
        engine
    }
}

impl TranslationEngine for RecordingEngine {
    fn load(&self, _locale: &str, _catalog: &Catalog) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }

    fn init(&self, init: EngineInit) {
        self.inits.fetch_add(1, Ordering::SeqCst);
        *self.locale.lock() = Some(init.initial_locale);
    }

    fn set_locale(&self, locale: &str) {
        *self.locale.lock() = Some(locale.to_string());
    }

    fn locale(&self) -> Option<String> {
        self.locale.lock().clone()
    }

    fn has_message(&self, _locale: &str, _key: &str) -> bool {
        false
    }

    fn format<'a>(
        &self,
        key: &str,
        _args: Option<&HashMap<&str, FluentValue<'a>>>,
    ) -> Result<String, LocalizationError> {
        match self.answer.lock().clone() {
            Some(Answer::EchoKey) | None => Ok(key.to_string()),
            Some(Answer::Fail) => Err(LocalizationError::Backend(anyhow::anyhow!(
                "engine exploded"
            ))),
            Some(Answer::Text(text)) => Ok(text),
        }
    }
}

/// Preference store whose writes always fail.
struct UnavailablePreferences;

impl PreferenceStore for UnavailablePreferences {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage is full".to_string()))
    }
}

struct Fixture {
    controller: LocaleController,
    engine: Arc<FluentEngine>,
    preferences: Arc<MemoryPreferences>,
    scheduler: Arc<ManualScheduler>,
    reloads: Arc<AtomicUsize>,
}

fn options() -> I18nOptions {
    I18nOptions::new(["en", "ja", "ko"])
        .with_default_locale("en")
        .with_locale_name("ja", "日本語")
        .with_locale_country("en", "US")
        .with_locale_country("ja", "JP")
        .with_translations(
            "en",
            Catalog::from_pairs([
                ("app.title", "Demo"),
                ("cart.items", "{ $count } items"),
            ]),
        )
        .with_translations("ja", Catalog::from_pairs([("app.title", "デモ")]))
}

fn fixture(preferences: MemoryPreferences, hint: Option<&str>) -> Fixture {
    let engine = Arc::new(FluentEngine::new());
    let preferences = Arc::new(preferences);
    let scheduler = Arc::new(ManualScheduler::new());
    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = reloads.clone();

    let mut host = Host::client(preferences.clone(), None)
        .with_scheduler(scheduler.clone())
        .with_reloader(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    if let Some(hint) = hint {
        host = host.with_hint(Arc::new(FixedLocaleHint::new(hint)));
    }

    let mut controller = LocaleController::new(engine.clone(), host);
    controller.initialize(options());

    Fixture {
        controller,
        engine,
        preferences,
        scheduler,
        reloads,
    }
}

#[test]
fn setup_client_runs_once() {
    let engine = Arc::new(RecordingEngine::default());
    let scheduler = Arc::new(ManualScheduler::new());
    let host = Host::client(Arc::new(MemoryPreferences::new()), None).with_scheduler(scheduler);
    let mut controller = LocaleController::new(engine.clone(), host);
    controller.initialize(options());

    controller.setup_client();
    controller.setup_client();

    assert!(controller.is_initialized());
    assert_eq!(engine.loads.load(Ordering::SeqCst), 2);
    assert_eq!(engine.inits.load(Ordering::SeqCst), 1);
}

#[test]
fn setup_client_activates_persisted_locale_on_next_turn() {
    let mut f = fixture(
        MemoryPreferences::with_value("preferred-locale", "ko"),
        Some("ja"),
    );
    let activations = Arc::new(Mutex::new(Vec::new()));
    let seen = activations.clone();
    f.controller
        .subscribe(move |locale| seen.lock().push(locale.to_string()));

    f.controller.setup_client();

    assert_eq!(f.engine.init_count(), 1);
    assert_eq!(f.engine.fallback_locale().as_deref(), Some("en"));
    assert_eq!(f.scheduler.pending_delays(), vec![Duration::ZERO]);
    assert!(activations.lock().is_empty());

    f.scheduler.run_pending();

    assert_eq!(f.controller.current_locale(), "ko");
    assert_eq!(*activations.lock(), vec!["ko".to_string()]);
}

#[test]
fn setup_client_negotiates_user_agent_subtag() {
    let mut f = fixture(MemoryPreferences::new(), Some("ja-JP"));

    f.controller.setup_client();
    f.scheduler.run_pending();

    assert_eq!(f.controller.current_locale(), "ja");
    assert_eq!(f.controller.current_country(), "JP");
}

#[test]
fn setup_server_ignores_environment() {
    let engine = Arc::new(FluentEngine::new());
    let mut controller = LocaleController::new(engine.clone(), Host::server());
    controller.initialize(options());

    controller.setup_server();
    controller.setup_server();

    assert_eq!(controller.current_locale(), "en");
    assert_eq!(engine.init_count(), 1);
}

#[test]
fn reset_initialization_allows_setup_again() {
    let engine = Arc::new(FluentEngine::new());
    let mut controller = LocaleController::new(engine.clone(), Host::server());
    controller.initialize(options());

    controller.setup_server();
    controller.reset_initialization();
    assert!(!controller.is_initialized());
    controller.setup_server();

    assert_eq!(engine.init_count(), 2);
}

#[test]
fn change_to_unknown_locale_is_a_no_op() {
    let mut f = fixture(MemoryPreferences::new(), None);
    f.controller.setup_client();
    f.scheduler.run_pending();

    assert_eq!(f.controller.change_locale("fr"), LocaleChange::Rejected);

    assert_eq!(f.controller.current_locale(), "en");
    assert!(f.preferences.writes().is_empty());
    assert_eq!(f.scheduler.pending(), 0);
    assert!(f.controller.is_initialized());
}

#[test]
fn change_locale_persists_activates_and_schedules_one_reload() {
    let mut f = fixture(MemoryPreferences::new(), None);
    f.controller.setup_client();
    f.scheduler.run_pending();

    assert_eq!(
        f.controller.change_locale("ja"),
        LocaleChange::AppliedWithReload
    );

    assert_eq!(f.controller.current_locale(), "ja");
    assert_eq!(f.controller.translate("app.title", "Demo", None), "デモ");
    assert_eq!(
        f.preferences.writes(),
        vec![("preferred-locale".to_string(), "ja".to_string())]
    );
    assert!(!f.controller.is_initialized());
    assert_eq!(
        f.scheduler.pending_delays(),
        vec![ControllerTimings::DEFAULT_RELOAD_DELAY]
    );
    assert_eq!(f.reloads.load(Ordering::SeqCst), 0);

    f.scheduler.run_pending();
    assert_eq!(f.reloads.load(Ordering::SeqCst), 1);
}

#[test]
fn change_locale_without_reload() {
    let engine = Arc::new(FluentEngine::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let preferences = Arc::new(MemoryPreferences::new());
    let host = Host::client(preferences.clone(), None).with_scheduler(scheduler.clone());
    let mut controller = LocaleController::new(engine, host)
        .with_timings(ControllerTimings {
            activation_delay: Duration::from_millis(5),
            reload_delay: Duration::from_millis(250),
        });
    controller.initialize(options().with_storage_key("app-locale").with_reload_on_change(false));

    controller.setup_client();
    assert_eq!(scheduler.pending_delays(), vec![Duration::from_millis(5)]);
    scheduler.run_pending();

    assert_eq!(controller.change_locale("ko"), LocaleChange::Applied);
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(
        preferences.writes(),
        vec![("app-locale".to_string(), "ko".to_string())]
    );
}

#[test]
fn change_locale_on_server_only_activates() {
    let mut controller = locale_kit::controller(options(), Host::server());
    controller.setup_server();

    assert_eq!(controller.change_locale("ja"), LocaleChange::Applied);
    assert_eq!(controller.current_locale(), "ja");
    assert!(controller.is_initialized());
}

#[test]
fn current_country_falls_back_to_default_locale() {
    let mut f = fixture(MemoryPreferences::new(), None);
    f.controller.setup_client();
    f.scheduler.run_pending();

    f.controller.change_locale("ko");
    assert_eq!(f.controller.current_country(), "US");
}

#[test]
fn current_locale_defaults_to_english_before_setup() {
    let controller = LocaleController::new(Arc::new(FluentEngine::new()), Host::server());

    assert_eq!(controller.current_locale(), "en");
    assert_eq!(controller.current_country(), "");
}

#[test]
fn has_translation_checks_loaded_catalogs() {
    let mut f = fixture(MemoryPreferences::new(), None);
    assert!(!f.controller.has_translation("app.title", "en"));

    f.controller.setup_client();

    assert!(f.controller.has_translation("app.title", "en"));
    assert!(f.controller.has_translation("app.title", "ja"));
    assert!(!f.controller.has_translation("cart.items", "ja"));
    assert!(!f.controller.has_translation("app.title", "fr"));
}

#[test]
fn translate_interpolates_and_falls_back() {
    let mut f = fixture(MemoryPreferences::new(), None);
    f.controller.setup_client();
    f.scheduler.run_pending();

    let mut args = HashMap::new();
    args.insert("count", FluentValue::from(3));
    assert_eq!(
        f.controller.translate("cart.items", "some items", Some(&args)),
        "3 items"
    );
    assert_eq!(f.controller.translate("missing.key", "Fallback", None), "Fallback");
}

#[test]
fn translate_falls_back_when_engine_echoes_key() {
    let controller =
        LocaleController::new(Arc::new(RecordingEngine::answering(Answer::EchoKey)), Host::server());

    assert_eq!(controller.translate("missing.key", "Fallback", None), "Fallback");
}

#[test]
fn translate_falls_back_when_engine_fails() {
    let controller =
        LocaleController::new(Arc::new(RecordingEngine::answering(Answer::Fail)), Host::server());

    assert_eq!(controller.translate("missing.key", "Fallback", None), "Fallback");
}

#[test]
fn translate_returns_real_translation() {
    let controller = LocaleController::new(
        Arc::new(RecordingEngine::answering(Answer::Text("Bonjour".to_string()))),
        Host::server(),
    );

    assert_eq!(controller.translate("greeting", "Hello", None), "Bonjour");
}

#[test]
fn formatting_helpers_follow_active_locale() {
    let mut f = fixture(MemoryPreferences::new(), None);
    f.controller.setup_client();
    f.scheduler.run_pending();

    assert_eq!(f.controller.date_locale(), "en-US");
    assert_eq!(f.controller.pluralize(1, "item", "items", Some("個")), "item");
    assert_eq!(f.controller.pluralize(2, "item", "items", Some("個")), "items");
    assert_eq!(f.controller.locale_name("ja"), "日本語");
    assert_eq!(f.controller.locale_name("ko"), "ko");

    f.controller.change_locale("ja");

    assert_eq!(f.controller.date_locale(), "ja-JP");
    assert_eq!(f.controller.pluralize(1, "item", "items", Some("個")), "個");
    assert_eq!(f.controller.pluralize(7, "item", "items", Some("個")), "個");
}

#[test]
fn change_locale_survives_persistence_failure() {
    let scheduler = Arc::new(ManualScheduler::new());
    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = reloads.clone();
    let host = Host::client(Arc::new(UnavailablePreferences), None)
        .with_scheduler(scheduler.clone())
        .with_reloader(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    let mut controller = LocaleController::new(Arc::new(FluentEngine::new()), host);
    controller.initialize(options());
    controller.setup_client();
    scheduler.run_pending();

    assert_eq!(
        controller.change_locale("ja"),
        LocaleChange::AppliedWithReload
    );
    assert_eq!(controller.current_locale(), "ja");
    assert_eq!(
        scheduler.pending_delays(),
        vec![ControllerTimings::DEFAULT_RELOAD_DELAY]
    );

    scheduler.run_pending();
    assert_eq!(reloads.load(Ordering::SeqCst), 1);
}

#[test]
fn translate_keeps_text_starting_with_fluent_syntax_characters() {
    let mut controller = locale_kit::controller(
        I18nOptions::new(["en"]).with_translations(
            "en",
            Catalog::from_pairs([
                ("loading", "...Loading"),
                ("beta", "[Beta] New editor"),
                ("required", "* required"),
                ("plain", "Hello"),
            ]),
        ),
        Host::server(),
    );
    controller.setup_server();

    for (key, expected) in [
        ("loading", "...Loading"),
        ("beta", "[Beta] New editor"),
        ("required", "* required"),
        ("plain", "Hello"),
    ] {
        assert!(controller.has_translation(key, "en"));
        assert_eq!(controller.translate(key, "FALLBACK", None), expected);
    }
}
