mod common;

use common::FakeView;
use tv_core::{
    Browser, CatalogStatus, EngineFault, EngineSignal, FaultKind, Message, Placeholder,
    ScrollMetrics, SelectError, SessionState,
};
use tv_proto::config::ListConfig;
use tv_proto::{Catalog, CatalogError, ChannelRecord, Locale};

type TestBrowser = Browser<FakeView, common::FakeFactory, common::FakeSink>;

fn browser() -> (TestBrowser, common::Shared) {
    let (session, calls) = common::session(true, false);
    let browser = Browser::new(FakeView::default(), session, &ListConfig::default(), Locale::En);
    (browser, calls)
}

fn numbered(n: usize) -> Catalog {
    (0..n)
        .map(|i| ChannelRecord::new(format!("Channel {}", i), format!("u{}", i)))
        .collect::<Vec<_>>()
        .into()
}

#[test]
fn shows_loading_until_catalog_arrives() {
    let (mut browser, _) = browser();
    assert_eq!(browser.view().placeholder, Some(Placeholder::Loading));
    assert_eq!(browser.status(), CatalogStatus::Loading);

    // Typed before the catalog landed; applied once it does.
    browser.set_query("bb");
    assert_eq!(browser.view().placeholder, Some(Placeholder::Loading));

    browser.load_catalog(Catalog::new(common::channels(&["BBC One", "CNN", "bbc two"])));
    let names: Vec<_> = browser.view().rows.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["BBC One", "bbc two"]);
}

#[test]
fn catalog_failure_shows_placeholder() {
    let (mut browser, _) = browser();
    let err = CatalogError::Status { status: 500 };
    browser.catalog_failed(&err);
    assert_eq!(browser.status(), CatalogStatus::Failed);
    assert_eq!(browser.view().placeholder, Some(Placeholder::CatalogLoadFailed));
    assert!(browser.view().rows.is_empty());
    assert!(!browser.view().more);
}

#[test]
fn scrolling_pages_through_the_list() {
    let (mut browser, _) = browser();
    browser.load_catalog(numbered(120));
    assert_eq!(browser.view().rows.len(), 50);
    assert!(browser.view().more);

    // Far from the bottom: nothing happens.
    assert_eq!(browser.on_scroll(ScrollMetrics::new(0.0, 500.0, 2000.0)), 0);

    assert_eq!(browser.on_scroll(ScrollMetrics::new(1400.0, 500.0, 2000.0)), 50);
    assert_eq!(browser.on_scroll(ScrollMetrics::new(3500.0, 500.0, 4000.0)), 20);
    assert_eq!(browser.view().rows.len(), 120);
    assert!(!browser.view().more);
    assert_eq!(browser.on_scroll(ScrollMetrics::new(4500.0, 500.0, 4800.0)), 0);
}

#[test]
fn no_matches_shows_placeholder() {
    let (mut browser, _) = browser();
    browser.load_catalog(Catalog::new(common::channels(&["BBC", "CNN"])));
    browser.set_query("zzz");
    assert!(browser.view().rows.is_empty());
    assert_eq!(browser.view().placeholder, Some(Placeholder::NoResults));
}

#[test]
fn select_plays_and_hides_overlay_on_manifest() {
    let (mut browser, _) = browser();
    browser.load_catalog(Catalog::new(common::channels(&["BBC", "CNN"])));
    browser.select(1).unwrap();

    assert_eq!(browser.highlight(), Some(1));
    assert_eq!(browser.view().highlight, Some(1));
    assert!(browser.overlay().is_visible());
    assert_eq!(browser.overlay().title(), "CNN");

    let id = browser.session().session_id();
    browser.on_engine_signal(id, EngineSignal::ManifestParsed);
    assert!(!browser.overlay().is_visible());
    assert!(browser.session().state().is_playing());
}

#[test]
fn fatal_fault_puts_message_up() {
    let (mut browser, _) = browser();
    browser.load_catalog(Catalog::new(common::channels(&["BBC"])));
    browser.select(0).unwrap();
    let id = browser.session().session_id();
    browser.on_engine_signal(id, EngineSignal::ManifestParsed);
    browser.on_engine_signal(
        id,
        EngineSignal::Fault(EngineFault::fatal(FaultKind::Other, "bad")),
    );
    assert!(browser.overlay().is_visible());
    assert_eq!(browser.overlay().message(), Some(Message::PlaybackFailed));
    assert_eq!(browser.overlay().logo(), None);
    assert_eq!(browser.session().state(), &SessionState::Disposed);
}

#[test]
fn transient_fault_leaves_overlay_alone() {
    let (mut browser, _) = browser();
    browser.load_catalog(Catalog::new(common::channels(&["BBC"])));
    browser.select(0).unwrap();
    let id = browser.session().session_id();
    browser.on_engine_signal(id, EngineSignal::ManifestParsed);
    browser.on_engine_signal(
        id,
        EngineSignal::Fault(EngineFault::transient(FaultKind::Media, "glitch")),
    );
    assert!(!browser.overlay().is_visible());
    assert!(browser.session().state().is_playing());
}

#[test]
fn missing_url_aborts_without_mutation() {
    let (mut browser, calls) = browser();
    browser.load_catalog(Catalog::new(vec![
        ChannelRecord::new("BBC", "u0"),
        ChannelRecord::new("Broken", ""),
    ]));
    browser.select(0).unwrap();
    let id = browser.session().session_id();
    browser.on_engine_signal(id, EngineSignal::ManifestParsed);
    let log_len = calls.borrow().log.len();

    let err = browser.select(1).unwrap_err();
    assert!(matches!(err, SelectError::MissingUrl { .. }));
    assert_eq!(browser.highlight(), Some(0));
    assert_eq!(browser.view().highlight, Some(0));
    assert!(!browser.overlay().is_visible());
    assert!(browser.session().state().is_playing());
    assert_eq!(calls.borrow().log.len(), log_len);
}

#[test]
fn entry_without_url_field_loads_but_cannot_be_picked() {
    let (mut browser, calls) = browser();
    let catalog =
        tv_proto::channel::parse_catalog(r#"[{"name": "BBC", "url": "a"}, {"name": "Broken"}]"#)
            .unwrap();
    browser.load_catalog(catalog);
    assert_eq!(browser.view().rows.len(), 2);

    let err = browser.select(1).unwrap_err();
    assert_eq!(err, SelectError::MissingUrl { name: "Broken".into() });
    assert_eq!(browser.highlight(), None);
    assert!(!browser.overlay().is_visible());
    assert_eq!(calls.borrow().created, 0);
}

#[test]
fn select_out_of_range_is_rejected() {
    let (mut browser, _) = browser();
    browser.load_catalog(numbered(120));
    // Only the first batch is materialized.
    let err = browser.select(80).unwrap_err();
    assert!(matches!(err, SelectError::OutOfRange { index: 80 }));
    assert_eq!(browser.highlight(), None);
}

#[test]
fn refilter_clears_highlight() {
    let (mut browser, _) = browser();
    browser.load_catalog(Catalog::new(common::channels(&["BBC", "CNN"])));
    browser.select(0).unwrap();
    browser.set_query("cnn");
    assert_eq!(browser.highlight(), None);
    assert_eq!(browser.view().highlight, None);
    // Playback is not interrupted by filtering.
    assert!(matches!(
        browser.session().state(),
        SessionState::Attaching { .. }
    ));
}

#[test]
fn stop_hides_overlay_and_idles() {
    let (mut browser, calls) = browser();
    browser.load_catalog(Catalog::new(common::channels(&["BBC"])));
    browser.select(0).unwrap();
    browser.stop();
    assert!(!browser.overlay().is_visible());
    assert_eq!(browser.session().state(), &SessionState::Idle);
    assert_eq!(calls.borrow().live, 0);
}

#[test]
fn load_more_is_a_noop_once_exhausted() {
    let (mut browser, _) = browser();
    browser.load_catalog(numbered(70));
    assert_eq!(browser.load_more(), 20);
    assert_eq!(browser.load_more(), 0);
    assert_eq!(browser.renderer().position(), 70);
    assert_eq!(browser.query(), "");
}
