use bus::{EventBus, PageEvent};
use net::{MemoryFetcher, Route};
use platform::{HeadlessHost, NativeCall, Viewport};
use runtime_nav::{
    LinkClick, NavigateConfig, NavigationReason, NavigationResult, ReadyState, ScrollPosition,
    Session,
};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use url::Url;

const HOME: &str = r#"<html><head><title>Home</title><link rel=stylesheet href="/site.css"></head>
<body><nav><a id=about href="/about">About</a></nav><main><h1>Home</h1></main></body></html>"#;

const ABOUT: &str = r#"<html><head><title>About</title><link rel=stylesheet href="/site.css"></head>
<body><nav><a id=about href="/about">About</a></nav><main><h1>About</h1><p>Team</p></main></body></html>"#;

fn url(path: &str) -> Url {
    Url::parse("https://a.test/")
        .and_then(|base| base.join(path))
        .expect("url")
}

fn site() -> Arc<MemoryFetcher> {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.route("https://a.test/", Route::html(HOME));
    fetcher.route("https://a.test/about", Route::html(ABOUT));
    fetcher.route("https://a.test/a", Route::html(HOME));
    fetcher.route("https://a.test/b", Route::html(ABOUT));
    fetcher.route("https://a.test/c", Route::html(HOME));
    fetcher.route(
        "https://a.test/legacy",
        Route::html(
            "<html><head><meta name=frugal-navigate content=false></head><body>old</body></html>",
        ),
    );
    fetcher.route("https://a.test/broken", Route::status(500, "<html></html>"));
    fetcher
}

fn start(fetcher: &Arc<MemoryFetcher>) -> (Session<HeadlessHost>, Receiver<PageEvent>) {
    let host = HeadlessHost::new(url("/"));
    start_with(fetcher, host, url("/"))
}

fn start_with(
    fetcher: &Arc<MemoryFetcher>,
    host: HeadlessHost,
    location: Url,
) -> (Session<HeadlessHost>, Receiver<PageEvent>) {
    let mut bus = EventBus::new();
    let events = bus.subscribe();
    let session = Session::start(
        NavigateConfig::default(),
        host,
        fetcher.clone(),
        bus,
        location,
        HOME,
    );
    (session, events)
}

fn assigns(session: &Session<HeadlessHost>) -> Vec<Url> {
    session
        .host()
        .calls()
        .iter()
        .filter_map(|call| match call {
            NativeCall::Assign(url) => Some(url.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn navigation_runs_lifecycle_once_and_records_history() {
    let fetcher = site();
    let (mut session, events) = start(&fetcher);
    let h1 = session.dom().elements_named("h1")[0];

    let result = session.navigate(url("/about")).expect("navigate");
    assert_eq!(result, NavigationResult::Success);
    assert_eq!(session.location(), &url("/about"));
    assert_eq!(session.ready_state(), ReadyState::Complete);
    assert_eq!(session.dom().text_content(h1), "About");
    assert_eq!(session.history().records().len(), 2);
    assert_eq!(session.history().index(), 1);
    assert!(assigns(&session).is_empty());

    let events: Vec<PageEvent> = events.try_iter().collect();
    assert_eq!(
        events,
        [
            PageEvent::SessionStart,
            PageEvent::ReadyStateChange(ReadyState::Loading),
            PageEvent::BeforeUnload,
            PageEvent::ReadyStateChange(ReadyState::Interactive),
            PageEvent::ReadyStateChange(ReadyState::Complete),
        ]
    );
    let patch = session.last_patch().expect("patched");
    assert!(patch.text_updates >= 2, "title and heading: {patch:?}");
    assert_eq!(patch.removed, 0);
}

#[test]
fn same_document_navigation_patches_nothing() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    let before = session.dom().to_html();
    session.navigate(url("/a")).expect("navigate");
    assert_eq!(session.last_patch().map(|p| p.total()), Some(0));
    assert_eq!(session.dom().to_html(), before);
}

#[test]
fn refused_navigations_fall_back_without_touching_the_page() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    let before = session.dom().to_html();

    let cases = [
        ("https://b.test/", NavigationReason::ExternalTarget),
        ("/legacy", NavigationReason::NavigationDisabledOnTarget),
        ("/broken", NavigationReason::NotOk),
    ];
    for (target, reason) in cases {
        let result = session.navigate(url(target)).expect("navigate");
        assert_eq!(result, NavigationResult::Failure(reason), "{target}");
    }

    assert_eq!(session.dom().to_html(), before);
    assert_eq!(session.last_patch(), None);
    assert_eq!(session.history().records().len(), 1);
    assert_eq!(
        assigns(&session),
        [url("https://b.test/"), url("/legacy"), url("/broken")]
    );
    assert_eq!(fetcher.request_count(), 2, "external target is never fetched");
}

#[test]
fn clicks_are_intercepted_unless_the_browser_owns_them() {
    let fetcher = site();
    let (mut session, events) = start(&fetcher);
    let anchor = session.dom().element_by_id("about").expect("anchor");
    let h1 = session.dom().elements_named("h1")[0];

    let mut new_tab = LinkClick::primary(anchor);
    new_tab.modifiers.ctrl = true;
    assert!(session.click(new_tab).is_none());
    assert_eq!(fetcher.request_count(), 0);

    let result = session
        .click(LinkClick::primary(anchor))
        .expect("intercepted")
        .expect("navigate");
    assert!(result.is_success());
    assert_eq!(session.location(), &url("/about"));
    assert_eq!(session.dom().text_content(h1), "About");
    assert_eq!(session.history().records().len(), 2);
    assert_eq!(session.history().index(), 1);
    assert!(assigns(&session).is_empty());

    let events: Vec<PageEvent> = events.try_iter().collect();
    assert_eq!(
        events,
        [
            PageEvent::SessionStart,
            PageEvent::ReadyStateChange(ReadyState::Loading),
            PageEvent::BeforeUnload,
            PageEvent::ReadyStateChange(ReadyState::Interactive),
            PageEvent::ReadyStateChange(ReadyState::Complete),
        ]
    );
}

#[test]
fn redirect_off_origin_is_left_to_the_browser() {
    let fetcher = site();
    fetcher.route("https://a.test/out", Route::redirect("https://b.test/landing"));
    fetcher.route("https://b.test/landing", Route::html(ABOUT));
    let (mut session, events) = start(&fetcher);
    let before = session.dom().to_html();

    let result = session.navigate(url("/out")).expect("navigate");
    assert_eq!(
        result,
        NavigationResult::Failure(NavigationReason::ExternalTarget)
    );
    assert_eq!(session.dom().to_html(), before);
    assert_eq!(session.location(), &url("/"));
    assert_eq!(session.history().records().len(), 1);
    assert_eq!(assigns(&session), [url("/out")]);
    assert!(!events.try_iter().any(|e| e == PageEvent::BeforeUnload));
}

#[test]
fn forward_navigation_after_traversal_drops_forward_records() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    session.navigate(url("/a")).expect("a");
    session.navigate(url("/b")).expect("b");
    assert_eq!(session.history().records().len(), 3);

    let (location, state) = session.host_mut().traverse(-2).expect("entry");
    let result = session
        .popstate(state, location)
        .expect("cross-document")
        .expect("navigate");
    assert!(result.is_success());
    assert_eq!(session.history().index(), 0);
    assert_eq!(session.history().records().len(), 3);

    session.navigate(url("/c")).expect("c");
    let urls: Vec<&str> = session
        .history()
        .records()
        .iter()
        .map(|r| r.url.path())
        .collect();
    assert_eq!(urls, ["/", "/c"]);
    assert_eq!(session.host().entry_count(), 2);
}

#[test]
fn traversal_restores_scroll_of_the_entered_record() {
    let fetcher = site();
    let (mut session, events) = start(&fetcher);
    let offset = ScrollPosition::new(0.0, 400.0);
    session.host_mut().scroll_to(offset);

    session.navigate(url("/about")).expect("navigate");
    assert_eq!(session.host().scroll_position(), ScrollPosition::TOP);

    let (location, state) = session.host_mut().traverse(-1).expect("entry");
    session
        .popstate(state, location)
        .expect("cross-document")
        .expect("navigate");
    assert_eq!(session.host().scroll_position(), offset);
    assert_eq!(session.history().index(), 0);
    assert!(
        events
            .try_iter()
            .any(|e| e == PageEvent::Popstate { url: url("/"), index: 0 })
    );
    assert_eq!(session.history().records().len(), 2, "traversal never pushes");
}

#[test]
fn fragment_traversal_is_left_to_the_browser() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    assert!(session.popstate(Some(0), url("/#main")).is_none());
    assert_eq!(fetcher.request_count(), 0);
}

#[test]
fn hover_prefetch_fires_once_per_cooldown() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    let anchor = session.dom().element_by_id("about").expect("anchor");
    let config = session.config().prefetch.clone();
    let hints = |session: &Session<HeadlessHost>| {
        let dom = session.dom();
        dom.elements_named("link")
            .into_iter()
            .filter(|l| dom.attribute(*l, "rel") == Some("prefetch"))
            .count()
    };
    assert_eq!(session.prefetcher_count(), 1);

    assert!(session.pointer_enter(anchor));
    session.host_mut().advance(config.delay_ms);
    assert_eq!(session.tick(), 1);
    assert_eq!(hints(&session), 1);

    assert!(!session.pointer_enter(anchor), "inside cooldown");
    session.host_mut().advance(config.gc_delay_ms);
    assert_eq!(session.tick(), 0);
    assert_eq!(hints(&session), 0, "hint collected");

    session.host_mut().advance(config.cooldown_ms);
    assert!(session.pointer_enter(anchor));
    assert!(session.pointer_leave(anchor));
    session.host_mut().advance(config.delay_ms);
    assert_eq!(session.tick(), 0, "cancelled before firing");
}

#[test]
fn prefetch_state_survives_a_patch_that_keeps_the_anchor() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    let anchor = session.dom().element_by_id("about").expect("anchor");
    let delay = session.config().prefetch.delay_ms;

    session.pointer_enter(anchor);
    session.host_mut().advance(delay);
    session.tick();
    session.navigate(url("/about")).expect("navigate");

    assert_eq!(session.dom().element_by_id("about"), Some(anchor));
    assert!(!session.pointer_enter(anchor), "cooldown carried over");
}

#[test]
fn form_submission_navigates_to_the_result() {
    let fetcher = site();
    fetcher.route(
        "https://a.test/search?q=rust",
        Route::html("<html><head></head><body><p>results</p></body></html>"),
    );
    let host = HeadlessHost::new(url("/"));
    let mut bus = EventBus::new();
    let _events = bus.subscribe();
    let mut session = Session::start(
        NavigateConfig::default(),
        host,
        fetcher.clone(),
        bus,
        url("/"),
        r#"<html><head></head><body><form id=f action="/search"><input name=q value=rust></form></body></html>"#,
    );
    let form = session.dom().element_by_id("f").expect("form");
    let result = session.submit(form, None).expect("submit");
    assert!(result.is_success());
    assert_eq!(session.location(), &url("/search?q=rust"));
    assert_eq!(session.prefetcher_count(), 0);
}

#[test]
fn history_survives_a_reload() {
    let fetcher = site();
    let (mut session, _events) = start(&fetcher);
    session.navigate(url("/about")).expect("navigate");
    let mut host = session.unload();

    host.reload(false);
    let location = host.current_url().clone();
    let (session, _events) = start_with(&fetcher, host, location);
    assert_eq!(session.history().records().len(), 2);
    assert_eq!(session.history().index(), 1);
    assert!(session.host().calls().is_empty());
}
