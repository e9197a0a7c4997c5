//! Observer strategy and option handling tests for fos-lazyload

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use fos_lazyload::*;

fn start(host: &Rc<HeadlessHost>, options: RawOptions) -> LazyLoad {
    let dyn_host: Rc<dyn Host> = host.clone();
    LazyLoad::new(dyn_host, "body", options)
}

fn observer_options() -> RawOptions {
    RawOptions::new().with_intersection_observer(true)
}

// ============================================================================
// STRATEGY SELECTION
// ============================================================================

#[test]
fn test_observer_selected_when_available() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    host.add_image(Some("a.jpg"), 5000.0, 100.0);
    let lazy = start(&host, observer_options());

    assert_eq!(lazy.strategy_kind(), StrategyKind::Observer);
    assert_eq!(host.scroll_listener_count(), 0);
    assert_eq!(host.observer_count(), 1);
}

#[test]
fn test_falls_back_to_polling() {
    let host = Rc::new(HeadlessHost::new(800.0));
    host.add_image(Some("a.jpg"), 5000.0, 100.0);
    let lazy = start(&host, observer_options());

    assert_eq!(lazy.strategy_kind(), StrategyKind::Polling);
    assert_eq!(host.scroll_listener_count(), 1);
}

#[test]
fn test_observer_not_used_unless_requested() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    host.add_image(Some("a.jpg"), 5000.0, 100.0);
    let lazy = start(&host, RawOptions::new());

    assert_eq!(lazy.strategy_kind(), StrategyKind::Polling);
    assert_eq!(host.observer_count(), 0);
}

// ============================================================================
// OBSERVER BEHAVIOR
// ============================================================================

#[test]
fn test_initial_notification_loads_near_elements() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    let near = host.add_image(Some("near.jpg"), 1000.0, 100.0);
    let far = host.add_image(Some("far.jpg"), 1200.0, 100.0);
    let lazy = start(&host, observer_options().with_threshold(300.0));

    // No debounce: the first notification turn is enough
    host.advance(Duration::ZERO);
    assert_eq!(host.fetches(), vec!["near.jpg"]);
    assert_eq!(lazy.state_of(near), Some(ElementState::Loaded));
    assert_eq!(lazy.state_of(far), Some(ElementState::Pending));
    assert_eq!(host.observed_targets(), vec![far]);
}

#[test]
fn test_scrolling_loads_each_element_once() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    host.set_default_latency(Duration::from_millis(200));
    let img = host.add_image(Some("a.jpg"), 3000.0, 100.0);
    host.add_image(Some("b.jpg"), 9000.0, 100.0);
    let lazy = start(&host, observer_options());

    for y in [2500.0, 0.0, 2500.0, 2600.0] {
        host.scroll_to(y);
        host.advance(Duration::from_millis(50));
    }
    host.run_until_idle();

    assert_eq!(host.fetch_count("a.jpg"), 1);
    assert_eq!(host.src(img).as_deref(), Some("a.jpg"));
    assert!(lazy.is_active());
}

#[test]
fn test_observer_disconnects_when_drained() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    let a = host.add_image(Some("a.jpg"), 100.0, 100.0);
    let b = host.add_image(Some("b.jpg"), 2000.0, 100.0);
    host.fail_resource("b.jpg");
    let lazy = start(&host, observer_options().with_error_image("err.jpg"));

    host.run_until_idle();
    assert!(lazy.is_active());

    host.scroll_to(1500.0);
    host.run_until_idle();
    assert_eq!(host.src(a).as_deref(), Some("a.jpg"));
    assert_eq!(host.src(b).as_deref(), Some("err.jpg"));
    assert!(!lazy.is_active());
    assert_eq!(host.observer_count(), 0);
    assert_eq!(host.pending_timers(), 0);
}

#[test]
fn test_observer_picks_up_late_elements() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    host.add_image(Some("first.jpg"), 0.0, 100.0);
    host.add_image(Some("far.jpg"), 9000.0, 100.0);
    let late = host.add_image(None, 200.0, 100.0);
    host.set_default_latency(Duration::from_millis(100));
    let lazy = start(&host, observer_options());
    host.advance(Duration::ZERO);

    // Marked before the first load settles and triggers a rescan
    host.set_attribute(late, "data-src", "late.jpg");
    host.run_until_idle();

    assert_eq!(host.src(late).as_deref(), Some("late.jpg"));
    assert_eq!(lazy.state_of(late), Some(ElementState::Loaded));
}

#[test]
fn test_dispose_disconnects_observer() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    let img = host.add_image(Some("a.jpg"), 5000.0, 100.0);
    let lazy = start(&host, observer_options());

    lazy.dispose();
    host.scroll_to(5000.0);
    host.run_until_idle();

    assert_eq!(host.observer_count(), 0);
    assert!(host.fetches().is_empty());
    assert_eq!(host.attribute(img, "data-src").as_deref(), Some("a.jpg"));
}

// ============================================================================
// OPTIONS
// ============================================================================

#[test]
fn test_json_options_with_aliases() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    let img = host.add_image(Some("missing.jpg"), 0.0, 100.0);
    host.fail_resource("missing.jpg");

    let options = RawOptions::from_json(
        r#"{
            "threshold": "150",
            "delay": 250,
            "animation": "none",
            "errorResourceURI": "fallback.jpg",
            "useObserverStrategy": 1,
            "responsive": "yes",
            "unknownOption": [1, 2, 3]
        }"#,
    )
    .unwrap();
    let lazy = start(&host, options);

    let config = lazy.config();
    assert_eq!(config.threshold, 150.0);
    assert_eq!(config.delay, Duration::from_millis(250));
    assert_eq!(config.animation, Animation::None);
    assert!(config.responsive);
    assert_eq!(lazy.strategy_kind(), StrategyKind::Observer);

    host.run_until_idle();
    assert_eq!(host.src(img).as_deref(), Some("fallback.jpg"));
}

#[test]
fn test_invalid_json_reported() {
    assert!(matches!(
        RawOptions::from_json("{threshold: 200"),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_callback_with_observer() {
    let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
    for i in 0..3 {
        host.add_image(Some(&format!("{}.jpg", i)), i as f64 * 100.0, 100.0);
    }
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let _lazy = start(
        &host,
        observer_options().with_callback(move |_| counter.set(counter.get() + 1)),
    );

    host.run_until_idle();
    assert_eq!(calls.get(), 3);
}
