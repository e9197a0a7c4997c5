//! Observer Strategy
//!
//! Uses the host intersection facility with the viewport grown by
//! `threshold` pixels. Each element is handed out on its first intersecting
//! notification and unobserved right after.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use super::{EligibleCallback, StrategyKind, VisibilityStrategy};
use crate::config::Config;
use crate::host::{Host, IntersectionEntry, NodeId, ObserverId};
use crate::registry::ElementRegistry;

struct ObserverInner {
    host: Rc<dyn Host>,
    config: Rc<Config>,
    registry: Rc<RefCell<ElementRegistry>>,
    on_eligible: RefCell<Option<EligibleCallback>>,
    observer: Cell<Option<ObserverId>>,
    /// Elements currently registered with the host observer
    observed: RefCell<HashSet<NodeId>>,
}

/// Intersection-notification driven visibility
pub struct ObserverStrategy {
    inner: Rc<ObserverInner>,
}

impl ObserverStrategy {
    pub fn new(host: Rc<dyn Host>, config: Rc<Config>, registry: Rc<RefCell<ElementRegistry>>) -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                host,
                config,
                registry,
                on_eligible: RefCell::new(None),
                observer: Cell::new(None),
                observed: RefCell::new(HashSet::new()),
            }),
        }
    }

    /// Number of elements awaiting an intersecting notification
    pub fn observed_len(&self) -> usize {
        self.inner.observed.borrow().len()
    }
}

impl ObserverInner {
    /// Observe every pending element not yet observed
    fn observe_pending(&self) {
        let Some(observer) = self.observer.get() else {
            return;
        };
        let Some(io) = self.host.intersection_observer() else {
            return;
        };

        let pending = self.registry.borrow().pending();
        let mut observed = self.observed.borrow_mut();
        for node in pending {
            if observed.insert(node) {
                io.observe(observer, node);
            }
        }
    }

    fn handle(&self, entries: &[IntersectionEntry]) {
        let Some(observer) = self.observer.get() else {
            return;
        };
        let on_eligible = self.on_eligible.borrow().clone();

        for entry in entries.iter().filter(|e| e.is_intersecting) {
            // Removal doubles as the exactly-once guard
            if !self.observed.borrow_mut().remove(&entry.target) {
                continue;
            }
            tracing::debug!("{} entered the observer root", entry.target);
            if let Some(callback) = &on_eligible {
                callback(entry.target);
            }
            if let Some(io) = self.host.intersection_observer() {
                io.unobserve(observer, entry.target);
            }
        }
    }

    fn stop(&self) {
        let Some(observer) = self.observer.take() else {
            return;
        };
        if let Some(io) = self.host.intersection_observer() {
            io.disconnect(observer);
        }
        self.observed.borrow_mut().clear();
        self.on_eligible.borrow_mut().take();
        tracing::info!("Intersection observer disconnected");
    }
}

impl VisibilityStrategy for ObserverStrategy {
    fn start(&self, on_eligible: EligibleCallback) {
        if self.inner.observer.get().is_some() {
            return;
        }
        let Some(io) = self.inner.host.intersection_observer() else {
            tracing::warn!("Observer strategy started on a host without intersection support");
            return;
        };

        *self.inner.on_eligible.borrow_mut() = Some(on_eligible);
        let weak = Rc::downgrade(&self.inner);
        let observer = io.create_observer(
            self.inner.config.threshold,
            Rc::new(move |_: ObserverId, entries: &[IntersectionEntry]| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle(entries);
                }
            }),
        );
        self.inner.observer.set(Some(observer));
        self.inner.observe_pending();
        tracing::debug!(
            "Observing {} elements with {}px margin",
            self.observed_len(),
            self.inner.config.threshold
        );
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn is_running(&self) -> bool {
        self.inner.observer.get().is_some()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Observer
    }

    fn refresh(&self) {
        self.inner.observe_pending();
    }
}

impl Drop for ObserverStrategy {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawOptions, resolve};
    use crate::headless::HeadlessHost;
    use crate::host::DATA_SRC;

    fn observing(host: &Rc<HeadlessHost>, threshold: f64) -> (ObserverStrategy, Rc<RefCell<Vec<NodeId>>>, Rc<RefCell<ElementRegistry>>) {
        let dyn_host: Rc<dyn Host> = host.clone();
        let registry = Rc::new(RefCell::new(ElementRegistry::scan(host.as_ref(), "body")));
        let config = resolve(RawOptions::new().with_threshold(threshold));
        let strategy = ObserverStrategy::new(dyn_host, Rc::new(config), registry.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        strategy.start(Rc::new(move |node| sink.borrow_mut().push(node)));
        (strategy, seen, registry)
    }

    #[test]
    fn test_margin_applies_threshold() {
        let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
        let inside_margin = host.add_image(Some("a.jpg"), 950.0, 100.0);
        let outside_margin = host.add_image(Some("b.jpg"), 1100.0, 100.0);
        let (strategy, seen, _) = observing(&host, 200.0);
        assert_eq!(strategy.observed_len(), 2);

        host.run_until_idle();
        assert_eq!(*seen.borrow(), vec![inside_margin]);
        assert_eq!(host.observed_targets(), vec![outside_margin]);
    }

    #[test]
    fn test_handed_out_once_then_unobserved() {
        let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
        let img = host.add_image(Some("a.jpg"), 2000.0, 100.0);
        let (_strategy, seen, _) = observing(&host, 300.0);
        host.run_until_idle();
        assert!(seen.borrow().is_empty());

        host.scroll_to(1500.0);
        host.run_until_idle();
        host.scroll_to(0.0);
        host.run_until_idle();
        host.scroll_to(1500.0);
        host.run_until_idle();

        assert_eq!(*seen.borrow(), vec![img]);
        assert!(host.observed_targets().is_empty());
    }

    #[test]
    fn test_refresh_observes_new_elements() {
        let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
        host.add_image(Some("a.jpg"), 5000.0, 100.0);
        let (strategy, seen, registry) = observing(&host, 300.0);

        let late = host.add_image(Some("late.jpg"), 100.0, 100.0);
        registry.borrow_mut().rescan(host.as_ref());
        strategy.refresh();
        assert_eq!(strategy.observed_len(), 2);

        host.run_until_idle();
        assert_eq!(*seen.borrow(), vec![late]);
    }

    #[test]
    fn test_stop_disconnects() {
        let host = Rc::new(HeadlessHost::new(800.0).with_intersection_observer());
        let img = host.add_image(Some("a.jpg"), 2000.0, 100.0);
        let (strategy, seen, _) = observing(&host, 300.0);

        strategy.stop();
        assert!(!strategy.is_running());
        assert_eq!(host.observer_count(), 0);

        host.scroll_to(2000.0);
        host.run_until_idle();
        assert!(seen.borrow().is_empty());
        assert_eq!(host.attribute(img, DATA_SRC).as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_start_without_capability_is_inert() {
        let host = Rc::new(HeadlessHost::new(800.0));
        host.add_image(Some("a.jpg"), 0.0, 100.0);
        let (strategy, seen, _) = observing(&host, 300.0);

        host.run_until_idle();
        assert!(!strategy.is_running());
        assert!(seen.borrow().is_empty());
    }
}
