//! Polling Strategy
//!
//! A debounce timer armed at start and re-armed on every scroll
//! notification. When it fires, pending elements within `threshold` of the
//! viewport bottom are handed out in registry order, then the registry is
//! rescanned; an empty registry ends the strategy.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{EligibleCallback, StrategyKind, VisibilityStrategy, is_eligible};
use crate::config::Config;
use crate::host::{Host, ListenerId, TimerId};
use crate::registry::ElementRegistry;

struct PollingInner {
    host: Rc<dyn Host>,
    config: Rc<Config>,
    registry: Rc<RefCell<ElementRegistry>>,
    on_eligible: RefCell<Option<EligibleCallback>>,
    /// The one scroll subscription, used for both subscribe and unsubscribe
    listener: Cell<Option<ListenerId>>,
    /// At most one outstanding debounce timer
    pending_timer: Cell<Option<TimerId>>,
    running: Cell<bool>,
}

/// Debounced scroll polling
pub struct PollingStrategy {
    inner: Rc<PollingInner>,
}

impl PollingStrategy {
    pub fn new(host: Rc<dyn Host>, config: Rc<Config>, registry: Rc<RefCell<ElementRegistry>>) -> Self {
        Self {
            inner: Rc::new(PollingInner {
                host,
                config,
                registry,
                on_eligible: RefCell::new(None),
                listener: Cell::new(None),
                pending_timer: Cell::new(None),
                running: Cell::new(false),
            }),
        }
    }

    /// Whether a debounce timer is armed
    pub fn has_pending_timer(&self) -> bool {
        self.inner.pending_timer.get().is_some()
    }
}

impl PollingInner {
    /// Cancel-and-replace the debounce timer
    fn schedule(self: &Rc<Self>) {
        if !self.running.get() {
            return;
        }
        if let Some(timer) = self.pending_timer.take() {
            self.host.clear_timeout(timer);
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let timer = self.host.set_timeout(
            self.config.delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.pending_timer.set(None);
                    inner.evaluate();
                }
            }),
        );
        self.pending_timer.set(Some(timer));
    }

    /// One evaluation pass
    fn evaluate(&self) {
        if !self.running.get() {
            return;
        }

        let viewport_bottom = self.host.viewport_height() + self.host.scroll_y();
        let pending = self.registry.borrow().pending();
        let on_eligible = self.on_eligible.borrow().clone();
        let mut handed_out = 0;
        for node in pending {
            if is_eligible(self.host.offset_top(node), self.config.threshold, viewport_bottom) {
                if let Some(callback) = &on_eligible {
                    callback(node);
                }
                handed_out += 1;
            }
        }
        tracing::debug!(
            "Polling pass at viewport bottom {}: {} eligible",
            viewport_bottom,
            handed_out
        );

        self.registry.borrow_mut().rescan(self.host.as_ref());
        if self.registry.borrow().is_empty() {
            self.stop();
        }
    }

    fn stop(&self) {
        if !self.running.replace(false) {
            return;
        }
        if let Some(timer) = self.pending_timer.take() {
            self.host.clear_timeout(timer);
        }
        if let Some(listener) = self.listener.take() {
            self.host.remove_scroll_listener(listener);
        }
        self.on_eligible.borrow_mut().take();
        tracing::info!("Polling stopped");
    }
}

impl VisibilityStrategy for PollingStrategy {
    fn start(&self, on_eligible: EligibleCallback) {
        if self.inner.running.replace(true) {
            return;
        }
        *self.inner.on_eligible.borrow_mut() = Some(on_eligible);

        self.inner.schedule();

        let weak = Rc::downgrade(&self.inner);
        let listener = self.inner.host.add_scroll_listener(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.schedule();
            }
        }));
        self.inner.listener.set(Some(listener));
        tracing::debug!("Polling every scroll with {:?} debounce", self.inner.config.delay);
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Polling
    }
}

impl Drop for PollingStrategy {
    fn drop(&mut self) {
        self.inner.stop();
    }
}
