//! Lazy Load Engine
//!
//! Lifecycle controller: resolves options, scans the document, applies the
//! placeholder, picks and starts a visibility strategy, and stops it once
//! nothing is left to load.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::{Config, RawOptions, resolve};
use crate::host::{Host, NodeId, SRC};
use crate::loader::Loader;
use crate::registry::{ElementRegistry, ElementState};
use crate::strategy::{self, StrategyKind, VisibilityStrategy};

struct EngineInner {
    host: Rc<dyn Host>,
    config: Rc<Config>,
    selector: String,
    registry: Rc<RefCell<ElementRegistry>>,
    strategy: Box<dyn VisibilityStrategy>,
    loader: Loader,
}

impl EngineInner {
    /// Runs after each terminal transition
    fn teardown_if_drained(&self) {
        if !self.strategy.is_running() {
            return;
        }
        self.registry.borrow_mut().rescan(self.host.as_ref());
        if self.registry.borrow().is_empty() {
            tracing::info!("All deferred elements under '{}' settled", self.selector);
            self.strategy.stop();
        } else {
            self.strategy.refresh();
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.strategy.stop();
    }
}

/// A running lazy-load engine bound to one selector scope
pub struct LazyLoad {
    inner: Rc<EngineInner>,
}

impl LazyLoad {
    /// Start lazy loading every `[data-src]` element inside `selector`
    pub fn new(host: Rc<dyn Host>, selector: &str, options: RawOptions) -> Self {
        Self::with_config(host, selector, resolve(options))
    }

    /// Start with an already resolved configuration
    pub fn with_config(host: Rc<dyn Host>, selector: &str, config: Config) -> Self {
        let config = Rc::new(config);
        let registry = Rc::new(RefCell::new(ElementRegistry::scan(host.as_ref(), selector)));

        if let Some(placeholder) = &config.placeholder {
            for element in registry.borrow().iter() {
                host.set_attribute(element.node, SRC, placeholder);
            }
        }

        let kind = strategy::select(&config, host.as_ref());
        let inner = Rc::new_cyclic(|weak: &Weak<EngineInner>| {
            let weak = weak.clone();
            let loader = Loader::new(host.clone(), config.clone(), registry.clone()).with_settled_hook(
                Rc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.teardown_if_drained();
                    }
                }),
            );
            EngineInner {
                strategy: strategy::create(kind, host.clone(), config.clone(), registry.clone()),
                host,
                config,
                selector: selector.to_string(),
                registry,
                loader,
            }
        });

        let loader = inner.loader.clone();
        inner.strategy.start(Rc::new(move |node| {
            loader.load(node);
        }));

        let tracked = inner.registry.borrow().len();
        tracing::info!(
            "Lazy loading {} elements under '{}' with {:?} strategy",
            tracked,
            inner.selector,
            kind
        );

        // Nothing to watch; polling reaches the same state after its first pass
        if tracked == 0 && kind == StrategyKind::Observer {
            inner.strategy.stop();
        }

        Self { inner }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn selector(&self) -> &str {
        &self.inner.selector
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.inner.strategy.kind()
    }

    /// Whether the visibility strategy is still watching
    pub fn is_active(&self) -> bool {
        self.inner.strategy.is_running()
    }

    /// Load state of `node`, if it was ever tracked
    pub fn state_of(&self, node: NodeId) -> Option<ElementState> {
        self.inner.registry.borrow().state(node)
    }

    /// Elements in the current working set
    pub fn tracked_len(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Stop watching. In-flight loads still complete.
    pub fn dispose(&self) {
        if self.inner.strategy.is_running() {
            tracing::info!("Disposing lazy loader for '{}'", self.inner.selector);
        }
        self.inner.strategy.stop();
    }
}

impl fmt::Debug for LazyLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLoad")
            .field("selector", &self.inner.selector)
            .field("strategy", &self.inner.strategy.kind())
            .field("active", &self.inner.strategy.is_running())
            .field("tracked", &self.inner.registry.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}
