//! Visibility Strategies
//!
//! Decide when a tracked element is near enough to the viewport to load.
//! Exactly one strategy runs per engine.

mod observer;
mod polling;

use std::cell::RefCell;
use std::rc::Rc;

pub use observer::ObserverStrategy;
pub use polling::PollingStrategy;

use crate::config::Config;
use crate::host::{Host, NodeId};
use crate::registry::ElementRegistry;

/// Receives each element that became eligible
pub type EligibleCallback = Rc<dyn Fn(NodeId)>;

/// Which visibility strategy an engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Host intersection notifications
    Observer,
    /// Debounced geometry checks on scroll
    Polling,
}

/// Capability probe: Observer only when requested and available
pub fn select(config: &Config, host: &dyn Host) -> StrategyKind {
    if config.use_intersection_observer && host.intersection_observer().is_some() {
        StrategyKind::Observer
    } else {
        if config.use_intersection_observer {
            tracing::debug!("Intersection facility unavailable, falling back to polling");
        }
        StrategyKind::Polling
    }
}

/// Eligible when the element's top edge, pulled up by `threshold`, lies
/// above the bottom of the viewport
#[inline]
pub fn is_eligible(offset_top: f64, threshold: f64, viewport_bottom: f64) -> bool {
    offset_top - threshold < viewport_bottom
}

/// Visibility detection algorithm
pub trait VisibilityStrategy {
    /// Begin watching the registry, handing eligible elements to
    /// `on_eligible`
    fn start(&self, on_eligible: EligibleCallback);

    /// Stop watching. Idempotent.
    fn stop(&self);

    fn is_running(&self) -> bool;

    fn kind(&self) -> StrategyKind;

    /// Pick up elements that joined the registry since the last look
    fn refresh(&self) {}
}

/// Build the strategy of the given kind
pub fn create(
    kind: StrategyKind,
    host: Rc<dyn Host>,
    config: Rc<Config>,
    registry: Rc<RefCell<ElementRegistry>>,
) -> Box<dyn VisibilityStrategy> {
    match kind {
        StrategyKind::Observer => Box::new(ObserverStrategy::new(host, config, registry)),
        StrategyKind::Polling => Box::new(PollingStrategy::new(host, config, registry)),
    }
}
