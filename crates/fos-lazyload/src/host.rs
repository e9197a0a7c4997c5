//! Host Environment Contract
//!
//! Everything the engine needs from the rendering environment it runs in:
//! node queries, attribute and style mutation, geometry, scroll
//! notifications, timers, an optional intersection facility and the
//! resource loader. All callbacks are delivered on the host's single event
//! queue, never re-entrantly from inside the call that registered them.

use std::rc::Rc;
use std::time::Duration;

pub use fos_dom::NodeId;

/// Marker attribute holding the deferred resource URI
pub const DATA_SRC: &str = "data-src";
/// Deferred responsive source set
pub const DATA_SRCSET: &str = "data-srcset";
/// Deferred responsive sizes
pub const DATA_SIZES: &str = "data-sizes";
/// Visible resource attribute
pub const SRC: &str = "src";
pub const SRCSET: &str = "srcset";
pub const SIZES: &str = "sizes";

/// Handle of an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Handle of a scroll listener subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle of an intersection observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// One-shot task run on the event queue
pub type Task = Box<dyn FnOnce()>;

/// Scroll notification callback
pub type ScrollListener = Rc<dyn Fn()>;

/// Completion callback of a resource load
pub type LoadCallback = Box<dyn FnOnce(Result<(), LoadError>)>;

/// Intersection notification callback
pub type IntersectionCallback = Rc<dyn Fn(ObserverId, &[IntersectionEntry])>;

/// Resource load failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Empty resource URI")]
    EmptyUri,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error loading {uri}: {reason}")]
    Network { uri: String, reason: String },

    #[error("Undecodable image: {0}")]
    Decode(String),
}

/// Visibility change of one observed element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
}

/// The host rendering environment
pub trait Host {
    // Query facility

    /// All connected elements matching `selector`, in document order. An
    /// unparsable selector matches nothing.
    fn query_selector_all(&self, selector: &str) -> Vec<NodeId>;

    // Attribute accessors

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, node: NodeId, name: &str);

    // Style mutation

    fn set_style(&self, node: NodeId, property: &str, value: &str);

    // Geometry accessors

    /// Height of the layout viewport in CSS pixels
    fn viewport_height(&self) -> f64;
    /// Current vertical scroll offset
    fn scroll_y(&self) -> f64;
    /// Offset of `node`'s top edge from the document origin
    fn offset_top(&self, node: NodeId) -> f64;

    // Scroll notifications

    fn add_scroll_listener(&self, listener: ScrollListener) -> ListenerId;
    fn remove_scroll_listener(&self, id: ListenerId);

    // Timers

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;
    fn clear_timeout(&self, id: TimerId);

    // Resource loading

    /// Start loading `uri` off-tree; `done` runs on a later turn.
    fn load_resource(&self, uri: &str, done: LoadCallback);

    /// Intersection notification capability, if the host has one
    fn intersection_observer(&self) -> Option<&dyn IntersectionHost> {
        None
    }
}

/// Intersection notification facility
pub trait IntersectionHost {
    /// Create an observer whose root (the viewport) is grown by
    /// `root_margin` pixels on every side.
    fn create_observer(&self, root_margin: f64, callback: IntersectionCallback) -> ObserverId;
    fn observe(&self, observer: ObserverId, target: NodeId);
    fn unobserve(&self, observer: ObserverId, target: NodeId);
    fn disconnect(&self, observer: ObserverId);
}
