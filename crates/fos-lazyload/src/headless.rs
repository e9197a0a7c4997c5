//! Headless Host
//!
//! An in-process [`Host`] built on a `fos_dom::Document` and a virtual-clock
//! [`EventLoop`]. Layout is whatever geometry the caller assigns, the
//! network is a table of per-URI outcomes, and time only moves when
//! [`HeadlessHost::advance`] or [`HeadlessHost::run_until_idle`] is called.
//! Every mutation the engine performs is journaled for ordering checks.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::time::Duration;

use fos_dom::{Document, ElementGeometry};

use crate::event_loop::EventLoop;
use crate::host::{
    DATA_SRC, Host, IntersectionCallback, IntersectionEntry, IntersectionHost, ListenerId,
    LoadCallback, LoadError, NodeId, ObserverId, SRC, ScrollListener, Task, TimerId,
};

/// Default width given to images added through the helpers
const IMAGE_WIDTH: f64 = 640.0;

/// A host-side effect, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetStyle { node: NodeId, property: String, value: String },
    Fetch { uri: String },
    AddScrollListener(ListenerId),
    RemoveScrollListener(ListenerId),
}

#[derive(Debug, Clone, Default)]
struct ResourceBehavior {
    failure: Option<LoadError>,
    latency: Option<Duration>,
}

struct ObserverState {
    id: ObserverId,
    root_margin: f64,
    callback: IntersectionCallback,
    /// Target and its last reported intersection state
    targets: Vec<(NodeId, Option<bool>)>,
}

/// Simulated intersection facility
#[derive(Default)]
struct HeadlessIntersection {
    observers: RefCell<Vec<ObserverState>>,
    next_id: Cell<u64>,
    /// Set when geometry, scroll position or targets changed
    dirty: Cell<bool>,
}

impl IntersectionHost for HeadlessIntersection {
    fn create_observer(&self, root_margin: f64, callback: IntersectionCallback) -> ObserverId {
        self.next_id.set(self.next_id.get() + 1);
        let id = ObserverId(self.next_id.get());
        self.observers.borrow_mut().push(ObserverState {
            id,
            root_margin,
            callback,
            targets: Vec::new(),
        });
        id
    }

    fn observe(&self, observer: ObserverId, target: NodeId) {
        let mut observers = self.observers.borrow_mut();
        let Some(state) = observers.iter_mut().find(|o| o.id == observer) else {
            tracing::warn!("observe() on unknown observer {:?}", observer);
            return;
        };
        if !state.targets.iter().any(|(t, _)| *t == target) {
            state.targets.push((target, None));
            self.dirty.set(true);
        }
    }

    fn unobserve(&self, observer: ObserverId, target: NodeId) {
        if let Some(state) = self
            .observers
            .borrow_mut()
            .iter_mut()
            .find(|o| o.id == observer)
        {
            state.targets.retain(|(t, _)| *t != target);
        }
    }

    fn disconnect(&self, observer: ObserverId) {
        self.observers.borrow_mut().retain(|o| o.id != observer);
    }
}

/// In-memory host rendering environment
pub struct HeadlessHost {
    document: RefCell<Document>,
    event_loop: RefCell<EventLoop>,
    viewport_height: Cell<f64>,
    scroll_y: Cell<f64>,
    scroll_listeners: RefCell<Vec<(ListenerId, ScrollListener)>>,
    next_listener_id: Cell<u64>,
    resources: RefCell<HashMap<String, ResourceBehavior>>,
    default_latency: Cell<Duration>,
    journal: RefCell<Vec<HostEvent>>,
    intersection: Option<HeadlessIntersection>,
}

impl HeadlessHost {
    /// Empty page with a viewport of the given height, no intersection
    /// facility
    pub fn new(viewport_height: f64) -> Self {
        Self {
            document: RefCell::new(Document::new("about:blank")),
            event_loop: RefCell::new(EventLoop::new()),
            viewport_height: Cell::new(viewport_height),
            scroll_y: Cell::new(0.0),
            scroll_listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(0),
            resources: RefCell::new(HashMap::new()),
            default_latency: Cell::new(Duration::ZERO),
            journal: RefCell::new(Vec::new()),
            intersection: None,
        }
    }

    /// Expose an intersection-notification facility
    pub fn with_intersection_observer(mut self) -> Self {
        self.intersection = Some(HeadlessIntersection::default());
        self
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.mark_layout_dirty();
        self.document.borrow_mut()
    }

    /// Append an `<img>` to `<body>` at `top`, optionally deferred
    pub fn add_image(&self, data_src: Option<&str>, top: f64, height: f64) -> NodeId {
        let body = self.document.borrow().body();
        self.append_image(body, data_src, top, height)
    }

    /// Append an `<img>` to `parent` at `top`, optionally deferred
    pub fn append_image(&self, parent: NodeId, data_src: Option<&str>, top: f64, height: f64) -> NodeId {
        let mut doc = self.document_mut();
        let img = doc.create_element("img");
        let built = doc
            .append_child(parent, img)
            .and_then(|_| doc.set_geometry(img, ElementGeometry::block(top, IMAGE_WIDTH, height)))
            .and_then(|_| match data_src {
                Some(uri) => doc.set_attribute(img, DATA_SRC, uri).map(|_| ()),
                None => Ok(()),
            });
        if let Err(err) = built {
            tracing::warn!("Failed to add image under {}: {}", parent, err);
        }
        img
    }

    /// Append an element to `parent` (for building selector scopes)
    pub fn append_element(&self, parent: NodeId, tag: &str) -> NodeId {
        let mut doc = self.document_mut();
        let node = doc.create_element(tag);
        if let Err(err) = doc.append_child(parent, node) {
            tracing::warn!("Failed to append <{}> under {}: {}", tag, parent, err);
        }
        node
    }

    pub fn body(&self) -> NodeId {
        self.document.borrow().body()
    }

    /// Move an element to a new vertical offset
    pub fn set_offset_top(&self, node: NodeId, top: f64) {
        let mut doc = self.document_mut();
        let mut geometry = doc.geometry(node).unwrap_or_default();
        geometry.offset_top = top;
        if let Err(err) = doc.set_geometry(node, geometry) {
            tracing::warn!("Cannot move {}: {}", node, err);
        }
    }

    /// Current `src` attribute
    pub fn src(&self, node: NodeId) -> Option<String> {
        self.attribute(node, SRC)
    }

    /// Inline style property
    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.document.borrow().style(node, property).map(str::to_string)
    }

    pub fn set_viewport_height(&self, height: f64) {
        self.viewport_height.set(height);
        self.mark_layout_dirty();
    }

    /// Scroll to `y` and notify scroll listeners synchronously
    pub fn scroll_to(&self, y: f64) {
        self.scroll_y.set(y.max(0.0));
        self.mark_layout_dirty();

        let listeners: Vec<ScrollListener> = self
            .scroll_listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    /// Make loads of `uri` fail as not found
    pub fn fail_resource(&self, uri: &str) {
        self.fail_resource_with(uri, LoadError::NotFound(uri.to_string()));
    }

    pub fn fail_resource_with(&self, uri: &str, error: LoadError) {
        self.resources
            .borrow_mut()
            .entry(uri.to_string())
            .or_default()
            .failure = Some(error);
    }

    /// Completion latency for `uri`
    pub fn set_latency(&self, uri: &str, latency: Duration) {
        self.resources
            .borrow_mut()
            .entry(uri.to_string())
            .or_default()
            .latency = Some(latency);
    }

    /// Completion latency for URIs without their own setting
    pub fn set_default_latency(&self, latency: Duration) {
        self.default_latency.set(latency);
    }

    /// Virtual time
    pub fn now(&self) -> Duration {
        self.event_loop.borrow().current_time()
    }

    /// Run everything due within the next `delta`
    pub fn advance(&self, delta: Duration) {
        let until = self.now() + delta;
        self.run_until(until);
        self.event_loop.borrow_mut().advance_to(until);
        self.run_until(until);
    }

    /// Run until no task or timer is left
    pub fn run_until_idle(&self) {
        self.run_until(Duration::MAX);
    }

    fn run_until(&self, until: Duration) {
        loop {
            self.deliver_intersections();
            let next = self.event_loop.borrow_mut().pop_ready(until);
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.event_loop.borrow().pending_timers()
    }

    pub fn scroll_listener_count(&self) -> usize {
        self.scroll_listeners.borrow().len()
    }

    /// Targets currently observed across all intersection observers
    pub fn observed_targets(&self) -> Vec<NodeId> {
        self.intersection
            .as_ref()
            .map(|io| {
                io.observers
                    .borrow()
                    .iter()
                    .flat_map(|o| o.targets.iter().map(|(t, _)| *t))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn observer_count(&self) -> usize {
        self.intersection
            .as_ref()
            .map_or(0, |io| io.observers.borrow().len())
    }

    pub fn journal(&self) -> Vec<HostEvent> {
        self.journal.borrow().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.borrow_mut().clear();
    }

    /// URIs requested from the resource loader, in order
    pub fn fetches(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Fetch { uri } => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_count(&self, uri: &str) -> usize {
        self.fetches().iter().filter(|u| *u == uri).count()
    }

    fn record(&self, event: HostEvent) {
        self.journal.borrow_mut().push(event);
    }

    fn mark_layout_dirty(&self) {
        if let Some(io) = &self.intersection {
            io.dirty.set(true);
        }
    }

    /// Compute intersection changes and invoke observer callbacks
    fn deliver_intersections(&self) {
        let Some(io) = &self.intersection else {
            return;
        };
        if !io.dirty.replace(false) {
            return;
        }

        let top = self.scroll_y.get();
        let bottom = top + self.viewport_height.get();
        let mut deliveries = Vec::new();
        {
            let doc = self.document.borrow();
            let mut observers = io.observers.borrow_mut();
            for observer in observers.iter_mut() {
                let root_top = top - observer.root_margin;
                let root_bottom = bottom + observer.root_margin;
                let mut entries = Vec::new();
                for (target, last) in observer.targets.iter_mut() {
                    let rect = doc.geometry(*target).unwrap_or_default().bounding_rect();
                    let intersecting = doc.tree().is_connected(*target)
                        && rect.overlaps_band(root_top, root_bottom);
                    if *last != Some(intersecting) {
                        *last = Some(intersecting);
                        entries.push(IntersectionEntry {
                            target: *target,
                            is_intersecting: intersecting,
                        });
                    }
                }
                if !entries.is_empty() {
                    deliveries.push((observer.id, observer.callback.clone(), entries));
                }
            }
        }

        for (id, callback, entries) in deliveries {
            callback(id, &entries);
        }
    }
}

impl Host for HeadlessHost {
    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        match self.document.borrow().query_selector_all(selector) {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::warn!("Query failed: {}", err);
                Vec::new()
            }
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.document
            .borrow()
            .get_attribute(node, name)
            .map(str::to_string)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let result = self.document.borrow_mut().set_attribute(node, name, value);
        match result {
            Ok(_) => self.record(HostEvent::SetAttribute {
                node,
                name: name.to_string(),
                value: value.to_string(),
            }),
            Err(err) => tracing::warn!("setAttribute({}) failed: {}", name, err),
        }
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        let result = self.document.borrow_mut().remove_attribute(node, name);
        match result {
            Ok(_) => self.record(HostEvent::RemoveAttribute {
                node,
                name: name.to_string(),
            }),
            Err(err) => tracing::warn!("removeAttribute({}) failed: {}", name, err),
        }
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) {
        let result = self.document.borrow_mut().set_style(node, property, value);
        match result {
            Ok(()) => self.record(HostEvent::SetStyle {
                node,
                property: property.to_string(),
                value: value.to_string(),
            }),
            Err(err) => tracing::warn!("style.{} failed: {}", property, err),
        }
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height.get()
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        self.document
            .borrow()
            .geometry(node)
            .map_or(0.0, |g| g.offset_top)
    }

    fn add_scroll_listener(&self, listener: ScrollListener) -> ListenerId {
        self.next_listener_id.set(self.next_listener_id.get() + 1);
        let id = ListenerId(self.next_listener_id.get());
        self.scroll_listeners.borrow_mut().push((id, listener));
        self.record(HostEvent::AddScrollListener(id));
        id
    }

    fn remove_scroll_listener(&self, id: ListenerId) {
        let mut listeners = self.scroll_listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        let removed = listeners.len() != before;
        drop(listeners);
        if removed {
            self.record(HostEvent::RemoveScrollListener(id));
        }
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        self.event_loop.borrow_mut().set_timeout(delay, task)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.event_loop.borrow_mut().clear_timeout(id);
    }

    fn load_resource(&self, uri: &str, done: LoadCallback) {
        self.record(HostEvent::Fetch {
            uri: uri.to_string(),
        });

        let behavior = self.resources.borrow().get(uri).cloned().unwrap_or_default();
        let result = if uri.trim().is_empty() {
            Err(LoadError::EmptyUri)
        } else {
            match behavior.failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        };
        let latency = behavior.latency.unwrap_or(self.default_latency.get());

        self.event_loop
            .borrow_mut()
            .set_timeout(latency, Box::new(move || done(result)));
    }

    fn intersection_observer(&self) -> Option<&dyn IntersectionHost> {
        self.intersection
            .as_ref()
            .map(|io| io as &dyn IntersectionHost)
    }
}
