//! Element Registry
//!
//! The working set of deferred-resource elements under one selector scope.
//! The set is rebuilt from a live host query on every `rescan`; per-element
//! load state is kept in a ledger that survives rebuilds so an in-flight
//! element is never handed out twice.

use std::collections::HashMap;

use crate::host::{DATA_SIZES, DATA_SRC, DATA_SRCSET, Host, NodeId};

/// Load state of a tracked element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementState {
    #[default]
    Pending,
    Loading,
    Loaded,
    Errored,
}

impl ElementState {
    /// Loaded and Errored are final
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Loaded | Self::Errored)
    }
}

/// One deferred-resource element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedElement {
    /// Host node (not owned)
    pub node: NodeId,
    /// `data-src` value
    pub pending_uri: String,
    /// `data-srcset` value
    pub srcset: Option<String>,
    /// `data-sizes` value
    pub sizes: Option<String>,
    pub state: ElementState,
}

impl TrackedElement {
    /// Read the deferred attributes of `node`; `None` without a marker
    fn read(host: &dyn Host, node: NodeId, state: ElementState) -> Option<Self> {
        Some(Self {
            node,
            pending_uri: host.attribute(node, DATA_SRC)?,
            srcset: host.attribute(node, DATA_SRCSET),
            sizes: host.attribute(node, DATA_SIZES),
            state,
        })
    }
}

/// Query matching every marked element inside `selector`
pub fn marker_query(selector: &str) -> String {
    let scope = selector.trim();
    if scope.is_empty() {
        format!("[{}]", DATA_SRC)
    } else {
        format!("{} [{}]", scope, DATA_SRC)
    }
}

/// Tracked set of deferred elements
#[derive(Debug, Default)]
pub struct ElementRegistry {
    query: String,
    elements: Vec<TrackedElement>,
    ledger: HashMap<NodeId, ElementState>,
}

impl ElementRegistry {
    /// Track every marked element inside `selector`
    pub fn scan(host: &dyn Host, selector: &str) -> Self {
        let mut registry = Self {
            query: marker_query(selector),
            elements: Vec::new(),
            ledger: HashMap::new(),
        };
        registry.rescan(host);
        registry
    }

    /// Replace the working set with a fresh query result.
    ///
    /// Elements still carrying the marker keep their recorded state. A
    /// terminal element that was given a new marker is deferred again.
    ///
    /// The query stays scoped to the selector given at scan time, unlike a
    /// document-wide `[data-src]` lookup: marked elements outside the scope
    /// are never picked up, however late they appear.
    pub fn rescan(&mut self, host: &dyn Host) {
        let mut elements = Vec::new();
        for node in host.query_selector_all(&self.query) {
            let state = match self.ledger.get(&node).copied() {
                Some(state) if state.is_terminal() => {
                    tracing::debug!("Element {} re-deferred after {:?}", node, state);
                    self.ledger.insert(node, ElementState::Pending);
                    ElementState::Pending
                }
                Some(state) => state,
                None => {
                    self.ledger.insert(node, ElementState::Pending);
                    ElementState::Pending
                }
            };
            if let Some(element) = TrackedElement::read(host, node, state) {
                elements.push(element);
            }
        }
        self.elements = elements;
    }

    /// The host query used for scans
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Tracked elements in document order
    pub fn iter(&self) -> impl Iterator<Item = &TrackedElement> {
        self.elements.iter()
    }

    pub fn get(&self, node: NodeId) -> Option<&TrackedElement> {
        self.elements.iter().find(|e| e.node == node)
    }

    /// Last known state of `node`, including elements that left the set
    pub fn state(&self, node: NodeId) -> Option<ElementState> {
        self.ledger.get(&node).copied()
    }

    /// Nodes still waiting for eligibility, in document order
    pub fn pending(&self) -> Vec<NodeId> {
        self.elements
            .iter()
            .filter(|e| e.state == ElementState::Pending)
            .map(|e| e.node)
            .collect()
    }

    /// Move `node` from Pending to Loading.
    ///
    /// Returns a snapshot of the element with its deferred attributes read at
    /// this moment, or `None` if the element is unknown, already submitted or
    /// lost its marker.
    pub fn begin_load(&mut self, host: &dyn Host, node: NodeId) -> Option<TrackedElement> {
        let index = self.elements.iter().position(|e| e.node == node)?;
        if self.elements[index].state != ElementState::Pending {
            return None;
        }

        let Some(fresh) = TrackedElement::read(host, node, ElementState::Loading) else {
            // Marker removed behind our back; nothing left to load
            self.elements.remove(index);
            self.ledger.remove(&node);
            return None;
        };

        self.elements[index] = fresh.clone();
        self.ledger.insert(node, ElementState::Loading);
        Some(fresh)
    }

    /// Record a terminal state and drop `node` from the working set
    pub fn complete(&mut self, node: NodeId, state: ElementState) {
        debug_assert!(state.is_terminal());
        self.elements.retain(|e| e.node != node);
        self.ledger.insert(node, state);
    }
}
