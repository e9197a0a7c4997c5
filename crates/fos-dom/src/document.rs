//! Document - High-level document API

use crate::{DomError, DomTree, ElementGeometry, NodeId, SelectorList};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a new document with `<html><head/><body/></html>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        let root = tree.root();
        let built = tree
            .append_child(root, html)
            .and_then(|_| tree.append_child(html, head))
            .and_then(|_| tree.append_child(html, body));
        if let Err(err) = built {
            tracing::error!("Document skeleton for {} is malformed: {}", url, err);
        }

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree.append_child(parent, child)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree.remove_child(parent, child)
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.tree.element(node).ok()?.get_attr(name)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Set an attribute, returning the replaced value
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Option<String>, DomError> {
        Ok(self.tree.element_mut(node)?.attrs.set_attribute(name, value))
    }

    /// Remove an attribute, returning its value if it was present
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        Ok(self
            .tree
            .element_mut(node)?
            .attrs
            .remove_attribute(name)
            .map(|a| a.value))
    }

    /// Set an inline style property
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.tree.element_mut(node)?.style.set_property(property, value);
        Ok(())
    }

    /// Inline style property value
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.tree.element(node).ok()?.style.get_property_value(property)
    }

    /// Record the layout geometry of an element
    pub fn set_geometry(&mut self, node: NodeId, geometry: ElementGeometry) -> Result<(), DomError> {
        self.tree.element_mut(node)?.geometry = geometry;
        Ok(())
    }

    pub fn geometry(&self, node: NodeId) -> Option<ElementGeometry> {
        self.tree.element(node).ok().map(|e| e.geometry)
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .find(|(_, node)| node.as_element().and_then(|e| e.id()) == Some(id))
            .map(|(node_id, _)| node_id)
    }

    /// All connected elements matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selectors = SelectorList::parse(selector).inspect_err(|err| {
            tracing::debug!("querySelectorAll('{}') rejected: {}", selector, err);
        })?;
        Ok(self
            .tree
            .descendants(self.tree.root())
            .filter(|(_, node)| node.is_element())
            .map(|(id, _)| id)
            .filter(|&id| selectors.matches(&self.tree, id))
            .collect())
    }

    /// First element matching `selector`
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
