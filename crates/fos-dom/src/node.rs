//! DOM Node
//!
//! Nodes link to each other through `NodeId`s into the tree arena rather
//! than pointers.

use crate::{ElementGeometry, NamedNodeMap, NodeId, StyleDeclaration};

/// Arena slot: tree links plus payload
#[derive(Debug)]
pub struct Node {
    /// NONE for the document and detached nodes
    pub parent: NodeId,
    pub first_child: NodeId,
    /// Kept for O(1) append
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Text nodes cannot have children
    #[inline]
    pub fn can_have_children(&self) -> bool {
        !matches!(self.data, NodeData::Text(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// Node payload
#[derive(Debug)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

/// Element payload: tag, attributes, inline style and layout box
#[derive(Debug)]
pub struct ElementData {
    /// Lowercased tag name
    pub tag: String,
    pub attrs: NamedNodeMap,
    /// Inline style (`element.style`)
    pub style: StyleDeclaration,
    pub geometry: ElementGeometry,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: NamedNodeMap::new(),
            style: StyleDeclaration::new(),
            geometry: ElementGeometry::default(),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get_attribute(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attrs.get_attribute("id")
    }

    /// Check the whitespace-separated class list
    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .get_attribute("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }
}
