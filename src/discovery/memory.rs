//! In-memory host document.
//!
//! A small DOM-like tree used for headless runs and tests. Every insertion into and
//! removal from the connected tree is recorded as a [`MutationRecord`], matching what a
//! subtree mutation observer on the document root would report.

use std::collections::BTreeMap;

use image::DynamicImage;

use super::document::{Dimensions, HostDocument, NodeId, NodeKind};
use super::events::MutationRecord;

pub const PROCESSED_ATTRIBUTE: &str = "data-tryon-processed";

const CONTAINER_STYLE: &str = "position: relative; display: inline-block; vertical-align: middle";
const CONTROL_STYLE: &str = "position: absolute; top: 5px; right: 5px; z-index: 9999; cursor: pointer";

#[derive(Debug)]
struct NodeData {
    tag: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    visible: bool,
    natural: Dimensions,
    complete: bool,
    pixels: Option<DynamicImage>,
}

impl NodeData {
    fn new(tag: &str, kind: NodeKind) -> Self {
        Self {
            tag: tag.to_string(),
            kind,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            visible: true,
            natural: Dimensions::ZERO,
            complete: false,
            pixels: None,
        }
    }
}

#[derive(Debug)]
pub struct MemoryDocument {
    nodes: Vec<Option<NodeData>>,
    pending: Vec<MutationRecord>,
}

impl MemoryDocument {
    /// A document holding only its root `html` element.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData::new("html", NodeKind::Element))],
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Some(data));
        NodeId(self.nodes.len() as u64 - 1)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = tag.to_ascii_lowercase();
        let kind = if tag == "img" {
            NodeKind::Image
        } else {
            NodeKind::Element
        };
        self.push(NodeData::new(&tag, kind))
    }

    /// Create a detached `img` whose data has not loaded yet.
    pub fn create_image(&mut self, src: &str) -> NodeId {
        let id = self.create_element("img");
        self.set_attribute(id, "src", src);
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let mut data = NodeData::new("#text", NodeKind::Other);
        data.text = Some(text.to_string());
        self.push(data)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attributes.get(name).map(String::as_str)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node)?.text.as_deref()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn source(&self, image: NodeId) -> Option<&str> {
        self.attribute(image, "src")
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.visible)
    }

    /// True when the node is attached under the root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root(), node)
    }

    /// True when `node` is `ancestor` or lies beneath it.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.parent(child) {
            if let Some(parent) = self.node_mut(old_parent) {
                parent.children.retain(|c| *c != child);
            }
        }
        if let Some(data) = self.node_mut(child) {
            data.parent = None;
        }
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent) {
            return;
        }
        self.detach(child);

        let Some(parent_data) = self.node_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|r| parent_data.children.iter().position(|c| *c == r))
            .unwrap_or(parent_data.children.len());
        parent_data.children.insert(index, child);

        if let Some(data) = self.node_mut(child) {
            data.parent = Some(parent);
        }

        if self.is_connected(parent) {
            self.pending.push(MutationRecord::added([child]));
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Remove a node and its subtree from the document entirely.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root() {
            return;
        }
        if self.is_connected(node) {
            self.pending.push(MutationRecord::removed([node]));
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(data) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) {
                stack.extend(data.children);
            }
        }
    }

    /// Finish decoding an image: natural size becomes known and pixels readable.
    pub fn finish_loading(&mut self, image: NodeId, pixels: DynamicImage) {
        if let Some(data) = self.node_mut(image) {
            data.natural = Dimensions::new(pixels.width(), pixels.height());
            data.pixels = Some(pixels);
            data.complete = true;
        }
    }

    /// Drain the insertion records accumulated since the last call.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.tag(*id) == Some(tag))
            .collect()
    }

    /// Descendants of `node` in document order, excluding `node` itself.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDocument for MemoryDocument {
    fn images(&self) -> Vec<NodeId> {
        self.descendant_images(self.root())
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| n.kind)
    }

    fn descendant_images(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|id| self.kind(*id) == Some(NodeKind::Image))
            .collect()
    }

    fn natural_size(&self, image: NodeId) -> Dimensions {
        self.node(image).map(|n| n.natural).unwrap_or_default()
    }

    fn is_content_ready(&self, image: NodeId) -> bool {
        self.node(image).is_some_and(|n| n.complete)
    }

    fn is_processed(&self, image: NodeId) -> bool {
        self.attribute(image, PROCESSED_ATTRIBUTE) == Some("true")
    }

    fn mark_processed(&mut self, image: NodeId) {
        self.set_attribute(image, PROCESSED_ATTRIBUTE, "true");
    }

    fn wrap_in_container(&mut self, image: NodeId) -> NodeId {
        let container = self.create_element("div");
        self.set_attribute(container, "style", CONTAINER_STYLE);
        if let Some(parent) = self.parent(image) {
            self.insert_before(parent, container, Some(image));
            self.append_child(container, image);
        }
        container
    }

    fn append_control(&mut self, container: NodeId, label: &str) -> NodeId {
        let control = self.create_element("button");
        self.set_attribute(control, "style", CONTROL_STYLE);
        let text = self.create_text(label);
        self.append_child(control, text);
        if let Some(data) = self.node_mut(control) {
            data.visible = false;
        }
        self.append_child(container, control);
        control
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(data) = self.node_mut(node) {
            data.visible = visible;
        }
    }

    fn capture_pixels(&self, image: NodeId) -> Option<DynamicImage> {
        self.node(image)?.pixels.clone()
    }

    fn set_source(&mut self, image: NodeId, url: &str) -> bool {
        if self.kind(image) != Some(NodeKind::Image) {
            return false;
        }
        if self.source(image) != Some(url) {
            self.set_attribute(image, "src", url);
            // A new source decodes from scratch and signals content-ready again.
            if let Some(data) = self.node_mut(image) {
                data.complete = false;
                data.natural = Dimensions::ZERO;
                data.pixels = None;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertions_recorded_only_when_connected() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div");
        let img = doc.create_image("a.jpg");
        doc.append_child(div, img);
        assert!(doc.take_mutations().is_empty());

        doc.append_child(doc.root(), div);
        assert_eq!(doc.take_mutations(), vec![MutationRecord::added([div])]);
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_images_in_document_order() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let first = doc.create_image("1.jpg");
        let section = doc.create_element("section");
        let nested = doc.create_image("2.jpg");
        let last = doc.create_image("3.jpg");
        doc.append_child(root, first);
        doc.append_child(section, nested);
        doc.append_child(root, section);
        doc.append_child(root, last);

        assert_eq!(doc.images(), vec![first, nested, last]);
        assert_eq!(doc.descendant_images(section), vec![nested]);
        assert!(doc.descendant_images(nested).is_empty());
    }

    #[test]
    fn test_wrap_preserves_position() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let before = doc.create_text("before");
        let img = doc.create_image("a.jpg");
        let after = doc.create_text("after");
        for node in [before, img, after] {
            doc.append_child(root, node);
        }
        doc.take_mutations();

        let container = doc.wrap_in_container(img);
        assert_eq!(doc.children(root), &[before, container, after]);
        assert_eq!(doc.children(container), &[img]);
        assert_eq!(doc.parent(img), Some(container));
        assert_eq!(
            doc.take_mutations(),
            vec![MutationRecord::added([container]), MutationRecord::added([img])]
        );
    }

    #[test]
    fn test_control_hidden_by_default() {
        let mut doc = MemoryDocument::new();
        let img = doc.create_image("a.jpg");
        doc.append_child(doc.root(), img);
        let container = doc.wrap_in_container(img);
        let control = doc.append_control(container, "Try on");

        assert_eq!(doc.tag(control), Some("button"));
        assert!(!doc.is_visible(control));
        assert_eq!(doc.text(doc.children(control)[0]), Some("Try on"));
    }

    #[test]
    fn test_natural_size_zero_until_loaded() {
        let mut doc = MemoryDocument::new();
        let img = doc.create_image("a.jpg");
        assert_eq!(doc.natural_size(img), Dimensions::ZERO);
        assert!(!doc.is_content_ready(img));

        doc.finish_loading(img, DynamicImage::new_rgb8(120, 80));
        assert_eq!(doc.natural_size(img), Dimensions::new(120, 80));
        assert!(doc.is_content_ready(img));
        assert!(doc.capture_pixels(img).is_some());
    }

    #[test]
    fn test_cannot_insert_ancestor_under_descendant() {
        let mut doc = MemoryDocument::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(outer, inner);
        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), None);
        assert_eq!(doc.children(inner), &[] as &[NodeId]);
    }

    #[test]
    fn test_removed_node_is_gone() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div");
        let img = doc.create_image("a.jpg");
        doc.append_child(div, img);
        doc.append_child(doc.root(), div);

        doc.take_mutations();

        doc.remove(div);
        assert_eq!(doc.take_mutations(), vec![MutationRecord::removed([div])]);
        assert_eq!(doc.kind(img), None);
        assert!(!doc.set_source(img, "https://out/1.jpg"));
        assert!(doc.images().is_empty());
    }

    #[test]
    fn test_new_source_restarts_decoding() {
        let mut doc = MemoryDocument::new();
        let img = doc.create_image("a.jpg");
        let root = doc.root();
        doc.append_child(root, img);
        doc.finish_loading(img, DynamicImage::new_rgb8(200, 150));

        assert!(doc.set_source(img, "a.jpg"));
        assert!(doc.is_content_ready(img));

        assert!(doc.set_source(img, "https://out/1.jpg"));
        assert_eq!(doc.source(img), Some("https://out/1.jpg"));
        assert!(!doc.is_content_ready(img));
        assert_eq!(doc.natural_size(img), Dimensions::ZERO);
        assert!(doc.capture_pixels(img).is_none());
    }
}
